//! Notification Dispatcher
//!
//! Stages enqueue and move on. A single task drains the queue so comments
//! land in the order the stages produced them; a failed post is logged and
//! never reaches the stage that sent it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use super::RichText;
use crate::logic::collaborators::{with_timeout, IssueTracker};

enum Command {
    Post { ticket_id: String, message: RichText },
    Flush(oneshot::Sender<()>),
}

#[derive(Default)]
struct Counters {
    sent: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotifyStats {
    pub sent: u64,
    pub failed: u64,
}

#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Command>,
    counters: Arc<Counters>,
}

impl Notifier {
    /// Start the dispatcher task on the current runtime
    pub fn spawn(tracker: Arc<dyn IssueTracker>, timeout: Duration) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();
        let counters = Arc::new(Counters::default());
        let task_counters = counters.clone();

        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    Command::Post { ticket_id, message } => {
                        match with_timeout(timeout, tracker.post_comment(&ticket_id, &message)).await {
                            Ok(()) => {
                                task_counters.sent.fetch_add(1, Ordering::Relaxed);
                                log::debug!("Posted '{}' on {}", message.title, ticket_id);
                            }
                            Err(e) => {
                                task_counters.failed.fetch_add(1, Ordering::Relaxed);
                                log::error!("Failed to post '{}' on {}: {}", message.title, ticket_id, e);
                            }
                        }
                    }
                    Command::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
            log::debug!("Notification dispatcher stopped");
        });

        Self { tx, counters }
    }

    /// Queue a notification; returns immediately
    pub fn notify(&self, ticket_id: &str, message: RichText) {
        let command = Command::Post {
            ticket_id: ticket_id.to_string(),
            message,
        };
        if self.tx.send(command).is_err() {
            log::warn!("Notification dispatcher is gone, dropping message for {}", ticket_id);
        }
    }

    /// Wait until everything queued so far has been attempted
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    pub fn stats(&self) -> NotifyStats {
        NotifyStats {
            sent: self.counters.sent.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::collaborators::fake::FakeTracker;
    use crate::logic::notify::StatusColor;

    #[tokio::test]
    async fn test_delivers_in_order() {
        let tracker = Arc::new(FakeTracker::default());
        let notifier = Notifier::spawn(tracker.clone(), Duration::from_secs(1));

        for title in ["ONE", "TWO", "THREE"] {
            notifier.notify("KAN-1", RichText::new(title, "", StatusColor::Info));
        }
        notifier.flush().await;

        assert_eq!(tracker.comment_titles("KAN-1"), vec!["ONE", "TWO", "THREE"]);
        assert_eq!(notifier.stats(), NotifyStats { sent: 3, failed: 0 });
    }

    #[tokio::test]
    async fn test_failed_post_is_counted_not_raised() {
        let tracker = Arc::new(FakeTracker::default());
        tracker.fail_comments(true);
        let notifier = Notifier::spawn(tracker.clone(), Duration::from_secs(1));

        notifier.notify("KAN-1", RichText::new("LOST", "", StatusColor::Warning));
        notifier.flush().await;

        assert_eq!(notifier.stats().failed, 1);
        assert!(tracker.comment_titles("KAN-1").is_empty());
    }
}
