//! Ticket Notifications
//!
//! Every pipeline stage posts one rich-text comment on the owning ticket:
//! a coloured bold title, a message paragraph and an optional JSON block.
//!
//! # Components
//! - `dispatcher.rs`: ordered fire-and-forget delivery

pub mod dispatcher;

use serde::{Deserialize, Serialize};

pub use dispatcher::{Notifier, NotifyStats};

/// Status colour signal carried by each notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Success,
    Info,
    Warning,
    Critical,
    Learning,
}

impl StatusColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusColor::Success => "success",
            StatusColor::Info => "info",
            StatusColor::Warning => "warning",
            StatusColor::Critical => "critical",
            StatusColor::Learning => "learning",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            StatusColor::Success => "#36B37E",
            StatusColor::Info => "#0052CC",
            StatusColor::Warning => "#FFAB00",
            StatusColor::Critical => "#FF5630",
            StatusColor::Learning => "#6554C0",
        }
    }
}

/// Stage notification body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichText {
    pub title: String,
    pub text: String,
    pub json: Option<serde_json::Value>,
    pub color: StatusColor,
}

impl RichText {
    pub fn new(title: impl Into<String>, text: impl Into<String>, color: StatusColor) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            json: None,
            color,
        }
    }

    pub fn with_json(mut self, json: serde_json::Value) -> Self {
        self.json = Some(json);
        self
    }

    /// Atlassian document format body
    pub fn to_adf(&self) -> serde_json::Value {
        let mut content = vec![
            serde_json::json!({
                "type": "paragraph",
                "content": [
                    {
                        "type": "text",
                        "text": format!("{}: ", self.title),
                        "marks": [
                            { "type": "strong" },
                            { "type": "textColor", "attrs": { "color": self.color.color() } }
                        ]
                    },
                    { "type": "text", "text": " " }
                ]
            }),
            serde_json::json!({
                "type": "paragraph",
                "content": [{ "type": "text", "text": self.text }]
            }),
        ];

        if let Some(ref json) = self.json {
            let pretty = serde_json::to_string_pretty(json).unwrap_or_else(|_| "{}".to_string());
            content.push(serde_json::json!({
                "type": "codeBlock",
                "attrs": { "language": "json" },
                "content": [{ "type": "text", "text": pretty }]
            }));
        }

        serde_json::json!({
            "type": "doc",
            "version": 1,
            "content": content
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adf_title_carries_colour() {
        let msg = RichText::new("FAILURE DETECTED", "Analysis initiated...", StatusColor::Critical);
        let adf = msg.to_adf();

        assert_eq!(adf["type"], "doc");
        let title = &adf["content"][0]["content"][0];
        assert_eq!(title["text"], "FAILURE DETECTED: ");
        assert_eq!(title["marks"][1]["attrs"]["color"], "#FF5630");
        assert_eq!(adf["content"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_adf_embeds_json_block() {
        let msg = RichText::new("COMPLIANCE", "ok", StatusColor::Info)
            .with_json(serde_json::json!({ "status": "APPROVED" }));
        let adf = msg.to_adf();

        let block = &adf["content"][2];
        assert_eq!(block["type"], "codeBlock");
        assert!(block["content"][0]["text"].as_str().unwrap().contains("APPROVED"));
    }
}
