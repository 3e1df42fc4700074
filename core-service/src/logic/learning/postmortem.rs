//! Post-Mortem Document
//!
//! XHTML storage-format body for the document store. Every value that came
//! from a ticket, a model or telemetry is escaped.

use chrono::{DateTime, Utc};

use crate::logic::incident::FixRecord;

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn title(ticket_id: &str, at: DateTime<Utc>) -> String {
    format!(
        "Post-Mortem: {} - Failure Analysis {}",
        ticket_id,
        at.format("%Y%m%d-%H%M%S")
    )
}

pub fn render(record: &FixRecord, resolved_at: DateTime<Utc>) -> String {
    let failure = &record.failure;
    let vibration = match failure.max_vibration.value() {
        Some(v) => format!("{:.2} Hz", v),
        None => "Unknown".to_string(),
    };
    let deployment = if record.is_deployed() {
        format!(
            "<p>A new design spec was pushed to source control automatically: <a href=\"{0}\">{0}</a></p>",
            escape_html(&record.pr_link)
        )
    } else {
        "<p>No automated fix was deployed for this run.</p>".to_string()
    };

    format!(
        "<h1>Incident Summary</h1>\
         <p>Ticket <strong>{ticket}</strong> suffered a critical resonance failure during dyno testing \
         and was resolved on {resolved}.</p>\
         <h2>Failure Telemetry</h2>\
         <ul><li>Max vibration: {vibration}</li>\
         <li>Temperature: {temperature:.1} C</li>\
         <li>Anomaly score: {score:.4}</li>\
         <li>Detected at: {detected}</li></ul>\
         <h2>Root Cause</h2><p>{root_cause}</p>\
         <h2>AI Prescription</h2><p>{recommendation}</p>\
         <h2>Compliance Audit</h2><p>{compliance}</p>\
         <h2>Resolution</h2>\
         <ul><li>Material thickness: {thickness:.1}mm</li>\
         <li>Estimated weight: {weight:.0}g</li>\
         <li>Dampening coefficient: {dampening}</li>\
         <li>Max load rating: {load}</li></ul>\
         {deployment}",
        ticket = escape_html(&record.ticket_id),
        resolved = resolved_at.format("%Y-%m-%d %H:%M UTC"),
        vibration = escape_html(&vibration),
        temperature = failure.temperature,
        score = failure.anomaly_score,
        detected = escape_html(&failure.timestamp),
        root_cause = escape_html(&record.root_cause),
        recommendation = escape_html(&record.recommendation),
        compliance = escape_html(&record.compliance_note),
        thickness = record.specs.material_thickness_mm,
        weight = record.specs.estimated_weight_g,
        dampening = escape_html(&record.specs.dampening_coefficient),
        load = escape_html(&record.specs.max_load_rating),
        deployment = deployment,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::compliance::enforce;
    use crate::logic::diagnosis::{FailureEvent, Reading};
    use crate::logic::incident::{FinalSpec, NO_LINK};
    use uuid::Uuid;

    fn record(root_cause: &str, pr_link: &str) -> FixRecord {
        let verdict = enforce(8.5);
        FixRecord {
            ticket_id: "KAN-1".to_string(),
            run_id: Uuid::new_v4(),
            recommendation: "Increase precision thickness to 8.0mm (Titanium Alloy).".to_string(),
            root_cause: root_cause.to_string(),
            compliance_note: verdict.note(),
            verdict,
            specs: FinalSpec::new(8.0, 480.0),
            pr_link: pr_link.to_string(),
            failure: FailureEvent {
                ticket_id: "KAN-1".to_string(),
                max_vibration: Reading::from("81.20 Hz"),
                temperature: 86.1,
                anomaly_score: 0.71,
                timestamp: "2025-01-01T00:00:00Z".to_string(),
            },
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_escapes_untrusted_text() {
        let body = render(&record("<script>alert(1)</script> & more", NO_LINK), Utc::now());
        assert!(body.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; more"));
        assert!(!body.contains("<script>"));
    }

    #[test]
    fn test_includes_sections_and_link() {
        let body = render(&record("Resonance", "https://scm.example/pr/1"), Utc::now());
        assert!(body.contains("<h2>Root Cause</h2>"));
        assert!(body.contains("81.20 Hz"));
        assert!(body.contains("8.0mm"));
        assert!(body.contains("VIOLATION DETECTED"));
        assert!(body.contains("https://scm.example/pr/1"));
    }

    #[test]
    fn test_title_format() {
        let at = DateTime::parse_from_rfc3339("2025-03-04T05:06:07Z").unwrap().with_timezone(&Utc);
        assert_eq!(title("KAN-1", at), "Post-Mortem: KAN-1 - Failure Analysis 20250304-050607");
    }
}
