/* 📖 # Why keep feedback in a bounded in-memory log?

Feedback is not persisted. The log exists so submissions can be inspected via
`GET /api/feedback` and in the server logs while the process runs. The bound
keeps a chatty (or abusive) client from growing the process without limit; once
full, the oldest entries are dropped first.
*/

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use docportal_base::PortalResult;
use docportal_base::pal::http::parse_form_pairs;

/// Longest message accepted, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// A feedback form submission as sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedbackSubmission {
    #[serde(default)]
    pub page: String,
    pub message: String,
}

impl FeedbackSubmission {
    /// Parse a JSON or form encoded body, depending on `content_type`.
    ///
    /// Form encoding is assumed when no content type is given.
    pub fn from_body(content_type: Option<&str>, body: &[u8]) -> PortalResult<Self> {
        let is_json = content_type
            .map(|ct| ct.trim_start().starts_with("application/json"))
            .unwrap_or(false);
        let submission = if is_json {
            serde_json::from_slice::<FeedbackSubmission>(body)
                .map_err(|e| docportal_base::err!("Invalid feedback JSON: {}", e))?
        } else {
            let body = std::str::from_utf8(body)
                .map_err(|_| docportal_base::err!("Feedback form is not valid UTF-8"))?;
            let mut submission = FeedbackSubmission {
                page: String::new(),
                message: String::new(),
            };
            for (key, value) in parse_form_pairs(body) {
                match key.as_str() {
                    "page" => submission.page = value,
                    "message" => submission.message = value,
                    _ => {}
                }
            }
            submission
        };
        submission.validate()?;
        Ok(submission)
    }

    fn validate(&self) -> PortalResult<()> {
        if self.message.trim().is_empty() {
            docportal_base::bail!("Feedback message must not be empty");
        }
        if self.message.chars().count() > MAX_MESSAGE_CHARS {
            docportal_base::bail!(
                "Feedback message is longer than {} characters",
                MAX_MESSAGE_CHARS
            );
        }
        Ok(())
    }
}

/// A stored feedback entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackEntry {
    pub page: String,
    pub message: String,
    /// Seconds since the Unix epoch.
    pub received_at: u64,
}

/// Bounded, thread-safe log of feedback entries, oldest first.
#[derive(Debug)]
pub struct FeedbackLog {
    entries: Mutex<VecDeque<FeedbackEntry>>,
    capacity: usize,
}

impl FeedbackLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity,
        }
    }

    /// Store a submission, dropping the oldest entry when the log is full.
    pub fn record(&self, submission: FeedbackSubmission) -> FeedbackEntry {
        let received_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let entry = FeedbackEntry {
            page: submission.page,
            message: submission.message.trim().to_string(),
            received_at,
        };
        info!(
            page = entry.page.as_str(),
            message = entry.message.as_str(),
            "feedback received"
        );
        if self.capacity == 0 {
            return entry;
        }
        let mut entries = self.entries.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
        entry
    }

    /// Snapshot of the stored entries, oldest first.
    pub fn entries(&self) -> Vec<FeedbackEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(message: &str) -> FeedbackSubmission {
        FeedbackSubmission {
            page: "/en/docs/v1/introduction".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_parse_json_body() {
        let parsed = FeedbackSubmission::from_body(
            Some("application/json; charset=utf-8"),
            br#"{"page":"/en/docs/v1/guide","message":"Great page"}"#,
        )
        .unwrap();
        assert_eq!(parsed.page, "/en/docs/v1/guide");
        assert_eq!(parsed.message, "Great page");
    }

    #[test]
    fn test_parse_form_body() {
        let parsed = FeedbackSubmission::from_body(
            Some("application/x-www-form-urlencoded"),
            b"page=%2Fen%2Fdocs%2Fv1%2Fguide&message=Needs+more+examples",
        )
        .unwrap();
        assert_eq!(parsed.page, "/en/docs/v1/guide");
        assert_eq!(parsed.message, "Needs more examples");
    }

    #[test]
    fn test_empty_message_rejected() {
        let err = FeedbackSubmission::from_body(None, b"page=x&message=++").unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
        assert!(
            FeedbackSubmission::from_body(Some("application/json"), br#"{"page":"x"}"#).is_err()
        );
    }

    #[test]
    fn test_overlong_message_rejected() {
        let body = format!("message={}", "a".repeat(MAX_MESSAGE_CHARS + 1));
        assert!(FeedbackSubmission::from_body(None, body.as_bytes()).is_err());
    }

    #[test]
    fn test_log_drops_oldest_past_capacity() {
        let log = FeedbackLog::new(2);
        log.record(submission("first"));
        log.record(submission("second"));
        log.record(submission("  third  "));

        let messages: Vec<String> = log.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["second", "third"]);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let log = FeedbackLog::new(0);
        let entry = log.record(submission("hello"));
        assert_eq!(entry.message, "hello");
        assert!(log.is_empty());
    }
}
