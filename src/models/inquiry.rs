// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Contact inquiry model for storage and API.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an inquiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InquiryStatus {
    Unread,
    Read,
    Replied,
}

impl InquiryStatus {
    /// Parse a request-supplied status string. Returns None for anything
    /// outside the allowed set, which the route rejects with 400.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "unread" => Some(Self::Unread),
            "read" => Some(Self::Read),
            "replied" => Some(Self::Replied),
            _ => None,
        }
    }
}

/// Stored contact inquiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryMessage {
    /// Internally generated ID (also used as document ID)
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    /// Free-form priority label; defaults to "low"
    pub priority: String,
    pub status: InquiryStatus,
    pub replied: bool,
    /// Reply text, once one has been recorded
    pub reply: Option<String>,
    /// When the reply was recorded (RFC3339)
    pub replied_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial update for an inquiry (PATCH body, validated by the route).
#[derive(Debug, Clone, Default)]
pub struct InquiryUpdate {
    pub status: Option<InquiryStatus>,
    pub replied: Option<bool>,
    pub reply: Option<String>,
}

impl InquiryMessage {
    /// Apply a partial update in place.
    ///
    /// Setting `reply` forces `replied = true` and stamps `replied_at`,
    /// overriding any `replied` value supplied in the same update.
    pub fn apply(&mut self, update: &InquiryUpdate, now: &str) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(replied) = update.replied {
            self.replied = replied;
        }
        if let Some(reply) = &update.reply {
            self.reply = Some(reply.clone());
            self.replied = true;
            self.replied_at = Some(now.to_string());
        }
        self.updated_at = now.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_inquiry() -> InquiryMessage {
        InquiryMessage {
            id: "i1".to_string(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            phone: None,
            message: "My bananas ripen too fast".to_string(),
            priority: "low".to_string(),
            status: InquiryStatus::Unread,
            replied: false,
            reply: None,
            replied_at: None,
            created_at: "2025-01-01T00:00:00Z".to_string(),
            updated_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn reply_forces_replied_and_stamps_timestamp() {
        let mut inquiry = base_inquiry();

        // `replied: false` supplied alongside a reply must lose
        inquiry.apply(
            &InquiryUpdate {
                status: Some(InquiryStatus::Read),
                replied: Some(false),
                reply: Some("ok".to_string()),
            },
            "2025-02-01T00:00:00Z",
        );

        assert!(inquiry.replied);
        assert_eq!(inquiry.reply.as_deref(), Some("ok"));
        assert_eq!(inquiry.replied_at.as_deref(), Some("2025-02-01T00:00:00Z"));
        assert_eq!(inquiry.status, InquiryStatus::Read);
    }

    #[test]
    fn status_only_update_leaves_reply_fields_alone() {
        let mut inquiry = base_inquiry();

        inquiry.apply(
            &InquiryUpdate {
                status: Some(InquiryStatus::Read),
                ..Default::default()
            },
            "2025-02-01T00:00:00Z",
        );

        assert_eq!(inquiry.status, InquiryStatus::Read);
        assert!(!inquiry.replied);
        assert_eq!(inquiry.replied_at, None);
        assert_eq!(inquiry.updated_at, "2025-02-01T00:00:00Z");
    }

    #[test]
    fn status_parse_rejects_unknown_values() {
        assert_eq!(InquiryStatus::parse("read"), Some(InquiryStatus::Read));
        assert_eq!(InquiryStatus::parse("archived"), None);
        assert_eq!(InquiryStatus::parse(""), None);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&InquiryStatus::Replied).unwrap();
        assert_eq!(json, "\"replied\"");
    }
}
