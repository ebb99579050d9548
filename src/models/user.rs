//! Local user and linked-account models for storage and API.

use serde::{Deserialize, Serialize};

/// Application user stored in Firestore.
///
/// Serialized field names match the public API (camelCase), so the same
/// struct serves as both the stored document and the response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Internally generated ID (also used as document ID); immutable
    pub id: String,
    /// Firebase Auth UID; unique when present, set once and then stable
    #[serde(rename = "firebaseUID")]
    pub firebase_uid: Option<String>,
    /// Email address
    pub email: String,
    /// Display name
    pub name: String,
    /// Profile photo URL
    pub image: Option<String>,
    /// When the email was verified (RFC3339); None means unverified
    pub email_verified: Option<String>,
    /// Password hash; None for identity-provider-only accounts
    pub password: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Linked external-provider account (one per user/provider pair).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    /// Owning user ID
    pub user_id: String,
    /// Provider name ("firebase")
    pub provider: String,
    /// Provider-assigned account ID (the Firebase UID)
    pub provider_account_id: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Field-level partial update for a stored user.
///
/// Each attribute is wrapped in a present/absent marker so reconciliation is
/// exhaustive instead of building an untyped patch object. `email_verified`
/// carries a third state: `Some(None)` clears the verification timestamp.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub firebase_uid: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub email_verified: Option<Option<String>>,
}

impl UserUpdate {
    /// Whether this update links a UID the stored row does not already carry.
    pub fn links_new_uid(&self, existing: &User) -> bool {
        match &self.firebase_uid {
            Some(uid) => existing.firebase_uid.as_deref() != Some(uid.as_str()),
            None => false,
        }
    }
}

impl User {
    /// Apply a partial update in place. `updated_at` is stamped by the store.
    pub fn apply(&mut self, update: &UserUpdate) {
        if let Some(uid) = &update.firebase_uid {
            self.firebase_uid = Some(uid.clone());
        }
        if let Some(email) = &update.email {
            self.email = email.clone();
        }
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(image) = &update.image {
            self.image = Some(image.clone());
        }
        if let Some(verified) = &update.email_verified {
            self.email_verified = verified.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_user() -> User {
        User {
            id: "u1".to_string(),
            firebase_uid: None,
            email: "old@example.com".to_string(),
            name: "Old Name".to_string(),
            image: None,
            email_verified: None,
            password: Some("hash".to_string()),
            created_at: "2025-01-01T00:00:00Z".to_string(),
            updated_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let mut user = base_user();
        let update = UserUpdate {
            name: Some("New Name".to_string()),
            ..Default::default()
        };

        user.apply(&update);

        assert_eq!(user.name, "New Name");
        assert_eq!(user.email, "old@example.com");
        assert_eq!(user.firebase_uid, None);
        assert_eq!(user.email_verified, None);
    }

    #[test]
    fn apply_clears_email_verified_on_explicit_none() {
        let mut user = base_user();
        user.email_verified = Some("2025-06-01T00:00:00Z".to_string());

        user.apply(&UserUpdate {
            email_verified: Some(None),
            ..Default::default()
        });

        assert_eq!(user.email_verified, None);
    }

    #[test]
    fn links_new_uid_detects_linking() {
        let mut user = base_user();
        let update = UserUpdate {
            firebase_uid: Some("fb-123".to_string()),
            ..Default::default()
        };
        assert!(update.links_new_uid(&user));

        user.firebase_uid = Some("fb-123".to_string());
        assert!(!update.links_new_uid(&user));
    }

    #[test]
    fn user_serializes_with_api_field_names() {
        let user = base_user();
        let json = serde_json::to_value(&user).unwrap();

        assert!(json.get("firebaseUID").is_some());
        assert!(json.get("emailVerified").is_some());
        assert!(json.get("createdAt").is_some());
    }
}
