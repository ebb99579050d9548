// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users and linked provider accounts
//! - Scan results
//! - Contact inquiries

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Account, InquiryMessage, InquiryUpdate, ScanResult, User, UserUpdate};
use crate::time_utils::now_rfc3339;
use serde::{Deserialize, Serialize};

/// Reservation document claiming a Firebase UID for one user row.
///
/// Firestore has no unique indexes; creating the user and this document in
/// one transaction makes a racing duplicate create fail instead of leaving
/// two rows with the same UID.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UidReservation {
    user_id: String,
}

/// Document ID for a UID reservation.
fn uid_doc_id(uid: &str) -> String {
    format!("firebase_{}", urlencoding::encode(uid))
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing
        // a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by document ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by their Firebase UID.
    pub async fn find_user_by_firebase_uid(&self, uid: &str) -> Result<Option<User>, AppError> {
        let uid = uid.to_string();
        let mut users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("firebaseUID").eq(uid.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.pop())
    }

    /// Find a user by email address.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let mut users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("email").eq(email.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.pop())
    }

    /// Find a user matching either the Firebase UID or the email.
    ///
    /// The UID probe runs first so repeated syncs hit the durable link before
    /// the mutable email. A user may exist with only an email match (e.g.
    /// password signup before ever authenticating through Firebase).
    pub async fn find_user_by_firebase_uid_or_email(
        &self,
        uid: &str,
        email: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        if let Some(user) = self.find_user_by_firebase_uid(uid).await? {
            return Ok(Some(user));
        }

        match email {
            Some(email) if !email.is_empty() => self.find_user_by_email(email).await,
            _ => Ok(None),
        }
    }

    /// Insert a user row with no linked account (direct-signup shape).
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.create_user_records(user, None).await
    }

    /// Create a user together with its linked provider account.
    pub async fn create_user_with_account(
        &self,
        user: &User,
        account: &Account,
    ) -> Result<(), AppError> {
        self.create_user_records(user, Some(account)).await
    }

    /// Shared create path.
    ///
    /// When the user carries a Firebase UID, the writes run in a transaction
    /// that also claims a UID reservation document. Two concurrent creates for
    /// the same UID cannot both commit: the loser either observes the winner's
    /// reservation (`Conflict`) or fails the transaction commit.
    async fn create_user_records(
        &self,
        user: &User,
        account: Option<&Account>,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;

        let Some(uid) = user.firebase_uid.clone() else {
            // No UID to reserve; plain sequential writes.
            self.insert_user(user).await?;
            if let Some(account) = account {
                self.create_account(account).await?;
            }
            return Ok(());
        };

        let reservation_id = uid_doc_id(&uid);

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Read the reservation to register it for conflict detection.
        let existing: Option<UidReservation> = client
            .fluent()
            .select()
            .by_id_in(collections::USER_UIDS)
            .obj()
            .one(&reservation_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read UID reservation: {}", e))
            })?;

        if let Some(reservation) = existing {
            let _ = transaction.rollback().await;
            tracing::warn!(
                uid = %uid,
                holder = %reservation.user_id,
                "Firebase UID already claimed by another user row"
            );
            return Err(AppError::Conflict(format!(
                "A user with firebaseUID {} already exists",
                uid
            )));
        }

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user to transaction: {}", e)))?;

        if let Some(account) = account {
            client
                .fluent()
                .update()
                .in_col(collections::ACCOUNTS)
                .document_id(&account.id)
                .object(account)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add account to transaction: {}", e))
                })?;
        }

        client
            .fluent()
            .update()
            .in_col(collections::USER_UIDS)
            .document_id(&reservation_id)
            .object(&UidReservation {
                user_id: user.id.clone(),
            })
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add reservation to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            user_id = %user.id,
            uid = %uid,
            with_account = account.is_some(),
            "User created with UID reservation"
        );

        Ok(())
    }

    /// Write a user document without any reservation handling.
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Apply a field-level partial update to a user.
    ///
    /// Fails with `NotFound` if the ID is unknown. When the update links a UID
    /// the row did not already carry, the write also claims the UID reservation
    /// transactionally and fails with `Conflict` if another row holds it.
    pub async fn update_user(&self, id: &str, update: &UserUpdate) -> Result<User, AppError> {
        let mut user = self
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        let linked_uid = if update.links_new_uid(&user) {
            update.firebase_uid.clone()
        } else {
            None
        };

        user.apply(update);
        user.updated_at = now_rfc3339();

        let Some(uid) = linked_uid else {
            self.insert_user(&user).await?;
            return Ok(user);
        };

        let reservation_id = uid_doc_id(&uid);
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let existing: Option<UidReservation> = client
            .fluent()
            .select()
            .by_id_in(collections::USER_UIDS)
            .obj()
            .one(&reservation_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read UID reservation: {}", e))
            })?;

        if let Some(reservation) = existing {
            if reservation.user_id != user.id {
                let _ = transaction.rollback().await;
                return Err(AppError::Conflict(format!(
                    "firebaseUID {} is already linked to another user",
                    uid
                )));
            }
        }

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user to transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::USER_UIDS)
            .document_id(&reservation_id)
            .object(&UidReservation {
                user_id: user.id.clone(),
            })
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add reservation to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(user)
    }

    /// Insert a linked provider account row.
    pub async fn create_account(&self, account: &Account) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ACCOUNTS)
            .document_id(&account.id)
            .object(account)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get the linked accounts for a user.
    pub async fn get_accounts_for_user(&self, user_id: &str) -> Result<Vec<Account>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACCOUNTS)
            .filter(move |q| q.field("userId").eq(user_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Scan Result Operations ──────────────────────────────────

    /// Store a scan result.
    pub async fn create_scan(&self, scan: &ScanResult) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SCAN_RESULTS)
            .document_id(&scan.id)
            .object(scan)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get all scan results, newest first.
    pub async fn list_scans(&self) -> Result<Vec<ScanResult>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SCAN_RESULTS)
            .order_by([(
                "createdAt",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a scan result by ID.
    pub async fn get_scan(&self, id: &str) -> Result<Option<ScanResult>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SCAN_RESULTS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a scan result by ID.
    pub async fn delete_scan(&self, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::SCAN_RESULTS)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Inquiry Operations ──────────────────────────────────────

    /// Store a new inquiry.
    pub async fn create_inquiry(&self, inquiry: &InquiryMessage) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::INQUIRIES)
            .document_id(&inquiry.id)
            .object(inquiry)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get all inquiries, newest first.
    pub async fn list_inquiries(&self) -> Result<Vec<InquiryMessage>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::INQUIRIES)
            .order_by([(
                "createdAt",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an inquiry by ID.
    pub async fn get_inquiry(&self, id: &str) -> Result<Option<InquiryMessage>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::INQUIRIES)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Apply a partial update to an inquiry.
    ///
    /// Fails with `NotFound` if the ID is unknown, which the route maps to 404.
    pub async fn update_inquiry(
        &self,
        id: &str,
        update: &InquiryUpdate,
    ) -> Result<InquiryMessage, AppError> {
        let mut inquiry = self
            .get_inquiry(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Inquiry {} not found", id)))?;

        inquiry.apply(update, &now_rfc3339());

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::INQUIRIES)
            .document_id(&inquiry.id)
            .object(&inquiry)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(inquiry)
    }

    /// Delete an inquiry by ID.
    pub async fn delete_inquiry(&self, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::INQUIRIES)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_doc_id_escapes_unsafe_characters() {
        assert_eq!(uid_doc_id("abc123"), "firebase_abc123");
        assert_eq!(uid_doc_id("a/b c"), "firebase_a%2Fb%20c");
    }

    #[tokio::test]
    async fn offline_mock_errors_on_access() {
        let db = FirestoreDb::new_mock();
        let err = db.get_user("u1").await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
