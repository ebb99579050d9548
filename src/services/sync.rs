// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reconciliation of Firebase identities into the local user store.
//!
//! The seed/sync path finds-or-creates the local row for a Firebase UID; the
//! profile-update path writes the provider first and the local store second.
//! The two systems share no transaction: a failure between the writes leaves
//! them inconsistent until the next sync (a property the API contract exposes
//! rather than hides).

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{Account, User, UserUpdate};
use crate::services::firebase_auth::{FirebaseAuthClient, FirebaseUser, UserUpdateAttrs};
use crate::time_utils::now_rfc3339;
use futures_util::{stream, StreamExt};
use std::sync::Arc;

const MAX_CONCURRENT_SYNCS: usize = 8;
const PROVIDER: &str = "firebase";
const ACCOUNT_TYPE: &str = "oauth";
/// Display name for identities that never set one.
const DEFAULT_DISPLAY_NAME: &str = "Firebase User";

/// Result of synchronizing one Firebase identity.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub user: User,
    /// Whether a new local row (and its linked account) was created.
    pub created: bool,
}

/// Display fields accepted by the profile-update path.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: Option<bool>,
}

/// Service reconciling the identity provider with the local user store.
#[derive(Clone)]
pub struct UserSyncService {
    firebase: Arc<FirebaseAuthClient>,
    db: FirestoreDb,
}

impl UserSyncService {
    pub fn new(firebase: Arc<FirebaseAuthClient>, db: FirestoreDb) -> Self {
        Self { firebase, db }
    }

    /// Find-or-create the local user row for a Firebase UID.
    ///
    /// Fetches the foreign record first; a provider miss aborts before any
    /// local write. An existing row (matched by UID, or by email for users
    /// who signed up with a password before ever authenticating through
    /// Firebase) is linked and updated in place; otherwise a new row is
    /// created together with exactly one linked account. Linking on the
    /// update path does not create an account row.
    pub async fn sync_user(&self, uid: &str) -> Result<SyncOutcome, AppError> {
        let foreign = self.firebase.get_user_by_uid(uid).await?;

        tracing::info!(
            uid = %foreign.uid,
            email = foreign.email.as_deref().unwrap_or("<none>"),
            email_verified = foreign.email_verified,
            "Fetched Firebase user for sync"
        );

        let existing = self
            .db
            .find_user_by_firebase_uid_or_email(uid, foreign.email.as_deref())
            .await?;

        let now = now_rfc3339();

        match existing {
            Some(user) => {
                if let Some(current) = &user.firebase_uid {
                    if current != &foreign.uid {
                        tracing::warn!(
                            user_id = %user.id,
                            stored = %current,
                            incoming = %foreign.uid,
                            "Stored firebaseUID differs from incoming identity; keeping stored link"
                        );
                    }
                }

                tracing::info!(user_id = %user.id, "User exists, updating with Firebase data");

                let update = reconcile(&user, &foreign, &now);
                let updated = self.db.update_user(&user.id, &update).await?;

                Ok(SyncOutcome {
                    user: updated,
                    created: false,
                })
            }
            None => {
                tracing::info!(uid = %foreign.uid, "Creating new user from Firebase data");

                let user = new_user_from_foreign(&foreign, &now);
                let account = Account {
                    id: uuid::Uuid::new_v4().to_string(),
                    user_id: user.id.clone(),
                    provider: PROVIDER.to_string(),
                    provider_account_id: foreign.uid.clone(),
                    account_type: ACCOUNT_TYPE.to_string(),
                    created_at: now.clone(),
                    updated_at: now,
                };

                self.db.create_user_with_account(&user, &account).await?;

                Ok(SyncOutcome {
                    user,
                    created: true,
                })
            }
        }
    }

    /// Sweep all Firebase users and create local rows for the missing ones.
    ///
    /// Existing rows are left untouched. Per-user failures are logged and
    /// skipped so one bad identity does not abort the sweep. Returns the
    /// number of rows created.
    pub async fn sync_all(&self, max_results: u32) -> Result<u32, AppError> {
        let users = self.firebase.list_all_users(max_results).await?;
        tracing::info!(count = users.len(), "Syncing Firebase users");

        let results: Vec<(String, Result<bool, AppError>)> = stream::iter(users)
            .map(|foreign| {
                let service = self.clone();
                async move {
                    let outcome = match service.db.find_user_by_firebase_uid(&foreign.uid).await {
                        Ok(Some(_)) => Ok(false),
                        Ok(None) => service
                            .sync_user(&foreign.uid)
                            .await
                            .map(|outcome| outcome.created),
                        Err(e) => Err(e),
                    };
                    (foreign.uid, outcome)
                }
            })
            .buffer_unordered(MAX_CONCURRENT_SYNCS)
            .collect()
            .await;

        let mut created = 0u32;
        for (uid, result) in results {
            match result {
                Ok(true) => created += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(uid = %uid, error = %e, "Failed to sync Firebase user")
                }
            }
        }

        tracing::info!(created, "Firebase user sweep complete");
        Ok(created)
    }

    /// Update display fields in both systems: the provider first, then the
    /// local row matched by `firebaseUID`.
    ///
    /// If the provider write succeeds and the local write then fails (for
    /// example no local row carries the UID yet), the provider keeps the new
    /// values while the local store does not; the error propagates and no
    /// compensation is attempted.
    pub async fn update_profile(
        &self,
        uid: &str,
        update: ProfileUpdate,
    ) -> Result<(FirebaseUser, User), AppError> {
        let attrs = UserUpdateAttrs {
            email: update.email.clone(),
            display_name: update.name.clone(),
            photo_url: update.photo_url.clone(),
            email_verified: update.email_verified,
            password: None,
        };

        let firebase_user = self.firebase.update_user(uid, &attrs).await?;

        let local = self
            .db
            .find_user_by_firebase_uid(uid)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No local user with firebaseUID {}", uid))
            })?;

        let local_update = UserUpdate {
            firebase_uid: None,
            name: update.name,
            email: update.email,
            image: update.photo_url,
            // Anything but an explicit true clears the local timestamp.
            email_verified: Some(if update.email_verified == Some(true) {
                Some(now_rfc3339())
            } else {
                None
            }),
        };

        let user = self.db.update_user(&local.id, &local_update).await?;

        tracing::info!(uid = %uid, user_id = %user.id, "Profile updated in both systems");

        Ok((firebase_user, user))
    }
}

/// Compute the field-level update that reconciles a stored user with its
/// Firebase record.
///
/// Foreign values are authoritative when present; absent foreign values keep
/// the stored ones. The verification flag is a lossy boolean: true re-stamps
/// "now at sync" (the provider never exposes the original instant), false
/// leaves the stored timestamp alone. A stored UID is never replaced.
pub fn reconcile(existing: &User, foreign: &FirebaseUser, now: &str) -> UserUpdate {
    let firebase_uid = match &existing.firebase_uid {
        None => Some(foreign.uid.clone()),
        Some(_) => None,
    };

    UserUpdate {
        firebase_uid,
        email: foreign.email.clone(),
        name: foreign.display_name.clone(),
        image: foreign.photo_url.clone(),
        email_verified: if foreign.email_verified {
            Some(Some(now.to_string()))
        } else {
            None
        },
    }
}

/// Build a fresh local user from a Firebase record, with the documented
/// defaults for identities that carry no email or display name.
fn new_user_from_foreign(foreign: &FirebaseUser, now: &str) -> User {
    User {
        id: uuid::Uuid::new_v4().to_string(),
        firebase_uid: Some(foreign.uid.clone()),
        email: foreign
            .email
            .clone()
            .unwrap_or_else(|| format!("{}@example.com", foreign.uid)),
        name: foreign
            .display_name
            .clone()
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
        image: foreign.photo_url.clone(),
        email_verified: foreign.email_verified.then(|| now.to_string()),
        password: None,
        created_at: now.to_string(),
        updated_at: now.to_string(),
    }
}
