// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase Auth (Identity Toolkit) client.
//!
//! Handles:
//! - User lookup, creation, update, deletion and listing
//! - Custom claims
//! - ID token verification against the securetoken JWKS
//! - Service-account access token minting with in-memory caching
//!
//! All operations are administrative, user-triggered remote calls: failures
//! are logged once at this boundary and re-signaled unchanged, with no
//! retries or backoff.

use crate::config::{Config, ServiceAccountKey};
use crate::error::AppError;
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

const IDENTITY_TOOLKIT_BASE: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURETOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const TOKEN_SCOPES: &str =
    "https://www.googleapis.com/auth/identitytoolkit https://www.googleapis.com/auth/firebase";
const DEFAULT_HTTP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);
const JWKS_CACHE_TTL: std::time::Duration = std::time::Duration::from_secs(300);

/// Margin before access token expiration when we proactively re-mint.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
const CLOCK_SKEW_SECS: u64 = 60;

/// List page size for the user sweep (provider maximum is 1000).
const LIST_PAGE_SIZE: u32 = 500;

/// Foreign identity record as reported by Firebase Auth.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub email_verified: bool,
}

/// Attributes for creating a new Firebase user.
#[derive(Debug, Clone, Default)]
pub struct NewUserAttrs {
    pub email: String,
    pub password: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: Option<bool>,
}

/// Partial update for a Firebase user; absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdateAttrs {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: Option<bool>,
    pub password: Option<String>,
}

/// Verified claims extracted from a Firebase ID token.
#[derive(Debug, Clone)]
pub struct DecodedIdToken {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
}

#[derive(Clone)]
struct CachedAccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Firebase Auth client for one project, authenticated by a service account.
///
/// Constructed once at startup and shared via `AppState`; the minted access
/// token and the securetoken JWKS are cached in memory behind read/write
/// locks with a separate refresh mutex each, so concurrent requests do not
/// stampede the token endpoint.
pub struct FirebaseAuthClient {
    http: reqwest::Client,
    project_id: String,
    service_account: ServiceAccountKey,
    base_url: String,
    emulator: bool,
    token_cache: RwLock<Option<CachedAccessToken>>,
    token_refresh_lock: Mutex<()>,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    jwks_refresh_lock: Mutex<()>,
}

impl FirebaseAuthClient {
    /// Create a client from the loaded configuration.
    ///
    /// For local development with the Auth emulator, set
    /// FIREBASE_AUTH_EMULATOR_HOST; requests then go unauthenticated to the
    /// emulator endpoint.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building Firebase Auth HTTP client")?;

        let (base_url, emulator) = match std::env::var("FIREBASE_AUTH_EMULATOR_HOST") {
            Ok(host) => (
                format!("http://{}/identitytoolkit.googleapis.com/v1", host),
                true,
            ),
            Err(_) => (IDENTITY_TOOLKIT_BASE.to_string(), false),
        };

        if emulator {
            tracing::info!(base_url = %base_url, "Using Firebase Auth emulator");
        }

        Ok(Self {
            http,
            project_id: config.firebase_project_id.clone(),
            service_account: config.service_account.clone(),
            base_url,
            emulator,
            token_cache: RwLock::new(None),
            token_refresh_lock: Mutex::new(()),
            jwks_cache: RwLock::new(None),
            jwks_refresh_lock: Mutex::new(()),
        })
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Fetch a Firebase user by UID.
    pub async fn get_user_by_uid(&self, uid: &str) -> Result<FirebaseUser, AppError> {
        let body = serde_json::json!({ "localId": [uid] });
        let response: LookupResponse = self.post_accounts(":lookup", &body).await?;

        response
            .users
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(FirebaseUser::from)
            .ok_or_else(|| AppError::NotFound(format!("No Firebase user with UID {}", uid)))
    }

    /// Fetch a Firebase user by email address.
    pub async fn get_user_by_email(&self, email: &str) -> Result<FirebaseUser, AppError> {
        let body = serde_json::json!({ "email": [email] });
        let response: LookupResponse = self.post_accounts(":lookup", &body).await?;

        response
            .users
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(FirebaseUser::from)
            .ok_or_else(|| AppError::NotFound(format!("No Firebase user with email {}", email)))
    }

    /// Create a new Firebase user and return the full stored record.
    pub async fn create_user(&self, attrs: &NewUserAttrs) -> Result<FirebaseUser, AppError> {
        let mut body = serde_json::Map::new();
        body.insert("email".into(), serde_json::json!(attrs.email));
        if let Some(password) = &attrs.password {
            body.insert("password".into(), serde_json::json!(password));
        }
        if let Some(name) = &attrs.display_name {
            body.insert("displayName".into(), serde_json::json!(name));
        }
        if let Some(url) = &attrs.photo_url {
            body.insert("photoUrl".into(), serde_json::json!(url));
        }
        if let Some(verified) = attrs.email_verified {
            body.insert("emailVerified".into(), serde_json::json!(verified));
        }

        let created: SignUpResponse = self
            .post_accounts("", &serde_json::Value::Object(body))
            .await?;
        tracing::info!(uid = %created.local_id, "Firebase user created");

        // The create response is sparse; fetch the full record.
        self.get_user_by_uid(&created.local_id).await
    }

    /// Partially update a Firebase user; unspecified fields are left unchanged.
    pub async fn update_user(
        &self,
        uid: &str,
        attrs: &UserUpdateAttrs,
    ) -> Result<FirebaseUser, AppError> {
        let mut body = serde_json::Map::new();
        body.insert("localId".into(), serde_json::json!(uid));
        if let Some(email) = &attrs.email {
            body.insert("email".into(), serde_json::json!(email));
        }
        if let Some(name) = &attrs.display_name {
            body.insert("displayName".into(), serde_json::json!(name));
        }
        if let Some(url) = &attrs.photo_url {
            body.insert("photoUrl".into(), serde_json::json!(url));
        }
        if let Some(verified) = attrs.email_verified {
            body.insert("emailVerified".into(), serde_json::json!(verified));
        }
        if let Some(password) = &attrs.password {
            body.insert("password".into(), serde_json::json!(password));
        }

        let _: serde_json::Value = self
            .post_accounts(":update", &serde_json::Value::Object(body))
            .await?;
        tracing::info!(uid = %uid, "Firebase user updated");

        self.get_user_by_uid(uid).await
    }

    /// Delete a Firebase user by UID.
    pub async fn delete_user(&self, uid: &str) -> Result<(), AppError> {
        let body = serde_json::json!({ "localId": uid });
        let _: serde_json::Value = self.post_accounts(":delete", &body).await?;
        tracing::info!(uid = %uid, "Firebase user deleted");
        Ok(())
    }

    /// List up to `max_results` Firebase users, following pagination.
    pub async fn list_all_users(&self, max_results: u32) -> Result<Vec<FirebaseUser>, AppError> {
        let mut users = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let remaining = max_results.saturating_sub(users.len() as u32);
            if remaining == 0 {
                break;
            }

            let url = format!(
                "{}/projects/{}/accounts:batchGet",
                self.base_url, self.project_id
            );
            let mut request = self
                .http
                .get(&url)
                .query(&[("maxResults", remaining.min(LIST_PAGE_SIZE).to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("nextPageToken", token.as_str())]);
            }

            let request = self.authorize(request).await?;
            let response = request
                .send()
                .await
                .map_err(|e| AppError::FirebaseAuth(e.to_string()))?;
            let page: BatchGetResponse = self.check_response_json(response).await?;

            users.extend(
                page.users
                    .unwrap_or_default()
                    .into_iter()
                    .map(FirebaseUser::from),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(count = users.len(), "Listed Firebase users");
        Ok(users)
    }

    /// Set custom claims on a Firebase user.
    ///
    /// Claims are serialized into the `customAttributes` JSON string the
    /// provider stores verbatim.
    pub async fn set_custom_claims(
        &self,
        uid: &str,
        claims: &serde_json::Value,
    ) -> Result<(), AppError> {
        let body = serde_json::json!({
            "localId": uid,
            "customAttributes": claims.to_string(),
        });
        let _: serde_json::Value = self.post_accounts(":update", &body).await?;
        tracing::info!(uid = %uid, "Custom claims set");
        Ok(())
    }

    // ─── ID Token Verification ───────────────────────────────────

    /// Verify a Firebase ID token and return its decoded identity claims.
    pub async fn verify_id_token(&self, token: &str) -> Result<DecodedIdToken, AppError> {
        let expected_issuer = format!("https://securetoken.google.com/{}", self.project_id);

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[expected_issuer.as_str()]);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let header = decode_header(token)
            .map_err(|e| AppError::FirebaseAuth(format!("invalid JWT header: {e}")))?;

        if header.alg != Algorithm::RS256 {
            return Err(AppError::FirebaseAuth(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| AppError::FirebaseAuth("missing JWT kid".to_string()))?;

        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let token_data = decode::<IdTokenClaims>(token, decoding_key.as_ref(), &validation)
            .map_err(|e| AppError::FirebaseAuth(format!("ID token validation failed: {e}")))?;

        let claims = token_data.claims;
        if claims.sub.is_empty() {
            return Err(AppError::FirebaseAuth("empty subject claim".to_string()));
        }

        Ok(DecodedIdToken {
            uid: claims.sub,
            email: claims.email,
            email_verified: claims.email_verified.unwrap_or(false),
        })
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, AppError> {
        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(AppError::FirebaseAuth(format!(
            "JWT kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, force_refresh: bool) -> Result<(), AppError> {
        let _guard = self.jwks_refresh_lock.lock().await;

        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if cache
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
            {
                return Ok(());
            }
        }

        tracing::debug!(url = SECURETOKEN_JWKS_URL, "Refreshing securetoken JWKS cache");

        let response = self
            .http
            .get(SECURETOKEN_JWKS_URL)
            .send()
            .await
            .map_err(|e| AppError::FirebaseAuth(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::FirebaseAuth(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| AppError::FirebaseAuth(format!("invalid JWKS JSON: {e}")))?;

        let mut keys_by_kid: HashMap<String, Arc<DecodingKey>> = HashMap::new();

        for jwk in jwks.keys {
            if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
                continue;
            }

            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    keys_by_kid.insert(jwk.kid, Arc::new(key));
                }
                Err(e) => {
                    tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
                }
            }
        }

        if keys_by_kid.is_empty() {
            return Err(AppError::FirebaseAuth(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        *self.jwks_cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + JWKS_CACHE_TTL,
        });

        Ok(())
    }

    // ─── Access Token Minting ────────────────────────────────────

    /// Get a valid service-account access token, minting one if needed.
    async fn access_token(&self) -> Result<String, AppError> {
        if self.emulator {
            // Emulator accepts the well-known owner token.
            return Ok("owner".to_string());
        }

        let now = Utc::now();
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);

        if let Some(cached) = self.token_cache.read().await.as_ref() {
            if now + margin < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }

        let _guard = self.token_refresh_lock.lock().await;

        // Another task may have minted a token while we waited for the lock.
        if let Some(cached) = self.token_cache.read().await.as_ref() {
            if now + margin < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }

        let (token, expires_at) = self.mint_access_token().await?;

        *self.token_cache.write().await = Some(CachedAccessToken {
            token: token.clone(),
            expires_at,
        });

        tracing::debug!("Service-account access token minted and cached");
        Ok(token)
    }

    /// Mint an OAuth2 access token from the service-account key:
    /// sign a JWT assertion and exchange it at the token endpoint.
    async fn mint_access_token(&self) -> Result<(String, DateTime<Utc>), AppError> {
        let now = Utc::now();
        let claims = AssertionClaims {
            iss: self.service_account.client_email.clone(),
            scope: TOKEN_SCOPES.to_string(),
            aud: self.service_account.token_uri.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.service_account.private_key_id.clone();

        let encoding_key = EncodingKey::from_rsa_pem(self.service_account.private_key.as_bytes())
            .map_err(|e| {
                AppError::FirebaseAuth(format!("invalid service account private key: {e}"))
            })?;

        let assertion = jsonwebtoken::encode(&header, &claims, &encoding_key)
            .map_err(|e| AppError::FirebaseAuth(format!("failed to sign assertion: {e}")))?;

        let response = self
            .http
            .post(&self.service_account.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::FirebaseAuth(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Token exchange failed");
            return Err(AppError::FirebaseAuth(format!(
                "token exchange failed with status {}",
                status
            )));
        }

        let token: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::FirebaseAuth(format!("invalid token response: {e}")))?;

        let expires_at = now + Duration::seconds(token.expires_in);
        Ok((token.access_token, expires_at))
    }

    // ─── Request Plumbing ────────────────────────────────────────

    /// POST to `projects/{project}/accounts{action}` and parse the response.
    async fn post_accounts<T: for<'de> Deserialize<'de>>(
        &self,
        action: &str,
        body: &serde_json::Value,
    ) -> Result<T, AppError> {
        let url = format!(
            "{}/projects/{}/accounts{}",
            self.base_url, self.project_id, action
        );

        let request = self.authorize(self.http.post(&url).json(body)).await?;
        let response = request
            .send()
            .await
            .map_err(|e| AppError::FirebaseAuth(e.to_string()))?;

        self.check_response_json(response).await
    }

    async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, AppError> {
        let token = self.access_token().await?;
        Ok(request.bearer_auth(token))
    }

    /// Check response status, translating provider error codes; parse JSON body.
    ///
    /// This is the single logging point for provider failures.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body).unwrap_or_else(|| body.clone());

            let err = translate_provider_error(&message);
            tracing::error!(status = %status, message = %message, "Identity Toolkit error");
            return Err(err);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::FirebaseAuth(format!("JSON parse error: {}", e)))
    }
}

/// Pull the `error.message` code out of an Identity Toolkit error body.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(ToString::to_string)
}

/// Translate an Identity Toolkit error code into the application taxonomy.
///
/// The code may carry a trailing explanation ("INVALID_EMAIL : ..."), so only
/// the leading token is matched.
fn translate_provider_error(message: &str) -> AppError {
    let code = message
        .split([' ', ':'])
        .next()
        .unwrap_or(message)
        .trim();

    match code {
        "USER_NOT_FOUND" | "EMAIL_NOT_FOUND" => AppError::NotFound(message.to_string()),
        "EMAIL_EXISTS" | "DUPLICATE_EMAIL" | "DUPLICATE_LOCAL_ID" => {
            AppError::Conflict(message.to_string())
        }
        c if c.starts_with("INVALID_") || c.starts_with("MISSING_") || c == "WEAK_PASSWORD" => {
            AppError::BadRequest(message.to_string())
        }
        _ => AppError::FirebaseAuth(message.to_string()),
    }
}

// ─── Wire Types ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Option<Vec<ApiUserInfo>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    users: Option<Vec<ApiUserInfo>>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUserInfo {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

impl From<ApiUserInfo> for FirebaseUser {
    fn from(info: ApiUserInfo) -> Self {
        Self {
            uid: info.local_id,
            // The provider reports a missing email as an empty string in some
            // responses; normalize to None.
            email: info.email.filter(|e| !e.is_empty()),
            display_name: info.display_name.filter(|n| !n.is_empty()),
            photo_url: info.photo_url.filter(|u| !u.is_empty()),
            email_verified: info.email_verified,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[allow(dead_code)]
    aud: String,
    #[allow(dead_code)]
    iss: String,
    #[allow(dead_code)]
    exp: usize,
    email: Option<String>,
    email_verified: Option<bool>,
}
