// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloudinary media upload client.

use crate::config::Config;
use crate::error::AppError;
use serde::Deserialize;
use sha2::{Digest, Sha256};

const UPLOAD_BASE: &str = "https://api.cloudinary.com/v1_1";
/// Destination folder for scanned banana images.
const UPLOAD_FOLDER: &str = "BananaCare/bananaImages";

/// Cloudinary upload API client.
#[derive(Clone)]
pub struct CloudinaryClient {
    http: reqwest::Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

/// Upload result as returned by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudinaryUploadResult {
    pub public_id: String,
    pub secure_url: String,
}

impl CloudinaryClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: UPLOAD_BASE.to_string(),
            cloud_name: config.cloudinary_cloud_name.clone(),
            api_key: config.cloudinary_api_key.clone(),
            api_secret: config.cloudinary_api_secret.clone(),
        }
    }

    /// Upload an image buffer into the app's media folder.
    pub async fn upload(
        &self,
        data: Vec<u8>,
        filename: Option<String>,
    ) -> Result<CloudinaryUploadResult, AppError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("folder", UPLOAD_FOLDER), ("timestamp", &timestamp)],
            &self.api_secret,
        );

        let part = reqwest::multipart::Part::bytes(data)
            .file_name(filename.unwrap_or_else(|| "upload".to_string()));

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", UPLOAD_FOLDER)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let url = format!("{}/{}/image/upload", self.base_url, self.cloud_name);

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upload(format!("HTTP {}: {}", status, body)));
        }

        let result: CloudinaryUploadResult = response
            .json()
            .await
            .map_err(|e| AppError::Upload(format!("JSON parse error: {}", e)))?;

        tracing::info!(public_id = %result.public_id, "Image uploaded to Cloudinary");

        Ok(result)
    }
}

/// Build the upload request signature: parameters sorted by name, joined
/// `k=v` with `&`, secret appended, SHA-256 hex digest.
fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by_key(|(k, _)| *k);

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_params_is_deterministic() {
        let a = sign_params(&[("folder", "f"), ("timestamp", "123")], "secret");
        let b = sign_params(&[("folder", "f"), ("timestamp", "123")], "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn sign_params_sorts_by_parameter_name() {
        let a = sign_params(&[("timestamp", "123"), ("folder", "f")], "secret");
        let b = sign_params(&[("folder", "f"), ("timestamp", "123")], "secret");
        assert_eq!(a, b);
    }

    #[test]
    fn sign_params_depends_on_secret_and_values() {
        let base = sign_params(&[("timestamp", "123")], "secret");
        assert_ne!(base, sign_params(&[("timestamp", "123")], "other"));
        assert_ne!(base, sign_params(&[("timestamp", "124")], "secret"));
    }
}
