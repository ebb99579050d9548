// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scan result model for storage and API.

use serde::{Deserialize, Serialize};

/// Stored ripeness scan record.
///
/// `percentage` and `result_arr` come from an external image-classification
/// process and are recorded here as opaque values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    /// Internally generated ID (also used as document ID)
    pub id: String,
    /// Submitting client address
    pub address: String,
    /// Ripeness percentage reported by the classifier
    pub percentage: f64,
    /// Classifier verdict label
    pub result: String,
    /// Raw classifier output vector
    pub result_arr: Vec<f64>,
    /// Public URL of the scanned image
    pub img_url: String,
    pub created_at: String,
}
