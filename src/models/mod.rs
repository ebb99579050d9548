// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod inquiry;
pub mod scan;
pub mod user;

pub use inquiry::{InquiryMessage, InquiryStatus, InquiryUpdate};
pub use scan::ScanResult;
pub use user::{Account, User, UserUpdate};
