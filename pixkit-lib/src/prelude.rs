//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits for
//! quick setup. Import everything with:
//!
//! ```rust,ignore
//! use pixkit_lib::prelude::*;
//! ```
//!
//! ## What's Included
//!
//! - Core types: `ValidationRequirement`, `ValidationReport`, `PixUrlInfo`
//! - Error types: `PixError`, `PixErrorCode`, `ErrorCategory`, `Result`
//! - Fetcher seam: `RemoteTokenFetch`, `HttpTokenFetcher`, `FetcherConfig`
//! - QR seam: `QrRenderer`, `QrDecoder`, `QrErrorCorrection`
//! - Entry points: `validate_pix_emv_code`, `validate_pix_emv_structure`

// Core types
pub use crate::{PixUrlInfo, ValidationReport, ValidationRequirement};

// Error handling
pub use crate::errors::{ErrorCategory, PixError, PixErrorCode};
pub use crate::Result;

// Fetcher seam
pub use crate::fetch::{FetcherConfig, HttpTokenFetcher, RemoteTokenFetch};

// QR seam
pub use crate::qr::{QrDecoder, QrErrorCorrection, QrRenderer};

// Entry points
pub use crate::pipeline::{validate_pix_emv_code, validate_pix_emv_structure};
pub use crate::qr::{
    generate_pix_qr_code_base64, generate_pix_qr_code_png, validate_pix_qr_code_png,
};

#[cfg(feature = "qr-codec")]
pub use crate::qr::QrCodeRenderer;
