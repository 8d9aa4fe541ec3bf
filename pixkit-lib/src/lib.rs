//! PIX EMV-QR validation library.
//!
//! Parses and validates TLV-encoded PIX payment codes (EMV Merchant
//! Presented Mode), checks their CRC-16 integrity, and - for dynamic codes -
//! walks the trust chain: fetches the payment JWT from the embedded
//! endpoint, resolves the publisher's key set, verifies the RSA signature,
//! and cross-checks the claimed payee key and key-publisher domain.
//!
//! The crate stays stateless and delegates network and raster access to
//! callers through trait-based dependency injection.
//!
//! # Features
//!
//! - **Structural validation**: length/charset gate, mandatory-tag sweep,
//!   CRC-16/CCITT-FALSE verification
//! - **Dynamic trust chain**: URL extraction, JWT decode, key-set
//!   resolution, signature verification, payee-key cross-check
//! - **Collaborator seams**: HTTP fetching and QR raster codecs are traits
//!   owned by the host application
//!
//! # Example
//!
//! ```ignore
//! use pixkit_lib::{validate_pix_emv_code, HttpTokenFetcher, ValidationRequirement};
//!
//! let fetcher = HttpTokenFetcher::with_defaults()?;
//! let requirement = ValidationRequirement::new()
//!     .with_expected_domain("psp.example.com")
//!     .with_expected_pix_key("user@example.com");
//!
//! let report = validate_pix_emv_code(&fetcher, emv_code, Some(&requirement)).await?;
//! for warning in &report.warnings {
//!     println!("warning: {warning}");
//! }
//! ```

pub mod crc;
pub mod emv;
pub mod errors;
pub mod fetch;
pub mod jwt;
pub mod keyset;
pub mod pipeline;
pub mod prelude;
pub mod qr;
pub mod tlv;

/// Test utilities for PIX validation testing.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use errors::{ErrorCategory, PixError, PixErrorCode};
pub use fetch::{FetcherConfig, HttpTokenFetcher, RemoteTokenFetch};
pub use pipeline::{validate_pix_emv_code, validate_pix_emv_structure};
pub use qr::{
    generate_pix_qr_code_base64, generate_pix_qr_code_png, validate_pix_qr_code_png, QrDecoder,
    QrErrorCorrection, QrRenderer,
};

#[cfg(feature = "qr-codec")]
pub use qr::QrCodeRenderer;

/// Common result alias for PIX validation operations.
pub type Result<T> = std::result::Result<T, PixError>;

/// Caller-supplied trust anchor for dynamic-QR validation.
///
/// Both fields are optional; an empty requirement means structural
/// validation only. Setting either field turns on the full trust chain.
///
/// # Example
///
/// ```
/// use pixkit_lib::ValidationRequirement;
///
/// let requirement = ValidationRequirement::new()
///     .with_expected_domain("psp.example.com")
///     .with_expected_pix_key("user@example.com");
/// assert!(!requirement.is_empty());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidationRequirement {
    /// Domain the endpoint URL and the key-publisher URL must belong to
    /// (host-suffix match).
    pub expected_domain: Option<String>,
    /// Payee key (`chave`) the payment JWT must carry.
    pub expected_pix_key: Option<String>,
}

impl ValidationRequirement {
    /// Creates an empty requirement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires the endpoint and key URLs to belong to `domain`.
    pub fn with_expected_domain(mut self, domain: impl Into<String>) -> Self {
        self.expected_domain = Some(domain.into());
        self
    }

    /// Requires the payment JWT to claim the payee key `pix_key`.
    pub fn with_expected_pix_key(mut self, pix_key: impl Into<String>) -> Self {
        self.expected_pix_key = Some(pix_key.into());
        self
    }

    /// True when neither field requires anything.
    pub fn is_empty(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        blank(&self.expected_domain) && blank(&self.expected_pix_key)
    }
}

/// The dynamic-QR endpoint, as extracted and fetched.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PixUrlInfo {
    /// Endpoint URL from sub-field 25 of the merchant account information.
    pub url: String,
    /// The JWT fetched from it.
    pub jwt_token: String,
}

/// Successful validation outcome.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidationReport {
    /// Non-fatal findings: absent WARN-only tags.
    pub warnings: Vec<String>,
    /// The endpoint and token, when the trust chain ran.
    pub url_info: Option<PixUrlInfo>,
}

impl ValidationReport {
    /// True when the dynamic trust chain ran (and therefore passed).
    pub fn verified_dynamic(&self) -> bool {
        self.url_info.is_some()
    }
}
