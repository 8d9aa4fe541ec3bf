//! Error types for PIX validation.
//!
//! Every failure the pipeline can produce is a variant here, carrying the
//! offending values so a caller can reproduce the problem without re-running
//! the validation.

use std::fmt;

/// Error codes for FFI and mobile integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum PixErrorCode {
    /// Feature not implemented
    Unimplemented = 1000,
    /// Code length or charset violation
    InvalidShape = 2000,
    /// Malformed TLV field
    MalformedTlv = 3000,
    /// Mandatory critical tag absent
    MissingCriticalField = 3001,
    /// Trailing CRC field absent
    CrcFooterNotFound = 4000,
    /// CRC value does not match the payload
    CrcMismatch = 4001,
    /// Merchant account information is not a PIX account
    NotAPixCode = 5000,
    /// URL sub-field absent
    PixUrlNotFound = 5001,
    /// URL sub-field declared length exceeds the content
    UrlLengthMismatch = 5002,
    /// URL contains characters outside the allowed set
    InvalidUrlCharacters = 5003,
    /// URL host does not match the expected domain
    DomainNotFound = 5004,
    /// Remote fetch failed (transport or non-2xx)
    RemoteFetchFailed = 6000,
    /// JWT is not three base64url segments of JSON
    InvalidJwtFormat = 7000,
    /// No public-key URL could be resolved from the JWT
    KeyUrlNotFound = 7001,
    /// Public-key URL is not parseable
    InvalidKeyUrl = 7002,
    /// Public-key URL host does not match the expected domain
    KeyPublisherDomainMismatch = 7003,
    /// No published key matches the JWT's kid
    KeyNotFound = 8000,
    /// Matched key lacks usable RSA components
    IncompleteRsaKey = 8001,
    /// Matched key is not an RSA key
    UnsupportedKeyType = 8002,
    /// JWT is signed with an algorithm the verifier does not support
    UnsupportedAlgorithm = 8003,
    /// Cryptographic signature verification failed
    SignatureInvalid = 8004,
    /// Payee key claim absent from the JWT payload
    PixKeyClaimMissing = 9000,
    /// Payee key claim does not match the expected key
    PixKeyMismatch = 9001,
    /// No QR code found in the supplied image
    QrNotFound = 9500,
    /// QR rendering collaborator failed
    QrRenderFailed = 9501,
    /// QR decoding collaborator failed
    QrDecodeFailed = 9502,
    /// Internal/unexpected error
    Internal = 9999,
}

/// Failure taxonomy: which layer of the validation rejected the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Length and charset gate.
    InputShape,
    /// Malformed or missing TLV structure.
    StructuralTlv,
    /// Checksum violation.
    Integrity,
    /// Dynamic-QR trust chain: URL extraction, fetches, JWT, keys, claims.
    TrustChain,
    /// Injected collaborators (HTTP client construction, QR codecs) and
    /// internal failures.
    Collaborator,
}

/// Comprehensive error type for PIX validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixError {
    /// Feature not compiled in.
    Unimplemented(&'static str),

    /// The code fails the length or charset gate.
    InvalidShape {
        /// Human-readable description of the violation, with the offending
        /// measurement embedded.
        reason: String,
    },

    /// A TLV field could not be scanned.
    MalformedTlv {
        /// Offset of the field that failed to scan.
        offset: usize,
        /// Scanner diagnostic.
        detail: String,
    },

    /// One or more critical mandatory tags are absent.
    MissingCriticalField(Vec<String>),

    /// No well-formed CRC field terminates the code.
    CrcFooterNotFound,

    /// The trailing CRC does not match the recomputed checksum.
    CrcMismatch {
        /// CRC carried by the code, uppercased.
        provided: String,
        /// CRC recomputed over the payload, uppercased.
        calculated: String,
        /// The payload the checksum was computed over.
        payload: String,
    },

    /// The merchant account information does not identify a PIX account.
    NotAPixCode {
        /// What exactly was missing or wrong.
        detail: String,
    },

    /// The merchant account information carries no URL sub-field.
    PixUrlNotFound,

    /// The URL sub-field declares more characters than remain.
    UrlLengthMismatch {
        /// Declared value length.
        declared: usize,
        /// Characters actually available.
        available: usize,
    },

    /// The extracted URL contains characters outside `[a-zA-Z0-9\-./]`.
    InvalidUrlCharacters {
        /// The offending URL.
        url: String,
    },

    /// The payload URL host does not match the expected domain.
    DomainNotFound {
        /// Domain the caller required.
        domain: String,
        /// The URL that was checked.
        url: String,
    },

    /// A remote fetch failed; terminal for the validation call.
    RemoteFetchFailed {
        /// URL that was being fetched.
        url: String,
        /// Transport or status detail.
        detail: String,
    },

    /// The token is not a decodable three-segment JWT.
    InvalidJwtFormat {
        /// What failed: segment count, base64, or JSON.
        detail: String,
    },

    /// No public-key URL candidate was found in the JWT.
    KeyUrlNotFound,

    /// The resolved public-key URL cannot be parsed.
    InvalidKeyUrl {
        /// The unparseable URL.
        url: String,
    },

    /// The resolved public-key URL is published outside the expected domain.
    KeyPublisherDomainMismatch {
        /// Domain the caller required.
        expected: String,
        /// Host actually carried by the key URL.
        host: String,
        /// The key URL that was checked.
        url: String,
    },

    /// The key set has no entry for the JWT's key id.
    KeyNotFound {
        /// Key id taken from the JWT header.
        kid: String,
    },

    /// The matched key entry cannot be turned into an RSA public key.
    IncompleteRsaKey {
        /// Key id of the incomplete entry.
        kid: String,
        /// Which component is missing or malformed.
        detail: String,
    },

    /// The matched key entry is not an RSA key.
    UnsupportedKeyType {
        /// The `kty` value found.
        kty: String,
    },

    /// The JWT header names a signing algorithm outside the RSA family.
    UnsupportedAlgorithm {
        /// The `alg` value found.
        alg: String,
    },

    /// The signature does not verify against the resolved key.
    SignatureInvalid {
        /// Verifier diagnostic.
        detail: String,
    },

    /// The JWT payload carries no usable `chave` claim.
    PixKeyClaimMissing,

    /// The `chave` claim does not match the expected payee key.
    PixKeyMismatch {
        /// Payee key the caller required.
        expected: String,
        /// Payee key found in the token.
        found: String,
    },

    /// The supplied image contains no decodable QR code.
    QrNotFound,

    /// The QR rendering collaborator failed.
    QrRenderFailed {
        /// Collaborator diagnostic.
        detail: String,
    },

    /// The QR decoding collaborator failed.
    QrDecodeFailed {
        /// Collaborator diagnostic.
        detail: String,
    },

    /// Internal/unexpected error.
    Internal(String),
}

impl PixError {
    /// Get the error code for FFI/mobile integration.
    pub fn code(&self) -> PixErrorCode {
        match self {
            Self::Unimplemented(_) => PixErrorCode::Unimplemented,
            Self::InvalidShape { .. } => PixErrorCode::InvalidShape,
            Self::MalformedTlv { .. } => PixErrorCode::MalformedTlv,
            Self::MissingCriticalField(_) => PixErrorCode::MissingCriticalField,
            Self::CrcFooterNotFound => PixErrorCode::CrcFooterNotFound,
            Self::CrcMismatch { .. } => PixErrorCode::CrcMismatch,
            Self::NotAPixCode { .. } => PixErrorCode::NotAPixCode,
            Self::PixUrlNotFound => PixErrorCode::PixUrlNotFound,
            Self::UrlLengthMismatch { .. } => PixErrorCode::UrlLengthMismatch,
            Self::InvalidUrlCharacters { .. } => PixErrorCode::InvalidUrlCharacters,
            Self::DomainNotFound { .. } => PixErrorCode::DomainNotFound,
            Self::RemoteFetchFailed { .. } => PixErrorCode::RemoteFetchFailed,
            Self::InvalidJwtFormat { .. } => PixErrorCode::InvalidJwtFormat,
            Self::KeyUrlNotFound => PixErrorCode::KeyUrlNotFound,
            Self::InvalidKeyUrl { .. } => PixErrorCode::InvalidKeyUrl,
            Self::KeyPublisherDomainMismatch { .. } => PixErrorCode::KeyPublisherDomainMismatch,
            Self::KeyNotFound { .. } => PixErrorCode::KeyNotFound,
            Self::IncompleteRsaKey { .. } => PixErrorCode::IncompleteRsaKey,
            Self::UnsupportedKeyType { .. } => PixErrorCode::UnsupportedKeyType,
            Self::UnsupportedAlgorithm { .. } => PixErrorCode::UnsupportedAlgorithm,
            Self::SignatureInvalid { .. } => PixErrorCode::SignatureInvalid,
            Self::PixKeyClaimMissing => PixErrorCode::PixKeyClaimMissing,
            Self::PixKeyMismatch { .. } => PixErrorCode::PixKeyMismatch,
            Self::QrNotFound => PixErrorCode::QrNotFound,
            Self::QrRenderFailed { .. } => PixErrorCode::QrRenderFailed,
            Self::QrDecodeFailed { .. } => PixErrorCode::QrDecodeFailed,
            Self::Internal(_) => PixErrorCode::Internal,
        }
    }

    /// Which validation layer produced this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidShape { .. } => ErrorCategory::InputShape,
            Self::MalformedTlv { .. } | Self::MissingCriticalField(_) => {
                ErrorCategory::StructuralTlv
            }
            Self::CrcFooterNotFound | Self::CrcMismatch { .. } => ErrorCategory::Integrity,
            Self::NotAPixCode { .. }
            | Self::PixUrlNotFound
            | Self::UrlLengthMismatch { .. }
            | Self::InvalidUrlCharacters { .. }
            | Self::DomainNotFound { .. }
            | Self::RemoteFetchFailed { .. }
            | Self::InvalidJwtFormat { .. }
            | Self::KeyUrlNotFound
            | Self::InvalidKeyUrl { .. }
            | Self::KeyPublisherDomainMismatch { .. }
            | Self::KeyNotFound { .. }
            | Self::IncompleteRsaKey { .. }
            | Self::UnsupportedKeyType { .. }
            | Self::UnsupportedAlgorithm { .. }
            | Self::SignatureInvalid { .. }
            | Self::PixKeyClaimMissing
            | Self::PixKeyMismatch { .. } => ErrorCategory::TrustChain,
            Self::Unimplemented(_)
            | Self::QrNotFound
            | Self::QrRenderFailed { .. }
            | Self::QrDecodeFailed { .. }
            | Self::Internal(_) => ErrorCategory::Collaborator,
        }
    }

    /// Get the error message as an owned String (useful for FFI).
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Create a shape error.
    pub fn invalid_shape(reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            reason: reason.into(),
        }
    }

    /// Create a remote fetch error.
    pub fn remote_fetch_failed(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::RemoteFetchFailed {
            url: url.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for PixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unimplemented(label) => write!(f, "{} is not implemented yet", label),
            Self::InvalidShape { reason } => write!(f, "{}", reason),
            Self::MalformedTlv { offset, detail } => {
                write!(f, "malformed TLV at offset {}: {}", offset, detail)
            }
            Self::MissingCriticalField(fields) => {
                write!(f, "Missing critical EMV fields: {}", fields.join(", "))
            }
            Self::CrcFooterNotFound => {
                write!(f, "CRC field (63XX) not found at the end of EMV code")
            }
            Self::CrcMismatch {
                provided,
                calculated,
                payload,
            } => {
                write!(
                    f,
                    "CRC mismatch - Provided: {}, Calculated: {}. Payload: '{}'",
                    provided, calculated, payload
                )
            }
            Self::NotAPixCode { detail } => write!(f, "{}", detail),
            Self::PixUrlNotFound => {
                write!(f, "PIX URL (field 25) not found in Merchant Account Information")
            }
            Self::UrlLengthMismatch {
                declared,
                available,
            } => {
                write!(
                    f,
                    "PIX URL length mismatch: expected {}, but available content is {}",
                    declared, available
                )
            }
            Self::InvalidUrlCharacters { url } => {
                write!(f, "PIX URL '{}' contains invalid characters", url)
            }
            Self::DomainNotFound { domain, url } => {
                write!(
                    f,
                    "PIX URL '{}' does not match expected domain '{}'",
                    url, domain
                )
            }
            Self::RemoteFetchFailed { url, detail } => {
                write!(f, "fetch from '{}' failed: {}", url, detail)
            }
            Self::InvalidJwtFormat { detail } => write!(f, "Invalid JWT format: {}", detail),
            Self::KeyUrlNotFound => write!(f, "No public key URL found in JWT token"),
            Self::InvalidKeyUrl { url } => {
                write!(f, "Invalid public key URL format: '{}'", url)
            }
            Self::KeyPublisherDomainMismatch {
                expected,
                host,
                url,
            } => {
                write!(
                    f,
                    "Public key URL domain mismatch. Expected '{}', got '{}'. URL: '{}'",
                    expected, host, url
                )
            }
            Self::KeyNotFound { kid } => {
                write!(f, "No key found with kid '{}' in key set", kid)
            }
            Self::IncompleteRsaKey { kid, detail } => {
                write!(
                    f,
                    "Key with kid '{}' does not contain required RSA components: {}",
                    kid, detail
                )
            }
            Self::UnsupportedKeyType { kty } => write!(f, "Unsupported key type: {}", kty),
            Self::UnsupportedAlgorithm { alg } => {
                write!(f, "Unsupported signing algorithm: {}", alg)
            }
            Self::SignatureInvalid { detail } => {
                write!(f, "JWT signature validation failed: {}", detail)
            }
            Self::PixKeyClaimMissing => {
                write!(f, "PIX key 'chave' claim not found in JWT payload")
            }
            Self::PixKeyMismatch { expected, found } => {
                write!(f, "PIX key mismatch. Expected: {}, Found: {}", expected, found)
            }
            Self::QrNotFound => write!(f, "QR Code not found"),
            Self::QrRenderFailed { detail } => write!(f, "QR rendering failed: {}", detail),
            Self::QrDecodeFailed { detail } => write!(f, "QR decoding failed: {}", detail),
            Self::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for PixError {}

impl From<serde_json::Error> for PixError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
