//! Structural validation of PIX EMV codes.
//!
//! This module owns the offline part of the pipeline: the length/charset
//! gate, the mandatory-tag sweep, the trailing CRC verification, and the
//! extraction of the merchant account information (tag 26) with its
//! dynamic-QR endpoint URL.

use crate::crc::{crc16_ccitt_false, format_crc};
use crate::errors::PixError;
use crate::tlv::{scan, scan_all, TlvError, TlvField};
use crate::Result;

/// Minimum accepted EMV code length.
pub const MIN_LENGTH: usize = 50;

/// Maximum accepted EMV code length.
pub const MAX_LENGTH: usize = 512;

/// Globally unique identifier every PIX merchant account must carry in
/// sub-field 00 of tag 26.
pub const PIX_GUI: &str = "br.gov.bcb.pix";

/// Mandatory top-level tags: `(tag, description, critical)`.
///
/// Critical tags fail the validation when absent; the others are recorded
/// as warnings only. This asymmetry is load-bearing: real-world PIX codes
/// omit the non-critical tags often enough that failing on them would
/// reject valid payments.
const MANDATORY_FIELDS: [(&str, &str, bool); 10] = [
    ("00", "Payload Format Indicator (00)", true),
    ("01", "Point of Initiation Method (01)", false),
    ("26", "Merchant Account Information (26)", false),
    ("52", "Merchant Category Code (52)", true),
    ("53", "Transaction Currency (53)", true),
    ("58", "Country Code (58)", true),
    ("59", "Merchant Name (59)", false),
    ("60", "Merchant City (60)", false),
    ("62", "Additional Data Field (62)", false),
    ("63", "CRC (63)", true),
];

/// Merchant account information extracted from tag 26.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerchantAccountInfo {
    /// The GUI sub-field (tag 00); always `br.gov.bcb.pix` once validated.
    pub gui: String,
    /// The dynamic-QR endpoint URL (tag 25), when present.
    pub url: Option<String>,
}

fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c.is_ascii_whitespace()
        || matches!(c, '-' | '.' | '+' | '*' | '/' | '@')
}

/// Length and charset gate.
///
/// The charset also guarantees the code is pure ASCII, which the CRC engine
/// relies on.
pub(crate) fn check_shape(code: &str) -> Result<()> {
    if code.trim().is_empty() {
        return Err(PixError::invalid_shape("EMV code is missing or empty"));
    }
    if code.len() < MIN_LENGTH {
        return Err(PixError::invalid_shape(format!(
            "EMV code too short ({} characters). Expected at least {} characters",
            code.len(),
            MIN_LENGTH
        )));
    }
    if code.len() > MAX_LENGTH {
        return Err(PixError::invalid_shape(format!(
            "EMV code too long ({} characters). Expected maximum {} characters",
            code.len(),
            MAX_LENGTH
        )));
    }
    if !code.chars().all(is_allowed_char) {
        return Err(PixError::invalid_shape(
            "EMV code contains invalid characters. Only alphanumeric and basic symbols are allowed",
        ));
    }
    Ok(())
}

/// Verifies the trailing CRC field against the recomputed checksum.
///
/// The payload is the code with the four CRC hex digits stripped; the
/// `6304` tag-length prefix itself stays in the checksummed text.
fn check_crc(code: &str, fields: &[TlvField<'_>]) -> Result<()> {
    let footer = match fields.last() {
        Some(f) if f.tag == "63" => f,
        _ => return Err(PixError::CrcFooterNotFound),
    };
    if footer.value.len() != 4 || !footer.value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(PixError::CrcFooterNotFound);
    }

    let provided = footer.value.to_ascii_uppercase();
    let payload = &code[..code.len() - 4];
    let calculated = format_crc(crc16_ccitt_false(payload));

    if provided != calculated {
        return Err(PixError::CrcMismatch {
            provided,
            calculated,
            payload: payload.to_string(),
        });
    }
    Ok(())
}

/// Validates the static structure of an EMV code: shape, mandatory tags,
/// and CRC.
///
/// Returns the list of non-fatal warnings (absent WARN-only tags). Any
/// other violation aborts with the specific error.
pub fn validate_structure(code: &str) -> Result<Vec<String>> {
    check_shape(code)?;

    let fields = scan_all(code)?;

    let mut missing_critical = Vec::new();
    let mut warnings = Vec::new();

    for (tag, description, critical) in MANDATORY_FIELDS {
        let present = if tag == "00" {
            // The payload format indicator must open the code.
            fields.first().map(|f| f.tag) == Some("00")
        } else {
            fields.iter().any(|f| f.tag == tag)
        };

        if !present {
            if critical {
                missing_critical.push(description.to_string());
            } else {
                #[cfg(feature = "tracing")]
                tracing::warn!(field = description, "optional EMV field missing");
                warnings.push(format!("Missing optional EMV field: {description}"));
            }
        }
    }

    if !missing_critical.is_empty() {
        return Err(PixError::MissingCriticalField(missing_critical));
    }

    check_crc(code, &fields)?;

    Ok(warnings)
}

/// Extracts the merchant account information (tag 26) and validates its
/// PIX identity.
pub fn extract_merchant_account(code: &str) -> Result<MerchantAccountInfo> {
    let mut account_field = None;
    for field in crate::tlv::TlvScanner::new(code) {
        let field = field?;
        if field.tag == "26" {
            account_field = Some(field);
            break;
        }
    }
    let account_field = account_field.ok_or_else(|| PixError::NotAPixCode {
        detail: "Field 26 (Merchant Account Information) not found in EMV code".to_string(),
    })?;

    let region = account_field.value;
    let mut gui: Option<&str> = None;
    let mut url: Option<&str> = None;

    let mut offset = 0;
    while offset < region.len() {
        match scan(region, offset) {
            Ok((field, next)) => {
                match field.tag {
                    "00" if gui.is_none() => gui = Some(field.value),
                    "25" if url.is_none() => url = Some(field.value),
                    _ => {}
                }
                offset = next;
            }
            // A URL whose declared length overruns the region is its own
            // failure mode, distinct from generic malformed TLV.
            Err(TlvError::TruncatedValue {
                offset: at,
                declared,
                available,
            }) if region.get(at..at + 2) == Some("25") => {
                return Err(PixError::UrlLengthMismatch {
                    declared,
                    available,
                });
            }
            Err(err) => return Err(err.into()),
        }
    }

    match gui {
        Some(PIX_GUI) => {}
        _ => {
            return Err(PixError::NotAPixCode {
                detail: format!(
                    "PIX identifier ({PIX_GUI}) not found in field 26 - may not be a valid PIX code"
                ),
            })
        }
    }

    Ok(MerchantAccountInfo {
        gui: PIX_GUI.to_string(),
        url: url.map(str::to_string),
    })
}

/// Extracts and charset-validates the dynamic-QR endpoint URL from tag 26.
pub fn extract_pix_url(code: &str) -> Result<String> {
    let account = extract_merchant_account(code)?;
    let url = account.url.ok_or(PixError::PixUrlNotFound)?;

    let valid = !url.is_empty()
        && url
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '/'));
    if !valid {
        return Err(PixError::InvalidUrlCharacters { url });
    }

    Ok(url)
}
