//! The validation pipeline.
//!
//! One pipeline, fail-fast: structural validation first, then - only when
//! the caller supplied a non-empty [`ValidationRequirement`] - the dynamic
//! trust chain. The first violated invariant aborts the call with its
//! specific error; a dynamic code whose signature cannot be verified is
//! invalid, not merely unverified.

use url::Url;

use crate::emv;
use crate::errors::PixError;
use crate::fetch::{ensure_https, extract_jwt_from_body, RemoteTokenFetch};
use crate::jwt::{decode_jwt, resolve_key_url, validate_pix_key_claim};
use crate::keyset::{parse_key_set, resolve_key, verify_signature};
use crate::{PixUrlInfo, Result, ValidationReport, ValidationRequirement};

/// Lowercased host of `url`, prefixing `https://` when it has no scheme.
fn host_of(url: &str) -> Option<String> {
    Url::parse(&ensure_https(url))
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

/// Host-suffix domain match: the host must equal the domain or end with
/// `"." + domain`, case-insensitively.
///
/// This is deliberately stricter than substring containment: a domain
/// appearing in the path, or as a prefix of a longer registrable name,
/// does not match.
pub(crate) fn host_matches_domain(host: &str, domain: &str) -> bool {
    let domain = domain.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}

fn check_payload_domain(url: &str, domain: &str) -> Result<()> {
    let matches = host_of(url)
        .map(|host| host_matches_domain(&host, domain))
        .unwrap_or(false);
    if !matches {
        return Err(PixError::DomainNotFound {
            domain: domain.to_string(),
            url: url.to_string(),
        });
    }
    Ok(())
}

fn check_key_publisher_domain(key_url: &str, domain: &str) -> Result<()> {
    let host = host_of(key_url).ok_or_else(|| PixError::InvalidKeyUrl {
        url: key_url.to_string(),
    })?;
    if !host_matches_domain(&host, domain) {
        return Err(PixError::KeyPublisherDomainMismatch {
            expected: domain.to_ascii_lowercase(),
            host,
            url: key_url.to_string(),
        });
    }
    Ok(())
}

/// Validates the static structure of an EMV code: shape, mandatory tags,
/// CRC. No network access.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(emv_code), fields(code_len = emv_code.len())))]
pub fn validate_pix_emv_structure(emv_code: &str) -> Result<ValidationReport> {
    let warnings = emv::validate_structure(emv_code)?;
    Ok(ValidationReport {
        warnings,
        url_info: None,
    })
}

/// Validates an EMV code end to end.
///
/// Runs the structural checks, then - when `requirement` asks for it - the
/// dynamic trust chain: endpoint URL extraction, domain matching, token
/// fetch, offline JWT decode, key-set resolution, signature verification,
/// and the payee-key cross-check, in that order, short-circuiting on the
/// first failure.
///
/// # Examples
/// ```no_run
/// # use pixkit_lib::{validate_pix_emv_code, HttpTokenFetcher, ValidationRequirement};
/// # async fn demo(emv_code: &str) -> pixkit_lib::Result<()> {
/// let fetcher = HttpTokenFetcher::with_defaults()?;
/// let requirement = ValidationRequirement::new()
///     .with_expected_domain("psp.example.com")
///     .with_expected_pix_key("user@example.com");
/// let report = validate_pix_emv_code(&fetcher, emv_code, Some(&requirement)).await?;
/// assert!(report.url_info.is_some());
/// # Ok(())
/// # }
/// ```
#[cfg_attr(feature = "tracing", tracing::instrument(skip(fetcher, emv_code), fields(code_len = emv_code.len())))]
pub async fn validate_pix_emv_code<F>(
    fetcher: &F,
    emv_code: &str,
    requirement: Option<&ValidationRequirement>,
) -> Result<ValidationReport>
where
    F: RemoteTokenFetch,
{
    let warnings = emv::validate_structure(emv_code)?;

    let requirement = match requirement.filter(|r| !r.is_empty()) {
        Some(r) => r,
        None => {
            return Ok(ValidationReport {
                warnings,
                url_info: None,
            })
        }
    };

    let url = emv::extract_pix_url(emv_code)?;
    if let Some(domain) = requirement.expected_domain.as_deref() {
        check_payload_domain(&url, domain)?;
    }

    let body = fetcher.fetch_token(&url).await?;
    let jwt_token = extract_jwt_from_body(&url, &body)?;

    let token = decode_jwt(&jwt_token)?;
    let key_url = resolve_key_url(&token)?;
    if let Some(domain) = requirement.expected_domain.as_deref() {
        check_key_publisher_domain(&key_url, domain)?;
    }

    let key_set_body = fetcher.fetch_key_set(&key_url).await?;
    let key_set = parse_key_set(&key_url, &key_set_body)?;
    let kid = token.header.kid.clone().unwrap_or_default();
    let entry = resolve_key(&key_set, &kid)?;
    verify_signature(&token, entry)?;

    if let Some(expected) = requirement
        .expected_pix_key
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        validate_pix_key_claim(&token.payload, expected)?;
    }

    Ok(ValidationReport {
        warnings,
        url_info: Some(PixUrlInfo {
            url,
            jwt_token,
        }),
    })
}
