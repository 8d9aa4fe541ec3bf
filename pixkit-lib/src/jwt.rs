//! Offline JWT decoding and claim inspection.
//!
//! Decoding here is purely structural: split on `.`, base64url-decode the
//! header and payload, parse them as JSON. A token that decodes is not a
//! token that verifies - signature validity is established separately by
//! [`crate::keyset::verify_signature`] against a resolved public key.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::{Map, Value};

use crate::errors::PixError;
use crate::Result;

/// Claim names searched (case-insensitively) on the payload for the
/// public-key location, in priority order.
const KEY_URL_CLAIMS: [&str; 5] = ["jku", "jwks_uri", "x5u", "key_url", "public_key_url"];

/// Decoded JWT header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JwtHeader {
    /// Signing algorithm, e.g. `RS256`.
    pub alg: String,
    /// Token type, when declared.
    pub typ: Option<String>,
    /// Key id used to select the published key.
    pub kid: Option<String>,
    /// Every other header parameter, kept for key-URL resolution.
    pub extra: Map<String, Value>,
}

/// Decoded JWT payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JwtPayload {
    /// Issuer (`iss`), when present.
    pub iss: Option<String>,
    /// Audience (`aud`); the first element when multi-valued.
    pub aud: Option<String>,
    /// Subject (`sub`), when present.
    pub sub: Option<String>,
    /// The full claim map, including the fields above.
    pub claims: Map<String, Value>,
}

impl JwtPayload {
    /// Returns the named claim as a non-empty string, if present.
    pub fn claim_str(&self, name: &str) -> Option<&str> {
        self.claims
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Like [`claim_str`](Self::claim_str), but matching the claim name
    /// case-insensitively.
    pub fn claim_str_ignore_case(&self, name: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }
}

/// A decoded token. Immutable; holds the raw compact form for later
/// signature verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JwtToken {
    /// Decoded header.
    pub header: JwtHeader,
    /// Decoded payload.
    pub payload: JwtPayload,
    /// The raw (still base64url) signature segment.
    pub signature: String,
    raw: String,
}

impl JwtToken {
    /// The compact serialization this token was decoded from.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

fn decode_segment(segment: &str, what: &str) -> Result<Value> {
    // Compact JWTs are unpadded; tolerate stray padding anyway.
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| PixError::InvalidJwtFormat {
            detail: format!("{what} is not valid base64url: {e}"),
        })?;
    serde_json::from_slice(&bytes).map_err(|e| PixError::InvalidJwtFormat {
        detail: format!("{what} is not valid JSON: {e}"),
    })
}

fn string_field(obj: &Map<String, Value>, name: &str) -> Option<String> {
    obj.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Decodes a compact JWT without verifying its signature.
pub fn decode_jwt(token: &str) -> Result<JwtToken> {
    let token = token.trim();
    if token.is_empty() {
        return Err(PixError::InvalidJwtFormat {
            detail: "token is empty".to_string(),
        });
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(PixError::InvalidJwtFormat {
            detail: format!("expected 3 segments, got {}", parts.len()),
        });
    }

    let header_value = decode_segment(parts[0], "header")?;
    let header_obj = header_value
        .as_object()
        .ok_or_else(|| PixError::InvalidJwtFormat {
            detail: "header is not a JSON object".to_string(),
        })?;

    let payload_value = decode_segment(parts[1], "payload")?;
    let payload_obj = payload_value
        .as_object()
        .ok_or_else(|| PixError::InvalidJwtFormat {
            detail: "payload is not a JSON object".to_string(),
        })?;

    let alg = string_field(header_obj, "alg").unwrap_or_default();
    let mut extra = header_obj.clone();
    extra.remove("alg");
    extra.remove("typ");
    extra.remove("kid");

    let header = JwtHeader {
        alg,
        typ: string_field(header_obj, "typ"),
        kid: string_field(header_obj, "kid"),
        extra,
    };

    let aud = match payload_obj.get("aud") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Array(items)) => items
            .iter()
            .find_map(Value::as_str)
            .map(str::to_string),
        _ => None,
    };

    let payload = JwtPayload {
        iss: string_field(payload_obj, "iss"),
        aud,
        sub: string_field(payload_obj, "sub"),
        claims: payload_obj.clone(),
    };

    Ok(JwtToken {
        header,
        payload,
        signature: parts[2].to_string(),
        raw: token.to_string(),
    })
}

/// Resolves where the token's public key is published.
///
/// Candidates, in order: a key-URL claim on the payload, a `jku`/`x5u`
/// header parameter, then the issuer's `/.well-known/jwks.json`. No
/// candidate means the trust chain cannot continue.
pub fn resolve_key_url(token: &JwtToken) -> Result<String> {
    for claim in KEY_URL_CLAIMS {
        if let Some(url) = token.payload.claim_str_ignore_case(claim) {
            return Ok(url.to_string());
        }
    }

    for param in ["jku", "x5u"] {
        if let Some(url) = token
            .header
            .extra
            .get(param)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
        {
            return Ok(url.to_string());
        }
    }

    if let Some(iss) = token.payload.iss.as_deref().filter(|s| !s.trim().is_empty()) {
        return Ok(format!("{}/.well-known/jwks.json", iss.trim_end_matches('/')));
    }

    Err(PixError::KeyUrlNotFound)
}

/// Cross-checks the payee key claim (`chave`) against the expected key.
///
/// Returns the key found in the token on success. Comparison is
/// case-insensitive, matching how PIX keys are issued.
pub fn validate_pix_key_claim(payload: &JwtPayload, expected: &str) -> Result<String> {
    let found = payload
        .claim_str("chave")
        .ok_or(PixError::PixKeyClaimMissing)?;

    if !found.eq_ignore_ascii_case(expected) {
        return Err(PixError::PixKeyMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }

    Ok(found.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use serde_json::json;

    fn forge(header: Value, payload: Value) -> String {
        format!(
            "{}.{}.c2ln",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(payload.to_string()),
        )
    }

    #[test]
    fn test_decode_extracts_header_and_payload() {
        let token = forge(
            json!({"alg": "RS256", "typ": "JWT", "kid": "key-1"}),
            json!({
                "iss": "https://psp.example.com",
                "aud": ["wallet", "other"],
                "sub": "cobv-123",
                "chave": "user@example.com"
            }),
        );

        let decoded = decode_jwt(&token).unwrap();
        assert_eq!(decoded.header.alg, "RS256");
        assert_eq!(decoded.header.kid.as_deref(), Some("key-1"));
        assert_eq!(decoded.payload.iss.as_deref(), Some("https://psp.example.com"));
        assert_eq!(decoded.payload.aud.as_deref(), Some("wallet"));
        assert_eq!(decoded.payload.sub.as_deref(), Some("cobv-123"));
        assert_eq!(decoded.payload.claim_str("chave"), Some("user@example.com"));
        assert_eq!(decoded.signature, "c2ln");
        assert_eq!(decoded.raw(), token);
    }

    #[test]
    fn test_decode_rejects_wrong_segment_count() {
        let err = decode_jwt("onlyone.twosegments").unwrap_err();
        match err {
            PixError::InvalidJwtFormat { detail } => {
                assert!(detail.contains("got 2"), "{detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_bad_base64_and_bad_json() {
        assert!(matches!(
            decode_jwt("!!!.e30.sig"),
            Err(PixError::InvalidJwtFormat { .. })
        ));

        let not_json = URL_SAFE_NO_PAD.encode("not json");
        assert!(matches!(
            decode_jwt(&format!("{not_json}.e30.sig")),
            Err(PixError::InvalidJwtFormat { .. })
        ));
    }

    #[test]
    fn test_decode_tolerates_padding() {
        let header = format!("{}==", URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256"}"#));
        let payload = URL_SAFE_NO_PAD.encode("{}");
        assert!(decode_jwt(&format!("{header}.{payload}.sig")).is_ok());
    }

    #[test]
    fn test_key_url_prefers_payload_claims() {
        let token = forge(
            json!({"alg": "RS256", "jku": "https://header.example.com/keys"}),
            json!({"JWKS_URI": "https://claims.example.com/keys", "iss": "https://iss.example.com"}),
        );
        let decoded = decode_jwt(&token).unwrap();
        // Claim names match case-insensitively and win over the header.
        assert_eq!(
            resolve_key_url(&decoded).unwrap(),
            "https://claims.example.com/keys"
        );
    }

    #[test]
    fn test_key_url_falls_back_to_header() {
        let token = forge(
            json!({"alg": "RS256", "x5u": "https://header.example.com/cert"}),
            json!({"chave": "user@example.com"}),
        );
        let decoded = decode_jwt(&token).unwrap();
        assert_eq!(
            resolve_key_url(&decoded).unwrap(),
            "https://header.example.com/cert"
        );
    }

    #[test]
    fn test_key_url_falls_back_to_issuer_well_known() {
        let token = forge(
            json!({"alg": "RS256"}),
            json!({"iss": "https://psp.example.com/"}),
        );
        let decoded = decode_jwt(&token).unwrap();
        assert_eq!(
            resolve_key_url(&decoded).unwrap(),
            "https://psp.example.com/.well-known/jwks.json"
        );
    }

    #[test]
    fn test_key_url_not_found() {
        let token = forge(json!({"alg": "RS256"}), json!({"chave": "x"}));
        let decoded = decode_jwt(&token).unwrap();
        assert!(matches!(
            resolve_key_url(&decoded),
            Err(PixError::KeyUrlNotFound)
        ));
    }

    #[test]
    fn test_pix_key_claim_matches_case_insensitively() {
        let token = forge(
            json!({"alg": "RS256"}),
            json!({"chave": "User@Example.com"}),
        );
        let decoded = decode_jwt(&token).unwrap();
        let found = validate_pix_key_claim(&decoded.payload, "user@example.com").unwrap();
        assert_eq!(found, "User@Example.com");
    }

    #[test]
    fn test_pix_key_claim_missing_and_mismatch() {
        let no_claim = decode_jwt(&forge(json!({"alg": "RS256"}), json!({}))).unwrap();
        assert!(matches!(
            validate_pix_key_claim(&no_claim.payload, "user@example.com"),
            Err(PixError::PixKeyClaimMissing)
        ));

        let empty_claim =
            decode_jwt(&forge(json!({"alg": "RS256"}), json!({"chave": "  "}))).unwrap();
        assert!(matches!(
            validate_pix_key_claim(&empty_claim.payload, "user@example.com"),
            Err(PixError::PixKeyClaimMissing)
        ));

        let other = decode_jwt(&forge(
            json!({"alg": "RS256"}),
            json!({"chave": "other@example.com"}),
        ))
        .unwrap();
        match validate_pix_key_claim(&other.payload, "user@example.com").unwrap_err() {
            PixError::PixKeyMismatch { expected, found } => {
                assert_eq!(expected, "user@example.com");
                assert_eq!(found, "other@example.com");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
