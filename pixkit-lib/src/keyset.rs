//! Published key-set resolution and JWT signature verification.
//!
//! The key set is a JWKS-equivalent JSON document: a `keys` array of
//! entries indexed by `kid`. Resolution picks the first entry matching the
//! token's key id; verification rebuilds an RSA public key from the
//! entry's base64url modulus and exponent and checks the signature over
//! the token's header and payload bytes.
//!
//! Verification is deliberately signature-only: issuer, audience, and
//! expiry are business claims of the payment document, not part of the
//! trust decision made here.

use std::collections::HashSet;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::PixError;
use crate::jwt::JwtToken;
use crate::Result;

/// One published key entry.
#[derive(Clone, Debug, Deserialize)]
pub struct KeySetEntry {
    /// Key id.
    #[serde(default)]
    pub kid: Option<String>,
    /// Key type; only `RSA` is supported.
    #[serde(default)]
    pub kty: Option<String>,
    /// Advertised algorithm, informational only.
    #[serde(default)]
    pub alg: Option<String>,
    /// RSA modulus, base64url.
    #[serde(default)]
    pub n: Option<String>,
    /// RSA public exponent, base64url.
    #[serde(default)]
    pub e: Option<String>,
}

/// A published key set.
#[derive(Clone, Debug, Deserialize)]
pub struct KeySet {
    /// The published keys.
    pub keys: Vec<KeySetEntry>,
}

/// Parses a fetched key-set body.
///
/// A body that is not the expected JSON shape counts as a failed fetch of
/// `url` - the remote did not serve a key set.
pub fn parse_key_set(url: &str, body: &str) -> Result<KeySet> {
    serde_json::from_str(body).map_err(|e| PixError::RemoteFetchFailed {
        url: url.to_string(),
        detail: format!("key set response is not a valid key set document: {e}"),
    })
}

/// Finds the key entry for `kid` and checks it is a usable RSA key.
pub fn resolve_key<'a>(key_set: &'a KeySet, kid: &str) -> Result<&'a KeySetEntry> {
    let entry = key_set
        .keys
        .iter()
        .find(|k| k.kid.as_deref() == Some(kid))
        .ok_or_else(|| PixError::KeyNotFound {
            kid: kid.to_string(),
        })?;

    if entry.n.as_deref().map_or(true, str::is_empty)
        || entry.e.as_deref().map_or(true, str::is_empty)
    {
        return Err(PixError::IncompleteRsaKey {
            kid: kid.to_string(),
            detail: "missing modulus (n) or exponent (e)".to_string(),
        });
    }

    match entry.kty.as_deref() {
        Some("RSA") => Ok(entry),
        Some(other) => Err(PixError::UnsupportedKeyType {
            kty: other.to_string(),
        }),
        None => Err(PixError::UnsupportedKeyType {
            kty: "<missing>".to_string(),
        }),
    }
}

fn signing_algorithm(alg: &str) -> Result<Algorithm> {
    match alg {
        "RS256" => Ok(Algorithm::RS256),
        "RS384" => Ok(Algorithm::RS384),
        "RS512" => Ok(Algorithm::RS512),
        other => Err(PixError::UnsupportedAlgorithm {
            alg: other.to_string(),
        }),
    }
}

/// Verifies the token's signature against a resolved key entry.
///
/// Only the cryptographic signature is checked; `exp`, `aud`, and `iss`
/// are ignored here.
pub fn verify_signature(token: &JwtToken, entry: &KeySetEntry) -> Result<()> {
    let algorithm = signing_algorithm(&token.header.alg)?;

    let kid = entry.kid.clone().unwrap_or_default();
    let incomplete = |detail: String| PixError::IncompleteRsaKey {
        kid: kid.clone(),
        detail,
    };

    let n = entry
        .n
        .as_deref()
        .ok_or_else(|| incomplete("missing modulus (n)".to_string()))?;
    let e = entry
        .e
        .as_deref()
        .ok_or_else(|| incomplete("missing exponent (e)".to_string()))?;

    let key = DecodingKey::from_rsa_components(n, e)
        .map_err(|err| incomplete(format!("components are not valid base64url: {err}")))?;

    let mut validation = Validation::new(algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    decode::<Value>(token.raw(), &key, &validation)
        .map_err(|err| PixError::SignatureInvalid {
            detail: err.to_string(),
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::decode_jwt;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;

    fn sample_set() -> KeySet {
        parse_key_set(
            "psp.example.com/keys",
            r#"{
                "keys": [
                    {"kid": "ec-1", "kty": "EC", "n": "AQAB", "e": "AQAB"},
                    {"kid": "rsa-1", "kty": "RSA", "n": "AQAB", "e": "AQAB"},
                    {"kid": "bare-1", "kty": "RSA"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_rejects_non_key_set_body() {
        let err = parse_key_set("psp.example.com/keys", "<html>nope</html>").unwrap_err();
        assert!(matches!(err, PixError::RemoteFetchFailed { .. }));

        let err = parse_key_set("psp.example.com/keys", r#"{"no_keys": []}"#).unwrap_err();
        assert!(matches!(err, PixError::RemoteFetchFailed { .. }));
    }

    #[test]
    fn test_resolve_first_matching_kid() {
        let set = sample_set();
        let entry = resolve_key(&set, "rsa-1").unwrap();
        assert_eq!(entry.kty.as_deref(), Some("RSA"));
    }

    #[test]
    fn test_resolve_unknown_kid() {
        let set = sample_set();
        match resolve_key(&set, "nope").unwrap_err() {
            PixError::KeyNotFound { kid } => assert_eq!(kid, "nope"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_incomplete_entry() {
        let set = sample_set();
        assert!(matches!(
            resolve_key(&set, "bare-1"),
            Err(PixError::IncompleteRsaKey { .. })
        ));
    }

    #[test]
    fn test_resolve_non_rsa_entry() {
        let set = sample_set();
        match resolve_key(&set, "ec-1").unwrap_err() {
            PixError::UnsupportedKeyType { kty } => assert_eq!(kty, "EC"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_rsa_algorithm_rejected_before_key_use() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","kid":"rsa-1"}"#);
        let token = decode_jwt(&format!("{header}.e30.c2ln")).unwrap();

        let set = sample_set();
        let entry = resolve_key(&set, "rsa-1").unwrap();
        match verify_signature(&token, entry).unwrap_err() {
            PixError::UnsupportedAlgorithm { alg } => assert_eq!(alg, "HS256"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
