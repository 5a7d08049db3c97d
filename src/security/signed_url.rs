/// Signed, expiring download links
///
/// A link is `"{path}?{canonical params}&sig={hex}"` where `sig` is the
/// HMAC-SHA256 of `canonical_request` over the path and every other
/// parameter, `exp` included. Verification needs nothing but the key and
/// the request as received.

use std::fmt;

use super::canonical::{
    canonical_query, canonical_request, is_canonical_query, split_path_and_query,
    split_signature, QueryParams, EXPIRY_PARAM, SIGNATURE_PARAM,
};
use super::hmac::{constant_time_eq, decode_lowercase_hex, mac_sha256};

/// Lifetime used when the caller does not pick one (seconds)
pub const DEFAULT_LIFETIME_SECS: u64 = 300;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignError {
    #[error("secret key must not be empty")]
    EmptySecret,

    #[error("resource path must be server-relative, got `{0}`")]
    NotServerRelative(String),

    #[error("link lifetime must be positive")]
    ZeroLifetime,

    #[error("query parameter `{0}` is reserved")]
    ReservedParameter(String),

    #[error("expiry does not fit in a Unix timestamp")]
    ExpiryOverflow,

    #[error("failed to compute signature: {0}")]
    Mac(String),
}

/// Process-wide HMAC key
///
/// Never printed: `Debug` is redacted.
#[derive(Clone)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, SignError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(SignError::EmptySecret);
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

/// A freshly issued link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    /// Server-relative path and query, ready to be prefixed with a base URL
    pub path_and_query: String,
    /// Unix seconds; the link is accepted up to and including this second
    pub expires_at: i64,
}

impl fmt::Display for SignedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path_and_query)
    }
}

/// Issues and checks signed links with one shared key
pub struct UrlSigner {
    key: SecretKey,
}

impl UrlSigner {
    pub fn new(key: SecretKey) -> Self {
        Self { key }
    }

    /// Sign `resource_path` plus `params`, valid for `lifetime_secs`
    /// (default [`DEFAULT_LIFETIME_SECS`]) from now.
    pub fn sign(
        &self,
        resource_path: &str,
        params: &QueryParams,
        lifetime_secs: Option<u64>,
    ) -> Result<SignedUrl, SignError> {
        self.sign_at(resource_path, params, lifetime_secs, unix_now())
    }

    pub fn sign_at(
        &self,
        resource_path: &str,
        params: &QueryParams,
        lifetime_secs: Option<u64>,
        now: i64,
    ) -> Result<SignedUrl, SignError> {
        ensure_server_relative(resource_path)?;

        let lifetime = lifetime_secs.unwrap_or(DEFAULT_LIFETIME_SECS);
        if lifetime == 0 {
            return Err(SignError::ZeroLifetime);
        }

        for reserved in [EXPIRY_PARAM, SIGNATURE_PARAM] {
            if params.contains(reserved) {
                return Err(SignError::ReservedParameter(reserved.to_string()));
            }
        }

        let expires_at = i64::try_from(lifetime)
            .ok()
            .and_then(|lifetime| now.checked_add(lifetime))
            .ok_or(SignError::ExpiryOverflow)?;

        let params = params.clone().with(EXPIRY_PARAM, expires_at.to_string());
        let canonical = canonical_request(resource_path, &params);
        let tag = mac_sha256(self.key.as_bytes(), canonical.as_bytes()).map_err(SignError::Mac)?;

        let path_and_query = format!(
            "{}?{}&{}={}",
            resource_path,
            canonical_query(&params),
            SIGNATURE_PARAM,
            hex::encode(tag)
        );

        Ok(SignedUrl {
            path_and_query,
            expires_at,
        })
    }

    /// Check a link exactly as it was received
    pub fn verify(&self, path_and_query: &str) -> bool {
        self.verify_at(path_and_query, unix_now())
    }

    /// Every failure mode (missing or duplicated `exp`/`sig`, non-numeric
    /// expiry, expired link, non-canonical query, malformed hex, MAC
    /// mismatch) yields `false`.
    ///
    /// The signed part of the query must already be in canonical form, byte
    /// for byte: reordered pairs, escape case changes, stray `&` and escapes
    /// that do not decode to UTF-8 are all rejected. The MAC is computed for
    /// every input before any other check decides the outcome.
    pub fn verify_at(&self, path_and_query: &str, now: i64) -> bool {
        let (path, query) = split_path_and_query(path_and_query);
        let (signed_query, supplied) = split_signature(query.unwrap_or_default());

        let expected = match mac_sha256(
            self.key.as_bytes(),
            format!("{}?{}", path, signed_query).as_bytes(),
        ) {
            Ok(tag) => tag,
            Err(e) => {
                log::error!("Failed to compute expected signature: {}", e);
                return false;
            }
        };

        let supplied = supplied.and_then(decode_lowercase_hex).unwrap_or_default();
        let mac_matches = constant_time_eq(&supplied, &expected);

        let params = QueryParams::parse(signed_query);
        let canonical = query.is_some() && is_canonical_query(signed_query, &params);

        let fresh = match params.get_all(EXPIRY_PARAM).as_slice() {
            [exp] => exp.parse::<i64>().map(|exp| now <= exp).unwrap_or(false),
            _ => false,
        };

        canonical & fresh & mac_matches
    }
}

/// Current wall-clock time in Unix seconds
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn ensure_server_relative(path: &str) -> Result<(), SignError> {
    let relative = path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains(['?', '#'])
        && !path.contains("://");

    if relative {
        Ok(())
    } else {
        Err(SignError::NotServerRelative(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::hmac::create_signature;

    const T0: i64 = 1_700_000_000;

    fn signer() -> UrlSigner {
        UrlSigner::new(SecretKey::new("test_download_secret").unwrap())
    }

    fn tx_params(tx: &str) -> QueryParams {
        QueryParams::new().with("tx", tx)
    }

    #[test]
    fn test_signed_url_shape() {
        let signed = signer()
            .sign_at("/api/download/42", &tx_params("pi_123"), Some(900), T0)
            .unwrap();

        assert_eq!(signed.expires_at, T0 + 900);
        let (path, query) = split_path_and_query(&signed.path_and_query);
        assert_eq!(path, "/api/download/42");

        let params = QueryParams::parse(query.unwrap());
        assert_eq!(params.get("tx"), Some("pi_123"));
        assert_eq!(params.get("exp"), Some("1700000900"));
        let sig = params.get("sig").unwrap();
        assert_eq!(sig.len(), 64);
        assert!(decode_lowercase_hex(sig).is_some());
    }

    #[test]
    fn test_round_trip_without_params() {
        let s = signer();
        for (path, lifetime) in [("/a", 1), ("/api/download/1", 300), ("/x/y/z.png", 86_400)] {
            let signed = s.sign_at(path, &QueryParams::new(), Some(lifetime), T0).unwrap();
            assert!(s.verify_at(&signed.path_and_query, T0), "path {}", path);
        }
    }

    #[test]
    fn test_default_lifetime() {
        let signed = signer().sign_at("/a", &QueryParams::new(), None, T0).unwrap();
        assert_eq!(signed.expires_at, T0 + DEFAULT_LIFETIME_SECS as i64);
    }

    #[test]
    fn test_sign_uses_wall_clock() {
        let s = signer();
        let signed = s.sign("/api/download/7", &tx_params("pi_1"), Some(60)).unwrap();
        assert!(s.verify(&signed.path_and_query));
    }

    #[test]
    fn test_concrete_purchase_scenario() {
        let s = signer();
        let token = s
            .sign_at("/api/download/42", &tx_params("pi_123"), Some(900), T0)
            .unwrap()
            .path_and_query;

        assert!(s.verify_at(&token, T0 + 500));
        assert!(!s.verify_at(&token, T0 + 901));

        let swapped = token.replace("tx=pi_123", "tx=pi_124");
        assert_ne!(swapped, token);
        assert!(!s.verify_at(&swapped, T0 + 500));
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let s = signer();
        let token = s
            .sign_at("/a", &QueryParams::new(), Some(10), T0)
            .unwrap()
            .path_and_query;

        assert!(s.verify_at(&token, T0 + 9));
        assert!(s.verify_at(&token, T0 + 10));
        assert!(!s.verify_at(&token, T0 + 11));
    }

    #[test]
    fn test_single_character_tampering_rejected() {
        let s = signer();
        let token = s
            .sign_at("/api/download/42", &tx_params("pi/123"), Some(900), T0)
            .unwrap()
            .path_and_query;

        for i in 0..token.len() {
            let original = token.as_bytes()[i];
            let shifted = match original {
                b'0'..=b'8' | b'a'..=b'y' | b'A'..=b'Y' => original + 1,
                b'9' => b'0',
                b'z' => b'a',
                b'Z' => b'A',
                other => other ^ 0x01,
            };

            for replacement in [shifted, b'%', b'&', b'=', b'+', b'/', b'F', b'f'] {
                if replacement == original {
                    continue;
                }
                let mut tampered = token.clone().into_bytes();
                tampered[i] = replacement;
                let tampered = String::from_utf8(tampered).unwrap();

                assert!(
                    !s.verify_at(&tampered, T0),
                    "tampered link accepted: {}",
                    tampered
                );
            }
        }
    }

    #[test]
    fn test_extending_expiry_rejected() {
        let s = signer();
        let token = s
            .sign_at("/a", &QueryParams::new(), Some(10), T0)
            .unwrap()
            .path_and_query;

        let extended = token.replace(&format!("exp={}", T0 + 10), &format!("exp={}", T0 + 99_999));
        assert!(!s.verify_at(&extended, T0 + 100));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = signer()
            .sign_at("/a", &QueryParams::new(), Some(10), T0)
            .unwrap()
            .path_and_query;

        let other = UrlSigner::new(SecretKey::new("another_secret").unwrap());
        assert!(!other.verify_at(&token, T0));
    }

    #[test]
    fn test_reordered_transport_rejected() {
        let s = signer();
        let token = s
            .sign_at("/a", &QueryParams::new().with("b", "2").with("a", "1"), Some(60), T0)
            .unwrap()
            .path_and_query;
        assert!(s.verify_at(&token, T0));

        let (path, query) = split_path_and_query(&token);
        let (signed, sig) = split_signature(query.unwrap());
        let mut pairs: Vec<&str> = signed.split('&').collect();
        pairs.reverse();
        let reordered = format!("{}?{}&sig={}", path, pairs.join("&"), sig.unwrap());

        assert_ne!(reordered, token);
        assert!(!s.verify_at(&reordered, T0));
    }

    #[test]
    fn test_equivalent_encodings_rejected() {
        let s = signer();
        let token = s
            .sign_at("/api/download/42", &tx_params("pi/123"), Some(900), T0)
            .unwrap()
            .path_and_query;
        assert!(token.contains("tx=pi%2F123"), "{}", token);
        assert!(s.verify_at(&token, T0));

        // Escape case flip decodes to the same value
        let flipped = token.replace("pi%2F123", "pi%2f123");
        assert!(!s.verify_at(&flipped, T0));

        // Stray separators
        let (path, query) = split_path_and_query(&token);
        let query = query.unwrap();
        assert!(!s.verify_at(&format!("{}&", token), T0));
        assert!(!s.verify_at(&format!("{}?&{}", path, query), T0));
        assert!(!s.verify_at(&token.replacen('&', "&&", 1), T0));

        // `+` and `%20` decode alike
        let spaced = s
            .sign_at("/a", &tx_params("pi 123"), Some(900), T0)
            .unwrap()
            .path_and_query;
        assert!(spaced.contains("tx=pi+123"), "{}", spaced);
        assert!(s.verify_at(&spaced, T0));
        assert!(!s.verify_at(&spaced.replace("pi+123", "pi%20123"), T0));
    }

    #[test]
    fn test_lossy_escapes_rejected() {
        let s = signer();
        let token = s
            .sign_at("/api/download/42", &tx_params("pi\u{fffd}"), Some(900), T0)
            .unwrap()
            .path_and_query;
        assert!(token.contains("pi%EF%BF%BD"), "{}", token);
        assert!(s.verify_at(&token, T0));

        // Both decode to U+FFFD
        let swapped = token.replace("pi%EF%BF%BD", "pi%FF");
        assert!(!s.verify_at(&swapped, T0));

        let invalid = token.replace("pi%EF%BF%BD", "pi%zz");
        assert!(!s.verify_at(&invalid, T0));
    }

    #[test]
    fn test_canonical_order_drift_rejected() {
        // A signer that MACs parameters in insertion order instead of the
        // canonical order produces links this verifier must refuse.
        let key = b"test_download_secret";
        let exp = T0 + 60;
        let drifted = format!("/api/download/42?tx=pi_123&exp={}", exp);
        let sig = create_signature(drifted.as_bytes(), key).unwrap();
        let link = format!("{}&sig={}", drifted, sig);

        assert!(!signer().verify_at(&link, T0));

        // The same parameters MAC'd canonically are accepted.
        let canonical = format!("/api/download/42?exp={}&tx=pi_123", exp);
        let sig = create_signature(canonical.as_bytes(), key).unwrap();
        assert!(signer().verify_at(&format!("{}&sig={}", canonical, sig), T0));
    }

    #[test]
    fn test_missing_or_malformed_control_params() {
        let s = signer();
        let token = s
            .sign_at("/a", &QueryParams::new(), Some(60), T0)
            .unwrap()
            .path_and_query;
        let sig = QueryParams::parse(split_path_and_query(&token).1.unwrap())
            .get("sig")
            .unwrap()
            .to_string();
        let exp = (T0 + 60).to_string();

        assert!(!s.verify_at("/a", T0));
        assert!(!s.verify_at("/a?", T0));
        assert!(!s.verify_at(&format!("/a?exp={}", exp), T0));
        assert!(!s.verify_at(&format!("/a?sig={}", sig), T0));
        assert!(!s.verify_at(&format!("/a?exp=soon&sig={}", sig), T0));
        assert!(!s.verify_at(&format!("/a?exp={}&sig=", exp), T0));
        assert!(!s.verify_at(&format!("/a?exp={}&sig=xyz", exp), T0));
        assert!(!s.verify_at(&format!("/a?exp={}&sig={}", exp, sig.to_uppercase()), T0));
        assert!(!s.verify_at(&format!("/a?exp={}&sig={}", exp, &sig[..62]), T0));
        assert!(!s.verify_at(&format!("/a?exp={}&sig={}00", exp, sig), T0));
        // Duplicated control parameters
        assert!(!s.verify_at(&format!("{}&sig={}", token, sig), T0));
        assert!(!s.verify_at(&format!("{}&exp={}", token, exp), T0));
    }

    #[test]
    fn test_sign_rejects_bad_input() {
        let s = signer();
        let none = QueryParams::new();

        for path in ["api/download/1", "https://shop.example/a", "//shop.example/a", "/a?b=1", "/a#frag", ""] {
            assert_eq!(
                s.sign_at(path, &none, Some(60), T0),
                Err(SignError::NotServerRelative(path.to_string()))
            );
        }

        assert_eq!(s.sign_at("/a", &none, Some(0), T0), Err(SignError::ZeroLifetime));
        assert_eq!(
            s.sign_at("/a", &QueryParams::new().with("exp", "1"), Some(60), T0),
            Err(SignError::ReservedParameter("exp".to_string()))
        );
        assert_eq!(
            s.sign_at("/a", &QueryParams::new().with("sig", "1"), Some(60), T0),
            Err(SignError::ReservedParameter("sig".to_string()))
        );
        assert_eq!(
            s.sign_at("/a", &none, Some(u64::MAX), T0),
            Err(SignError::ExpiryOverflow)
        );
    }

    #[test]
    fn test_secret_key_rules() {
        assert_eq!(SecretKey::new(Vec::new()).unwrap_err(), SignError::EmptySecret);

        let key = SecretKey::new("hunter2").unwrap();
        assert_eq!(format!("{:?}", key), "SecretKey(<redacted>)");
        assert_eq!(key.as_bytes(), b"hunter2");
    }

    #[test]
    fn test_display_is_path_and_query() {
        let signed = signer().sign_at("/a", &QueryParams::new(), Some(1), T0).unwrap();
        assert_eq!(signed.to_string(), signed.path_and_query);
    }
}
