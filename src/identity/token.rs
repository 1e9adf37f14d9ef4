//! Bearer token claim decoding.
//!
//! Reads the claims segment of a `header.claims.signature` token. The signature is
//! never checked here; see [`UnverifiedClaims`].

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde_json::Value;

use super::claims::{ClaimedRole, UnverifiedClaims};

// Standard alphabet, padding optional: segments arrive unpadded once the URL-safe
// characters have been mapped back.
const CLAIMS_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode the claims of a bearer token. Any malformed input yields `None`.
pub fn decode(token: &str) -> Option<UnverifiedClaims> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return None;
    }
    let standard: String = segments[1]
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let bytes = CLAIMS_ENGINE.decode(standard.as_bytes()).ok()?;
    let text = std::str::from_utf8(&bytes).ok()?;
    let payload: Value = serde_json::from_str(text).ok()?;
    claims_from_payload(&payload)
}

fn claims_from_payload(payload: &Value) -> Option<UnverifiedClaims> {
    let obj = payload.as_object()?;
    let subject = obj.get("sub").and_then(|v| v.as_str()).filter(|s| !s.is_empty())?;
    let role = obj.get("role").and_then(|v| v.as_str()).filter(|s| !s.is_empty())?;
    let expires_at = obj.get("exp").and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)));
    Some(UnverifiedClaims {
        subject: subject.to_string(),
        role: ClaimedRole::from_claim(role),
        expires_at,
    })
}

/// Build a syntactically valid, unsigned token around the given claims object.
/// Only meant for tests and local fixtures: nothing accepts it as proof of identity.
pub fn encode_unsigned(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    format!("{}.{}.unsigned", header, body)
}
