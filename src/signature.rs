//! HMAC verification of `X-Hub-Signature` and `X-Hub-Signature-256`.
//!
//! WARNING: an empty secret turns verification OFF and every delivery is
//! accepted, so leaving `GITHUB_HOOK_SECRET_TOKEN` unset exposes the
//! configured commands to anyone who can reach the listener.

use std::fmt;

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Environment variable holding the shared webhook secret.
pub const SECRET_ENV_VAR: &str = "GITHUB_HOOK_SECRET_TOKEN";

/// Digest algorithm named by a signature header prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    Sha1,
    Sha256,
}

impl SignatureAlgorithm {
    pub fn prefix(self) -> &'static str {
        match self {
            SignatureAlgorithm::Sha1 => "sha1=",
            SignatureAlgorithm::Sha256 => "sha256=",
        }
    }
}

/// The shared secret. Its value never shows up in `Debug` output.
#[derive(Clone, Default)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Reads the secret from [`SECRET_ENV_VAR`]; absent means disabled.
    pub fn from_env() -> Self {
        Self::new(std::env::var(SECRET_ENV_VAR).unwrap_or_default())
    }

    pub fn is_disabled(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_disabled() {
            f.write_str("WebhookSecret(disabled)")
        } else {
            f.write_str("WebhookSecret(<redacted>)")
        }
    }
}

/// Splits a header such as `sha1=abcd` into its algorithm and hex digest.
///
/// Returns `None` for unknown or missing prefixes. Never panics, including
/// for headers shorter than any prefix.
pub fn split_signature_header(header: &str) -> Option<(SignatureAlgorithm, &str)> {
    [SignatureAlgorithm::Sha256, SignatureAlgorithm::Sha1]
        .into_iter()
        .find_map(|algorithm| {
            header
                .strip_prefix(algorithm.prefix())
                .map(|digest| (algorithm, digest))
        })
}

fn keyed_mac<M: Mac + KeyInit>(secret: &[u8], payload: &[u8]) -> Option<M> {
    let mut mac = <M as Mac>::new_from_slice(secret).ok()?;
    mac.update(payload);
    Some(mac)
}

/// Computes the HMAC of `payload` keyed with `secret`.
pub fn compute_signature(
    algorithm: SignatureAlgorithm,
    secret: &[u8],
    payload: &[u8],
) -> Option<Vec<u8>> {
    match algorithm {
        SignatureAlgorithm::Sha1 => keyed_mac::<HmacSha1>(secret, payload)
            .map(|mac| mac.finalize().into_bytes().to_vec()),
        SignatureAlgorithm::Sha256 => keyed_mac::<HmacSha256>(secret, payload)
            .map(|mac| mac.finalize().into_bytes().to_vec()),
    }
}

/// Formats a signature the way GitHub sends it, e.g. `sha1=<hex>`.
pub fn format_signature_header(algorithm: SignatureAlgorithm, signature: &[u8]) -> String {
    format!("{}{}", algorithm.prefix(), hex::encode(signature))
}

/// Verifies `signature_header` against `payload`.
///
/// Always `true` when the secret is disabled. The digest comparison runs in
/// constant time through [`Mac::verify_slice`].
pub fn verify(secret: &WebhookSecret, payload: &[u8], signature_header: &str) -> bool {
    if secret.is_disabled() {
        return true;
    }

    let Some((algorithm, hex_digest)) = split_signature_header(signature_header) else {
        return false;
    };
    let Ok(received) = hex::decode(hex_digest) else {
        return false;
    };

    match algorithm {
        SignatureAlgorithm::Sha1 => keyed_mac::<HmacSha1>(secret.as_bytes(), payload)
            .is_some_and(|mac| mac.verify_slice(&received).is_ok()),
        SignatureAlgorithm::Sha256 => keyed_mac::<HmacSha256>(secret.as_bytes(), payload)
            .is_some_and(|mac| mac.verify_slice(&received).is_ok()),
    }
}

/// The header we would have accepted, for operator diagnostics. Uses the
/// algorithm named by `signature_header`, SHA-1 when it names none.
pub fn expected_signature_header(
    secret: &WebhookSecret,
    payload: &[u8],
    signature_header: &str,
) -> Option<String> {
    let algorithm = split_signature_header(signature_header)
        .map(|(algorithm, _)| algorithm)
        .unwrap_or(SignatureAlgorithm::Sha1);
    compute_signature(algorithm, secret.as_bytes(), payload)
        .map(|signature| format_signature_header(algorithm, &signature))
}
