// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Webhook signature verification
//!
//! Both providers sign the raw request body with an HMAC keyed by the
//! shared webhook secret and send `<algorithm>=<hex digest>` in a header:
//!
//! - GitHub: `X-Hub-Signature` (`sha1=`) or `X-Hub-Signature-256` (`sha256=`)
//! - Bitbucket Cloud: `X-Hub-Signature` (`sha256=`)
//!
//! Digests are compared in constant time.

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

use super::Provider;
use crate::errors::{PipesmithError, PipesmithResult};

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Signature algorithms a header can name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Sha1,
    Sha256,
}

impl Algorithm {
    fn prefix(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }

    fn accepted_by(&self, provider: Provider) -> bool {
        match provider {
            Provider::GitHub => true,
            Provider::Bitbucket => *self == Self::Sha256,
        }
    }
}

/// Check a signature header against the raw body
pub fn is_valid_hmac(provider: Provider, secret: &[u8], body: &[u8], header: &str) -> bool {
    verify_signature(provider, secret, body, header).is_ok()
}

/// Like [`is_valid_hmac`], but reports `InvalidSignature` on mismatch
pub fn verify_signature(
    provider: Provider,
    secret: &[u8],
    body: &[u8],
    header: &str,
) -> PipesmithResult<()> {
    let invalid = || PipesmithError::InvalidSignature {
        provider: provider.to_string(),
    };

    let (prefix, digest) = header.trim().split_once('=').ok_or_else(invalid)?;
    let algorithm = match prefix {
        "sha1" => Algorithm::Sha1,
        "sha256" => Algorithm::Sha256,
        _ => {
            tracing::warn!(%provider, prefix, "unsupported signature algorithm");
            return Err(invalid());
        }
    };
    if !algorithm.accepted_by(provider) {
        tracing::warn!(%provider, algorithm = algorithm.prefix(), "algorithm not used by provider");
        return Err(invalid());
    }
    let expected = hex::decode(digest).map_err(|_| invalid())?;

    let matches = match algorithm {
        Algorithm::Sha1 => verify_mac::<HmacSha1>(secret, body, &expected),
        Algorithm::Sha256 => verify_mac::<HmacSha256>(secret, body, &expected),
    };
    if matches {
        Ok(())
    } else {
        tracing::warn!(%provider, "webhook signature mismatch");
        Err(invalid())
    }
}

/// Produce the header value a provider would send for `body`
pub fn sign(algorithm: Algorithm, secret: &[u8], body: &[u8]) -> String {
    let digest = match algorithm {
        Algorithm::Sha1 => compute_mac::<HmacSha1>(secret, body),
        Algorithm::Sha256 => compute_mac::<HmacSha256>(secret, body),
    };
    format!("{}={}", algorithm.prefix(), hex::encode(digest))
}

fn verify_mac<M: Mac + KeyInit>(secret: &[u8], body: &[u8], expected: &[u8]) -> bool {
    // HMAC accepts keys of any length
    let Ok(mut mac) = <M as KeyInit>::new_from_slice(secret) else {
        return false;
    };
    Mac::update(&mut mac, body);
    mac.verify_slice(expected).is_ok()
}

fn compute_mac<M: Mac + KeyInit>(secret: &[u8], body: &[u8]) -> Vec<u8> {
    match <M as KeyInit>::new_from_slice(secret) {
        Ok(mut mac) => {
            Mac::update(&mut mac, body);
            mac.finalize().into_bytes().to_vec()
        }
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"It's a Secret to Everybody";
    const BODY: &[u8] = b"Hello, World!";

    #[test]
    fn test_github_sha256_reference_vector() {
        // Published in GitHub's webhook documentation
        let header = "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17";
        assert!(is_valid_hmac(Provider::GitHub, SECRET, BODY, header));
    }

    #[test]
    fn test_github_sha1_round_trip() {
        let header = sign(Algorithm::Sha1, SECRET, BODY);
        assert!(header.starts_with("sha1="));
        assert_eq!(header.len(), "sha1=".len() + 40);
        assert!(is_valid_hmac(Provider::GitHub, SECRET, BODY, &header));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let header = sign(Algorithm::Sha1, b"other secret", BODY);
        assert!(!is_valid_hmac(Provider::GitHub, SECRET, BODY, &header));
        assert!(matches!(
            verify_signature(Provider::GitHub, SECRET, BODY, &header),
            Err(PipesmithError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let header = sign(Algorithm::Sha256, SECRET, BODY);
        assert!(!is_valid_hmac(Provider::GitHub, SECRET, b"Hello, World?", &header));
    }

    #[test]
    fn test_malformed_headers_are_rejected() {
        for header in ["", "sha1", "sha1=zz", "md5=abcd", "abcdef"] {
            assert!(!is_valid_hmac(Provider::GitHub, SECRET, BODY, header), "{}", header);
        }
    }

    #[test]
    fn test_bitbucket_accepts_only_sha256() {
        let sha256 = sign(Algorithm::Sha256, SECRET, BODY);
        let sha1 = sign(Algorithm::Sha1, SECRET, BODY);
        assert!(is_valid_hmac(Provider::Bitbucket, SECRET, BODY, &sha256));
        assert!(!is_valid_hmac(Provider::Bitbucket, SECRET, BODY, &sha1));
    }
}
