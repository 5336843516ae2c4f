//! Request signing for Kraken private endpoints.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};

use crate::error::{ExchangeError, Result};

type HmacSha512 = Hmac<Sha512>;

/// Milliseconds since the Unix epoch, used as the request nonce.
#[must_use]
pub fn nonce() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    millis.to_string()
}

/// Compute the `API-Sign` header.
///
/// `base64(HMAC-SHA512(base64decode(secret), path || SHA256(nonce || postdata)))`.
/// `postdata` must be byte-for-byte the body that is sent.
pub fn sign(path: &str, nonce: &str, postdata: &str, secret: &str) -> Result<String> {
    let key = STANDARD
        .decode(secret)
        .map_err(|e| ExchangeError::Signing(format!("private key is not base64: {e}")))?;

    let digest = Sha256::new()
        .chain_update(nonce.as_bytes())
        .chain_update(postdata.as_bytes())
        .finalize();

    let mut mac =
        HmacSha512::new_from_slice(&key).map_err(|e| ExchangeError::Signing(e.to_string()))?;
    mac.update(path.as_bytes());
    mac.update(&digest);

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "kQH5HW/8p1uGOVjbgWA7FunAmGO8lsSUXNsu3eow76sz84Q18fWxnyRzBHCd3pd5nE9qa99HAZtuZuj6F1huXg==";

    #[test]
    fn matches_published_signature() {
        let signature = sign(
            "/0/private/AddOrder",
            "1616492376594",
            "nonce=1616492376594&ordertype=limit&pair=XBTUSD&price=37500&type=buy&volume=1.25",
            SECRET,
        )
        .unwrap();
        assert_eq!(
            signature,
            "4/dpxb3iT4tp/ZCVEwSnEsLxx0bqyhLpdfOpc6fn7OR8+UClSV5n9E6aSS8MPtnRfp32bAb0nmbRn6H8ndwLUQ=="
        );
    }

    #[test]
    fn rejects_non_base64_secret() {
        let err = sign("/0/private/Balance", "1", "nonce=1", "not base64!").unwrap_err();
        assert!(err.to_string().contains("private key is not base64"));
    }

    #[test]
    fn nonce_is_numeric_and_increasing() {
        let first: u128 = nonce().parse().unwrap();
        let second: u128 = nonce().parse().unwrap();
        assert!(second >= first);
    }
}
