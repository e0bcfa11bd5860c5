//! Signed QR payloads printed on tickets.
//!
//! A payload looks like `MRQ1.<body>.<signature>` where `body` is the
//! base64url-encoded `ticket_number|order_number` and `signature` the
//! base64url-encoded HMAC-SHA256 of the body.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const PREFIX: &str = "MRQ1";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QrError {
    #[error("QR payload is malformed")]
    Malformed,

    #[error("QR payload signature does not match")]
    BadSignature,
}

/// What a verified payload vouches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrClaims {
    pub ticket_number: String,
    pub order_number: String,
}

#[derive(Clone)]
pub struct QrSigner {
    key: Vec<u8>,
}

impl QrSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length")
    }

    pub fn sign(&self, ticket_number: &str, order_number: &str) -> String {
        let body = URL_SAFE_NO_PAD.encode(format!("{ticket_number}|{order_number}"));

        let mut mac = self.mac();
        mac.update(body.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{PREFIX}.{body}.{signature}")
    }

    pub fn verify(&self, payload: &str) -> Result<QrClaims, QrError> {
        let mut parts = payload.trim().split('.');
        let (Some(PREFIX), Some(body), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(QrError::Malformed);
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| QrError::Malformed)?;
        let mut mac = self.mac();
        mac.update(body.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| QrError::BadSignature)?;

        let decoded = URL_SAFE_NO_PAD.decode(body).map_err(|_| QrError::Malformed)?;
        let decoded = String::from_utf8(decoded).map_err(|_| QrError::Malformed)?;
        let (ticket_number, order_number) = decoded.split_once('|').ok_or(QrError::Malformed)?;

        Ok(QrClaims {
            ticket_number: ticket_number.to_string(),
            order_number: order_number.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_payload_verifies() {
        let signer = QrSigner::new("secret");
        let payload = signer.sign("TKT-ABCDEF0123", "ORD-20250314-0A1B2C3D");

        assert!(payload.starts_with("MRQ1."));
        assert_eq!(
            signer.verify(&payload),
            Ok(QrClaims {
                ticket_number: "TKT-ABCDEF0123".to_string(),
                order_number: "ORD-20250314-0A1B2C3D".to_string(),
            })
        );
    }

    #[test]
    fn test_other_key_is_rejected() {
        let payload = QrSigner::new("secret").sign("TKT-1", "ORD-1");
        assert_eq!(
            QrSigner::new("another").verify(&payload),
            Err(QrError::BadSignature)
        );
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let signer = QrSigner::new("secret");
        let payload = signer.sign("TKT-1", "ORD-1");
        let forged_body = URL_SAFE_NO_PAD.encode("TKT-2|ORD-1");
        let signature = payload.rsplit('.').next().unwrap();

        assert_eq!(
            signer.verify(&format!("MRQ1.{forged_body}.{signature}")),
            Err(QrError::BadSignature)
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        let signer = QrSigner::new("secret");
        assert_eq!(signer.verify(""), Err(QrError::Malformed));
        assert_eq!(signer.verify("TKT-ABCDEF0123"), Err(QrError::Malformed));
        assert_eq!(signer.verify("XXX1.a.b"), Err(QrError::Malformed));
        assert_eq!(signer.verify("MRQ1.a.b.c"), Err(QrError::Malformed));
    }
}
