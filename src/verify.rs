//! ES256 signature verification over the signed document.

use p256::ecdsa::signature::hazmat::PrehashVerifier;
use p256::ecdsa::{Signature as EcdsaSignature, VerifyingKey};
use p256::{EncodedPoint, FieldBytes};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::jws::Signature;

/// Affine P-256 point with big-endian unsigned integer coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicPoint {
    pub x: Vec<u8>,
    pub y: Vec<u8>,
}

impl PublicPoint {
    fn verifying_key(&self) -> Option<VerifyingKey> {
        let x = field_bytes(&self.x)?;
        let y = field_bytes(&self.y)?;
        let point = EncodedPoint::from_affine_coordinates(&x, &y, false);
        VerifyingKey::from_encoded_point(&point).ok()
    }
}

/// Left-pads the integer to 32 bytes; `None` if it does not fit.
fn field_bytes(int: &[u8]) -> Option<FieldBytes> {
    let start = int.iter().position(|b| *b != 0).unwrap_or(int.len());
    let int = &int[start..];
    if int.len() > 32 {
        return None;
    }
    let mut bytes = FieldBytes::default();
    bytes[32 - int.len()..].copy_from_slice(int);
    Some(bytes)
}

/// Checks `signature` over the SHA-256 digest of the signed document.
///
/// A key that is not a point on P-256, or R/S outside `[1, n-1]`, fails
/// verification like any other bad signature.
pub fn verify_signature(signed_document: &str, signature: &Signature, key: &PublicPoint) -> bool {
    let verifying_key = match key.verifying_key() {
        Some(verifying_key) => verifying_key,
        None => {
            debug!("public key is not a point on P-256");
            return false;
        }
    };
    let signature = match EcdsaSignature::from_scalars(
        FieldBytes::clone_from_slice(&signature.r),
        FieldBytes::clone_from_slice(&signature.s),
    ) {
        Ok(signature) => signature,
        Err(_) => {
            debug!("signature scalars out of range");
            return false;
        }
    };

    let digest = Sha256::digest(signed_document.as_bytes());
    verifying_key.verify_prehash(&digest, &signature).is_ok()
}
