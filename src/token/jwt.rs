use base64ct::{Base64, Base64Unpadded, Encoding};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use serde_json::Value;
use sha2::Sha256;

use super::TokenError;

/// Standard base64 of `{"alg":"RS256","typ":"JWT","version":"1"}`.
///
/// The core only ever mints tokens with this exact header, so it is compared
/// byte for byte instead of being decoded.
pub const JWT_HEADER: &str = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCIsInZlcnNpb24iOiIxIn0=";

fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenError> {
    Base64::decode_vec(segment)
        .or_else(|_| Base64Unpadded::decode_vec(segment))
        .map_err(|_| TokenError::Base64)
}

/// Parse the core's signing key.
///
/// The handshake hands out the base64 body of an SPKI public key; a full PEM
/// document is accepted too.
///
/// # Errors
///
/// Returns an error if the key is not base64 or not an RSA SPKI structure.
pub fn decode_public_key(key: &str) -> Result<RsaPublicKey, TokenError> {
    let body: String = key
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .flat_map(str::chars)
        .filter(|c| !c.is_whitespace())
        .collect();
    let der = decode_segment(&body)?;
    RsaPublicKey::from_public_key_der(&der).map_err(|_| TokenError::KeyParse)
}

/// Verify an RS256 token minted by the core and return its decoded payload.
///
/// # Errors
///
/// Returns an error if:
/// - the token does not have exactly three segments,
/// - the header is not the fixed core header,
/// - the key cannot be parsed or the signature does not verify,
/// - the payload is not base64 encoded JSON.
pub fn verify_jwt_and_get_payload(token: &str, signing_public_key: &str) -> Result<Value, TokenError> {
    let mut parts = token.split('.');
    let header = parts.next().ok_or(TokenError::TokenFormat)?;
    let payload = parts.next().ok_or(TokenError::TokenFormat)?;
    let signature = parts.next().ok_or(TokenError::TokenFormat)?;
    if parts.next().is_some() {
        return Err(TokenError::TokenFormat);
    }

    if header != JWT_HEADER {
        return Err(TokenError::HeaderMismatch);
    }

    let public_key = decode_public_key(signing_public_key)?;
    let verifying_key = VerifyingKey::<Sha256>::new(public_key);
    let signature_bytes = decode_segment(signature)?;
    let signature =
        Signature::try_from(signature_bytes.as_slice()).map_err(|_| TokenError::InvalidSignature)?;
    verifying_key
        .verify(format!("{header}.{payload}").as_bytes(), &signature)
        .map_err(|_| TokenError::InvalidSignature)?;

    let payload = decode_segment(payload)?;
    Ok(serde_json::from_slice(&payload)?)
}
