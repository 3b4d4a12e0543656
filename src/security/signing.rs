//! Signed cookie values.
//!
//! Format: `!<base64 signature>?<base64 JSON [name, value]>`, where the
//! signature is HMAC-SHA256 of the encoded message under the app secret.
//! Binding the name stops a valid value being replayed under another cookie.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("invalid signing key")]
    InvalidKey,

    #[error("failed to encode cookie: {0}")]
    Encode(#[from] serde_json::Error),
}

/// True if `data` looks like a signed value.
pub fn is_signed(data: &str) -> bool {
    data.starts_with('!') && data.contains('?')
}

/// Sign `(name, value)` with `secret`.
pub fn encode(name: &str, value: &str, secret: &str) -> Result<String, SigningError> {
    let msg = STANDARD.encode(serde_json::to_vec(&(name, value))?);
    let sig = STANDARD.encode(sign(msg.as_bytes(), secret)?.finalize().into_bytes());
    Ok(format!("!{sig}?{msg}"))
}

/// Verify and unpack a signed value. `None` if unsigned or tampered.
pub fn decode(data: &str, secret: &str) -> Option<(String, String)> {
    if !is_signed(data) {
        return None;
    }
    let (sig, msg) = data[1..].split_once('?')?;
    let sig = STANDARD.decode(sig).ok()?;
    sign(msg.as_bytes(), secret).ok()?.verify_slice(&sig).ok()?;

    let raw = STANDARD.decode(msg).ok()?;
    serde_json::from_slice::<(String, String)>(&raw).ok()
}

fn sign(msg: &[u8], secret: &str) -> Result<HmacSha256, SigningError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SigningError::InvalidKey)?;
    mac.update(msg);
    Ok(mac)
}
