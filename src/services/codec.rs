use crate::config::CodecKind;
use crate::domain::room::SessionToken;
use crate::error::{AppError, Result};
use aes_gcm::{Aes256Gcm, Nonce, aead::Aead, aead::KeyInit};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hkdf::Hkdf;
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;

/// Why stored content could not be turned back into plaintext under a given token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("stored content is not valid base64")]
    Malformed,
    #[error("stored content is truncated or has an unknown version")]
    Truncated,
    #[error("content failed authentication under this key")]
    Authentication,
    #[error("revealed bytes are not valid UTF-8")]
    InvalidUtf8,
}

/// Reversible transform between plaintext and its stored form, keyed by a session token.
pub trait ContentCodec: Send + Sync + Debug {
    /// # Errors
    /// Returns `AppError::Internal` if the underlying cipher rejects the input.
    fn protect(&self, plaintext: &str, key: &SessionToken) -> Result<String>;

    /// # Errors
    /// Returns a `DecodeError` if `stored` was not produced by `protect` or cannot be revealed
    /// under `key`.
    fn reveal(&self, stored: &str, key: &SessionToken) -> std::result::Result<String, DecodeError>;
}

#[must_use]
pub fn build_codec(kind: CodecKind) -> Arc<dyn ContentCodec> {
    match kind {
        CodecKind::Aead => Arc::new(AeadCodec),
        CodecKind::Legacy => Arc::new(LegacyCodec),
    }
}

const FORMAT_VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = 1 + SALT_LEN + NONCE_LEN;
const KDF_INFO: &[u8] = b"haven-relay/room-message/v1";

/// AES-256-GCM keyed by HKDF-SHA256 over the session token.
///
/// Stored form is base64 of `version || salt(16) || nonce(12) || ciphertext || tag(16)`.
/// A fresh salt per message means each message gets its own key; a wrong token fails
/// authentication instead of producing garbage.
#[derive(Clone, Copy, Debug, Default)]
pub struct AeadCodec;

impl AeadCodec {
    fn cipher(key: &SessionToken, salt: &[u8]) -> Option<Aes256Gcm> {
        let hk = Hkdf::<Sha256>::new(Some(salt), key.expose().as_bytes());
        let mut okm = [0u8; 32];
        hk.expand(KDF_INFO, &mut okm).ok()?;
        Aes256Gcm::new_from_slice(&okm).ok()
    }
}

impl ContentCodec for AeadCodec {
    fn protect(&self, plaintext: &str, key: &SessionToken) -> Result<String> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut nonce);

        let cipher = Self::cipher(key, &salt).ok_or(AppError::Internal)?;
        let ciphertext = cipher.encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes()).map_err(|e| {
            tracing::error!(error = %e, "Content encryption failed");
            AppError::Internal
        })?;

        let mut out = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        out.push(FORMAT_VERSION);
        out.extend_from_slice(&salt);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);

        Ok(STANDARD.encode(out))
    }

    fn reveal(&self, stored: &str, key: &SessionToken) -> std::result::Result<String, DecodeError> {
        let bytes = STANDARD.decode(stored).map_err(|_| DecodeError::Malformed)?;
        if bytes.len() < HEADER_LEN + TAG_LEN || bytes[0] != FORMAT_VERSION {
            return Err(DecodeError::Truncated);
        }

        let (salt, rest) = bytes[1..].split_at(SALT_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

        let cipher = Self::cipher(key, salt).ok_or(DecodeError::Authentication)?;
        let plaintext =
            cipher.decrypt(Nonce::from_slice(nonce), ciphertext).map_err(|_| DecodeError::Authentication)?;

        String::from_utf8(plaintext).map_err(|_| DecodeError::InvalidUtf8)
    }
}

/// Unauthenticated XOR keystream derived from SHA-256 of the token.
///
/// Kept for deployments that need the historical behaviour: revealing with the wrong token
/// usually yields garbage (or invalid UTF-8) rather than a clean failure.
#[derive(Clone, Copy, Debug, Default)]
pub struct LegacyCodec;

impl LegacyCodec {
    fn apply_keystream(key: &SessionToken, data: &mut [u8]) {
        for (counter, chunk) in data.chunks_mut(32).enumerate() {
            let mut hasher = Sha256::new();
            hasher.update(key.expose().as_bytes());
            hasher.update((counter as u64).to_be_bytes());
            let block = hasher.finalize();
            for (byte, k) in chunk.iter_mut().zip(block.iter()) {
                *byte ^= k;
            }
        }
    }
}

impl ContentCodec for LegacyCodec {
    fn protect(&self, plaintext: &str, key: &SessionToken) -> Result<String> {
        let mut data = plaintext.as_bytes().to_vec();
        Self::apply_keystream(key, &mut data);
        Ok(STANDARD.encode(data))
    }

    fn reveal(&self, stored: &str, key: &SessionToken) -> std::result::Result<String, DecodeError> {
        let mut data = STANDARD.decode(stored).map_err(|_| DecodeError::Malformed)?;
        Self::apply_keystream(key, &mut data);
        String::from_utf8(data).map_err(|_| DecodeError::InvalidUtf8)
    }
}
