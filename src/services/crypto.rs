// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Encryption of third-party OAuth tokens at rest.
//!
//! AES-256-GCM with a key derived from `TOKEN_ENCRYPTION_KEY` via
//! HKDF-SHA256. The owning user's ID is bound in as associated data, so a
//! ciphertext copied onto another user's document fails to decrypt.
//!
//! Stored format: base64(nonce || ciphertext || tag).

use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hkdf::Hkdf;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;

const HKDF_SALT: &[u8] = b"werkout-api token encryption v1";
const HKDF_INFO: &[u8] = b"external-profile-tokens";

/// Authenticated token cipher.
pub struct TokenCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl TokenCipher {
    /// Derive the cipher key from raw key material.
    pub fn new(key_material: &[u8]) -> Result<Self, AppError> {
        if key_material.len() < 16 {
            return Err(AppError::Internal(anyhow::anyhow!(
                "token encryption key must be at least 16 bytes"
            )));
        }

        let mut okm = [0u8; 32];
        Hkdf::<Sha256>::new(Some(HKDF_SALT), key_material)
            .expand(HKDF_INFO, &mut okm)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("HKDF expand failed")))?;

        let unbound = UnboundKey::new(&AES_256_GCM, &okm)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("invalid AES-256-GCM key")))?;

        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Encrypt a token for `owner`.
    pub fn encrypt(&self, plaintext: &str, owner: &str) -> Result<String, AppError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("nonce generation failed")))?;

        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(owner.as_bytes()),
                &mut in_out,
            )
            .map_err(|_| AppError::Internal(anyhow::anyhow!("token encryption failed")))?;

        let mut out = Vec::with_capacity(NONCE_LEN + in_out.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&in_out);
        Ok(BASE64.encode(out))
    }

    /// Decrypt a token previously encrypted for `owner`.
    pub fn decrypt(&self, encoded: &str, owner: &str) -> Result<String, AppError> {
        let data = BASE64
            .decode(encoded)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid token encoding: {}", e)))?;

        if data.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "encrypted token is truncated"
            )));
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("invalid nonce")))?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::from(owner.as_bytes()), &mut in_out)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("token decryption failed")))?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|_| AppError::Internal(anyhow::anyhow!("decrypted token is not UTF-8")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> TokenCipher {
        TokenCipher::new(b"test_token_encryption_key_bytes!").unwrap()
    }

    #[test]
    fn test_decrypts_for_same_owner() {
        let c = cipher();
        let sealed = c.encrypt("strava-access-token", "user-a").unwrap();
        assert_ne!(sealed, "strava-access-token");
        assert_eq!(c.decrypt(&sealed, "user-a").unwrap(), "strava-access-token");
    }

    #[test]
    fn test_other_owner_cannot_decrypt() {
        let c = cipher();
        let sealed = c.encrypt("secret", "user-a").unwrap();
        assert!(c.decrypt(&sealed, "user-b").is_err());
    }

    #[test]
    fn test_nonces_are_fresh() {
        let c = cipher();
        assert_ne!(
            c.encrypt("same", "user-a").unwrap(),
            c.encrypt("same", "user-a").unwrap()
        );
    }

    #[test]
    fn test_tampering_detected() {
        let c = cipher();
        let sealed = c.encrypt("secret", "user-a").unwrap();
        let mut raw = BASE64.decode(&sealed).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        assert!(c.decrypt(&BASE64.encode(raw), "user-a").is_err());
        assert!(c.decrypt("AAAA", "user-a").is_err());
    }

    #[test]
    fn test_different_keys_do_not_interoperate() {
        let sealed = cipher().encrypt("secret", "user-a").unwrap();
        let other = TokenCipher::new(b"another_key_material_of_32_bytes").unwrap();
        assert!(other.decrypt(&sealed, "user-a").is_err());
    }

    #[test]
    fn test_short_key_rejected() {
        assert!(TokenCipher::new(b"short").is_err());
    }
}
