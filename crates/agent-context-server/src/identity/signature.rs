use crate::utils::error::IdentityError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Minimum accepted length (in characters) of the shared signing key.
pub const MIN_SIGNING_KEY_LEN: usize = 32;

/// HMAC-SHA256 signer/verifier for context identifiers.
///
/// Built once at startup from the configured secret and shared (cloned) into
/// every component that needs it. Signatures travel as standard padded Base64.
#[derive(Clone)]
pub struct SignatureCodec {
    mac: HmacSha256,
}

impl SignatureCodec {
    /// Build a codec from the configured secret.
    ///
    /// Fails when the key is missing, blank, or shorter than
    /// [`MIN_SIGNING_KEY_LEN`] characters.
    pub fn new(signing_key: &str) -> Result<Self, IdentityError> {
        if signing_key.trim().is_empty() {
            return Err(IdentityError::MissingSigningKey);
        }

        let key_len = signing_key.chars().count();
        if key_len < MIN_SIGNING_KEY_LEN {
            return Err(IdentityError::SigningKeyTooShort(key_len, MIN_SIGNING_KEY_LEN));
        }

        let mac = HmacSha256::new_from_slice(signing_key.as_bytes())
            .map_err(|_| IdentityError::MissingSigningKey)?;

        Ok(Self { mac })
    }

    /// Base64 HMAC-SHA256 of `message`.
    pub fn sign(&self, message: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(message.as_bytes());

        STANDARD.encode(mac.finalize().into_bytes())
    }

    /// Check `signature` against `message` using a fixed-time comparison.
    pub fn verify(&self, message: &str, signature: &str) -> bool {
        let Ok(signature_bytes) = STANDARD.decode(signature.trim()) else {
            return false;
        };

        let mut mac = self.mac.clone();
        mac.update(message.as_bytes());
        mac.verify_slice(&signature_bytes).is_ok()
    }
}

impl fmt::Debug for SignatureCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureCodec").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_rejects_missing_key() {
        assert_eq!(
            SignatureCodec::new("").unwrap_err(),
            IdentityError::MissingSigningKey
        );
        assert_eq!(
            SignatureCodec::new("   ").unwrap_err(),
            IdentityError::MissingSigningKey
        );
    }

    #[test]
    fn test_rejects_short_key() {
        assert_eq!(
            SignatureCodec::new("too-short").unwrap_err(),
            IdentityError::SigningKeyTooShort(9, MIN_SIGNING_KEY_LEN)
        );
    }

    #[test]
    fn test_sign_is_deterministic() {
        let codec = SignatureCodec::new(KEY).unwrap();
        assert_eq!(codec.sign("alice|1000"), codec.sign("alice|1000"));
        assert_ne!(codec.sign("alice|1000"), codec.sign("alice|1001"));

        // 32-byte MAC -> 44 Base64 characters with padding
        assert_eq!(codec.sign("alice|1000").len(), 44);
    }

    #[test]
    fn test_different_keys_disagree() {
        let a = SignatureCodec::new(KEY).unwrap();
        let b = SignatureCodec::new("fedcba9876543210fedcba9876543210").unwrap();

        let signature = a.sign("alice|1000");
        assert!(a.verify("alice|1000", &signature));
        assert!(!b.verify("alice|1000", &signature));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let codec = SignatureCodec::new(KEY).unwrap();
        assert!(!codec.verify("alice|1000", "bogus"));
        assert!(!codec.verify("alice|1000", ""));
        assert!(!codec.verify("alice|1000", "!!not-base64!!"));
    }

    #[test]
    fn test_flipping_any_signature_character_fails() {
        let codec = SignatureCodec::new(KEY).unwrap();
        let message = "alice|1000";
        let signature = codec.sign(message);

        for idx in 0..signature.len() {
            let mut chars: Vec<char> = signature.chars().collect();
            chars[idx] = if chars[idx] == 'A' { 'B' } else { 'A' };
            let tampered: String = chars.into_iter().collect();

            assert!(
                !codec.verify(message, &tampered),
                "tampered signature at index {} was accepted",
                idx
            );
        }
    }

    #[test]
    fn test_flipping_any_message_character_fails() {
        let codec = SignatureCodec::new(KEY).unwrap();
        let message = "alice|1000";
        let signature = codec.sign(message);

        for idx in 0..message.len() {
            let mut chars: Vec<char> = message.chars().collect();
            chars[idx] = if chars[idx] == 'x' { 'y' } else { 'x' };
            let tampered: String = chars.into_iter().collect();

            assert!(!codec.verify(&tampered, &signature));
        }
    }
}
