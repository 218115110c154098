//! Symmetric keys for token encryption.
//!
//! A [`Key`] pairs an algorithm tag with secret material of a fixed size.
//! Only AES is supported; the three AES key sizes map onto the cipher
//! variants used by the envelope layer. Key material is wrapped in
//! [`SecretBytes`] so it is wiped on drop and redacted from debug output.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{Result, WebauthError};
use crate::secret::SecretBytes;

/// Supported key algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum KeyType {
    /// AES in CBC mode, the only algorithm the wire format defines.
    Aes,
}

impl KeyType {
    /// Returns the numeric code used in the keyring file format.
    #[must_use]
    pub(crate) fn wire_code(self) -> u32 {
        match self {
            Self::Aes => 1,
        }
    }

    /// Maps a keyring file code back to a key type.
    #[must_use]
    pub(crate) fn from_wire_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Aes),
            _ => None,
        }
    }
}

/// Supported AES key sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySize {
    /// 128-bit key.
    Aes128,
    /// 192-bit key.
    Aes192,
    /// 256-bit key.
    Aes256,
}

impl KeySize {
    /// Returns the key size in bits.
    #[must_use]
    pub fn bits(self) -> u32 {
        match self {
            Self::Aes128 => 128,
            Self::Aes192 => 192,
            Self::Aes256 => 256,
        }
    }

    /// Returns the key size in bytes.
    #[must_use]
    pub fn bytes(self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        }
    }

    /// Maps a material length in bytes back to a key size.
    #[must_use]
    pub fn from_byte_len(len: usize) -> Option<Self> {
        match len {
            16 => Some(Self::Aes128),
            24 => Some(Self::Aes192),
            32 => Some(Self::Aes256),
            _ => None,
        }
    }
}

/// A symmetric key: algorithm tag, size, and secret material.
///
/// Keys are immutable once created. `Clone` produces a deep copy of the
/// material, which is the supported way to move a key between keyrings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    key_type: KeyType,
    size: KeySize,
    material: SecretBytes,
}

impl Key {
    /// Creates a key from explicit material.
    ///
    /// # Errors
    ///
    /// Returns [`WebauthError::BadKey`] if the material length does not
    /// match `size`.
    pub fn new(key_type: KeyType, size: KeySize, material: Vec<u8>) -> Result<Self> {
        if material.len() != size.bytes() {
            return Err(WebauthError::bad_key(format!(
                "key material is {} bytes, expected {} for AES-{}",
                material.len(),
                size.bytes(),
                size.bits()
            )));
        }
        Ok(Self {
            key_type,
            size,
            material: SecretBytes::new(material),
        })
    }

    /// Creates a key with fresh material from the system CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns [`WebauthError::BadKey`] if the system random source fails.
    pub fn random(key_type: KeyType, size: KeySize) -> Result<Self> {
        let mut material = vec![0u8; size.bytes()];
        OsRng
            .try_fill_bytes(&mut material)
            .map_err(|e| WebauthError::bad_key(format!("system random source failed: {e}")))?;
        Ok(Self {
            key_type,
            size,
            material: SecretBytes::new(material),
        })
    }

    /// Returns the key's algorithm tag.
    #[must_use]
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Returns the key's size.
    #[must_use]
    pub fn size(&self) -> KeySize {
        self.size
    }

    /// Returns the raw key material.
    #[must_use]
    pub fn material(&self) -> &[u8] {
        self.material.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_wrong_length() {
        let result = Key::new(KeyType::Aes, KeySize::Aes128, vec![0u8; 17]);
        assert!(matches!(result, Err(WebauthError::BadKey { .. })));
    }

    #[test]
    fn new_accepts_all_sizes() {
        for size in [KeySize::Aes128, KeySize::Aes192, KeySize::Aes256] {
            let key = Key::new(KeyType::Aes, size, vec![0u8; size.bytes()]).unwrap();
            assert_eq!(key.material().len(), size.bytes());
        }
    }

    #[test]
    fn random_keys_are_unique() {
        let a = Key::random(KeyType::Aes, KeySize::Aes128).unwrap();
        let b = Key::random(KeyType::Aes, KeySize::Aes128).unwrap();
        assert_ne!(a.material(), b.material());
    }

    #[test]
    fn clone_is_a_deep_copy() {
        let key = Key::random(KeyType::Aes, KeySize::Aes256).unwrap();
        let copy = key.clone();
        assert_eq!(key, copy);
        assert_eq!(key.material(), copy.material());
    }
}
