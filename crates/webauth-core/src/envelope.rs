//! Authenticated encryption envelope for tokens.
//!
//! The wire layout of a sealed payload is:
//!
//! ```text
//! [key hint: 4 bytes, big-endian u32]
//! [IV: 16 bytes]
//! [ciphertext: AES-CBC over the payload, PKCS#7 padded]
//! [tag: 20 bytes, HMAC-SHA1 over hint || IV || ciphertext]
//! ```
//!
//! The key hint is the creation timestamp of the encrypting keyring entry
//! and lets the decrypting side jump straight to the key most likely to
//! have produced the ciphertext. If the hinted key fails authentication,
//! every key in the keyring is tried in order of decreasing `valid_after`
//! before the envelope is rejected. Tag comparison is constant time.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha1::Sha1;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::{Result, WebauthError};
use crate::key::{Key, KeySize};
use crate::keyring::{KeyUsage, Keyring, KeyringEntry};

/// Length of the key-hint prefix in bytes.
pub const KEY_HINT_LEN: usize = 4;

/// Length of the AES-CBC initialization vector in bytes.
pub const IV_LEN: usize = 16;

/// Length of the HMAC-SHA1 tag in bytes.
pub const TAG_LEN: usize = 20;

/// AES block size; the ciphertext is always a multiple of this.
const BLOCK_LEN: usize = 16;

/// The smallest well-formed envelope: hint, IV, one cipher block, tag.
const MIN_SEALED_LEN: usize = KEY_HINT_LEN + IV_LEN + BLOCK_LEN + TAG_LEN;

type HmacSha1 = Hmac<Sha1>;

/// Encrypts and authenticates `payload` under the keyring's best
/// encryption key.
///
/// # Errors
///
/// Returns [`WebauthError::NotFound`] if the keyring has no currently
/// valid key, [`WebauthError::Corrupt`] if the chosen key's creation
/// timestamp does not fit the 32-bit hint, and [`WebauthError::BadKey`]
/// if the system random source fails.
pub fn seal(payload: &[u8], ring: &Keyring) -> Result<Vec<u8>> {
    let entry = ring.best_entry(KeyUsage::Encrypt, 0)?;
    let hint = u32::try_from(entry.creation()).map_err(|_| {
        WebauthError::corrupt(format!(
            "key creation timestamp {} does not fit the 32-bit key hint",
            entry.creation()
        ))
    })?;
    let mut iv = [0u8; IV_LEN];
    OsRng
        .try_fill_bytes(&mut iv)
        .map_err(|e| WebauthError::bad_key(format!("system random source failed: {e}")))?;
    seal_with(payload, entry.key(), hint, &iv)
}

/// Seals `payload` under one specific key with a caller-chosen hint and IV.
fn seal_with(payload: &[u8], key: &Key, hint: u32, iv: &[u8; IV_LEN]) -> Result<Vec<u8>> {
    let ciphertext = cbc_encrypt(key, iv, payload)?;
    let mut sealed =
        Vec::with_capacity(KEY_HINT_LEN + IV_LEN + ciphertext.len() + TAG_LEN);
    sealed.extend_from_slice(&hint.to_be_bytes());
    sealed.extend_from_slice(iv);
    sealed.extend_from_slice(&ciphertext);
    let tag = compute_tag(key, &sealed)?;
    sealed.extend_from_slice(&tag);
    Ok(sealed)
}

/// Verifies and decrypts a sealed payload using keys from the keyring.
///
/// The hinted key is tried first; on authentication failure every key is
/// tried in order of decreasing `valid_after`.
///
/// # Errors
///
/// Returns [`WebauthError::Corrupt`] for a structurally invalid envelope,
/// [`WebauthError::BadKey`] if the keyring is empty, and
/// [`WebauthError::BadHmac`] if no key authenticates the envelope.
pub fn open(sealed: &[u8], ring: &Keyring) -> Result<Vec<u8>> {
    if sealed.len() < MIN_SEALED_LEN {
        return Err(WebauthError::corrupt(format!(
            "encrypted data is {} bytes, shorter than the minimum envelope of {}",
            sealed.len(),
            MIN_SEALED_LEN
        )));
    }
    let (body, tag) = sealed.split_at(sealed.len() - TAG_LEN);
    let ciphertext_len = body.len() - KEY_HINT_LEN - IV_LEN;
    if ciphertext_len % BLOCK_LEN != 0 {
        return Err(WebauthError::corrupt(format!(
            "ciphertext length {ciphertext_len} is not a multiple of the AES block size"
        )));
    }
    if ring.is_empty() {
        return Err(WebauthError::bad_key("keyring has no keys"));
    }

    let mut hint_bytes = [0u8; KEY_HINT_LEN];
    hint_bytes.copy_from_slice(&body[..KEY_HINT_LEN]);
    let hint = u64::from(u32::from_be_bytes(hint_bytes));

    let hinted = ring.best_entry(KeyUsage::Decrypt, hint).ok();
    if let Some(entry) = hinted {
        if let Some(payload) = try_key(entry.key(), body, tag)? {
            return Ok(payload);
        }
    }

    // The hinted key did not authenticate the envelope, so fall back to
    // every key in the ring, newest valid_after first.
    let mut entries: Vec<&KeyringEntry> = ring.entries().iter().collect();
    entries.sort_by(|a, b| b.valid_after().cmp(&a.valid_after()));
    for entry in entries {
        if hinted.is_some_and(|h| std::ptr::eq(h, entry)) {
            continue;
        }
        if let Some(payload) = try_key(entry.key(), body, tag)? {
            debug!(
                hint,
                valid_after = entry.valid_after(),
                "decrypted with fallback key after hint miss"
            );
            return Ok(payload);
        }
    }
    Err(WebauthError::BadHmac)
}

/// Attempts to authenticate and decrypt the envelope body with one key.
///
/// Returns `Ok(None)` when the tag does not match under this key, which
/// lets the caller continue with other candidates.
fn try_key(key: &Key, body: &[u8], tag: &[u8]) -> Result<Option<Vec<u8>>> {
    let computed = compute_tag(key, body)?;
    if !bool::from(computed.as_slice().ct_eq(tag)) {
        return Ok(None);
    }
    let iv = &body[KEY_HINT_LEN..KEY_HINT_LEN + IV_LEN];
    let ciphertext = &body[KEY_HINT_LEN + IV_LEN..];
    cbc_decrypt(key, iv, ciphertext).map(Some)
}

/// Computes the HMAC-SHA1 tag over the hint, IV, and ciphertext.
fn compute_tag(key: &Key, body: &[u8]) -> Result<[u8; TAG_LEN]> {
    let mut mac = HmacSha1::new_from_slice(key.material())
        .map_err(|_| WebauthError::bad_key("key material rejected by HMAC"))?;
    mac.update(body);
    Ok(mac.finalize().into_bytes().into())
}

fn cbc_encrypt(key: &Key, iv: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
    let bad = |_| WebauthError::bad_key("key or IV length rejected by cipher");
    Ok(match key.size() {
        KeySize::Aes128 => cbc::Encryptor::<aes::Aes128>::new_from_slices(key.material(), iv)
            .map_err(bad)?
            .encrypt_padded_vec_mut::<Pkcs7>(payload),
        KeySize::Aes192 => cbc::Encryptor::<aes::Aes192>::new_from_slices(key.material(), iv)
            .map_err(bad)?
            .encrypt_padded_vec_mut::<Pkcs7>(payload),
        KeySize::Aes256 => cbc::Encryptor::<aes::Aes256>::new_from_slices(key.material(), iv)
            .map_err(bad)?
            .encrypt_padded_vec_mut::<Pkcs7>(payload),
    })
}

fn cbc_decrypt(key: &Key, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let bad = |_| WebauthError::bad_key("key or IV length rejected by cipher");
    let unpad = |_| WebauthError::corrupt("invalid padding in decrypted data");
    match key.size() {
        KeySize::Aes128 => cbc::Decryptor::<aes::Aes128>::new_from_slices(key.material(), iv)
            .map_err(bad)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(unpad),
        KeySize::Aes192 => cbc::Decryptor::<aes::Aes192>::new_from_slices(key.material(), iv)
            .map_err(bad)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(unpad),
        KeySize::Aes256 => cbc::Decryptor::<aes::Aes256>::new_from_slices(key.material(), iv)
            .map_err(bad)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(unpad),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::key::KeyType;

    fn test_ring() -> Keyring {
        let key = Key::random(KeyType::Aes, KeySize::Aes128).expect("key");
        let mut ring = Keyring::new(1);
        ring.add(1_700_000_000, 1_700_000_000, key);
        ring
    }

    #[test]
    fn seal_open_roundtrip() {
        let ring = test_ring();
        let payload = b"t=app;s=someuser;";
        let sealed = seal(payload, &ring).unwrap();
        assert_eq!(open(&sealed, &ring).unwrap(), payload);
    }

    #[test]
    fn roundtrip_all_key_sizes() {
        for size in [KeySize::Aes128, KeySize::Aes192, KeySize::Aes256] {
            let key = Key::random(KeyType::Aes, size).unwrap();
            let mut ring = Keyring::new(1);
            ring.add(100, 100, key);
            let sealed = seal(b"payload", &ring).unwrap();
            assert_eq!(open(&sealed, &ring).unwrap(), b"payload");
        }
    }

    #[test]
    fn hint_carries_key_creation() {
        let ring = test_ring();
        let sealed = seal(b"data", &ring).unwrap();
        let hint = u32::from_be_bytes(sealed[..4].try_into().unwrap());
        assert_eq!(u64::from(hint), ring.entries()[0].creation());
    }

    #[test]
    fn sealing_twice_differs_but_opens_identically() {
        let ring = test_ring();
        let a = seal(b"payload", &ring).unwrap();
        let b = seal(b"payload", &ring).unwrap();
        assert_ne!(a, b);
        assert_eq!(open(&a, &ring).unwrap(), open(&b, &ring).unwrap());
    }

    #[test]
    fn empty_keyring_is_bad_key() {
        let ring = test_ring();
        let sealed = seal(b"payload", &ring).unwrap();
        let empty = Keyring::new(0);
        assert!(matches!(
            open(&sealed, &empty),
            Err(WebauthError::BadKey { .. })
        ));
    }

    #[test]
    fn wrong_key_is_bad_hmac() {
        let ring = test_ring();
        let sealed = seal(b"payload", &ring).unwrap();
        let other = test_ring();
        assert!(matches!(open(&sealed, &other), Err(WebauthError::BadHmac)));
    }

    #[test]
    fn truncated_envelope_is_corrupt() {
        let ring = test_ring();
        let sealed = seal(b"payload", &ring).unwrap();
        assert!(matches!(
            open(&sealed[..MIN_SEALED_LEN - 1], &ring),
            Err(WebauthError::Corrupt { .. })
        ));
    }

    #[test]
    fn fallback_finds_key_despite_useless_hint() {
        // creation = 0 puts a zero hint on the wire, which selects no
        // entry (valid_after is 100), so decryption has to fall back to
        // scanning the ring.
        let key = Key::random(KeyType::Aes, KeySize::Aes128).unwrap();
        let mut ring = Keyring::new(1);
        ring.add(0, 100, key);
        let sealed = seal(b"payload", &ring).unwrap();
        assert_eq!(open(&sealed, &ring).unwrap(), b"payload");
    }

    proptest! {
        #[test]
        fn prop_any_single_bit_flip_is_rejected(
            payload in proptest::collection::vec(any::<u8>(), 1..128),
            flip in any::<usize>(),
        ) {
            let ring = test_ring();
            let mut sealed = seal(&payload, &ring).unwrap();
            let idx = flip % sealed.len();
            sealed[idx] ^= 0x01;
            let result = open(&sealed, &ring);
            let is_rejected = matches!(
                result,
                Err(WebauthError::BadHmac | WebauthError::Corrupt { .. })
            );
            prop_assert!(is_rejected);
        }

        #[test]
        fn prop_roundtrip_arbitrary_payloads(
            payload in proptest::collection::vec(any::<u8>(), 0..512),
        ) {
            let ring = test_ring();
            let sealed = seal(&payload, &ring).unwrap();
            prop_assert_eq!(open(&sealed, &ring).unwrap(), payload);
        }
    }
}
