//! Keyrings: ordered collections of dated symmetric keys.
//!
//! Each entry pairs a [`Key`] with two timestamps: `creation`, which ends
//! up on the wire as the key hint of envelopes sealed under the key, and
//! `valid_after`, which gates when the key may be used. Encryption always
//! picks the newest currently-valid key so that freshly rotated keys take
//! over immediately; decryption picks the key most likely contemporaneous
//! with the ciphertext's hint.
//!
//! Keyrings serialize through the attribute codec into a versioned file
//! format and are persisted with the atomic-write and auto-rotation
//! helpers in the [`file`] submodule, re-exported here.

mod file;

#[cfg(test)]
mod tests;

use std::time::{SystemTime, UNIX_EPOCH};

use crate::attrs::AttrList;
use crate::error::{Result, WebauthError};
use crate::key::{Key, KeySize, KeyType};

pub use file::KeyringUpdate;

/// The keyring file format version this crate reads and writes.
const KEYRING_VERSION: u32 = 1;

/// What a key selected from the keyring will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    /// Sealing new data; wants the newest valid key.
    Encrypt,
    /// Opening existing data; wants the key matching the envelope hint.
    Decrypt,
}

/// One dated key in a keyring.
///
/// The entry exclusively owns its key. Zero timestamps are legal at add
/// time; the auto-rotation layer interprets zero as "now" when it stamps
/// new entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyringEntry {
    creation: u64,
    valid_after: u64,
    key: Key,
}

impl KeyringEntry {
    /// Returns when the key was created, in seconds since the epoch.
    #[must_use]
    pub fn creation(&self) -> u64 {
        self.creation
    }

    /// Returns when the key becomes usable, in seconds since the epoch.
    #[must_use]
    pub fn valid_after(&self) -> u64 {
        self.valid_after
    }

    /// Returns the entry's key.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }
}

/// An ordered, index-addressable collection of dated keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyring {
    entries: Vec<KeyringEntry>,
}

impl Keyring {
    /// Creates an empty keyring with room for `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity.max(1)),
        }
    }

    /// Wraps a single key in a keyring, with zero timestamps.
    #[must_use]
    pub fn from_key(key: Key) -> Self {
        let mut ring = Self::new(1);
        ring.add(0, 0, key);
        ring
    }

    /// Appends an entry to the keyring.
    pub fn add(&mut self, creation: u64, valid_after: u64, key: Key) {
        self.entries.push(KeyringEntry {
            creation,
            valid_after,
            key,
        });
    }

    /// Removes the entry at `index`, shifting later entries down by one.
    ///
    /// # Errors
    ///
    /// Returns [`WebauthError::NotFound`] if `index` is out of range.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        if index >= self.entries.len() {
            return Err(WebauthError::not_found(format!(
                "keyring index {index} out of range"
            )));
        }
        self.entries.remove(index);
        Ok(())
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the keyring holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[KeyringEntry] {
        &self.entries
    }

    /// Selects the best entry for the given usage.
    ///
    /// Only entries whose `valid_after` is not in the future qualify. For
    /// [`KeyUsage::Encrypt`] the entry with the greatest `valid_after`
    /// wins, with ties going to the later insertion; `hint` is ignored.
    /// For [`KeyUsage::Decrypt`] the winner is the qualifying entry with
    /// the greatest `valid_after` that is still at or before `hint`.
    ///
    /// # Errors
    ///
    /// Returns [`WebauthError::NotFound`] if no entry qualifies.
    pub fn best_entry(&self, usage: KeyUsage, hint: u64) -> Result<&KeyringEntry> {
        let now = now_secs();
        let mut best: Option<&KeyringEntry> = None;
        for entry in &self.entries {
            if entry.valid_after > now {
                continue;
            }
            if usage == KeyUsage::Decrypt && entry.valid_after > hint {
                continue;
            }
            if best.map_or(true, |b| entry.valid_after >= b.valid_after) {
                best = Some(entry);
            }
        }
        best.ok_or_else(|| WebauthError::not_found("no valid keys found"))
    }

    /// Selects the best key for the given usage. See [`Self::best_entry`].
    ///
    /// # Errors
    ///
    /// Returns [`WebauthError::NotFound`] if no entry qualifies.
    pub fn best_key(&self, usage: KeyUsage, hint: u64) -> Result<&Key> {
        Ok(self.best_entry(usage, hint)?.key())
    }

    /// Serializes the keyring to its file format.
    ///
    /// # Errors
    ///
    /// Returns [`WebauthError::Corrupt`] if an entry's timestamps do not
    /// fit the 32-bit wire representation.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let count = u32::try_from(self.entries.len())
            .map_err(|_| WebauthError::corrupt("too many keyring entries to encode"))?;
        let mut attrs = AttrList::with_capacity(2 + self.entries.len() * 4);
        attrs.add_u32("v", KEYRING_VERSION);
        attrs.add_u32("n", count);
        for (i, entry) in self.entries.iter().enumerate() {
            attrs.add_time(&format!("ct{i}"), entry.creation)?;
            attrs.add_time(&format!("va{i}"), entry.valid_after)?;
            attrs.add_u32(&format!("kt{i}"), entry.key.key_type().wire_code());
            attrs.add_bytes(&format!("kd{i}"), entry.key.material());
        }
        Ok(attrs.encode())
    }

    /// Deserializes a keyring from its file format.
    ///
    /// # Errors
    ///
    /// Returns [`WebauthError::FileVersion`] for any format version other
    /// than 1, [`WebauthError::Corrupt`] for a malformed attribute stream
    /// or missing entry fields, and [`WebauthError::BadKey`] for key
    /// material of an impossible length.
    pub fn decode(input: &[u8]) -> Result<Self> {
        let attrs = AttrList::decode(input)?;
        let version = attrs
            .get_u32("v")?
            .ok_or_else(|| WebauthError::corrupt("missing v in keyring data"))?;
        if version != KEYRING_VERSION {
            return Err(WebauthError::FileVersion { version });
        }
        let count = attrs
            .get_u32("n")?
            .ok_or_else(|| WebauthError::corrupt("missing n in keyring data"))?;

        // Each entry occupies well over one byte of input, so a count
        // larger than the input itself can only be hostile or corrupt.
        if count as usize > input.len() {
            return Err(WebauthError::corrupt(format!(
                "keyring entry count {count} exceeds encoded data size"
            )));
        }

        let mut ring = Self::new(count as usize);
        for i in 0..count {
            let missing =
                |field: String| WebauthError::corrupt(format!("missing {field} in keyring data"));
            let creation = attrs
                .get_time(&format!("ct{i}"))?
                .ok_or_else(|| missing(format!("ct{i}")))?;
            let valid_after = attrs
                .get_time(&format!("va{i}"))?
                .ok_or_else(|| missing(format!("va{i}")))?;
            let type_code = attrs
                .get_u32(&format!("kt{i}"))?
                .ok_or_else(|| missing(format!("kt{i}")))?;
            let material = attrs
                .get_bytes(&format!("kd{i}"))
                .ok_or_else(|| missing(format!("kd{i}")))?;

            let key_type = KeyType::from_wire_code(type_code).ok_or_else(|| {
                WebauthError::corrupt(format!("unsupported key type {type_code} in keyring data"))
            })?;
            let size = KeySize::from_byte_len(material.len()).ok_or_else(|| {
                WebauthError::bad_key(format!(
                    "key {i} has impossible AES key length {}",
                    material.len()
                ))
            })?;
            let key = Key::new(key_type, size, material.to_vec())?;
            ring.add(creation, valid_after, key);
        }
        Ok(ring)
    }
}

/// Current time in whole seconds since the Unix epoch.
pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
