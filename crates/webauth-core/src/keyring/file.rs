//! Keyring persistence and automatic rotation.
//!
//! Keyring files contain key material, so they are written with owner-only
//! permissions (0600) and replaced atomically: the new contents go to a
//! temporary file in the same directory, which is then renamed over the
//! destination. A failed write never leaves the operational file truncated
//! and removes the temporary file before returning.

use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, WebauthError};
use crate::key::{Key, KeySize, KeyType};
use crate::keyring::{now_secs, Keyring};

/// What [`Keyring::auto_update`] did to the keyring file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyringUpdate {
    /// The file existed and no rotation was needed.
    None,
    /// The file did not exist and was created with a fresh key.
    Created,
    /// A fresh key was appended and the file rewritten.
    Updated,
}

impl Keyring {
    /// Loads and decodes a keyring file.
    ///
    /// # Errors
    ///
    /// Returns [`WebauthError::FileNotFound`] if the file does not exist,
    /// [`WebauthError::FileOpenRead`] or [`WebauthError::FileRead`] for
    /// other I/O failures, and the [`Keyring::decode`] errors for bad
    /// contents.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                WebauthError::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                WebauthError::FileOpenRead {
                    path: path.display().to_string(),
                    source,
                }
            }
        })?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|source| WebauthError::FileRead {
                path: path.display().to_string(),
                source,
            })?;
        Self::decode(&data)
    }

    /// Encodes the keyring and atomically replaces the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`WebauthError::FileOpenWrite`] if the temporary file
    /// cannot be created and [`WebauthError::FileWrite`] if writing or
    /// renaming fails. The temporary file is removed on every error path.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let encoded = self.encode()?;

        // The temporary file must live in the destination directory so
        // the final rename stays on one filesystem. NamedTempFile creates
        // it 0600 and unlinks it on drop unless the persist succeeds.
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut temp: NamedTempFile = tempfile::Builder::new()
            .prefix(&format!("{file_name}."))
            .tempfile_in(dir)
            .map_err(|source| WebauthError::FileOpenWrite {
                path: path.display().to_string(),
                source,
            })?;
        temp.write_all(&encoded)
            .map_err(|source| WebauthError::FileWrite {
                path: path.display().to_string(),
                source,
            })?;
        temp.persist(path).map_err(|e| WebauthError::FileWrite {
            path: path.display().to_string(),
            source: e.error,
        })?;
        debug!(path = %path.display(), entries = self.len(), "keyring written");
        Ok(())
    }

    /// Opens the keyring at `path`, creating or rotating it as needed.
    ///
    /// If the file does not exist and `create` is set, a new keyring with
    /// a fresh 128-bit AES key (stamped with the current time) is written
    /// and returned with [`KeyringUpdate::Created`]. If the file exists
    /// and `lifetime` is nonzero, a fresh key is appended and persisted
    /// when no entry's `valid_after` is within `lifetime` seconds of now,
    /// reported as [`KeyringUpdate::Updated`]. Otherwise the keyring is
    /// returned unchanged with [`KeyringUpdate::None`].
    ///
    /// # Errors
    ///
    /// Returns [`WebauthError::FileNotFound`] if the file is missing and
    /// `create` is not set, plus any read, decode, key-generation, or
    /// write error from the steps above.
    pub fn auto_update(
        path: impl AsRef<Path>,
        create: bool,
        lifetime: u64,
    ) -> Result<(Self, KeyringUpdate)> {
        let path = path.as_ref();
        let mut ring = match Self::read(path) {
            Ok(ring) => ring,
            Err(WebauthError::FileNotFound { .. }) if create => {
                let now = now_secs();
                let key = Key::random(KeyType::Aes, KeySize::Aes128)?;
                let mut ring = Self::new(1);
                ring.add(now, now, key);
                ring.write(path)?;
                debug!(path = %path.display(), "created new keyring");
                return Ok((ring, KeyringUpdate::Created));
            },
            Err(e) => return Err(e),
        };

        let now = now_secs();
        if lifetime > 0 && !ring.has_key_within_lifetime(lifetime, now) {
            let key = Key::random(KeyType::Aes, KeySize::Aes128)?;
            ring.add(now, now, key);
            ring.write(path)?;
            debug!(
                path = %path.display(),
                entries = ring.len(),
                "rotated keyring, newest key exceeded lifetime"
            );
            return Ok((ring, KeyringUpdate::Updated));
        }
        Ok((ring, KeyringUpdate::None))
    }

    /// Whether any entry became valid within `lifetime` seconds of `now`.
    fn has_key_within_lifetime(&self, lifetime: u64, now: u64) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.valid_after.saturating_add(lifetime) > now)
    }
}
