//! Tests for the keyring core and its file persistence.

use std::fs;
use std::os::unix::fs::PermissionsExt;

use tempfile::TempDir;

use super::*;
use crate::attrs::AttrList;
use crate::key::{Key, KeySize, KeyType};

fn test_key() -> Key {
    Key::random(KeyType::Aes, KeySize::Aes128).expect("failed to generate key")
}

fn sized_key(size: KeySize) -> Key {
    Key::random(KeyType::Aes, size).expect("failed to generate key")
}

#[test]
fn new_keyring_is_empty() {
    let ring = Keyring::new(4);
    assert!(ring.is_empty());
    assert_eq!(ring.len(), 0);
}

#[test]
fn from_key_wraps_with_zero_times() {
    let ring = Keyring::from_key(test_key());
    assert_eq!(ring.len(), 1);
    assert_eq!(ring.entries()[0].creation(), 0);
    assert_eq!(ring.entries()[0].valid_after(), 0);
}

#[test]
fn add_appends_in_order() {
    let mut ring = Keyring::new(2);
    ring.add(10, 20, test_key());
    ring.add(30, 40, test_key());
    assert_eq!(ring.entries()[0].creation(), 10);
    assert_eq!(ring.entries()[1].creation(), 30);
}

#[test]
fn remove_shifts_later_entries_down() {
    let mut ring = Keyring::new(3);
    ring.add(1, 1, test_key());
    ring.add(2, 2, test_key());
    ring.add(3, 3, test_key());

    let second = ring.entries()[1].clone();
    let third = ring.entries()[2].clone();
    ring.remove(0).unwrap();

    assert_eq!(ring.len(), 2);
    assert_eq!(ring.entries()[0], second);
    assert_eq!(ring.entries()[1], third);
}

#[test]
fn remove_out_of_range_is_not_found() {
    let mut ring = Keyring::from_key(test_key());
    assert!(matches!(
        ring.remove(1),
        Err(WebauthError::NotFound { .. })
    ));
}

#[test]
fn best_key_for_encrypt_picks_newest_valid() {
    let mut ring = Keyring::new(3);
    ring.add(100, 100, test_key());
    ring.add(200, 200, test_key());
    // Not valid yet, must be skipped even though it is newest.
    ring.add(300, u64::from(u32::MAX), test_key());

    let entry = ring.best_entry(KeyUsage::Encrypt, 0).unwrap();
    assert_eq!(entry.valid_after(), 200);
}

#[test]
fn best_key_for_encrypt_ties_go_to_later_insertion() {
    let mut ring = Keyring::new(2);
    let first = test_key();
    let second = test_key();
    ring.add(100, 100, first);
    ring.add(200, 100, second.clone());

    let entry = ring.best_entry(KeyUsage::Encrypt, 0).unwrap();
    assert_eq!(entry.key(), &second);
}

#[test]
fn best_key_with_only_future_keys_is_not_found() {
    let mut ring = Keyring::new(1);
    ring.add(100, u64::from(u32::MAX), test_key());
    assert!(matches!(
        ring.best_entry(KeyUsage::Encrypt, 0),
        Err(WebauthError::NotFound { .. })
    ));
}

#[test]
fn empty_keyring_has_no_best_key() {
    let ring = Keyring::new(0);
    assert!(matches!(
        ring.best_key(KeyUsage::Encrypt, 0),
        Err(WebauthError::NotFound { .. })
    ));
}

#[test]
fn best_key_for_decrypt_honors_hint() {
    let mut ring = Keyring::new(2);
    ring.add(1000, 1000, test_key());
    ring.add(2000, 2000, test_key());

    // A ciphertext hinted at 1500 was sealed under the first key.
    let entry = ring.best_entry(KeyUsage::Decrypt, 1500).unwrap();
    assert_eq!(entry.valid_after(), 1000);

    // A hint at or past the second key's validity selects it instead.
    let entry = ring.best_entry(KeyUsage::Decrypt, 2000).unwrap();
    assert_eq!(entry.valid_after(), 2000);
}

#[test]
fn best_key_for_decrypt_with_hint_before_all_keys_is_not_found() {
    let mut ring = Keyring::new(1);
    ring.add(1000, 1000, test_key());
    assert!(matches!(
        ring.best_entry(KeyUsage::Decrypt, 500),
        Err(WebauthError::NotFound { .. })
    ));
}

#[test]
fn encode_decode_roundtrip_preserves_entries() {
    let mut ring = Keyring::new(3);
    ring.add(100, 150, sized_key(KeySize::Aes128));
    ring.add(200, 250, sized_key(KeySize::Aes192));
    ring.add(300, 350, sized_key(KeySize::Aes256));

    let decoded = Keyring::decode(&ring.encode().unwrap()).unwrap();
    assert_eq!(decoded, ring);
}

#[test]
fn decode_then_encode_is_byte_identical() {
    let mut ring = Keyring::new(2);
    ring.add(100, 100, test_key());
    ring.add(200, 200, test_key());

    let encoded = ring.encode().unwrap();
    let reencoded = Keyring::decode(&encoded).unwrap().encode().unwrap();
    assert_eq!(encoded, reencoded);
}

#[test]
fn decode_rejects_wrong_version() {
    let mut attrs = AttrList::new();
    attrs.add_u32("v", 2);
    attrs.add_u32("n", 0);
    let result = Keyring::decode(&attrs.encode());
    assert!(matches!(
        result,
        Err(WebauthError::FileVersion { version: 2 })
    ));
}

#[test]
fn decode_rejects_missing_entry_fields() {
    let mut attrs = AttrList::new();
    attrs.add_u32("v", 1);
    attrs.add_u32("n", 1);
    let result = Keyring::decode(&attrs.encode());
    assert!(matches!(result, Err(WebauthError::Corrupt { .. })));
}

#[test]
fn decode_rejects_hostile_entry_count() {
    let mut attrs = AttrList::new();
    attrs.add_u32("v", 1);
    attrs.add_u32("n", u32::MAX);
    let result = Keyring::decode(&attrs.encode());
    assert!(matches!(result, Err(WebauthError::Corrupt { .. })));
}

#[test]
fn decode_rejects_bad_key_length() {
    let mut attrs = AttrList::new();
    attrs.add_u32("v", 1);
    attrs.add_u32("n", 1);
    attrs.add_time("ct0", 100).unwrap();
    attrs.add_time("va0", 100).unwrap();
    attrs.add_u32("kt0", 1);
    attrs.add_bytes("kd0", vec![0u8; 15]);
    let result = Keyring::decode(&attrs.encode());
    assert!(matches!(result, Err(WebauthError::BadKey { .. })));
}

#[test]
fn write_then_read_roundtrips() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("keyring");

    let mut ring = Keyring::new(2);
    ring.add(100, 100, test_key());
    ring.add(200, 200, test_key());
    ring.write(&path).unwrap();

    let loaded = Keyring::read(&path).unwrap();
    assert_eq!(loaded, ring);
}

#[test]
fn write_sets_owner_only_permissions() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("keyring");

    Keyring::from_key(test_key()).write(&path).unwrap();

    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600, "keyring file should be 0600");
}

#[test]
fn write_leaves_no_temporary_files() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("keyring");

    Keyring::from_key(test_key()).write(&path).unwrap();

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["keyring".to_string()]);
}

#[test]
fn read_missing_file_is_file_not_found() {
    let dir = TempDir::new().expect("tempdir");
    let result = Keyring::read(dir.path().join("absent"));
    assert!(matches!(result, Err(WebauthError::FileNotFound { .. })));
}

#[test]
fn auto_update_without_create_fails_on_missing_file() {
    let dir = TempDir::new().expect("tempdir");
    let result = Keyring::auto_update(dir.path().join("absent"), false, 3600);
    assert!(matches!(result, Err(WebauthError::FileNotFound { .. })));
}

#[test]
fn auto_update_creates_a_fresh_keyring() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("keyring");

    let (ring, status) = Keyring::auto_update(&path, true, 3600).unwrap();
    assert_eq!(status, KeyringUpdate::Created);
    assert_eq!(ring.len(), 1);

    let entry = &ring.entries()[0];
    let now = now_secs();
    assert!(entry.creation() <= now && entry.creation() >= now - 60);
    assert_eq!(entry.creation(), entry.valid_after());
    assert_eq!(entry.key().size(), KeySize::Aes128);

    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn auto_update_leaves_fresh_keyring_alone() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("keyring");

    let (first, _) = Keyring::auto_update(&path, true, 3600).unwrap();
    let (second, status) = Keyring::auto_update(&path, false, 3600).unwrap();
    assert_eq!(status, KeyringUpdate::None);
    assert_eq!(second, first);
}

#[test]
fn auto_update_rotates_an_aged_keyring() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("keyring");
    let lifetime = 3600;

    // Single entry that became valid two lifetimes ago.
    let now = now_secs();
    let stale = now - 2 * lifetime;
    let mut ring = Keyring::new(1);
    ring.add(stale, stale, test_key());
    ring.write(&path).unwrap();

    let (updated, status) = Keyring::auto_update(&path, false, lifetime).unwrap();
    assert_eq!(status, KeyringUpdate::Updated);
    assert_eq!(updated.len(), 2);
    assert_eq!(updated.entries()[0].valid_after(), stale);
    assert!(updated.entries()[1].creation() >= now);

    // The rotation was persisted and the file stayed owner-only.
    let reloaded = Keyring::read(&path).unwrap();
    assert_eq!(reloaded, updated);
    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn auto_update_with_zero_lifetime_never_rotates() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("keyring");

    let mut ring = Keyring::new(1);
    ring.add(100, 100, test_key());
    ring.write(&path).unwrap();

    let (_, status) = Keyring::auto_update(&path, false, 0).unwrap();
    assert_eq!(status, KeyringUpdate::None);
}
