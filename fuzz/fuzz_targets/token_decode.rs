#![no_main]
//! Fuzz target for token decoding.
//!
//! Drives `Token::decode_raw` with arbitrary bytes against a fixed
//! keyring. Almost every input must be rejected; none may panic,
//! and nothing that fails authentication may ever produce a token.

use std::sync::OnceLock;

use libfuzzer_sys::fuzz_target;
use webauth_core::{Key, KeySize, KeyType, Keyring, Token};

fn test_ring() -> &'static Keyring {
    static RING: OnceLock<Keyring> = OnceLock::new();
    RING.get_or_init(|| {
        let key = Key::new(KeyType::Aes, KeySize::Aes128, vec![0x42; 16])
            .expect("static key material is valid");
        let mut ring = Keyring::new(1);
        ring.add(1_000_000, 1_000_000, key);
        ring
    })
}

fuzz_target!(|data: &[u8]| {
    let _ = Token::decode_raw(data, None, test_ring());
});
