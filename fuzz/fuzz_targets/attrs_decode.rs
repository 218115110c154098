#![no_main]
//! Fuzz target for the attribute-list codec.
//!
//! Feeds arbitrary bytes through `AttrList::decode` and, when parsing
//! succeeds, checks that re-encoding and re-decoding reproduces the same
//! list. No input may cause a panic or unbounded allocation.

use libfuzzer_sys::fuzz_target;
use webauth_core::attrs::AttrList;

fuzz_target!(|data: &[u8]| {
    let attrs = match AttrList::decode(data) {
        Ok(attrs) => attrs,
        Err(_) => return, // Expected for most fuzz inputs.
    };

    // Whatever decoded must survive a round trip.
    let reencoded = attrs.encode();
    let redecoded = AttrList::decode(&reencoded).expect("re-decode of encoded list failed");
    assert_eq!(redecoded, attrs);
});
