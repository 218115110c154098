//! Attribute-list codec.
//!
//! Tokens and keyring files are serialized as an ordered list of
//! `name=value;` records. A literal `;` inside a value is escaped by
//! doubling (`;;`); everything else passes through untouched, so values
//! may hold arbitrary bytes. Typed accessors layer strings, big-endian
//! `u32` values, timestamps, and raw bytes over the untyped records.
//!
//! Timestamps are carried as unsigned 32-bit seconds since the epoch, so
//! the wire format cannot represent times past early 2106. Encoding a
//! later timestamp is reported as corrupt rather than silently truncated.

use crate::error::{Result, WebauthError};

/// An ordered list of `(name, value)` attribute pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrList {
    attrs: Vec<(String, Vec<u8>)>,
}

impl AttrList {
    /// Creates an empty attribute list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty attribute list with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            attrs: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of attributes in the list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Returns `true` if the list holds no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Appends a raw byte attribute.
    pub fn add_bytes(&mut self, name: &str, value: impl Into<Vec<u8>>) {
        self.attrs.push((name.to_string(), value.into()));
    }

    /// Appends a UTF-8 string attribute.
    pub fn add_str(&mut self, name: &str, value: &str) {
        self.add_bytes(name, value.as_bytes());
    }

    /// Appends a `u32` attribute in network byte order.
    pub fn add_u32(&mut self, name: &str, value: u32) {
        self.add_bytes(name, value.to_be_bytes());
    }

    /// Appends a timestamp attribute as unsigned 32-bit seconds.
    ///
    /// # Errors
    ///
    /// Returns [`WebauthError::Corrupt`] if `seconds` does not fit in the
    /// 32-bit wire representation.
    pub fn add_time(&mut self, name: &str, seconds: u64) -> Result<()> {
        let wire = u32::try_from(seconds).map_err(|_| {
            WebauthError::corrupt(format!(
                "timestamp {seconds} for {name} does not fit the 32-bit wire format"
            ))
        })?;
        self.add_u32(name, wire);
        Ok(())
    }

    /// Looks up an attribute by name and returns its raw bytes.
    #[must_use]
    pub fn get_bytes(&self, name: &str) -> Option<&[u8]> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Looks up an attribute and interprets it as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`WebauthError::Corrupt`] if the value is not valid UTF-8.
    pub fn get_str(&self, name: &str) -> Result<Option<&str>> {
        match self.get_bytes(name) {
            None => Ok(None),
            Some(value) => std::str::from_utf8(value).map(Some).map_err(|_| {
                WebauthError::corrupt(format!("attribute {name} is not valid UTF-8"))
            }),
        }
    }

    /// Looks up an attribute and interprets it as a network-order `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`WebauthError::Corrupt`] if the value is not exactly four
    /// bytes.
    pub fn get_u32(&self, name: &str) -> Result<Option<u32>> {
        match self.get_bytes(name) {
            None => Ok(None),
            Some(value) => {
                let raw: [u8; 4] = value.try_into().map_err(|_| {
                    WebauthError::corrupt(format!(
                        "attribute {name} is {} bytes, expected 4",
                        value.len()
                    ))
                })?;
                Ok(Some(u32::from_be_bytes(raw)))
            },
        }
    }

    /// Looks up a timestamp attribute (unsigned 32-bit seconds).
    ///
    /// # Errors
    ///
    /// Returns [`WebauthError::Corrupt`] if the value is not exactly four
    /// bytes.
    pub fn get_time(&self, name: &str) -> Result<Option<u64>> {
        Ok(self.get_u32(name)?.map(u64::from))
    }

    /// Serializes the list to its wire form.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        for (name, value) in &self.attrs {
            out.extend_from_slice(name.as_bytes());
            out.push(b'=');
            for &byte in value {
                if byte == b';' {
                    out.push(b';');
                }
                out.push(byte);
            }
            out.push(b';');
        }
        out
    }

    /// Parses an attribute list from its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`WebauthError::Corrupt`] for a record without `=`, an
    /// unterminated final record, or a non-UTF-8 attribute name.
    pub fn decode(input: &[u8]) -> Result<Self> {
        let mut attrs = Self::new();
        let mut pos = 0;
        while pos < input.len() {
            let eq = input[pos..]
                .iter()
                .position(|&b| b == b'=')
                .map(|off| pos + off)
                .ok_or_else(|| {
                    WebauthError::corrupt("attribute record is missing '=' separator")
                })?;
            let name = std::str::from_utf8(&input[pos..eq])
                .map_err(|_| WebauthError::corrupt("attribute name is not valid UTF-8"))?
                .to_string();
            pos = eq + 1;

            let mut value = Vec::new();
            let mut terminated = false;
            while pos < input.len() {
                match input[pos] {
                    b';' if input.get(pos + 1) == Some(&b';') => {
                        value.push(b';');
                        pos += 2;
                    },
                    b';' => {
                        pos += 1;
                        terminated = true;
                        break;
                    },
                    byte => {
                        value.push(byte);
                        pos += 1;
                    },
                }
            }
            if !terminated {
                return Err(WebauthError::corrupt(format!(
                    "unterminated value for attribute {name}"
                )));
            }
            attrs.attrs.push((name, value));
        }
        Ok(attrs)
    }

    /// Upper bound on the encoded size, assuming no escaping.
    fn encoded_len(&self) -> usize {
        self.attrs
            .iter()
            .map(|(n, v)| n.len() + v.len() + 2)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn roundtrip_basic() {
        let mut attrs = AttrList::new();
        attrs.add_str("t", "app");
        attrs.add_str("s", "someuser");
        attrs.add_u32("loa", 3);
        attrs.add_bytes("k", vec![0u8, 1, 2, 0xff]);

        let encoded = attrs.encode();
        let decoded = AttrList::decode(&encoded).unwrap();
        assert_eq!(decoded, attrs);
        assert_eq!(decoded.get_str("s").unwrap(), Some("someuser"));
        assert_eq!(decoded.get_u32("loa").unwrap(), Some(3));
        assert_eq!(decoded.get_bytes("k"), Some([0u8, 1, 2, 0xff].as_slice()));
    }

    #[test]
    fn semicolons_are_escaped() {
        let mut attrs = AttrList::new();
        attrs.add_bytes("d", b"a;b;;c".as_slice());

        let encoded = attrs.encode();
        assert_eq!(encoded, b"d=a;;b;;;;c;");
        let decoded = AttrList::decode(&encoded).unwrap();
        assert_eq!(decoded.get_bytes("d"), Some(b"a;b;;c".as_slice()));
    }

    #[test]
    fn empty_input_decodes_to_empty_list() {
        let decoded = AttrList::decode(b"").unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn empty_value_roundtrips() {
        let mut attrs = AttrList::new();
        attrs.add_str("ro", "");
        let decoded = AttrList::decode(&attrs.encode()).unwrap();
        assert_eq!(decoded.get_str("ro").unwrap(), Some(""));
    }

    #[test]
    fn missing_equals_is_corrupt() {
        let result = AttrList::decode(b"noequals");
        assert!(matches!(result, Err(WebauthError::Corrupt { .. })));
    }

    #[test]
    fn unterminated_record_is_corrupt() {
        let result = AttrList::decode(b"a=1;b=unterminated");
        assert!(matches!(result, Err(WebauthError::Corrupt { .. })));
    }

    #[test]
    fn trailing_escape_is_corrupt() {
        // The final ";;" is an escaped semicolon, leaving the record open.
        let result = AttrList::decode(b"a=x;;");
        assert!(matches!(result, Err(WebauthError::Corrupt { .. })));
    }

    #[test]
    fn wrong_width_u32_is_corrupt() {
        let mut attrs = AttrList::new();
        attrs.add_bytes("n", vec![1u8, 2, 3]);
        let decoded = AttrList::decode(&attrs.encode()).unwrap();
        assert!(matches!(
            decoded.get_u32("n"),
            Err(WebauthError::Corrupt { .. })
        ));
    }

    #[test]
    fn time_past_wire_range_is_corrupt() {
        let mut attrs = AttrList::new();
        let result = attrs.add_time("et", u64::from(u32::MAX) + 1);
        assert!(matches!(result, Err(WebauthError::Corrupt { .. })));
    }

    #[test]
    fn time_at_wire_limit_roundtrips() {
        let mut attrs = AttrList::new();
        attrs.add_time("et", u64::from(u32::MAX)).unwrap();
        let decoded = AttrList::decode(&attrs.encode()).unwrap();
        assert_eq!(decoded.get_time("et").unwrap(), Some(u64::from(u32::MAX)));
    }

    proptest! {
        #[test]
        fn prop_roundtrip(
            pairs in proptest::collection::vec(
                ("[a-z]{1,8}", proptest::collection::vec(any::<u8>(), 0..64)),
                0..16,
            )
        ) {
            let mut attrs = AttrList::new();
            for (name, value) in &pairs {
                attrs.add_bytes(name, value.clone());
            }
            let decoded = AttrList::decode(&attrs.encode()).unwrap();
            prop_assert_eq!(decoded, attrs);
        }

        #[test]
        fn prop_decode_never_panics(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = AttrList::decode(&data);
        }
    }
}
