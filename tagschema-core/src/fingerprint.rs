use std::fmt;

/// A 32-byte Blake3 digest of a schema's shape.
///
/// Two schemas share a fingerprint when they partition the same keys into
/// nodes and sub-schemas, with the same codec value types at every node.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub(crate) fn from_hasher(hasher: &blake3::Hasher) -> Self {
        Fingerprint(*hasher.finalize().as_bytes())
    }

    /// Returns the digest as a byte slice.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn write_hex(&self, f: &mut fmt::Formatter<'_>, len: usize) -> fmt::Result {
        self.0[..len].iter().try_for_each(|byte| write!(f, "{byte:02x}"))
    }
}

/// Abbreviated to the first eight bytes.
impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Fingerprint(")?;
        self.write_hex(f, 8)?;
        f.write_str("..)")
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_hex(f, self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_hex() {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"shape");
        let s = Fingerprint::from_hasher(&hasher).to_string();
        assert_eq!(s.len(), 64);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn debug_shows_a_prefix() {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"shape");
        let fingerprint = Fingerprint::from_hasher(&hasher);

        let debug = format!("{fingerprint:?}");
        assert_eq!(debug, format!("Fingerprint({}..)", &fingerprint.to_string()[..16]));
    }
}
