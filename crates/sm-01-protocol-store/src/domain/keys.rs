//! # Backend Key Layout
//!
//! Every namespace maps to a byte prefix built from tagged, length-prefixed
//! segments:
//!
//! ```text
//! <area> ( 0x01 <len:u32 BE> <segment> )* 0x00 <key>
//! ```
//!
//! The `0x01` / `0x00` markers make the encoding prefix-free: a key in one
//! namespace can never be read back as a key in another namespace or in one
//! of its children, whatever bytes the names and keys contain.

/// Area byte for plain namespaces.
pub const DATA_AREA: u8 = b'd';
/// Area byte for namespaces that contribute to the commitment root.
pub const MERKLE_AREA: u8 = b'c';
/// Area byte for store metadata.
pub const META_AREA: u8 = b'm';

const SEGMENT_MARKER: u8 = 0x01;
const ENTRY_MARKER: u8 = 0x00;

/// A namespace location in the backend key space.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespacePath {
    area: u8,
    segments: Vec<String>,
}

impl NamespacePath {
    /// Top-level namespace.
    pub fn root(name: &str, merkle: bool) -> Self {
        Self {
            area: if merkle { MERKLE_AREA } else { DATA_AREA },
            segments: vec![name.to_string()],
        }
    }

    /// Nested namespace in the same area.
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self {
            area: self.area,
            segments,
        }
    }

    /// Nested namespace moved into the Merkle-committed area.
    pub fn merkle_child(&self, name: &str) -> Self {
        let mut child = self.child(name);
        child.area = MERKLE_AREA;
        child
    }

    /// True if entries contribute to the commitment root.
    pub fn is_merkle(&self) -> bool {
        self.area == MERKLE_AREA
    }

    /// Prefix shared by every entry directly in this namespace.
    pub fn entry_prefix(&self) -> Vec<u8> {
        let mut out = vec![self.area];
        for segment in &self.segments {
            out.push(SEGMENT_MARKER);
            out.extend_from_slice(&(segment.len() as u32).to_be_bytes());
            out.extend_from_slice(segment.as_bytes());
        }
        out.push(ENTRY_MARKER);
        out
    }

    /// Full backend key for `key` in this namespace.
    pub fn entry_key(&self, key: &[u8]) -> Vec<u8> {
        let mut out = self.entry_prefix();
        out.extend_from_slice(key);
        out
    }

    /// Human-readable path, for logs and errors.
    pub fn display(&self) -> String {
        self.segments.join("/")
    }
}

/// Key of the latest commit record.
pub fn latest_commit_key() -> Vec<u8> {
    let mut key = vec![META_AREA];
    key.extend_from_slice(b"latest");
    key
}

/// Key of the commit record for `version`.
pub fn commit_key(version: u64) -> Vec<u8> {
    let mut key = vec![META_AREA];
    key.extend_from_slice(b"commit/");
    key.extend_from_slice(&version.to_be_bytes());
    key
}
