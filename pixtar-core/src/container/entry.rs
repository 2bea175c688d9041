use serde::{Deserialize, Serialize};

pub const MAGIC: &[u8; 6] = b"PIXTAR";
pub const VERSION: u16 = 1;

/// Upper bound on a serialized entry header, to bound decode allocations.
pub const MAX_HEADER_LEN: u32 = 64 * 1024;

/// Per-entry metadata, CBOR-encoded ahead of the raw body bytes.
///
/// The container holds one entry per packed source file; the framing
/// (length-prefixed headers, zero end marker) supports several so the
/// format does not need to change to carry more.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    pub name: String,
    pub mode: u32,
    pub mtime: i64,
    pub size: u64,
    /// blake3 of the body, checked on unpack.
    pub checksum: [u8; 32],
}
