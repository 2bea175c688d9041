use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use super::scopes::Scope;
use crate::error::{PixtarError, Result};
use crate::pixel::{PAD_BYTE, PIXEL_BYTES, Pixel};

/// Default per-worker read buffer cap: 8 MiB, independent of file size.
pub const DEFAULT_BUFFER_CAP: usize = 8 * 1024 * 1024;

/// Encoded output of one scope, keyed for reassembly.
pub struct ChunkResult {
    pub index: usize,
    pub pixels: Vec<Pixel>,
}

/// Encode one scope of `path` into pixels.
///
/// Opens its own handle (workers never share a read cursor) and reads in
/// passes of at most `buffer_cap` bytes, advancing a single offset until it
/// reaches `scope.end` or a read runs dry. Every full group becomes one
/// pixel; a final group short of `PIXEL_BYTES` is padded with `PAD_BYTE`.
/// Aligned scope boundaries guarantee only the globally final scope can hit
/// that case. Read errors propagate; there is no silent short result.
pub fn encode_scope(path: &Path, scope: Scope, buffer_cap: usize) -> std::io::Result<Vec<Pixel>> {
    let mut f = File::open(path)?;
    f.seek(SeekFrom::Start(scope.start))?;

    let mut buf = vec![0u8; pass_len(buffer_cap, scope.len())];
    let mut pixels = Vec::with_capacity((scope.len() as usize).div_ceil(PIXEL_BYTES));

    let mut offset = scope.start;
    while offset < scope.end {
        let want = buf.len().min((scope.end - offset) as usize);
        let n = read_full(&mut f, &mut buf[..want])?;
        if n == 0 {
            break;
        }
        let mut groups = buf[..n].chunks_exact(PIXEL_BYTES);
        for g in &mut groups {
            pixels.push([g[0], g[1], g[2], g[3]]);
        }
        let tail = groups.remainder();
        if !tail.is_empty() {
            let mut px: Pixel = [PAD_BYTE; PIXEL_BYTES];
            px[..tail.len()].copy_from_slice(tail);
            pixels.push(px);
        }
        offset += n as u64;
    }
    Ok(pixels)
}

/// Merge chunk results, delivered in arbitrary order, back into index order.
///
/// Indices must be exactly `0..n`; a gap or duplicate means a worker result
/// was lost or delivered twice, which is fatal.
pub fn reassemble(mut results: Vec<ChunkResult>) -> Result<Vec<Pixel>> {
    results.sort_by_key(|r| r.index);
    for (pos, r) in results.iter().enumerate() {
        if r.index != pos {
            return Err(PixtarError::Format(format!(
                "chunk index mismatch: expected {pos}, got {}",
                r.index
            )));
        }
    }
    let total: usize = results.iter().map(|r| r.pixels.len()).sum();
    let mut pixels = Vec::with_capacity(total);
    for r in results {
        pixels.extend(r.pixels);
    }
    Ok(pixels)
}

/// Pass buffer length: the cap (group-aligned, defaulted) or the whole
/// scope, whichever is smaller.
fn pass_len(buffer_cap: usize, scope_len: u64) -> usize {
    let cap = if buffer_cap == 0 {
        DEFAULT_BUFFER_CAP
    } else {
        buffer_cap
    };
    let cap = (cap - cap % PIXEL_BYTES).max(PIXEL_BYTES);
    cap.min(scope_len as usize)
}

// Read until `buf` is full or EOF; returns bytes read.
fn read_full(f: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let k = f.read(&mut buf[filled..])?;
        if k == 0 {
            break;
        }
        filled += k;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::scopes::partition;
    use std::io::Write;

    fn temp_with(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f
    }

    #[test]
    fn only_the_final_group_pads() {
        let f = temp_with(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        let scopes = partition(10, 2);
        let a = encode_scope(f.path(), scopes[0], 0).unwrap();
        let b = encode_scope(f.path(), scopes[1], 0).unwrap();
        assert_eq!(a, vec![[1, 2, 3, 4]]);
        assert_eq!(b, vec![[5, 6, 7, 8], [9, 10, PAD_BYTE, PAD_BYTE]]);
    }

    #[test]
    fn multiple_bounded_passes_advance_the_offset() {
        // scope larger than the buffer cap forces several passes
        let bytes: Vec<u8> = (0..64u8).collect();
        let f = temp_with(&bytes);
        let scope = Scope { start: 0, end: 64 };
        let small = encode_scope(f.path(), scope, 8).unwrap();
        let large = encode_scope(f.path(), scope, 0).unwrap();
        assert_eq!(small.len(), 16);
        assert_eq!(small, large);
    }

    #[test]
    fn scope_offsets_are_honored() {
        let bytes: Vec<u8> = (0..32u8).collect();
        let f = temp_with(&bytes);
        let px = encode_scope(f.path(), Scope { start: 8, end: 16 }, 0).unwrap();
        assert_eq!(px, vec![[8, 9, 10, 11], [12, 13, 14, 15]]);
    }

    #[test]
    fn empty_scope_yields_no_pixels() {
        let f = temp_with(&[]);
        let px = encode_scope(f.path(), Scope { start: 0, end: 0 }, 0).unwrap();
        assert!(px.is_empty());
    }

    #[test]
    fn reassembles_out_of_order_arrivals() {
        let results = vec![
            ChunkResult { index: 2, pixels: vec![[9, 9, 9, 9]] },
            ChunkResult { index: 0, pixels: vec![[1, 1, 1, 1], [2, 2, 2, 2]] },
            ChunkResult { index: 1, pixels: vec![[5, 5, 5, 5]] },
        ];
        let pixels = reassemble(results).unwrap();
        assert_eq!(
            pixels,
            vec![[1, 1, 1, 1], [2, 2, 2, 2], [5, 5, 5, 5], [9, 9, 9, 9]]
        );
    }

    #[test]
    fn duplicate_or_missing_index_is_fatal() {
        let dup = vec![
            ChunkResult { index: 0, pixels: vec![] },
            ChunkResult { index: 0, pixels: vec![] },
        ];
        assert!(reassemble(dup).is_err());

        let gap = vec![
            ChunkResult { index: 0, pixels: vec![] },
            ChunkResult { index: 2, pixels: vec![] },
        ];
        assert!(reassemble(gap).is_err());
    }
}
