use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use super::entry::{EntryHeader, MAGIC, VERSION};
use crate::error::{PixtarError, Result};

const COPY_BUF: usize = 1 << 16;

fn mode_from(_md: &std::fs::Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        _md.permissions().mode()
    }
    #[cfg(not(unix))]
    {
        0o100644
    }
}

fn mtime_from(md: &std::fs::Metadata) -> i64 {
    md.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Wrap `source` as a single-entry container written to `out`.
///
/// Layout: magic + version, then per entry a little-endian `u32` header
/// length, the CBOR header, and `size` raw body bytes; a zero length
/// terminates the stream. The body is streamed twice, once to checksum and
/// once to copy, both through a bounded buffer.
pub fn pack(source: &Path, mut out: impl Write) -> Result<EntryHeader> {
    let md = std::fs::metadata(source)?;
    if !md.is_file() {
        return Err(PixtarError::Format(format!(
            "not a regular file: {}",
            source.display()
        )));
    }
    let name = source
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .ok_or_else(|| {
            PixtarError::Format(format!("source has no usable name: {}", source.display()))
        })?;

    let header = EntryHeader {
        name,
        mode: mode_from(&md),
        mtime: mtime_from(&md),
        size: md.len(),
        checksum: hash_file(source)?,
    };

    let mut header_buf = Vec::new();
    ciborium::ser::into_writer(&header, &mut header_buf)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    out.write_all(MAGIC)?;
    out.write_all(&VERSION.to_le_bytes())?;
    out.write_all(&(header_buf.len() as u32).to_le_bytes())?;
    out.write_all(&header_buf)?;

    let mut src = File::open(source)?;
    let mut buf = vec![0u8; COPY_BUF];
    let mut copied = 0u64;
    loop {
        let k = src.read(&mut buf)?;
        if k == 0 {
            break;
        }
        out.write_all(&buf[..k])?;
        copied += k as u64;
    }
    if copied != header.size {
        return Err(PixtarError::Format(format!(
            "source changed while packing: header says {} bytes, copied {copied}",
            header.size
        )));
    }

    out.write_all(&0u32.to_le_bytes())?;
    out.flush()?;
    Ok(header)
}

/// Pack `source` into a temporary container beside it.
///
/// The file is removed when the returned handle drops, so encode failure
/// paths clean up without any extra bookkeeping.
pub fn pack_to_temp(source: &Path) -> Result<(NamedTempFile, EntryHeader)> {
    let dir = match source.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::env::temp_dir(),
    };
    let tmp = tempfile::Builder::new()
        .prefix(".pixtar-")
        .suffix(".pak")
        .tempfile_in(dir)?;
    let header = pack(source, BufWriter::new(tmp.as_file()))?;
    debug!(entry = %header.name, size = header.size, tmp = %tmp.path().display(), "packed");
    Ok((tmp, header))
}

fn hash_file(path: &Path) -> Result<[u8; 32]> {
    let mut f = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; COPY_BUF];
    loop {
        let k = f.read(&mut buf)?;
        if k == 0 {
            break;
        }
        hasher.update(&buf[..k]);
    }
    Ok(*hasher.finalize().as_bytes())
}
