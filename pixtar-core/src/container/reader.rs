use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::entry::{EntryHeader, MAGIC, MAX_HEADER_LEN, VERSION};
use crate::error::{PixtarError, Result};

const COPY_BUF: usize = 1 << 16;

/// Unpack every entry of a container stream into `dest`, returning the
/// restored paths.
///
/// Streaming decode: entries are read until the end marker, so trailing
/// bytes past it (grid padding) are never touched. Each body is written
/// verbatim, checksummed, and given the entry's stored mode.
pub fn unpack(mut r: impl Read, dest: &Path) -> Result<Vec<PathBuf>> {
    read_preamble(&mut r)?;

    let mut restored = Vec::new();
    let mut buf = vec![0u8; COPY_BUF];
    while let Some(header) = next_header(&mut r)? {
        let outp = safe_join(dest, &header.name)?;
        if let Some(parent) = outp.parent() {
            fs::create_dir_all(parent)?;
        }
        let out = File::create(&outp)?;
        write_body(&mut r, &out, &header, &mut buf)?;
        apply_mode(&out, header.mode)?;
        debug!(entry = %header.name, size = header.size, "restored");
        restored.push(outp);
    }
    Ok(restored)
}

/// Walk the entry headers without materializing any body.
pub fn read_headers(mut r: impl Read) -> Result<Vec<EntryHeader>> {
    read_preamble(&mut r)?;
    let mut headers = Vec::new();
    while let Some(header) = next_header(&mut r)? {
        skip_body(&mut r, &header)?;
        headers.push(header);
    }
    Ok(headers)
}

fn read_preamble(r: &mut impl Read) -> Result<()> {
    let mut magic = [0u8; 6];
    r.read_exact(&mut magic)
        .map_err(|_| PixtarError::Format("container preamble truncated".into()))?;
    if &magic != MAGIC {
        return Err(PixtarError::Format(
            "not a pixtar container (bad magic)".into(),
        ));
    }
    let mut v = [0u8; 2];
    r.read_exact(&mut v)
        .map_err(|_| PixtarError::Format("container preamble truncated".into()))?;
    let version = u16::from_le_bytes(v);
    if version != VERSION {
        return Err(PixtarError::Format(format!(
            "unsupported container version {version}"
        )));
    }
    Ok(())
}

// None on the zero end marker.
fn next_header(r: &mut impl Read) -> Result<Option<EntryHeader>> {
    let mut len = [0u8; 4];
    r.read_exact(&mut len)
        .map_err(|_| PixtarError::Format("container ends without an end marker".into()))?;
    let len = u32::from_le_bytes(len);
    if len == 0 {
        return Ok(None);
    }
    if len > MAX_HEADER_LEN {
        return Err(PixtarError::Format(format!(
            "entry header of {len} bytes exceeds the {MAX_HEADER_LEN} byte cap"
        )));
    }
    let mut hbuf = vec![0u8; len as usize];
    r.read_exact(&mut hbuf)
        .map_err(|_| PixtarError::Format("entry header truncated".into()))?;
    let header: EntryHeader = ciborium::de::from_reader(&hbuf[..])
        .map_err(|e| PixtarError::Format(format!("entry header is not valid CBOR: {e}")))?;
    Ok(Some(header))
}

fn write_body(
    r: &mut impl Read,
    mut out: &File,
    header: &EntryHeader,
    buf: &mut [u8],
) -> Result<()> {
    let mut hasher = blake3::Hasher::new();
    let mut remaining = header.size;
    while remaining > 0 {
        let want = buf.len().min(remaining as usize);
        let k = r.read(&mut buf[..want])?;
        if k == 0 {
            return Err(PixtarError::Format(format!(
                "entry {} truncated: {remaining} bytes missing",
                header.name
            )));
        }
        hasher.update(&buf[..k]);
        out.write_all(&buf[..k])?;
        remaining -= k as u64;
    }
    if *hasher.finalize().as_bytes() != header.checksum {
        return Err(PixtarError::Format(format!(
            "checksum mismatch for entry {}",
            header.name
        )));
    }
    Ok(())
}

fn skip_body(r: &mut impl Read, header: &EntryHeader) -> Result<()> {
    let skipped = std::io::copy(&mut r.take(header.size), &mut std::io::sink())?;
    if skipped != header.size {
        return Err(PixtarError::Format(format!(
            "entry {} truncated: {} bytes missing",
            header.name,
            header.size - skipped
        )));
    }
    Ok(())
}

fn safe_join(root: &Path, name: &str) -> Result<PathBuf> {
    let p = Path::new(name);
    if name.is_empty()
        || p.is_absolute()
        || name == ".."
        || name.contains("../")
        || name.contains("..\\")
    {
        return Err(PixtarError::Format(format!("unsafe entry name: {name}")));
    }
    Ok(root.join(p))
}

fn apply_mode(_f: &File, _mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        _f.set_permissions(fs::Permissions::from_mode(_mode))?;
    }
    Ok(())
}
