use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::container::entry::EntryHeader;
use crate::container::reader;
use crate::error::Result;
use crate::raster;

/// Decode the raster at `source` and restore the archived entries into
/// `dest`, returning the restored paths.
///
/// load image -> flatten row-major -> unpack. The archive header carries
/// the authoritative payload size, so trailing grid padding is ignored by
/// the container parser. No temp files on this path; failures are terminal.
pub fn decode(source: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    let bytes = raster::read_flat(source)?;
    debug!(source = %source.display(), flat_len = bytes.len(), "decoding");
    let restored = reader::unpack(&bytes[..], dest)?;
    info!(count = restored.len(), "restored");
    Ok(restored)
}

/// Entry metadata of an encoded image, without extracting anything.
pub fn list(source: &Path) -> Result<Vec<EntryHeader>> {
    let bytes = raster::read_flat(source)?;
    reader::read_headers(&bytes[..])
}
