use std::fs;
use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::chunking::scopes::{self, Scope};
use crate::chunking::worker::{self, ChunkResult};
use crate::container::writer;
use crate::error::{PixtarError, Result};
use crate::grid::PixelGrid;
use crate::pixel::Pixel;
use crate::raster;

/// Immutable encode configuration; zero fields mean "use the default".
#[derive(Clone, Default)]
pub struct EncodeOptions {
    /// Worker count; 0 = host parallelism.
    pub workers: usize,
    /// Per-worker read buffer cap in bytes; 0 = `DEFAULT_BUFFER_CAP`.
    pub buffer_cap: usize,
}

/// What an encode produced, for reporting.
#[derive(Debug, Clone, Copy)]
pub struct EncodeStats {
    pub source_len: u64,
    pub archived_len: u64,
    pub pixel_count: usize,
    pub dim: u32,
}

/// Encode `source` into a square raster image at `target`.
///
/// stat -> pack to temp -> partition -> parallel encode -> reassemble ->
/// build grid -> write raster. The temp container drops (and is deleted)
/// on success and on every failure past packing.
pub fn encode(source: &Path, target: &Path, opts: Option<&EncodeOptions>) -> Result<EncodeStats> {
    let source_len = fs::metadata(source)?.len();
    let workers = effective_workers(opts);
    let buffer_cap = opts.map(|o| o.buffer_cap).unwrap_or(0);

    let (tmp, header) = writer::pack_to_temp(source)?;
    let archived_len = tmp.as_file().metadata()?.len();
    debug!(entry = %header.name, source_len, archived_len, workers, "encoding");

    let scopes = scopes::partition(archived_len, workers);
    let pixels = encode_parallel(tmp.path(), &scopes, workers, buffer_cap)?;
    let pixel_count = pixels.len();

    let grid = PixelGrid::build(&pixels);
    let dim = grid.dim();
    raster::write_grid(target, grid)?;
    drop(tmp);

    info!(image = %target.display(), pixel_count, dim, "encoded");
    Ok(EncodeStats {
        source_len,
        archived_len,
        pixel_count,
        dim,
    })
}

// Fan out one task per scope on a dedicated pool, fan in over the barrier.
// The first worker error short-circuits the collect and aborts the encode.
fn encode_parallel(
    path: &Path,
    scopes: &[Scope],
    workers: usize,
    buffer_cap: usize,
) -> Result<Vec<Pixel>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()?;
    let results: Vec<ChunkResult> = pool.install(|| {
        scopes
            .par_iter()
            .enumerate()
            .map(|(index, scope)| -> Result<ChunkResult> {
                let pixels = worker::encode_scope(path, *scope, buffer_cap)
                    .map_err(|source| PixtarError::Worker { index, source })?;
                Ok(ChunkResult { index, pixels })
            })
            .collect::<Result<Vec<_>>>()
    })?;
    worker::reassemble(results)
}

fn effective_workers(opts: Option<&EncodeOptions>) -> usize {
    let w = opts.map(|o| o.workers).unwrap_or(0);
    if w == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        w
    }
}
