use crate::pixel::PIXEL_BYTES;

/// Half-open byte range `[start, end)` assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub start: u64,
    pub end: u64,
}

impl Scope {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Split `len` bytes into contiguous, non-overlapping scopes, one per worker.
///
/// Boundaries are aligned to the pixel group size, so a partial group can
/// only occur in the final scope. The final scope absorbs the remainder and
/// may be longer than the others; workers stop at `end` or on a zero-length
/// read rather than assuming an exact length. Collapses to a single scope
/// when the per-worker chunk would round down to zero.
pub fn partition(len: u64, workers: usize) -> Vec<Scope> {
    let workers = workers.max(1) as u64;
    let chunk = len / workers;
    let chunk = chunk - chunk % PIXEL_BYTES as u64;
    if chunk == 0 {
        return vec![Scope { start: 0, end: len }];
    }
    (0..workers)
        .map(|i| Scope {
            start: i * chunk,
            end: if i == workers - 1 { len } else { (i + 1) * chunk },
        })
        .collect()
}
