use std::path::Path;

use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use tracing::debug;

use crate::error::{PixtarError, Result};
use crate::grid::PixelGrid;

/// Persist the grid as an RGBA8 PNG, always PNG whatever the extension.
///
/// The channels carry raw payload bytes, so nothing in this path may apply
/// color management or premultiplication.
pub fn write_grid(path: &Path, grid: PixelGrid) -> Result<()> {
    let dim = grid.dim();
    let img = RgbaImage::from_raw(dim, dim, grid.into_bytes()).ok_or_else(|| {
        PixtarError::Format(format!("grid bytes do not fill a {dim}x{dim} raster"))
    })?;
    img.save_with_format(path, ImageFormat::Png)?;
    debug!(path = %path.display(), dim, "wrote raster");
    Ok(())
}

/// Load a raster and flatten it row-major into raw channel bytes.
///
/// Requires a square RGBA8 image; anything else has been transformed
/// somewhere along the way and cannot round-trip payload bytes.
pub fn read_flat(path: &Path) -> Result<Vec<u8>> {
    let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    let img = match img {
        DynamicImage::ImageRgba8(img) => img,
        other => {
            return Err(PixtarError::Format(format!(
                "expected an RGBA8 raster, got {:?}",
                other.color()
            )));
        }
    };
    if img.width() != img.height() {
        return Err(PixtarError::Format(format!(
            "expected a square raster, got {}x{}",
            img.width(),
            img.height()
        )));
    }
    debug!(path = %path.display(), dim = img.width(), "loaded raster");
    Ok(img.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::PixelGrid;

    #[test]
    fn grid_survives_the_raster_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.png");
        let pixels = vec![[0u8, 1, 2, 3], [4, 5, 6, 7], [250, 251, 252, 0]];
        let grid = PixelGrid::build(&pixels);
        let expect = grid.as_bytes().to_vec();

        write_grid(&path, grid).unwrap();
        assert_eq!(read_flat(&path).unwrap(), expect);
    }

    #[test]
    fn rejects_a_non_rgba_raster() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.png");
        image::RgbImage::from_raw(2, 2, vec![0; 12])
            .unwrap()
            .save(&path)
            .unwrap();
        assert!(matches!(read_flat(&path), Err(PixtarError::Format(_))));
    }

    #[test]
    fn rejects_a_non_square_raster() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        RgbaImage::from_raw(3, 1, vec![0; 12])
            .unwrap()
            .save(&path)
            .unwrap();
        assert!(matches!(read_flat(&path), Err(PixtarError::Format(_))));
    }
}
