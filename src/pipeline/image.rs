//! Image resolution and scale-to-fit sizing.
//!
//! Images are drawn at their intrinsic pixel size (one pixel per point),
//! shrunk to fit the [`ImageBox`] while keeping the aspect ratio. Images are
//! never enlarged.

use crate::model::ImageDescriptor;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Points per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Maximum box an image is scaled into, plus the width used when the
/// intrinsic size cannot be probed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageBox {
    pub max_width: f32,
    pub max_height: f32,
    pub fallback_width: f32,
}

impl ImageBox {
    /// Fallback aspect ratio (width:height) for images of unknown size.
    pub const FALLBACK_ASPECT: f32 = 5.0 / 3.0;

    /// Box of `width_in` × `height_in` inches at `units_per_inch`.
    ///
    /// The fallback width is 5in, clamped to the box width.
    pub fn from_inches(width_in: f32, height_in: f32, units_per_inch: f32) -> Self {
        let max_width = width_in * units_per_inch;
        Self {
            max_width,
            max_height: height_in * units_per_inch,
            fallback_width: (5.0 * units_per_inch).min(max_width),
        }
    }

    /// Scale factor for an image of `width` × `height`: never above 1.0.
    pub fn scale_for(&self, width: u32, height: u32) -> f32 {
        if width == 0 || height == 0 {
            return 1.0;
        }
        let sx = f64::from(self.max_width) / f64::from(width);
        let sy = f64::from(self.max_height) / f64::from(height);
        sx.min(sy).min(1.0) as f32
    }

    /// Rendered size for an image of `width` × `height` pixels.
    pub fn fit(&self, width: u32, height: u32) -> (f32, f32) {
        let scale = f64::from(self.scale_for(width, height));
        (
            (f64::from(width) * scale) as f32,
            (f64::from(height) * scale) as f32,
        )
    }

    /// Rendered size when the intrinsic size is unknown.
    pub fn fallback_size(&self) -> (f32, f32) {
        let height = (self.fallback_width / Self::FALLBACK_ASPECT).min(self.max_height);
        (self.fallback_width, height)
    }
}

impl Default for ImageBox {
    /// 5.5in × 7in in points.
    fn default() -> Self {
        Self::from_inches(5.5, 7.0, POINTS_PER_INCH)
    }
}

/// Result of probing an image file's intrinsic size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Size(u32, u32),
    /// The file was readable but its format could not be sized.
    Unavailable,
}

/// Reads intrinsic pixel dimensions from an image file.
pub trait ImageProber {
    /// `Err` only for I/O failures; undecodable formats return [`Probe::Unavailable`].
    fn probe(&self, path: &Path) -> io::Result<Probe>;
}

/// [`ImageProber`] backed by the `image` crate's header readers.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderProber;

impl ImageProber for HeaderProber {
    fn probe(&self, path: &Path) -> io::Result<Probe> {
        match image::image_dimensions(path) {
            Ok((w, h)) if w > 0 && h > 0 => Ok(Probe::Size(w, h)),
            Ok(_) => Ok(Probe::Unavailable),
            Err(image::ImageError::IoError(e)) => Err(e),
            Err(e) => {
                debug!("Cannot size {}: {}", path.display(), e);
                Ok(Probe::Unavailable)
            }
        }
    }
}

/// Resolve an image `src` to an existing file.
///
/// Relative paths are resolved against `base_dir`. Remote URLs and data URIs
/// are never resolved.
pub fn resolve_src(src: &str, base_dir: &Path) -> Option<PathBuf> {
    let src = src.trim();
    if src.is_empty() || src.starts_with("data:") {
        return None;
    }
    let src = src.strip_prefix("file://").unwrap_or(src);
    if src.contains("://") {
        return None;
    }
    let candidate = Path::new(src);
    let path = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base_dir.join(candidate)
    };
    path.is_file().then_some(path)
}

/// Build the descriptor for an existing image file.
pub fn describe(
    path: PathBuf,
    image_box: &ImageBox,
    prober: &dyn ImageProber,
) -> io::Result<ImageDescriptor> {
    let descriptor = match prober.probe(&path)? {
        Probe::Size(w, h) => {
            let (width, height) = image_box.fit(w, h);
            ImageDescriptor {
                path,
                intrinsic: Some((w, h)),
                width,
                height,
            }
        }
        Probe::Unavailable => {
            let (width, height) = image_box.fallback_size();
            ImageDescriptor {
                path,
                intrinsic: None,
                width,
                height,
            }
        }
    };
    Ok(descriptor)
}
