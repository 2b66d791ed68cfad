//! External collaborator seams: the object detector and the depth estimator.
//!
//! The measurement core never owns model lifecycle. It consumes already
//! produced detections and depth maps through these traits; the shipped
//! implementations read precomputed outputs from sidecar files, and tests
//! inject synthetic ones.

use anyhow::{Context, Result};
use image::RgbImage;
use ndarray::Array2;
use std::path::{Path, PathBuf};

use crate::depth::DepthMap;
use crate::detection::Detection;

/// Produces detections for an image at the working resolution. No ordering
/// guarantee on the output.
pub trait ObjectDetector {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>>;
}

/// Produces a dense depth map aligned 1:1 to the working-resolution image.
pub trait DepthEstimator {
    fn estimate(&self, image: &RgbImage) -> Result<DepthMap>;
}

/// Detector backend reading a JSON sidecar of precomputed detections
/// (`[{"class": ..., "confidence": ..., "bbox": [x1,y1,x2,y2]}, ...]`),
/// coordinates in working-resolution space.
pub struct JsonDetections {
    path: PathBuf,
}

impl JsonDetections {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ObjectDetector for JsonDetections {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<Detection>> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("cannot read detections {}", self.path.display()))?;
        let detections: Vec<Detection> = serde_json::from_slice(&bytes)
            .with_context(|| format!("malformed detections in {}", self.path.display()))?;

        let (kept, dropped): (Vec<_>, Vec<_>) =
            detections.into_iter().partition(Detection::is_well_formed);
        for d in &dropped {
            log::warn!(
                "⚠️ Dropping malformed detection '{}' (bbox {:?})",
                d.class_label,
                d.bbox
            );
        }
        Ok(kept)
    }
}

/// Depth backend reading a grayscale raster sidecar, typically a 16-bit PNG
/// with one depth sample per working-resolution pixel. Metric depth is
/// `raw_value * unit` (e.g. `unit = 0.001` for millimeter LSBs).
pub struct PngDepth {
    path: PathBuf,
    unit: f32,
}

impl PngDepth {
    pub fn new(path: impl Into<PathBuf>, unit: f32) -> Self {
        Self {
            path: path.into(),
            unit,
        }
    }
}

impl DepthEstimator for PngDepth {
    fn estimate(&self, _image: &RgbImage) -> Result<DepthMap> {
        load_depth_raster(&self.path, self.unit)
    }
}

pub fn load_depth_raster(path: &Path, unit: f32) -> Result<DepthMap> {
    let raster = image::open(path)
        .with_context(|| format!("cannot decode depth raster {}", path.display()))?
        .to_luma16();
    let (width, height) = raster.dimensions();
    let data = Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        raster.get_pixel(x as u32, y as u32).0[0] as f32 * unit
    });
    Ok(DepthMap::new(data))
}
