//! Pixel-to-metric conversion under a calibrated camera model.
//!
//! Two interchangeable model forms are supported; a deployment configures
//! exactly one and the two are never mixed within a computation:
//!
//! - **Focal length**: dimensions follow from similar triangles,
//!   `extent_px * depth / focal_length_px`. The focal length must be
//!   calibrated against the working resolution the depth values refer to.
//! - **Field of view**: dimensions follow from the angular extent,
//!   `2 * depth * tan(fov / 2) * (extent_px / image_extent_px)`. The pixel
//!   fraction cancels absolute resolution, so this form is preferred when
//!   working and display resolutions differ.

use serde::{Deserialize, Serialize};

fn default_scale() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum CameraModel {
    FocalLength {
        focal_length_px: f32,
        #[serde(default = "default_scale")]
        depth_scale: f32,
    },
    FieldOfView {
        hfov_deg: f32,
        vfov_deg: f32,
        #[serde(default = "default_scale")]
        depth_correction: f32,
    },
}

impl CameraModel {
    /// Derive the field-of-view form from physical sensor geometry:
    /// `fov = 2 * atan((sensor / 2) / focal_length)` per axis.
    pub fn fov_from_sensor(
        sensor_width_mm: f32,
        sensor_height_mm: f32,
        focal_length_mm: f32,
        depth_correction: f32,
    ) -> Self {
        let fov = |sensor_mm: f32| 2.0 * ((sensor_mm / 2.0) / focal_length_mm).atan();
        CameraModel::FieldOfView {
            hfov_deg: fov(sensor_width_mm).to_degrees(),
            vfov_deg: fov(sensor_height_mm).to_degrees(),
            depth_correction,
        }
    }

    /// The calibration multiplier applied to a raw sampled depth before any
    /// geometric conversion. Empirically fitted per camera/model pairing and
    /// never re-estimated at runtime.
    pub fn depth_correction(&self) -> f32 {
        match *self {
            CameraModel::FocalLength { depth_scale, .. } => depth_scale,
            CameraModel::FieldOfView {
                depth_correction, ..
            } => depth_correction,
        }
    }

    /// Convert a bounding box's pixel extents at a corrected depth into
    /// physical width and height in meters. `image_size` is the pixel size of
    /// the frame the box coordinates refer to (only the field-of-view form
    /// uses it). Returns `None` when the result is non-finite or
    /// non-positive, which callers must treat as a per-object skip.
    pub fn convert(
        &self,
        bbox_width_px: f32,
        bbox_height_px: f32,
        depth: f32,
        image_size: (u32, u32),
    ) -> Option<(f32, f32)> {
        let (width_m, height_m) = match *self {
            CameraModel::FocalLength {
                focal_length_px, ..
            } => (
                bbox_width_px * depth / focal_length_px,
                bbox_height_px * depth / focal_length_px,
            ),
            CameraModel::FieldOfView {
                hfov_deg, vfov_deg, ..
            } => {
                let span = |fov_deg: f32, extent_px: f32, image_extent_px: u32| {
                    2.0 * depth * (fov_deg.to_radians() / 2.0).tan() * extent_px
                        / image_extent_px as f32
                };
                (
                    span(hfov_deg, bbox_width_px, image_size.0),
                    span(vfov_deg, bbox_height_px, image_size.1),
                )
            }
        };

        if width_m.is_finite() && height_m.is_finite() && width_m > 0.0 && height_m > 0.0 {
            Some((width_m, height_m))
        } else {
            None
        }
    }
}

/// Display form required by the external interface: two-decimal fixed point,
/// multiplication sign, trailing unit.
pub fn format_dimensions(width_m: f32, height_m: f32) -> String {
    format!("{width_m:.2}×{height_m:.2} m")
}
