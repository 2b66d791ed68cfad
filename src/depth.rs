//! Dense depth maps and robust per-box depth sampling.
//!
//! The depth estimator produces one `DepthMap` per image, aligned 1:1 to the
//! working resolution. Sampling reduces the noisy per-pixel values inside a
//! bounding box to a single robust scalar: crop, drop invalid values, take
//! the median.

use ndarray::{s, Array2};

/// A 2-D grid of depth values, indexed `[y, x]`. Values ≤ 0 are invalid
/// markers from the sensor or model; units follow the estimator's convention.
#[derive(Debug, Clone)]
pub struct DepthMap {
    data: Array2<f32>,
}

impl DepthMap {
    pub fn new(data: Array2<f32>) -> Self {
        Self { data }
    }

    /// Build from a row-major buffer of `width * height` values.
    pub fn from_raw(width: u32, height: u32, values: Vec<f32>) -> Option<Self> {
        Array2::from_shape_vec((height as usize, width as usize), values)
            .ok()
            .map(Self::new)
    }

    pub fn width(&self) -> u32 {
        self.data.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.data.nrows() as u32
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }
}

/// Sample a robust scalar depth for `bbox` (working-resolution coordinates).
///
/// The crop is clamped to the map bounds. Values outside the open interval
/// `(0, max_valid_depth)` are discarded: non-positive values are invalid
/// markers, values past the ceiling are far-plane artifacts rather than
/// surface readings. Returns the median of what survives, or `0.0` when the
/// crop is empty or nothing survives the filter. A zero here is a skip
/// signal for the caller, not an error.
pub fn sample_depth(map: &DepthMap, bbox: [i32; 4], max_valid_depth: f32) -> f32 {
    let (w, h) = (map.width() as i32, map.height() as i32);
    let x1 = bbox[0].clamp(0, w);
    let y1 = bbox[1].clamp(0, h);
    let x2 = bbox[2].clamp(0, w);
    let y2 = bbox[3].clamp(0, h);
    if x1 >= x2 || y1 >= y2 {
        return 0.0;
    }

    let crop = map
        .data()
        .slice(s![y1 as usize..y2 as usize, x1 as usize..x2 as usize]);
    let mut valid: Vec<f32> = crop
        .iter()
        .copied()
        .filter(|&v| v > 0.0 && v < max_valid_depth)
        .collect();
    median(&mut valid)
}

/// Median with numpy semantics: mean of the two middle values for an even
/// count, `0.0` for an empty slice. Sorts in place.
fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_map(width: u32, height: u32, value: f32) -> DepthMap {
        DepthMap::new(Array2::from_elem(
            (height as usize, width as usize),
            value,
        ))
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&mut []), 0.0);
    }

    #[test]
    fn test_uniform_region() {
        let map = uniform_map(64, 48, 2.0);
        assert_eq!(sample_depth(&map, [10, 10, 20, 20], 10.0), 2.0);
    }

    #[test]
    fn test_robust_to_speckle() {
        // A few far-plane outliers must not drag the median.
        let mut data = Array2::from_elem((10, 10), 1.5);
        data[[0, 0]] = 80.0;
        data[[0, 1]] = 80.0;
        data[[1, 0]] = -1.0;
        let map = DepthMap::new(data);
        assert_eq!(sample_depth(&map, [0, 0, 10, 10], 10.0), 1.5);
    }

    #[test]
    fn test_all_invalid_region_is_skip_signal() {
        let map = uniform_map(32, 32, -1.0);
        assert_eq!(sample_depth(&map, [0, 0, 32, 32], 10.0), 0.0);
        let far = uniform_map(32, 32, 50.0);
        assert_eq!(sample_depth(&far, [0, 0, 32, 32], 10.0), 0.0);
    }

    #[test]
    fn test_degenerate_and_out_of_bounds_boxes() {
        let map = uniform_map(32, 32, 2.0);
        assert_eq!(sample_depth(&map, [5, 5, 5, 10], 10.0), 0.0); // zero width
        assert_eq!(sample_depth(&map, [40, 40, 50, 50], 10.0), 0.0); // fully outside
        // Partially outside clamps to the valid region.
        assert_eq!(sample_depth(&map, [-10, -10, 8, 8], 10.0), 2.0);
    }

    #[test]
    fn test_from_raw_shape_check() {
        assert!(DepthMap::from_raw(4, 3, vec![0.0; 12]).is_some());
        assert!(DepthMap::from_raw(4, 3, vec![0.0; 11]).is_none());
    }
}
