use serde::{Deserialize, Serialize};

/// A single object detection as produced by the detector backend.
///
/// Coordinates are pixel indices in the working-resolution frame the detector
/// ran on, with `x1 < x2` and `y1 < y2`. Detections are immutable once
/// received; every derived value is recomputed from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub class_label: String,
    pub confidence: f32,
    pub bbox: [i32; 4],
}

impl Detection {
    pub fn width_px(&self) -> i32 {
        self.bbox[2] - self.bbox[0]
    }

    pub fn height_px(&self) -> i32 {
        self.bbox[3] - self.bbox[1]
    }

    /// Well-formed means a non-degenerate box and a confidence in [0, 1].
    pub fn is_well_formed(&self) -> bool {
        self.bbox[0] < self.bbox[2]
            && self.bbox[1] < self.bbox[3]
            && (0.0..=1.0).contains(&self.confidence)
    }
}
