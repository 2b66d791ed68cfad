//! Measurement records and the result document returned to callers.
//!
//! Field names on the wire (`objectName`, `annotatedImage`, ...) are a
//! compatibility contract with existing consumers and must not change.

use serde::Serialize;

/// One measured object: display name, formatted physical dimensions,
/// detector confidence, and the bounding box in original-image pixel space.
#[derive(Debug, Clone, Serialize)]
pub struct Measurement {
    #[serde(rename = "objectName")]
    pub object_name: String,
    pub dimensions: String,
    pub confidence: f32,
    pub bbox: [i32; 4],
}

/// The externally visible artifact of processing one image.
///
/// Invariant: `success == !measurements.is_empty()` for every normally
/// computed result; a hard failure yields `success: false` with an error
/// message and no measurements regardless of partial work.
#[derive(Debug, Serialize)]
pub struct MeasurementResult {
    pub success: bool,
    pub message: String,
    pub measurements: Vec<Measurement>,
    #[serde(rename = "annotatedImage", skip_serializing_if = "Option::is_none")]
    pub annotated_image: Option<String>,
}

impl MeasurementResult {
    /// The normal zero-objects outcome. Distinct in message text from
    /// `failure` so callers can tell "nothing to measure" from "could not
    /// read the image".
    pub fn no_objects() -> Self {
        Self {
            success: false,
            message: "No objects detected".to_string(),
            measurements: Vec::new(),
            annotated_image: None,
        }
    }

    /// A whole-image failure result. Always a normal return value; the
    /// processing layer never lets the underlying error escape.
    pub fn failure(detail: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            message: format!("Error processing image: {detail}"),
            measurements: Vec::new(),
            annotated_image: None,
        }
    }
}

/// Combine the surviving measurements into the final ordered result.
///
/// Stable-sorts descending by confidence (input order breaks ties); this is
/// the only place output ordering is decided.
pub fn assemble(mut measurements: Vec<Measurement>) -> MeasurementResult {
    if measurements.is_empty() {
        return MeasurementResult::no_objects();
    }

    measurements.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    MeasurementResult {
        success: true,
        message: format!("Detected {} objects", measurements.len()),
        measurements,
        annotated_image: None,
    }
}
