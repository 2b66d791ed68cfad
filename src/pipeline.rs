//! Per-image measurement orchestration and the batch driver.
//!
//! One image in, one `MeasurementResult` out. Per-object failures (invalid
//! depth, degenerate geometry) drop that object and continue; whole-image
//! failures surface as an `Error processing image:` result and never
//! propagate as errors past this module.

use anyhow::{anyhow, Result};
use image::RgbImage;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::backend::{DepthEstimator, JsonDetections, ObjectDetector, PngDepth};
use crate::camera::format_dimensions;
use crate::config::{CalibrationConfig, MeasureConfig};
use crate::depth::sample_depth;
use crate::image_input::{
    collect_images_from_sources, decode_image, letterbox, sidecar_path, ImageData,
    ImageInputConfig,
};
use crate::measurement::{assemble, Measurement, MeasurementResult};
use crate::overlay::{encode_jpeg_data_uri, render_measurements};
use crate::rescale::rescale_bbox;

/// Measure every detected object in `original`, using the given collaborator
/// backends and calibration. Never fails: any internal error becomes a
/// failure result.
pub fn process_image(
    original: &RgbImage,
    detector: &dyn ObjectDetector,
    estimator: &dyn DepthEstimator,
    calibration: &CalibrationConfig,
) -> MeasurementResult {
    match measure_objects(original, detector, estimator, calibration) {
        Ok(result) => result,
        Err(err) => {
            warn!("⚠️ Image processing failed: {err:#}");
            MeasurementResult::failure(format!("{err:#}"))
        }
    }
}

/// Convenience entry for string inputs as the measurement endpoint receives
/// them: a `data:image` URI or a filesystem path.
pub fn process_input(
    input: &str,
    detector: &dyn ObjectDetector,
    estimator: &dyn DepthEstimator,
    calibration: &CalibrationConfig,
) -> MeasurementResult {
    match decode_image(&ImageData::from_str(input)) {
        Ok(original) => process_image(&original, detector, estimator, calibration),
        Err(err) => MeasurementResult::failure(format!("{err:#}")),
    }
}

fn measure_objects(
    original: &RgbImage,
    detector: &dyn ObjectDetector,
    estimator: &dyn DepthEstimator,
    calibration: &CalibrationConfig,
) -> Result<MeasurementResult> {
    let working_size = calibration.working_size();
    let working = letterbox(original, working_size);

    let detections = detector.detect(&working)?;
    let depth_map = estimator.estimate(&working)?;
    if (depth_map.width(), depth_map.height()) != working_size {
        return Err(anyhow!(
            "depth map {}x{} does not match working resolution {}x{}",
            depth_map.width(),
            depth_map.height(),
            working_size.0,
            working_size.1
        ));
    }

    let correction = calibration.camera.depth_correction();
    let original_size = original.dimensions();

    let mut measurements = Vec::new();
    for det in &detections {
        // Sampling happens in the depth map's own coordinate system, before
        // any rescaling to the original image.
        let depth = sample_depth(&depth_map, det.bbox, calibration.max_valid_depth) * correction;
        if depth <= 0.0 {
            debug!("Skipping '{}': no valid depth in region", det.class_label);
            continue;
        }

        let Some((width_m, height_m)) = calibration.camera.convert(
            det.width_px() as f32,
            det.height_px() as f32,
            depth,
            working_size,
        ) else {
            debug!("Skipping '{}': degenerate geometry", det.class_label);
            continue;
        };

        measurements.push(Measurement {
            object_name: det.class_label.clone(),
            dimensions: format_dimensions(width_m, height_m),
            confidence: det.confidence,
            bbox: rescale_bbox(det.bbox, working_size, original_size),
        });
    }

    let mut result = assemble(measurements);
    if result.success {
        let annotated = render_measurements(original, &result.measurements);
        result.annotated_image = Some(encode_jpeg_data_uri(&annotated)?);
    }
    Ok(result)
}

/// Batch driver behind the `measure` subcommand: collect inputs, measure
/// each against its sidecar (or explicitly given) detector and depth files,
/// and write one result document per image. Returns the number of images
/// processed.
pub fn run_measurement(config: &MeasureConfig) -> Result<usize> {
    let image_config = ImageInputConfig::from_strict_flag(config.base.strict);
    let images = collect_images_from_sources(&config.base.sources, &image_config)?;
    if images.is_empty() {
        warn!("No valid images found to process");
        return Ok(0);
    }
    info!("📐 Found {} image(s) to measure", images.len());

    // A single input with no output directory prints to stdout, the way the
    // original endpoint returns a single document.
    let to_stdout = images.len() == 1 && config.base.output_dir.is_none();

    for path in &images {
        let (result, original) = measure_one(path, config);
        if result.success {
            info!("✅ {}: {}", path.display(), result.message);
        } else {
            warn!("⚠️ {}: {}", path.display(), result.message);
        }

        if config.save_annotated && result.success {
            if let Some(original) = &original {
                let annotated = render_measurements(original, &result.measurements);
                let out = output_path(path, config.base.output_dir.as_deref(), "annotated.jpg")?;
                annotated.save(&out)?;
                info!("🖼️ Annotated image saved to: {}", out.display());
            }
        }

        let doc = serde_json::to_string_pretty(&result)?;
        if to_stdout {
            println!("{doc}");
        } else {
            let out = output_path(path, config.base.output_dir.as_deref(), "measurements.json")?;
            std::fs::write(&out, doc)?;
            info!("📄 Result written to: {}", out.display());
        }
    }

    Ok(images.len())
}

fn measure_one(path: &Path, config: &MeasureConfig) -> (MeasurementResult, Option<RgbImage>) {
    let original = match decode_image(&ImageData::Path(path)) {
        Ok(img) => img,
        Err(err) => return (MeasurementResult::failure(format!("{err:#}")), None),
    };

    let detections_path = config
        .detections
        .clone()
        .unwrap_or_else(|| sidecar_path(path, "detections.json"));
    let depth_path = config
        .depth
        .clone()
        .unwrap_or_else(|| sidecar_path(path, "depth.png"));

    let detector = JsonDetections::new(detections_path);
    let estimator = PngDepth::new(depth_path, config.depth_unit);
    let result = process_image(&original, &detector, &estimator, &config.calibration);
    (result, Some(original))
}

fn output_path(image_path: &Path, output_dir: Option<&str>, suffix: &str) -> Result<PathBuf> {
    match output_dir {
        Some(dir) => {
            let dir = Path::new(dir);
            std::fs::create_dir_all(dir)?;
            let stem = image_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            Ok(dir.join(format!("{stem}.{suffix}")))
        }
        None => Ok(sidecar_path(image_path, suffix)),
    }
}
