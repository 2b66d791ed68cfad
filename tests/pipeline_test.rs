//! End-to-end tests driving the measurement pipeline through the file-backed
//! backends, the way the CLI uses it.

use image::{ImageBuffer, Luma, RgbImage};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

use caliper::backend::{JsonDetections, PngDepth};
use caliper::config::{load_calibration, BaseConfig, CalibrationConfig, MeasureConfig};
use caliper::pipeline::{process_image, run_measurement};

fn write_scene(dir: &Path) -> std::path::PathBuf {
    let image_path = dir.join("scene.png");
    RgbImage::from_pixel(640, 480, image::Rgb([30, 30, 30]))
        .save(&image_path)
        .unwrap();

    fs::write(
        dir.join("scene.detections.json"),
        r#"[
            {"class": "bottle", "confidence": 0.83, "bbox": [100, 100, 200, 300]},
            {"class": "cup", "confidence": 0.91, "bbox": [300, 200, 380, 280]}
        ]"#,
    )
    .unwrap();

    // Constant 2.0 m depth: 2000 millimeter units at the working resolution.
    let depth: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_pixel(640, 480, Luma([2000u16]));
    depth.save(dir.join("scene.depth.png")).unwrap();

    image_path
}

fn measure_config(image_path: &Path, output_dir: &Path) -> MeasureConfig {
    MeasureConfig {
        base: BaseConfig {
            sources: vec![image_path.to_string_lossy().into_owned()],
            output_dir: Some(output_dir.to_string_lossy().into_owned()),
            strict: true,
        },
        detections: None,
        depth: None,
        depth_unit: 0.001,
        calibration: CalibrationConfig::default(),
        save_annotated: false,
    }
}

#[test]
fn measures_objects_from_sidecar_files() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();
    let image_path = write_scene(dir.path());

    let processed = run_measurement(&measure_config(&image_path, out.path())).unwrap();
    assert_eq!(processed, 1);

    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("scene.measurements.json")).unwrap())
            .unwrap();

    assert_eq!(doc["success"], true);
    assert_eq!(doc["message"], "Detected 2 objects");
    let measurements = doc["measurements"].as_array().unwrap();
    assert_eq!(measurements.len(), 2);

    // Sorted descending by confidence: cup (0.91) before bottle (0.83).
    assert_eq!(measurements[0]["objectName"], "cup");
    assert_eq!(measurements[1]["objectName"], "bottle");
    assert_eq!(measurements[1]["dimensions"], "0.38×0.76 m");
    assert_eq!(
        measurements[1]["bbox"],
        serde_json::json!([100, 100, 200, 300])
    );
    assert!(doc["annotatedImage"]
        .as_str()
        .unwrap()
        .starts_with("data:image/jpeg;base64,"));
}

#[test]
fn writes_annotated_image_when_requested() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();
    let image_path = write_scene(dir.path());

    let mut config = measure_config(&image_path, out.path());
    config.save_annotated = true;
    run_measurement(&config).unwrap();

    let annotated = out.path().join("scene.annotated.jpg");
    assert!(annotated.exists());
    let img = image::open(&annotated).unwrap();
    assert_eq!((img.width(), img.height()), (640, 480));
}

#[test]
fn missing_depth_sidecar_yields_failure_document() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();
    let image_path = write_scene(dir.path());
    fs::remove_file(dir.path().join("scene.depth.png")).unwrap();

    let processed = run_measurement(&measure_config(&image_path, out.path())).unwrap();
    assert_eq!(processed, 1);

    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("scene.measurements.json")).unwrap())
            .unwrap();
    assert_eq!(doc["success"], false);
    assert!(doc["message"]
        .as_str()
        .unwrap()
        .starts_with("Error processing image: "));
    assert_eq!(doc["measurements"].as_array().unwrap().len(), 0);
    assert!(doc.get("annotatedImage").is_none());
}

#[test]
fn fov_calibration_file_drives_conversion() {
    let dir = tempdir().unwrap();
    let calib_path = dir.path().join("camera.toml");
    fs::write(
        &calib_path,
        r#"
        working_width = 1280
        working_height = 960
        max_valid_depth = 20.0

        [camera]
        model = "field_of_view"
        hfov_deg = 55.2
        vfov_deg = 42.0
        "#,
    )
    .unwrap();
    let calibration = load_calibration(&calib_path).unwrap();

    fs::write(
        dir.path().join("wide.detections.json"),
        // 10% of the 1280 px frame width.
        r#"[{"class": "crate", "confidence": 0.7, "bbox": [0, 0, 128, 96]}]"#,
    )
    .unwrap();
    let depth: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_pixel(1280, 960, Luma([3000u16]));
    let depth_path = dir.path().join("wide.depth.png");
    depth.save(&depth_path).unwrap();

    let original = RgbImage::new(1280, 960);
    let detector = JsonDetections::new(dir.path().join("wide.detections.json"));
    let estimator = PngDepth::new(&depth_path, 0.001);
    let result = process_image(&original, &detector, &estimator, &calibration);

    assert!(result.success);
    // 2 * 3.0 * tan(27.6°) * 0.10 ≈ 0.31 m wide.
    assert!(result.measurements[0].dimensions.starts_with("0.31×"));
}
