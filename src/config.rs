//! Configuration layer separating CLI argument parsing from the internal
//! processing configuration, plus the deployment calibration file.
//!
//! The calibration file is the single place the camera-model form is chosen;
//! nothing downstream branches on a mode flag.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use clap_verbosity_flag::Verbosity;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::camera::CameraModel;

/// Global CLI arguments shared by all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalArgs {
    /// Output directory for result documents and annotated images
    /// (default: next to each input image)
    #[arg(long, global = true)]
    pub output_dir: Option<String>,

    /// Verbosity level (-q/--quiet, -v/-vv/-vvv for info/debug/trace)
    #[command(flatten)]
    pub verbosity: Verbosity,

    /// Warn instead of erroring on missing or unsupported input files
    #[arg(long, global = true)]
    pub permissive: bool,

    /// Disable colored output (also respects NO_COLOR)
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// CLI command for measuring objects in images.
#[derive(Parser, Debug, Clone)]
pub struct MeasureCommand {
    /// Path(s) to input images or directories. Supports glob patterns like *.jpg
    #[arg(value_name = "IMAGES_OR_DIRS", required = true)]
    pub sources: Vec<String>,

    /// Detections JSON file (default: `<image>.detections.json` per image)
    #[arg(long)]
    pub detections: Option<PathBuf>,

    /// Depth raster file (default: `<image>.depth.png` per image)
    #[arg(long)]
    pub depth: Option<PathBuf>,

    /// Metric depth per raster unit (0.001 = millimeter values)
    #[arg(long, default_value = "0.001", value_parser = parse_positive_f32)]
    pub depth_unit: f32,

    /// Camera calibration TOML (default: built-in focal-length calibration)
    #[arg(long)]
    pub calibration: Option<PathBuf>,

    /// Also write `<image>.annotated.jpg` next to the result document
    #[arg(long)]
    pub save_annotated: bool,
}

/// Parse a strictly positive float CLI value.
pub fn parse_positive_f32(s: &str) -> std::result::Result<f32, String> {
    let val = s.parse::<f32>().map_err(|_| format!("invalid number: '{s}'"))?;
    if val > 0.0 && val.is_finite() {
        Ok(val)
    } else {
        Err(format!("must be a positive number, got {val}"))
    }
}

/// Input-independent configuration common to every run.
#[derive(Debug, Clone)]
pub struct BaseConfig {
    pub sources: Vec<String>,
    pub output_dir: Option<String>,
    /// Fail on missing or unsupported inputs. Opposite of `--permissive`.
    pub strict: bool,
}

/// Internal configuration for the measure pipeline.
#[derive(Debug, Clone)]
pub struct MeasureConfig {
    pub base: BaseConfig,
    pub detections: Option<PathBuf>,
    pub depth: Option<PathBuf>,
    pub depth_unit: f32,
    pub calibration: CalibrationConfig,
    pub save_annotated: bool,
}

impl MeasureConfig {
    /// Build the internal configuration from global and command arguments,
    /// loading the calibration file when one is given.
    pub fn from_args(global: GlobalArgs, cmd: MeasureCommand) -> Result<Self> {
        if (cmd.detections.is_some() || cmd.depth.is_some()) && cmd.sources.len() > 1 {
            return Err(anyhow!(
                "--detections/--depth apply to a single image; use sidecar files for batches"
            ));
        }

        let calibration = match &cmd.calibration {
            Some(path) => load_calibration(path)?,
            None => CalibrationConfig::default(),
        };

        Ok(Self {
            base: BaseConfig {
                sources: cmd.sources,
                output_dir: global.output_dir,
                strict: !global.permissive,
            },
            detections: cmd.detections,
            depth: cmd.depth,
            depth_unit: cmd.depth_unit,
            calibration,
            save_annotated: cmd.save_annotated,
        })
    }
}

/// Deployment calibration: the working resolution the detector and depth
/// estimator are aligned to, the depth validity ceiling, and the camera
/// model constants.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalibrationConfig {
    pub working_width: u32,
    pub working_height: u32,
    /// Open upper bound for valid depth samples, in the model's depth units.
    pub max_valid_depth: f32,
    pub camera: CameraModel,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            working_width: 640,
            working_height: 480,
            max_valid_depth: 10.0,
            camera: CameraModel::FocalLength {
                focal_length_px: 525.0,
                depth_scale: 1.0,
            },
        }
    }
}

impl CalibrationConfig {
    pub fn working_size(&self) -> (u32, u32) {
        (self.working_width, self.working_height)
    }
}

pub fn load_calibration(path: &Path) -> Result<CalibrationConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read calibration {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid calibration {}", path.display()))
}
