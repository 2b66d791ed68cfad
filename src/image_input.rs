//! Image input handling: collecting files to process, decoding the supported
//! input forms into RGB pixel grids, and letterbox padding to the working
//! resolution.

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{imageops, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

/// How input collection treats unsupported or missing entries.
#[derive(Debug, Clone)]
pub struct ImageInputConfig {
    pub strict_mode: bool,
    pub require_glob_matches: bool,
}

impl ImageInputConfig {
    pub fn strict() -> Self {
        Self {
            strict_mode: true,
            require_glob_matches: true,
        }
    }

    pub fn permissive() -> Self {
        Self {
            strict_mode: false,
            require_glob_matches: false,
        }
    }

    pub fn from_strict_flag(strict: bool) -> Self {
        if strict {
            Self::strict()
        } else {
            Self::permissive()
        }
    }
}

/// Supported raster formats: jpg, jpeg, png, webp, bmp, tiff, tif.
pub fn is_supported_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            matches!(
                ext.to_string_lossy().to_lowercase().as_str(),
                "jpg" | "jpeg" | "png" | "webp" | "bmp" | "tiff" | "tif"
            )
        })
        .unwrap_or(false)
}

/// Non-recursive scan of a directory for supported images, sorted.
pub fn find_images_in_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("reading directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_supported_image_file(p))
        .collect();
    images.sort();
    Ok(images)
}

/// Resolve files, directories, and glob patterns into a sorted, deduplicated
/// list of image paths. Strict mode errors on missing or unsupported
/// entries; permissive mode warns and continues.
pub fn collect_images_from_sources(
    sources: &[String],
    config: &ImageInputConfig,
) -> Result<Vec<PathBuf>> {
    let mut collected = Vec::new();

    for source in sources {
        let path = Path::new(source);
        if path.is_file() {
            if is_supported_image_file(path) {
                collected.push(path.to_path_buf());
            } else if config.strict_mode {
                return Err(anyhow!("unsupported image format: {}", path.display()));
            }
        } else if path.is_dir() {
            collected.extend(find_images_in_directory(path)?);
        } else if source.contains(&['*', '?', '['][..]) {
            let mut matched = false;
            for entry in glob::glob(source)
                .with_context(|| format!("invalid glob pattern: {source}"))?
                .flatten()
            {
                if entry.is_file() && is_supported_image_file(&entry) {
                    collected.push(entry);
                    matched = true;
                }
            }
            if !matched && config.require_glob_matches {
                return Err(anyhow!("no images match pattern: {source}"));
            }
        } else if config.strict_mode {
            return Err(anyhow!("file does not exist: {source}"));
        } else {
            log::warn!("⚠️ Skipping missing input: {source}");
        }
    }

    collected.sort();
    collected.dedup();
    if collected.is_empty() && config.strict_mode {
        return Err(anyhow!("no image files found in the given sources"));
    }
    Ok(collected)
}

/// One decodable image input: a filesystem path, an embedded
/// `data:image/...;base64,` URI, or an already-decoded RGB buffer.
#[derive(Debug, Clone)]
pub enum ImageData<'a> {
    Path(&'a Path),
    DataUri(&'a str),
    Rgb(&'a RgbImage),
}

impl<'a> ImageData<'a> {
    /// Classify a string input the way the measurement endpoint receives it:
    /// a data URI if it carries the scheme, a path otherwise.
    pub fn from_str(input: &'a str) -> Self {
        if input.starts_with("data:image") {
            ImageData::DataUri(input)
        } else {
            ImageData::Path(Path::new(input))
        }
    }
}

/// Decode any supported input form to an RGB pixel grid.
pub fn decode_image(data: &ImageData<'_>) -> Result<RgbImage> {
    match data {
        ImageData::Path(path) => {
            let img = image::open(path)
                .with_context(|| format!("cannot decode image {}", path.display()))?;
            Ok(img.to_rgb8())
        }
        ImageData::DataUri(uri) => decode_data_uri(uri),
        ImageData::Rgb(img) => Ok((*img).clone()),
    }
}

fn decode_data_uri(uri: &str) -> Result<RgbImage> {
    let payload = uri
        .split_once(',')
        .map(|(_, p)| p)
        .ok_or_else(|| anyhow!("malformed data URI: missing ',' separator"))?;
    let bytes = BASE64
        .decode(payload.trim())
        .context("data URI payload is not valid base64")?;
    let img = image::load_from_memory(&bytes).context("cannot decode embedded image data")?;
    Ok(img.to_rgb8())
}

/// Resize to fit inside `target` preserving aspect ratio, centered on a
/// black canvas of exactly `target` size. This is the frame the detector and
/// depth estimator consume, so their outputs share its coordinate system.
pub fn letterbox(img: &RgbImage, target: (u32, u32)) -> RgbImage {
    let (tw, th) = target;
    let (w, h) = img.dimensions();
    if (w, h) == (tw, th) {
        return img.clone();
    }

    let scale = (tw as f32 / w as f32).min(th as f32 / h as f32);
    let new_w = ((w as f32 * scale) as u32).max(1);
    let new_h = ((h as f32 * scale) as u32).max(1);
    let resized = imageops::resize(img, new_w, new_h, imageops::FilterType::Lanczos3);

    let mut canvas = RgbImage::new(tw, th);
    let x = (tw - new_w) / 2;
    let y = (th - new_h) / 2;
    imageops::overlay(&mut canvas, &resized, x as i64, y as i64);
    canvas
}

/// Sibling-file naming for per-image inputs and outputs, e.g.
/// `photo.jpg` -> `photo.detections.json`.
pub fn sidecar_path(image_path: &Path, suffix: &str) -> PathBuf {
    let stem = image_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    image_path.with_file_name(format!("{stem}.{suffix}"))
}
