//! Writing image-worthy values to disk.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

use image::{GrayImage, ImageFormat, Luma};

use crate::error::{Result, TreeError};
use crate::value::{NdArray, Value};

/// Renders a value to a file, or to the screen.
pub trait ImageSink {
    fn save(&self, value: &Value, path: &Path, title: &str) -> Result<()>;
    fn show(&self, value: &Value, title: &str) -> Result<()>;
}

/// Default sink: grayscale PNGs with a colour bar for arrays.
#[derive(Clone, Debug)]
pub struct PngSink {
    min_pixels: u32,
    colorbar: bool,
}

impl Default for PngSink {
    fn default() -> Self {
        Self {
            min_pixels: 64,
            colorbar: true,
        }
    }
}

static NEXT_SHOW: AtomicU64 = AtomicU64::new(0);

impl PngSink {
    pub fn new(min_pixels: u32) -> Self {
        Self {
            min_pixels,
            ..Self::default()
        }
    }

    pub fn without_colorbar(mut self) -> Self {
        self.colorbar = false;
        self
    }

    /// Normalise a 2-D array to 8-bit grayscale, scaled up so its short
    /// side reaches `min_pixels`.
    pub fn to_gray(&self, array: &NdArray) -> Result<GrayImage> {
        let (rows, cols) = match array.shape() {
            [r, c] if *r > 0 && *c > 0 => (*r, *c),
            shape => {
                return Err(TreeError::Eval(format!(
                    "cannot draw an array of shape {:?} as an image",
                    shape
                )))
            }
        };
        let (lo, hi) = array.min_max().unwrap_or((0.0, 0.0));
        let span = hi - lo;
        let shade = |x: f64| -> u8 {
            if !x.is_finite() {
                0
            } else if span <= 0.0 {
                128
            } else {
                (((x - lo) / span) * 255.0).round().clamp(0.0, 255.0) as u8
            }
        };

        let short = rows.min(cols) as u32;
        let scale = self.min_pixels.div_ceil(short).max(1);
        let width = cols as u32 * scale;
        let height = rows as u32 * scale;
        let bar = if self.colorbar { (width / 10).max(4) } else { 0 };
        let gap = if self.colorbar { 2 } else { 0 };

        let mut img = GrayImage::from_pixel(width + gap + bar, height, Luma([255]));
        for y in 0..height {
            for x in 0..width {
                let v = array
                    .get2((y / scale) as usize, (x / scale) as usize)
                    .unwrap_or(0.0);
                img.put_pixel(x, y, Luma([shade(v)]));
            }
            // top of the bar is the maximum
            if bar > 0 {
                let level = if height > 1 {
                    255 - (y * 255 / (height - 1)) as u8
                } else {
                    255
                };
                for x in width + gap..width + gap + bar {
                    img.put_pixel(x, y, Luma([level]));
                }
            }
        }
        Ok(img)
    }
}

impl ImageSink for PngSink {
    fn save(&self, value: &Value, path: &Path, title: &str) -> Result<()> {
        let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
        match value {
            Value::Image(img) => img.save_with_format(path, format)?,
            Value::Array(a) if value.is_image() => self.to_gray(a)?.save_with_format(path, format)?,
            other => return Err(TreeError::NotAnImage(other.type_name())),
        }
        log::info!("saved '{}' to {}", title, path.display());
        Ok(())
    }

    fn show(&self, value: &Value, title: &str) -> Result<()> {
        let n = NEXT_SHOW.fetch_add(1, Ordering::Relaxed);
        let path: PathBuf =
            std::env::temp_dir().join(format!("gptree-{}-{}.png", std::process::id(), n));
        self.save(value, &path, title)?;
        let viewer = if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        };
        Command::new(viewer).arg(&path).spawn()?;
        Ok(())
    }
}
