use std::path::Path;

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Writes frames to image files using the `image` crate. The format follows
/// the file extension.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        max_edge: Option<u32>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(format!("Refusing to write empty image to {}", path.display()).into());
        }
        if frame.channels() != 3 {
            return Err(format!("Expected 3 channels, got {}", frame.channels()).into());
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let rgb = frame.to_rgb();
        let img = image::RgbImage::from_raw(rgb.width(), rgb.height(), rgb.data().to_vec())
            .ok_or("Failed to create image from frame data")?;

        let img = match max_edge {
            Some(edge) => {
                let (w, h) = fit_within(img.width(), img.height(), edge);
                if (w, h) == img.dimensions() {
                    img
                } else {
                    image::imageops::resize(&img, w, h, image::imageops::FilterType::Triangle)
                }
            }
            None => img,
        };

        img.save(path)?;
        Ok(())
    }
}

/// Largest size with the same aspect ratio whose longest edge is at most
/// `max_edge`. Images already small enough keep their size.
pub fn fit_within(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_edge || longest == 0 {
        return (width, height);
    }
    let scale = max_edge as f64 / longest as f64;
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}
