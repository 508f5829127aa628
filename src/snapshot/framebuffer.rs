//! Captured images and an in-memory framebuffer.
//!
//! Real runs get PNG bytes straight from the browser; the fake driver paints
//! its simulated page into a [`MockFramebuffer`] so evidence files exist in
//! tests too.

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{ImageBuffer, RgbImage};
use std::io::Cursor;

use super::types::{SnapshotError, SnapshotResult};

/// Result of a capture operation
#[derive(Debug, Clone)]
pub struct CaptureResult {
    /// PNG-encoded image data
    pub image_data: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Optional metadata about the capture
    pub metadata: Option<serde_json::Value>,
}

impl CaptureResult {
    /// Wrap PNG bytes, reading the dimensions from the image header
    pub fn from_png(image_data: Vec<u8>, metadata: Option<serde_json::Value>) -> SnapshotResult<Self> {
        let (width, height) = png_dimensions(&image_data)?;
        Ok(Self {
            image_data,
            width,
            height,
            metadata,
        })
    }
}

/// Width and height from a PNG IHDR chunk
pub fn png_dimensions(data: &[u8]) -> SnapshotResult<(u32, u32)> {
    const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    if data.len() < 24 || data[..8] != SIGNATURE || &data[12..16] != b"IHDR" {
        return Err(SnapshotError::Capture("screenshot is not a PNG image".to_string()));
    }
    let read = |at: usize| u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);
    Ok((read(16), read(20)))
}

/// RGB canvas the fake driver paints its page into
#[derive(Debug, Clone)]
pub struct MockFramebuffer {
    width: u32,
    height: u32,
    /// Row-major, 3 bytes per pixel
    buffer: Vec<u8>,
}

impl MockFramebuffer {
    pub fn with_color(width: u32, height: u32, color: [u8; 3]) -> Self {
        Self {
            width,
            height,
            buffer: color.repeat((width * height) as usize),
        }
    }

    /// Fill a rectangle, clipped to the canvas
    pub fn draw_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
        for py in y..(y + h).min(self.height) {
            for px in x..(x + w).min(self.width) {
                self.set_pixel(px, py, color);
            }
        }
    }

    /// Draw one line of 8x8 glyphs; text past the right edge is cut off
    pub fn draw_text(&mut self, x: u32, y: u32, text: &str, fg: [u8; 3], bg: [u8; 3]) {
        for (i, ch) in text.chars().enumerate() {
            let left = x + i as u32 * 8;
            if left >= self.width {
                break;
            }
            let glyph = BASIC_FONTS.get(ch).unwrap_or([0u8; 8]);
            for (row, bits) in glyph.iter().enumerate() {
                for bit in 0..8 {
                    // LSB is the leftmost pixel
                    let color = if (bits >> bit) & 1 == 1 { fg } else { bg };
                    self.set_pixel(left + bit, y + row as u32, color);
                }
            }
        }
    }

    fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if x < self.width && y < self.height {
            let idx = ((y * self.width + x) * 3) as usize;
            self.buffer[idx..idx + 3].copy_from_slice(&color);
        }
    }

    /// Encode as PNG
    pub fn capture(&self, metadata: Option<serde_json::Value>) -> SnapshotResult<CaptureResult> {
        let img: RgbImage = ImageBuffer::from_raw(self.width, self.height, self.buffer.clone())
            .ok_or_else(|| SnapshotError::Capture("framebuffer size does not match its dimensions".to_string()))?;
        let mut image_data = Vec::new();
        img.write_to(&mut Cursor::new(&mut image_data), image::ImageFormat::Png)?;
        Ok(CaptureResult {
            image_data,
            width: self.width,
            height: self.height,
            metadata,
        })
    }
}
