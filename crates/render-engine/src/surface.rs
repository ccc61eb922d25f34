//! The fixed-resolution output surface.

use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use lenscast_common::error::{LenscastError, LenscastResult};
use lenscast_viewport::CropRect;

use crate::source::VideoFrame;

/// What is painted under each blit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    /// Fill with an opaque or translucent color.
    Fill(Rgba<u8>),
    /// Clear to fully transparent.
    Clear,
}

impl Background {
    /// Parse a configured background. `None` or an empty string clears.
    ///
    /// Accepts `#rgb`, `#rrggbb` and `#rrggbbaa`.
    pub fn from_config(value: Option<&str>) -> LenscastResult<Self> {
        let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(Self::Clear);
        };
        parse_hex_color(raw)
            .map(Self::Fill)
            .ok_or_else(|| LenscastError::config(format!("Invalid background color '{raw}'")))
    }
}

fn parse_hex_color(raw: &str) -> Option<Rgba<u8>> {
    let hex = raw.strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let byte = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut out = [0u8, 0, 0, 255];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                out[i] = v * 17;
            }
            Some(Rgba(out))
        }
        6 | 8 => {
            let r = byte(&hex[0..2])?;
            let g = byte(&hex[2..4])?;
            let b = byte(&hex[4..6])?;
            let a = if hex.len() == 8 { byte(&hex[6..8])? } else { 255 };
            Some(Rgba([r, g, b, a]))
        }
        _ => None,
    }
}

/// Raster target whose size is fixed at creation.
#[derive(Debug, Clone)]
pub struct OutputSurface {
    pixels: Arc<RgbaImage>,
}

impl OutputSurface {
    pub fn new(width: u32, height: u32) -> LenscastResult<Self> {
        if width == 0 || height == 0 {
            return Err(LenscastError::surface(format!(
                "Output surface must be non-empty, got {width}x{height}"
            )));
        }
        Ok(Self {
            pixels: Arc::new(RgbaImage::new(width, height)),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Cheap shared handle to the current contents.
    ///
    /// Later draws copy-on-write, so a snapshot never changes underneath
    /// its holder.
    pub fn snapshot(&self) -> Arc<RgbaImage> {
        Arc::clone(&self.pixels)
    }

    pub fn paint(&mut self, background: Background) {
        let color = match background {
            Background::Fill(color) => color,
            Background::Clear => Rgba([0, 0, 0, 0]),
        };
        for px in Arc::make_mut(&mut self.pixels).pixels_mut() {
            *px = color;
        }
    }

    /// Scale the `crop` region of `frame` over the whole surface.
    ///
    /// Crop coordinates are rounded here and nowhere else. The region is
    /// stretched to fill; aspect ratios are not reconciled.
    pub fn blit_scaled(&mut self, frame: &VideoFrame, crop: CropRect) -> LenscastResult<()> {
        let src = frame.image();
        let (fw, fh) = src.dimensions();

        let x = crop.left.round().max(0.0) as u32;
        let y = crop.top.round().max(0.0) as u32;
        let w = crop.width.round().max(1.0) as u32;
        let h = crop.height.round().max(1.0) as u32;
        // Rounding both edges up can overshoot by one pixel.
        let x = x.min(fw.saturating_sub(w));
        let y = y.min(fh.saturating_sub(h));
        if w > fw || h > fh {
            return Err(LenscastError::render(format!(
                "Crop {w}x{h} exceeds source frame {fw}x{fh}"
            )));
        }

        let region = imageops::crop_imm(src, x, y, w, h).to_image();
        let scaled = imageops::resize(&region, self.width(), self.height(), FilterType::Triangle);
        imageops::overlay(Arc::make_mut(&mut self.pixels), &scaled, 0, 0);
        Ok(())
    }
}
