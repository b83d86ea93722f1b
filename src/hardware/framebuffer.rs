//! In-memory 64x32 monochrome frame
//!
//! Pixels live in an `image::GrayImage` (0 = off, 255 = on) so frames can be
//! exported as PNG. Text goes through `embedded-graphics` with the 5x8 mono
//! font, and every text run drawn since the last fill is kept for inspection.

use embedded_graphics::{
    mono_font::{ascii::FONT_5X8, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use image::{GrayImage, Luma};
use std::convert::Infallible;
use std::path::Path;

use super::{Screen, DISPLAY_HEIGHT, DISPLAY_WIDTH};

const ON: Luma<u8> = Luma([255]);
const OFF: Luma<u8> = Luma([0]);

/// A line of text as it was drawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub x: i32,
    pub y: i32,
}

pub struct FrameBuffer {
    pixels: GrayImage,
    texts: Vec<TextRun>,
    frames_shown: u64,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            pixels: GrayImage::new(DISPLAY_WIDTH, DISPLAY_HEIGHT),
            texts: Vec::new(),
            frames_shown: 0,
        }
    }

    pub fn is_on(&self, x: u32, y: u32) -> bool {
        x < DISPLAY_WIDTH && y < DISPLAY_HEIGHT && self.pixels.get_pixel(x, y).0[0] != 0
    }

    /// Number of lit pixels in the frame
    pub fn lit_pixels(&self) -> usize {
        self.pixels.pixels().filter(|p| p.0[0] != 0).count()
    }

    pub fn texts(&self) -> &[TextRun] {
        &self.texts
    }

    /// Text drawn since the last fill, top to bottom
    pub fn text_lines(&self) -> Vec<String> {
        let mut runs = self.texts.clone();
        runs.sort_by_key(|run| (run.y, run.x));
        runs.into_iter().map(|run| run.text).collect()
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }

    pub fn image(&self) -> &GrayImage {
        &self.pixels
    }

    /// Save the frame as a PNG
    pub fn save_png(&self, path: &Path) -> image::ImageResult<()> {
        self.pixels.save(path)
    }

    fn put(&mut self, x: i32, y: i32, on: bool) {
        if x < 0 || y < 0 || x >= DISPLAY_WIDTH as i32 || y >= DISPLAY_HEIGHT as i32 {
            return;
        }
        self.pixels
            .put_pixel(x as u32, y as u32, if on { ON } else { OFF });
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH, DISPLAY_HEIGHT)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.put(point.x, point.y, color.is_on());
        }
        Ok(())
    }
}

impl Screen for FrameBuffer {
    fn fill(&mut self, on: bool) {
        let value = if on { ON } else { OFF };
        for pixel in self.pixels.pixels_mut() {
            *pixel = value;
        }
        self.texts.clear();
    }

    fn pixel(&mut self, x: i32, y: i32, on: bool) {
        self.put(x, y, on);
    }

    fn text(&mut self, text: &str, x: i32, y: i32) {
        let style = MonoTextStyle::new(&FONT_5X8, BinaryColor::On);
        // Infallible target
        let _ = Text::with_baseline(text, Point::new(x, y), style, Baseline::Top).draw(&mut *self);
        self.texts.push(TextRun {
            text: text.to_string(),
            x,
            y,
        });
    }

    fn show(&mut self) {
        self.frames_shown += 1;
    }
}
