// Image decoding and true-colour half-block rendering

use crate::domain::{ImageEntry, ImageFormat};
use crate::error::{Result, ShortlistError};
use image::{DynamicImage, GenericImageView, ImageReader, Pixel};
use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};
use std::path::Path;

/// Cell area an image is scaled into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellSize {
    pub cols: u16,
    pub rows: u16,
}

impl CellSize {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

/// A decoded image scaled to fit a [`CellSize`]
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub lines: Vec<Line<'static>>,
    /// Size in pixels before scaling
    pub original: (u32, u32),
    /// Size in pixels after scaling; each cell row holds two pixel rows
    pub scaled: (u32, u32),
}

impl RenderedImage {
    pub fn cell_width(&self) -> u16 {
        self.scaled.0 as u16
    }

    pub fn cell_height(&self) -> u16 {
        self.lines.len() as u16
    }
}

/// Decodes an image file.
///
/// The format from the extension is the starting guess; content sniffing
/// wins when the bytes say otherwise.
pub fn load_image(path: &Path, format: ImageFormat) -> Result<DynamicImage> {
    let mut reader = ImageReader::open(path).map_err(|e| ShortlistError::decode(path, e))?;
    reader.set_format(format.codec());
    let reader = reader
        .with_guessed_format()
        .map_err(|e| ShortlistError::decode(path, e))?;
    reader.decode().map_err(|e| ShortlistError::decode(path, e))
}

/// Calculates new dimensions to fit image within max width and height while preserving aspect ratio
pub fn calculate_resize_dimensions(
    original_width: u32,
    original_height: u32,
    max_width: u32,
    max_height: u32,
) -> (u32, u32) {
    if original_width == 0 || original_height == 0 {
        return (0, 0);
    }

    let width_ratio = max_width as f64 / original_width as f64;
    let height_ratio = max_height as f64 / original_height as f64;

    let ratio = width_ratio.min(height_ratio);

    if ratio >= 1.0 {
        // Never upscale
        (original_width, original_height)
    } else {
        let new_width = ((original_width as f64 * ratio) as u32).max(1);
        let new_height = ((original_height as f64 * ratio) as u32).max(1);
        (new_width, new_height)
    }
}

/// Converts an image to styled lines using half-block characters.
///
/// Each cell is an upper half block (▀) whose foreground is the upper pixel and
/// whose background is the lower pixel, so one terminal row shows two pixel rows.
pub fn image_to_halfblock_lines(img: &DynamicImage, width: u32, height: u32) -> Vec<Line<'static>> {
    if width == 0 || height == 0 {
        return Vec::new();
    }

    // Triangle keeps large photos fast to scale
    let img = img.resize_exact(width, height, image::imageops::FilterType::Triangle);
    let img = img.to_rgb8();

    let term_height = height.div_ceil(2);
    let mut lines = Vec::with_capacity(term_height as usize);

    for y in 0..term_height {
        let upper_y = y * 2;
        let lower_y = upper_y + 1;

        let mut spans = Vec::with_capacity(width as usize);

        for x in 0..width {
            let upper = img.get_pixel(x, upper_y).to_rgb();
            let lower = if lower_y < height {
                img.get_pixel(x, lower_y).to_rgb()
            } else {
                upper
            };

            let style = Style::default()
                .fg(Color::Rgb(upper[0], upper[1], upper[2]))
                .bg(Color::Rgb(lower[0], lower[1], lower[2]));

            spans.push(Span::styled("▀", style));
        }

        lines.push(Line::from(spans));
    }

    lines
}

/// Scales a decoded image into `area` without upscaling
pub fn render_decoded(img: &DynamicImage, area: CellSize) -> RenderedImage {
    let original = img.dimensions();
    let scaled = calculate_resize_dimensions(
        original.0,
        original.1,
        area.cols as u32,
        area.rows as u32 * 2,
    );

    RenderedImage {
        lines: image_to_halfblock_lines(img, scaled.0, scaled.1),
        original,
        scaled,
    }
}

/// Decodes `entry` and scales it into `area`
pub fn render_image(entry: &ImageEntry, area: CellSize) -> Result<RenderedImage> {
    let img = load_image(&entry.path, entry.format)?;
    Ok(render_decoded(&img, area))
}
