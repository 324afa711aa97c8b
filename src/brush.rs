use crate::algorithms;
use crate::error::BrushError;
use crate::geometry::{PixelPosition, Resolution};
use crate::image::{Image, TRANSPARENT};
use image::Rgba;

/// Alpha above which a brush pixel counts as ink
pub const INK_THRESHOLD: f32 = 0.01;

/// A square opacity mask stamped around the cursor while drawing
#[derive(Debug, Clone, PartialEq)]
pub struct Brush {
    name: String,
    image: Image,
    outline_vertices: Vec<PixelPosition>,
}

impl Default for Brush {
    fn default() -> Self {
        Self::square(1)
    }
}

impl Brush {
    /// Builds a brush from a square image. Alpha is the brush opacity.
    pub fn from_image(name: &str, image: Image) -> Result<Self, BrushError> {
        let size = image.size();
        if size.is_empty() {
            return Err(BrushError::Empty);
        }
        if size.x != size.y {
            return Err(BrushError::NotSquare {
                width: size.x,
                height: size.y,
            });
        }

        let outline_vertices = algorithms::brush_outline_vertices(&image, INK_THRESHOLD);
        Ok(Self {
            name: name.to_string(),
            image,
            outline_vertices,
        })
    }

    pub fn square(size: u32) -> Self {
        let size = size.max(1);
        let image = Image::create(size, size, Rgba([255, 255, 255, 255]));
        let outline_vertices = algorithms::brush_outline_vertices(&image, INK_THRESHOLD);
        Self {
            name: format!("square {}", size),
            image,
            outline_vertices,
        }
    }

    pub fn circle(size: u32) -> Self {
        let size = size.max(1);
        let mut image = Image::create(size, size, TRANSPARENT);
        let last = size as i32 - 1;
        for pixel in algorithms::ellipse(PixelPosition::new(0, 0), PixelPosition::new(last, last), true) {
            image.set_pixel(pixel.x, pixel.y, Rgba([255, 255, 255, 255]));
        }

        let outline_vertices = algorithms::brush_outline_vertices(&image, INK_THRESHOLD);
        Self {
            name: format!("circle {}", size),
            image,
            outline_vertices,
        }
    }

    /// Parses a brush from a list of opacities separated by whitespace, commas or semicolons.
    ///
    /// The value count must be a perfect square; values are clamped to [0, 1].
    pub fn from_serialized(name: &str, text: &str) -> Result<Self, BrushError> {
        let values = text
            .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
            .filter(|token| !token.is_empty())
            .map(|token| {
                token
                    .parse::<f32>()
                    .map_err(|_| BrushError::Parse(token.to_string()))
            })
            .collect::<Result<Vec<f32>, BrushError>>()?;

        if values.is_empty() {
            return Err(BrushError::Empty);
        }

        let side = (values.len() as f64).sqrt().round() as usize;
        if side * side != values.len() {
            return Err(BrushError::NotPerfectSquare(values.len()));
        }

        let mut image = Image::create(side as u32, side as u32, TRANSPARENT);
        for (i, value) in values.iter().enumerate() {
            let alpha = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
            image.set_pixel((i % side) as i32, (i / side) as i32, Rgba([255, 255, 255, alpha]));
        }

        Self::from_image(name, image)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    /// Side length in pixels
    pub fn size(&self) -> u32 {
        self.image.width()
    }

    pub fn resolution(&self) -> Resolution {
        self.image.size()
    }

    /// Outline vertices in brush-local pixel-corner coordinates
    pub fn outline_vertices(&self) -> &[PixelPosition] {
        &self.outline_vertices
    }

    /// Layer pixels covered when the brush is centered on `center`
    pub fn footprint(&self, center: PixelPosition) -> Vec<PixelPosition> {
        self.stamp(center).into_iter().map(|(pixel, _)| pixel).collect()
    }

    /// Covered layer pixels paired with the brush opacity at each of them
    pub fn stamp(&self, center: PixelPosition) -> Vec<(PixelPosition, f32)> {
        let half = self.size() as i32 / 2;
        let mut out = Vec::new();
        for y in 0..self.size() as i32 {
            for x in 0..self.size() as i32 {
                let opacity = self.image.alpha_at(x, y);
                if opacity > INK_THRESHOLD {
                    out.push((center.offset(x - half, y - half), opacity));
                }
            }
        }
        out
    }
}
