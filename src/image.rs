use crate::geometry::{PixelPosition, Resolution};
use egui::ColorImage;
use image::{Pixel, Rgba, RgbaImage};

/// An unmultiplied RGBA8 pixel color
pub type Color = Rgba<u8>;

pub const TRANSPARENT: Color = Rgba([0, 0, 0, 0]);

/// CPU-side pixel grid, addressable by (x, y) and mutable in place
#[derive(Clone, PartialEq)]
pub struct Image {
    data: RgbaImage,
}

impl Image {
    /// Creates a new image with every pixel set to `color`
    pub fn create(width: u32, height: u32, color: Color) -> Self {
        Self {
            data: RgbaImage::from_pixel(width, height, color),
        }
    }

    pub fn from_resolution(resolution: Resolution) -> Self {
        Self::create(resolution.x, resolution.y, TRANSPARENT)
    }

    pub fn from_rgba_image(data: RgbaImage) -> Self {
        Self { data }
    }

    pub fn width(&self) -> u32 {
        self.data.width()
    }

    pub fn height(&self) -> u32 {
        self.data.height()
    }

    pub fn size(&self) -> Resolution {
        Resolution::new(self.data.width(), self.data.height())
    }

    pub fn is_empty(&self) -> bool {
        self.size().is_empty()
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.size().contains(PixelPosition::new(x, y))
    }

    /// Returns the pixel at (x, y), or `None` if it lies outside the image
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Color> {
        if !self.contains(x, y) {
            return None;
        }
        Some(*self.data.get_pixel(x as u32, y as u32))
    }

    /// Sets the pixel at (x, y). Returns false if the position lies outside the image.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) -> bool {
        if !self.contains(x, y) {
            log::debug!("set_pixel: ({}, {}) outside of {}", x, y, self.size());
            return false;
        }
        self.data.put_pixel(x as u32, y as u32, color);
        true
    }

    /// Blends `color` over the pixel at (x, y) with its alpha scaled by `opacity`.
    ///
    /// Returns false if the position lies outside the image or nothing would change.
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Color, opacity: f32) -> bool {
        let alpha = (color.0[3] as f32 * opacity.clamp(0.0, 1.0)).round() as u8;
        if alpha == 0 || !self.contains(x, y) {
            return false;
        }
        let [r, g, b, _] = color.0;
        self.data.get_pixel_mut(x as u32, y as u32).blend(&Rgba([r, g, b, alpha]));
        true
    }

    /// Alpha of the pixel at (x, y) in [0, 1], 0 outside of the image
    pub fn alpha_at(&self, x: i32, y: i32) -> f32 {
        self.get_pixel(x, y)
            .map(|pixel| pixel.0[3] as f32 / 255.0)
            .unwrap_or(0.0)
    }

    /// Returns a copy of this image with a new size, keeping the pixel at
    /// `offset` of the old image at (0, 0) of the new one. Uncovered pixels are transparent.
    pub fn as_cropped(&self, offset: PixelPosition, size: Resolution) -> Self {
        let mut out = Self::from_resolution(size);
        for y in 0..size.y as i32 {
            for x in 0..size.x as i32 {
                if let Some(pixel) = self.get_pixel(x + offset.x, y + offset.y) {
                    out.set_pixel(x, y, pixel);
                }
            }
        }
        out
    }

    /// Returns a nearest-neighbour scaled copy of this image
    pub fn as_scaled(&self, size: Resolution) -> Self {
        Self {
            data: image::imageops::resize(&self.data, size.x, size.y, image::imageops::FilterType::Nearest),
        }
    }

    pub fn as_raw(&self) -> &[u8] {
        self.data.as_raw()
    }

    pub fn as_rgba_image(&self) -> &RgbaImage {
        &self.data
    }

    /// Converts into the premultiplied format egui uploads to the GPU
    pub fn to_color_image(&self) -> ColorImage {
        ColorImage::from_rgba_unmultiplied(
            [self.data.width() as usize, self.data.height() as usize],
            self.data.as_raw(),
        )
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("size", &self.size())
            .field("data", &"<pixels>")
            .finish()
    }
}
