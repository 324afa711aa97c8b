use super::shader::{ShaderId, ShaderLibrary, TILING_FRAGMENT_SHADER};
use crate::error::RenderError;
use crate::geometry::Resolution;
use crate::image::Image;
use egui::{Context, TextureHandle, TextureId, TextureOptions};

/// Shared rendering resources, created once per window and passed by
/// reference to everything that uploads textures or picks a program.
#[derive(Clone)]
pub struct RenderContext {
    egui: Context,
    shaders: ShaderLibrary,
    tiling_shader: ShaderId,
}

impl RenderContext {
    pub fn new(egui: Context) -> Self {
        let mut shaders = ShaderLibrary::new();
        let tiling_shader = shaders.register("transparency_tiling", TILING_FRAGMENT_SHADER);
        Self {
            egui,
            shaders,
            tiling_shader,
        }
    }

    pub fn egui(&self) -> &Context {
        &self.egui
    }

    pub fn shaders(&self) -> &ShaderLibrary {
        &self.shaders
    }

    pub fn tiling_shader(&self) -> ShaderId {
        self.tiling_shader
    }
}

/// GPU copy of an [`Image`], sampled with nearest filtering.
///
/// The underlying egui texture is freed when the last handle drops.
#[derive(Clone)]
pub struct Texture {
    handle: TextureHandle,
    size: Resolution,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.handle.id())
            .field("size", &self.size)
            .finish()
    }
}

impl Texture {
    pub fn from_image(render: &RenderContext, name: &str, image: &Image) -> Self {
        let handle = render
            .egui()
            .load_texture(name, image.to_color_image(), TextureOptions::NEAREST);
        Self {
            handle,
            size: image.size(),
        }
    }

    /// Re-uploads `image`, which must have the size the texture was created with
    pub fn update(&mut self, image: &Image) -> Result<(), RenderError> {
        if image.size() != self.size {
            return Err(RenderError::SizeMismatch {
                expected: [self.size.x as usize, self.size.y as usize],
                actual: [image.width() as usize, image.height() as usize],
            });
        }
        self.handle.set(image.to_color_image(), TextureOptions::NEAREST);
        Ok(())
    }

    pub fn id(&self) -> TextureId {
        self.handle.id()
    }

    pub fn size(&self) -> Resolution {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_texture_matches_image_size() {
        let render = RenderContext::new(Context::default());
        let image = Image::create(4, 3, Rgba([255, 0, 0, 255]));
        let texture = Texture::from_image(&render, "frame", &image);
        assert_eq!(texture.size(), Resolution::new(4, 3));
    }

    #[test]
    fn test_update_rejects_size_mismatch() {
        let render = RenderContext::new(Context::default());
        let mut texture = Texture::from_image(&render, "frame", &Image::create(4, 4, Rgba([0; 4])));

        assert!(texture.update(&Image::create(4, 4, Rgba([1, 2, 3, 4]))).is_ok());
        assert!(matches!(
            texture.update(&Image::create(8, 4, Rgba([0; 4]))),
            Err(RenderError::SizeMismatch {
                expected: [4, 4],
                actual: [8, 4]
            })
        ));
    }

    #[test]
    fn test_context_registers_tiling_program() {
        let render = RenderContext::new(Context::default());
        assert_eq!(render.shaders().find("transparency_tiling"), Some(render.tiling_shader()));
        assert_ne!(render.tiling_shader(), ShaderLibrary::DEFAULT);
    }
}
