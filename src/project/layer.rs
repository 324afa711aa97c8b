use crate::error::RenderError;
use crate::geometry::Resolution;
use crate::image::Image;
use crate::render::{BlendMode, RenderContext, Texture};
use uuid::Uuid;

/// One animation frame of a layer: the CPU image and its GPU copy
#[derive(Debug, Clone)]
pub struct Frame {
    image: Image,
    texture: Option<Texture>,
    pub is_keyframe: bool,
    /// Set whenever the image changed after the last upload
    dirty: bool,
}

impl Frame {
    pub fn new(resolution: Resolution) -> Self {
        Self::from_image(Image::from_resolution(resolution))
    }

    pub fn from_image(image: Image) -> Self {
        Self {
            image,
            texture: None,
            is_keyframe: true,
            dirty: true,
        }
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    /// Mutable access to the pixels. The texture is stale until the next
    /// [`Frame::update_texture`].
    pub fn image_mut(&mut self) -> &mut Image {
        self.dirty = true;
        &mut self.image
    }

    /// Replaces the image, dropping a texture of the wrong size
    pub fn set_image(&mut self, image: Image) {
        if self.texture.as_ref().is_some_and(|t| t.size() != image.size()) {
            self.texture = None;
        }
        self.image = image;
        self.dirty = true;
    }

    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    pub fn needs_upload(&self) -> bool {
        self.dirty || self.texture.is_none()
    }

    /// Uploads the image if it changed. Afterwards the texture holds exactly
    /// the image content.
    pub fn update_texture(&mut self, render: &RenderContext, name: &str) -> Result<(), RenderError> {
        if !self.needs_upload() {
            return Ok(());
        }
        match &mut self.texture {
            Some(texture) if texture.size() == self.image.size() => texture.update(&self.image)?,
            _ => self.texture = Some(Texture::from_image(render, name, &self.image)),
        }
        self.dirty = false;
        Ok(())
    }
}

/// A named stack entry holding one frame per animation step
#[derive(Debug, Clone)]
pub struct Layer {
    pub id: Uuid,
    pub name: String,
    frames: Vec<Frame>,
    pub is_locked: bool,
    pub is_visible: bool,
    opacity: f32,
    pub blend_mode: BlendMode,
}

impl Layer {
    pub fn new(name: &str, resolution: Resolution, n_frames: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            frames: (0..n_frames.max(1)).map(|_| Frame::new(resolution)).collect(),
            is_locked: false,
            is_visible: true,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn frame_mut(&mut self, index: usize) -> Option<&mut Frame> {
        self.frames.get_mut(index)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn frames_mut(&mut self) -> &mut Vec<Frame> {
        &mut self.frames
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Clamped to [0, 1]
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    /// Name used for the egui texture of frame `index`
    pub fn texture_name(&self, index: usize) -> String {
        format!("layer_{}_frame_{}", self.id, index)
    }

    /// Uploads every stale frame
    pub fn update_textures(&mut self, render: &RenderContext) -> Result<(), RenderError> {
        for index in 0..self.frames.len() {
            let name = self.texture_name(index);
            self.frames[index].update_texture(render, &name)?;
        }
        Ok(())
    }
}
