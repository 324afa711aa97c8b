//! The image being edited: layers of animation frames sharing one resolution,
//! plus the selection, brush and color the drawing tools read.

pub mod layer;

pub use layer::{Frame, Layer};

use crate::brush::Brush;
use crate::error::{BrushError, ProjectError, RenderError};
use crate::geometry::{PixelPosition, Resolution};
use crate::image::{Color, Image};
use crate::render::{BlendMode, RenderContext};
use crate::selection::Selection;
use image::Rgba;

/// Change counters polled by the canvas layers. A counter only ever grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Revisions {
    /// Layer count, order or per-layer properties
    pub layers: u64,
    pub resolution: u64,
    pub frame: u64,
    pub selection: u64,
    pub brush: u64,
    /// Pixel content of any frame
    pub image: u64,
}

#[derive(Debug)]
pub struct ProjectState {
    layer_resolution: Resolution,
    /// Index 0 is the bottom of the stack
    layers: Vec<Layer>,
    current_layer: usize,
    current_frame: usize,
    selection: Selection,
    brush: Brush,
    primary_color: Color,
    revisions: Revisions,
}

impl Default for ProjectState {
    fn default() -> Self {
        Self::new(Resolution::default(), 1)
    }
}

impl ProjectState {
    /// Creates a project with a single empty layer
    pub fn new(layer_resolution: Resolution, n_frames: usize) -> Self {
        let layer_resolution = if layer_resolution.is_empty() {
            log::warn!("Empty layer resolution {}, using default", layer_resolution);
            Resolution::default()
        } else {
            layer_resolution
        };
        Self {
            layer_resolution,
            layers: vec![Layer::new("Layer #1", layer_resolution, n_frames)],
            current_layer: 0,
            current_frame: 0,
            selection: Selection::new(),
            brush: Brush::default(),
            primary_color: Rgba([0, 0, 0, 255]),
            revisions: Revisions::default(),
        }
    }

    pub fn layer_resolution(&self) -> Resolution {
        self.layer_resolution
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn frame_count(&self) -> usize {
        self.layers.first().map(Layer::frame_count).unwrap_or(0)
    }

    pub fn current_layer(&self) -> usize {
        self.current_layer
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    pub fn primary_color(&self) -> Color {
        self.primary_color
    }

    pub fn revisions(&self) -> Revisions {
        self.revisions
    }

    fn check_layer(&self, index: usize) -> Result<(), ProjectError> {
        if index < self.layers.len() {
            Ok(())
        } else {
            Err(ProjectError::LayerOutOfRange {
                index,
                count: self.layers.len(),
            })
        }
    }

    fn check_frame(&self, index: usize) -> Result<(), ProjectError> {
        let count = self.frame_count();
        if index < count {
            Ok(())
        } else {
            Err(ProjectError::FrameOutOfRange { index, count })
        }
    }

    /// Inserts a new empty layer above the current one and selects it
    pub fn add_layer(&mut self, name: &str) -> usize {
        let index = (self.current_layer + 1).min(self.layers.len());
        let layer = Layer::new(name, self.layer_resolution, self.frame_count());
        self.layers.insert(index, layer);
        self.current_layer = index;
        self.revisions.layers += 1;
        log::debug!("Added layer `{}` at {}", name, index);
        index
    }

    pub fn delete_layer(&mut self, index: usize) -> Result<Layer, ProjectError> {
        self.check_layer(index)?;
        if self.layers.len() == 1 {
            return Err(ProjectError::LastLayer);
        }
        let layer = self.layers.remove(index);
        if self.current_layer >= self.layers.len() || self.current_layer > index {
            self.current_layer = self.current_layer.saturating_sub(1);
        }
        self.revisions.layers += 1;
        Ok(layer)
    }

    /// Moves the layer at `from` so it ends up at index `to`
    pub fn move_layer(&mut self, from: usize, to: usize) -> Result<(), ProjectError> {
        self.check_layer(from)?;
        self.check_layer(to)?;
        if from == to {
            return Ok(());
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        if self.current_layer == from {
            self.current_layer = to;
        }
        self.revisions.layers += 1;
        Ok(())
    }

    pub fn layer_mut(&mut self, index: usize) -> Result<&mut Layer, ProjectError> {
        self.check_layer(index)?;
        self.revisions.layers += 1;
        Ok(&mut self.layers[index])
    }

    pub fn set_layer_visible(&mut self, index: usize, visible: bool) -> Result<(), ProjectError> {
        self.layer_mut(index)?.is_visible = visible;
        Ok(())
    }

    pub fn set_layer_locked(&mut self, index: usize, locked: bool) -> Result<(), ProjectError> {
        self.layer_mut(index)?.is_locked = locked;
        Ok(())
    }

    pub fn set_layer_opacity(&mut self, index: usize, opacity: f32) -> Result<(), ProjectError> {
        self.layer_mut(index)?.set_opacity(opacity);
        Ok(())
    }

    pub fn set_layer_blend_mode(&mut self, index: usize, blend_mode: BlendMode) -> Result<(), ProjectError> {
        self.layer_mut(index)?.blend_mode = blend_mode;
        Ok(())
    }

    /// Inserts an empty frame after the current one in every layer and selects it
    pub fn add_frame(&mut self) -> usize {
        let index = (self.current_frame + 1).min(self.frame_count());
        for layer in &mut self.layers {
            layer.frames_mut().insert(index, Frame::new(self.layer_resolution));
        }
        self.current_frame = index;
        self.revisions.frame += 1;
        index
    }

    pub fn delete_frame(&mut self, index: usize) -> Result<(), ProjectError> {
        self.check_frame(index)?;
        if self.frame_count() == 1 {
            return Err(ProjectError::LastFrame);
        }
        for layer in &mut self.layers {
            layer.frames_mut().remove(index);
        }
        if self.current_frame >= self.frame_count() || self.current_frame > index {
            self.current_frame = self.current_frame.saturating_sub(1);
        }
        self.revisions.frame += 1;
        Ok(())
    }

    pub fn set_current_frame(&mut self, index: usize) -> Result<(), ProjectError> {
        self.check_frame(index)?;
        if self.current_frame != index {
            self.current_frame = index;
            self.revisions.frame += 1;
        }
        Ok(())
    }

    pub fn set_current_layer(&mut self, index: usize) -> Result<(), ProjectError> {
        self.check_layer(index)?;
        self.current_layer = index;
        Ok(())
    }

    /// Changes the resolution without scaling. The old content is placed with
    /// its top-left pixel at `offset` in the new image.
    pub fn resize_canvas(&mut self, resolution: Resolution, offset: PixelPosition) -> Result<(), ProjectError> {
        self.check_resolution(resolution)?;
        let crop = PixelPosition::new(-offset.x, -offset.y);
        self.rebuild_frames(resolution, |image| image.as_cropped(crop, resolution));
        self.selection.offset(offset.x, offset.y);
        let mut bounds = Selection::all(resolution);
        bounds.intersect_with(&self.selection);
        self.selection = bounds;
        self.revisions.selection += 1;
        log::info!("Resized canvas to {} (offset {})", resolution, offset);
        Ok(())
    }

    /// Scales every frame to `resolution` with nearest-neighbour sampling
    pub fn scale_canvas(&mut self, resolution: Resolution) -> Result<(), ProjectError> {
        self.check_resolution(resolution)?;
        self.rebuild_frames(resolution, |image| image.as_scaled(resolution));
        if !self.selection.is_empty() {
            self.selection.clear();
            self.revisions.selection += 1;
        }
        log::info!("Scaled canvas to {}", resolution);
        Ok(())
    }

    fn check_resolution(&self, resolution: Resolution) -> Result<(), ProjectError> {
        if resolution.is_empty() {
            return Err(ProjectError::InvalidResolution {
                width: resolution.x,
                height: resolution.y,
            });
        }
        Ok(())
    }

    fn rebuild_frames(&mut self, resolution: Resolution, rebuild: impl Fn(&Image) -> Image) {
        for layer in &mut self.layers {
            for frame in layer.frames_mut() {
                let image = rebuild(frame.image());
                frame.set_image(image);
            }
        }
        self.layer_resolution = resolution;
        self.revisions.resolution += 1;
        self.revisions.image += 1;
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
        self.revisions.selection += 1;
    }

    pub fn select_all(&mut self) {
        self.set_selection(Selection::all(self.layer_resolution));
    }

    pub fn clear_selection(&mut self) {
        self.set_selection(Selection::new());
    }

    pub fn set_brush(&mut self, brush: Brush) {
        self.brush = brush;
        self.revisions.brush += 1;
    }

    /// Parses and installs a brush. On error the current brush is kept.
    pub fn load_brush_from_str(&mut self, name: &str, text: &str) -> Result<(), BrushError> {
        match Brush::from_serialized(name, text) {
            Ok(brush) => {
                self.set_brush(brush);
                Ok(())
            }
            Err(err) => {
                log::error!("Failed to load brush `{}`: {}", name, err);
                Err(err)
            }
        }
    }

    pub fn set_primary_color(&mut self, color: Color) {
        self.primary_color = color;
    }

    /// Writes `color` into the current layer and frame.
    ///
    /// Pixels outside the image, or outside a non-empty selection, are skipped.
    /// Returns the number of pixels written.
    pub fn draw_pixels(&mut self, pixels: &[PixelPosition], color: Color) -> Result<usize, ProjectError> {
        self.paint(pixels.iter().map(|pixel| (*pixel, 1.0)), color)
    }

    /// Like [`Self::draw_pixels`], with a per-pixel opacity in [0, 1].
    ///
    /// Opaque pixels replace the layer color; the rest are blended over it.
    pub fn stamp_pixels(&mut self, stamp: &[(PixelPosition, f32)], color: Color) -> Result<usize, ProjectError> {
        self.paint(stamp.iter().copied(), color)
    }

    fn paint(
        &mut self,
        pixels: impl IntoIterator<Item = (PixelPosition, f32)>,
        color: Color,
    ) -> Result<usize, ProjectError> {
        let index = self.current_layer;
        self.check_layer(index)?;
        if self.layers[index].is_locked {
            return Err(ProjectError::LayerLocked(index));
        }
        let frame_index = self.current_frame;
        let frame_count = self.frame_count();
        let frame = self.layers[index]
            .frame_mut(frame_index)
            .ok_or(ProjectError::FrameOutOfRange {
                index: frame_index,
                count: frame_count,
            })?;

        let restrict = !self.selection.is_empty();
        let image = frame.image_mut();
        let mut written = 0;
        for (pixel, opacity) in pixels {
            if restrict && !self.selection.contains(pixel) {
                continue;
            }
            let changed = if opacity >= 1.0 {
                image.set_pixel(pixel.x, pixel.y, color)
            } else {
                image.blend_pixel(pixel.x, pixel.y, color, opacity)
            };
            if changed {
                written += 1;
            }
        }
        if written > 0 {
            self.revisions.image += 1;
        }
        Ok(written)
    }

    /// Uploads every frame whose image changed since its last upload
    pub fn update_textures(&mut self, render: &RenderContext) -> Result<(), RenderError> {
        for layer in &mut self.layers {
            layer.update_textures(render)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Rgba([255, 0, 0, 255]);

    #[test]
    fn test_add_and_delete_layers() {
        let mut project = ProjectState::new(Resolution::new(4, 4), 2);
        let index = project.add_layer("Layer #2");
        assert_eq!(index, 1);
        assert_eq!(project.layer_count(), 2);
        assert_eq!(project.layer(1).map(Layer::frame_count), Some(2));

        project.delete_layer(0).unwrap();
        assert_eq!(project.current_layer(), 0);
        assert_eq!(project.delete_layer(0).unwrap_err(), ProjectError::LastLayer);
        assert_eq!(
            project.delete_layer(5).unwrap_err(),
            ProjectError::LayerOutOfRange { index: 5, count: 1 }
        );
    }

    #[test]
    fn test_move_layer_keeps_current_layer_selected() {
        let mut project = ProjectState::new(Resolution::new(2, 2), 1);
        project.add_layer("b");
        project.add_layer("c");
        project.set_current_layer(0).unwrap();
        let id = project.layer(0).map(|l| l.id);

        project.move_layer(0, 2).unwrap();
        assert_eq!(project.current_layer(), 2);
        assert_eq!(project.layer(2).map(|l| l.id), id);
    }

    #[test]
    fn test_frames_stay_in_lockstep() {
        let mut project = ProjectState::new(Resolution::new(2, 2), 1);
        project.add_layer("b");
        assert_eq!(project.add_frame(), 1);
        assert!(project.layers().iter().all(|l| l.frame_count() == 2));
        assert_eq!(project.current_frame(), 1);

        project.delete_frame(1).unwrap();
        assert_eq!(project.current_frame(), 0);
        assert_eq!(project.delete_frame(0).unwrap_err(), ProjectError::LastFrame);
    }

    #[test]
    fn test_draw_pixels_respects_lock_and_selection() {
        let mut project = ProjectState::new(Resolution::new(4, 4), 1);
        let pixels = [PixelPosition::new(0, 0), PixelPosition::new(1, 1), PixelPosition::new(9, 9)];
        assert_eq!(project.draw_pixels(&pixels, RED), Ok(2));

        project.set_selection(Selection::create_from([PixelPosition::new(2, 2)]));
        let written = project
            .draw_pixels(&[PixelPosition::new(2, 2), PixelPosition::new(3, 3)], RED)
            .unwrap();
        assert_eq!(written, 1);
        let image = project.layer(0).and_then(|l| l.frame(0)).map(Frame::image).unwrap();
        assert_eq!(image.get_pixel(3, 3), Some(Rgba([0, 0, 0, 0])));

        project.set_layer_locked(0, true).unwrap();
        assert_eq!(project.draw_pixels(&pixels, RED), Err(ProjectError::LayerLocked(0)));
    }

    #[test]
    fn test_resize_canvas_offsets_content() {
        let mut project = ProjectState::new(Resolution::new(4, 4), 2);
        project.draw_pixels(&[PixelPosition::new(0, 0)], RED).unwrap();
        let before = project.revisions();

        project
            .resize_canvas(Resolution::new(6, 5), PixelPosition::new(1, 2))
            .unwrap();
        assert_eq!(project.layer_resolution(), Resolution::new(6, 5));
        for frame in project.layers()[0].frames() {
            assert_eq!(frame.image().size(), Resolution::new(6, 5));
        }
        let image = project.layer(0).and_then(|l| l.frame(0)).map(Frame::image).unwrap();
        assert_eq!(image.get_pixel(1, 2), Some(RED));
        assert!(project.revisions().resolution > before.resolution);
    }

    #[test]
    fn test_invalid_resolution_is_rejected() {
        let mut project = ProjectState::new(Resolution::new(4, 4), 1);
        assert_eq!(
            project.scale_canvas(Resolution::new(0, 3)),
            Err(ProjectError::InvalidResolution { width: 0, height: 3 })
        );
        assert_eq!(project.layer_resolution(), Resolution::new(4, 4));
    }

    #[test]
    fn test_bad_brush_keeps_previous() {
        let mut project = ProjectState::default();
        project.set_brush(Brush::square(3));
        assert_eq!(
            project.load_brush_from_str("bad", "1 1 1"),
            Err(BrushError::NotPerfectSquare(3))
        );
        assert_eq!(project.brush().size(), 3);

        project.load_brush_from_str("dot", "0 1 0 1 1 1 0 1 0").unwrap();
        assert_eq!(project.brush().name(), "dot");
    }
}
