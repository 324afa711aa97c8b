use super::context::CanvasContext;
use super::layer::{CanvasLayer, ProjectChanges};
use crate::render::{BlendMode, RenderSurface, RenderTask, Shape, ShapeId, Texture};
use egui::{Color32, TextureId, Vec2};

/// The image content: one textured quad per project layer, bottom layer first
#[derive(Debug)]
pub struct LayersLayer {
    surface: RenderSurface,
    /// Parallel to the project's layers
    shapes: Vec<ShapeId>,
}

impl Default for LayersLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl LayersLayer {
    pub fn new() -> Self {
        Self {
            surface: RenderSurface::new("layers"),
            shapes: Vec::new(),
        }
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn shape(&self, index: usize) -> Option<&Shape> {
        self.shapes.get(index).and_then(|id| self.surface.shape(*id))
    }

    /// Texture bound to each quad, in stacking order
    pub fn bound_textures(&self) -> Vec<Option<TextureId>> {
        (0..self.shapes.len())
            .map(|i| self.shape(i).and_then(Shape::texture))
            .collect()
    }

    /// Grows or shrinks the quads to the layer count, then rebinds each to
    /// the current frame of its layer
    fn reconcile(&mut self, ctx: &CanvasContext<'_>) {
        let layers = ctx.project.layers();

        while self.shapes.len() > layers.len() {
            if let Some(id) = self.shapes.pop() {
                self.surface.remove_shape(id);
            }
        }
        while self.shapes.len() < layers.len() {
            match self.surface.add_shape(Shape::rectangle(Vec2::ZERO, Vec2::ZERO)) {
                Ok(id) => {
                    let task = RenderTask::new(id, None, Some(ctx.state.shared_transform()), BlendMode::Normal);
                    self.surface.add_render_task(task);
                    self.shapes.push(id);
                }
                Err(err) => {
                    log::warn!("Layers layer: {}", err);
                    return;
                }
            }
        }

        let (top_left, size) = ctx.layer_rect();
        let frame_index = ctx.project.current_frame();
        for (layer, id) in layers.iter().zip(&self.shapes) {
            if let Some(shape) = self.surface.shape_mut(*id) {
                shape.set_rectangle(top_left, size);
                shape.set_texture(layer.frame(frame_index).and_then(|f| f.texture()).map(Texture::id));
                shape.set_visible(layer.is_visible);
                let alpha = (layer.opacity() * 255.0).round() as u8;
                shape.set_color(Color32::from_rgba_premultiplied(alpha, alpha, alpha, alpha));
            }
            if let Some(task) = self
                .surface
                .render_tasks_mut()
                .iter_mut()
                .find(|task| task.shape() == *id)
            {
                task.set_blend_mode(layer.blend_mode);
            }
        }
    }
}

impl CanvasLayer for LayersLayer {
    fn name(&self) -> &'static str {
        "layers"
    }

    fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    fn surface_mut(&mut self) -> &mut RenderSurface {
        &mut self.surface
    }

    fn reformat(&mut self, ctx: &CanvasContext<'_>) {
        if !self.surface.is_realized() {
            return;
        }
        self.reconcile(ctx);
        self.surface.queue_render();
    }

    fn on_transform_changed(&mut self, _ctx: &CanvasContext<'_>) {
        self.surface.queue_render();
    }

    fn on_project_changed(&mut self, ctx: &CanvasContext<'_>, changes: &ProjectChanges) {
        if changes.layers || changes.resolution || changes.frame || changes.image {
            self.reformat(ctx);
        }
    }

    fn on_unrealize(&mut self) {
        self.surface.unrealize();
        self.shapes.clear();
    }
}
