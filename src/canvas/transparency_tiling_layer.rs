use super::context::CanvasContext;
use super::layer::CanvasLayer;
use crate::error::RenderError;
use crate::render::{shared, BlendMode, RenderSurface, RenderTask, ShaderId, Shape, ShapeId, Shared};
use egui::{Color32, Rect, Vec2};

/// Stands in for an unbounded extent, in normalized units
const INFINITY: f32 = 10_000.0;

#[derive(Debug, Clone, Copy)]
struct TilingShapes {
    checkerboard: ShapeId,
    /// Left, right, top, bottom of the layer rectangle
    subtract: [ShapeId; 4],
}

/// Checkerboard behind the image, clipped to the layer rectangle
#[derive(Debug)]
pub struct TransparencyTilingLayer {
    surface: RenderSurface,
    shader: ShaderId,
    tile_size: Shared<f32>,
    light_color: Shared<Color32>,
    dark_color: Shared<Color32>,
    shapes: Option<TilingShapes>,
}

impl TransparencyTilingLayer {
    pub fn new(shader: ShaderId) -> Self {
        Self {
            surface: RenderSurface::new("transparency_tiling"),
            shader,
            tile_size: shared(8.0),
            light_color: shared(Color32::LIGHT_GRAY),
            dark_color: shared(Color32::GRAY),
            shapes: None,
        }
    }

    fn initialize(&mut self, ctx: &CanvasContext<'_>) -> Result<TilingShapes, RenderError> {
        let checkerboard = self.surface.add_shape(Shape::rectangle(Vec2::ZERO, Vec2::ZERO))?;
        let mut task = RenderTask::new(checkerboard, Some(self.shader), None, BlendMode::Normal);
        task.register_vec2("_canvas_size", ctx.state.shared_canvas_size());
        task.register_float("_tile_size", self.tile_size.clone());
        task.register_color("_light_color", self.light_color.clone());
        task.register_color("_dark_color", self.dark_color.clone());
        self.surface.add_render_task(task);

        let mut subtract = [checkerboard; 4];
        for slot in &mut subtract {
            let mut shape = Shape::rectangle(Vec2::ZERO, Vec2::ZERO);
            shape.set_color(Color32::TRANSPARENT);
            let id = self.surface.add_shape(shape)?;
            self.surface
                .add_render_task(RenderTask::new(id, None, None, BlendMode::Multiply));
            *slot = id;
        }

        Ok(TilingShapes { checkerboard, subtract })
    }

    /// Checkerboard quad in normalized canvas space
    pub fn checkerboard_rect(&self) -> Option<Rect> {
        let shapes = self.shapes?;
        self.surface.shape(shapes.checkerboard).map(Shape::bounding_box)
    }

    /// Rectangles masking everything outside the layer
    pub fn subtract_rects(&self) -> Vec<Rect> {
        let Some(shapes) = self.shapes else {
            return Vec::new();
        };
        shapes
            .subtract
            .iter()
            .filter_map(|id| self.surface.shape(*id))
            .map(Shape::bounding_box)
            .collect()
    }
}

impl CanvasLayer for TransparencyTilingLayer {
    fn name(&self) -> &'static str {
        "transparency tiling"
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

        self.tile_size.set(ctx.settings.checkerboard_tile_size);
        self.light_color.set(ctx.settings.checkerboard_light);
        self.dark_color.set(ctx.settings.checkerboard_dark);

        let shapes = match self.shapes {
            Some(shapes) => shapes,
            None => match self.initialize(ctx) {
                Ok(shapes) => *self.shapes.insert(shapes),
                Err(err) => {
                    log::warn!("Transparency tiling layer: {}", err);
                    return;
                }
            },
        };

        let (top_left, size) = ctx.transformed_layer_rect();
        let top_left = ctx.align(top_left);
        let bottom_right = ctx.align(top_left + size);
        let size = bottom_right - top_left;

        if let Some(shape) = self.surface.shape_mut(shapes.checkerboard) {
            shape.set_rectangle(top_left, size);
        }

        let rects = [
            (Vec2::splat(-INFINITY), Vec2::new(top_left.x + INFINITY, 2.0 * INFINITY)),
            (Vec2::new(bottom_right.x, -INFINITY), Vec2::new(INFINITY, 2.0 * INFINITY)),
            (Vec2::new(top_left.x, -INFINITY), Vec2::new(size.x, top_left.y + INFINITY)),
            (Vec2::new(top_left.x, bottom_right.y), Vec2::new(size.x, INFINITY)),
        ];
        for (id, (rect_top_left, rect_size)) in shapes.subtract.iter().zip(rects) {
            if let Some(shape) = self.surface.shape_mut(*id) {
                shape.set_rectangle(rect_top_left, rect_size);
            }
        }

        self.surface.queue_render();
    }

    fn on_unrealize(&mut self) {
        self.surface.unrealize();
        self.shapes = None;
    }
}
