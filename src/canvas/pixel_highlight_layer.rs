use super::context::CanvasContext;
use super::layer::{CanvasLayer, ProjectChanges};
use crate::error::RenderError;
use crate::geometry::PixelPosition;
use crate::render::{BlendMode, RenderSurface, RenderTask, Shape, ShapeId};
use crate::selection::Selection;
use egui::{Rect, Vec2};

#[derive(Debug, Clone, Copy)]
struct HighlightShapes {
    fill: ShapeId,
    outline: ShapeId,
}

/// Cursor overlay: a translucent fill over the hovered pixel and the outline
/// of the brush footprint around it
#[derive(Debug)]
pub struct PixelHighlightLayer {
    surface: RenderSurface,
    shapes: Option<HighlightShapes>,
}

impl Default for PixelHighlightLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl PixelHighlightLayer {
    pub fn new() -> Self {
        Self {
            surface: RenderSurface::new("pixel_highlight"),
            shapes: None,
        }
    }

    /// Maps a pointer position in viewport pixels to the layer pixel under it.
    ///
    /// The canvas publishes the result as its current pixel position.
    pub fn track_pointer(&self, ctx: &CanvasContext<'_>, viewport_position: Vec2) -> Option<PixelPosition> {
        ctx.pixel_at(viewport_position)
    }

    /// Bounds of the highlight fill, if shown
    pub fn fill_rect(&self) -> Option<Rect> {
        let shapes = self.shapes?;
        self.surface
            .shape(shapes.fill)
            .filter(|shape| shape.is_visible())
            .map(Shape::bounding_box)
    }

    pub fn outline_vertex_count(&self) -> usize {
        self.shapes
            .and_then(|shapes| self.surface.shape(shapes.outline))
            .map(Shape::vertex_count)
            .unwrap_or(0)
    }

    fn initialize(&mut self) -> Result<HighlightShapes, RenderError> {
        let fill = self.surface.add_shape(Shape::rectangle(Vec2::ZERO, Vec2::ZERO))?;
        let outline = self.surface.add_shape(Shape::lines(&[]))?;
        self.surface
            .add_render_task(RenderTask::new(fill, None, None, BlendMode::Normal));
        self.surface
            .add_render_task(RenderTask::new(outline, None, None, BlendMode::Normal));
        Ok(HighlightShapes { fill, outline })
    }
}

impl CanvasLayer for PixelHighlightLayer {
    fn name(&self) -> &'static str {
        "pixel highlight"
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
        let shapes = match self.shapes {
            Some(shapes) => shapes,
            None => match self.initialize() {
                Ok(shapes) => *self.shapes.insert(shapes),
                Err(err) => {
                    log::warn!("Pixel highlight layer: {}", err);
                    return;
                }
            },
        };

        let visible = ctx.state.pointer_inside() && ctx.has_area();
        for id in [shapes.fill, shapes.outline] {
            if let Some(shape) = self.surface.shape_mut(id) {
                shape.set_visible(visible);
            }
        }
        self.surface.queue_render();
        if !visible {
            return;
        }

        let pixel = ctx.current_pixel_position();
        let settings = ctx.settings;

        let top_left = ctx.align(ctx.pixel_top_left(pixel));
        let bottom_right = ctx.align(ctx.pixel_top_left(pixel.offset(1, 1)));
        if let Some(fill) = self.surface.shape_mut(shapes.fill) {
            fill.set_rectangle(top_left, bottom_right - top_left);
            fill.set_color(settings.cursor_color.gamma_multiply(settings.cursor_fill_alpha));
        }

        let footprint = Selection::create_from(ctx.project.brush().footprint(pixel));
        let points: Vec<Vec2> = footprint
            .outline_vertices()
            .iter()
            .flatten()
            .map(|corner| ctx.align(ctx.pixel_top_left(*corner)))
            .collect();
        if let Some(outline) = self.surface.shape_mut(shapes.outline) {
            outline.set_points(&points);
            outline.set_color(settings.cursor_color);
        }
    }

    fn on_project_changed(&mut self, ctx: &CanvasContext<'_>, changes: &ProjectChanges) {
        if changes.resolution || changes.brush {
            self.reformat(ctx);
        }
    }

    fn on_cursor_moved(&mut self, ctx: &CanvasContext<'_>) {
        self.reformat(ctx);
    }

    fn on_unrealize(&mut self) {
        self.surface.unrealize();
        self.shapes = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::Brush;
    use crate::canvas::context::CanvasState;
    use crate::geometry::Resolution;
    use crate::project::ProjectState;
    use crate::settings::CanvasSettings;

    fn state() -> CanvasState {
        let mut state = CanvasState::default();
        state.set_canvas_size(Vec2::new(100.0, 100.0));
        state.set_view(10.0, Vec2::ZERO);
        state
    }

    #[test]
    fn test_hidden_until_pointer_enters() {
        let project = ProjectState::new(Resolution::new(10, 10), 1);
        let settings = CanvasSettings::default();
        let state = state();
        let ctx = CanvasContext::new(&state, &project, &settings);

        let mut layer = PixelHighlightLayer::new();
        layer.on_realize(&ctx);
        assert!(layer.fill_rect().is_none());
    }

    #[test]
    fn test_fill_snaps_to_hovered_pixel() {
        let project = ProjectState::new(Resolution::new(10, 10), 1);
        let settings = CanvasSettings::default();
        let mut state = state();
        let mut layer = PixelHighlightLayer::new();

        let pixel = {
            let ctx = CanvasContext::new(&state, &project, &settings);
            layer.on_realize(&ctx);
            layer.track_pointer(&ctx, Vec2::new(25.0, 71.0))
        };
        assert_eq!(pixel, Some(PixelPosition::new(2, 7)));

        state.set_current_pixel_position(PixelPosition::new(2, 7));
        state.set_pointer_inside(true);
        let ctx = CanvasContext::new(&state, &project, &settings);
        layer.on_cursor_moved(&ctx);

        let rect = layer.fill_rect().unwrap();
        assert!((rect.min.x - 0.2).abs() < 1e-5);
        assert!((rect.min.y - 0.7).abs() < 1e-5);
        assert!((rect.max.x - 0.3).abs() < 1e-5);
        // 1x1 brush: four unit edges, two vertices each
        assert_eq!(layer.outline_vertex_count(), 8);
    }

    #[test]
    fn test_outline_follows_brush() {
        let mut project = ProjectState::new(Resolution::new(10, 10), 1);
        project.set_brush(Brush::square(3));
        let settings = CanvasSettings::default();
        let mut state = state();
        state.set_current_pixel_position(PixelPosition::new(5, 5));
        state.set_pointer_inside(true);
        let ctx = CanvasContext::new(&state, &project, &settings);

        let mut layer = PixelHighlightLayer::new();
        layer.on_realize(&ctx);
        // 3x3 footprint: 12 boundary edges
        assert_eq!(layer.outline_vertex_count(), 24);
    }
}
