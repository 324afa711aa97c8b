use super::context::CanvasContext;
use super::layer::{CanvasLayer, ProjectChanges};
use super::tool::{ShapeKind, ToolEvent};
use crate::error::RenderError;
use crate::geometry::PixelPosition;
use crate::render::shape::ellipse_points;
use crate::render::{BlendMode, RenderSurface, RenderTask, Shape, ShapeId};
use egui::{Rect, Vec2};

const ELLIPSE_VERTEX_COUNT: usize = 64;

#[derive(Debug, Clone, Copy)]
struct ShapeToolShapes {
    /// Top-left, top-right, bottom-right, bottom-left
    brackets: [ShapeId; 4],
    cross: ShapeId,
    ellipse: ShapeId,
}

/// Preview of the rectangle and ellipse tools: corner brackets, a center
/// cross and the inscribed ellipse around the affected pixels.
///
/// Before the first click the box is the brush footprint under the cursor;
/// once anchored it spans anchor to cursor. The second click emits the shape.
#[derive(Debug)]
pub struct ShapeToolLayer {
    surface: RenderSurface,
    kind: Option<ShapeKind>,
    anchor: Option<PixelPosition>,
    shapes: Option<ShapeToolShapes>,
    /// Set once the shape pool exists; later layouts only move vertices
    initialized: bool,
    centroid: Vec2,
    size: Vec2,
    margin: Vec2,
}

impl Default for ShapeToolLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeToolLayer {
    pub fn new() -> Self {
        Self {
            surface: RenderSurface::new("shape_tool"),
            kind: None,
            anchor: None,
            shapes: None,
            initialized: false,
            centroid: Vec2::ZERO,
            size: Vec2::ZERO,
            margin: Vec2::ZERO,
        }
    }

    pub fn kind(&self) -> Option<ShapeKind> {
        self.kind
    }

    /// `None` deactivates the preview. Any anchor is dropped.
    pub fn set_kind(&mut self, ctx: &CanvasContext<'_>, kind: Option<ShapeKind>) {
        self.kind = kind;
        self.anchor = None;
        self.reformat(ctx);
    }

    pub fn anchor(&self) -> Option<PixelPosition> {
        self.anchor
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Center of the previewed box, normalized
    pub fn centroid(&self) -> Vec2 {
        self.centroid
    }

    /// Size of the previewed box without margin, normalized
    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn margin(&self) -> Vec2 {
        self.margin
    }

    pub fn ellipse_bounds(&self) -> Option<Rect> {
        let shapes = self.shapes?;
        self.surface
            .shape(shapes.ellipse)
            .filter(|shape| shape.is_visible())
            .map(Shape::bounding_box)
    }

    pub fn click(&mut self, ctx: &CanvasContext<'_>) -> Option<ToolEvent> {
        let kind = self.kind?;
        let position = ctx.current_pixel_position();
        let event = match self.anchor.take() {
            None => {
                self.anchor = Some(position);
                None
            }
            Some(anchor) => Some(ToolEvent::Shape {
                kind,
                a: anchor,
                b: position,
            }),
        };
        self.reformat(ctx);
        event
    }

    /// Inclusive pixel bounds of the previewed box
    fn pixel_bounds(&self, ctx: &CanvasContext<'_>) -> (PixelPosition, PixelPosition) {
        let cursor = ctx.current_pixel_position();
        match self.anchor {
            Some(anchor) => (
                PixelPosition::new(anchor.x.min(cursor.x), anchor.y.min(cursor.y)),
                PixelPosition::new(anchor.x.max(cursor.x), anchor.y.max(cursor.y)),
            ),
            None => {
                let size = ctx.project.brush().size() as i32;
                let min = cursor.offset(-(size / 2), -(size / 2));
                (min, min.offset(size - 1, size - 1))
            }
        }
    }

    fn initialize(&mut self) -> Result<ShapeToolShapes, RenderError> {
        let mut brackets = Vec::with_capacity(4);
        for _ in 0..4 {
            brackets.push(self.surface.add_shape(Shape::lines(&[[Vec2::ZERO; 2]; 2]))?);
        }
        let cross = self.surface.add_shape(Shape::lines(&[[Vec2::ZERO; 2]; 2]))?;
        let ellipse = self
            .surface
            .add_shape(Shape::wireframe(&[Vec2::ZERO; ELLIPSE_VERTEX_COUNT]))?;

        for id in brackets.iter().chain([&cross, &ellipse]) {
            self.surface
                .add_render_task(RenderTask::new(*id, None, None, BlendMode::Normal));
        }
        self.initialized = true;
        Ok(ShapeToolShapes {
            brackets: [brackets[0], brackets[1], brackets[2], brackets[3]],
            cross,
            ellipse,
        })
    }
}

impl CanvasLayer for ShapeToolLayer {
    fn name(&self) -> &'static str {
        "shape tool"
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
                    log::warn!("Shape tool layer: {}", err);
                    return;
                }
            },
        };

        let visible = self.kind.is_some()
            && ctx.has_area()
            && (self.anchor.is_some() || ctx.state.pointer_inside());
        let all = shapes.brackets.into_iter().chain([shapes.cross, shapes.ellipse]);
        for id in all.clone() {
            if let Some(shape) = self.surface.shape_mut(id) {
                shape.set_visible(visible);
            }
        }
        self.surface.queue_render();
        if !visible {
            return;
        }

        let (min, max) = self.pixel_bounds(ctx);
        let top_left = ctx.align(ctx.pixel_top_left(min));
        let bottom_right = ctx.align(ctx.pixel_top_left(max.offset(1, 1)));
        self.size = bottom_right - top_left;
        self.centroid = top_left + self.size / 2.0;
        self.margin = ctx.pixel_size() * ctx.settings.shape_tool_margin;

        let outer_top_left = top_left - self.margin;
        let outer_bottom_right = bottom_right + self.margin;
        let outer = outer_bottom_right - outer_top_left;
        let arm = Vec2::splat(outer.min_elem() / 4.0);

        let corners = [
            (outer_top_left, Vec2::new(1.0, 1.0)),
            (Vec2::new(outer_bottom_right.x, outer_top_left.y), Vec2::new(-1.0, 1.0)),
            (outer_bottom_right, Vec2::new(-1.0, -1.0)),
            (Vec2::new(outer_top_left.x, outer_bottom_right.y), Vec2::new(1.0, -1.0)),
        ];
        for (id, (corner, direction)) in shapes.brackets.iter().zip(corners) {
            if let Some(shape) = self.surface.shape_mut(*id) {
                shape.set_vertex_positions(&[
                    corner,
                    corner + Vec2::new(arm.x * direction.x, 0.0),
                    corner,
                    corner + Vec2::new(0.0, arm.y * direction.y),
                ]);
            }
        }

        let cross = ctx.device_to_normalized(ctx.settings.marker_size);
        if let Some(shape) = self.surface.shape_mut(shapes.cross) {
            shape.set_vertex_positions(&[
                self.centroid - Vec2::new(cross.x, 0.0),
                self.centroid + Vec2::new(cross.x, 0.0),
                self.centroid - Vec2::new(0.0, cross.y),
                self.centroid + Vec2::new(0.0, cross.y),
            ]);
        }

        if let Some(shape) = self.surface.shape_mut(shapes.ellipse) {
            shape.set_vertex_positions(&ellipse_points(self.centroid, self.size / 2.0, ELLIPSE_VERTEX_COUNT));
        }

        let color = ctx.settings.shape_tool_color;
        for id in all {
            if let Some(shape) = self.surface.shape_mut(id) {
                shape.set_color(color);
            }
        }
    }

    fn on_project_changed(&mut self, ctx: &CanvasContext<'_>, changes: &ProjectChanges) {
        if changes.resolution || changes.brush {
            self.reformat(ctx);
        }
    }

    fn on_cursor_moved(&mut self, ctx: &CanvasContext<'_>) {
        if self.kind.is_some() {
            self.reformat(ctx);
        }
    }

    fn on_unrealize(&mut self) {
        self.surface.unrealize();
        self.shapes = None;
        self.initialized = false;
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
        state.set_pointer_inside(true);
        state
    }

    #[test]
    fn test_unanchored_box_matches_brush() {
        let mut project = ProjectState::new(Resolution::new(10, 10), 1);
        project.set_brush(Brush::square(3));
        let settings = CanvasSettings::default();
        let mut state = state();
        state.set_current_pixel_position(PixelPosition::new(5, 5));
        let ctx = CanvasContext::new(&state, &project, &settings);

        let mut layer = ShapeToolLayer::new();
        layer.on_realize(&ctx);
        layer.set_kind(&ctx, Some(ShapeKind::Ellipse));

        assert!((layer.size() - Vec2::splat(0.3)).length() < 1e-5);
        assert!((layer.centroid() - Vec2::splat(0.55)).length() < 1e-5);
        let bounds = layer.ellipse_bounds().unwrap();
        assert!((bounds.width() - 0.3).abs() < 1e-4);
    }

    #[test]
    fn test_shape_pool_is_reused() {
        let project = ProjectState::new(Resolution::new(10, 10), 1);
        let settings = CanvasSettings::default();
        let mut state = state();
        let mut layer = ShapeToolLayer::new();
        {
            let ctx = CanvasContext::new(&state, &project, &settings);
            layer.on_realize(&ctx);
            layer.set_kind(&ctx, Some(ShapeKind::Rectangle));
        }
        assert!(layer.is_initialized());
        let count = layer.surface().shape_count();

        state.set_current_pixel_position(PixelPosition::new(7, 2));
        let ctx = CanvasContext::new(&state, &project, &settings);
        layer.on_cursor_moved(&ctx);
        assert_eq!(layer.surface().shape_count(), count);
    }

    #[test]
    fn test_two_clicks_emit_shape() {
        let project = ProjectState::new(Resolution::new(10, 10), 1);
        let settings = CanvasSettings::default();
        let mut state = state();
        let mut layer = ShapeToolLayer::new();

        state.set_current_pixel_position(PixelPosition::new(1, 2));
        {
            let ctx = CanvasContext::new(&state, &project, &settings);
            layer.on_realize(&ctx);
            layer.set_kind(&ctx, Some(ShapeKind::Rectangle));
            assert_eq!(layer.click(&ctx), None);
        }
        assert_eq!(layer.anchor(), Some(PixelPosition::new(1, 2)));

        state.set_current_pixel_position(PixelPosition::new(4, 6));
        let ctx = CanvasContext::new(&state, &project, &settings);
        layer.on_cursor_moved(&ctx);
        assert!((layer.size() - Vec2::new(0.4, 0.5)).length() < 1e-5);

        assert_eq!(
            layer.click(&ctx),
            Some(ToolEvent::Shape {
                kind: ShapeKind::Rectangle,
                a: PixelPosition::new(1, 2),
                b: PixelPosition::new(4, 6),
            })
        );
        assert_eq!(layer.anchor(), None);
    }
}
