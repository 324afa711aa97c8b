use super::context::CanvasContext;
use super::layer::CanvasLayer;
use super::tool::ToolEvent;
use crate::error::RenderError;
use crate::geometry::PixelPosition;
use crate::render::{BlendMode, RenderSurface, RenderTask, Shape, ShapeId};
use egui::Vec2;

/// Line tool progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineToolState {
    #[default]
    Unanchored,
    Anchored { start: PixelPosition },
}

#[derive(Debug, Clone, Copy)]
struct LineShapes {
    start_marker: ShapeId,
    end_marker: ShapeId,
    line: ShapeId,
}

/// Preview of the line tool: a crosshair on each end and the line between.
///
/// The first click anchors the start, the end tracks the cursor, and the
/// second click emits the line for the application to commit.
#[derive(Debug)]
pub struct LineToolLayer {
    surface: RenderSurface,
    state: LineToolState,
    active: bool,
    shapes: Option<LineShapes>,
}

impl Default for LineToolLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineToolLayer {
    pub fn new() -> Self {
        Self {
            surface: RenderSurface::new("line_tool"),
            state: LineToolState::Unanchored,
            active: false,
            shapes: None,
        }
    }

    pub fn state(&self) -> LineToolState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Activating or deactivating drops any anchor
    pub fn set_active(&mut self, ctx: &CanvasContext<'_>, active: bool) {
        self.active = active;
        self.state = LineToolState::Unanchored;
        self.reformat(ctx);
    }

    pub fn cancel(&mut self, ctx: &CanvasContext<'_>) {
        self.state = LineToolState::Unanchored;
        self.reformat(ctx);
    }

    /// Anchors on the first click, emits the line on the second
    pub fn click(&mut self, ctx: &CanvasContext<'_>) -> Option<ToolEvent> {
        if !self.active {
            return None;
        }
        let position = ctx.current_pixel_position();
        let event = match self.state {
            LineToolState::Unanchored => {
                self.state = LineToolState::Anchored { start: position };
                log::debug!("Line anchored at {}", position);
                None
            }
            LineToolState::Anchored { start } => {
                self.state = LineToolState::Unanchored;
                Some(ToolEvent::Line { start, end: position })
            }
        };
        self.reformat(ctx);
        event
    }

    pub fn start_marker_centroid(&self) -> Option<Vec2> {
        self.visible_centroid(|shapes| shapes.start_marker)
    }

    pub fn end_marker_centroid(&self) -> Option<Vec2> {
        self.visible_centroid(|shapes| shapes.end_marker)
    }

    /// Endpoints of the connecting line, if shown
    pub fn line_endpoints(&self) -> Option<[Vec2; 2]> {
        let shape = self.visible_shape(|shapes| shapes.line)?;
        Some([shape.vertex_position(0)?, shape.vertex_position(1)?])
    }

    fn visible_shape(&self, pick: impl Fn(&LineShapes) -> ShapeId) -> Option<&Shape> {
        let shapes = self.shapes.as_ref()?;
        self.surface.shape(pick(shapes)).filter(|shape| shape.is_visible())
    }

    fn visible_centroid(&self, pick: impl Fn(&LineShapes) -> ShapeId) -> Option<Vec2> {
        self.visible_shape(pick).map(Shape::centroid)
    }

    fn initialize(&mut self) -> Result<LineShapes, RenderError> {
        let line = self.surface.add_shape(Shape::line(Vec2::ZERO, Vec2::ZERO))?;
        let start_marker = self.surface.add_shape(crosshair(Vec2::ZERO, Vec2::ZERO))?;
        let end_marker = self.surface.add_shape(crosshair(Vec2::ZERO, Vec2::ZERO))?;
        for id in [line, start_marker, end_marker] {
            self.surface
                .add_render_task(RenderTask::new(id, None, None, BlendMode::Normal));
        }
        Ok(LineShapes {
            start_marker,
            end_marker,
            line,
        })
    }
}

/// Two segments crossing at `center`, `half_extent` long on each side
fn crosshair(center: Vec2, half_extent: Vec2) -> Shape {
    Shape::lines(&crosshair_segments(center, half_extent))
}

fn crosshair_segments(center: Vec2, half_extent: Vec2) -> [[Vec2; 2]; 2] {
    [
        [center - Vec2::new(half_extent.x, 0.0), center + Vec2::new(half_extent.x, 0.0)],
        [center - Vec2::new(0.0, half_extent.y), center + Vec2::new(0.0, half_extent.y)],
    ]
}

impl CanvasLayer for LineToolLayer {
    fn name(&self) -> &'static str {
        "line tool"
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
                    log::warn!("Line tool layer: {}", err);
                    return;
                }
            },
        };

        let shown = self.active && ctx.has_area();
        let cursor = ctx.current_pixel_position();
        let (start, end) = match self.state {
            LineToolState::Unanchored => (cursor, None),
            LineToolState::Anchored { start } => (start, Some(cursor)),
        };

        let half_extent = ctx.device_to_normalized(ctx.settings.marker_size);
        let color = ctx.settings.line_tool_color;
        let start_center = ctx.align(ctx.pixel_center(start));
        let start_visible = shown && (end.is_some() || ctx.state.pointer_inside());

        if let Some(shape) = self.surface.shape_mut(shapes.start_marker) {
            let points: Vec<Vec2> = crosshair_segments(start_center, half_extent).concat();
            shape.set_vertex_positions(&points);
            shape.set_color(color);
            shape.set_visible(start_visible);
        }

        let end_center = end.map(|end| ctx.align(ctx.pixel_center(end)));
        if let Some(shape) = self.surface.shape_mut(shapes.end_marker) {
            if let Some(center) = end_center {
                let points: Vec<Vec2> = crosshair_segments(center, half_extent).concat();
                shape.set_vertex_positions(&points);
            }
            shape.set_color(color);
            shape.set_visible(shown && end_center.is_some());
        }
        if let Some(shape) = self.surface.shape_mut(shapes.line) {
            if let Some(center) = end_center {
                shape.set_vertex_positions(&[start_center, center]);
            }
            shape.set_color(color);
            shape.set_visible(shown && end_center.is_some());
        }

        self.surface.queue_render();
    }

    fn on_cursor_moved(&mut self, ctx: &CanvasContext<'_>) {
        if self.active {
            self.reformat(ctx);
        }
    }

    fn on_unrealize(&mut self) {
        self.surface.unrealize();
        self.shapes = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::context::CanvasState;
    use crate::geometry::Resolution;
    use crate::project::ProjectState;
    use crate::settings::CanvasSettings;

    #[test]
    fn test_inactive_tool_ignores_clicks() {
        let project = ProjectState::new(Resolution::new(8, 8), 1);
        let settings = CanvasSettings::default();
        let mut state = CanvasState::default();
        state.set_canvas_size(Vec2::new(80.0, 80.0));
        let ctx = CanvasContext::new(&state, &project, &settings);

        let mut layer = LineToolLayer::new();
        layer.on_realize(&ctx);
        assert_eq!(layer.click(&ctx), None);
        assert_eq!(layer.state(), LineToolState::Unanchored);
        assert!(layer.start_marker_centroid().is_none());
    }

    #[test]
    fn test_second_click_emits_line() {
        let project = ProjectState::new(Resolution::new(8, 8), 1);
        let settings = CanvasSettings::default();
        let mut state = CanvasState::default();
        state.set_canvas_size(Vec2::new(80.0, 80.0));
        state.set_pointer_inside(true);
        let mut layer = LineToolLayer::new();

        state.set_current_pixel_position(PixelPosition::new(1, 1));
        {
            let ctx = CanvasContext::new(&state, &project, &settings);
            layer.on_realize(&ctx);
            layer.set_active(&ctx, true);
            assert_eq!(layer.click(&ctx), None);
        }
        assert_eq!(
            layer.state(),
            LineToolState::Anchored {
                start: PixelPosition::new(1, 1)
            }
        );

        state.set_current_pixel_position(PixelPosition::new(6, 2));
        let ctx = CanvasContext::new(&state, &project, &settings);
        layer.on_cursor_moved(&ctx);
        assert!(layer.line_endpoints().is_some());
        assert_eq!(
            layer.click(&ctx),
            Some(ToolEvent::Line {
                start: PixelPosition::new(1, 1),
                end: PixelPosition::new(6, 2)
            })
        );
        assert_eq!(layer.state(), LineToolState::Unanchored);
        assert!(layer.end_marker_centroid().is_none());
    }
}
