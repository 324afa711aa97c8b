use super::context::CanvasContext;
use super::layer::{CanvasLayer, ProjectChanges};
use crate::render::{BlendMode, RenderSurface, RenderTask, Shape, ShapeId};
use egui::Vec2;

/// Boundary of the project selection, one line segment per pixel edge
#[derive(Debug)]
pub struct SelectionLayer {
    surface: RenderSurface,
    outline: Option<ShapeId>,
}

impl Default for SelectionLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionLayer {
    pub fn new() -> Self {
        Self {
            surface: RenderSurface::new("selection"),
            outline: None,
        }
    }

    /// Number of outline segments currently drawn
    pub fn segment_count(&self) -> usize {
        self.outline
            .and_then(|id| self.surface.shape(id))
            .map(|shape| shape.vertex_count() / 2)
            .unwrap_or(0)
    }
}

impl CanvasLayer for SelectionLayer {
    fn name(&self) -> &'static str {
        "selection"
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
        let id = match self.outline {
            Some(id) => id,
            None => match self.surface.add_shape(Shape::lines(&[])) {
                Ok(id) => {
                    self.surface
                        .add_render_task(RenderTask::new(id, None, None, BlendMode::Normal));
                    *self.outline.insert(id)
                }
                Err(err) => {
                    log::warn!("Selection layer: {}", err);
                    return;
                }
            },
        };

        let points: Vec<Vec2> = if ctx.has_area() {
            ctx.project
                .selection()
                .outline_vertices()
                .iter()
                .flatten()
                .map(|corner| ctx.align(ctx.pixel_top_left(*corner)))
                .collect()
        } else {
            Vec::new()
        };

        if let Some(shape) = self.surface.shape_mut(id) {
            shape.set_points(&points);
            shape.set_color(ctx.settings.selection_outline_color);
        }
        self.surface.queue_render();
    }

    fn on_project_changed(&mut self, ctx: &CanvasContext<'_>, changes: &ProjectChanges) {
        if changes.selection || changes.resolution {
            self.reformat(ctx);
        }
    }

    fn on_unrealize(&mut self) {
        self.surface.unrealize();
        self.outline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::context::CanvasState;
    use crate::geometry::{PixelPosition, Resolution};
    use crate::project::ProjectState;
    use crate::selection::Selection;
    use crate::settings::CanvasSettings;

    #[test]
    fn test_outline_segments_match_selection_edges() {
        let mut project = ProjectState::new(Resolution::new(8, 8), 1);
        project.set_selection(Selection::create_from_rectangle(
            PixelPosition::new(1, 1),
            Resolution::new(2, 3),
        ));
        let settings = CanvasSettings::default();
        let mut state = CanvasState::default();
        state.set_canvas_size(Vec2::new(80.0, 80.0));
        let ctx = CanvasContext::new(&state, &project, &settings);

        let mut layer = SelectionLayer::new();
        layer.on_realize(&ctx);
        assert_eq!(layer.segment_count(), 10);

        project.clear_selection();
        let ctx = CanvasContext::new(&state, &project, &settings);
        layer.on_project_changed(
            &ctx,
            &ProjectChanges {
                selection: true,
                ..Default::default()
            },
        );
        assert_eq!(layer.segment_count(), 0);
        assert!(layer.surface().collect().commands.is_empty());
    }
}
