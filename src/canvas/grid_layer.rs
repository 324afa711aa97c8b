use super::context::CanvasContext;
use super::layer::{CanvasLayer, ProjectChanges};
use crate::error::RenderError;
use crate::geometry::Resolution;
use crate::render::{BlendMode, RenderSurface, RenderTask, Shape, ShapeId, Shared};
use crate::transform::Transform;
use egui::Vec2;

/// One line per pixel boundary, outer frame included
#[derive(Debug)]
pub struct GridLayer {
    surface: RenderSurface,
    horizontal: Vec<ShapeId>,
    vertical: Vec<ShapeId>,
    /// Resolution the line shapes were built for
    built_for: Option<Resolution>,
    visible: bool,
}

impl GridLayer {
    pub fn new(visible: bool) -> Self {
        Self {
            surface: RenderSurface::new("grid"),
            horizontal: Vec::new(),
            vertical: Vec::new(),
            built_for: None,
            visible,
        }
    }

    pub fn horizontal_line_count(&self) -> usize {
        self.horizontal.len()
    }

    pub fn vertical_line_count(&self) -> usize {
        self.vertical.len()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Hides or shows the lines without freeing them
    pub fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        for id in self.horizontal.iter().chain(&self.vertical) {
            if let Some(shape) = self.surface.shape_mut(*id) {
                shape.set_visible(visible);
            }
        }
        self.surface.queue_render();
    }

    pub fn lines(&self) -> impl Iterator<Item = &Shape> {
        self.horizontal
            .iter()
            .chain(&self.vertical)
            .filter_map(|id| self.surface.shape(*id))
    }

    fn rebuild(&mut self, ctx: &CanvasContext<'_>, resolution: Resolution) -> Result<(), RenderError> {
        for id in self.horizontal.drain(..).chain(self.vertical.drain(..)) {
            self.surface.remove_shape(id);
        }

        let transform = ctx.state.shared_transform();
        for _ in 0..=resolution.y {
            let id = self.add_line(transform.clone())?;
            self.horizontal.push(id);
        }
        for _ in 0..=resolution.x {
            let id = self.add_line(transform.clone())?;
            self.vertical.push(id);
        }
        self.built_for = Some(resolution);
        log::debug!(
            "Grid rebuilt with {} horizontal and {} vertical lines",
            self.horizontal.len(),
            self.vertical.len()
        );
        Ok(())
    }

    fn add_line(&mut self, transform: Shared<Transform>) -> Result<ShapeId, RenderError> {
        let mut shape = Shape::line(Vec2::ZERO, Vec2::ZERO);
        shape.set_visible(self.visible);
        let id = self.surface.add_shape(shape)?;
        self.surface
            .add_render_task(RenderTask::new(id, None, Some(transform), BlendMode::Normal));
        Ok(id)
    }
}

impl CanvasLayer for GridLayer {
    fn name(&self) -> &'static str {
        "grid"
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

        let resolution = ctx.layer_resolution();
        if self.built_for != Some(resolution) {
            if let Err(err) = self.rebuild(ctx, resolution) {
                log::warn!("Grid layer: {}", err);
                return;
            }
        }

        let (top_left, size) = ctx.layer_rect();
        let step = size / resolution.to_vec2();
        let color = ctx.settings.grid_color;

        for (i, id) in self.horizontal.iter().enumerate() {
            let y = top_left.y + i as f32 * step.y;
            if let Some(shape) = self.surface.shape_mut(*id) {
                shape.set_vertex_positions(&[Vec2::new(top_left.x, y), Vec2::new(top_left.x + size.x, y)]);
                shape.set_color(color);
            }
        }
        for (i, id) in self.vertical.iter().enumerate() {
            let x = top_left.x + i as f32 * step.x;
            if let Some(shape) = self.surface.shape_mut(*id) {
                shape.set_vertex_positions(&[Vec2::new(x, top_left.y), Vec2::new(x, top_left.y + size.y)]);
                shape.set_color(color);
            }
        }

        self.surface.queue_render();
    }

    fn on_transform_changed(&mut self, _ctx: &CanvasContext<'_>) {
        // the shared transform is applied on the GPU
        self.surface.queue_render();
    }

    fn on_project_changed(&mut self, ctx: &CanvasContext<'_>, changes: &ProjectChanges) {
        if changes.resolution {
            self.reformat(ctx);
        }
    }

    fn on_unrealize(&mut self) {
        self.surface.unrealize();
        self.horizontal.clear();
        self.vertical.clear();
        self.built_for = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::context::CanvasState;
    use crate::project::ProjectState;
    use crate::settings::CanvasSettings;

    #[test]
    fn test_one_line_per_pixel_boundary() {
        let project = ProjectState::new(Resolution::new(8, 4), 1);
        let settings = CanvasSettings::default();
        let mut state = CanvasState::default();
        state.set_canvas_size(Vec2::new(100.0, 100.0));
        let ctx = CanvasContext::new(&state, &project, &settings);

        let mut grid = GridLayer::new(true);
        grid.on_realize(&ctx);
        assert_eq!(grid.horizontal_line_count(), 5);
        assert_eq!(grid.vertical_line_count(), 9);
        assert_eq!(grid.surface().render_tasks().len(), 14);
    }

    #[test]
    fn test_hiding_keeps_shapes() {
        let project = ProjectState::new(Resolution::new(4, 4), 1);
        let settings = CanvasSettings::default();
        let mut state = CanvasState::default();
        state.set_canvas_size(Vec2::new(100.0, 100.0));
        let ctx = CanvasContext::new(&state, &project, &settings);

        let mut grid = GridLayer::new(true);
        grid.on_realize(&ctx);
        let count = grid.surface().shape_count();

        grid.set_visible(false);
        assert_eq!(grid.surface().shape_count(), count);
        assert!(grid.lines().all(|line| !line.is_visible()));
        assert!(grid.surface().collect().commands.is_empty());

        grid.set_visible(true);
        assert!(grid.lines().all(Shape::is_visible));
    }
}
