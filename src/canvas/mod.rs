//! The canvas: an ordered stack of layers drawn over one viewport.
//!
//! [`Canvas`] owns the view state (pan, zoom, viewport size, cursor pixel)
//! and forwards every change to its layers in stacking order. The project is
//! passed into each call rather than held, so the application stays the only
//! owner of document data.

pub mod context;
pub mod grid_layer;
pub mod layer;
pub mod layers_layer;
pub mod line_tool_layer;
pub mod pixel_highlight_layer;
pub mod selection_layer;
pub mod shape_tool_layer;
pub mod tool;
pub mod transparency_tiling_layer;

pub use context::{CanvasContext, CanvasState, CANVAS_CENTER};
pub use grid_layer::GridLayer;
pub use layer::{CanvasLayer, ProjectChanges};
pub use layers_layer::LayersLayer;
pub use line_tool_layer::{LineToolLayer, LineToolState};
pub use pixel_highlight_layer::PixelHighlightLayer;
pub use selection_layer::SelectionLayer;
pub use shape_tool_layer::ShapeToolLayer;
pub use tool::{ShapeKind, ToolEvent, ToolKind};
pub use transparency_tiling_layer::TransparencyTilingLayer;

use crate::geometry::PixelPosition;
use crate::project::{ProjectState, Revisions};
use crate::render::{DrawList, RenderContext};
use crate::settings::CanvasSettings;
use egui::Vec2;

/// The layers in drawing order, bottom first
#[derive(Debug)]
struct LayerStack {
    tiling: TransparencyTilingLayer,
    layers: LayersLayer,
    grid: GridLayer,
    selection: SelectionLayer,
    shape_tool: ShapeToolLayer,
    line_tool: LineToolLayer,
    highlight: PixelHighlightLayer,
}

impl LayerStack {
    fn iter(&self) -> [&dyn CanvasLayer; 7] {
        [
            &self.tiling,
            &self.layers,
            &self.grid,
            &self.selection,
            &self.shape_tool,
            &self.line_tool,
            &self.highlight,
        ]
    }

    fn iter_mut(&mut self) -> [&mut dyn CanvasLayer; 7] {
        [
            &mut self.tiling,
            &mut self.layers,
            &mut self.grid,
            &mut self.selection,
            &mut self.shape_tool,
            &mut self.line_tool,
            &mut self.highlight,
        ]
    }
}

#[derive(Debug)]
pub struct Canvas {
    state: CanvasState,
    stack: LayerStack,
    active_tool: ToolKind,
    /// Project revisions the layers were last laid out for, `None` while unrealized
    seen: Option<Revisions>,
    /// The first non-empty resize fits the layer to the viewport
    fitted: bool,
    realized: bool,
}

impl Canvas {
    pub fn new(render: &RenderContext, settings: &CanvasSettings) -> Self {
        Self {
            state: CanvasState::default(),
            stack: LayerStack {
                tiling: TransparencyTilingLayer::new(render.tiling_shader()),
                layers: LayersLayer::new(),
                grid: GridLayer::new(settings.grid_visible),
                selection: SelectionLayer::new(),
                shape_tool: ShapeToolLayer::new(),
                line_tool: LineToolLayer::new(),
                highlight: PixelHighlightLayer::new(),
            },
            active_tool: ToolKind::default(),
            seen: None,
            fitted: false,
            realized: false,
        }
    }

    pub fn state(&self) -> &CanvasState {
        &self.state
    }

    pub fn is_realized(&self) -> bool {
        self.realized
    }

    pub fn active_tool(&self) -> ToolKind {
        self.active_tool
    }

    pub fn current_pixel_position(&self) -> PixelPosition {
        self.state.current_pixel_position()
    }

    pub fn transform_scale(&self) -> f32 {
        self.state.transform_scale()
    }

    pub fn tiling_layer(&self) -> &TransparencyTilingLayer {
        &self.stack.tiling
    }

    pub fn layers_layer(&self) -> &LayersLayer {
        &self.stack.layers
    }

    pub fn grid_layer(&self) -> &GridLayer {
        &self.stack.grid
    }

    pub fn selection_layer(&self) -> &SelectionLayer {
        &self.stack.selection
    }

    pub fn shape_tool_layer(&self) -> &ShapeToolLayer {
        &self.stack.shape_tool
    }

    pub fn line_tool_layer(&self) -> &LineToolLayer {
        &self.stack.line_tool
    }

    pub fn highlight_layer(&self) -> &PixelHighlightLayer {
        &self.stack.highlight
    }

    /// Lets every layer allocate its shapes. Must run before anything is drawn.
    pub fn realize(&mut self, project: &ProjectState, settings: &CanvasSettings) {
        if self.realized {
            return;
        }
        let ctx = CanvasContext::new(&self.state, project, settings);
        for layer in self.stack.iter_mut() {
            layer.on_realize(&ctx);
            log::debug!("Realized {} layer", layer.name());
        }
        self.stack.line_tool.set_active(&ctx, self.active_tool == ToolKind::Line);
        self.stack.shape_tool.set_kind(&ctx, self.active_tool.shape_kind());
        self.seen = Some(project.revisions());
        self.realized = true;
    }

    /// Frees every shape. Realizing again rebuilds them from scratch.
    pub fn unrealize(&mut self) {
        if !self.realized {
            return;
        }
        for layer in self.stack.iter_mut() {
            layer.on_unrealize();
        }
        self.seen = None;
        self.realized = false;
    }

    /// Viewport size in device pixels
    pub fn resize(&mut self, size: Vec2, project: &ProjectState, settings: &CanvasSettings) {
        if size == self.state.canvas_size() {
            return;
        }
        self.state.set_canvas_size(size);
        if !self.fitted && size.x > 0.0 && size.y > 0.0 {
            self.fitted = true;
            let scale = fit_scale(size, project, settings);
            self.state.set_view(scale, Vec2::ZERO);
        }

        let ctx = CanvasContext::new(&self.state, project, settings);
        for layer in self.stack.iter_mut() {
            layer.on_resize(&ctx);
        }
        self.retrack_pointer(project, settings);
    }

    /// Forwards project edits made since the last call
    pub fn sync(&mut self, project: &ProjectState, settings: &CanvasSettings) {
        let Some(seen) = self.seen else {
            return;
        };
        let revisions = project.revisions();
        let changes = ProjectChanges::between(seen, revisions);
        self.seen = Some(revisions);
        if !changes.any() {
            return;
        }

        log::debug!("Project changed: {:?}", changes);
        let ctx = CanvasContext::new(&self.state, project, settings);
        for layer in self.stack.iter_mut() {
            layer.on_project_changed(&ctx, &changes);
        }
    }

    /// Relayouts every layer after a settings edit
    pub fn apply_settings(&mut self, project: &ProjectState, settings: &CanvasSettings) {
        self.stack.grid.set_visible(settings.grid_visible);
        let ctx = CanvasContext::new(&self.state, project, settings);
        for layer in self.stack.iter_mut() {
            layer.reformat(&ctx);
        }
    }

    /// Pointer moved to `position`, in viewport pixels.
    ///
    /// Returns the layer pixel now under the cursor.
    pub fn pointer_motion(
        &mut self,
        position: Vec2,
        project: &ProjectState,
        settings: &CanvasSettings,
    ) -> Option<PixelPosition> {
        self.state.set_pointer_position(Some(position));
        self.track_pointer(position, project, settings)
    }

    fn track_pointer(
        &mut self,
        position: Vec2,
        project: &ProjectState,
        settings: &CanvasSettings,
    ) -> Option<PixelPosition> {
        let pixel = {
            let ctx = CanvasContext::new(&self.state, project, settings);
            self.stack.highlight.track_pointer(&ctx, position)
        }?;
        let moved = pixel != self.state.current_pixel_position() || !self.state.pointer_inside();
        self.state.set_current_pixel_position(pixel);
        self.state.set_pointer_inside(true);

        if moved {
            let ctx = CanvasContext::new(&self.state, project, settings);
            for layer in self.stack.iter_mut() {
                layer.on_cursor_moved(&ctx);
            }
        }
        Some(pixel)
    }

    /// The view moved under a resting pointer: look up the pixel under it again
    fn retrack_pointer(&mut self, project: &ProjectState, settings: &CanvasSettings) {
        if !self.state.pointer_inside() {
            return;
        }
        if let Some(position) = self.state.pointer_position() {
            self.track_pointer(position, project, settings);
        }
    }

    pub fn pointer_leave(&mut self, project: &ProjectState, settings: &CanvasSettings) {
        self.state.set_pointer_position(None);
        if !self.state.pointer_inside() {
            return;
        }
        self.state.set_pointer_inside(false);
        let ctx = CanvasContext::new(&self.state, project, settings);
        for layer in self.stack.iter_mut() {
            layer.on_cursor_moved(&ctx);
        }
    }

    /// Primary button pressed at `position`. Returns the drawing operation
    /// the click completed, if any.
    pub fn pointer_click(
        &mut self,
        position: Vec2,
        project: &ProjectState,
        settings: &CanvasSettings,
    ) -> Option<ToolEvent> {
        self.pointer_motion(position, project, settings)?;
        let ctx = CanvasContext::new(&self.state, project, settings);
        match self.active_tool {
            ToolKind::Brush => Some(ToolEvent::Brush {
                center: ctx.current_pixel_position(),
            }),
            ToolKind::Line => self.stack.line_tool.click(&ctx),
            ToolKind::Rectangle | ToolKind::Ellipse => self.stack.shape_tool.click(&ctx),
        }
    }

    /// Drops a half-finished line or shape
    pub fn cancel_tool(&mut self, project: &ProjectState, settings: &CanvasSettings) {
        let ctx = CanvasContext::new(&self.state, project, settings);
        self.stack.line_tool.cancel(&ctx);
        self.stack.shape_tool.set_kind(&ctx, self.active_tool.shape_kind());
    }

    pub fn set_active_tool(&mut self, tool: ToolKind, project: &ProjectState, settings: &CanvasSettings) {
        if tool == self.active_tool {
            return;
        }
        log::debug!("Active tool: {}", tool.name());
        self.active_tool = tool;
        let ctx = CanvasContext::new(&self.state, project, settings);
        self.stack.line_tool.set_active(&ctx, tool == ToolKind::Line);
        self.stack.shape_tool.set_kind(&ctx, tool.shape_kind());
    }

    pub fn set_grid_visible(&mut self, visible: bool) {
        self.stack.grid.set_visible(visible);
    }

    pub fn zoom_in(&mut self, project: &ProjectState, settings: &CanvasSettings) {
        let scale = self.state.transform_scale() * settings.zoom_step;
        self.set_scale(scale, project, settings);
    }

    pub fn zoom_out(&mut self, project: &ProjectState, settings: &CanvasSettings) {
        let scale = self.state.transform_scale() / settings.zoom_step;
        self.set_scale(scale, project, settings);
    }

    /// Device pixels per layer pixel, clamped to the configured zoom range
    pub fn set_scale(&mut self, scale: f32, project: &ProjectState, settings: &CanvasSettings) {
        let scale = settings.clamp_zoom(scale);
        let offset = self.state.offset();
        self.set_view(scale, offset, project, settings);
    }

    /// Largest scale showing the whole layer, whole-numbered when above 1
    pub fn fit_to_viewport(&mut self, project: &ProjectState, settings: &CanvasSettings) {
        let scale = fit_scale(self.state.canvas_size(), project, settings);
        self.set_view(scale, Vec2::ZERO, project, settings);
    }

    /// Moves the view by `delta` device pixels
    pub fn pan(&mut self, delta: Vec2, project: &ProjectState, settings: &CanvasSettings) {
        if delta == Vec2::ZERO {
            return;
        }
        let offset = self.state.offset() + delta;
        let scale = self.state.transform_scale();
        self.set_view(scale, offset, project, settings);
    }

    /// Unit scale, no pan
    pub fn reset_transform(&mut self, project: &ProjectState, settings: &CanvasSettings) {
        self.set_view(1.0, Vec2::ZERO, project, settings);
    }

    fn set_view(&mut self, scale: f32, offset: Vec2, project: &ProjectState, settings: &CanvasSettings) {
        self.state.set_view(scale, offset);
        let ctx = CanvasContext::new(&self.state, project, settings);
        for layer in self.stack.iter_mut() {
            layer.on_transform_changed(&ctx);
        }
        self.retrack_pointer(project, settings);
    }

    /// True if any layer asked for a redraw since the last call
    pub fn take_render_request(&mut self) -> bool {
        let mut requested = false;
        for layer in self.stack.iter_mut() {
            requested |= layer.surface_mut().take_render_request();
        }
        requested
    }

    pub fn draw_list(&self) -> DrawList {
        DrawList {
            surfaces: self
                .stack
                .iter()
                .into_iter()
                .map(|layer| layer.surface().collect())
                .collect(),
        }
    }
}

fn fit_scale(viewport: Vec2, project: &ProjectState, settings: &CanvasSettings) -> f32 {
    let resolution = project.layer_resolution();
    if resolution.is_empty() || viewport.x <= 0.0 || viewport.y <= 0.0 {
        return 1.0;
    }
    let ratio = (viewport / resolution.to_vec2()).min_elem();
    let scale = if ratio >= 1.0 { ratio.floor() } else { ratio };
    settings.clamp_zoom(scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Resolution;

    fn canvas(settings: &CanvasSettings) -> Canvas {
        let render = RenderContext::new(egui::Context::default());
        Canvas::new(&render, settings)
    }

    #[test]
    fn test_first_resize_fits_layer() {
        let project = ProjectState::new(Resolution::new(16, 16), 1);
        let settings = CanvasSettings::default();
        let mut canvas = canvas(&settings);
        canvas.realize(&project, &settings);
        canvas.resize(Vec2::new(320.0, 320.0), &project, &settings);
        assert_eq!(canvas.transform_scale(), 20.0);

        canvas.zoom_in(&project, &settings);
        canvas.resize(Vec2::new(400.0, 320.0), &project, &settings);
        assert_eq!(canvas.transform_scale(), 25.0);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let project = ProjectState::default();
        let settings = CanvasSettings::default();
        let mut canvas = canvas(&settings);
        canvas.set_scale(10_000.0, &project, &settings);
        assert_eq!(canvas.transform_scale(), settings.zoom_max);
        canvas.set_scale(0.0, &project, &settings);
        assert_eq!(canvas.transform_scale(), settings.zoom_min);
    }

    #[test]
    fn test_draw_list_follows_stacking_order() {
        let project = ProjectState::default();
        let settings = CanvasSettings::default();
        let mut canvas = canvas(&settings);
        canvas.realize(&project, &settings);
        canvas.resize(Vec2::new(64.0, 64.0), &project, &settings);

        let labels: Vec<_> = canvas.draw_list().surfaces.iter().map(|s| s.label).collect();
        assert_eq!(
            labels,
            [
                "transparency_tiling",
                "layers",
                "grid",
                "selection",
                "shape_tool",
                "line_tool",
                "pixel_highlight"
            ]
        );
        assert!(canvas.take_render_request());
        assert!(!canvas.take_render_request());
    }

    #[test]
    fn test_brush_click_emits_hovered_pixel() {
        let project = ProjectState::new(Resolution::new(10, 10), 1);
        let settings = CanvasSettings::default();
        let mut canvas = canvas(&settings);
        canvas.realize(&project, &settings);
        canvas.resize(Vec2::new(300.0, 300.0), &project, &settings);

        assert_eq!(
            canvas.pointer_click(Vec2::new(95.0, 125.0), &project, &settings),
            Some(ToolEvent::Brush {
                center: PixelPosition::new(3, 4)
            })
        );
        assert!(canvas.state().pointer_inside());
        canvas.pointer_leave(&project, &settings);
        assert!(!canvas.state().pointer_inside());
    }

    #[test]
    fn test_pan_shifts_pixel_lookup() {
        let project = ProjectState::new(Resolution::new(10, 10), 1);
        let settings = CanvasSettings::default();
        let mut canvas = canvas(&settings);
        canvas.resize(Vec2::new(300.0, 300.0), &project, &settings);
        canvas.pan(Vec2::new(30.0, 0.0), &project, &settings);
        assert_eq!(
            canvas.pointer_motion(Vec2::new(120.0, 90.0), &project, &settings),
            Some(PixelPosition::new(3, 3))
        );

        canvas.reset_transform(&project, &settings);
        assert_eq!(canvas.transform_scale(), 1.0);
        assert_eq!(canvas.state().offset(), Vec2::ZERO);
    }

    #[test]
    fn test_sync_reacts_to_new_layers() {
        let mut project = ProjectState::new(Resolution::new(8, 8), 1);
        let settings = CanvasSettings::default();
        let mut canvas = canvas(&settings);
        canvas.realize(&project, &settings);
        canvas.resize(Vec2::new(80.0, 80.0), &project, &settings);
        assert_eq!(canvas.layers_layer().shape_count(), 1);

        project.add_layer("second");
        canvas.sync(&project, &settings);
        assert_eq!(canvas.layers_layer().shape_count(), 2);
    }
}
