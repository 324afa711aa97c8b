use super::context::CanvasContext;
use crate::project::Revisions;
use crate::render::RenderSurface;

/// Which parts of the project moved since the canvas last looked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectChanges {
    pub layers: bool,
    pub resolution: bool,
    pub frame: bool,
    pub selection: bool,
    pub brush: bool,
    pub image: bool,
}

impl ProjectChanges {
    pub fn between(old: Revisions, new: Revisions) -> Self {
        Self {
            layers: old.layers != new.layers,
            resolution: old.resolution != new.resolution,
            frame: old.frame != new.frame,
            selection: old.selection != new.selection,
            brush: old.brush != new.brush,
            image: old.image != new.image,
        }
    }

    pub fn any(&self) -> bool {
        self.layers || self.resolution || self.frame || self.selection || self.brush || self.image
    }
}

/// One stacked drawable of the canvas.
///
/// A layer allocates shapes only once its surface is realized and must
/// return early from [`CanvasLayer::reformat`] while it is not.
pub trait CanvasLayer {
    fn name(&self) -> &'static str;

    fn surface(&self) -> &RenderSurface;

    fn surface_mut(&mut self) -> &mut RenderSurface;

    /// Recomputes every shape from the current context
    fn reformat(&mut self, ctx: &CanvasContext<'_>);

    /// Creates the layer's shapes and render tasks
    fn on_realize(&mut self, ctx: &CanvasContext<'_>) {
        self.surface_mut().realize();
        self.reformat(ctx);
    }

    /// Frees all shapes. Layers holding shape ids must forget them here.
    fn on_unrealize(&mut self) {
        self.surface_mut().unrealize();
    }

    fn on_resize(&mut self, ctx: &CanvasContext<'_>) {
        self.surface_mut().resize(ctx.canvas_size());
        self.reformat(ctx);
    }

    /// Pan or zoom changed
    fn on_transform_changed(&mut self, ctx: &CanvasContext<'_>) {
        self.reformat(ctx);
    }

    fn on_project_changed(&mut self, ctx: &CanvasContext<'_>, changes: &ProjectChanges) {
        if changes.resolution {
            self.reformat(ctx);
        }
    }

    /// `current_pixel_position` moved or the pointer entered/left the canvas
    fn on_cursor_moved(&mut self, _ctx: &CanvasContext<'_>) {}

    fn is_realized(&self) -> bool {
        self.surface().is_realized()
    }
}
