use crate::geometry::{align_with_pixel_grid, PixelPosition, Resolution};
use crate::project::ProjectState;
use crate::render::{shared, Shared};
use crate::settings::CanvasSettings;
use crate::transform::Transform;
use egui::Vec2;

/// Center of the viewport in normalized canvas space
pub const CANVAS_CENTER: Vec2 = Vec2::new(0.5, 0.5);

/// Fraction of a layer pixel absorbed when flooring, so positions exactly on
/// a pixel boundary land in the pixel to the right/below despite rounding error
const PIXEL_EPSILON: f32 = 1e-3;

/// View state owned by the canvas and read by every layer
#[derive(Debug)]
pub struct CanvasState {
    transform: Shared<Transform>,
    /// Viewport size in device pixels
    canvas_size: Shared<Vec2>,
    /// Device pixels per layer pixel
    transform_scale: f32,
    /// Pan, in device pixels
    offset: Vec2,
    current_pixel_position: PixelPosition,
    /// Last pointer position inside the viewport, in device pixels
    pointer_position: Option<Vec2>,
    pointer_inside: bool,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            transform: shared(Transform::identity()),
            canvas_size: shared(Vec2::ZERO),
            transform_scale: 1.0,
            offset: Vec2::ZERO,
            current_pixel_position: PixelPosition::default(),
            pointer_position: None,
            pointer_inside: false,
        }
    }
}

impl CanvasState {
    pub fn transform(&self) -> Transform {
        self.transform.get()
    }

    /// The live transform handed to render tasks
    pub fn shared_transform(&self) -> Shared<Transform> {
        self.transform.clone()
    }

    pub fn canvas_size(&self) -> Vec2 {
        self.canvas_size.get()
    }

    pub fn shared_canvas_size(&self) -> Shared<Vec2> {
        self.canvas_size.clone()
    }

    pub fn transform_scale(&self) -> f32 {
        self.transform_scale
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn current_pixel_position(&self) -> PixelPosition {
        self.current_pixel_position
    }

    pub fn pointer_inside(&self) -> bool {
        self.pointer_inside
    }

    pub fn pointer_position(&self) -> Option<Vec2> {
        self.pointer_position
    }

    pub(crate) fn set_canvas_size(&mut self, size: Vec2) {
        self.canvas_size.set(size);
        self.update_transform();
    }

    pub(crate) fn set_view(&mut self, scale: f32, offset: Vec2) {
        self.transform_scale = scale;
        self.offset = offset;
        self.update_transform();
    }

    pub(crate) fn set_current_pixel_position(&mut self, position: PixelPosition) {
        self.current_pixel_position = position;
    }

    pub(crate) fn set_pointer_position(&mut self, position: Option<Vec2>) {
        self.pointer_position = position;
    }

    pub(crate) fn set_pointer_inside(&mut self, inside: bool) {
        self.pointer_inside = inside;
    }

    /// Zoom about the viewport center, then pan
    fn update_transform(&mut self) {
        let canvas_size = self.canvas_size.get();
        let offset = if canvas_size.x > 0.0 && canvas_size.y > 0.0 {
            self.offset / canvas_size
        } else {
            Vec2::ZERO
        };

        let mut transform = Transform::identity();
        transform.translate(CANVAS_CENTER + offset);
        transform.scale(self.transform_scale, self.transform_scale);
        transform.translate(-CANVAS_CENTER);
        self.transform.set(transform);
    }
}

/// Read-only view of everything a canvas layer lays itself out from
#[derive(Clone, Copy)]
pub struct CanvasContext<'a> {
    pub state: &'a CanvasState,
    pub project: &'a ProjectState,
    pub settings: &'a CanvasSettings,
}

impl<'a> CanvasContext<'a> {
    pub fn new(state: &'a CanvasState, project: &'a ProjectState, settings: &'a CanvasSettings) -> Self {
        Self {
            state,
            project,
            settings,
        }
    }

    pub fn canvas_size(&self) -> Vec2 {
        self.state.canvas_size()
    }

    pub fn has_area(&self) -> bool {
        let size = self.canvas_size();
        size.x > 0.0 && size.y > 0.0
    }

    pub fn transform(&self) -> Transform {
        self.state.transform()
    }

    pub fn layer_resolution(&self) -> Resolution {
        self.project.layer_resolution()
    }

    pub fn current_pixel_position(&self) -> PixelPosition {
        self.state.current_pixel_position()
    }

    /// Layer rectangle before pan and zoom, centered in the viewport: `(top_left, size)`
    pub fn layer_rect(&self) -> (Vec2, Vec2) {
        if !self.has_area() {
            return (CANVAS_CENTER, Vec2::ZERO);
        }
        let size = self.layer_resolution().to_vec2() / self.canvas_size();
        (CANVAS_CENTER - size / 2.0, size)
    }

    /// Layer rectangle after pan and zoom: `(top_left, size)`
    pub fn transformed_layer_rect(&self) -> (Vec2, Vec2) {
        let (top_left, size) = self.layer_rect();
        let transform = self.transform();
        let top_left_t = transform.apply_to(top_left);
        let bottom_right_t = transform.apply_to(top_left + size);
        (top_left_t, bottom_right_t - top_left_t)
    }

    /// Size of one layer pixel after pan and zoom, normalized
    pub fn pixel_size(&self) -> Vec2 {
        let (_, size) = self.transformed_layer_rect();
        size / self.layer_resolution().to_vec2()
    }

    /// Normalized, transformed position of the top-left corner of `pixel`.
    /// Also valid for pixel-corner coordinates up to the resolution.
    pub fn pixel_top_left(&self, pixel: PixelPosition) -> Vec2 {
        let (top_left, _) = self.transformed_layer_rect();
        top_left + pixel.to_vec2() * self.pixel_size()
    }

    pub fn pixel_center(&self, pixel: PixelPosition) -> Vec2 {
        self.pixel_top_left(pixel) + self.pixel_size() / 2.0
    }

    /// The layer pixel under a viewport position given in device pixels
    pub fn pixel_at(&self, viewport_position: Vec2) -> Option<PixelPosition> {
        if !self.has_area() || self.layer_resolution().is_empty() {
            return None;
        }
        let position = viewport_position / self.canvas_size();
        let (top_left, _) = self.transformed_layer_rect();
        let pixel = ((position - top_left) / self.pixel_size() + Vec2::splat(PIXEL_EPSILON)).floor();
        Some(PixelPosition::new(pixel.x as i32, pixel.y as i32))
    }

    /// Snaps a normalized position to the nearest device pixel
    pub fn align(&self, position: Vec2) -> Vec2 {
        align_with_pixel_grid(position, self.canvas_size())
    }

    /// Converts a length in device pixels to normalized units on both axes
    pub fn device_to_normalized(&self, length: f32) -> Vec2 {
        if !self.has_area() {
            return Vec2::ZERO;
        }
        Vec2::splat(length) / self.canvas_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(canvas_size: Vec2, scale: f32, offset: Vec2) -> CanvasState {
        let mut state = CanvasState::default();
        state.set_canvas_size(canvas_size);
        state.set_view(scale, offset);
        state
    }

    #[test]
    fn test_unit_scale_centers_layer() {
        let project = ProjectState::new(Resolution::new(10, 10), 1);
        let settings = CanvasSettings::default();
        let state = state(Vec2::new(100.0, 100.0), 1.0, Vec2::ZERO);
        let ctx = CanvasContext::new(&state, &project, &settings);

        let (top_left, size) = ctx.transformed_layer_rect();
        assert!((top_left - Vec2::new(0.45, 0.45)).length() < 1e-6);
        assert!((size - Vec2::new(0.1, 0.1)).length() < 1e-6);
    }

    #[test]
    fn test_pixel_lookup_floors() {
        let project = ProjectState::new(Resolution::new(10, 10), 1);
        let settings = CanvasSettings::default();
        let state = state(Vec2::new(300.0, 300.0), 30.0, Vec2::ZERO);
        let ctx = CanvasContext::new(&state, &project, &settings);

        assert_eq!(ctx.pixel_at(Vec2::new(90.0, 90.0)), Some(PixelPosition::new(3, 3)));
        assert_eq!(ctx.pixel_at(Vec2::new(99.5, 99.5)), Some(PixelPosition::new(3, 3)));
        assert_eq!(ctx.pixel_at(Vec2::new(100.0, 89.0)), Some(PixelPosition::new(3, 2)));
        assert_eq!(ctx.pixel_at(Vec2::new(119.9, 90.0)), Some(PixelPosition::new(3, 3)));
        assert_eq!(ctx.pixel_at(Vec2::new(120.0, 120.0)), Some(PixelPosition::new(4, 4)));
        assert_eq!(ctx.pixel_at(Vec2::new(-1.0, 0.0)), Some(PixelPosition::new(-1, 0)));
    }

    #[test]
    fn test_pan_moves_pixels_by_device_offset() {
        let project = ProjectState::new(Resolution::new(10, 10), 1);
        let settings = CanvasSettings::default();
        let state = state(Vec2::new(300.0, 300.0), 30.0, Vec2::new(30.0, 0.0));
        let ctx = CanvasContext::new(&state, &project, &settings);

        assert_eq!(ctx.pixel_at(Vec2::new(120.0, 90.0)), Some(PixelPosition::new(3, 3)));
    }

    #[test]
    fn test_zero_viewport_has_no_pixel() {
        let project = ProjectState::default();
        let settings = CanvasSettings::default();
        let state = CanvasState::default();
        let ctx = CanvasContext::new(&state, &project, &settings);
        assert_eq!(ctx.pixel_at(Vec2::new(1.0, 1.0)), None);
    }
}
