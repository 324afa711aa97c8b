use crate::error::SettingsError;
use egui::Color32;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Visual and interaction settings of the canvas.
///
/// Unknown fields are ignored and missing ones fall back to their defaults,
/// so settings written by older versions keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    pub grid_visible: bool,
    pub grid_color: Color32,
    pub cursor_color: Color32,
    /// Alpha of the fill drawn under the cursor outline, in [0, 1]
    pub cursor_fill_alpha: f32,
    pub selection_outline_color: Color32,
    pub line_tool_color: Color32,
    pub shape_tool_color: Color32,
    pub checkerboard_light: Color32,
    pub checkerboard_dark: Color32,
    /// Checkerboard tile side, in device pixels
    pub checkerboard_tile_size: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
    /// Factor applied per zoom step
    pub zoom_step: f32,
    /// Space between the shape tool bounds and its brackets, in layer pixels
    pub shape_tool_margin: f32,
    /// Half extent of the line tool crosshair markers, in device pixels
    pub marker_size: f32,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            grid_visible: true,
            grid_color: Color32::from_rgba_unmultiplied(0, 0, 0, 64),
            cursor_color: Color32::from_rgb(255, 255, 255),
            cursor_fill_alpha: 0.25,
            selection_outline_color: Color32::from_rgb(255, 255, 255),
            line_tool_color: Color32::from_rgb(240, 60, 60),
            shape_tool_color: Color32::from_rgb(60, 140, 240),
            checkerboard_light: Color32::from_gray(204),
            checkerboard_dark: Color32::from_gray(153),
            checkerboard_tile_size: 8.0,
            zoom_min: 0.25,
            zoom_max: 128.0,
            zoom_step: 1.25,
            shape_tool_margin: 0.5,
            marker_size: 6.0,
        }
    }
}

impl CanvasSettings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded canvas settings from {}", path.display());
        Ok(settings)
    }

    /// Clamps a zoom factor into the configured range
    pub fn clamp_zoom(&self, scale: f32) -> f32 {
        scale.clamp(self.zoom_min, self.zoom_max)
    }
}
