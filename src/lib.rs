#![warn(clippy::all, rust_2018_idioms)]

pub mod algorithms;
pub mod app;
pub mod brush;
pub mod canvas;
pub mod error;
pub mod geometry;
pub mod image;
pub mod input;
pub mod project;
pub mod render;
pub mod selection;
pub mod settings;
pub mod transform;

pub use app::MousetrapApp;
pub use brush::Brush;
pub use canvas::{Canvas, ToolEvent, ToolKind};
pub use error::{BrushError, ProjectError, RenderError, SettingsError};
pub use geometry::{PixelPosition, Resolution};
pub use input::{InputEvent, InputHandler, InputLocation};
pub use project::{Frame, Layer, ProjectState};
pub use selection::Selection;
pub use settings::CanvasSettings;
pub use transform::Transform;
