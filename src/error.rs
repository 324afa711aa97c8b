use thiserror::Error;

/// Errors raised by the render surfaces and the GL backend
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Render surface `{0}` is not realized")]
    NotRealized(&'static str),
    #[error("Texture size mismatch: expected {expected:?}, got {actual:?}")]
    SizeMismatch {
        expected: [usize; 2],
        actual: [usize; 2],
    },
    #[error("Shader `{name}` failed to compile: {log}")]
    ShaderCompilation { name: String, log: String },
    #[error("Shader program `{name}` failed to link: {log}")]
    ShaderLink { name: String, log: String },
    #[error("GLSL version does not support the `in`/`out` shader interface")]
    UnsupportedShaderVersion,
    #[error("OpenGL error: {0}")]
    Gl(String),
}

/// Errors that can occur while constructing or parsing a brush
#[derive(Error, Debug, PartialEq)]
pub enum BrushError {
    #[error("Brush image must be square, got {width}x{height}")]
    NotSquare { width: u32, height: u32 },
    #[error("Brush image is empty")]
    Empty,
    #[error("Failed to parse brush value `{0}`")]
    Parse(String),
    #[error("Brush value count {0} is not a perfect square")]
    NotPerfectSquare(usize),
}

/// Errors returned by project state mutations
#[derive(Error, Debug, PartialEq)]
pub enum ProjectError {
    #[error("Layer index {index} out of range (layer count {count})")]
    LayerOutOfRange { index: usize, count: usize },
    #[error("Frame index {index} out of range (frame count {count})")]
    FrameOutOfRange { index: usize, count: usize },
    #[error("Cannot delete the last layer")]
    LastLayer,
    #[error("Cannot delete the last frame")]
    LastFrame,
    #[error("Invalid layer resolution {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },
    #[error("Layer {0} is locked")]
    LayerLocked(usize),
}

/// Errors that can occur while loading canvas settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to parse settings: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
}
