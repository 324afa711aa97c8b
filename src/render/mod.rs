//! Render primitives shared by every canvas layer.
//!
//! Layers build [`Shape`]s and [`RenderTask`]s on the UI thread. Each frame
//! the canvas resolves them into a [`DrawList`] that the [`GlRenderer`]
//! replays inside an egui paint callback.

pub mod gl;
pub mod shader;
pub mod shape;
pub mod surface;
pub mod task;
pub mod texture;

pub use gl::GlRenderer;
pub use shader::{ShaderId, ShaderLibrary};
pub use shape::{PrimitiveKind, Shape, Vertex};
pub use surface::{DrawList, RenderSurface, ShapeId, ShapePool, SurfaceDraw};
pub use task::{shared, BlendMode, DrawCommand, RenderTask, Shared, UniformValue};
pub use texture::{RenderContext, Texture};
