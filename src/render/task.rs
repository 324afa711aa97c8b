use super::shader::{ShaderId, ShaderLibrary};
use super::shape::{PrimitiveKind, Vertex};
use super::surface::{ShapeId, ShapePool};
use crate::transform::Transform;
use egui::{Color32, TextureId, Vec2};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;

/// A value shared between its owner and every render task reading it.
///
/// Single-threaded: the canvas and its render tasks live on the UI thread.
pub type Shared<T> = Rc<Cell<T>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(Cell::new(value))
}

/// How a draw combines with what is already in the render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    Add,
    /// destination - source
    Subtract,
    /// source - destination
    ReverseSubtract,
    Multiply,
    Min,
    Max,
}

impl BlendMode {
    pub const ALL: [BlendMode; 7] = [
        BlendMode::Normal,
        BlendMode::Add,
        BlendMode::Subtract,
        BlendMode::ReverseSubtract,
        BlendMode::Multiply,
        BlendMode::Min,
        BlendMode::Max,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Add => "Add",
            BlendMode::Subtract => "Subtract",
            BlendMode::ReverseSubtract => "Reverse Subtract",
            BlendMode::Multiply => "Multiply",
            BlendMode::Min => "Minimum",
            BlendMode::Max => "Maximum",
        }
    }
}

/// A live uniform source, read every time the task is resolved
#[derive(Debug, Clone)]
pub enum Uniform {
    Float(Shared<f32>),
    Int(Shared<i32>),
    Vec2(Shared<Vec2>),
    Color(Shared<Color32>),
    Transform(Shared<Transform>),
}

impl Uniform {
    fn value(&self) -> UniformValue {
        match self {
            Uniform::Float(value) => UniformValue::Float(value.get()),
            Uniform::Int(value) => UniformValue::Int(value.get()),
            Uniform::Vec2(value) => {
                let v = value.get();
                UniformValue::Vec2([v.x, v.y])
            }
            Uniform::Color(value) => UniformValue::Vec4(value.get().to_array().map(|c| c as f32 / 255.0)),
            Uniform::Transform(value) => UniformValue::Mat4(value.get().as_column_major()),
        }
    }
}

/// A uniform value captured at resolve time
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
    Mat4([f32; 16]),
}

/// Everything the GL backend needs to issue one draw call. Owned and `Send`,
/// so it can cross into the paint callback.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub kind: PrimitiveKind,
    pub vertices: Vec<Vertex>,
    pub texture: Option<TextureId>,
    pub shader: ShaderId,
    pub transform: [f32; 16],
    pub blend_mode: BlendMode,
    pub uniforms: Vec<(String, UniformValue)>,
}

/// Binds a shape to a shader, an optional shared transform and a blend mode
#[derive(Debug, Clone)]
pub struct RenderTask {
    shape: ShapeId,
    shader: Option<ShaderId>,
    transform: Option<Shared<Transform>>,
    blend_mode: BlendMode,
    uniforms: Vec<(String, Uniform)>,
}

impl RenderTask {
    /// `shader: None` uses the default program, `transform: None` the identity
    pub fn new(
        shape: ShapeId,
        shader: Option<ShaderId>,
        transform: Option<Shared<Transform>>,
        blend_mode: BlendMode,
    ) -> Self {
        Self {
            shape,
            shader,
            transform,
            blend_mode,
            uniforms: Vec::new(),
        }
    }

    pub fn shape(&self) -> ShapeId {
        self.shape
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn set_blend_mode(&mut self, blend_mode: BlendMode) {
        self.blend_mode = blend_mode;
    }

    pub fn shader(&self) -> ShaderId {
        self.shader.unwrap_or(ShaderLibrary::DEFAULT)
    }

    pub fn register_float(&mut self, name: &str, value: Shared<f32>) {
        self.register(name, Uniform::Float(value));
    }

    pub fn register_int(&mut self, name: &str, value: Shared<i32>) {
        self.register(name, Uniform::Int(value));
    }

    pub fn register_vec2(&mut self, name: &str, value: Shared<Vec2>) {
        self.register(name, Uniform::Vec2(value));
    }

    pub fn register_color(&mut self, name: &str, value: Shared<Color32>) {
        self.register(name, Uniform::Color(value));
    }

    pub fn register_transform(&mut self, name: &str, value: Shared<Transform>) {
        self.register(name, Uniform::Transform(value));
    }

    fn register(&mut self, name: &str, uniform: Uniform) {
        match self.uniforms.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, slot)) => *slot = uniform,
            None => self.uniforms.push((name.to_string(), uniform)),
        }
    }

    /// Captures the current shape geometry and uniform values.
    ///
    /// Returns `None` if the shape is gone, hidden or has no vertices.
    pub fn resolve(&self, shapes: &ShapePool) -> Option<DrawCommand> {
        let shape = shapes.get(self.shape)?;
        if !shape.is_visible() || shape.vertex_count() == 0 {
            return None;
        }

        let transform = self
            .transform
            .as_ref()
            .map(|shared| shared.get())
            .unwrap_or(Transform::IDENTITY);

        Some(DrawCommand {
            kind: shape.kind(),
            vertices: shape.vertices().to_vec(),
            texture: shape.texture(),
            shader: self.shader(),
            transform: transform.as_column_major(),
            blend_mode: self.blend_mode,
            uniforms: self
                .uniforms
                .iter()
                .map(|(name, uniform)| (name.clone(), uniform.value()))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::shape::Shape;

    #[test]
    fn test_uniforms_are_read_at_resolve_time() {
        let mut shapes = ShapePool::default();
        let id = shapes.insert(Shape::point(Vec2::ZERO));

        let canvas_size = shared(Vec2::new(100.0, 100.0));
        let mut task = RenderTask::new(id, None, None, BlendMode::Normal);
        task.register_vec2("_canvas_size", canvas_size.clone());

        canvas_size.set(Vec2::new(640.0, 480.0));
        let command = task.resolve(&shapes).unwrap();
        assert_eq!(
            command.uniforms,
            vec![("_canvas_size".to_string(), UniformValue::Vec2([640.0, 480.0]))]
        );
    }

    #[test]
    fn test_shared_transform_is_live() {
        let mut shapes = ShapePool::default();
        let id = shapes.insert(Shape::point(Vec2::ZERO));

        let transform = shared(Transform::identity());
        let task = RenderTask::new(id, None, Some(transform.clone()), BlendMode::Multiply);

        let mut zoomed = Transform::identity();
        zoomed.scale(2.0, 2.0);
        transform.set(zoomed);

        let command = task.resolve(&shapes).unwrap();
        assert_eq!(command.transform, zoomed.as_column_major());
        assert_eq!(command.blend_mode, BlendMode::Multiply);
        assert_eq!(command.shader, ShaderLibrary::DEFAULT);
    }

    #[test]
    fn test_hidden_or_removed_shapes_resolve_to_nothing() {
        let mut shapes = ShapePool::default();
        let id = shapes.insert(Shape::point(Vec2::ZERO));
        let task = RenderTask::new(id, None, None, BlendMode::Normal);

        if let Some(shape) = shapes.get_mut(id) {
            shape.set_visible(false);
        }
        assert!(task.resolve(&shapes).is_none());

        shapes.clear();
        assert!(task.resolve(&shapes).is_none());
    }

    #[test]
    fn test_register_replaces_existing_name() {
        let mut shapes = ShapePool::default();
        let id = shapes.insert(Shape::point(Vec2::ZERO));
        let mut task = RenderTask::new(id, None, None, BlendMode::Normal);
        task.register_float("_tile_size", shared(4.0));
        task.register_float("_tile_size", shared(8.0));

        let command = task.resolve(&shapes).unwrap();
        assert_eq!(command.uniforms, vec![("_tile_size".to_string(), UniformValue::Float(8.0))]);
    }
}
