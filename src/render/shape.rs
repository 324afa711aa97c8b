use crate::geometry::{from_gl_position, to_gl_position};
use bytemuck::{Pod, Zeroable};
use egui::{Color32, Rect, TextureId, Vec2};
use std::f32::consts::TAU;

/// Vertex layout uploaded to the GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    /// Premultiplied, gamma-space RGBA in [0, 1]
    pub color: [f32; 4],
    pub tex_coord: [f32; 2],
}

impl Vertex {
    fn new(position: Vec2, color: Color32, tex_coord: Vec2) -> Self {
        let position = to_gl_position(position);
        Self {
            position: [position.x, position.y],
            color: color_to_array(color),
            tex_coord: [tex_coord.x, tex_coord.y],
        }
    }

    pub fn position(&self) -> Vec2 {
        from_gl_position(Vec2::new(self.position[0], self.position[1]))
    }
}

fn color_to_array(color: Color32) -> [f32; 4] {
    color.to_array().map(|c| c as f32 / 255.0)
}

/// How the vertices of a shape are assembled into primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    Triangles,
    TriangleFan,
}

/// CPU-side geometry of one draw call: positions in canvas space, per-vertex
/// color and texture coordinates, and an optional bound texture.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    kind: PrimitiveKind,
    vertices: Vec<Vertex>,
    texture: Option<TextureId>,
    visible: bool,
}

impl Shape {
    fn from_points(kind: PrimitiveKind, points: &[Vec2]) -> Self {
        let vertices = points
            .iter()
            .map(|p| Vertex::new(*p, Color32::WHITE, Vec2::ZERO))
            .collect();
        Self {
            kind,
            vertices,
            texture: None,
            visible: true,
        }
    }

    /// Axis-aligned quad with texture coordinates spanning [0, 1]
    pub fn rectangle(top_left: Vec2, size: Vec2) -> Self {
        let mut shape = Self::from_points(PrimitiveKind::TriangleFan, &[Vec2::ZERO; 4]);
        shape.set_rectangle(top_left, size);
        for (vertex, uv) in shape.vertices.iter_mut().zip([
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ]) {
            vertex.tex_coord = [uv.x, uv.y];
        }
        shape
    }

    pub fn line(a: Vec2, b: Vec2) -> Self {
        Self::from_points(PrimitiveKind::Lines, &[a, b])
    }

    /// Independent line segments
    pub fn lines(segments: &[[Vec2; 2]]) -> Self {
        let points: Vec<Vec2> = segments.iter().flatten().copied().collect();
        Self::from_points(PrimitiveKind::Lines, &points)
    }

    /// Closed outline through `points`
    pub fn wireframe(points: &[Vec2]) -> Self {
        Self::from_points(PrimitiveKind::LineLoop, points)
    }

    /// Filled convex polygon
    pub fn polygon(points: &[Vec2]) -> Self {
        Self::from_points(PrimitiveKind::TriangleFan, points)
    }

    pub fn point(position: Vec2) -> Self {
        Self::from_points(PrimitiveKind::Points, &[position])
    }

    /// Closed outline of an ellipse approximated by `n_vertices` points
    pub fn ellipse_outline(center: Vec2, radius: Vec2, n_vertices: usize) -> Self {
        Self::wireframe(&ellipse_points(center, radius, n_vertices))
    }

    /// Moves the four corners of a quad created by [`Shape::rectangle`] or [`Shape::wireframe`]
    pub fn set_rectangle(&mut self, top_left: Vec2, size: Vec2) {
        let corners = rectangle_points(top_left, size);
        self.set_vertex_positions(&corners);
    }

    /// Replaces vertex positions in place. The vertex count must stay the same.
    pub fn set_vertex_positions(&mut self, positions: &[Vec2]) -> bool {
        if positions.len() != self.vertices.len() {
            log::warn!(
                "Shape::set_vertex_positions: expected {} positions, got {}",
                self.vertices.len(),
                positions.len()
            );
            return false;
        }
        for (vertex, position) in self.vertices.iter_mut().zip(positions) {
            let position = to_gl_position(*position);
            vertex.position = [position.x, position.y];
        }
        true
    }

    /// Replaces the whole geometry, keeping kind, color of the first vertex and texture
    pub fn set_points(&mut self, points: &[Vec2]) {
        let color = self.vertices.first().map(|v| v.color).unwrap_or([1.0; 4]);
        self.vertices = points
            .iter()
            .map(|p| Vertex {
                position: to_gl_position(*p).into(),
                color,
                tex_coord: [0.0, 0.0],
            })
            .collect();
    }

    pub fn set_color(&mut self, color: Color32) {
        let color = color_to_array(color);
        for vertex in &mut self.vertices {
            vertex.color = color;
        }
    }

    pub fn set_vertex_color(&mut self, index: usize, color: Color32) {
        if let Some(vertex) = self.vertices.get_mut(index) {
            vertex.color = color_to_array(color);
        }
    }

    pub fn color(&self) -> Option<[f32; 4]> {
        self.vertices.first().map(|v| v.color)
    }

    pub fn set_texture(&mut self, texture: Option<TextureId>) {
        self.texture = texture;
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertex_position(&self, index: usize) -> Option<Vec2> {
        self.vertices.get(index).map(Vertex::position)
    }

    /// Mean of all vertex positions
    pub fn centroid(&self) -> Vec2 {
        if self.vertices.is_empty() {
            return Vec2::ZERO;
        }
        let sum = self.vertices.iter().fold(Vec2::ZERO, |acc, v| acc + v.position());
        sum / self.vertices.len() as f32
    }

    /// Translates every vertex so the centroid lands on `centroid`
    pub fn set_centroid(&mut self, centroid: Vec2) {
        let delta = centroid - self.centroid();
        for vertex in &mut self.vertices {
            vertex.position[0] += delta.x;
            vertex.position[1] += delta.y;
        }
    }

    pub fn bounding_box(&self) -> Rect {
        let mut rect = Rect::NOTHING;
        for vertex in &self.vertices {
            rect.extend_with(vertex.position().to_pos2());
        }
        rect
    }
}

/// Corners of an axis-aligned rectangle, clockwise from the top-left
pub fn rectangle_points(top_left: Vec2, size: Vec2) -> [Vec2; 4] {
    [
        top_left,
        top_left + Vec2::new(size.x, 0.0),
        top_left + size,
        top_left + Vec2::new(0.0, size.y),
    ]
}

pub fn ellipse_points(center: Vec2, radius: Vec2, n_vertices: usize) -> Vec<Vec2> {
    let n_vertices = n_vertices.max(3);
    (0..n_vertices)
        .map(|i| {
            let angle = TAU * i as f32 / n_vertices as f32;
            center + Vec2::new(angle.cos() * radius.x, angle.sin() * radius.y)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_vertices_and_uv() {
        let shape = Shape::rectangle(Vec2::new(0.1, 0.2), Vec2::new(0.3, 0.4));
        assert_eq!(shape.kind(), PrimitiveKind::TriangleFan);
        assert_eq!(shape.vertex_position(0), Some(Vec2::new(0.1, 0.2)));
        assert_eq!(shape.vertex_position(2), Some(Vec2::new(0.1, 0.2) + Vec2::new(0.3, 0.4)));
        assert_eq!(shape.vertices()[2].tex_coord, [1.0, 1.0]);
        assert_eq!(shape.vertex_position(4), None);
    }

    #[test]
    fn test_set_centroid_moves_all_vertices() {
        let mut shape = Shape::rectangle(Vec2::ZERO, Vec2::new(2.0, 2.0));
        assert_eq!(shape.centroid(), Vec2::new(1.0, 1.0));

        shape.set_centroid(Vec2::new(5.0, 5.0));
        assert_eq!(shape.centroid(), Vec2::new(5.0, 5.0));
        assert_eq!(shape.vertex_position(0), Some(Vec2::new(4.0, 4.0)));
    }

    #[test]
    fn test_set_color_is_premultiplied() {
        let mut shape = Shape::line(Vec2::ZERO, Vec2::new(1.0, 1.0));
        shape.set_color(Color32::from_rgba_premultiplied(255, 0, 0, 255));
        assert_eq!(shape.color(), Some([1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_set_vertex_positions_rejects_count_change() {
        let mut shape = Shape::line(Vec2::ZERO, Vec2::new(1.0, 0.0));
        assert!(!shape.set_vertex_positions(&[Vec2::ZERO]));
        assert!(shape.set_vertex_positions(&[Vec2::new(2.0, 2.0), Vec2::new(3.0, 3.0)]));
        assert_eq!(shape.vertex_position(1), Some(Vec2::new(3.0, 3.0)));
    }

    #[test]
    fn test_ellipse_bounding_box() {
        let shape = Shape::ellipse_outline(Vec2::new(1.0, 1.0), Vec2::new(2.0, 1.0), 64);
        let bounds = shape.bounding_box();
        assert!((bounds.min.x + 1.0).abs() < 1e-4);
        assert!((bounds.max.x - 3.0).abs() < 1e-4);
        assert!((bounds.max.y - 2.0).abs() < 1e-4);
    }
}
