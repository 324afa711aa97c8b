use super::shape::Shape;
use super::task::{DrawCommand, RenderTask};
use crate::error::RenderError;
use egui::Vec2;

/// Handle into a [`ShapePool`]. Stale handles never alias a newer shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeId {
    index: usize,
    generation: u32,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    shape: Option<Shape>,
}

/// Arena owning every shape of one surface
#[derive(Debug, Clone, Default)]
pub struct ShapePool {
    slots: Vec<Slot>,
    free: Vec<usize>,
    len: usize,
}

impl ShapePool {
    pub fn insert(&mut self, shape: Shape) -> ShapeId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.generation += 1;
            slot.shape = Some(shape);
            return ShapeId {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            shape: Some(shape),
        });
        ShapeId {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.shape.as_ref())
    }

    pub fn get_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.shape.as_mut())
    }

    pub fn remove(&mut self, id: ShapeId) -> Option<Shape> {
        let slot = self
            .slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)?;
        let shape = slot.shape.take()?;
        self.free.push(id.index);
        self.len -= 1;
        Some(shape)
    }

    /// Frees every shape. Outstanding ids become stale.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.shape.take().is_some() {
                self.free.push(index);
            }
        }
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Draw commands of one surface, rendered into its own framebuffer
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceDraw {
    pub label: &'static str,
    pub commands: Vec<DrawCommand>,
}

/// Everything the canvas wants on screen this frame, bottom surface first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawList {
    pub surfaces: Vec<SurfaceDraw>,
}

impl DrawList {
    pub fn command_count(&self) -> usize {
        self.surfaces.iter().map(|s| s.commands.len()).sum()
    }
}

/// A drawable owned by one canvas layer: shapes, ordered render tasks and a
/// pending-redraw flag.
///
/// Shapes may only be created after `realize`; `unrealize` frees them all.
#[derive(Debug)]
pub struct RenderSurface {
    label: &'static str,
    realized: bool,
    size: Vec2,
    shapes: ShapePool,
    tasks: Vec<RenderTask>,
    render_requested: bool,
}

impl RenderSurface {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            realized: false,
            size: Vec2::ZERO,
            shapes: ShapePool::default(),
            tasks: Vec::new(),
            render_requested: false,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn realize(&mut self) {
        if self.realized {
            log::debug!("Surface `{}` realized twice", self.label);
        }
        self.realized = true;
        self.render_requested = true;
    }

    /// Frees all shapes and tasks. Calling it again is a no-op.
    pub fn unrealize(&mut self) {
        if !self.realized {
            return;
        }
        self.tasks.clear();
        self.shapes.clear();
        self.realized = false;
        self.render_requested = false;
        log::debug!("Surface `{}` unrealized", self.label);
    }

    pub fn is_realized(&self) -> bool {
        self.realized
    }

    pub fn resize(&mut self, size: Vec2) {
        if self.size != size {
            self.size = size;
            self.queue_render();
        }
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Fails if the surface has no GPU context yet
    pub fn make_current(&self) -> Result<(), RenderError> {
        if self.realized {
            Ok(())
        } else {
            Err(RenderError::NotRealized(self.label))
        }
    }

    pub fn add_shape(&mut self, shape: Shape) -> Result<ShapeId, RenderError> {
        self.make_current()?;
        Ok(self.shapes.insert(shape))
    }

    pub fn remove_shape(&mut self, id: ShapeId) -> Option<Shape> {
        self.tasks.retain(|task| task.shape() != id);
        self.shapes.remove(id)
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(id)
    }

    pub fn shape_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.get_mut(id)
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn add_render_task(&mut self, task: RenderTask) {
        if self.make_current().is_err() {
            log::warn!("Ignoring render task on unrealized surface `{}`", self.label);
            return;
        }
        self.tasks.push(task);
    }

    pub fn clear_render_tasks(&mut self) {
        self.tasks.clear();
    }

    pub fn render_tasks(&self) -> &[RenderTask] {
        &self.tasks
    }

    pub fn render_tasks_mut(&mut self) -> &mut [RenderTask] {
        &mut self.tasks
    }

    /// Marks the surface dirty. Repeated calls before the next frame coalesce.
    pub fn queue_render(&mut self) {
        if self.realized {
            self.render_requested = true;
        }
    }

    pub fn render_requested(&self) -> bool {
        self.render_requested
    }

    pub fn take_render_request(&mut self) -> bool {
        std::mem::take(&mut self.render_requested)
    }

    /// Resolves every task in order
    pub fn collect(&self) -> SurfaceDraw {
        let commands = if self.realized {
            self.tasks
                .iter()
                .filter_map(|task| task.resolve(&self.shapes))
                .collect()
        } else {
            Vec::new()
        };
        SurfaceDraw {
            label: self.label,
            commands,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::BlendMode;

    #[test]
    fn test_pool_ids_do_not_alias_after_reuse() {
        let mut pool = ShapePool::default();
        let a = pool.insert(Shape::point(Vec2::ZERO));
        assert!(pool.remove(a).is_some());

        let b = pool.insert(Shape::point(Vec2::new(1.0, 1.0)));
        assert!(pool.get(a).is_none());
        assert!(pool.get(b).is_some());
        assert_eq!(pool.len(), 1);
        assert!(pool.remove(a).is_none());
    }

    #[test]
    fn test_unrealized_surface_rejects_shapes() {
        let mut surface = RenderSurface::new("test");
        assert!(matches!(
            surface.add_shape(Shape::point(Vec2::ZERO)),
            Err(RenderError::NotRealized("test"))
        ));

        surface.realize();
        assert!(surface.add_shape(Shape::point(Vec2::ZERO)).is_ok());
    }

    #[test]
    fn test_unrealize_frees_everything_once() {
        let mut surface = RenderSurface::new("test");
        surface.realize();
        let id = surface.add_shape(Shape::point(Vec2::ZERO)).unwrap();
        surface.add_render_task(RenderTask::new(id, None, None, BlendMode::Normal));

        surface.unrealize();
        assert_eq!(surface.shape_count(), 0);
        assert!(surface.render_tasks().is_empty());
        surface.unrealize();
        assert!(!surface.is_realized());
    }

    #[test]
    fn test_queue_render_coalesces() {
        let mut surface = RenderSurface::new("test");
        surface.realize();
        surface.take_render_request();

        surface.queue_render();
        surface.queue_render();
        assert!(surface.take_render_request());
        assert!(!surface.take_render_request());
    }

    #[test]
    fn test_collect_keeps_task_order() {
        let mut surface = RenderSurface::new("test");
        surface.realize();
        let a = surface.add_shape(Shape::point(Vec2::ZERO)).unwrap();
        let b = surface.add_shape(Shape::line(Vec2::ZERO, Vec2::splat(1.0))).unwrap();
        surface.add_render_task(RenderTask::new(b, None, None, BlendMode::Add));
        surface.add_render_task(RenderTask::new(a, None, None, BlendMode::Normal));

        let draw = surface.collect();
        assert_eq!(draw.label, "test");
        assert_eq!(draw.commands.len(), 2);
        assert_eq!(draw.commands[0].blend_mode, BlendMode::Add);
        assert_eq!(draw.commands[1].blend_mode, BlendMode::Normal);
    }
}
