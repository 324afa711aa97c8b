use crate::algorithms;
use crate::brush::Brush;
use crate::geometry::PixelPosition;
use serde::{Deserialize, Serialize};

/// The tool pointer clicks are routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ToolKind {
    #[default]
    Brush,
    Line,
    Rectangle,
    Ellipse,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [ToolKind::Brush, ToolKind::Line, ToolKind::Rectangle, ToolKind::Ellipse];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Brush => "Brush",
            ToolKind::Line => "Line",
            ToolKind::Rectangle => "Rectangle",
            ToolKind::Ellipse => "Ellipse",
        }
    }

    pub fn shape_kind(self) -> Option<ShapeKind> {
        match self {
            ToolKind::Rectangle => Some(ShapeKind::Rectangle),
            ToolKind::Ellipse => Some(ShapeKind::Ellipse),
            ToolKind::Brush | ToolKind::Line => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
}

/// A drawing operation finished on the canvas, for the application to commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolEvent {
    Brush {
        center: PixelPosition,
    },
    Line {
        start: PixelPosition,
        end: PixelPosition,
    },
    /// `a` and `b` are opposite corners of the inclusive bounding box
    Shape {
        kind: ShapeKind,
        a: PixelPosition,
        b: PixelPosition,
    },
}

impl ToolEvent {
    /// Layer pixels the operation covers
    pub fn pixels(&self, brush: &Brush) -> Vec<PixelPosition> {
        match *self {
            ToolEvent::Brush { center } => brush.footprint(center),
            ToolEvent::Line { start, end } => algorithms::line(start, end),
            ToolEvent::Shape {
                kind: ShapeKind::Rectangle,
                a,
                b,
            } => algorithms::rectangle(a, b, false),
            ToolEvent::Shape {
                kind: ShapeKind::Ellipse,
                a,
                b,
            } => algorithms::ellipse(a, b, false),
        }
    }

    /// Like [`Self::pixels`], paired with an opacity. Only brush stamps are translucent.
    pub fn stamp(&self, brush: &Brush) -> Vec<(PixelPosition, f32)> {
        match *self {
            ToolEvent::Brush { center } => brush.stamp(center),
            _ => self.pixels(brush).into_iter().map(|pixel| (pixel, 1.0)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_event_pixels_include_endpoints() {
        let event = ToolEvent::Line {
            start: PixelPosition::new(0, 0),
            end: PixelPosition::new(3, 0),
        };
        let pixels = event.pixels(&Brush::default());
        assert_eq!(pixels.len(), 4);
        assert!(pixels.contains(&PixelPosition::new(3, 0)));
    }

    #[test]
    fn test_brush_event_uses_footprint() {
        let event = ToolEvent::Brush {
            center: PixelPosition::new(5, 5),
        };
        assert_eq!(event.pixels(&Brush::square(3)).len(), 9);
    }

    #[test]
    fn test_shape_stamp_is_opaque() {
        let event = ToolEvent::Shape {
            kind: ShapeKind::Rectangle,
            a: PixelPosition::new(0, 0),
            b: PixelPosition::new(2, 2),
        };
        let stamp = event.stamp(&Brush::default());
        assert_eq!(stamp.len(), 8);
        assert!(stamp.iter().all(|(_, opacity)| *opacity == 1.0));
    }
}
