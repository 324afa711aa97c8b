use crate::geometry::{PixelPosition, Resolution};
use std::collections::BTreeMap;

/// Half-open column interval `[min, max)` of selected pixels in one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub min: i32,
    pub max: i32,
}

impl Span {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn len(&self) -> usize {
        (self.max - self.min).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.max <= self.min
    }

    pub fn contains(&self, x: i32) -> bool {
        x >= self.min && x < self.max
    }
}

/// Tight, inclusive bounding box of a non-empty selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionBounds {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

impl SelectionBounds {
    pub fn width(&self) -> u32 {
        (self.x_max - self.x_min + 1) as u32
    }

    pub fn height(&self) -> u32 {
        (self.y_max - self.y_min + 1) as u32
    }

    pub fn top_left(&self) -> PixelPosition {
        PixelPosition::new(self.x_min, self.y_min)
    }
}

/// Unit edges around a selection, in pixel-corner coordinates.
///
/// Edges are oriented clockwise: the top side of a pixel runs left to right,
/// its right side top to bottom, its bottom side right to left and its left
/// side bottom to top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutlineVertices {
    pub left_to_right: Vec<[PixelPosition; 2]>,
    pub right_to_left: Vec<[PixelPosition; 2]>,
    pub top_to_bottom: Vec<[PixelPosition; 2]>,
    pub bottom_to_top: Vec<[PixelPosition; 2]>,
}

impl OutlineVertices {
    pub fn len(&self) -> usize {
        self.left_to_right.len() + self.right_to_left.len() + self.top_to_bottom.len() + self.bottom_to_top.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &[PixelPosition; 2]> {
        self.left_to_right
            .iter()
            .chain(&self.top_to_bottom)
            .chain(&self.right_to_left)
            .chain(&self.bottom_to_top)
    }
}

/// A set of selected pixels stored as sorted, disjoint, non-adjacent spans per row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    data: BTreeMap<i32, Vec<Span>>,
    bounds: Option<SelectionBounds>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_from<I>(points: I) -> Self
    where
        I: IntoIterator<Item = PixelPosition>,
    {
        let mut rows: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
        for point in points {
            rows.entry(point.y).or_default().push(point.x);
        }

        let mut data = BTreeMap::new();
        for (y, mut xs) in rows {
            xs.sort_unstable();
            xs.dedup();

            let mut spans: Vec<Span> = Vec::new();
            for x in xs {
                match spans.last_mut() {
                    Some(last) if last.max == x => last.max += 1,
                    _ => spans.push(Span::new(x, x + 1)),
                }
            }
            data.insert(y, spans);
        }

        let mut out = Self { data, bounds: None };
        out.update_bounds();
        out
    }

    pub fn create_from_rectangle(top_left: PixelPosition, size: Resolution) -> Self {
        let mut data = BTreeMap::new();
        if !size.is_empty() {
            for y in top_left.y..top_left.y + size.y as i32 {
                data.insert(y, vec![Span::new(top_left.x, top_left.x + size.x as i32)]);
            }
        }

        let mut out = Self { data, bounds: None };
        out.update_bounds();
        out
    }

    /// Selects every pixel of a layer of the given resolution
    pub fn all(resolution: Resolution) -> Self {
        Self::create_from_rectangle(PixelPosition::new(0, 0), resolution)
    }

    pub fn at(&self, x: i32, y: i32) -> bool {
        let Some(spans) = self.data.get(&y) else {
            return false;
        };
        let index = spans.partition_point(|span| span.max <= x);
        spans.get(index).is_some_and(|span| span.contains(x))
    }

    pub fn contains(&self, position: PixelPosition) -> bool {
        self.at(position.x, position.y)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of selected pixels
    pub fn len(&self) -> usize {
        self.data.values().flatten().map(Span::len).sum()
    }

    pub fn bounds(&self) -> Option<SelectionBounds> {
        self.bounds
    }

    /// Spans of a row, sorted ascending
    pub fn spans(&self, y: i32) -> &[Span] {
        self.data.get(&y).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rows(&self) -> impl Iterator<Item = (i32, &[Span])> {
        self.data.iter().map(|(y, spans)| (*y, spans.as_slice()))
    }

    /// All selected pixels in row-major order
    pub fn iter(&self) -> impl Iterator<Item = PixelPosition> + '_ {
        self.data.iter().flat_map(|(y, spans)| {
            spans
                .iter()
                .flat_map(move |span| (span.min..span.max).map(move |x| PixelPosition::new(x, *y)))
        })
    }

    pub fn add_point(&mut self, position: PixelPosition) {
        self.insert_span(position.y, Span::new(position.x, position.x + 1));
        self.update_bounds();
    }

    pub fn remove_point(&mut self, position: PixelPosition) {
        self.remove_span(position.y, Span::new(position.x, position.x + 1));
        self.update_bounds();
    }

    pub fn union_with(&mut self, other: &Selection) {
        for (y, spans) in &other.data {
            for span in spans {
                self.insert_span(*y, *span);
            }
        }
        self.update_bounds();
    }

    pub fn subtract(&mut self, other: &Selection) {
        for (y, spans) in &other.data {
            for span in spans {
                self.remove_span(*y, *span);
            }
        }
        self.update_bounds();
    }

    pub fn intersect_with(&mut self, other: &Selection) {
        let mut data = BTreeMap::new();
        for (y, spans) in &self.data {
            let other_spans = other.spans(*y);
            let mut row = Vec::new();
            for a in spans {
                for b in other_spans {
                    let span = Span::new(a.min.max(b.min), a.max.min(b.max));
                    if !span.is_empty() {
                        row.push(span);
                    }
                }
            }
            if !row.is_empty() {
                data.insert(*y, row);
            }
        }
        self.data = data;
        self.update_bounds();
    }

    /// Replaces the selection with its complement inside `[0, resolution)`
    pub fn invert(&mut self, resolution: Resolution) {
        let mut inverted = Selection::all(resolution);
        inverted.subtract(self);
        *self = inverted;
    }

    /// Moves every selected pixel by (dx, dy)
    pub fn offset(&mut self, dx: i32, dy: i32) {
        self.data = std::mem::take(&mut self.data)
            .into_iter()
            .map(|(y, spans)| {
                let spans = spans
                    .into_iter()
                    .map(|span| Span::new(span.min + dx, span.max + dx))
                    .collect();
                (y + dy, spans)
            })
            .collect();
        self.update_bounds();
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.bounds = None;
    }

    /// Directed unit edges of every selected pixel side that borders an unselected pixel
    pub fn outline_vertices(&self) -> OutlineVertices {
        let mut out = OutlineVertices::default();

        for (&y, spans) in &self.data {
            for span in spans {
                // Spans are non-adjacent, so only the span ends have vertical boundary edges
                out.bottom_to_top.push([
                    PixelPosition::new(span.min, y + 1),
                    PixelPosition::new(span.min, y),
                ]);
                out.top_to_bottom.push([
                    PixelPosition::new(span.max, y),
                    PixelPosition::new(span.max, y + 1),
                ]);

                for x in span.min..span.max {
                    if !self.at(x, y - 1) {
                        out.left_to_right.push([PixelPosition::new(x, y), PixelPosition::new(x + 1, y)]);
                    }
                    if !self.at(x, y + 1) {
                        out.right_to_left.push([
                            PixelPosition::new(x + 1, y + 1),
                            PixelPosition::new(x, y + 1),
                        ]);
                    }
                }
            }
        }
        out
    }

    /// Inserts `span` into row `y`, merging overlapping and adjacent spans
    fn insert_span(&mut self, y: i32, span: Span) {
        if span.is_empty() {
            return;
        }

        let row = self.data.entry(y).or_default();
        let mut merged = span;
        let mut out = Vec::with_capacity(row.len() + 1);
        let mut inserted = false;

        for existing in row.drain(..) {
            if existing.max < merged.min {
                out.push(existing);
            } else if existing.min > merged.max {
                if !inserted {
                    out.push(merged);
                    inserted = true;
                }
                out.push(existing);
            } else {
                merged = Span::new(merged.min.min(existing.min), merged.max.max(existing.max));
            }
        }
        if !inserted {
            out.push(merged);
        }
        *row = out;
    }

    fn remove_span(&mut self, y: i32, span: Span) {
        let Some(row) = self.data.get_mut(&y) else {
            return;
        };

        let mut out = Vec::with_capacity(row.len() + 1);
        for existing in row.drain(..) {
            if existing.max <= span.min || existing.min >= span.max {
                out.push(existing);
                continue;
            }
            let left = Span::new(existing.min, span.min);
            let right = Span::new(span.max, existing.max);
            if !left.is_empty() {
                out.push(left);
            }
            if !right.is_empty() {
                out.push(right);
            }
        }

        if out.is_empty() {
            self.data.remove(&y);
        } else {
            *row = out;
        }
    }

    fn update_bounds(&mut self) {
        self.data.retain(|_, spans| !spans.is_empty());

        let (Some(y_min), Some(y_max)) = (self.data.keys().next(), self.data.keys().next_back()) else {
            self.bounds = None;
            return;
        };

        let mut x_min = i32::MAX;
        let mut x_max = i32::MIN;
        for spans in self.data.values() {
            if let (Some(first), Some(last)) = (spans.first(), spans.last()) {
                x_min = x_min.min(first.min);
                x_max = x_max.max(last.max - 1);
            }
        }

        self.bounds = Some(SelectionBounds {
            x_min,
            x_max,
            y_min: *y_min,
            y_max: *y_max,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> PixelPosition {
        PixelPosition::new(x, y)
    }

    #[test]
    fn test_create_from_merges_runs() {
        let selection = Selection::create_from([p(0, 0), p(1, 0), p(2, 0), p(5, 0), p(1, 0)]);
        assert_eq!(selection.spans(0), &[Span::new(0, 3), Span::new(5, 6)]);
        assert_eq!(selection.len(), 4);
    }

    #[test]
    fn test_add_point_joins_adjacent_spans() {
        let mut selection = Selection::create_from([p(0, 0), p(2, 0)]);
        selection.add_point(p(1, 0));
        assert_eq!(selection.spans(0), &[Span::new(0, 3)]);
    }

    #[test]
    fn test_remove_point_splits_span() {
        let mut selection = Selection::create_from_rectangle(p(0, 0), Resolution::new(5, 1));
        selection.remove_point(p(2, 0));
        assert_eq!(selection.spans(0), &[Span::new(0, 2), Span::new(3, 5)]);
        assert!(!selection.at(2, 0));
    }

    #[test]
    fn test_bounds_follow_mutation() {
        let mut selection = Selection::create_from([p(2, 3), p(4, 1)]);
        assert_eq!(
            selection.bounds(),
            Some(SelectionBounds { x_min: 2, x_max: 4, y_min: 1, y_max: 3 })
        );

        selection.remove_point(p(4, 1));
        assert_eq!(
            selection.bounds(),
            Some(SelectionBounds { x_min: 2, x_max: 2, y_min: 3, y_max: 3 })
        );

        selection.remove_point(p(2, 3));
        assert_eq!(selection.bounds(), None);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_invert_within_resolution() {
        let mut selection = Selection::create_from([p(1, 1)]);
        selection.invert(Resolution::new(3, 3));
        assert_eq!(selection.len(), 8);
        assert!(!selection.at(1, 1));
        assert!(selection.at(0, 0));
        assert!(selection.at(2, 2));
    }

    #[test]
    fn test_intersect_and_subtract() {
        let mut a = Selection::create_from_rectangle(p(0, 0), Resolution::new(4, 4));
        let b = Selection::create_from_rectangle(p(2, 2), Resolution::new(4, 4));

        let mut intersection = a.clone();
        intersection.intersect_with(&b);
        assert_eq!(intersection.len(), 4);
        assert_eq!(
            intersection.bounds(),
            Some(SelectionBounds { x_min: 2, x_max: 3, y_min: 2, y_max: 3 })
        );

        a.subtract(&b);
        assert_eq!(a.len(), 12);
        assert!(!a.at(3, 3));
    }

    #[test]
    fn test_offset_moves_pixels() {
        let mut selection = Selection::create_from([p(0, 0), p(1, 0)]);
        selection.offset(3, -2);
        assert!(selection.at(3, -2));
        assert!(selection.at(4, -2));
        assert!(!selection.at(0, 0));
    }

    #[test]
    fn test_outline_of_single_pixel() {
        let selection = Selection::create_from([p(2, 3)]);
        let outline = selection.outline_vertices();
        assert_eq!(outline.left_to_right, vec![[p(2, 3), p(3, 3)]]);
        assert_eq!(outline.top_to_bottom, vec![[p(3, 3), p(3, 4)]]);
        assert_eq!(outline.right_to_left, vec![[p(3, 4), p(2, 4)]]);
        assert_eq!(outline.bottom_to_top, vec![[p(2, 4), p(2, 3)]]);
    }

    #[test]
    fn test_outline_of_rectangle_has_perimeter_edges() {
        let selection = Selection::create_from_rectangle(p(0, 0), Resolution::new(4, 3));
        let outline = selection.outline_vertices();
        assert_eq!(outline.left_to_right.len(), 4);
        assert_eq!(outline.right_to_left.len(), 4);
        assert_eq!(outline.top_to_bottom.len(), 3);
        assert_eq!(outline.bottom_to_top.len(), 3);
        assert_eq!(outline.len(), 14);
    }

    #[test]
    fn test_outline_of_hole_includes_inner_edges() {
        let mut selection = Selection::create_from_rectangle(p(0, 0), Resolution::new(3, 3));
        selection.remove_point(p(1, 1));
        let outline = selection.outline_vertices();
        // 12 outer edges plus the 4 edges of the hole
        assert_eq!(outline.len(), 16);
        assert!(outline.right_to_left.contains(&[p(2, 1), p(1, 1)]));
    }
}
