use egui::Vec2;
use mousetrap::{Brush, PixelPosition, Resolution, Selection, Transform};
use std::collections::BTreeSet;

fn scattered_points() -> Vec<PixelPosition> {
    // Deterministic pseudo-random scatter with clusters and gaps
    let mut points = Vec::new();
    let mut state: u32 = 7;
    for _ in 0..200 {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let x = ((state >> 8) % 24) as i32 - 4;
        let y = ((state >> 20) % 12) as i32 - 2;
        points.push(PixelPosition::new(x, y));
    }
    points
}

fn assert_spans_sorted_and_disjoint(selection: &Selection) {
    for (row, spans) in selection.rows() {
        for span in spans {
            assert!(span.min < span.max, "empty span in row {}", row);
        }
        for pair in spans.windows(2) {
            assert!(pair[0].max < pair[1].min, "row {} spans overlap or touch", row);
        }
    }
}

fn assert_tight_bounds(selection: &Selection) {
    let Some(bounds) = selection.bounds() else {
        assert!(selection.is_empty());
        return;
    };
    assert!(bounds.x_min <= bounds.x_max && bounds.y_min <= bounds.y_max);
    let points: Vec<_> = selection.iter().collect();
    assert_eq!(points.iter().map(|p| p.x).min(), Some(bounds.x_min));
    assert_eq!(points.iter().map(|p| p.x).max(), Some(bounds.x_max));
    assert_eq!(points.iter().map(|p| p.y).min(), Some(bounds.y_min));
    assert_eq!(points.iter().map(|p| p.y).max(), Some(bounds.y_max));
}

#[test]
fn membership_matches_source_points() {
    let points = scattered_points();
    let set: BTreeSet<_> = points.iter().copied().collect();
    let selection = Selection::create_from(points);

    assert_eq!(selection.len(), set.len());
    for y in -4..12 {
        for x in -6..22 {
            assert_eq!(selection.at(x, y), set.contains(&PixelPosition::new(x, y)), "at ({}, {})", x, y);
        }
    }
    assert_spans_sorted_and_disjoint(&selection);
    assert_tight_bounds(&selection);
}

#[test]
fn invariants_hold_after_every_mutation() {
    let mut selection = Selection::create_from(scattered_points());
    let other = Selection::create_from_rectangle(PixelPosition::new(3, 1), Resolution::new(7, 5));

    selection.union_with(&other);
    assert_spans_sorted_and_disjoint(&selection);
    assert_tight_bounds(&selection);

    selection.subtract(&Selection::create_from_rectangle(PixelPosition::new(5, 0), Resolution::new(2, 10)));
    assert_spans_sorted_and_disjoint(&selection);
    assert_tight_bounds(&selection);

    selection.intersect_with(&Selection::all(Resolution::new(16, 8)));
    assert_spans_sorted_and_disjoint(&selection);
    assert_tight_bounds(&selection);

    selection.invert(Resolution::new(16, 8));
    assert_spans_sorted_and_disjoint(&selection);
    assert_tight_bounds(&selection);

    selection.offset(-3, 4);
    selection.add_point(PixelPosition::new(30, 30));
    selection.remove_point(PixelPosition::new(30, 30));
    assert_spans_sorted_and_disjoint(&selection);
    assert_tight_bounds(&selection);

    selection.clear();
    assert!(selection.bounds().is_none());
}

#[test]
fn outline_extraction_is_repeatable() {
    let selection = Selection::create_from(scattered_points());
    assert_eq!(selection.outline_vertices(), selection.outline_vertices());
}

#[test]
fn square_brush_outline_is_its_perimeter() {
    for n in 1..=6u32 {
        let brush = Brush::square(n);
        let vertices: BTreeSet<_> = brush.outline_vertices().iter().copied().collect();
        assert_eq!(vertices.len(), 4 * n as usize, "{}x{} brush", n, n);

        let side = n as i32;
        for vertex in &vertices {
            let on_edge = vertex.x == 0 || vertex.y == 0 || vertex.x == side || vertex.y == side;
            assert!(on_edge, "interior vertex {:?} in {}x{} brush", vertex, n, n);
        }
    }
}

#[test]
fn transform_composition_is_associative() {
    let mut a = Transform::identity();
    a.translate(Vec2::new(0.3, -0.2));
    a.scale(2.0, 0.5);
    let mut b = Transform::identity();
    b.rotate(0.7, Vec2::new(0.5, 0.5));
    b.translate(Vec2::new(-0.1, 0.4));

    let combined = a.combine_with(&b);
    for point in [Vec2::ZERO, Vec2::new(1.0, 1.0), Vec2::new(0.25, -3.0), Vec2::new(12.0, 0.5)] {
        let expected = a.apply_to(b.apply_to(point));
        assert!((combined.apply_to(point) - expected).length() < 1e-4, "at {:?}", point);
    }
}
