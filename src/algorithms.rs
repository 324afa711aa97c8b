//! Rasterization and pixel-mask helpers. Everything here is a pure function.

use crate::geometry::PixelPosition;
use crate::image::Image;
use egui::Vec2;
use std::collections::BTreeSet;

/// Pixels of the line from `start` to `end`, both endpoints included.
pub fn line(start: PixelPosition, end: PixelPosition) -> Vec<PixelPosition> {
    let dx = (end.x - start.x).abs();
    let dy = -(end.y - start.y).abs();
    let step_x = if start.x < end.x { 1 } else { -1 };
    let step_y = if start.y < end.y { 1 } else { -1 };

    let mut out = Vec::with_capacity(dx.max(-dy) as usize + 1);
    let mut current = start;
    let mut error = dx + dy;

    loop {
        out.push(current);
        if current == end {
            break;
        }

        let doubled = 2 * error;
        if doubled >= dy {
            error += dy;
            current.x += step_x;
        }
        if doubled <= dx {
            error += dx;
            current.y += step_y;
        }
    }
    out
}

/// Pixels of the axis-aligned rectangle spanned by two inclusive corners
pub fn rectangle(a: PixelPosition, b: PixelPosition, filled: bool) -> Vec<PixelPosition> {
    let (min_x, max_x) = (a.x.min(b.x), a.x.max(b.x));
    let (min_y, max_y) = (a.y.min(b.y), a.y.max(b.y));

    let mut out = Vec::new();
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let on_border = x == min_x || x == max_x || y == min_y || y == max_y;
            if filled || on_border {
                out.push(PixelPosition::new(x, y));
            }
        }
    }
    out
}

/// Pixels of the ellipse inscribed in the inclusive bounding box `a`..`b`.
///
/// A pixel belongs to the ellipse if its center lies inside the ellipse
/// equation; the outline is the set of inside pixels with at least one
/// 4-neighbour outside.
pub fn ellipse(a: PixelPosition, b: PixelPosition, filled: bool) -> Vec<PixelPosition> {
    let (min_x, max_x) = (a.x.min(b.x), a.x.max(b.x));
    let (min_y, max_y) = (a.y.min(b.y), a.y.max(b.y));

    let center_x = (min_x + max_x + 1) as f32 / 2.0;
    let center_y = (min_y + max_y + 1) as f32 / 2.0;
    let radius_x = (max_x - min_x + 1) as f32 / 2.0;
    let radius_y = (max_y - min_y + 1) as f32 / 2.0;

    let inside = |x: i32, y: i32| -> bool {
        if x < min_x || x > max_x || y < min_y || y > max_y {
            return false;
        }
        let nx = (x as f32 + 0.5 - center_x) / radius_x;
        let ny = (y as f32 + 0.5 - center_y) / radius_y;
        nx * nx + ny * ny <= 1.0
    };

    let mut out = Vec::new();
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            if !inside(x, y) {
                continue;
            }
            let on_border = !inside(x - 1, y) || !inside(x + 1, y) || !inside(x, y - 1) || !inside(x, y + 1);
            if filled || on_border {
                out.push(PixelPosition::new(x, y));
            }
        }
    }
    out
}

/// Outline of a circle of `radius` pixels around `center`
pub fn circle(center: PixelPosition, radius: i32, filled: bool) -> Vec<PixelPosition> {
    let radius = radius.max(0);
    ellipse(
        center.offset(-radius, -radius),
        center.offset(radius, radius),
        filled,
    )
}

/// Vertices needed to draw a 1px outline around the ink of `image`.
///
/// A pixel is ink if its alpha exceeds `epsilon`. For every ink pixel, each
/// of its four corners is emitted if one of the two edges meeting at that
/// corner borders a non-ink neighbour or the image boundary. Vertices are in
/// pixel-corner coordinates, deduplicated, in row-major order; callers that
/// need a traversable polygon sort them with [`sort_by_angle`].
pub fn brush_outline_vertices(image: &Image, epsilon: f32) -> Vec<PixelPosition> {
    let is_ink = |x: i32, y: i32| image.alpha_at(x, y) > epsilon;

    let mut vertices = BTreeSet::new();
    for y in 0..image.height() as i32 {
        for x in 0..image.width() as i32 {
            if !is_ink(x, y) {
                continue;
            }

            let top = !is_ink(x, y - 1);
            let right = !is_ink(x + 1, y);
            let bottom = !is_ink(x, y + 1);
            let left = !is_ink(x - 1, y);

            if top || left {
                vertices.insert((y, x));
            }
            if top || right {
                vertices.insert((y, x + 1));
            }
            if bottom || right {
                vertices.insert((y + 1, x + 1));
            }
            if bottom || left {
                vertices.insert((y + 1, x));
            }
        }
    }

    vertices
        .into_iter()
        .map(|(y, x)| PixelPosition::new(x, y))
        .collect()
}

/// Sorts points by ascending angle around their centroid (clockwise on a y-down canvas)
pub fn sort_by_angle(points: &mut [Vec2]) {
    if points.is_empty() {
        return;
    }

    let centroid = points.iter().fold(Vec2::ZERO, |acc, p| acc + *p) / points.len() as f32;
    points.sort_by(|a, b| {
        let angle_a = (a.y - centroid.y).atan2(a.x - centroid.x);
        let angle_b = (b.y - centroid.y).atan2(b.x - centroid.x);
        angle_a.total_cmp(&angle_b)
    });
}

pub fn rotate_clockwise(image: &Image) -> Image {
    Image::from_rgba_image(image::imageops::rotate90(image.as_rgba_image()))
}

pub fn rotate_counterclockwise(image: &Image) -> Image {
    Image::from_rgba_image(image::imageops::rotate270(image.as_rgba_image()))
}

pub fn flip_horizontally(image: &Image) -> Image {
    Image::from_rgba_image(image::imageops::flip_horizontal(image.as_rgba_image()))
}

pub fn flip_vertically(image: &Image) -> Image {
    Image::from_rgba_image(image::imageops::flip_vertical(image.as_rgba_image()))
}
