//! Triangle setup and scan conversion.
//!
//! Triangles are clipped in homogeneous clip space against the near
//! (`z >= 0`) and far (`z <= w`) planes, projected to window space with a
//! top-left origin and sampled at pixel centers. Shared edges are covered
//! exactly once (top-left rule), so blended meshes do not double-blend
//! along their diagonals.

use glam::{DMat4, DVec2, DVec3, DVec4, UVec2};
use smallvec::SmallVec;

use crate::renderer::context::Rectangle;

type Polygon = SmallVec<[DVec4; 8]>;

/// Calls `emit(x, y, depth)` for every pixel center inside the triangle
/// `positions` transformed by `mvp`, restricted to `bounds`.
pub(crate) fn rasterize_triangle(
    positions: [DVec3; 3],
    mvp: DMat4,
    size: UVec2,
    bounds: Rectangle,
    mut emit: impl FnMut(u32, u32, f32),
) {
    let clip: Polygon = positions.iter().map(|p| mvp * p.extend(1.0)).collect();
    let clip = clip_polygon(&clip, |v| v.w - 1e-12);
    let clip = clip_polygon(&clip, |v| v.z);
    let clip = clip_polygon(&clip, |v| v.w - v.z);
    if clip.len() < 3 {
        return;
    }

    let width = f64::from(size.x);
    let height = f64::from(size.y);
    let window: SmallVec<[DVec3; 8]> = clip
        .iter()
        .map(|v| {
            let ndc = v.truncate() / v.w;
            DVec3::new(
                (ndc.x * 0.5 + 0.5) * width,
                (0.5 - ndc.y * 0.5) * height,
                ndc.z,
            )
        })
        .collect();

    for i in 1..window.len() - 1 {
        scan_triangle([window[0], window[i], window[i + 1]], bounds, &mut emit);
    }
}

fn clip_polygon(input: &[DVec4], distance: impl Fn(DVec4) -> f64) -> Polygon {
    let mut output = Polygon::new();
    for (i, &a) in input.iter().enumerate() {
        let b = input[(i + 1) % input.len()];
        let (da, db) = (distance(a), distance(b));
        if da >= 0.0 {
            output.push(a);
        }
        if (da >= 0.0) != (db >= 0.0) {
            let t = da / (da - db);
            output.push(a + (b - a) * t);
        }
    }
    output
}

#[inline]
fn edge(a: DVec3, b: DVec3, p: DVec2) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Top-left rule for edges of a positively wound triangle.
#[inline]
fn owns_edge(from: DVec3, to: DVec3) -> bool {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    dy < 0.0 || (dy == 0.0 && dx > 0.0)
}

#[allow(clippy::float_cmp)]
fn scan_triangle(triangle: [DVec3; 3], bounds: Rectangle, emit: &mut impl FnMut(u32, u32, f32)) {
    let [a, mut b, mut c] = triangle;
    let mut area = edge(a, b, c.truncate());
    if area.abs() < 1e-12 {
        return;
    }
    if area < 0.0 {
        std::mem::swap(&mut b, &mut c);
        area = -area;
    }

    let min_x = a.x.min(b.x).min(c.x).floor().max(f64::from(bounds.x));
    let min_y = a.y.min(b.y).min(c.y).floor().max(f64::from(bounds.y));
    let max_x = a.x.max(b.x).max(c.x).ceil().min(f64::from(bounds.x + bounds.width));
    let max_y = a.y.max(b.y).max(c.y).ceil().min(f64::from(bounds.y + bounds.height));
    if min_x >= max_x || min_y >= max_y {
        return;
    }

    let owned = [owns_edge(b, c), owns_edge(c, a), owns_edge(a, b)];
    let covers = |w: f64, owned: bool| w > 0.0 || (w == 0.0 && owned);

    for y in (min_y as u32)..(max_y as u32) {
        for x in (min_x as u32)..(max_x as u32) {
            let p = DVec2::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            let w0 = edge(b, c, p);
            let w1 = edge(c, a, p);
            let w2 = edge(a, b, p);
            if !(covers(w0, owned[0]) && covers(w1, owned[1]) && covers(w2, owned[2])) {
                continue;
            }
            let depth = (w0 * a.z + w1 * b.z + w2 * c.z) / area;
            emit(x, y, depth as f32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covered(positions: [DVec3; 3]) -> Vec<(u32, u32)> {
        let mut pixels = Vec::new();
        rasterize_triangle(
            positions,
            DMat4::IDENTITY,
            UVec2::new(4, 4),
            Rectangle::new(0, 0, 4, 4),
            |x, y, _| pixels.push((x, y)),
        );
        pixels
    }

    #[test]
    fn quad_halves_cover_each_pixel_once() {
        let (a, b, c, d) = (
            DVec3::new(-1.0, -1.0, 0.5),
            DVec3::new(1.0, -1.0, 0.5),
            DVec3::new(1.0, 1.0, 0.5),
            DVec3::new(-1.0, 1.0, 0.5),
        );
        let mut pixels = covered([a, b, c]);
        pixels.extend(covered([a, c, d]));
        pixels.sort_unstable();
        let expected: Vec<_> = (0..4).flat_map(|x| (0..4).map(move |y| (x, y))).collect();
        assert_eq!(pixels, expected);
    }

    #[test]
    fn triangle_beyond_far_plane_is_clipped() {
        let z = 2.0;
        assert!(covered([DVec3::new(-1.0, -1.0, z), DVec3::new(1.0, -1.0, z), DVec3::new(0.0, 1.0, z)]).is_empty());
    }
}
