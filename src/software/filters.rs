//! Full-screen passes: translucency resolve and post effects.

use glam::{UVec2, Vec3, Vec4};

use crate::picking::unpack_depth;

const FXAA_EDGE_THRESHOLD: f32 = 0.125;
const BLOOM_THRESHOLD: f32 = 0.8;

#[inline]
fn to_vec(texel: [u8; 4]) -> Vec4 {
    Vec4::new(
        f32::from(texel[0]),
        f32::from(texel[1]),
        f32::from(texel[2]),
        f32::from(texel[3]),
    ) / 255.0
}

#[inline]
fn to_bytes(color: Vec4) -> [u8; 4] {
    let c = (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8, c.w as u8]
}

#[inline]
fn luma(color: Vec4) -> f32 {
    color.truncate().dot(Vec3::new(0.299, 0.587, 0.114))
}

/// Texel at `(x + dx, y + dy)`, clamped to the edges.
fn sample(source: &[[u8; 4]], size: UVec2, x: u32, y: u32, dx: i32, dy: i32) -> Vec4 {
    let sx = x.saturating_add_signed(dx).min(size.x - 1);
    let sy = y.saturating_add_signed(dy).min(size.y - 1);
    to_vec(source[(sy * size.x + sx) as usize])
}

fn map_pixels(size: UVec2, mut f: impl FnMut(u32, u32) -> [u8; 4]) -> Vec<[u8; 4]> {
    let mut output = Vec::with_capacity((size.x * size.y) as usize);
    for y in 0..size.y {
        for x in 0..size.x {
            output.push(f(x, y));
        }
    }
    output
}

/// Weighted-average composite of accumulated translucency over `opaque`.
pub(crate) fn resolve_translucency(opaque: &[[u8; 4]], accumulation: &[Vec4], revealage: &[f32]) -> Vec<[u8; 4]> {
    opaque
        .iter()
        .zip(accumulation)
        .zip(revealage)
        .map(|((&opaque, accum), &reveal)| {
            let alpha = 1.0 - reveal;
            let average = accum.truncate() / accum.w.max(1e-5);
            let opaque = to_vec(opaque);
            let rgb = average * alpha + opaque.truncate() * (1.0 - alpha);
            to_bytes(rgb.extend(opaque.w.max(alpha)))
        })
        .collect()
}

/// Luma edge detection followed by a cross blur on edge pixels.
pub(crate) fn fxaa(source: &[[u8; 4]], size: UVec2) -> Vec<[u8; 4]> {
    map_pixels(size, |x, y| {
        let center = sample(source, size, x, y, 0, 0);
        let neighbors = [
            sample(source, size, x, y, -1, 0),
            sample(source, size, x, y, 1, 0),
            sample(source, size, x, y, 0, -1),
            sample(source, size, x, y, 0, 1),
        ];
        let lumas = neighbors.map(luma);
        let center_luma = luma(center);
        let max = lumas.iter().copied().fold(center_luma, f32::max);
        let min = lumas.iter().copied().fold(center_luma, f32::min);
        if max - min < FXAA_EDGE_THRESHOLD {
            return to_bytes(center);
        }
        let sum: Vec4 = neighbors.iter().copied().sum();
        to_bytes((center * 4.0 + sum) / 8.0)
    })
}

/// Adds a blurred bright pass of `source` back onto it.
pub(crate) fn bloom(source: &[[u8; 4]], size: UVec2) -> Vec<[u8; 4]> {
    let bright: Vec<Vec4> = source
        .iter()
        .map(|&texel| {
            let color = to_vec(texel);
            if luma(color) > BLOOM_THRESHOLD {
                color
            } else {
                Vec4::ZERO
            }
        })
        .collect();

    map_pixels(size, |x, y| {
        let mut glow = Vec4::ZERO;
        for dy in -1..=1 {
            for dx in -1..=1 {
                let sx = x.saturating_add_signed(dx).min(size.x - 1);
                let sy = y.saturating_add_signed(dy).min(size.y - 1);
                glow += bright[(sy * size.x + sx) as usize];
            }
        }
        let color = sample(source, size, x, y, 0, 0);
        to_bytes(color + (glow / 9.0).truncate().extend(0.0))
    })
}

/// Grayscale view of a packed depth target. Cleared texels show white.
pub(crate) fn depth_visualization(source: &[[u8; 4]]) -> Vec<[u8; 4]> {
    source
        .iter()
        .map(|&texel| {
            let depth = unpack_depth(texel);
            let value = if depth > 0.0 { depth as f32 } else { 1.0 };
            to_bytes(Vec4::new(value, value, value, 1.0))
        })
        .collect()
}
