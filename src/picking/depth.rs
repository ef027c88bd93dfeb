//! Packed depth and screen-to-world reconstruction.

use glam::{DMat4, DVec2, DVec3, DVec4, UVec2};

/// Per-byte weights of a packed depth texel.
pub const PACKED_DEPTH_SCALE: [f64; 4] = [1.0, 1.0 / 255.0, 1.0 / 65025.0, 1.0 / 16_581_375.0];

fn fract(x: f64) -> f64 {
    x - x.floor()
}

/// Packs a normalized depth into four bytes.
///
/// `1.0` (a cleared texel) packs to all zeros.
#[must_use]
pub fn pack_depth(depth: f64) -> [u8; 4] {
    let d = depth.clamp(0.0, 1.0);
    let mut enc = [
        fract(d),
        fract(d * 255.0),
        fract(d * 65025.0),
        fract(d * 16_581_375.0),
    ];
    enc[0] -= enc[1] / 255.0;
    enc[1] -= enc[2] / 255.0;
    enc[2] -= enc[3] / 255.0;
    enc.map(|e| (e * 255.0).round().clamp(0.0, 255.0) as u8)
}

#[must_use]
pub fn unpack_depth(bytes: [u8; 4]) -> f64 {
    bytes
        .iter()
        .zip(PACKED_DEPTH_SCALE)
        .map(|(b, w)| f64::from(*b) / 255.0 * w)
        .sum()
}

/// Reconstructs the world position seen at drawing-buffer pixel `pixel`
/// with normalized depth `depth`, using the pixel center.
#[must_use]
pub fn unproject(
    pixel: DVec2,
    depth: f64,
    buffer_size: UVec2,
    projection: DMat4,
    view: DMat4,
) -> DVec3 {
    let width = f64::from(buffer_size.x.max(1));
    let height = f64::from(buffer_size.y.max(1));
    let ndc = DVec4::new(
        (pixel.x.floor() + 0.5) / width * 2.0 - 1.0,
        1.0 - (pixel.y.floor() + 0.5) / height * 2.0,
        depth,
        1.0,
    );
    let eye = projection.inverse() * ndc;
    let eye = eye.truncate() / eye.w;
    view.inverse().transform_point3(eye)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleared_depth_packs_to_zero() {
        assert_eq!(pack_depth(1.0), [0, 0, 0, 0]);
        assert_eq!(unpack_depth([0, 0, 0, 0]), 0.0);
    }

    #[test]
    fn half_depth_survives_packing() {
        let d = unpack_depth(pack_depth(0.5));
        assert!((d - 0.5).abs() < 1.0 / 16_581_375.0);
    }
}
