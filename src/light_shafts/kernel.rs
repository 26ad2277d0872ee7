//! CPU reference for the light-shaft shaders
//!
//! `light_shafts.wgsl` and `depth_copy.wgsl` evaluate the same formulas per
//! fragment. The functions here operate on `Rgba32FImage` buffers so the
//! maths can be checked without a GPU.

use glam::{Vec2, Vec3, Vec4};
use image::{Rgba, Rgba32FImage};

/// Taps along each blur ray
pub const SAMPLE_COUNT: u32 = 100;

/// Distance scale of tap `index`: 1 for the first tap, `1 - blur_width` for
/// the last.
#[must_use]
#[inline]
pub fn sample_scale(index: u32, blur_width: f32) -> f32 {
    1.0 - blur_width * (index as f32 / (SAMPLE_COUNT - 1) as f32)
}

/// Radial (zoom) blur toward a screen-space center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialBlur {
    /// Blur center in texture coordinates
    pub center: Vec2,
    /// How far toward the center the last tap reaches (0..1)
    pub blur_width: f32,
    /// Output multiplier (0..1)
    pub intensity: f32,
}

impl RadialBlur {
    /// Shade one fragment at `uv`, fetching the mask through `sample`.
    ///
    /// Alpha carries the averaged red channel.
    pub fn shade(&self, uv: Vec2, mut sample: impl FnMut(Vec2) -> Vec4) -> Vec4 {
        let ray = uv - self.center;
        let mut color = Vec3::ZERO;
        for index in 0..SAMPLE_COUNT {
            let scale = sample_scale(index, self.blur_width);
            color += sample(ray * scale + self.center).truncate();
        }
        color /= SAMPLE_COUNT as f32;

        color.extend(color.x) * self.intensity
    }

    /// Blur a whole mask, one output texel per mask texel
    #[must_use]
    pub fn apply(&self, mask: &Rgba32FImage) -> Rgba32FImage {
        let (width, height) = mask.dimensions();
        Rgba32FImage::from_fn(width, height, |x, y| {
            let uv = texel_center(x, y, width, height);
            Rgba(self.shade(uv, |p| sample_bilinear(mask, p)).to_array())
        })
    }
}

/// Texture coordinate of the center of texel (`x`, `y`)
#[must_use]
#[inline]
pub fn texel_center(x: u32, y: u32, width: u32, height: u32) -> Vec2 {
    Vec2::new(
        (x as f32 + 0.5) / width as f32,
        (y as f32 + 0.5) / height as f32,
    )
}

/// Bilinear fetch with clamp-to-edge addressing
#[must_use]
pub fn sample_bilinear(image: &Rgba32FImage, uv: Vec2) -> Vec4 {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Vec4::ZERO;
    }

    let x = uv.x * width as f32 - 0.5;
    let y = uv.y * height as f32 - 0.5;
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);

    let fetch = |xi: f32, yi: f32| {
        let xi = (xi.max(0.0) as u32).min(width - 1);
        let yi = (yi.max(0.0) as u32).min(height - 1);
        Vec4::from_array(image.get_pixel(xi, yi).0)
    };

    let top = fetch(x0, y0).lerp(fetch(x0 + 1.0, y0), fx);
    let bottom = fetch(x0, y0 + 1.0).lerp(fetch(x0 + 1.0, y0 + 1.0), fx);
    top.lerp(bottom, fy)
}

/// Add `src` onto `dst` (`Blend One One`).
///
/// A `src` of a different size is resampled bilinearly, like a blit.
pub fn composite_additive(dst: &mut Rgba32FImage, src: &Rgba32FImage) {
    let (width, height) = dst.dimensions();
    let same_size = src.dimensions() == (width, height);

    for (x, y, pixel) in dst.enumerate_pixels_mut() {
        let add = if same_size {
            Vec4::from_array(src.get_pixel(x, y).0)
        } else {
            sample_bilinear(src, texel_center(x, y, width, height))
        };
        pixel.0 = (Vec4::from_array(pixel.0) + add).to_array();
    }
}

/// Linear 0..1 depth from a `[0, 1]` perspective depth value.
///
/// `0` maps to `near / far` and `1` maps to `1`.
#[must_use]
#[inline]
pub fn linearize_depth(depth: f32, near: f32, far: f32) -> f32 {
    near / (far - depth * (far - near))
}

/// Rec. 709 luminance
#[must_use]
#[inline]
pub fn luminance(color: Vec4) -> f32 {
    color.truncate().dot(Vec3::new(0.2126, 0.7152, 0.0722))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with_dot(size: u32, x: u32, y: u32) -> Rgba32FImage {
        let mut mask = Rgba32FImage::new(size, size);
        mask.put_pixel(x, y, Rgba([1.0, 0.8, 0.6, 1.0]));
        mask
    }

    fn gradient(size: u32) -> Rgba32FImage {
        Rgba32FImage::from_fn(size, size, |x, y| {
            Rgba([x as f32 / size as f32, y as f32 / size as f32, 0.25, 1.0])
        })
    }

    fn close(a: Vec4, b: Vec4) -> bool {
        (a - b).abs().max_element() < 1e-4
    }

    #[test]
    fn test_scale_endpoints() {
        assert_eq!(sample_scale(0, 0.85), 1.0);
        assert!((sample_scale(SAMPLE_COUNT - 1, 0.85) - 0.15).abs() < 1e-6);
        assert_eq!(sample_scale(SAMPLE_COUNT - 1, 1.0), 0.0);
        for i in 0..SAMPLE_COUNT {
            assert_eq!(sample_scale(i, 0.0), 1.0);
        }
    }

    #[test]
    fn test_zero_width_returns_source() {
        let source = gradient(16);
        let blur = RadialBlur {
            center: Vec2::new(0.3, 0.7),
            blur_width: 0.0,
            intensity: 1.0,
        };
        let out = blur.apply(&source);

        for (x, y, pixel) in out.enumerate_pixels() {
            let src = Vec4::from_array(source.get_pixel(x, y).0);
            let expected = src.truncate().extend(src.x);
            assert!(close(Vec4::from_array(pixel.0), expected), "({x}, {y})");
        }
    }

    #[test]
    fn test_full_width_last_tap_hits_center() {
        let blur = RadialBlur {
            center: Vec2::new(0.25, 0.75),
            blur_width: 1.0,
            intensity: 1.0,
        };
        let mut taps = Vec::new();
        blur.shade(Vec2::new(0.9, 0.1), |p| {
            taps.push(p);
            Vec4::ZERO
        });

        assert_eq!(taps.len(), SAMPLE_COUNT as usize);
        assert!((taps[0] - Vec2::new(0.9, 0.1)).length() < 1e-6);
        assert!((taps[SAMPLE_COUNT as usize - 1] - blur.center).length() < 1e-6);
    }

    #[test]
    fn test_alpha_equals_red() {
        let mask = mask_with_dot(32, 20, 9);
        for (intensity, width) in [(1.0, 0.85), (0.4, 0.3), (0.7, 1.0)] {
            let blur = RadialBlur {
                center: Vec2::new(0.6, 0.3),
                blur_width: width,
                intensity,
            };
            for pixel in blur.apply(&mask).pixels() {
                assert_eq!(pixel.0[3], pixel.0[0]);
            }
        }
    }

    #[test]
    fn test_intensity_scales_linearly() {
        let mask = gradient(16);
        let full = RadialBlur {
            center: Vec2::new(0.5, 0.5),
            blur_width: 0.85,
            intensity: 1.0,
        };
        let half = RadialBlur {
            intensity: 0.5,
            ..full
        };
        let off = RadialBlur {
            intensity: 0.0,
            ..full
        };

        let (a, b, c) = (full.apply(&mask), half.apply(&mask), off.apply(&mask));
        for ((pa, pb), pc) in a.pixels().zip(b.pixels()).zip(c.pixels()) {
            let (va, vb) = (Vec4::from_array(pa.0), Vec4::from_array(pb.0));
            assert!(close(va * 0.5, vb));
            assert_eq!(pc.0, [0.0; 4]);
        }
    }

    #[test]
    fn test_shafts_stream_away_from_center() {
        // A single bright texel smears outward, away from the light center
        let mask = mask_with_dot(64, 40, 32);
        let blur = RadialBlur {
            center: Vec2::new(0.25, 0.5),
            blur_width: 0.85,
            intensity: 1.0,
        };
        let out = blur.apply(&mask);

        let outward = out.get_pixel(52, 32).0[0];
        let inward = out.get_pixel(20, 32).0[0];
        assert!(outward > 0.0);
        assert_eq!(inward, 0.0);
    }

    #[test]
    fn test_additive_composite_never_darkens() {
        let mut frame = gradient(16);
        let before = frame.clone();
        let blur = RadialBlur {
            center: Vec2::new(0.5, 0.2),
            blur_width: 0.85,
            intensity: 1.0,
        }
        .apply(&mask_with_dot(8, 3, 3));

        composite_additive(&mut frame, &blur);

        for (after, before) in frame.pixels().zip(before.pixels()) {
            let (a, b) = (Vec4::from_array(after.0), Vec4::from_array(before.0));
            assert!(luminance(a) >= luminance(b));
            assert!(a.cmpge(b).all());
        }
    }

    #[test]
    fn test_zero_blur_composite_is_identity() {
        let mut frame = gradient(8);
        let before = frame.clone();
        composite_additive(&mut frame, &Rgba32FImage::new(8, 8));
        assert_eq!(frame, before);
    }

    #[test]
    fn test_bilinear_clamps_to_edge() {
        let image = gradient(4);
        let corner = Vec4::from_array(image.get_pixel(0, 0).0);
        assert!(close(sample_bilinear(&image, Vec2::new(-1.0, -1.0)), corner));
        assert!(close(sample_bilinear(&image, Vec2::new(0.125, 0.125)), corner));

        let mid = sample_bilinear(&image, Vec2::new(0.25, 0.125));
        let expected = (corner + Vec4::from_array(image.get_pixel(1, 0).0)) * 0.5;
        assert!(close(mid, expected));
    }

    #[test]
    fn test_linearize_depth_range() {
        let (near, far) = (0.1, 100.0);
        assert!((linearize_depth(0.0, near, far) - near / far).abs() < 1e-7);
        assert!((linearize_depth(1.0, near, far) - 1.0).abs() < 1e-4);
        assert!(linearize_depth(0.5, near, far) < linearize_depth(0.9, near, far));
    }
}
