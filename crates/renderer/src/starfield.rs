//! Procedural star-field texture for the tunnel walls.
//!
//! The texture is generated once at mount from a seed: a dark blue vertical
//! gradient, a handful of soft nebula blobs, and a dense scatter of stars
//! with a few bright outliers. Mirrored-repeat sampling hides the edges, so
//! the generator only has to look plausible within one tile.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const BYTES_PER_PIXEL: usize = 4;

/// Generates an RGBA8 star-field tile of the given dimensions.
pub(crate) fn star_field_rgba(width: u32, height: u32, seed: u64) -> Vec<u8> {
    debug_assert!(width > 0 && height > 0);
    let mut rng = StdRng::seed_from_u64(seed);
    let (w, h) = (width as usize, height as usize);
    let mut pixels = vec![0u8; w * h * BYTES_PER_PIXEL];

    // Background: near-black at the top shading into deep navy.
    for y in 0..h {
        let depth = y as f32 / h as f32;
        let r = 4.0 + depth * 6.0;
        let g = 5.0 + depth * 9.0;
        let b = 14.0 + depth * 24.0;
        for x in 0..w {
            let offset = (y * w + x) * BYTES_PER_PIXEL;
            pixels[offset] = r as u8;
            pixels[offset + 1] = g as u8;
            pixels[offset + 2] = b as u8;
            pixels[offset + 3] = 255;
        }
    }

    // Nebula blobs: wide soft-edged tints in purple and teal.
    let blob_count = 24;
    for _ in 0..blob_count {
        let cx = rng.gen_range(0.0..w as f32);
        let cy = rng.gen_range(0.0..h as f32);
        let radius = rng.gen_range(0.06..0.18) * w as f32;
        let tint: [f32; 3] = if rng.gen_bool(0.5) {
            [36.0, 16.0, 58.0]
        } else {
            [10.0, 34.0, 52.0]
        };
        let min_x = (cx - radius).max(0.0) as usize;
        let max_x = ((cx + radius) as usize).min(w - 1);
        let min_y = (cy - radius).max(0.0) as usize;
        let max_y = ((cy + radius) as usize).min(h - 1);
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                let falloff = 1.0 - ((dx * dx + dy * dy).sqrt() / radius).min(1.0);
                let strength = falloff * falloff;
                let offset = (y * w + x) * BYTES_PER_PIXEL;
                for channel in 0..3 {
                    let value = pixels[offset + channel] as f32 + tint[channel] * strength;
                    pixels[offset + channel] = value.min(255.0) as u8;
                }
            }
        }
    }

    // Stars: mostly dim single pixels, occasionally bright with a cross
    // bloom one pixel wide.
    let star_count = (w * h) / 220;
    for _ in 0..star_count {
        let x = rng.gen_range(0..w);
        let y = rng.gen_range(0..h);
        let bright = rng.gen_bool(0.08);
        let intensity: f32 = if bright {
            rng.gen_range(200.0..255.0)
        } else {
            rng.gen_range(40.0..150.0)
        };
        let warmth = rng.gen_range(0.85..1.0);
        put_star(&mut pixels, w, h, x, y, intensity, warmth);
        if bright {
            let bloom = intensity * 0.4;
            if x > 0 {
                put_star(&mut pixels, w, h, x - 1, y, bloom, warmth);
            }
            if x + 1 < w {
                put_star(&mut pixels, w, h, x + 1, y, bloom, warmth);
            }
            if y > 0 {
                put_star(&mut pixels, w, h, x, y - 1, bloom, warmth);
            }
            if y + 1 < h {
                put_star(&mut pixels, w, h, x, y + 1, bloom, warmth);
            }
        }
    }

    pixels
}

fn put_star(pixels: &mut [u8], w: usize, _h: usize, x: usize, y: usize, intensity: f32, warmth: f32) {
    let offset = (y * w + x) * BYTES_PER_PIXEL;
    let channels = [intensity * warmth, intensity * warmth, intensity];
    for (index, value) in channels.iter().enumerate() {
        let sum = pixels[offset + index] as f32 + value;
        pixels[offset + index] = sum.min(255.0) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_has_expected_size_and_opacity() {
        let tile = star_field_rgba(64, 32, 1);
        assert_eq!(tile.len(), 64 * 32 * 4);
        assert!(tile.chunks_exact(4).all(|pixel| pixel[3] == 255));
    }

    #[test]
    fn generation_is_deterministic_per_seed() {
        assert_eq!(star_field_rgba(64, 64, 5), star_field_rgba(64, 64, 5));
        assert_ne!(star_field_rgba(64, 64, 5), star_field_rgba(64, 64, 6));
    }

    #[test]
    fn tile_contains_stars_brighter_than_the_background() {
        let tile = star_field_rgba(128, 128, 2);
        let max_blue = tile.chunks_exact(4).map(|pixel| pixel[2]).max().unwrap();
        assert!(max_blue > 120, "brightest pixel {max_blue}");
    }
}
