//! Procedural geometry for the tunnel: the tube mesh the camera flies
//! through and the shard grid that reassembles (or scatters) the captured
//! frame during the terminal phase.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fixed centerline control points: a gentle S-curve receding along -Z.
pub(crate) const TUBE_CONTROL_POINTS: [Vec3; 4] = [
    Vec3::new(0.0, 0.0, 0.0),
    Vec3::new(0.8, 0.4, -6.0),
    Vec3::new(-0.7, -0.3, -12.0),
    Vec3::new(0.2, 0.1, -18.0),
];

/// Texture repeats along the tube length.
const TUBE_V_SPAN: f32 = 4.0;

/// How far shards travel outward at full shatter, in NDC units.
const SHARD_SPREAD: f32 = 1.6;

/// Maximum shard spin at full shatter, in radians.
const SHARD_MAX_SPIN: f32 = 2.4;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct TubeVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

pub(crate) struct TubeMesh {
    pub vertices: Vec<TubeVertex>,
    pub indices: Vec<u32>,
}

impl TubeMesh {
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

/// Samples the Catmull-Rom centerline at `t` in `[0, 1]`.
///
/// Endpoints are clamped so the spline passes through the first and last
/// control points.
pub(crate) fn centerline_point(t: f32, points: &[Vec3]) -> Vec3 {
    let count = points.len();
    debug_assert!(count >= 2);
    let clamped = t.clamp(0.0, 1.0);
    let span = (count - 1) as f32;
    let scaled = clamped * span;
    let segment = (scaled.floor() as usize).min(count - 2);
    let local = scaled - segment as f32;

    let p0 = points[segment.saturating_sub(1)];
    let p1 = points[segment];
    let p2 = points[segment + 1];
    let p3 = points[(segment + 2).min(count - 1)];

    let l2 = local * local;
    let l3 = l2 * local;
    0.5 * ((2.0 * p1)
        + (p2 - p0) * local
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * l2
        + (3.0 * p1 - 3.0 * p2 + p3 - p0) * l3)
}

/// Builds the tube: `rings` cross-sections of `segments` vertices each,
/// swept along the centerline with a stable frame so the texture seam does
/// not twist.
pub(crate) fn build_tube(rings: usize, segments: usize, radius: f32) -> TubeMesh {
    debug_assert!(rings >= 2 && segments >= 3);
    let mut vertices = Vec::with_capacity(rings * (segments + 1));

    for ring in 0..rings {
        let t = ring as f32 / (rings - 1) as f32;
        let center = centerline_point(t, &TUBE_CONTROL_POINTS);
        let ahead = centerline_point((t + 0.01).min(1.0), &TUBE_CONTROL_POINTS);
        let behind = centerline_point((t - 0.01).max(0.0), &TUBE_CONTROL_POINTS);
        let tangent = (ahead - behind).normalize_or_zero();
        // A fixed reference keeps ring orientation coherent; the curve never
        // aligns with +Y so the cross products stay well-conditioned.
        let side = tangent.cross(Vec3::Y).normalize_or_zero();
        let up = side.cross(tangent);

        for segment in 0..=segments {
            let around = segment as f32 / segments as f32;
            let theta = around * std::f32::consts::TAU;
            let offset = (side * theta.cos() + up * theta.sin()) * radius;
            let position = center + offset;
            vertices.push(TubeVertex {
                position: position.to_array(),
                uv: [around, t * TUBE_V_SPAN],
            });
        }
    }

    let stride = (segments + 1) as u32;
    let mut indices = Vec::with_capacity((rings - 1) * segments * 6);
    for ring in 0..(rings - 1) as u32 {
        for segment in 0..segments as u32 {
            let near = ring * stride + segment;
            let far = near + stride;
            indices.extend_from_slice(&[near, far, near + 1, near + 1, far, far + 1]);
        }
    }

    TubeMesh { vertices, indices }
}

/// Per-instance shard data fed to the shard vertex shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct ShardInstance {
    pub center: [f32; 2],
    pub half: [f32; 2],
    pub spin: [f32; 2],
    pub uv_rect: [f32; 4],
}

/// Rest pose and scatter direction of one shard, fixed at mount.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ShardSite {
    rest_center: Vec2,
    half: Vec2,
    direction: Vec2,
    spin: f32,
    uv_rect: [f32; 4],
}

/// Lays out a `rows × cols` shard grid covering the full NDC square.
///
/// Scatter directions point outward from the screen center with a seeded
/// perturbation so the break-up looks irregular but is stable per mount.
pub(crate) fn shard_sites(rows: u32, cols: u32, seed: u64) -> Vec<ShardSite> {
    debug_assert!(rows > 0 && cols > 0);
    let mut rng = StdRng::seed_from_u64(seed);
    let half = Vec2::new(1.0 / cols as f32, 1.0 / rows as f32);
    let mut sites = Vec::with_capacity((rows * cols) as usize);

    for row in 0..rows {
        for col in 0..cols {
            let center = Vec2::new(
                -1.0 + (2.0 * col as f32 + 1.0) * half.x,
                -1.0 + (2.0 * row as f32 + 1.0) * half.y,
            );
            let wobble = Vec2::new(rng.gen_range(-0.35..0.35), rng.gen_range(-0.35..0.35));
            let direction = (center + wobble).normalize_or_zero();
            let direction = if direction == Vec2::ZERO {
                Vec2::new(0.0, 1.0)
            } else {
                direction
            };
            let spin = rng.gen_range(-SHARD_MAX_SPIN..SHARD_MAX_SPIN);
            let u0 = (center.x - half.x + 1.0) * 0.5;
            let u1 = (center.x + half.x + 1.0) * 0.5;
            // Texture V runs top-down, so the NDC top edge maps to the
            // smaller V.
            let v0 = (1.0 - (center.y + half.y)) * 0.5;
            let v1 = (1.0 - (center.y - half.y)) * 0.5;
            sites.push(ShardSite {
                rest_center: center,
                half,
                direction,
                spin,
                uv_rect: [u0, v0, u1, v1],
            });
        }
    }

    sites
}

/// Instantiates the shard grid at the given shatter progress.
///
/// At progress 0 every shard sits exactly in its rest pose, so drawing the
/// grid reassembles the captured frame pixel-for-pixel; displacement and
/// spin both scale linearly with the (already eased) progress.
pub(crate) fn shard_instances(sites: &[ShardSite], shatter: f32) -> Vec<ShardInstance> {
    let shatter = shatter.clamp(0.0, 1.0);
    sites
        .iter()
        .map(|site| {
            let center = site.rest_center + site.direction * (shatter * SHARD_SPREAD);
            ShardInstance {
                center: center.to_array(),
                half: site.half.to_array(),
                spin: [site.spin * shatter, 0.0],
                uv_rect: site.uv_rect,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tube_has_expected_counts() {
        let mesh = build_tube(16, 24, 2.0);
        assert_eq!(mesh.vertices.len(), 16 * 25);
        assert_eq!(mesh.indices.len(), 15 * 24 * 6);
        let max_index = *mesh.indices.iter().max().unwrap();
        assert!((max_index as usize) < mesh.vertices.len());
    }

    #[test]
    fn tube_rings_sit_on_the_radius() {
        let radius = 2.0;
        let mesh = build_tube(8, 12, radius);
        let center = centerline_point(0.0, &TUBE_CONTROL_POINTS);
        for vertex in &mesh.vertices[..13] {
            let distance = (Vec3::from_array(vertex.position) - center).length();
            assert!((distance - radius).abs() < 1e-3, "distance {distance}");
        }
    }

    #[test]
    fn tube_uv_covers_the_unit_seam() {
        let mesh = build_tube(4, 8, 1.0);
        let first_ring = &mesh.vertices[..9];
        assert_eq!(first_ring.first().unwrap().uv[0], 0.0);
        assert_eq!(first_ring.last().unwrap().uv[0], 1.0);
        assert_eq!(mesh.vertices.last().unwrap().uv[1], TUBE_V_SPAN);
    }

    #[test]
    fn centerline_hits_its_endpoints() {
        let start = centerline_point(0.0, &TUBE_CONTROL_POINTS);
        let end = centerline_point(1.0, &TUBE_CONTROL_POINTS);
        assert!((start - TUBE_CONTROL_POINTS[0]).length() < 1e-4);
        assert!((end - TUBE_CONTROL_POINTS[3]).length() < 1e-4);
    }

    #[test]
    fn shards_rest_in_identity_pose() {
        let sites = shard_sites(4, 4, 99);
        let instances = shard_instances(&sites, 0.0);
        assert_eq!(instances.len(), 16);
        for (instance, site) in instances.iter().zip(&sites) {
            assert_eq!(Vec2::from_array(instance.center), site.rest_center);
            assert_eq!(instance.spin[0], 0.0);
        }
    }

    #[test]
    fn shards_scatter_monotonically() {
        let sites = shard_sites(4, 4, 99);
        let near = shard_instances(&sites, 0.25);
        let far = shard_instances(&sites, 1.0);
        for ((site, near), far) in sites.iter().zip(&near).zip(&far) {
            let near_travel = (Vec2::from_array(near.center) - site.rest_center).length();
            let far_travel = (Vec2::from_array(far.center) - site.rest_center).length();
            assert!(far_travel > near_travel);
            assert!((far_travel - SHARD_SPREAD).abs() < 1e-3);
        }
    }

    #[test]
    fn shard_layout_is_deterministic_per_seed() {
        let a = shard_instances(&shard_sites(4, 4, 7), 0.5);
        let b = shard_instances(&shard_sites(4, 4, 7), 0.5);
        assert_eq!(a, b);
        let other_seed = shard_instances(&shard_sites(4, 4, 8), 0.5);
        assert_ne!(a, other_seed);
    }

    #[test]
    fn shard_uv_rects_stay_inside_the_texture() {
        for site in shard_sites(5, 3, 1) {
            let [u0, v0, u1, v1] = site.uv_rect;
            assert!((0.0..=1.0).contains(&u0) && (0.0..=1.0).contains(&u1));
            assert!((0.0..=1.0).contains(&v0) && (0.0..=1.0).contains(&v1));
            assert!(u0 < u1 && v0 < v1);
        }
    }
}
