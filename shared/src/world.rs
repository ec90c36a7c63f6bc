//! Static arena geometry, ground probing and ray casts.

use crate::math::Vec3;
use crate::movement::{GroundSensor, MovementConfig};
use serde::{Deserialize, Serialize};

/// Bit set of collision layers a query considers.
pub type LayerMask = u32;

pub mod layers {
    use super::LayerMask;

    pub const WORLD: LayerMask = 1 << 0;
    pub const PLAYER: LayerMask = 1 << 3;
    pub const ALL: LayerMask = LayerMask::MAX;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

/// Axis-aligned box used for static obstacles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn contains_xz(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.z >= self.min.z && point.z <= self.max.z
    }

    /// Slab test. Rays starting inside the box do not hit it.
    pub fn ray_intersect(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        let origin_axes = [origin.x, origin.y, origin.z];
        let dir_axes = [direction.x, direction.y, direction.z];
        let min_axes = [self.min.x, self.min.y, self.min.z];
        let max_axes = [self.max.x, self.max.y, self.max.z];

        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut enter_axis = 0;
        let mut enter_sign = 0.0;

        for axis in 0..3 {
            if dir_axes[axis].abs() < f32::EPSILON {
                if origin_axes[axis] < min_axes[axis] || origin_axes[axis] > max_axes[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir_axes[axis];
            let mut t0 = (min_axes[axis] - origin_axes[axis]) * inv;
            let mut t1 = (max_axes[axis] - origin_axes[axis]) * inv;
            let mut sign = -1.0;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
                sign = 1.0;
            }
            if t0 > t_enter {
                t_enter = t0;
                enter_axis = axis;
                enter_sign = sign;
            }
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return None;
            }
        }

        if t_enter < 0.0 || t_enter > max_distance {
            return None;
        }

        let mut normal = [0.0_f32; 3];
        normal[enter_axis] = enter_sign;
        Some(RayHit {
            point: origin + direction * t_enter,
            normal: Vec3::new(normal[0], normal[1], normal[2]),
            distance: t_enter,
        })
    }
}

/// Vertical capsule around an entity's position (its centre).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Capsule {
    pub radius: f32,
    pub height: f32,
}

impl Default for Capsule {
    fn default() -> Self {
        Self {
            radius: 0.5,
            height: 2.0,
        }
    }
}

impl Capsule {
    /// Ray against the capsule centred at `center`. Only entry hits count.
    pub fn ray_intersect(
        &self,
        center: Vec3,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<RayHit> {
        let half_segment = (self.height * 0.5 - self.radius).max(0.0);
        let local = origin - center;
        let mut best: Option<RayHit> = None;

        let a = direction.x * direction.x + direction.z * direction.z;
        if a > f32::EPSILON {
            let b = 2.0 * (local.x * direction.x + local.z * direction.z);
            let c = local.x * local.x + local.z * local.z - self.radius * self.radius;
            let disc = b * b - 4.0 * a * c;
            if disc >= 0.0 {
                let t = (-b - disc.sqrt()) / (2.0 * a);
                let y = local.y + t * direction.y;
                if t >= 0.0 && t <= max_distance && y.abs() <= half_segment {
                    let point = origin + direction * t;
                    let offset = point - center;
                    best = Some(RayHit {
                        point,
                        normal: Vec3::new(offset.x, 0.0, offset.z).normalize_or_zero(),
                        distance: t,
                    });
                }
            }
        }

        for cap in [half_segment, -half_segment] {
            let cap_center = center + Vec3::new(0.0, cap, 0.0);
            if let Some(hit) = ray_sphere(origin, direction, cap_center, self.radius, max_distance) {
                if best.map_or(true, |current| hit.distance < current.distance) {
                    best = Some(hit);
                }
            }
        }

        best
    }

    /// Distance from `point` to the capsule's core segment.
    fn axis_distance(&self, center: Vec3, point: Vec3) -> f32 {
        let half_segment = (self.height * 0.5 - self.radius).max(0.0);
        let local = point - center;
        let nearest = Vec3::new(0.0, local.y.clamp(-half_segment, half_segment), 0.0);
        local.distance(nearest)
    }

    /// True if `point` lies within the capsule centred at `center`.
    pub fn contains(&self, center: Vec3, point: Vec3) -> bool {
        self.axis_distance(center, point) <= self.radius
    }

    pub fn overlaps_sphere(&self, center: Vec3, sphere_center: Vec3, sphere_radius: f32) -> bool {
        self.axis_distance(center, sphere_center) <= self.radius + sphere_radius
    }
}

/// Ray against sphere. `direction` must be normalized. Only entry hits count.
pub fn ray_sphere(
    origin: Vec3,
    direction: Vec3,
    center: Vec3,
    radius: f32,
    max_distance: f32,
) -> Option<RayHit> {
    let to_origin = origin - center;
    let b = to_origin.dot(direction);
    let c = to_origin.dot(to_origin) - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    if t < 0.0 || t > max_distance {
        return None;
    }
    let point = origin + direction * t;
    Some(RayHit {
        point,
        normal: (point - center).normalize_or_zero(),
        distance: t,
    })
}

/// Static level: a floor plane plus box obstacles on the `WORLD` layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub floor_height: f32,
    pub obstacles: Vec<Aabb>,
}

impl Default for World {
    fn default() -> Self {
        Self {
            floor_height: 0.0,
            obstacles: Vec::new(),
        }
    }
}

impl World {
    /// Default arena: open floor with a few cover blocks.
    pub fn arena() -> Self {
        Self {
            floor_height: 0.0,
            obstacles: vec![
                Aabb::new(Vec3::new(-12.0, -1.0, 8.0), Vec3::new(-8.0, 2.0, 10.0)),
                Aabb::new(Vec3::new(8.0, -1.0, -10.0), Vec3::new(12.0, 2.0, -8.0)),
                Aabb::new(Vec3::new(-2.0, -1.0, -2.0), Vec3::new(2.0, 1.0, 2.0)),
            ],
        }
    }

    /// Height of the highest walkable surface under `position` that a body
    /// with its feet at `feet` could be standing on.
    pub fn surface_height(&self, position: Vec3, feet: f32) -> f32 {
        self.obstacles
            .iter()
            .filter(|obstacle| obstacle.contains_xz(position) && obstacle.max.y <= feet + 0.5)
            .map(|obstacle| obstacle.max.y)
            .fold(self.floor_height, f32::max)
    }

    /// Ground check below an entity centred at `position`.
    pub fn probe_ground(&self, position: Vec3, config: &MovementConfig) -> GroundSensor {
        let feet = position.y - config.player_height * 0.5;
        GroundSensor {
            grounded: feet - self.surface_height(position, feet) <= config.ground_distance,
            slope_normal: None,
        }
    }

    /// Nearest static hit along a normalized ray.
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;

        if direction.y < 0.0 && origin.y > self.floor_height {
            let t = (self.floor_height - origin.y) / direction.y;
            if t <= max_distance {
                best = Some(RayHit {
                    point: origin + direction * t,
                    normal: Vec3::Y,
                    distance: t,
                });
            }
        }

        for obstacle in &self.obstacles {
            if let Some(hit) = obstacle.ray_intersect(origin, direction, max_distance) {
                if best.map_or(true, |current| hit.distance < current.distance) {
                    best = Some(hit);
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_aabb_hit_from_outside() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, 4.0), Vec3::new(1.0, 1.0, 6.0));
        let hit = aabb.ray_intersect(Vec3::ZERO, Vec3::Z, 100.0).unwrap();
        assert_approx_eq!(hit.distance, 4.0, 1e-6);
        assert_eq!(hit.normal, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_aabb_miss_and_range() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, 4.0), Vec3::new(1.0, 1.0, 6.0));
        assert!(aabb.ray_intersect(Vec3::ZERO, Vec3::X, 100.0).is_none());
        assert!(aabb.ray_intersect(Vec3::ZERO, Vec3::Z, 3.0).is_none());
    }

    #[test]
    fn test_capsule_side_hit() {
        let capsule = Capsule::default();
        let center = Vec3::new(0.0, 1.0, 10.0);
        let hit = capsule
            .ray_intersect(center, Vec3::new(0.0, 1.0, 0.0), Vec3::Z, 100.0)
            .unwrap();
        assert_approx_eq!(hit.distance, 9.5, 1e-5);
        assert_approx_eq!(hit.normal.z, -1.0, 1e-5);
    }

    #[test]
    fn test_capsule_cap_hit_from_above() {
        let capsule = Capsule::default();
        let center = Vec3::new(0.0, 1.0, 0.0);
        let hit = capsule
            .ray_intersect(center, Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -1.0, 0.0), 100.0)
            .unwrap();
        assert_approx_eq!(hit.point.y, 2.0, 1e-5);
    }

    #[test]
    fn test_capsule_contains() {
        let capsule = Capsule::default();
        let center = Vec3::new(0.0, 1.0, 0.0);
        assert!(capsule.contains(center, Vec3::new(0.2, 1.7, 0.0)));
        assert!(!capsule.contains(center, Vec3::new(0.6, 1.0, 0.0)));
        assert!(capsule.overlaps_sphere(center, Vec3::new(0.6, 1.0, 0.0), 0.25));
        assert!(!capsule.overlaps_sphere(center, Vec3::new(0.0, 3.0, 0.0), 0.25));
    }

    #[test]
    fn test_ground_probe() {
        let world = World::default();
        let config = MovementConfig::default();
        assert!(world.probe_ground(Vec3::new(0.0, 1.0, 0.0), &config).grounded);
        assert!(world.probe_ground(Vec3::new(0.0, 1.3, 0.0), &config).grounded);
        assert!(!world.probe_ground(Vec3::new(0.0, 2.0, 0.0), &config).grounded);
    }

    #[test]
    fn test_standing_on_obstacle() {
        let world = World::arena();
        let config = MovementConfig::default();
        assert!(world.probe_ground(Vec3::new(0.0, 2.0, 0.0), &config).grounded);
    }

    #[test]
    fn test_raycast_hits_floor() {
        let world = World::default();
        let direction = Vec3::new(0.0, -1.0, 1.0).normalize_or_zero();
        let hit = world.raycast(Vec3::new(0.0, 1.0, 0.0), direction, 100.0).unwrap();
        assert_approx_eq!(hit.point.y, 0.0, 1e-5);
        assert_eq!(hit.normal, Vec3::Y);
    }
}
