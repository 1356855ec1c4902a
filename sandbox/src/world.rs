use bevy::math::Vec3;
use common::LayerMask;
use motion::{RayHit, TransformHandle, WorldQuery};

/// Infinite one-sided plane. Rays only hit it from the side its normal
/// points to.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub point: Vec3,
    pub normal: Vec3,
    pub layer: LayerMask,
    pub surface: Option<String>,
}

impl Plane {
    fn raycast(&self, origin: Vec3, direction: Vec3) -> Option<(f32, Vec3)> {
        let facing = direction.dot(self.normal);
        if facing >= 0.0 {
            return None;
        }
        let distance = (self.point - origin).dot(self.normal) / facing;
        (distance >= 0.0).then_some((distance, self.normal))
    }
}

/// Axis-aligned solid box. Rays starting inside it pass through.
#[derive(Debug, Clone, PartialEq)]
pub struct Cuboid {
    pub min: Vec3,
    pub max: Vec3,
    pub layer: LayerMask,
    pub surface: Option<String>,
}

impl Cuboid {
    fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    fn raycast(&self, origin: Vec3, direction: Vec3) -> Option<(f32, Vec3)> {
        if self.contains(origin) {
            return None;
        }

        let mut near = f32::NEG_INFINITY;
        let mut far = f32::INFINITY;
        let mut normal = Vec3::ZERO;
        for axis in 0..3 {
            let (o, d) = (origin[axis], direction[axis]);
            if d.abs() < f32::EPSILON {
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }
            let (mut t0, mut t1) = ((self.min[axis] - o) / d, (self.max[axis] - o) / d);
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            if t0 > near {
                near = t0;
                normal = Vec3::ZERO;
                normal[axis] = -d.signum();
            }
            far = far.min(t1);
            if near > far {
                return None;
            }
        }
        (near >= 0.0).then_some((near, normal))
    }
}

/// Sphere following a shared transform, used for things that move while
/// the world is being queried.
#[derive(Debug, Clone)]
pub struct Marker {
    pub center: TransformHandle,
    pub radius: f32,
    pub layer: LayerMask,
    pub surface: Option<String>,
}

impl Marker {
    fn raycast(&self, origin: Vec3, direction: Vec3) -> Option<(f32, Vec3)> {
        let center = self.center.get().translation;
        let offset = origin - center;
        let along = offset.dot(direction);
        let discriminant = along * along - (offset.length_squared() - self.radius * self.radius);
        if discriminant < 0.0 {
            return None;
        }
        let distance = -along - discriminant.sqrt();
        if distance < 0.0 {
            return None;
        }
        let point = origin + direction * distance;
        Some((distance, (point - center).normalize_or_zero()))
    }
}

/// Analytic scene geometry answering the rig's ray queries.
#[derive(Debug, Clone, Default)]
pub struct SandboxWorld {
    pub planes: Vec<Plane>,
    pub cuboids: Vec<Cuboid>,
    pub markers: Vec<Marker>,
}

impl SandboxWorld {
    /// Flat ground, a wall along the biped's path and a low crate across the
    /// crawler's.
    pub fn demo() -> Self {
        Self::default()
            .with_plane(Vec3::ZERO, Vec3::Y, LayerMask::GROUND, Some("grass"))
            .with_cuboid(
                Vec3::new(0.55, 0.0, -12.0),
                Vec3::new(0.8, 2.5, -2.0),
                LayerMask::WALL,
                Some("brick"),
            )
            .with_cuboid(
                Vec3::new(2.0, 0.0, -3.4),
                Vec3::new(5.0, 0.2, -2.6),
                LayerMask::PROP,
                None,
            )
    }

    pub fn with_plane(
        mut self,
        point: Vec3,
        normal: Vec3,
        layer: LayerMask,
        surface: Option<&str>,
    ) -> Self {
        self.planes.push(Plane {
            point,
            normal: normal.normalize(),
            layer,
            surface: surface.map(str::to_string),
        });
        self
    }

    pub fn with_cuboid(
        mut self,
        min: Vec3,
        max: Vec3,
        layer: LayerMask,
        surface: Option<&str>,
    ) -> Self {
        self.cuboids.push(Cuboid {
            min: min.min(max),
            max: min.max(max),
            layer,
            surface: surface.map(str::to_string),
        });
        self
    }

    pub fn with_marker(
        mut self,
        center: &TransformHandle,
        radius: f32,
        layer: LayerMask,
        surface: &str,
    ) -> Self {
        self.markers.push(Marker {
            center: center.clone(),
            radius,
            layer,
            surface: Some(surface.to_string()),
        });
        self
    }

    /// Height of the highest surface under `point`, if any.
    pub fn ground_height(&self, point: Vec3, mask: LayerMask) -> Option<f32> {
        let probe = 10.0;
        self.raycast(point + Vec3::Y * probe, Vec3::NEG_Y, probe * 2.0, mask)
            .map(|hit| hit.point.y)
    }
}

impl WorldQuery for SandboxWorld {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit> {
        let direction = direction.try_normalize()?;
        let planes = self
            .planes
            .iter()
            .filter(|plane| plane.layer.intersects(mask))
            .filter_map(|plane| {
                plane
                    .raycast(origin, direction)
                    .map(|(distance, normal)| (distance, normal, &plane.surface))
            });
        let cuboids = self
            .cuboids
            .iter()
            .filter(|cuboid| cuboid.layer.intersects(mask))
            .filter_map(|cuboid| {
                cuboid
                    .raycast(origin, direction)
                    .map(|(distance, normal)| (distance, normal, &cuboid.surface))
            });
        let markers = self
            .markers
            .iter()
            .filter(|marker| marker.layer.intersects(mask))
            .filter_map(|marker| {
                marker
                    .raycast(origin, direction)
                    .map(|(distance, normal)| (distance, normal, &marker.surface))
            });

        let (distance, normal, surface) = planes
            .chain(cuboids)
            .chain(markers)
            .filter(|(distance, _, _)| *distance <= max_distance)
            .min_by(|a, b| a.0.total_cmp(&b.0))?;
        let mut hit = RayHit::new(origin + direction * distance, normal, distance);
        hit.surface = surface.clone();
        Some(hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::transform::components::Transform;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn ground_is_hit_from_above_only() {
        let world = SandboxWorld::demo();
        let hit = world
            .raycast(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Y, 2.0, LayerMask::ALL)
            .unwrap();
        assert!(close(hit.point, Vec3::ZERO));
        assert!(hit.is_surface("grass"));

        assert!(
            world
                .raycast(Vec3::new(0.0, -1.0, 0.0), Vec3::Y, 2.0, LayerMask::ALL)
                .is_none()
        );
    }

    #[test]
    fn wall_face_reports_outward_normal() {
        let world = SandboxWorld::demo();
        let hit = world
            .raycast(Vec3::new(0.0, 1.4, -5.0), Vec3::X, 1.0, LayerMask::WALL)
            .unwrap();
        assert!((hit.distance - 0.55).abs() < 1e-4);
        assert!(close(hit.normal, Vec3::NEG_X));
    }

    #[test]
    fn mask_filters_layers() {
        let world = SandboxWorld::demo();
        assert!(
            world
                .raycast(Vec3::new(0.0, 1.4, -5.0), Vec3::X, 1.0, LayerMask::GROUND)
                .is_none()
        );
    }

    #[test]
    fn max_distance_is_respected() {
        let world = SandboxWorld::demo();
        assert!(
            world
                .raycast(Vec3::new(0.0, 1.4, -5.0), Vec3::X, 0.5, LayerMask::WALL)
                .is_none()
        );
    }

    #[test]
    fn crate_top_raises_ground_height() {
        let world = SandboxWorld::demo();
        let on_crate = world.ground_height(Vec3::new(3.0, 0.0, -3.0), LayerMask::ALL);
        assert!((on_crate.unwrap() - 0.2).abs() < 1e-4);
        let beside = world.ground_height(Vec3::new(3.0, 0.0, 0.0), LayerMask::ALL);
        assert!(beside.unwrap().abs() < 1e-4);
    }

    #[test]
    fn marker_moves_with_its_handle() {
        let orb = TransformHandle::default();
        let world = SandboxWorld::default().with_marker(&orb, 0.25, LayerMask::PROP, "orb");
        orb.set(Transform::from_xyz(0.0, 1.0, -3.0));

        let hit = world
            .raycast(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Z, 10.0, LayerMask::ALL)
            .unwrap();
        assert!((hit.distance - 2.75).abs() < 1e-4);
        assert!(close(hit.normal, Vec3::Z));
        assert!(hit.is_surface("orb"));

        orb.set(Transform::from_xyz(5.0, 1.0, -3.0));
        assert!(
            world
                .raycast(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Z, 10.0, LayerMask::ALL)
                .is_none()
        );
    }

    #[test]
    fn ray_inside_a_cuboid_passes_through() {
        let world = SandboxWorld::default().with_cuboid(
            Vec3::splat(-1.0),
            Vec3::splat(1.0),
            LayerMask::PROP,
            None,
        );
        assert!(world.raycast(Vec3::ZERO, Vec3::X, 5.0, LayerMask::ALL).is_none());
    }
}
