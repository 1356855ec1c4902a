use bevy::math::{Mat3, Quat, Vec3};
use bevy::transform::components::Transform;

/// Removes the component of `vector` along `normal`.
pub fn project_on_plane(vector: Vec3, normal: Vec3) -> Vec3 {
    let Some(normal) = normal.try_normalize() else {
        return vector;
    };
    vector - normal * vector.dot(normal)
}

/// Rotation whose forward (-Z) axis points along `forward` and whose up axis
/// is as close to `up` as possible. `None` when the two are parallel or zero.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Option<Quat> {
    let back = (-forward).try_normalize()?;
    let right = up.cross(back).try_normalize()?;
    let up = back.cross(right);
    Some(Quat::from_mat3(&Mat3::from_cols(right, up, back)).normalize())
}

/// Inverse of [`Transform::transform_point`].
pub fn inverse_transform_point(transform: &Transform, point: Vec3) -> Vec3 {
    let local = transform.rotation.inverse() * (point - transform.translation);
    local / transform.scale
}

/// Signed angle about +Y that turns `from` onto `to`, ignoring vertical
/// components. Zero when either vector has no horizontal extent.
pub fn yaw_between(from: Vec3, to: Vec3) -> f32 {
    let from = Vec3::new(from.x, 0.0, from.z);
    let to = Vec3::new(to.x, 0.0, to.z);
    if from.length_squared() <= f32::EPSILON || to.length_squared() <= f32::EPSILON {
        return 0.0;
    }
    let cross = from.cross(to).y;
    cross.atan2(from.dot(to))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn projection_drops_normal_component() {
        let projected = project_on_plane(Vec3::new(1.0, 2.0, 3.0), Vec3::Y * 4.0);
        assert!((projected - Vec3::new(1.0, 0.0, 3.0)).length() < EPSILON);
    }

    #[test]
    fn look_rotation_points_forward_axis() {
        let rotation = look_rotation(Vec3::X, Vec3::Y).unwrap();
        let transform = Transform::from_rotation(rotation);
        assert!((*transform.forward() - Vec3::X).length() < EPSILON);
        assert!((*transform.up() - Vec3::Y).length() < EPSILON);
    }

    #[test]
    fn look_rotation_rejects_parallel_axes() {
        assert!(look_rotation(Vec3::Y, Vec3::Y).is_none());
        assert!(look_rotation(Vec3::ZERO, Vec3::Y).is_none());
    }

    #[test]
    fn inverse_point_undoes_transform_point() {
        let transform = Transform::from_xyz(1.0, 2.0, 3.0)
            .with_rotation(Quat::from_rotation_y(0.7))
            .with_scale(Vec3::splat(2.0));
        let point = Vec3::new(-0.5, 0.25, 4.0);
        let round_trip = inverse_transform_point(&transform, transform.transform_point(point));
        assert!((round_trip - point).length() < EPSILON);
    }

    #[test]
    fn yaw_between_rotates_about_up() {
        let angle = yaw_between(Vec3::X, Vec3::NEG_Z);
        let rotated = Quat::from_rotation_y(angle) * Vec3::X;
        assert!((rotated - Vec3::NEG_Z).length() < EPSILON);
        assert_eq!(yaw_between(Vec3::Y, Vec3::X), 0.0);
    }
}
