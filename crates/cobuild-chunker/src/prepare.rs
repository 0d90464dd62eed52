//! Placing a model before chunking and its chunks before export.

use std::f64::consts::FRAC_PI_2;

use cobuild_kernel_math::{Transform, Vec3};
use cobuild_kernel_mesh::TriangleMesh;

use crate::config::BuildPlate;

/// Centre `mesh` on the origin in X and Y. Returns the applied offset.
pub fn center_model(mesh: &mut TriangleMesh) -> Vec3 {
    mesh.center_xy()
}

/// Rotate `mesh` a quarter turn about +Z through the origin.
pub fn rotate_quarter_turn(mesh: &mut TriangleMesh) {
    mesh.transform(&Transform::rotation_z(FRAC_PI_2));
}

/// Offset that puts `mesh` on the build plate: min X at 0, Y centred on
/// `-plate / 2`, Z untouched.
pub fn build_plate_offset(mesh: &TriangleMesh, plate: &BuildPlate) -> Vec3 {
    if mesh.is_empty() {
        return Vec3::zeros();
    }
    let b = mesh.bounds();
    Vec3::new(-b.min.x, -0.5 * plate.plate - b.center().y, 0.0)
}

/// Copy of `mesh` placed on the build plate.
pub fn align_on_build_plate(mesh: &TriangleMesh, plate: &BuildPlate) -> TriangleMesh {
    let offset = build_plate_offset(mesh, plate);
    let mut out = mesh.clone();
    out.translate(&offset);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cobuild_kernel_math::Point3;
    use cobuild_kernel_mesh::shapes::cuboid;

    #[test]
    fn test_center_and_rotate() {
        let mut m = cuboid(Point3::new(10.0, 20.0, 0.0), Point3::new(50.0, 30.0, 5.0));
        let offset = center_model(&mut m);
        assert_relative_eq!(offset.x, -30.0);
        assert_relative_eq!(m.bounds().min.x, -20.0, epsilon = 1e-9);

        rotate_quarter_turn(&mut m);
        let size = m.bounds().size();
        assert_relative_eq!(size.x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(size.y, 40.0, epsilon = 1e-9);
        assert_relative_eq!(size.z, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_build_plate_alignment() {
        let m = cuboid(Point3::new(-20.0, -10.0, 3.0), Point3::new(20.0, 30.0, 8.0));
        let placed = align_on_build_plate(&m, &BuildPlate::default());
        let b = placed.bounds();
        assert_relative_eq!(b.min.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(b.center().y, -150.0, epsilon = 1e-9);
        assert_relative_eq!(b.min.z, 3.0, epsilon = 1e-9);
    }
}
