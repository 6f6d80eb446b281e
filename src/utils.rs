use cgmath::{Deg, Matrix3, Rotation3};

use crate::types::Quaternion;

/// Convert euler angles in DEGREES to quaternion.
/// Rotations are intrinsic and applied in X, Y, Z order: `q = qx * qy * qz`.
pub fn euler_xyz_to_quat(x: f64, y: f64, z: f64) -> Quaternion {
    Quaternion::from_angle_x(Deg(x)) * Quaternion::from_angle_y(Deg(y)) * Quaternion::from_angle_z(Deg(z))
}

/// Inverse of [`euler_xyz_to_quat`], returns (x, y, z) in DEGREES.
/// At gimbal lock (y = +-90) the z angle is set to 0 and x absorbs the whole rotation.
pub fn quat_to_euler_xyz(q: Quaternion) -> (f64, f64, f64) {
    // cgmath matrices are column major: m.c.r
    let m: Matrix3<f64> = Matrix3::from(q);
    let sin_y = m.z.x.clamp(-1.0, 1.0);
    let y = sin_y.asin();

    let (x, z) = if sin_y.abs() < 1.0 - 1e-9 {
        ((-m.z.y).atan2(m.z.z), (-m.y.x).atan2(m.x.x))
    } else {
        (m.y.z.atan2(m.y.y), 0.0)
    };

    (x.to_degrees(), y.to_degrees(), z.to_degrees())
}
