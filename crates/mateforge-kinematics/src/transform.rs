//! Homogeneous 4×4 rigid transforms.
//!
//! [`Transform`] wraps a `nalgebra` matrix and provides the handful of
//! operations the resolver needs: composition, rigid inversion, rotation-only
//! extraction and construction from a coordinate system's axes.
//!
//! # Example
//!
//! ```rust
//! use mateforge_kinematics::transform::Transform;
//!
//! // part is 1 m forward of world origin, same orientation.
//! let world_part = Transform::from_translation([1.0, 0.0, 0.0]);
//!
//! // joint is 0.5 m forward of the part origin.
//! let part_joint = Transform::from_translation([0.5, 0.0, 0.0]);
//!
//! let world_joint = world_part.compose(&part_joint);
//! assert!((world_joint.translation().x - 1.5).abs() < 1e-12);
//! ```

use nalgebra::{Matrix3, Matrix4, Vector3};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ────────────────────────────────────────────────────────────────────────────
// Transform
// ────────────────────────────────────────────────────────────────────────────

/// A rigid-body transform stored as a 4×4 homogeneous matrix.
///
/// `T_a_b` maps points expressed in frame `b` into frame `a`. Composition
/// follows matrix order: `T_a_b.compose(&T_b_c)` is `T_a_c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub matrix: Matrix4<f64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    pub fn from_matrix(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }

    /// Build from 16 values in row-major order, the layout the CAD service
    /// uses for occurrence transforms.
    ///
    /// Returns `None` when `values` does not hold exactly 16 entries.
    pub fn from_row_major(values: &[f64]) -> Option<Self> {
        if values.len() != 16 {
            return None;
        }
        Some(Self::from_matrix(Matrix4::from_row_slice(values)))
    }

    /// Pure translation.
    pub fn from_translation(origin: [f64; 3]) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = origin[0];
        m[(1, 3)] = origin[1];
        m[(2, 3)] = origin[2];
        Self::from_matrix(m)
    }

    /// Pure rotation whose columns are the given axes.
    ///
    /// With the axes of a local coordinate system expressed in its parent
    /// frame, the result maps local directions into the parent frame.
    pub fn from_axes(x_axis: [f64; 3], y_axis: [f64; 3], z_axis: [f64; 3]) -> Self {
        let mut m = Matrix4::identity();
        for (col, axis) in [x_axis, y_axis, z_axis].iter().enumerate() {
            for (row, value) in axis.iter().enumerate() {
                m[(row, col)] = *value;
            }
        }
        Self::from_matrix(m)
    }

    /// 180° rotation about the local X axis.
    pub fn flip_x() -> Self {
        let mut m = Matrix4::identity();
        m[(1, 1)] = -1.0;
        m[(2, 2)] = -1.0;
        Self::from_matrix(m)
    }

    /// `self · other`.
    pub fn compose(&self, other: &Transform) -> Self {
        Self::from_matrix(self.matrix * other.matrix)
    }

    /// Inverse of a rigid transform: `[Rᵀ | -Rᵀ·t]`.
    ///
    /// Assumes the upper-left block is orthonormal; scale or shear is not
    /// handled.
    pub fn inverse(&self) -> Self {
        let r_t: Matrix3<f64> = self.rotation_matrix().transpose();
        let t = -(r_t * self.translation());
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&r_t);
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&t);
        Self::from_matrix(m)
    }

    /// Same rotation, zero translation.
    pub fn rotation_part(&self) -> Self {
        let mut m = self.matrix;
        m[(0, 3)] = 0.0;
        m[(1, 3)] = 0.0;
        m[(2, 3)] = 0.0;
        Self::from_matrix(m)
    }

    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    pub fn translation(&self) -> Vector3<f64> {
        Vector3::new(self.matrix[(0, 3)], self.matrix[(1, 3)], self.matrix[(2, 3)])
    }

    /// Direction of the local Z axis expressed in the outer frame.
    pub fn z_axis(&self) -> Vector3<f64> {
        Vector3::new(self.matrix[(0, 2)], self.matrix[(1, 2)], self.matrix[(2, 2)])
    }

    /// Pose of `self` expressed in `parent`: `parent⁻¹ · self`.
    pub fn relative_to(&self, parent: &Transform) -> Self {
        parent.inverse().compose(self)
    }

    pub fn rows(&self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = self.matrix[(r, c)];
            }
        }
        rows
    }

    /// Element-wise comparison within `eps`.
    pub fn approx_eq(&self, other: &Transform, eps: f64) -> bool {
        self.matrix
            .iter()
            .zip(other.matrix.iter())
            .all(|(a, b)| (a - b).abs() <= eps)
    }
}

// Serialized as four rows so the JSON reads like the matrix it is.
impl Serialize for Transform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rows().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Transform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = <[[f64; 4]; 4]>::deserialize(deserializer)?;
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Ok(Self::from_matrix(Matrix4::from_row_slice(&flat)))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
