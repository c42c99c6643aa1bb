use glam::{Mat4, Quat, Vec3};

// Dividing by the axis lengths of smaller determinants produces NaN or infinity.
const DEGENERATE_DETERMINANT: f32 = 1e-12;

/// A decomposed transform as scale -> rotation -> translation (TRS).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Compose the matrix `translate * rotate * scale`.
    pub fn to_matrix(self) -> Mat4 {
        Mat4::from_translation(self.translation)
            * Mat4::from_quat(self.rotation)
            * Mat4::from_scale(self.scale)
    }

    /// Decompose an affine matrix without shear into its scale, rotation, and translation.
    ///
    /// Matrices with a zero scale on any axis have no recoverable rotation
    /// and decompose with an identity rotation instead.
    pub fn from_matrix(value: Mat4) -> Self {
        if value.determinant().abs() < DEGENERATE_DETERMINANT {
            return Self {
                translation: value.w_axis.truncate(),
                rotation: Quat::IDENTITY,
                scale: Vec3::new(
                    value.x_axis.truncate().length(),
                    value.y_axis.truncate().length(),
                    value.z_axis.truncate().length(),
                ),
            };
        }

        let (scale, rotation, translation) = value.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Interpolate translation and scale linearly and rotation along the shortest arc.
    ///
    /// A `factor` of `0.0` returns `self` and `1.0` returns `other`.
    pub fn lerp(self, other: Self, factor: f32) -> Self {
        Self {
            translation: self.translation.lerp(other.translation, factor),
            rotation: self.rotation.slerp(other.rotation, factor).normalize(),
            scale: self.scale.lerp(other.scale, factor),
        }
    }
}
