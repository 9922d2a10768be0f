//! Orientation normalization.
//!
//! Estimation runs in a canonical frame where the image axes are the world
//! axes (optionally with x and y exchanged) and the image centre is the world
//! origin. In that frame the distortion axis is always world x, so the same
//! parameter indices can be locked for every acquisition orientation.
//!
//! With `D` the native axes, `c` the native centre and `S` the canonical axes
//! (identity or the x/y swap), a native world position `p` maps to
//! `M(p) = S·Dᵀ·(p − c)`.

use burn::tensor::backend::Backend;
use nalgebra::{Matrix3, Matrix4, Vector3};
use svrb0_core::image::{Image, ImageMetadata, MultiChannelImage};
use svrb0_core::spatial::{Direction, Point, Vector};
use svrb0_core::transform::{AffineTransform, FreeFormTransform};

/// Rigid map from a native world frame into the canonical frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationTransform {
    rotation: Matrix3<f64>,
    center: Point<3>,
    swap: bool,
}

impl OrientationTransform {
    /// Orientation transform of a grid with `size` voxels, (x, y, z) order.
    pub fn from_metadata(metadata: &ImageMetadata<3>, size: [usize; 3], swap: bool) -> Self {
        let canonical = canonical_axes(swap);
        Self {
            rotation: canonical.inner() * metadata.direction().inner().transpose(),
            center: metadata.center(size),
            swap,
        }
    }

    /// Whether x and y are exchanged in the canonical frame.
    pub fn swap(&self) -> bool {
        self.swap
    }

    /// Native centre, the point sent to the canonical origin.
    pub fn center(&self) -> &Point<3> {
        &self.center
    }

    /// Rotation part `S·Dᵀ`.
    pub fn rotation(&self) -> &Matrix3<f64> {
        &self.rotation
    }

    /// Homogeneous matrix of `M`.
    pub fn matrix(&self) -> Matrix4<f64> {
        let offset = -(self.rotation * self.center.0.coords);
        homogeneous(&self.rotation, &offset)
    }

    /// Homogeneous matrix of `M⁻¹`.
    pub fn inverse_matrix(&self) -> Matrix4<f64> {
        homogeneous(&self.rotation.transpose(), &self.center.0.coords)
    }

    /// Native world position to canonical position.
    pub fn apply(&self, point: &Point<3>) -> Point<3> {
        Point((self.rotation * (point.0 - self.center.0)).into())
    }

    /// Canonical position back to native world position.
    pub fn apply_inverse(&self, point: &Point<3>) -> Point<3> {
        Point((self.rotation.transpose() * point.0.coords + self.center.0.coords).into())
    }

    /// `M` as an affine transform.
    pub fn to_affine(&self) -> AffineTransform {
        let mut affine = AffineTransform::identity();
        affine.set_matrix(&self.matrix());
        affine
    }

    /// Geometry of the normalized copy of a grid: canonical axes, centre at
    /// the origin, spacing unchanged.
    pub fn normalized_metadata(&self, metadata: &ImageMetadata<3>, size: [usize; 3]) -> ImageMetadata<3> {
        ImageMetadata::new(Point::origin(), *metadata.spacing(), canonical_axes(self.swap))
            .with_center(size, Point::origin())
    }

    /// Native geometry of a grid given in the canonical frame.
    pub fn denormalize_metadata(&self, metadata: &ImageMetadata<3>) -> ImageMetadata<3> {
        let axes = Direction(self.rotation.transpose() * metadata.direction().inner());
        ImageMetadata::new(self.apply_inverse(metadata.origin()), *metadata.spacing(), axes)
    }

    /// Express an affine transform fitted in the canonical frame in the
    /// native frame: `M⁻¹ · T · M`.
    pub fn to_native_affine(&self, fitted: &AffineTransform) -> AffineTransform {
        let matrix = self.inverse_matrix() * fitted.matrix() * self.matrix();
        let mut native = AffineTransform::identity().with_center(self.center);
        native.set_matrix(&matrix);
        native
    }

    /// Express a free-form transform fitted in the canonical frame in the
    /// native frame.
    ///
    /// The lattice keeps its spacing and dimensions; its frame is moved with
    /// `M⁻¹` and every displacement vector is rotated by `(S·Dᵀ)ᵀ`. The affine
    /// base is conjugated like [`to_native_affine`](Self::to_native_affine).
    /// Rotated vectors generally have all three components, so the result
    /// carries no active axis.
    pub fn to_native_free_form(&self, fitted: &FreeFormTransform) -> FreeFormTransform {
        let mut native = fitted.clone().without_active_axis();
        *native.base_mut() = self.to_native_affine(fitted.base());

        let back = self.rotation.transpose();
        let lattice = native.lattice_mut();
        let geometry = *lattice.geometry();
        lattice.put_frame(
            self.apply_inverse(geometry.origin()),
            Direction(back * geometry.direction().inner()),
        );
        for v in lattice.displacements_mut() {
            *v = Vector(back * v.0);
        }
        native
    }
}

/// Canonical axes: identity, or x and y exchanged.
pub fn canonical_axes(swap: bool) -> Direction<3> {
    if swap {
        Direction::swap_xy()
    } else {
        Direction::identity()
    }
}

/// Normalized copy of `image` and the transform into its canonical frame.
///
/// Voxel data are shared unchanged; only the geometry is replaced.
pub fn normalize_image<B: Backend>(image: &Image<B, 3>, swap: bool) -> (Image<B, 3>, OrientationTransform) {
    let orient = OrientationTransform::from_metadata(image.metadata(), image.size(), swap);
    let metadata = orient.normalized_metadata(image.metadata(), image.size());
    (image.with_metadata(metadata), orient)
}

/// Normalized copy of an aggregate and the transform into its canonical frame.
pub fn normalize_aggregate<B: Backend>(
    image: &MultiChannelImage<B>,
    swap: bool,
) -> (MultiChannelImage<B>, OrientationTransform) {
    let orient = OrientationTransform::from_metadata(image.metadata(), image.size(), swap);
    let metadata = orient.normalized_metadata(image.metadata(), image.size());
    (image.with_metadata(metadata), orient)
}

fn homogeneous(linear: &Matrix3<f64>, translation: &Vector3<f64>) -> Matrix4<f64> {
    let mut m = Matrix4::identity();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(linear);
    m.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use svrb0_core::spatial::Spacing;
    use svrb0_core::transform::rigid::rotation_matrix;
    use svrb0_core::transform::{AffineParameter, ControlPointLattice};

    fn metadata(angles: (f64, f64, f64), origin: [f64; 3], reflect: bool) -> ImageMetadata<3> {
        let mut axes = rotation_matrix(angles.0, angles.1, angles.2);
        if reflect {
            axes.column_mut(2).neg_mut();
        }
        ImageMetadata::new(Point::new(origin), Spacing::new([1.25, 0.8, 4.0]), Direction(axes))
    }

    fn close(a: &Point<3>, b: &Point<3>, tol: f64) -> bool {
        a.distance(b) < tol
    }

    proptest! {
        #[test]
        fn normalize_then_denormalize_is_identity(
            rx in -3.1f64..3.1, ry in -1.5f64..1.5, rz in -3.1f64..3.1,
            ox in -100f64..100.0, oy in -100f64..100.0, oz in -100f64..100.0,
            reflect in any::<bool>(), swap in any::<bool>(),
        ) {
            let size = [17, 12, 9];
            let native = metadata((rx, ry, rz), [ox, oy, oz], reflect);
            let orient = OrientationTransform::from_metadata(&native, size, swap);

            let normalized = orient.normalized_metadata(&native, size);
            prop_assert_eq!(normalized.direction(), &canonical_axes(swap));
            prop_assert!(normalized.center(size).distance(&Point::origin()) < 1e-9);

            let restored = orient.denormalize_metadata(&normalized);
            prop_assert!(close(restored.origin(), native.origin(), 1e-8));
            for r in 0..3 {
                for c in 0..3 {
                    prop_assert!((restored.direction()[(r, c)] - native.direction()[(r, c)]).abs() < 1e-9);
                }
            }

            let p = Point::new([ox * 0.5, oz, oy - 3.0]);
            prop_assert!(close(&orient.apply_inverse(&orient.apply(&p)), &p, 1e-8));
        }

        #[test]
        fn voxels_keep_their_position_relative_to_the_frame(
            rx in -3.1f64..3.1, ry in -1.5f64..1.5, rz in -3.1f64..3.1,
            i in 0.0f64..16.0, j in 0.0f64..11.0, k in 0.0f64..8.0,
            swap in any::<bool>(),
        ) {
            let size = [17, 12, 9];
            let native = metadata((rx, ry, rz), [10.0, -20.0, 5.0], false);
            let orient = OrientationTransform::from_metadata(&native, size, swap);
            let normalized = orient.normalized_metadata(&native, size);

            let index = Point::new([i, j, k]);
            let mapped = orient.apply(&native.index_to_world(&index));
            prop_assert!(close(&mapped, &normalized.index_to_world(&index), 1e-8));
        }

        #[test]
        fn free_form_reanchoring_is_a_similarity(
            rx in -3.1f64..3.1, ry in -1.5f64..1.5, rz in -3.1f64..3.1,
            nx in 2usize..24, ny in 2usize..24, nz in 2usize..10,
            spacing in 2.0f64..12.0,
            swap in any::<bool>(),
            u in 0.0f64..1.0, v in 0.0f64..1.0, w in 0.0f64..1.0,
        ) {
            let size = [nx, ny, nz];
            let native = metadata((rx, ry, rz), [12.0, 4.0, -7.0], false);
            let orient = OrientationTransform::from_metadata(&native, size, swap);
            let normalized = orient.normalized_metadata(&native, size);

            let mut lattice = ControlPointLattice::covering(&normalized, size, spacing);
            let count = lattice.num_control_points() as f64;
            for (n, d) in lattice.displacements_mut().iter_mut().enumerate() {
                let t = n as f64;
                *d = Vector::new([t.sin(), 0.5 * t.cos(), 0.1 * t / count]);
            }
            let fitted = FreeFormTransform::new(lattice).with_active_axis(0);
            let anchored = orient.to_native_free_form(&fitted);
            prop_assert_eq!(anchored.active_axis(), None);
            prop_assert_eq!(anchored.lattice().dims(), fitted.lattice().dims());

            let [cx, cy, cz] = fitted.lattice().dims();
            for k in 0..cz {
                for j in 0..cy {
                    for i in 0..cx {
                        let before = fitted.lattice().control_point_position(i, j, k);
                        let after = anchored.lattice().control_point_position(i, j, k);
                        prop_assert!(close(&after, &orient.apply_inverse(&before), 1e-8));
                    }
                }
            }

            // Lattice axes follow the native image axes.
            let axes = anchored.lattice().geometry().direction();
            let expected = native.direction().inner() * canonical_axes(swap).inner().transpose()
                * fitted.lattice().geometry().direction().inner();
            for r in 0..3 {
                for c in 0..3 {
                    prop_assert!((axes[(r, c)] - expected[(r, c)]).abs() < 1e-9);
                }
            }

            let index = Point::new([u * (nx - 1) as f64, v * (ny - 1) as f64, w * (nz - 1) as f64]);
            let p = native.index_to_world(&index);
            let expected = orient.apply_inverse(&fitted.transform_point(&orient.apply(&p)));
            prop_assert!(close(&anchored.transform_point(&p), &expected, 1e-8));
        }
    }

    #[test]
    fn test_swap_sends_image_y_to_world_x() {
        let size = [8, 8, 4];
        let native = metadata((0.0, 0.0, 0.0), [0.0; 3], false);
        let orient = OrientationTransform::from_metadata(&native, size, true);
        let step = orient.apply(&native.index_to_world(&Point::new([0.0, 1.0, 0.0])))
            - orient.apply(&native.index_to_world(&Point::new([0.0, 0.0, 0.0])));
        assert!((step[0] - 0.8).abs() < 1e-12);
        assert!(step[1].abs() < 1e-12);
    }

    #[test]
    fn test_matrix_agrees_with_apply() {
        let native = metadata((0.3, -0.2, 1.1), [4.0, 5.0, -6.0], false);
        let orient = OrientationTransform::from_metadata(&native, [10, 10, 10], true);
        let p = Point::new([1.0, 2.0, 3.0]);
        let by_matrix = Point(orient.matrix().transform_point(&p.0));
        assert!(close(&by_matrix, &orient.apply(&p), 1e-9));
        let by_affine = orient.to_affine().transform_point(&p);
        assert!(close(&by_affine, &orient.apply(&p), 1e-9));
        assert!((orient.matrix() * orient.inverse_matrix() - Matrix4::identity()).norm() < 1e-12);
    }

    #[test]
    fn test_native_affine_is_conjugate() {
        let native = metadata((0.4, 0.1, -0.7), [3.0, -2.0, 8.0], false);
        let orient = OrientationTransform::from_metadata(&native, [20, 16, 6], false);

        let mut fitted = AffineTransform::identity();
        fitted.set_parameter(AffineParameter::Tx.index(), 1.5);
        fitted.set_parameter(AffineParameter::Sx.index(), 1.05);
        fitted.set_parameter(AffineParameter::Sxy.index(), 0.02);

        let in_native = orient.to_native_affine(&fitted);
        let p = Point::new([7.0, -1.0, 2.5]);
        let expected = orient.apply_inverse(&fitted.transform_point(&orient.apply(&p)));
        assert!(close(&in_native.transform_point(&p), &expected, 1e-8));
    }
}
