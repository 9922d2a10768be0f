//! Voxel and control-point spacing.

use super::Vector;

/// Physical distance between neighbouring samples along each axis.
///
/// Ordered (x, y, z) regardless of the `[Z, Y, X]` tensor layout.
pub type Spacing<const D: usize> = Vector<D>;

impl<const D: usize> Spacing<D> {
    /// Same spacing along every axis.
    pub fn uniform(value: f64) -> Self {
        Vector::new([value; D])
    }

    /// Smallest spacing component.
    pub fn min_spacing(&self) -> f64 {
        (0..D).map(|i| self[i]).fold(f64::INFINITY, f64::min)
    }

    /// Whether every component is finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        (0..D).all(|i| self[i].is_finite() && self[i] > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Spacing3 = Spacing<3>;

    #[test]
    fn test_spacing_uniform() {
        assert_eq!(Spacing3::uniform(1.5), Spacing3::new([1.5, 1.5, 1.5]));
    }

    #[test]
    fn test_spacing_validity_and_min() {
        let s = Spacing3::new([1.0, 0.5, 3.0]);
        assert!(s.is_valid());
        assert_eq!(s.min_spacing(), 0.5);
        assert!(!Spacing3::new([1.0, 0.0, 3.0]).is_valid());
    }
}
