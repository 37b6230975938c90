//! Iterates that the fixed-point driver can work with.
//!
//! A scalar problem iterates an `f64`; a system iterates a fixed-length
//! nalgebra vector. The driver only needs the difference of two iterates and
//! a norm of that difference, so the same loop serves both.

use nalgebra::{DVector, SVector};
use std::fmt::Debug;

pub trait State: Clone + Debug {
    /// Returns `self - other`.
    fn difference(&self, other: &Self) -> Self;

    /// Absolute value for scalars, Euclidean norm for vectors.
    fn magnitude(&self) -> f64;

    /// True when every component is finite.
    fn is_finite(&self) -> bool;
}

impl State for f64 {
    fn difference(&self, other: &Self) -> Self {
        self - other
    }

    fn magnitude(&self) -> f64 {
        self.abs()
    }

    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }
}

impl State for DVector<f64> {
    fn difference(&self, other: &Self) -> Self {
        self - other
    }

    fn magnitude(&self) -> f64 {
        self.norm()
    }

    fn is_finite(&self) -> bool {
        self.iter().all(|v| v.is_finite())
    }
}

impl<const D: usize> State for SVector<f64, D> {
    fn difference(&self, other: &Self) -> Self {
        self - other
    }

    fn magnitude(&self) -> f64 {
        self.norm()
    }

    fn is_finite(&self) -> bool {
        self.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::State;
    use nalgebra::{DVector, Vector2};

    #[test]
    fn scalar_magnitude_is_absolute_value() {
        assert_eq!(1.5_f64.difference(&4.0).magnitude(), 2.5);
        assert!(!State::is_finite(&f64::NAN));
    }

    #[test]
    fn vector_magnitude_is_euclidean() {
        let a = DVector::from_vec(vec![4.0, 5.0]);
        let b = DVector::from_vec(vec![1.0, 1.0]);
        assert!((a.difference(&b).magnitude() - 5.0).abs() < 1e-15);

        let c = Vector2::new(f64::INFINITY, 0.0);
        assert!(!State::is_finite(&c));
        assert!(State::is_finite(&Vector2::<f64>::new(3.0, 4.0)));
        assert!((Vector2::<f64>::new(3.0, 4.0).magnitude() - 5.0).abs() < 1e-15);
    }
}
