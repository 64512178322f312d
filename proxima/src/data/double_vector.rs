use std::fmt::{Debug, Display, Formatter};
use std::ops::Index;
use std::sync::Arc;

use crate::data::SpatialComparable;

/// Immutable, cheaply cloneable vector of `f64` coordinates.
///
/// Relations hand out clones of stored values, so the coordinates live behind
/// an `Arc` and cloning only bumps a reference count.
#[derive(Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DoubleVector {
    values: Arc<[f64]>,
}

impl DoubleVector {
    pub fn new(values: Vec<f64>) -> Self {
        DoubleVector {
            values: values.into(),
        }
    }

    pub fn dimensionality(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, dimension: usize) -> Option<f64> {
        self.values.get(dimension).copied()
    }

    pub fn dot(&self, other: &DoubleVector) -> f64 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }
}

impl From<Vec<f64>> for DoubleVector {
    fn from(values: Vec<f64>) -> Self {
        DoubleVector::new(values)
    }
}

impl From<&[f64]> for DoubleVector {
    fn from(values: &[f64]) -> Self {
        DoubleVector {
            values: values.into(),
        }
    }
}

impl<const N: usize> From<[f64; N]> for DoubleVector {
    fn from(values: [f64; N]) -> Self {
        DoubleVector::from(&values[..])
    }
}

impl Index<usize> for DoubleVector {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}

impl SpatialComparable for DoubleVector {
    fn dimensionality(&self) -> usize {
        self.values.len()
    }

    fn min(&self, dimension: usize) -> f64 {
        self.values[dimension]
    }

    fn max(&self, dimension: usize) -> f64 {
        self.values[dimension]
    }
}

impl Debug for DoubleVector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.values.iter()).finish()
    }
}

impl Display for DoubleVector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_access() {
        let v = DoubleVector::from([1.0, 2.0, 3.0]);
        assert_eq!(v.dimensionality(), 3);
        assert_eq!(v[1], 2.0);
        assert_eq!(v.get(3), None);
        assert_eq!(v.values(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_clone_shares_storage() {
        let v = DoubleVector::new(vec![1.0, 2.0]);
        let w = v.clone();
        assert!(Arc::ptr_eq(&v.values, &w.values));
    }

    #[test]
    fn test_dot_and_norm() {
        let v = DoubleVector::from([3.0, 4.0]);
        assert_eq!(v.dot(&DoubleVector::from([1.0, 1.0])), 7.0);
        assert_eq!(v.norm(), 5.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(DoubleVector::from([0.0, 1.5]).to_string(), "(0, 1.5)");
    }
}
