use std::fmt::{Display, Formatter};

use smallvec::SmallVec;

use crate::errors::{ErrorKind, ProximaError, ProximaResult};

/// Coordinates stored inline for up to four dimensions.
pub type Coordinates = SmallVec<[f64; 4]>;

/// Anything with an axis-aligned extent in every dimension.
///
/// A point has `min(d) == max(d)` in every dimension.
pub trait SpatialComparable {
    fn dimensionality(&self) -> usize;

    fn min(&self, dimension: usize) -> f64;

    fn max(&self, dimension: usize) -> f64;
}

/// Axis-aligned minimum bounding rectangle in any number of dimensions.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HyperBoundingBox {
    min: Coordinates,
    max: Coordinates,
}

impl HyperBoundingBox {
    /// Creates a box from its corners.
    ///
    /// Fails when the corners differ in dimensionality or a minimum exceeds
    /// the matching maximum.
    pub fn new(min: &[f64], max: &[f64]) -> ProximaResult<Self> {
        if min.len() != max.len() {
            return Err(ProximaError::new(
                &format!(
                    "Corner dimensionality differs: {} vs {}",
                    min.len(),
                    max.len()
                ),
                ErrorKind::DimensionalityMismatch,
            ));
        }
        if min.iter().zip(max.iter()).any(|(lo, hi)| lo > hi) {
            return Err(ProximaError::new(
                "Minimum corner exceeds maximum corner",
                ErrorKind::ValidationError,
            ));
        }
        Ok(HyperBoundingBox {
            min: Coordinates::from_slice(min),
            max: Coordinates::from_slice(max),
        })
    }

    /// Degenerate box covering exactly one point or the extent of `item`.
    pub fn from_spatial<S: SpatialComparable + ?Sized>(item: &S) -> Self {
        let dim = item.dimensionality();
        HyperBoundingBox {
            min: (0..dim).map(|d| item.min(d)).collect(),
            max: (0..dim).map(|d| item.max(d)).collect(),
        }
    }

    /// Minimal box around all items, `None` for an empty input.
    pub fn union_of<'a, I>(boxes: I) -> Option<HyperBoundingBox>
    where
        I: IntoIterator<Item = &'a HyperBoundingBox>,
    {
        let mut iter = boxes.into_iter();
        let mut result = iter.next()?.clone();
        for other in iter {
            result.expand(other);
        }
        Some(result)
    }

    pub fn min_corner(&self) -> &[f64] {
        &self.min
    }

    pub fn max_corner(&self) -> &[f64] {
        &self.max
    }

    pub fn center(&self, dimension: usize) -> f64 {
        (self.min[dimension] + self.max[dimension]) / 2.0
    }

    pub fn volume(&self) -> f64 {
        self.min
            .iter()
            .zip(self.max.iter())
            .map(|(lo, hi)| hi - lo)
            .product()
    }

    /// Sum of the edge lengths.
    pub fn margin(&self) -> f64 {
        self.min
            .iter()
            .zip(self.max.iter())
            .map(|(lo, hi)| hi - lo)
            .sum()
    }

    pub fn intersects(&self, other: &HyperBoundingBox) -> bool {
        (0..self.min.len()).all(|d| self.min[d] <= other.max[d] && self.max[d] >= other.min[d])
    }

    pub fn contains(&self, other: &HyperBoundingBox) -> bool {
        (0..self.min.len()).all(|d| self.min[d] <= other.min[d] && self.max[d] >= other.max[d])
    }

    pub fn contains_point(&self, point: &[f64]) -> bool {
        point.len() == self.min.len()
            && point
                .iter()
                .enumerate()
                .all(|(d, value)| self.min[d] <= *value && *value <= self.max[d])
    }

    /// Volume of the intersection, zero for disjoint boxes.
    pub fn overlap(&self, other: &HyperBoundingBox) -> f64 {
        let mut volume = 1.0;
        for d in 0..self.min.len() {
            let lo = self.min[d].max(other.min[d]);
            let hi = self.max[d].min(other.max[d]);
            if lo > hi {
                return 0.0;
            }
            volume *= hi - lo;
        }
        volume
    }

    pub fn union(&self, other: &HyperBoundingBox) -> HyperBoundingBox {
        let mut result = self.clone();
        result.expand(other);
        result
    }

    pub fn expand(&mut self, other: &HyperBoundingBox) {
        for d in 0..self.min.len() {
            if other.min[d] < self.min[d] {
                self.min[d] = other.min[d];
            }
            if other.max[d] > self.max[d] {
                self.max[d] = other.max[d];
            }
        }
    }

    /// Volume increase needed to also cover `other`.
    pub fn enlargement(&self, other: &HyperBoundingBox) -> f64 {
        self.union(other).volume() - self.volume()
    }
}

impl SpatialComparable for HyperBoundingBox {
    fn dimensionality(&self) -> usize {
        self.min.len()
    }

    fn min(&self, dimension: usize) -> f64 {
        self.min[dimension]
    }

    fn max(&self, dimension: usize) -> f64 {
        self.max[dimension]
    }
}

impl Display for HyperBoundingBox {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?} - {:?}]", self.min.as_slice(), self.max.as_slice())
    }
}
