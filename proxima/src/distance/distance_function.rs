use crate::data::{DoubleVector, HyperBoundingBox, SpatialComparable};

/// A pure two-argument distance.
///
/// Two functions are considered the same function when their
/// [`descriptor`](DistanceFunction::descriptor)s are equal; indexes rely on
/// this to decide whether they can answer a query.
pub trait DistanceFunction<O>: Send + Sync {
    fn distance(&self, a: &O, b: &O) -> f64;

    /// Stable name including all parameters, e.g. `LpNormDistance(p=3)`.
    fn descriptor(&self) -> String;

    /// Whether the triangle inequality holds.
    fn is_metric(&self) -> bool {
        false
    }

    fn is_symmetric(&self) -> bool {
        true
    }
}

/// Distance over vectors with a lower bound for whole rectangles.
///
/// `min_dist(mbr, q)` never exceeds `distance(p, q)` for any point `p`
/// inside `mbr`, which makes branch-and-bound pruning exact.
pub trait SpatialDistanceFunction: DistanceFunction<DoubleVector> {
    fn min_dist(&self, mbr: &HyperBoundingBox, point: &DoubleVector) -> f64;
}

/// Per-dimension gap between a coordinate and an interval.
fn gap(mbr: &HyperBoundingBox, point: &DoubleVector, dimension: usize) -> f64 {
    let value = point[dimension];
    let lo = mbr.min(dimension);
    let hi = mbr.max(dimension);
    if value < lo {
        lo - value
    } else if value > hi {
        value - hi
    } else {
        0.0
    }
}

fn dims(a: &DoubleVector, b: &DoubleVector) -> usize {
    a.dimensionality().min(b.dimensionality())
}

fn box_dims(mbr: &HyperBoundingBox, point: &DoubleVector) -> usize {
    mbr.dimensionality().min(point.dimensionality())
}

/// Euclidean (L2) distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanDistance;

impl DistanceFunction<DoubleVector> for EuclideanDistance {
    fn distance(&self, a: &DoubleVector, b: &DoubleVector) -> f64 {
        let mut sum = 0.0;
        for d in 0..dims(a, b) {
            let delta = (a[d] - b[d]).abs();
            sum += delta * delta;
        }
        sum.sqrt()
    }

    fn descriptor(&self) -> String {
        "EuclideanDistance".to_string()
    }

    fn is_metric(&self) -> bool {
        true
    }
}

impl SpatialDistanceFunction for EuclideanDistance {
    fn min_dist(&self, mbr: &HyperBoundingBox, point: &DoubleVector) -> f64 {
        let mut sum = 0.0;
        for d in 0..box_dims(mbr, point) {
            let delta = gap(mbr, point, d);
            sum += delta * delta;
        }
        sum.sqrt()
    }
}

/// Squared Euclidean distance; not a metric but order-equivalent to L2.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredEuclideanDistance;

impl DistanceFunction<DoubleVector> for SquaredEuclideanDistance {
    fn distance(&self, a: &DoubleVector, b: &DoubleVector) -> f64 {
        let mut sum = 0.0;
        for d in 0..dims(a, b) {
            let delta = (a[d] - b[d]).abs();
            sum += delta * delta;
        }
        sum
    }

    fn descriptor(&self) -> String {
        "SquaredEuclideanDistance".to_string()
    }
}

impl SpatialDistanceFunction for SquaredEuclideanDistance {
    fn min_dist(&self, mbr: &HyperBoundingBox, point: &DoubleVector) -> f64 {
        let mut sum = 0.0;
        for d in 0..box_dims(mbr, point) {
            let delta = gap(mbr, point, d);
            sum += delta * delta;
        }
        sum
    }
}

/// Manhattan (L1) distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManhattanDistance;

impl DistanceFunction<DoubleVector> for ManhattanDistance {
    fn distance(&self, a: &DoubleVector, b: &DoubleVector) -> f64 {
        let mut sum = 0.0;
        for d in 0..dims(a, b) {
            sum += (a[d] - b[d]).abs();
        }
        sum
    }

    fn descriptor(&self) -> String {
        "ManhattanDistance".to_string()
    }

    fn is_metric(&self) -> bool {
        true
    }
}

impl SpatialDistanceFunction for ManhattanDistance {
    fn min_dist(&self, mbr: &HyperBoundingBox, point: &DoubleVector) -> f64 {
        let mut sum = 0.0;
        for d in 0..box_dims(mbr, point) {
            sum += gap(mbr, point, d);
        }
        sum
    }
}

/// Maximum (L-infinity) distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaximumDistance;

impl DistanceFunction<DoubleVector> for MaximumDistance {
    fn distance(&self, a: &DoubleVector, b: &DoubleVector) -> f64 {
        let mut max = 0.0f64;
        for d in 0..dims(a, b) {
            max = max.max((a[d] - b[d]).abs());
        }
        max
    }

    fn descriptor(&self) -> String {
        "MaximumDistance".to_string()
    }

    fn is_metric(&self) -> bool {
        true
    }
}

impl SpatialDistanceFunction for MaximumDistance {
    fn min_dist(&self, mbr: &HyperBoundingBox, point: &DoubleVector) -> f64 {
        let mut max = 0.0f64;
        for d in 0..box_dims(mbr, point) {
            max = max.max(gap(mbr, point, d));
        }
        max
    }
}

/// General Lp norm distance, a metric for `p >= 1`.
#[derive(Debug, Clone, Copy)]
pub struct LpNormDistance {
    p: f64,
}

impl LpNormDistance {
    pub fn new(p: f64) -> Self {
        LpNormDistance { p }
    }

    pub fn p(&self) -> f64 {
        self.p
    }
}

impl DistanceFunction<DoubleVector> for LpNormDistance {
    fn distance(&self, a: &DoubleVector, b: &DoubleVector) -> f64 {
        let mut sum = 0.0;
        for d in 0..dims(a, b) {
            sum += (a[d] - b[d]).abs().powf(self.p);
        }
        sum.powf(1.0 / self.p)
    }

    fn descriptor(&self) -> String {
        format!("LpNormDistance(p={})", self.p)
    }

    fn is_metric(&self) -> bool {
        self.p >= 1.0
    }
}

impl SpatialDistanceFunction for LpNormDistance {
    fn min_dist(&self, mbr: &HyperBoundingBox, point: &DoubleVector) -> f64 {
        let mut sum = 0.0;
        for d in 0..box_dims(mbr, point) {
            sum += gap(mbr, point, d).powf(self.p);
        }
        sum.powf(1.0 / self.p)
    }
}

/// Cosine distance `1 - cos(a, b)`; zero vectors are at distance 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineDistance;

impl DistanceFunction<DoubleVector> for CosineDistance {
    fn distance(&self, a: &DoubleVector, b: &DoubleVector) -> f64 {
        let norms = a.norm() * b.norm();
        if norms == 0.0 {
            return 1.0;
        }
        let distance = 1.0 - a.dot(b) / norms;
        distance.max(0.0)
    }

    fn descriptor(&self) -> String {
        "CosineDistance".to_string()
    }
}
