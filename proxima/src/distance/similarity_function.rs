use crate::data::DoubleVector;

/// A pure two-argument similarity; larger means more alike.
pub trait SimilarityFunction<O>: Send + Sync {
    fn similarity(&self, a: &O, b: &O) -> f64;

    /// Stable name including all parameters.
    fn descriptor(&self) -> String;
}

/// Dot product of two vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearKernelSimilarity;

impl SimilarityFunction<DoubleVector> for LinearKernelSimilarity {
    fn similarity(&self, a: &DoubleVector, b: &DoubleVector) -> f64 {
        a.dot(b)
    }

    fn descriptor(&self) -> String {
        "LinearKernel".to_string()
    }
}

/// Cosine of the angle between two vectors; zero vectors have similarity 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineSimilarity;

impl SimilarityFunction<DoubleVector> for CosineSimilarity {
    fn similarity(&self, a: &DoubleVector, b: &DoubleVector) -> f64 {
        let norms = a.norm() * b.norm();
        if norms == 0.0 {
            return 0.0;
        }
        a.dot(b) / norms
    }

    fn descriptor(&self) -> String {
        "CosineSimilarity".to_string()
    }
}
