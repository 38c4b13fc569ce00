//! Vector similarity.

use crate::embeddings::EmbeddingVector;

/// Cosine similarity in `[-1, 1]`.
///
/// Returns `0.0` when the vectors differ in dimensionality or either has zero
/// magnitude, so callers never divide by zero.
#[must_use]
pub fn cosine_similarity(lhs: &EmbeddingVector, rhs: &EmbeddingVector) -> f32 {
    if lhs.len() != rhs.len() {
        return 0.0;
    }
    let denominator = lhs.magnitude() * rhs.magnitude();
    if denominator == 0.0 {
        0.0
    } else {
        (lhs.dot(rhs) / denominator).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(values: &[f32]) -> EmbeddingVector {
        EmbeddingVector::new(values.to_vec()).unwrap()
    }

    #[test]
    fn identical_vectors_score_one() {
        let v = vector(&[0.3, 0.4, 0.5]);
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        let score = cosine_similarity(&vector(&[1.0, 0.0]), &vector(&[0.0, 1.0]));
        assert!(score.abs() < f32::EPSILON);
    }

    #[test]
    fn zero_and_mismatched_vectors_score_zero() {
        let zero = EmbeddingVector::zeros(2);
        assert!(cosine_similarity(&zero, &vector(&[1.0, 1.0])).abs() < f32::EPSILON);
        assert!(cosine_similarity(&vector(&[1.0]), &vector(&[1.0, 1.0])).abs() < f32::EPSILON);
    }
}
