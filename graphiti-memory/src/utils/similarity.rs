//! Vector similarity functions used by the semantic rerank stage.

use ndarray::ArrayView1;

fn l2_norm(v: ArrayView1<f32>) -> f32 {
    v.dot(&v).sqrt()
}

/// Cosine similarity between two f32 slices.
///
/// Returns `0.0` for empty slices, mismatched lengths, or zero vectors,
/// otherwise a value in `[-1.0, 1.0]`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let a = ArrayView1::from(a);
    let b = ArrayView1::from(b);
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    a.dot(&b) / (norm_a * norm_b)
}

/// L2-normalize a vector into a new `Vec<f32>`.
///
/// A zero vector normalizes to a zero vector of the same length; empty
/// input yields an empty `Vec`.
pub fn normalize_l2(v: &[f32]) -> Vec<f32> {
    if v.is_empty() {
        return Vec::new();
    }

    let norm = l2_norm(ArrayView1::from(v));
    if norm == 0.0 {
        return vec![0.0; v.len()];
    }
    v.iter().map(|x| x / norm).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_cosine_identical_vectors() {
        let v = [1.0_f32, 2.0, 3.0];
        assert!(approx_eq(cosine_similarity(&v, &v), 1.0));
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        assert!(approx_eq(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0));
    }

    #[test]
    fn test_cosine_opposite_vectors() {
        let a = [1.0_f32, 0.0, 0.0];
        let b = [-1.0_f32, 0.0, 0.0];
        assert!(approx_eq(cosine_similarity(&a, &b), -1.0));
    }

    #[test]
    fn test_cosine_known_vectors() {
        // dot([3,4],[4,3]) = 24, norms are both 5, so 24/25 = 0.96.
        assert!(approx_eq(cosine_similarity(&[3.0, 4.0], &[4.0, 3.0]), 0.96));
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        let zero = [0.0_f32, 0.0, 0.0];
        assert_eq!(cosine_similarity(&zero, &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn test_normalize_l2_unit_magnitude() {
        let n = normalize_l2(&[3.0, 4.0]);
        let mag: f32 = n.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!(approx_eq(mag, 1.0));
        assert!(approx_eq(n[0], 0.6));
        assert!(approx_eq(n[1], 0.8));
    }

    #[test]
    fn test_normalize_l2_zero_vector() {
        assert_eq!(normalize_l2(&[0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_normalize_l2_empty() {
        assert!(normalize_l2(&[]).is_empty());
    }

    #[test]
    fn test_normalize_l2_idempotent() {
        let once = normalize_l2(&[1.0, 2.0, 2.0]);
        let twice = normalize_l2(&once);
        for (a, b) in once.iter().zip(&twice) {
            assert!(approx_eq(*a, *b));
        }
    }
}
