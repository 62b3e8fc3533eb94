// Vector math for embedding-based scoring

use crate::error::{RankingError, Result};

/// L2 norm
pub fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale a vector to unit length.
///
/// A zero vector has no direction and is returned unchanged (all zeros).
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let n = norm(v);
    if n <= f32::EPSILON {
        return v.to_vec();
    }
    scale(v, 1.0 / n)
}

pub fn dot_product(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(RankingError::DimensionMismatch(a.len(), b.len()));
    }
    Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
}

pub fn scale(v: &[f32], factor: f32) -> Vec<f32> {
    v.iter().map(|x| x * factor).collect()
}

/// Element-wise sum. Returns an empty vector for an empty input.
pub fn vector_sum<V: AsRef<[f32]>>(vectors: &[V]) -> Result<Vec<f32>> {
    let Some(first) = vectors.first() else {
        return Ok(Vec::new());
    };

    let mut sum = first.as_ref().to_vec();
    for v in &vectors[1..] {
        let v = v.as_ref();
        if v.len() != sum.len() {
            return Err(RankingError::DimensionMismatch(sum.len(), v.len()));
        }
        for (acc, x) in sum.iter_mut().zip(v.iter()) {
            *acc += x;
        }
    }
    Ok(sum)
}

/// Cosine similarity in [-1, 1]; 0 when either side has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    let dot = dot_product(a, b)?;
    let denom = norm(a) * norm(b);
    if denom <= f32::EPSILON {
        return Ok(0.0);
    }
    Ok((dot / denom).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_and_normalize() {
        assert!((norm(&[3.0, 4.0]) - 5.0).abs() < 1e-6);

        let unit = normalize(&[3.0, 4.0]);
        assert!((unit[0] - 0.6).abs() < 1e-6);
        assert!((unit[1] - 0.8).abs() < 1e-6);
        assert!((norm(&unit) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector() {
        assert_eq!(normalize(&[0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_dot_product_length_mismatch() {
        let result = dot_product(&[1.0, 2.0], &[1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(RankingError::DimensionMismatch(2, 3))));
    }

    #[test]
    fn test_vector_sum() {
        let sum = vector_sum(&[vec![1.0, 2.0], vec![0.5, -1.0], vec![0.0, 1.0]]).unwrap();
        assert_eq!(sum, vec![1.5, 2.0]);

        let empty: Vec<Vec<f32>> = Vec::new();
        assert!(vector_sum(&empty).unwrap().is_empty());

        assert!(vector_sum(&[vec![1.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_cosine_similarity_identity() {
        let v = [0.3, -1.2, 4.0, 0.01];
        let neg: Vec<f32> = v.iter().map(|x| -x).collect();

        assert!((cosine_similarity(&v, &v).unwrap() - 1.0).abs() < 1e-5);
        assert!((cosine_similarity(&v, &neg).unwrap() + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let sim = cosine_similarity(&[1.0, 0.0, 2.0], &[0.0, 5.0, 0.0]).unwrap();
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).unwrap(), 0.0);
    }
}
