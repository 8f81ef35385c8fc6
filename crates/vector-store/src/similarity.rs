use crate::error::{Result, VectorStoreError};

/// Cosine similarity of two vectors of equal length.
///
/// Returns `0.0` when either vector has zero magnitude. Norms and the dot product
/// are accumulated in `f64`; the result is clamped to `[-1, 1]`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(VectorStoreError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    #[allow(clippy::cast_possible_truncation)]
    let sim = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32;
    Ok(sim)
}

/// Best similarity between `query` and any of `candidates`.
///
/// `Ok(None)` when no candidate yields a finite similarity; the first dimension
/// mismatch is an error.
pub fn max_similarity<'a, I>(query: &[f32], candidates: I) -> Result<Option<f32>>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut best: Option<f32> = None;
    for candidate in candidates {
        let sim = cosine_similarity(query, candidate)?;
        if !sim.is_finite() {
            continue;
        }
        best = Some(best.map_or(sim, |b| b.max(sim)));
    }
    Ok(best)
}

/// Scale a vector to unit length in place (no-op for the zero vector)
pub fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn identical_and_orthogonal() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);

        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(sim.abs() < 1e-6);

        let sim = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).unwrap();
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&[], &[]).unwrap(), 0.0);
    }

    #[test]
    fn mismatch_is_an_error() {
        let err = cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::DimensionMismatch { left: 2, right: 3 }
        ));
    }

    #[test]
    fn max_similarity_picks_best_chunk() {
        let chunks: Vec<Vec<f32>> = vec![vec![0.0, 1.0], vec![1.0, 0.1], vec![-1.0, 0.0]];
        let best = max_similarity(&[1.0, 0.0], chunks.iter().map(Vec::as_slice))
            .unwrap()
            .unwrap();
        let expected = cosine_similarity(&[1.0, 0.0], &[1.0, 0.1]).unwrap();
        assert!((best - expected).abs() < 1e-6);

        assert_eq!(max_similarity(&[1.0], std::iter::empty()).unwrap(), None);
    }

    #[test]
    fn non_finite_candidates_are_ignored() {
        let query = [1.0, 0.0];
        let overflowed = [f32::INFINITY, 0.5];
        assert!(cosine_similarity(&query, &overflowed).unwrap().is_nan());
        assert_eq!(max_similarity(&query, [&overflowed[..]]).unwrap(), None);

        let best = max_similarity(&query, [&overflowed[..], &[1.0, 0.0][..]])
            .unwrap()
            .unwrap();
        assert!((best - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_yields_unit_length() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    fn vector_pair() -> impl Strategy<Value = (Vec<f32>, Vec<f32>)> {
        (1usize..32).prop_flat_map(|len| {
            (
                prop::collection::vec(-100.0f32..100.0, len),
                prop::collection::vec(-100.0f32..100.0, len),
            )
        })
    }

    proptest! {
        #[test]
        fn symmetric_and_bounded((a, b) in vector_pair()) {
            let ab = cosine_similarity(&a, &b).unwrap();
            let ba = cosine_similarity(&b, &a).unwrap();
            prop_assert!((ab - ba).abs() < 1e-6);
            prop_assert!((-1.0..=1.0).contains(&ab));
        }

        #[test]
        fn self_similarity_is_one(a in prop::collection::vec(-100.0f32..100.0, 1..32)) {
            prop_assume!(a.iter().any(|v| v.abs() > 1e-3));
            let sim = cosine_similarity(&a, &a).unwrap();
            prop_assert!((sim - 1.0).abs() < 1e-5);
        }
    }
}
