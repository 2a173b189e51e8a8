//! Vector similarity utilities.

use engram_core::artifact::Artifact;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal.
/// Returns 0.0 if either vector is zero-length, empty, or mismatched.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank artifacts by cosine similarity to a query embedding.
///
/// Returns artifacts sorted by descending similarity, `score` set to the
/// similarity value. Artifacts without embeddings or below `min_score` are
/// skipped.
pub fn rank_by_similarity(
    artifacts: &[Artifact],
    query_embedding: &[f32],
    limit: usize,
    min_score: f32,
) -> Vec<Artifact> {
    let mut scored: Vec<(f32, Artifact)> = artifacts
        .iter()
        .filter_map(|artifact| {
            let emb = artifact.embedding.as_ref()?;
            let sim = cosine_similarity(emb, query_embedding);
            if sim >= min_score {
                let mut a = artifact.clone();
                a.score = sim;
                Some((sim, a))
            } else {
                None
            }
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored.into_iter().map(|(_, a)| a).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(id: &str, embedding: Option<Vec<f32>>) -> Artifact {
        let mut a = Artifact::new(format!("Content for {id}"));
        a.id = id.into();
        a.embedding = embedding;
        a
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_empty_or_mismatched() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn cosine_known_value() {
        // [1,1] · [1,0] = 1, |[1,1]| = sqrt(2), |[1,0]| = 1 → ~0.7071
        let sim = cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]);
        assert!((sim - 0.7071).abs() < 0.001);
    }

    #[test]
    fn rank_orders_by_similarity() {
        let query = vec![1.0, 0.0, 0.0];
        let artifacts = vec![
            artifact("a", Some(vec![0.0, 1.0, 0.0])),
            artifact("b", Some(vec![1.0, 0.0, 0.0])),
            artifact("c", Some(vec![0.5, 0.5, 0.0])),
        ];
        let results = rank_by_similarity(&artifacts, &query, 10, 0.0);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "b");
        assert_eq!(results[1].id, "c");
        assert_eq!(results[2].id, "a");
    }

    #[test]
    fn rank_skips_missing_embeddings_and_respects_limit() {
        let query = vec![1.0, 0.0];
        let artifacts = vec![
            artifact("a", Some(vec![1.0, 0.0])),
            artifact("b", None),
            artifact("c", Some(vec![0.9, 0.1])),
        ];
        let results = rank_by_similarity(&artifacts, &query, 1, 0.0);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a");
    }

    #[test]
    fn rank_respects_min_score() {
        let query = vec![1.0, 0.0];
        let artifacts = vec![
            artifact("a", Some(vec![1.0, 0.0])),
            artifact("b", Some(vec![0.0, 1.0])),
        ];
        let results = rank_by_similarity(&artifacts, &query, 10, 0.5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a");
    }
}
