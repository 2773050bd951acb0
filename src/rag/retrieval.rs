//! Top-k retrieval over stored chunk embeddings.
//!
//! Reference behavior is an exact brute-force cosine scan over every stored
//! chunk. The ranking interface is index-agnostic, so an approximate
//! nearest-neighbor index can replace the scan later without touching any
//! other component.

use std::cmp::Ordering;

use super::store::DocumentChunk;
use super::types::RetrievalItem;
use crate::core::errors::ApiError;

pub const SNIPPET_TARGET_CHARS: usize = 350;
const ELLIPSIS: &str = "...";

/// Cosine similarity with f64 accumulation.
///
/// Returns 0.0 when either vector has zero norm. A dimension mismatch is a
/// programming error in the ingestion/embedding contract and fails fast
/// instead of silently scoring zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, ApiError> {
    if a.len() != b.len() {
        return Err(ApiError::Internal(format!(
            "embedding dimension mismatch: {} != {}",
            a.len(),
            b.len()
        )));
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if norm_a <= f64::EPSILON || norm_b <= f64::EPSILON {
        return Ok(0.0);
    }

    Ok((dot / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

/// Score every chunk against the query embedding and keep the top `k`.
///
/// The sort is stable and descending, so equal scores keep the chunk store's
/// enumeration order. `k` larger than the candidate count returns all
/// candidates.
pub fn rank_top_k(
    query_embedding: &[f32],
    chunks: &[DocumentChunk],
    k: usize,
) -> Result<Vec<RetrievalItem>, ApiError> {
    if chunks.is_empty() {
        return Err(ApiError::NoCandidates);
    }

    let mut items = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let score = cosine_similarity(query_embedding, &chunk.embedding)?;
        items.push(RetrievalItem {
            document_id: chunk.document_id,
            chunk_index: chunk.chunk_index,
            score,
            snippet: make_snippet(&chunk.content),
        });
    }

    items.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    items.truncate(k);
    Ok(items)
}

/// Excerpt centered on the chunk content, at most `SNIPPET_TARGET_CHARS`
/// characters, with ellipsis markers on truncated sides.
fn make_snippet(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    if chars.len() <= SNIPPET_TARGET_CHARS {
        return content.to_string();
    }

    let start = (chars.len() - SNIPPET_TARGET_CHARS) / 2;
    let end = start + SNIPPET_TARGET_CHARS;

    let mut snippet = String::new();
    if start > 0 {
        snippet.push_str(ELLIPSIS);
    }
    snippet.extend(&chars[start..end]);
    if end < chars.len() {
        snippet.push_str(ELLIPSIS);
    }
    snippet
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn approx_eq(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    fn chunk(index: i64, content: &str, embedding: Vec<f32>) -> DocumentChunk {
        DocumentChunk {
            document_id: Uuid::parse_str("aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa").expect("uuid"),
            chunk_index: index,
            content: content.to_string(),
            embedding,
        }
    }

    #[test]
    fn cosine_is_one_for_identical_vectors() {
        let vec = vec![1.0, 2.0, 3.0, 4.0];
        let score = cosine_similarity(&vec, &vec).expect("cosine");
        assert!(approx_eq(score, 1.0));
    }

    #[test]
    fn cosine_is_zero_for_zero_norm() {
        let score = cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).expect("cosine");
        assert!(approx_eq(score, 0.0));
        let score = cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]).expect("cosine");
        assert!(approx_eq(score, 0.0));
    }

    #[test]
    fn cosine_fails_fast_on_dimension_mismatch() {
        let err = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn ranking_returns_highest_similarity_first() {
        let chunks = vec![
            chunk(0, "a", vec![0.8, 0.2]),
            chunk(1, "b", vec![0.1, 0.9]),
            chunk(2, "c", vec![0.9, 0.0]),
        ];
        let ranked = rank_top_k(&[1.0, 0.0], &chunks, 3).expect("rank");

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].chunk_index, 2);
        assert_eq!(ranked[2].chunk_index, 1);
    }

    #[test]
    fn ties_keep_enumeration_order() {
        let chunks = vec![
            chunk(0, "first", vec![1.0, 0.0]),
            chunk(1, "second", vec![2.0, 0.0]),
            chunk(2, "third", vec![3.0, 0.0]),
        ];
        let ranked = rank_top_k(&[1.0, 0.0], &chunks, 3).expect("rank");

        // All score 1.0; stable sort preserves store order.
        let order: Vec<i64> = ranked.iter().map(|item| item.chunk_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn k_beyond_candidate_count_returns_all() {
        let chunks = vec![chunk(0, "only", vec![1.0, 0.0])];
        let ranked = rank_top_k(&[1.0, 0.0], &chunks, 20).expect("rank");
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn empty_collection_is_no_candidates() {
        let err = rank_top_k(&[1.0, 0.0], &[], 5).unwrap_err();
        assert!(matches!(err, ApiError::NoCandidates));
    }

    #[test]
    fn short_content_is_returned_whole() {
        let chunks = vec![chunk(0, "short text", vec![1.0])];
        let ranked = rank_top_k(&[1.0], &chunks, 1).expect("rank");
        assert_eq!(ranked[0].snippet, "short text");
    }

    #[test]
    fn long_content_is_centered_and_marked() {
        let content = "x".repeat(1000);
        let chunks = vec![chunk(0, &content, vec![1.0])];
        let ranked = rank_top_k(&[1.0], &chunks, 1).expect("rank");

        let snippet = &ranked[0].snippet;
        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
        assert_eq!(snippet.chars().count(), SNIPPET_TARGET_CHARS + 6);
    }
}
