//! Exact in-memory nearest-neighbor index.

use crate::types::VectorIndexEntry;

/// Brute-force cosine search over every entry.
#[derive(Debug, Clone, Default)]
pub struct FlatIndex {
    entries: Vec<VectorIndexEntry>,
}

impl FlatIndex {
    pub fn new(entries: Vec<VectorIndexEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[VectorIndexEntry] {
        &self.entries
    }

    /// Top `k` entries by cosine similarity, best first.
    ///
    /// Ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(&VectorIndexEntry, f32)> {
        let mut scored: Vec<(&VectorIndexEntry, f32)> = self
            .entries
            .iter()
            .map(|entry| (entry, cosine_similarity(query, &entry.embedding)))
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        tracing::debug!(
            "Flat search returned {} of {} entries (k={})",
            scored.len(),
            self.entries.len(),
            k
        );

        scored
    }
}

/// Calculate cosine similarity between two vectors.
///
/// Mismatched lengths and zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, ChunkMetadata};

    fn entry(id: &str, embedding: Vec<f32>) -> VectorIndexEntry {
        VectorIndexEntry {
            embedding,
            chunk: Chunk {
                id: id.to_string(),
                document_index: 0,
                source_ordinal: 0,
                text: id.to_string(),
                metadata: ChunkMetadata {
                    title: id.to_string(),
                    category: "General".to_string(),
                    permission: None,
                },
            },
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_search_orders_by_score() {
        let index = FlatIndex::new(vec![
            entry("cooking", vec![-0.3, -0.8, 0.4]),
            entry("rust", vec![1.0, 0.5, 0.2]),
            entry("systems", vec![0.7, 0.7, 0.0]),
        ]);

        let results = index.search(&[0.9, 0.4, 0.3], 2);
        let ids: Vec<&str> = results.iter().map(|(e, _)| e.chunk.id.as_str()).collect();

        assert_eq!(ids, vec!["rust", "systems"]);
        assert!(results[0].1 > results[1].1);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = FlatIndex::new(vec![
            entry("first", vec![1.0, 0.0]),
            entry("second", vec![2.0, 0.0]),
            entry("third", vec![3.0, 0.0]),
        ]);

        let results = index.search(&[1.0, 0.0], 3);
        let ids: Vec<&str> = results.iter().map(|(e, _)| e.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_k_larger_than_index() {
        let index = FlatIndex::new(vec![entry("only", vec![1.0])]);
        assert_eq!(index.search(&[1.0], 10).len(), 1);
        assert!(FlatIndex::default().search(&[1.0], 4).is_empty());
    }
}
