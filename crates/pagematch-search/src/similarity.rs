//! Pairwise chunk similarities shared by Stage 1 and Stage 2.
//!
//! Stage 1 needs only the best pair, Stage 2 needs every pair above the
//! chunk match threshold. The matrix is computed once in Stage 1 and
//! carried with each surviving candidate.

use pagematch_core::{cosine_similarity, Chunk, Result};

/// One (source chunk, candidate chunk) pair at or above the threshold, by
/// position in the respective chunk slices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignedPair {
    pub source: usize,
    pub target: usize,
    pub similarity: f32,
}

/// Outcome of thresholding a [`SimilarityMatrix`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alignment {
    pub pairs: Vec<AlignedPair>,
    /// Highest similarity over all pairs, aligned or not
    pub best_similarity: f32,
}

/// Cosine similarity of every source chunk against every candidate chunk,
/// row-major by source chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f32>,
}

impl SimilarityMatrix {
    /// Fails when the two sides have different vector dimensions.
    pub fn compute(source: &[Chunk], target: &[Chunk]) -> Result<Self> {
        let mut values = Vec::with_capacity(source.len() * target.len());
        for s in source {
            for t in target {
                values.push(cosine_similarity(
                    s.embedding.as_slice(),
                    t.embedding.as_slice(),
                )?);
            }
        }
        Ok(Self {
            rows: source.len(),
            cols: target.len(),
            values,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, source: usize, target: usize) -> Option<f32> {
        if source >= self.rows || target >= self.cols {
            return None;
        }
        self.values.get(source * self.cols + target).copied()
    }

    /// Best pair, floored at 0; 0 when either side had no chunks.
    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }

    /// Pairs with similarity `>= threshold`, in row-major order.
    pub fn align(&self, threshold: f32) -> Alignment {
        let mut alignment = Alignment {
            pairs: Vec::new(),
            best_similarity: self.max(),
        };
        for (i, &similarity) in self.values.iter().enumerate() {
            if similarity >= threshold {
                alignment.pairs.push(AlignedPair {
                    source: i / self.cols,
                    target: i % self.cols,
                    similarity,
                });
            }
        }
        alignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagematch_core::{Error, Vector};
    use uuid::Uuid;

    fn chunk(index: u32, embedding: Vec<f32>) -> Chunk {
        Chunk {
            document_id: Uuid::nil(),
            chunk_index: index,
            embedding: Vector::from(embedding),
            start_page: 1,
            end_page: 1,
            character_count: 10,
        }
    }

    #[test]
    fn test_matrix_layout_and_align() {
        let source = vec![chunk(0, vec![1.0, 0.0]), chunk(1, vec![0.0, 1.0])];
        let target = vec![
            chunk(0, vec![0.0, 1.0]),
            chunk(1, vec![1.0, 0.0]),
            chunk(2, vec![0.6, 0.8]),
        ];
        let matrix = SimilarityMatrix::compute(&source, &target).unwrap();
        assert_eq!((matrix.rows(), matrix.cols()), (2, 3));
        assert!((matrix.get(1, 2).unwrap() - 0.8).abs() < 1e-5);
        assert_eq!(matrix.get(2, 0), None);

        let alignment = matrix.align(0.75);
        let pairs: Vec<(usize, usize)> =
            alignment.pairs.iter().map(|p| (p.source, p.target)).collect();
        assert_eq!(pairs, vec![(0, 1), (1, 0), (1, 2)]);
        assert!((alignment.best_similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_side_scores_zero() {
        let source = vec![chunk(0, vec![1.0, 0.0])];
        let matrix = SimilarityMatrix::compute(&source, &[]).unwrap();
        assert_eq!(matrix.max(), 0.0);
        assert!(matrix.align(0.0).pairs.is_empty());
    }

    #[test]
    fn test_negative_similarity_floors_at_zero() {
        let matrix =
            SimilarityMatrix::compute(&[chunk(0, vec![1.0, 0.0])], &[chunk(0, vec![-1.0, 0.0])])
                .unwrap();
        assert_eq!(matrix.max(), 0.0);
    }

    #[test]
    fn test_dimension_mismatch_fails() {
        let err = SimilarityMatrix::compute(&[chunk(0, vec![1.0, 0.0])], &[chunk(0, vec![1.0])]);
        assert!(matches!(err, Err(Error::InvalidInput(_))));
    }
}
