//! Vector math shared by every stage.

use crate::error::{Error, Result};

/// Cosine similarity between two equal-length vectors.
///
/// Returns 0.0 when either vector has zero norm. Dimension mismatch is an
/// error: vectors of different sizes come from different embedding spaces.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::InvalidInput(format!(
            "Vector dimension mismatch: {} != {}",
            a.len(),
            b.len()
        )));
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();

    let a_norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let b_norm: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if a_norm == 0.0 || b_norm == 0.0 {
        return Ok(0.0);
    }

    Ok((dot_product / (a_norm * b_norm)).clamp(-1.0, 1.0))
}
