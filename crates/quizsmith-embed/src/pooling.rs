//! Sentence pooling over BERT token states.

use candle_core::Tensor;

/// Mean of the token states whose attention mask is set.
///
/// `hidden`: (batch, seq_len, dim), `mask`: (batch, seq_len) as F32.
/// Returns (batch, dim).
pub fn mean_pool(hidden: &Tensor, mask: &Tensor) -> candle_core::Result<Tensor> {
    let mask = mask.unsqueeze(2)?;
    let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
    let counts = mask.sum(1)?.clamp(1e-9f32, f32::MAX)?;
    summed.broadcast_div(&counts)
}

/// Scale every row of a (batch, dim) tensor to unit length.
pub fn normalize_rows(pooled: &Tensor) -> candle_core::Result<Tensor> {
    let norms = pooled.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-9f32, f32::MAX)?;
    pooled.broadcast_div(&norms)
}
