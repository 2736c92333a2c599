use anyhow::{ensure, Result};
use candle_core::{DType, Tensor};

/// Sentence vectors from token vectors: mean over the positions kept by
/// `attention_mask`, then unit length per row.
///
/// `hidden` is `[B, T, H]`, `attention_mask` is `[B, T]`; returns `[B, H]`.
/// A row with no kept positions pools to zeros.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, seq_len, hidden_dim) = hidden.dims3()?;
    ensure!(
        attention_mask.dims() == [batch, seq_len],
        "attention mask shape {:?} does not match hidden [{batch}, {seq_len}, _]",
        attention_mask.dims()
    );

    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?.unsqueeze(2)?;
    let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
    let kept = mask.sum(1)?.maximum(1f64)?;
    let pooled = l2_rows(&summed.broadcast_div(&kept)?)?;
    ensure!(pooled.dims() == [batch, hidden_dim], "pooled shape mismatch: {:?}", pooled.dims());
    Ok(pooled)
}

fn l2_rows(x: &Tensor) -> Result<Tensor> {
    let eps = if x.dtype() == DType::F16 { 1e-6 } else { 1e-12 };
    let norm = x.sqr()?.sum_keepdim(1)?.sqrt()?.affine(1.0, eps)?;
    Ok(x.broadcast_div(&norm)?)
}
