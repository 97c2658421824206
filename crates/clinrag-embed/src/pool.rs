use anyhow::Result;
use candle_core::{DType, IndexOp, Tensor};

fn l2_normalize(t: &Tensor) -> Result<Tensor> {
    let eps = match t.dtype() { DType::F16 | DType::BF16 => 1e-6, _ => 1e-12 };
    let norm = t.sqr()?.sum_keepdim(1)?.sqrt()?.affine(1.0, eps)?;
    Ok(t.broadcast_div(&norm)?)
}

/// Mean over unmasked tokens of `[B,T,H]`, then L2-normalized to `[B,H]`.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, _time, hidden_dim) = hidden.dims3()?;
    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?.unsqueeze(2)?;
    let masked = hidden.broadcast_mul(&mask)?;
    let sum = masked.sum(1)?;
    let lengths = mask.sum(1)?;
    let mean = sum.broadcast_div(&lengths)?;
    let out = l2_normalize(&mean)?;
    assert_eq!(out.dims(), &[batch, hidden_dim]);
    Ok(out)
}

/// First-token (`[CLS]`) embedding of `[B,T,H]`, L2-normalized to `[B,H]`.
/// This is the pooling BGE models are trained with.
pub fn cls_l2(hidden: &Tensor) -> Result<Tensor> {
    let cls = hidden.i((.., 0))?;
    l2_normalize(&cls)
}
