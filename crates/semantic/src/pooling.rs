use crate::{PoolingStrategy, SemanticError};

/// Lower bound on the mask sum so an all-padding row never divides by zero.
const MIN_TOKEN_WEIGHT: f32 = 1e-9;

/// Collapses a model output into one vector per batch row.
///
/// `data` is the row-major output tensor with dimensions `shape`. Rank-2 outputs
/// (`[batch, hidden]`) are already sentence vectors and are split as-is. Rank-3 outputs
/// (`[batch, seq, hidden]`) are pooled over the sequence axis with `strategy`, using
/// `attention_mask` (`[batch, seq]`, row-major) to ignore padding.
pub(crate) fn pool_output(
    data: &[f32],
    shape: &[usize],
    attention_mask: &[i64],
    strategy: PoolingStrategy,
) -> Result<Vec<Vec<f32>>, SemanticError> {
    let expected: usize = shape.iter().product();
    if data.len() != expected {
        return Err(SemanticError::Inference(format!(
            "output holds {} values but shape {shape:?} needs {expected}",
            data.len()
        )));
    }

    match *shape {
        [batch, hidden] => Ok(split_rows(data, batch, hidden)),
        [batch, seq, hidden] => {
            if attention_mask.len() != batch * seq {
                return Err(SemanticError::Inference(format!(
                    "attention mask has {} entries for a {batch}x{seq} batch",
                    attention_mask.len()
                )));
            }
            if hidden == 0 {
                return Ok(vec![Vec::new(); batch]);
            }
            let pooled = (0..batch)
                .map(|row| {
                    let tokens = &data[row * seq * hidden..(row + 1) * seq * hidden];
                    let mask = &attention_mask[row * seq..(row + 1) * seq];
                    match strategy {
                        PoolingStrategy::Mean => mean_pool(tokens, mask, hidden),
                        PoolingStrategy::Cls => tokens
                            .get(..hidden)
                            .map(<[f32]>::to_vec)
                            .unwrap_or_else(|| vec![0.0; hidden]),
                    }
                })
                .collect();
            Ok(pooled)
        }
        _ => Err(SemanticError::Inference(format!(
            "unsupported output rank {} (shape {shape:?})",
            shape.len()
        ))),
    }
}

fn split_rows(data: &[f32], batch: usize, hidden: usize) -> Vec<Vec<f32>> {
    if hidden == 0 {
        return vec![Vec::new(); batch];
    }
    data.chunks(hidden).map(<[f32]>::to_vec).collect()
}

/// Mask-weighted mean of the token vectors in one row.
fn mean_pool(tokens: &[f32], mask: &[i64], hidden: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; hidden];
    let mut weight = 0.0f32;
    for (token, &m) in tokens.chunks(hidden).zip(mask) {
        if m == 0 {
            continue;
        }
        let m = m as f32;
        weight += m;
        for (acc, &val) in pooled.iter_mut().zip(token) {
            *acc += val * m;
        }
    }
    let denom = weight.max(MIN_TOKEN_WEIGHT);
    for val in &mut pooled {
        *val /= denom;
    }
    pooled
}
