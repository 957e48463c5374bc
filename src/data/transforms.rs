//! Per-image preprocessing and augmentation for CHW tensors.

use rand::Rng;

use crate::error::{HistonetError, Result};
use crate::tensor::Tensor;

/// Scale every element with a single mean and standard deviation.
pub fn normalize(x: &Tensor, mean: f32, std: f32) -> Result<Tensor> {
    if std == 0.0 {
        return Err(HistonetError::InvalidParameter(
            "std must be non-zero".to_string(),
        ));
    }
    let data = x.data().iter().map(|&v| (v - mean) / std).collect();
    Tensor::new(data, x.shape())
}

/// Per-channel normalization for a CHW image.
pub fn normalize_channels(x: &Tensor, mean: &[f32], std: &[f32]) -> Result<Tensor> {
    let &[c, h, w] = x.shape() else {
        return Err(HistonetError::RankMismatch {
            expected: 3,
            actual: x.rank(),
        });
    };
    if mean.len() != c || std.len() != c {
        return Err(HistonetError::InvalidParameter(format!(
            "expected {c} per-channel stats, got {} means and {} stds",
            mean.len(),
            std.len()
        )));
    }
    if std.iter().any(|&s| s == 0.0) {
        return Err(HistonetError::InvalidParameter(
            "std must be non-zero for every channel".to_string(),
        ));
    }

    let plane = h * w;
    let mut out = x.data().to_vec();
    for ch in 0..c {
        let m = mean[ch];
        let s = std[ch];
        for v in &mut out[ch * plane..(ch + 1) * plane] {
            *v = (*v - m) / s;
        }
    }
    Tensor::new(out, x.shape())
}

/// Encode class indices as a (len, num_classes) one-hot tensor.
pub fn to_one_hot(labels: &[usize], num_classes: usize) -> Result<Tensor> {
    if num_classes == 0 {
        return Err(HistonetError::InvalidParameter(
            "num_classes must be positive".to_string(),
        ));
    }
    let mut data = vec![0.0f32; labels.len() * num_classes];
    for (i, &label) in labels.iter().enumerate() {
        if label >= num_classes {
            return Err(HistonetError::InvalidParameter(format!(
                "label {label} out of range for {num_classes} classes"
            )));
        }
        data[i * num_classes + label] = 1.0;
    }
    Tensor::new(data, &[labels.len(), num_classes])
}

/// Mirror a CHW image left-right with probability `p`.
pub fn random_horizontal_flip(x: &Tensor, p: f32) -> Result<Tensor> {
    maybe_flip(x, p, true)
}

/// Mirror a CHW image top-bottom with probability `p`.
pub fn random_vertical_flip(x: &Tensor, p: f32) -> Result<Tensor> {
    maybe_flip(x, p, false)
}

fn maybe_flip(x: &Tensor, p: f32, horizontal: bool) -> Result<Tensor> {
    if !(0.0..=1.0).contains(&p) {
        return Err(HistonetError::InvalidParameter(format!(
            "flip probability must be in [0, 1], got {p}"
        )));
    }
    let &[c, h, w] = x.shape() else {
        return Err(HistonetError::RankMismatch {
            expected: 3,
            actual: x.rank(),
        });
    };

    if p < 1.0 && (p == 0.0 || rand::rng().random::<f32>() >= p) {
        return Ok(x.clone());
    }

    let data = x.data();
    let mut out = vec![0.0f32; data.len()];
    for ch in 0..c {
        for row in 0..h {
            for col in 0..w {
                let (src_row, src_col) = if horizontal {
                    (row, w - 1 - col)
                } else {
                    (h - 1 - row, col)
                };
                out[(ch * h + row) * w + col] = data[(ch * h + src_row) * w + src_col];
            }
        }
    }
    Tensor::new(out, x.shape())
}

/// Bilinear resize of a CHW image to the given output extent.
pub fn resize_bilinear(x: &Tensor, out_h: usize, out_w: usize) -> Result<Tensor> {
    if out_h == 0 || out_w == 0 {
        return Err(HistonetError::InvalidParameter(
            "output extent must be positive".to_string(),
        ));
    }
    let &[c, h, w] = x.shape() else {
        return Err(HistonetError::RankMismatch {
            expected: 3,
            actual: x.rank(),
        });
    };

    let data = x.data();
    let mut out = vec![0.0f32; c * out_h * out_w];

    let scale_h = h as f32 / out_h as f32;
    let scale_w = w as f32 / out_w as f32;

    for ch in 0..c {
        let plane = &data[ch * h * w..(ch + 1) * h * w];
        for oy in 0..out_h {
            // Half-pixel centers keep the resize symmetric
            let src_y = ((oy as f32 + 0.5) * scale_h - 0.5).clamp(0.0, (h - 1) as f32);
            let y0 = src_y.floor() as usize;
            let y1 = (y0 + 1).min(h - 1);
            let fy = src_y - y0 as f32;

            for ox in 0..out_w {
                let src_x = ((ox as f32 + 0.5) * scale_w - 0.5).clamp(0.0, (w - 1) as f32);
                let x0 = src_x.floor() as usize;
                let x1 = (x0 + 1).min(w - 1);
                let fx = src_x - x0 as f32;

                let top = plane[y0 * w + x0] * (1.0 - fx) + plane[y0 * w + x1] * fx;
                let bottom = plane[y1 * w + x0] * (1.0 - fx) + plane[y1 * w + x1] * fx;
                out[(ch * out_h + oy) * out_w + ox] = top * (1.0 - fy) + bottom * fy;
            }
        }
    }
    Tensor::new(out, &[c, out_h, out_w])
}
