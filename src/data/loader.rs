use rand::seq::SliceRandom;

use crate::error::{HistonetError, Result};
use crate::tensor::Tensor;

/// Mini-batch iterator over an in-memory dataset.
///
/// `data` is indexed along its first dimension; `labels` must have the same
/// sample count. Each pass over the loader re-shuffles when `shuffle` is set,
/// and the final batch may be smaller than `batch_size`.
pub struct DataLoader {
    data: Tensor,
    labels: Tensor,
    batch_size: usize,
    shuffle: bool,
}

impl DataLoader {
    pub fn new(data: Tensor, labels: Tensor, batch_size: usize, shuffle: bool) -> Result<Self> {
        if batch_size == 0 {
            return Err(HistonetError::InvalidParameter(
                "batch_size must be positive".to_string(),
            ));
        }
        if data.rank() == 0 || labels.rank() == 0 {
            return Err(HistonetError::InvalidParameter(
                "data and labels must have a sample dimension".to_string(),
            ));
        }
        if data.shape()[0] != labels.shape()[0] {
            return Err(HistonetError::InvalidParameter(format!(
                "sample count mismatch: {} data vs {} labels",
                data.shape()[0],
                labels.shape()[0]
            )));
        }

        Ok(DataLoader {
            data,
            labels,
            batch_size,
            shuffle,
        })
    }

    pub fn num_samples(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches per pass, counting a trailing partial batch.
    pub fn num_batches(&self) -> usize {
        self.num_samples().div_ceil(self.batch_size)
    }

    pub fn data(&self) -> &Tensor {
        &self.data
    }

    pub fn labels(&self) -> &Tensor {
        &self.labels
    }

    pub fn iter(&self) -> Batches<'_> {
        let mut order: Vec<usize> = (0..self.num_samples()).collect();
        if self.shuffle {
            order.shuffle(&mut rand::rng());
        }
        Batches {
            loader: self,
            order,
            cursor: 0,
        }
    }

    fn sample_size(tensor: &Tensor) -> usize {
        tensor.shape()[1..].iter().product()
    }

    fn gather(tensor: &Tensor, indices: &[usize]) -> Tensor {
        let sample = Self::sample_size(tensor);
        let mut out = Vec::with_capacity(indices.len() * sample);
        let data = tensor.data();
        for &i in indices {
            out.extend_from_slice(&data[i * sample..(i + 1) * sample]);
        }
        let mut shape = tensor.shape().to_vec();
        shape[0] = indices.len();
        // Shape was derived from the source tensor, cannot mismatch
        Tensor::new(out, &shape).unwrap_or_else(|_| Tensor::zeros(&shape))
    }
}

pub struct Batches<'a> {
    loader: &'a DataLoader,
    order: Vec<usize>,
    cursor: usize,
}

impl Iterator for Batches<'_> {
    type Item = (Tensor, Tensor);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.loader.batch_size).min(self.order.len());
        let indices = &self.order[self.cursor..end];
        self.cursor = end;

        let batch = DataLoader::gather(&self.loader.data, indices);
        let labels = DataLoader::gather(&self.loader.labels, indices);
        Some((batch, labels))
    }
}

/// Per-channel mean and standard deviation over an NCHW loader, streamed
/// batch by batch so only one batch is materialized at a time.
pub fn channel_stats(loader: &DataLoader) -> Result<(Vec<f32>, Vec<f32>)> {
    let channels = match loader.data().shape() {
        &[_, c, _, _] => c,
        other => {
            return Err(HistonetError::RankMismatch {
                expected: 4,
                actual: other.len(),
            })
        }
    };

    let mut sum = vec![0.0f64; channels];
    let mut sum_sq = vec![0.0f64; channels];
    let mut count = 0u64;

    for (batch, _) in loader.iter() {
        let (b, c, h, w) = batch.dims4()?;
        let plane = h * w;
        let data = batch.data();
        for n in 0..b {
            for ch in 0..c {
                let start = (n * c + ch) * plane;
                for &v in &data[start..start + plane] {
                    sum[ch] += f64::from(v);
                    sum_sq[ch] += f64::from(v) * f64::from(v);
                }
            }
        }
        count += (b * plane) as u64;
    }

    if count == 0 {
        return Err(HistonetError::InvalidParameter(
            "cannot compute statistics over an empty dataset".to_string(),
        ));
    }

    let n = count as f64;
    let mean: Vec<f32> = sum.iter().map(|&s| (s / n) as f32).collect();
    let std: Vec<f32> = sum
        .iter()
        .zip(&sum_sq)
        .map(|(&s, &sq)| {
            let m = s / n;
            ((sq / n - m * m).max(0.0)).sqrt() as f32
        })
        .collect();
    Ok((mean, std))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_dataset(n: usize) -> (Tensor, Tensor) {
        let data: Vec<f32> = (0..n * 4).map(|i| i as f32).collect();
        let labels: Vec<f32> = (0..n).map(|i| (i % 2) as f32).collect();
        (
            Tensor::new(data, &[n, 4]).unwrap(),
            Tensor::new(labels, &[n]).unwrap(),
        )
    }

    #[test]
    fn test_loader_batch_shapes() {
        let (data, labels) = ramp_dataset(10);
        let loader = DataLoader::new(data, labels, 4, false).unwrap();
        assert_eq!(loader.num_batches(), 3);

        let batches: Vec<_> = loader.iter().collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].0.shape(), &[4, 4]);
        assert_eq!(batches[0].1.shape(), &[4]);
        // Trailing partial batch
        assert_eq!(batches[2].0.shape(), &[2, 4]);
    }

    #[test]
    fn test_loader_preserves_order_without_shuffle() {
        let (data, labels) = ramp_dataset(4);
        let loader = DataLoader::new(data, labels, 2, false).unwrap();
        let (first, _) = loader.iter().next().unwrap();
        assert_eq!(first.data(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_loader_shuffle_keeps_pairs_aligned() {
        let (data, labels) = ramp_dataset(8);
        let loader = DataLoader::new(data, labels, 8, true).unwrap();
        let (batch, labels) = loader.iter().next().unwrap();
        // Sample i has first feature 4*i and label i % 2
        for row in 0..8 {
            let feature = batch.data()[row * 4];
            let label = labels.data()[row];
            let original_index = (feature / 4.0) as usize;
            assert_eq!(label, (original_index % 2) as f32);
        }
    }

    #[test]
    fn test_loader_rejects_mismatched_counts() {
        let data = Tensor::zeros(&[4, 2]);
        let labels = Tensor::zeros(&[3]);
        assert!(DataLoader::new(data, labels, 2, false).is_err());
    }

    #[test]
    fn test_loader_rejects_zero_batch() {
        let (data, labels) = ramp_dataset(4);
        assert!(DataLoader::new(data, labels, 0, false).is_err());
    }

    #[test]
    fn test_channel_stats_constant_channels() {
        // Channel 0 all 2.0, channel 1 all -1.0
        let mut data = vec![0.0f32; 2 * 2 * 3 * 3];
        for n in 0..2 {
            data[(n * 2) * 9..(n * 2) * 9 + 9].fill(2.0);
            data[(n * 2 + 1) * 9..(n * 2 + 1) * 9 + 9].fill(-1.0);
        }
        let data = Tensor::new(data, &[2, 2, 3, 3]).unwrap();
        let labels = Tensor::zeros(&[2]);
        let loader = DataLoader::new(data, labels, 1, false).unwrap();

        let (mean, std) = channel_stats(&loader).unwrap();
        assert!((mean[0] - 2.0).abs() < 1e-6);
        assert!((mean[1] + 1.0).abs() < 1e-6);
        assert!(std[0].abs() < 1e-4);
        assert!(std[1].abs() < 1e-4);
    }

    #[test]
    fn test_channel_stats_requires_4d() {
        let data = Tensor::zeros(&[4, 2]);
        let labels = Tensor::zeros(&[4]);
        let loader = DataLoader::new(data, labels, 2, false).unwrap();
        assert!(channel_stats(&loader).is_err());
    }
}
