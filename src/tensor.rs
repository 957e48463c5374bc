use crate::error::{HistonetError, Result};
use rand::Rng;
use rand_distr::StandardNormal;

/// Dense f32 tensor in row-major order.
///
/// Fields:
/// - `data`: flat values, len = product of shape dims
/// - `shape`: dimensions, e.g. [batch, channels, height, width]
///
/// The backend is CPU-only and single-threaded; layers own their parameter
/// tensors exclusively and nothing here tracks gradients.
#[derive(Clone, PartialEq)]
pub struct Tensor {
    data: Vec<f32>,
    shape: Vec<usize>,
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("len", &self.data.len())
            .finish()
    }
}

// ===== CONSTRUCTORS =====

impl Tensor {
    /// Create a tensor from data and shape.
    ///
    /// Fails with `ShapeDataMismatch` if `data.len()` does not equal the
    /// product of the shape dimensions.
    pub fn new(data: Vec<f32>, shape: &[usize]) -> Result<Self> {
        let elements: usize = shape.iter().product();
        if data.len() != elements {
            return Err(HistonetError::ShapeDataMismatch {
                shape: shape.to_vec(),
                elements,
                len: data.len(),
            });
        }
        Ok(Tensor {
            data,
            shape: shape.to_vec(),
        })
    }

    /// Tensor filled with zeros
    pub fn zeros(shape: &[usize]) -> Self {
        let size = shape.iter().product();
        Tensor {
            data: vec![0.0; size],
            shape: shape.to_vec(),
        }
    }

    /// Tensor filled with ones
    pub fn ones(shape: &[usize]) -> Self {
        let size = shape.iter().product();
        Tensor {
            data: vec![1.0; size],
            shape: shape.to_vec(),
        }
    }

    /// Tensor with values uniformly distributed in [0, 1)
    pub fn rand(shape: &[usize]) -> Self {
        let size: usize = shape.iter().product();
        let mut rng = rand::rng();
        let data: Vec<f32> = (0..size).map(|_| rng.random::<f32>()).collect();
        Tensor {
            data,
            shape: shape.to_vec(),
        }
    }

    /// Tensor with values from the standard normal distribution N(0, 1)
    pub fn randn(shape: &[usize]) -> Self {
        let size: usize = shape.iter().product();
        let mut rng = rand::rng();
        let data: Vec<f32> = (0..size).map(|_| rng.sample(StandardNormal)).collect();
        Tensor {
            data,
            shape: shape.to_vec(),
        }
    }

    /// He (Kaiming) normal initialization: N(0, sqrt(2 / fan_in)).
    ///
    /// Suited to layers followed by ReLU.
    pub fn he_normal(shape: &[usize], fan_in: usize) -> Result<Self> {
        if fan_in == 0 {
            return Err(HistonetError::InvalidParameter(
                "he_normal requires fan_in > 0".to_string(),
            ));
        }
        let std = (2.0 / fan_in as f32).sqrt();
        let size: usize = shape.iter().product();
        let mut rng = rand::rng();
        let data: Vec<f32> = (0..size)
            .map(|_| rng.sample::<f32, _>(StandardNormal) * std)
            .collect();
        Ok(Tensor {
            data,
            shape: shape.to_vec(),
        })
    }

    /// Xavier uniform initialization for a (in_features, out_features) weight.
    ///
    /// Samples uniformly from [-limit, limit] with
    /// limit = sqrt(6 / (fan_in + fan_out)).
    pub fn xavier_uniform(in_features: usize, out_features: usize) -> Result<Self> {
        if in_features + out_features == 0 {
            return Err(HistonetError::InvalidParameter(
                "xavier_uniform requires fan_in + fan_out > 0".to_string(),
            ));
        }
        let limit = (6.0 / (in_features + out_features) as f32).sqrt();
        let mut rng = rand::rng();
        let data: Vec<f32> = (0..in_features * out_features)
            .map(|_| rng.random_range(-limit..limit))
            .collect();
        Ok(Tensor {
            data,
            shape: vec![in_features, out_features],
        })
    }
}

// ===== ACCESSORS =====

impl Tensor {
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Destructure an NCHW shape, failing with `RankMismatch` otherwise.
    pub fn dims4(&self) -> Result<(usize, usize, usize, usize)> {
        match self.shape.as_slice() {
            &[n, c, h, w] => Ok((n, c, h, w)),
            _ => Err(HistonetError::RankMismatch {
                expected: 4,
                actual: self.shape.len(),
            }),
        }
    }
}

// ===== MOVEMENT & ELEMENT-WISE OPS =====

impl Tensor {
    /// Reinterpret the data under a new shape with the same element count.
    pub fn reshape(&self, new_shape: &[usize]) -> Result<Tensor> {
        let elements: usize = new_shape.iter().product();
        if elements != self.data.len() {
            return Err(HistonetError::ShapeDataMismatch {
                shape: new_shape.to_vec(),
                elements,
                len: self.data.len(),
            });
        }
        Ok(Tensor {
            data: self.data.clone(),
            shape: new_shape.to_vec(),
        })
    }

    /// Zero-pad the two spatial dimensions of an NCHW tensor.
    pub fn pad2d(&self, pad_h: usize, pad_w: usize) -> Result<Tensor> {
        let (n, c, h, w) = self.dims4()?;
        if pad_h == 0 && pad_w == 0 {
            return Ok(self.clone());
        }
        let out_h = h + 2 * pad_h;
        let out_w = w + 2 * pad_w;
        let mut out = vec![0.0; n * c * out_h * out_w];

        for b in 0..n {
            for ch in 0..c {
                for row in 0..h {
                    let src = ((b * c + ch) * h + row) * w;
                    let dst = ((b * c + ch) * out_h + row + pad_h) * out_w + pad_w;
                    out[dst..dst + w].copy_from_slice(&self.data[src..src + w]);
                }
            }
        }

        Tensor::new(out, &[n, c, out_h, out_w])
    }

    /// 2D matrix product: (m, k) x (k, n) -> (m, n).
    pub fn matmul(&self, other: &Tensor) -> Result<Tensor> {
        let &[m, k] = self.shape.as_slice() else {
            return Err(HistonetError::RankMismatch {
                expected: 2,
                actual: self.shape.len(),
            });
        };
        let &[k2, n] = other.shape.as_slice() else {
            return Err(HistonetError::RankMismatch {
                expected: 2,
                actual: other.shape.len(),
            });
        };
        if k != k2 {
            return Err(HistonetError::ShapeMismatch {
                expected: self.shape.clone(),
                actual: other.shape.clone(),
            });
        }

        let mut out = vec![0.0; m * n];
        for i in 0..m {
            for p in 0..k {
                let a = self.data[i * k + p];
                if a == 0.0 {
                    continue;
                }
                let row = &other.data[p * n..(p + 1) * n];
                let dst = &mut out[i * n..(i + 1) * n];
                for (o, &b) in dst.iter_mut().zip(row) {
                    *o += a * b;
                }
            }
        }

        Tensor::new(out, &[m, n])
    }

    /// Element-wise rectified linear unit
    pub fn relu(&self) -> Tensor {
        Tensor {
            data: self.data.iter().map(|&x| x.max(0.0)).collect(),
            shape: self.shape.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_length() {
        assert!(Tensor::new(vec![1.0, 2.0], &[2]).is_ok());
        let err = Tensor::new(vec![1.0, 2.0], &[3]).unwrap_err();
        assert!(matches!(err, HistonetError::ShapeDataMismatch { .. }));
    }

    #[test]
    fn test_zeros_ones() {
        let z = Tensor::zeros(&[2, 3]);
        assert_eq!(z.shape(), &[2, 3]);
        assert!(z.data().iter().all(|&x| x == 0.0));

        let o = Tensor::ones(&[4]);
        assert!(o.data().iter().all(|&x| x == 1.0));
    }

    #[test]
    fn test_reshape() {
        let t = Tensor::new((0..6).map(|i| i as f32).collect(), &[2, 3]).unwrap();
        let r = t.reshape(&[3, 2]).unwrap();
        assert_eq!(r.shape(), &[3, 2]);
        assert_eq!(r.data(), t.data());

        assert!(t.reshape(&[4, 2]).is_err());
    }

    #[test]
    fn test_pad2d() {
        let t = Tensor::ones(&[1, 1, 2, 2]);
        let p = t.pad2d(1, 1).unwrap();
        assert_eq!(p.shape(), &[1, 1, 4, 4]);
        // Corners are zero, center is the original ones
        assert_eq!(p.data()[0], 0.0);
        assert_eq!(p.data()[5], 1.0);
        assert_eq!(p.data()[6], 1.0);
        let total: f32 = p.data().iter().sum();
        assert_eq!(total, 4.0);
    }

    #[test]
    fn test_matmul_values() {
        let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let b = Tensor::new(vec![5.0, 6.0, 7.0, 8.0], &[2, 2]).unwrap();
        let c = a.matmul(&b).unwrap();
        assert_eq!(c.data(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_inner_dim_mismatch() {
        let a = Tensor::zeros(&[2, 3]);
        let b = Tensor::zeros(&[4, 2]);
        let err = a.matmul(&b).unwrap_err();
        assert!(matches!(err, HistonetError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_relu() {
        let t = Tensor::new(vec![-1.0, 0.0, 2.5], &[3]).unwrap();
        assert_eq!(t.relu().data(), &[0.0, 0.0, 2.5]);
    }

    #[test]
    fn test_he_normal_rejects_zero_fan_in() {
        assert!(Tensor::he_normal(&[4, 4], 0).is_err());
    }

    #[test]
    fn test_dims4() {
        let t = Tensor::zeros(&[2, 3, 4, 5]);
        assert_eq!(t.dims4().unwrap(), (2, 3, 4, 5));
        assert!(Tensor::zeros(&[2, 3]).dims4().is_err());
    }
}
