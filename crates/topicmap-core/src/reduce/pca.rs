use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::DimensionReducer;
use crate::error::{BackendError, BackendResult};

/// Principal component projection.
///
/// Components are found one at a time by power iteration on the covariance
/// matrix, orthogonalised against the components already found. Start
/// vectors come from a seeded RNG and each component's sign is fixed so its
/// largest entry is positive, which makes the output a pure function of
/// (input, seed).
#[derive(Debug, Clone)]
pub struct PcaReducer {
    pub iterations: usize,
    pub tolerance: f64,
}

impl Default for PcaReducer {
    fn default() -> Self {
        Self {
            iterations: 200,
            tolerance: 1e-10,
        }
    }
}

impl PcaReducer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DimensionReducer for PcaReducer {
    fn name(&self) -> &str {
        "pca"
    }

    fn reduce(
        &self,
        vectors: &[Vec<f32>],
        n_components: usize,
        seed: u64,
    ) -> BackendResult<Vec<Vec<f32>>> {
        let n = vectors.len();
        let dim = vectors.first().map(Vec::len).unwrap_or(0);
        if n == 0 || dim == 0 {
            return Err(BackendError::from("pca needs at least one non-empty vector"));
        }
        if dim < n_components {
            return Err(BackendError(format!(
                "cannot project {}-dimensional input to {} components",
                dim, n_components
            )));
        }

        let mut data = Array2::<f64>::zeros((n, dim));
        for (i, v) in vectors.iter().enumerate() {
            if v.len() != dim {
                return Err(BackendError(format!(
                    "vector {} has {} dimensions, expected {}",
                    i,
                    v.len(),
                    dim
                )));
            }
            for (j, &x) in v.iter().enumerate() {
                data[[i, j]] = x as f64;
            }
        }

        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| BackendError::from("cannot center empty data"))?;
        data -= &mean;

        let cov = data.t().dot(&data) / n as f64;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut components: Vec<Array1<f64>> = Vec::with_capacity(n_components);

        for k in 0..n_components {
            let start = Array1::from_shape_fn(dim, |_| rng.gen_range(-1.0..1.0));
            let v = self
                .power_iteration(&cov, start, &components)
                .ok_or_else(|| BackendError(format!("component {} collapsed to zero", k)))?;
            components.push(v);
        }

        Ok(data
            .rows()
            .into_iter()
            .map(|row| components.iter().map(|c| row.dot(c) as f32).collect())
            .collect())
    }
}

impl PcaReducer {
    /// Dominant eigenvector of `matrix` orthogonal to `found`.
    fn power_iteration(
        &self,
        matrix: &Array2<f64>,
        start: Array1<f64>,
        found: &[Array1<f64>],
    ) -> Option<Array1<f64>> {
        let mut v = normalized(orthogonalize(start, found))?;

        for _ in 0..self.iterations {
            let next = orthogonalize(matrix.dot(&v), found);
            let Some(next) = normalized(next) else {
                // No variance left in the remaining subspace; any orthogonal
                // unit vector is a valid axis.
                break;
            };
            let delta = (&next - &v).mapv(f64::abs).sum();
            v = next;
            if delta < self.tolerance {
                break;
            }
        }

        Some(fix_sign(v))
    }
}

fn orthogonalize(mut v: Array1<f64>, basis: &[Array1<f64>]) -> Array1<f64> {
    for b in basis {
        let proj = v.dot(b);
        v.scaled_add(-proj, b);
    }
    v
}

fn normalized(v: Array1<f64>) -> Option<Array1<f64>> {
    let norm = v.dot(&v).sqrt();
    if norm < 1e-12 {
        None
    } else {
        Some(v / norm)
    }
}

fn fix_sign(v: Array1<f64>) -> Array1<f64> {
    let largest = v
        .iter()
        .copied()
        .fold(0.0f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
    if largest < 0.0 {
        -v
    } else {
        v
    }
}
