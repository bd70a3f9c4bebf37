//! Expansion of interatomic distances on a basis of radial functions
use ndarray::{Array1, Array4, ArrayView3, ArrayViewMut1, Axis, Zip};

use crate::Error;

/// Expand distances on a set of Gaussian functions with evenly spaced
/// centers.
///
/// The value of the `g`-th basis function for a distance `r` is
/// `exp(-1/2 (r - μ_g)^2 / σ_g^2)`, where the centers `μ_g` go from `start`
/// to `stop` and the widths `σ_g` are all equal to the spacing between
/// centers.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianSmearing {
    centers: Array1<f64>,
    widths: Array1<f64>,
    trainable: bool,
}

impl GaussianSmearing {
    /// Create a new set of `n_gaussians` Gaussian functions, with centers
    /// evenly spaced between `start` and `stop` (included). If `trainable`
    /// is true, the centers and widths should be updated by the optimizer
    /// together with the other parameters of the model.
    pub fn new(start: f64, stop: f64, n_gaussians: usize, trainable: bool) -> Result<GaussianSmearing, Error> {
        if n_gaussians == 0 {
            return Err(Error::Configuration(
                "the number of Gaussian functions must be positive".into()
            ));
        }

        if !start.is_finite() || !stop.is_finite() || start >= stop {
            return Err(Error::Configuration(format!(
                "invalid range for Gaussian centers: expected start < stop, got [{}, {}]",
                start, stop
            )));
        }

        let centers = Array1::linspace(start, stop, n_gaussians);
        let width = if n_gaussians == 1 {
            stop - start
        } else {
            centers[1] - centers[0]
        };

        return Ok(GaussianSmearing {
            centers: centers,
            widths: Array1::from_elem(n_gaussians, width),
            trainable: trainable,
        });
    }

    /// Get the number of basis functions
    pub fn size(&self) -> usize {
        self.centers.len()
    }

    /// Are the centers and widths learnable parameters?
    pub fn is_trainable(&self) -> bool {
        self.trainable
    }

    /// Get the centers of the Gaussian functions
    pub fn centers(&self) -> &Array1<f64> {
        &self.centers
    }

    /// Get mutable access to the centers of the Gaussian functions
    pub fn centers_mut(&mut self) -> &mut Array1<f64> {
        &mut self.centers
    }

    /// Get the widths of the Gaussian functions
    pub fn widths(&self) -> &Array1<f64> {
        &self.widths
    }

    /// Get mutable access to the widths of the Gaussian functions
    pub fn widths_mut(&mut self) -> &mut Array1<f64> {
        &mut self.widths
    }

    /// Number of learnable scalar parameters
    pub fn n_parameters(&self) -> usize {
        if self.trainable {
            self.centers.len() + self.widths.len()
        } else {
            0
        }
    }

    /// Evaluate all basis functions at the distance `r`, storing the result
    /// in `output`.
    #[inline]
    pub fn expand_single(&self, r: f64, mut output: ArrayViewMut1<'_, f64>) {
        debug_assert_eq!(output.len(), self.size());
        Zip::from(&mut output)
            .and(&self.centers)
            .and(&self.widths)
            .for_each(|value, &center, &width| {
                let diff = r - center;
                // the exponent is always negative, so this can only
                // underflow to 0 for distances far away from the center
                *value = f64::exp(-0.5 * diff * diff / (width * width));
            });
    }

    /// Expand the distances with shape `(B, A, K)` into an array with shape
    /// `(B, A, K, G)`.
    #[time_graph::instrument(name = "GaussianSmearing::expand")]
    pub fn expand(&self, distances: ArrayView3<'_, f64>) -> Array4<f64> {
        let (n_structures, n_atoms, n_neighbors) = distances.dim();
        let mut expanded = Array4::zeros((n_structures, n_atoms, n_neighbors, self.size()));

        Zip::from(expanded.lanes_mut(Axis(3)))
            .and(&distances)
            .par_for_each(|output, &r| self.expand_single(r, output));

        return expanded;
    }
}
