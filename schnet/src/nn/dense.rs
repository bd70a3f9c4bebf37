use ndarray::{Array, Array1, Array2, ArrayView, Dimension};
use rand::Rng;

use crate::Error;
use crate::errors::check_extent;

use super::Activation;

/// Fully connected layer `y = activation(x W + b)`, applied over the last
/// axis of its input.
#[derive(Debug, Clone, PartialEq)]
pub struct Dense {
    /// weights with shape `(n_inputs, n_outputs)`
    weights: Array2<f64>,
    bias: Option<Array1<f64>>,
    activation: Option<Activation>,
}

impl Dense {
    /// Create a new dense layer with Glorot/Xavier uniform initialization
    /// for the weights, and a bias initialized to zero if `bias` is true.
    pub fn new<R: Rng>(
        n_inputs: usize,
        n_outputs: usize,
        bias: bool,
        activation: Option<Activation>,
        rng: &mut R,
    ) -> Result<Dense, Error> {
        if n_inputs == 0 || n_outputs == 0 {
            return Err(Error::Configuration(format!(
                "dense layers need at least one input and one output, got {} -> {}",
                n_inputs, n_outputs
            )));
        }

        let limit = f64::sqrt(6.0 / (n_inputs + n_outputs) as f64);
        let weights = Array2::from_shape_simple_fn((n_inputs, n_outputs), || rng.random_range(-limit..limit));
        let bias = if bias { Some(Array1::zeros(n_outputs)) } else { None };

        return Ok(Dense { weights, bias, activation });
    }

    /// Create a dense layer from already existing weights (with shape
    /// `(n_inputs, n_outputs)`) and bias (with shape `n_outputs`).
    pub fn from_weights(weights: Array2<f64>, bias: Option<Array1<f64>>, activation: Option<Activation>) -> Result<Dense, Error> {
        if let Some(bias) = &bias {
            check_extent("the size of the bias", bias.len(), weights.ncols())?;
        }

        if weights.is_empty() {
            return Err(Error::Configuration("dense layer weights can not be empty".into()));
        }

        return Ok(Dense { weights, bias, activation });
    }

    /// Get the size of the last axis this layer expects as input
    pub fn n_inputs(&self) -> usize {
        self.weights.nrows()
    }

    /// Get the size of the last axis of this layer output
    pub fn n_outputs(&self) -> usize {
        self.weights.ncols()
    }

    /// Get the activation function applied after the affine transform, if any
    pub fn activation(&self) -> Option<Activation> {
        self.activation
    }

    /// Get the weights of this layer, with shape `(n_inputs, n_outputs)`
    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    /// Get mutable access to the weights of this layer
    pub fn weights_mut(&mut self) -> &mut Array2<f64> {
        &mut self.weights
    }

    /// Get the bias of this layer, if any
    pub fn bias(&self) -> Option<&Array1<f64>> {
        self.bias.as_ref()
    }

    /// Get mutable access to the bias of this layer, if any
    pub fn bias_mut(&mut self) -> Option<&mut Array1<f64>> {
        self.bias.as_mut()
    }

    /// Number of learnable scalar parameters
    pub fn n_parameters(&self) -> usize {
        self.weights.len() + self.bias.as_ref().map_or(0, |b| b.len())
    }

    /// Apply this layer to the last axis of `input`. All the other axes are
    /// treated as batch dimensions.
    pub fn forward<D: Dimension>(&self, input: ArrayView<'_, f64, D>) -> Result<Array<f64, D>, Error> {
        let n_features = input.shape().last().copied().unwrap_or(0);
        check_extent("the number of features given to dense layer", n_features, self.n_inputs())?;

        let n_samples = input.len() / n_features;
        let flat = input.to_shape((n_samples, n_features)).expect("failed to flatten dense layer input");

        let mut output = flat.dot(&self.weights);
        if let Some(bias) = &self.bias {
            output += bias;
        }

        if let Some(activation) = self.activation {
            output.mapv_inplace(|x| activation.compute(x));
        }

        let mut shape = input.raw_dim();
        let last = shape.ndim() - 1;
        shape[last] = self.n_outputs();

        let output = output.into_shape_with_order(shape).expect("failed to reshape dense layer output");
        return Ok(output);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::{array, Array3};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    use super::*;
    use crate::nn::shifted_softplus;

    #[test]
    fn initialization() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let dense = Dense::new(25, 64, true, None, &mut rng).unwrap();

        assert_eq!(dense.weights().dim(), (25, 64));
        assert_eq!(dense.bias().unwrap(), &Array1::<f64>::zeros(64));
        assert_eq!(dense.n_parameters(), 25 * 64 + 64);

        let limit = f64::sqrt(6.0 / 89.0);
        assert!(dense.weights().iter().all(|w| w.abs() <= limit));
        // weights should not all be the same
        assert!(dense.weights().iter().any(|&w| w != dense.weights()[[0, 0]]));

        let dense = Dense::new(4, 4, false, None, &mut rng).unwrap();
        assert!(dense.bias().is_none());
        assert_eq!(dense.n_parameters(), 16);

        assert!(matches!(Dense::new(0, 4, true, None, &mut rng), Err(Error::Configuration(_))));
    }

    #[test]
    fn forward() {
        let dense = Dense::from_weights(
            array![[1.0, 0.0, 2.0], [0.0, 1.0, -1.0]],
            Some(array![0.5, 0.0, -0.5]),
            None,
        ).unwrap();

        let input = array![[1.0, 2.0], [-1.0, 3.0]];
        let output = dense.forward(input.view()).unwrap();
        assert_eq!(output, array![[1.5, 2.0, -0.5], [-0.5, 3.0, -5.5]]);

        // higher dimensional input
        let input = Array3::from_shape_fn((2, 3, 2), |(i, j, k)| (i + j + k) as f64);
        let output = dense.forward(input.view()).unwrap();
        assert_eq!(output.dim(), (2, 3, 3));
        for i in 0..2 {
            for j in 0..3 {
                let row = dense.forward(input.slice(ndarray::s![i, j, ..])).unwrap();
                assert_eq!(output.slice(ndarray::s![i, j, ..]), row);
            }
        }

        // non-contiguous input
        let transposed = input.view().permuted_axes([1, 0, 2]);
        let output_t = dense.forward(transposed).unwrap();
        assert_eq!(output_t, output.view().permuted_axes([1, 0, 2]));
    }

    #[test]
    fn activation() {
        let dense = Dense::from_weights(
            array![[1.0], [1.0]],
            Some(array![-1.0]),
            Some(Activation::ShiftedSoftplus),
        ).unwrap();

        let output = dense.forward(array![[0.25, 2.0]].view()).unwrap();
        assert_relative_eq!(output[[0, 0]], shifted_softplus(1.25));
    }

    #[test]
    fn shape_errors() {
        let dense = Dense::from_weights(Array2::ones((3, 2)), None, None).unwrap();
        let error = dense.forward(Array3::<f64>::zeros((2, 2, 4)).view()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "shape mismatch: expected the number of features given to dense layer to be 3, got 4"
        );

        let error = Dense::from_weights(Array2::ones((3, 2)), Some(Array1::zeros(3)), None).unwrap_err();
        assert!(matches!(error, Error::Shape(_)));
    }
}
