use ndarray::{Array4, ArrayView4};
use rand::Rng;

use crate::Error;
use crate::nn::{Activation, Dense};

/// Filter-generating network, mapping the expanded distance of each pair
/// to the continuous filter used by [`CFConv`](super::CFConv).
///
/// This is made of two dense layers with a shifted softplus between them.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterNetwork {
    expanded_to_filters: Dense,
    filters_to_filters: Dense,
}

impl FilterNetwork {
    pub fn new<R: Rng>(n_spatial_basis: usize, n_filters: usize, rng: &mut R) -> Result<FilterNetwork, Error> {
        return Ok(FilterNetwork {
            expanded_to_filters: Dense::new(n_spatial_basis, n_filters, true, Some(Activation::ShiftedSoftplus), rng)?,
            filters_to_filters: Dense::new(n_filters, n_filters, true, None, rng)?,
        });
    }

    /// Create a filter network from existing layers
    pub fn from_layers(expanded_to_filters: Dense, filters_to_filters: Dense) -> Result<FilterNetwork, Error> {
        if expanded_to_filters.n_outputs() != filters_to_filters.n_inputs() {
            return Err(Error::Shape(format!(
                "the layers of the filter network do not match: first layer outputs {} \
                features but the second one expects {}",
                expanded_to_filters.n_outputs(), filters_to_filters.n_inputs()
            )));
        }

        return Ok(FilterNetwork { expanded_to_filters, filters_to_filters });
    }

    /// Size of the expanded distances this network takes as input
    pub fn n_spatial_basis(&self) -> usize {
        self.expanded_to_filters.n_inputs()
    }

    /// Size of the filters produced by this network
    pub fn n_filters(&self) -> usize {
        self.filters_to_filters.n_outputs()
    }

    pub fn layers(&self) -> [&Dense; 2] {
        [&self.expanded_to_filters, &self.filters_to_filters]
    }

    pub fn layers_mut(&mut self) -> [&mut Dense; 2] {
        [&mut self.expanded_to_filters, &mut self.filters_to_filters]
    }

    pub fn n_parameters(&self) -> usize {
        self.expanded_to_filters.n_parameters() + self.filters_to_filters.n_parameters()
    }

    /// Generate filters with shape `(B, A, K, n_filters)` from the expanded
    /// distances with shape `(B, A, K, n_spatial_basis)`
    pub fn forward(&self, expanded: ArrayView4<'_, f64>) -> Result<Array4<f64>, Error> {
        let hidden = self.expanded_to_filters.forward(expanded)?;
        return self.filters_to_filters.forward(hidden.view());
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Array2, Array4};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    use super::*;
    use crate::nn::shifted_softplus;

    #[test]
    fn filters() {
        let network = FilterNetwork::from_layers(
            Dense::from_weights(array![[1.0, -1.0], [0.5, 0.0]], Some(array![0.0, 1.0]), Some(Activation::ShiftedSoftplus)).unwrap(),
            Dense::from_weights(array![[1.0, 0.0, 2.0], [0.0, 1.0, 0.0]], None, None).unwrap(),
        ).unwrap();
        assert_eq!(network.n_spatial_basis(), 2);
        assert_eq!(network.n_filters(), 3);

        let mut expanded = Array4::zeros((1, 1, 2, 2));
        expanded[[0, 0, 0, 0]] = 1.0;
        expanded[[0, 0, 1, 1]] = 2.0;

        let filters = network.forward(expanded.view()).unwrap();
        assert_eq!(filters.dim(), (1, 1, 2, 3));

        let h0 = shifted_softplus(1.0);
        let h1 = shifted_softplus(0.0);
        assert_eq!(filters[[0, 0, 0, 0]], h0);
        assert_eq!(filters[[0, 0, 0, 1]], h1);
        assert_eq!(filters[[0, 0, 0, 2]], 2.0 * h0);

        let h0 = shifted_softplus(1.0);
        let h1 = shifted_softplus(1.0);
        assert_eq!(filters[[0, 0, 1, 0]], h0);
        assert_eq!(filters[[0, 0, 1, 1]], h1);
    }

    #[test]
    fn mismatched_layers() {
        let error = FilterNetwork::from_layers(
            Dense::from_weights(Array2::ones((2, 4)), None, None).unwrap(),
            Dense::from_weights(Array2::ones((3, 4)), None, None).unwrap(),
        ).unwrap_err();
        assert!(matches!(error, Error::Shape(_)));
    }

    #[test]
    fn parameters() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let network = FilterNetwork::new(25, 64, &mut rng).unwrap();
        assert_eq!(network.n_parameters(), 25 * 64 + 64 + 64 * 64 + 64);
        assert_eq!(network.layers()[0].activation(), Some(Activation::ShiftedSoftplus));
        assert_eq!(network.layers()[1].activation(), None);
    }
}
