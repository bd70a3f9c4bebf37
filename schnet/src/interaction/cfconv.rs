use ndarray::{Array3, ArrayView3, ArrayView4, Axis, Zip, s};
use ndarray::parallel::prelude::*;
use rand::Rng;

use crate::{Cutoff, Error};
use crate::nn::{Activation, Dense};

use super::{FilterNetwork, check_pairs};

/// Continuous-filter convolution.
///
/// For each atom, the features of all neighbors are projected to the filter
/// space, multiplied element-wise by the continuous filter generated from
/// the pair distance and by the cutoff function, and summed. The sum is then
/// projected back to the atomic features space.
#[derive(Debug, Clone, PartialEq)]
pub struct CFConv {
    /// projection from atomic features to filter space, without bias
    in2f: Dense,
    filter_network: FilterNetwork,
    /// projection from filter space back to atomic features
    f2out: Dense,
    cutoff: Cutoff,
    normalize_filter: bool,
}

impl CFConv {
    /// Create a new convolution layer for atomic features of size
    /// `n_atom_basis`, distances expanded on `n_spatial_basis` functions and
    /// `n_filters` filters.
    ///
    /// If `normalize_filter` is true, the aggregated features are divided by
    /// the number of neighbors of each atom.
    pub fn new<R: Rng>(
        n_atom_basis: usize,
        n_spatial_basis: usize,
        n_filters: usize,
        cutoff: Cutoff,
        normalize_filter: bool,
        rng: &mut R,
    ) -> Result<CFConv, Error> {
        cutoff.validate()?;
        return Ok(CFConv {
            in2f: Dense::new(n_atom_basis, n_filters, false, None, rng)?,
            filter_network: FilterNetwork::new(n_spatial_basis, n_filters, rng)?,
            f2out: Dense::new(n_filters, n_atom_basis, true, Some(Activation::ShiftedSoftplus), rng)?,
            cutoff: cutoff,
            normalize_filter: normalize_filter,
        });
    }

    /// Create a convolution layer from existing layers
    pub fn from_layers(
        in2f: Dense,
        filter_network: FilterNetwork,
        f2out: Dense,
        cutoff: Cutoff,
        normalize_filter: bool,
    ) -> Result<CFConv, Error> {
        cutoff.validate()?;

        if in2f.n_outputs() != filter_network.n_filters() || f2out.n_inputs() != filter_network.n_filters() {
            return Err(Error::Shape(format!(
                "inconsistent number of filters in CFConv: input projection gives {}, \
                filter network gives {} and output projection expects {}",
                in2f.n_outputs(), filter_network.n_filters(), f2out.n_inputs()
            )));
        }

        if in2f.n_inputs() != f2out.n_outputs() {
            return Err(Error::Shape(format!(
                "inconsistent number of atomic features in CFConv: input projection \
                expects {} but output projection gives {}",
                in2f.n_inputs(), f2out.n_outputs()
            )));
        }

        return Ok(CFConv { in2f, filter_network, f2out, cutoff, normalize_filter });
    }

    pub fn n_atom_basis(&self) -> usize {
        self.in2f.n_inputs()
    }

    pub fn n_filters(&self) -> usize {
        self.filter_network.n_filters()
    }

    pub fn cutoff(&self) -> &Cutoff {
        &self.cutoff
    }

    pub fn normalize_filter(&self) -> bool {
        self.normalize_filter
    }

    pub fn in2f(&self) -> &Dense {
        &self.in2f
    }

    pub fn in2f_mut(&mut self) -> &mut Dense {
        &mut self.in2f
    }

    pub fn filter_network(&self) -> &FilterNetwork {
        &self.filter_network
    }

    pub fn filter_network_mut(&mut self) -> &mut FilterNetwork {
        &mut self.filter_network
    }

    pub fn f2out(&self) -> &Dense {
        &self.f2out
    }

    pub fn f2out_mut(&mut self) -> &mut Dense {
        &mut self.f2out
    }

    pub fn n_parameters(&self) -> usize {
        self.in2f.n_parameters() + self.filter_network.n_parameters() + self.f2out.n_parameters()
    }

    /// Apply the convolution to the atomic features `x` with shape `(B, A,
    /// n_atom_basis)`, returning an array of the same shape.
    ///
    /// `distances`, `neighbors` and `neighbor_mask` have shape `(B, A, K)`,
    /// `expanded` has shape `(B, A, K, n_spatial_basis)`.
    pub fn forward(
        &self,
        x: ArrayView3<'_, f64>,
        distances: ArrayView3<'_, f64>,
        expanded: ArrayView4<'_, f64>,
        neighbors: ArrayView3<'_, usize>,
        neighbor_mask: ArrayView3<'_, bool>,
    ) -> Result<Array3<f64>, Error> {
        check_pairs(&x, &distances, &expanded, &neighbors, &neighbor_mask)?;

        let y = self.in2f.forward(x)?;
        let filters = self.filter_network.forward(expanded)?;

        let aggregated = self.aggregate(y.view(), filters.view(), distances, neighbors, neighbor_mask);
        return self.f2out.forward(aggregated.view());
    }

    /// Sum the features `y` (with shape `(B, A, F)`) of the neighbors of each
    /// atom, weighted by the corresponding `filters` (with shape `(B, A, K,
    /// F)`) and cutoff function.
    ///
    /// Neighbors with a `false` mask or a cutoff weight of zero are skipped,
    /// and never contribute to the sum. Atoms without any neighbor get a zero
    /// vector, including when normalizing by the number of neighbors.
    #[allow(clippy::float_cmp)]
    #[time_graph::instrument(name = "CFConv::aggregate")]
    pub(crate) fn aggregate(
        &self,
        y: ArrayView3<'_, f64>,
        filters: ArrayView4<'_, f64>,
        distances: ArrayView3<'_, f64>,
        neighbors: ArrayView3<'_, usize>,
        neighbor_mask: ArrayView3<'_, bool>,
    ) -> Array3<f64> {
        let (n_structures, n_atoms, n_neighbors) = neighbors.dim();
        let n_filters = filters.dim().3;
        debug_assert_eq!(y.dim(), (n_structures, n_atoms, n_filters));

        let mut output = Array3::zeros((n_structures, n_atoms, n_filters));
        output.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(structure, mut output)| {
                let y = y.index_axis(Axis(0), structure);

                for (atom, mut aggregated) in output.outer_iter_mut().enumerate() {
                    let mut count = 0;
                    for k in 0..n_neighbors {
                        if !neighbor_mask[[structure, atom, k]] {
                            continue;
                        }
                        count += 1;

                        let weight = self.cutoff.weight(distances[[structure, atom, k]]);
                        if weight == 0.0 {
                            continue;
                        }

                        let neighbor = y.row(neighbors[[structure, atom, k]]);
                        let filter = filters.slice(s![structure, atom, k, ..]);
                        Zip::from(&mut aggregated)
                            .and(&neighbor)
                            .and(&filter)
                            .for_each(|value, &y, &w| *value += y * (w * weight));
                    }

                    if self.normalize_filter && count > 1 {
                        aggregated /= count as f64;
                    }
                }
            });

        return output;
    }
}
