//! Interaction blocks, updating the atomic features with information coming
//! from their neighbors.
use ndarray::{Array3, ArrayView3, ArrayView4};
use rand::Rng;

use crate::{Cutoff, Error};
use crate::errors::check_extent;
use crate::nn::Dense;

mod filter;
pub use self::filter::FilterNetwork;

mod cfconv;
pub use self::cfconv::CFConv;

/// Check that the per-pair arrays agree with each other and with the atomic
/// features `x`, and that valid neighbors are all inside their structure.
fn check_pairs(
    x: &ArrayView3<'_, f64>,
    distances: &ArrayView3<'_, f64>,
    expanded: &ArrayView4<'_, f64>,
    neighbors: &ArrayView3<'_, usize>,
    neighbor_mask: &ArrayView3<'_, bool>,
) -> Result<(), Error> {
    let (n_structures, n_atoms, _) = x.dim();
    let (b, a, n_neighbors) = neighbors.dim();
    check_extent("the number of structures in neighbors", b, n_structures)?;
    check_extent("the number of atoms in neighbors", a, n_atoms)?;

    let pairs = neighbors.dim();
    if distances.dim() != pairs {
        return Err(Error::Shape(format!(
            "expected distances to have shape {:?}, got {:?}", pairs, distances.dim()
        )));
    }

    if neighbor_mask.dim() != pairs {
        return Err(Error::Shape(format!(
            "expected neighbor_mask to have shape {:?}, got {:?}", pairs, neighbor_mask.dim()
        )));
    }

    let (b, a, k, _) = expanded.dim();
    if (b, a, k) != (n_structures, n_atoms, n_neighbors) {
        return Err(Error::Shape(format!(
            "expected expanded distances to start with shape {:?}, got {:?}",
            pairs, expanded.dim()
        )));
    }

    for (&neighbor, &valid) in neighbors.iter().zip(neighbor_mask.iter()) {
        if valid && neighbor >= n_atoms {
            return Err(Error::InvalidInput(format!(
                "got neighbor index {}, but there are only {} atoms per structure",
                neighbor, n_atoms
            )));
        }
    }

    return Ok(());
}

/// SchNet interaction block: a continuous-filter convolution followed by a
/// dense layer. The output of this block is the update to add to the
/// atomic features.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    cfconv: CFConv,
    dense: Dense,
}

impl Interaction {
    pub fn new<R: Rng>(
        n_atom_basis: usize,
        n_spatial_basis: usize,
        n_filters: usize,
        cutoff: Cutoff,
        normalize_filter: bool,
        rng: &mut R,
    ) -> Result<Interaction, Error> {
        let cfconv = CFConv::new(n_atom_basis, n_spatial_basis, n_filters, cutoff, normalize_filter, rng)?;
        let dense = Dense::new(n_atom_basis, n_atom_basis, true, None, rng)?;
        return Ok(Interaction { cfconv, dense });
    }

    /// Create an interaction block from an existing convolution and output
    /// layer
    pub fn from_layers(cfconv: CFConv, dense: Dense) -> Result<Interaction, Error> {
        check_extent("the number of inputs of the interaction dense layer", dense.n_inputs(), cfconv.n_atom_basis())?;
        check_extent("the number of outputs of the interaction dense layer", dense.n_outputs(), cfconv.n_atom_basis())?;
        return Ok(Interaction { cfconv, dense });
    }

    pub fn n_atom_basis(&self) -> usize {
        self.cfconv.n_atom_basis()
    }

    pub fn n_filters(&self) -> usize {
        self.cfconv.n_filters()
    }

    pub fn cfconv(&self) -> &CFConv {
        &self.cfconv
    }

    pub fn cfconv_mut(&mut self) -> &mut CFConv {
        &mut self.cfconv
    }

    pub fn dense(&self) -> &Dense {
        &self.dense
    }

    pub fn dense_mut(&mut self) -> &mut Dense {
        &mut self.dense
    }

    pub fn n_parameters(&self) -> usize {
        self.cfconv.n_parameters() + self.dense.n_parameters()
    }

    /// Compute the update to the atomic features `x` (with shape `(B, A,
    /// n_atom_basis)`) coming from their neighbors.
    pub fn update(
        &self,
        x: ArrayView3<'_, f64>,
        distances: ArrayView3<'_, f64>,
        expanded: ArrayView4<'_, f64>,
        neighbors: ArrayView3<'_, usize>,
        neighbor_mask: ArrayView3<'_, bool>,
    ) -> Result<Array3<f64>, Error> {
        let v = self.cfconv.forward(x, distances, expanded, neighbors, neighbor_mask)?;
        return self.dense.forward(v.view());
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, Array2, Array3, Array4};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    use super::*;
    use crate::nn::shifted_softplus;

    #[test]
    fn zero_neighbors_update() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let mut interaction = Interaction::new(3, 4, 5, Cutoff::step(5.0), false, &mut rng).unwrap();
        interaction.dense_mut().bias_mut().unwrap().assign(&Array1::from(vec![0.1, -0.2, 0.3]));
        interaction.cfconv_mut().f2out_mut().bias_mut().unwrap().fill(0.5);

        let x = Array3::from_elem((1, 2, 3), 1.5);
        let distances = Array3::from_elem((1, 2, 2), 1.0);
        let expanded = Array4::from_elem((1, 2, 2, 4), 0.3);
        let neighbors = Array3::<usize>::zeros((1, 2, 2));
        let mask = Array3::from_elem((1, 2, 2), false);

        let update = interaction.update(x.view(), distances.view(), expanded.view(), neighbors.view(), mask.view()).unwrap();

        // without neighbors, the update only depends on the biases
        let hidden = Array2::from_elem((1, 3), shifted_softplus(0.5));
        let expected = interaction.dense().forward(hidden.view()).unwrap();
        for atom in 0..2 {
            for f in 0..3 {
                approx::assert_relative_eq!(update[[0, atom, f]], expected[[0, f]], epsilon = 1e-14, max_relative = 1e-14);
            }
        }
    }

    #[test]
    fn from_layers() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let cfconv = CFConv::new(3, 4, 5, Cutoff::step(5.0), false, &mut rng).unwrap();

        let error = Interaction::from_layers(cfconv.clone(), Dense::new(3, 4, true, None, &mut rng).unwrap()).unwrap_err();
        assert!(matches!(error, Error::Shape(_)));

        let interaction = Interaction::from_layers(cfconv, Dense::new(3, 3, true, None, &mut rng).unwrap()).unwrap();
        assert_eq!(interaction.n_atom_basis(), 3);
        assert_eq!(interaction.n_filters(), 5);
        assert_eq!(interaction.n_parameters(), interaction.cfconv().n_parameters() + 12);
    }
}
