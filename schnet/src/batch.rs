use ndarray::{Array1, Array2, Array3, Array4, Axis};

use crate::Error;
use crate::errors::check_extent;

/// Periodic boundary conditions for the pairs in an [`AtomicBatch`].
///
/// The position of the neighbor image in the pair `(b, a, k)` is
/// `positions[b, neighbors[b, a, k]] + cell_offsets[b, a, k] · cell[b]`, where
/// the cell matrix contains one lattice vector per row.
#[derive(Debug, Clone)]
pub struct PeriodicImages {
    /// Unit cell matrix of each structure, with shape `(B, 3, 3)`
    pub cell: Array3<f64>,
    /// Number of cell vectors to add to each neighbor, as fractional
    /// coordinates with shape `(B, A, K, 3)`
    pub cell_offsets: Array4<f64>,
}

/// Dense, padded input for a batch of `B` atomistic structures, each with up
/// to `A` atoms and up to `K` neighbors per atom.
///
/// This is produced by an external batch builder; the representation code
/// only reads it. Padding atoms have atomic number 0 and `atom_mask` set to
/// `false`, padding neighbors have `neighbor_mask` set to `false`. Neighbor
/// lists must never reference a padding atom from a real one.
#[derive(Debug, Clone)]
pub struct AtomicBatch {
    /// Atomic numbers, with shape `(B, A)`
    pub atomic_numbers: Array2<i32>,
    /// Cartesian positions, with shape `(B, A, 3)`
    pub positions: Array3<f64>,
    /// Periodic boundary conditions, if any
    pub periodic: Option<PeriodicImages>,
    /// Index of the neighbors of each atom, with shape `(B, A, K)`
    pub neighbors: Array3<usize>,
    /// Which entries in `neighbors` are actual neighbors, with shape `(B, A, K)`
    pub neighbor_mask: Array3<bool>,
    /// Which atoms are real atoms (and not padding), with shape `(B, A)`
    pub atom_mask: Array2<bool>,
    /// Auxiliary per-atom properties (partial charges, ligand indicator,
    /// ...) with shape `(B, A, P)`
    pub properties: Array3<f64>,
    /// Total charge of each structure, with shape `(B)`. This is only used
    /// when the model is created with `charged_systems`.
    pub total_charge: Option<Array1<f64>>,
}

/// Extent of the different dimensions of an [`AtomicBatch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchShape {
    /// Number of structures `B`
    pub structures: usize,
    /// Maximal number of atoms per structure `A`
    pub atoms: usize,
    /// Maximal number of neighbors per atom `K`
    pub neighbors: usize,
    /// Number of auxiliary properties per atom `P`
    pub properties: usize,
}

impl AtomicBatch {
    /// Check that all arrays in this batch agree on the size of the
    /// dimensions they share, and return these sizes.
    pub fn validate(&self) -> Result<BatchShape, Error> {
        let (structures, atoms) = self.atomic_numbers.dim();
        let neighbors = self.neighbors.dim().2;
        let properties = self.properties.dim().2;

        let (b, a, spatial) = self.positions.dim();
        check_extent("the number of structures in positions", b, structures)?;
        check_extent("the number of atoms in positions", a, atoms)?;
        check_extent("the last dimension of positions", spatial, 3)?;

        let (b, a, _) = self.neighbors.dim();
        check_extent("the number of structures in neighbors", b, structures)?;
        check_extent("the number of atoms in neighbors", a, atoms)?;

        if self.neighbor_mask.dim() != self.neighbors.dim() {
            return Err(Error::Shape(format!(
                "expected neighbor_mask to have the same shape as neighbors {:?}, got {:?}",
                self.neighbors.dim(), self.neighbor_mask.dim()
            )));
        }

        let (b, a) = self.atom_mask.dim();
        check_extent("the number of structures in atom_mask", b, structures)?;
        check_extent("the number of atoms in atom_mask", a, atoms)?;

        let (b, a, _) = self.properties.dim();
        check_extent("the number of structures in properties", b, structures)?;
        check_extent("the number of atoms in properties", a, atoms)?;

        if let Some(periodic) = &self.periodic {
            let (b, i, j) = periodic.cell.dim();
            check_extent("the number of structures in cell", b, structures)?;
            if (i, j) != (3, 3) {
                return Err(Error::Shape(format!(
                    "expected cell matrices to be 3x3, got {}x{}", i, j
                )));
            }

            let (b, a, k, spatial) = periodic.cell_offsets.dim();
            check_extent("the number of structures in cell_offsets", b, structures)?;
            check_extent("the number of atoms in cell_offsets", a, atoms)?;
            check_extent("the number of neighbors in cell_offsets", k, neighbors)?;
            check_extent("the last dimension of cell_offsets", spatial, 3)?;
        }

        if let Some(total_charge) = &self.total_charge {
            check_extent("the number of structures in total_charge", total_charge.len(), structures)?;
        }

        return Ok(BatchShape { structures, atoms, neighbors, properties });
    }

    /// Get the number of real (non-padding) atoms in each structure
    pub fn atoms_count(&self) -> Array1<usize> {
        self.atom_mask.map_axis(Axis(1), |mask| mask.iter().filter(|&&m| m).count())
    }
}
