#![allow(dead_code)]

use ndarray::{Array2, Array3};

use schnet::AtomicBatch;

/// A single structure, before padding
#[derive(Debug, Clone)]
pub struct Structure {
    pub atomic_numbers: Vec<i32>,
    pub positions: Vec<[f64; 3]>,
}

pub fn water() -> Structure {
    Structure {
        atomic_numbers: vec![8, 1, 1],
        positions: vec![
            [0.0, 0.0, 0.1173],
            [0.0, 0.7572, -0.4692],
            [0.0, -0.7572, -0.4692],
        ],
    }
}

pub fn methane() -> Structure {
    Structure {
        atomic_numbers: vec![6, 1, 1, 1, 1],
        positions: vec![
            [0.0, 0.0, 0.0],
            [0.6291, 0.6291, 0.6291],
            [-0.6291, -0.6291, 0.6291],
            [-0.6291, 0.6291, -0.6291],
            [0.6291, -0.6291, -0.6291],
        ],
    }
}

pub fn carbon_monoxide() -> Structure {
    Structure {
        atomic_numbers: vec![6, 8],
        positions: vec![
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 1.128],
        ],
    }
}

/// Value of the property `property` for an atom with the given atomic number
pub fn atomic_property(atomic_number: i32, property: usize) -> f64 {
    0.1 * atomic_number as f64 * (property + 1) as f64 - 0.3
}

/// Pad the `structures` to the same number of atoms, using all the other
/// atoms in a structure as neighbors of each atom, and `n_properties`
/// properties per atom.
pub fn batch(structures: &[Structure], n_properties: usize) -> AtomicBatch {
    let n_structures = structures.len();
    let n_atoms = structures.iter().map(|s| s.atomic_numbers.len()).max().unwrap_or(0);
    let n_neighbors = n_atoms.saturating_sub(1).max(1);

    let mut atomic_numbers = Array2::zeros((n_structures, n_atoms));
    let mut positions = Array3::zeros((n_structures, n_atoms, 3));
    let mut neighbors = Array3::zeros((n_structures, n_atoms, n_neighbors));
    let mut neighbor_mask = Array3::from_elem((n_structures, n_atoms, n_neighbors), false);
    let mut atom_mask = Array2::from_elem((n_structures, n_atoms), false);
    let mut properties = Array3::zeros((n_structures, n_atoms, n_properties));

    for (b, structure) in structures.iter().enumerate() {
        assert_eq!(structure.atomic_numbers.len(), structure.positions.len());
        let size = structure.atomic_numbers.len();

        for i in 0..size {
            atomic_numbers[[b, i]] = structure.atomic_numbers[i];
            atom_mask[[b, i]] = true;
            for d in 0..3 {
                positions[[b, i, d]] = structure.positions[i][d];
            }

            for p in 0..n_properties {
                properties[[b, i, p]] = atomic_property(structure.atomic_numbers[i], p);
            }

            let mut k = 0;
            for j in 0..size {
                if i == j {
                    continue;
                }
                neighbors[[b, i, k]] = j;
                neighbor_mask[[b, i, k]] = true;
                k += 1;
            }
        }
    }

    AtomicBatch {
        atomic_numbers,
        positions,
        periodic: None,
        neighbors,
        neighbor_mask,
        atom_mask,
        properties,
        total_charge: None,
    }
}
