//! Initial atomic features, built from the atomic numbers and/or auxiliary
//! per-atom properties.
use ndarray::{Array3, ArrayView2, ArrayView3, Axis, s};
use rand::Rng;

use crate::Error;
use crate::nn::{Dense, Embedding};

/// Which auxiliary properties should be used to initialize atomic features
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
#[serde(tag = "type")]
pub enum PropertySelection {
    /// Use all the properties. The batch must contain exactly `count`
    /// properties per atom.
    All {
        /// Number of properties per atom
        count: usize,
    },
    /// Use a single property, at the given index
    Single {
        /// Index of the property to use
        index: usize,
    },
}

impl PropertySelection {
    /// Get the number of properties in this selection
    pub fn size(&self) -> usize {
        match self {
            PropertySelection::All { count } => *count,
            PropertySelection::Single { .. } => 1,
        }
    }

    /// Select the corresponding properties from the full set of properties
    /// with shape `(B, A, P)`
    pub fn select<'a>(&self, properties: ArrayView3<'a, f64>) -> Result<ArrayView3<'a, f64>, Error> {
        let n_properties = properties.dim().2;
        match *self {
            PropertySelection::All { count } => {
                if n_properties != count {
                    return Err(Error::Shape(format!(
                        "expected {} properties per atom, got {}", count, n_properties
                    )));
                }
                return Ok(properties);
            }
            PropertySelection::Single { index } => {
                if index >= n_properties {
                    return Err(Error::Shape(format!(
                        "can not select property {}, there are only {} properties per atom",
                        index, n_properties
                    )));
                }
                return Ok(properties.slice_move(s![.., .., index..index + 1]));
            }
        }
    }
}

/// How the initial atomic features should be computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
#[serde(tag = "type")]
pub enum FeatureInitialization {
    /// Learnable embedding of the atomic number
    Embedding,
    /// Dense layer applied to the selected auxiliary properties
    Properties {
        /// Which properties to use
        selection: PropertySelection,
    },
    /// Concatenation of a dense layer applied to the selected auxiliary
    /// properties (first half of the features) and a learnable embedding of
    /// the atomic number (second half of the features)
    Combined {
        /// Which properties to use
        selection: PropertySelection,
    },
}

impl Default for FeatureInitialization {
    fn default() -> FeatureInitialization {
        FeatureInitialization::Embedding
    }
}

/// Layers computing the initial atomic features
#[derive(Debug, Clone, PartialEq)]
pub enum AtomFeatureInitializer {
    /// Embedding of the atomic number
    Embedding(Embedding),
    /// Dense layer on the auxiliary properties
    Properties {
        dense: Dense,
        selection: PropertySelection,
        /// atomic numbers are still restricted to `[0, max_z)`
        max_z: usize,
    },
    /// Dense layer on the auxiliary properties, concatenated with an
    /// embedding of the atomic number
    Combined {
        dense: Dense,
        embedding: Embedding,
        selection: PropertySelection,
    },
}

impl AtomFeatureInitializer {
    /// Create the layers for the given `initialization` mode, producing
    /// `n_atom_basis` features per atom, and supporting atomic numbers up to
    /// `max_z` (excluded).
    pub fn new<R: Rng>(
        initialization: FeatureInitialization,
        n_atom_basis: usize,
        max_z: usize,
        rng: &mut R,
    ) -> Result<AtomFeatureInitializer, Error> {
        if n_atom_basis == 0 {
            return Err(Error::Configuration(
                "the number of atomic features must be positive".into()
            ));
        }

        match initialization {
            FeatureInitialization::Embedding => {
                let embedding = Embedding::new(max_z, n_atom_basis, rng)?;
                return Ok(AtomFeatureInitializer::Embedding(embedding));
            }
            FeatureInitialization::Properties { selection } => {
                if max_z == 0 {
                    return Err(Error::Configuration(
                        "the maximal atomic number must be positive".into()
                    ));
                }
                let dense = Dense::new(selection.size(), n_atom_basis, true, None, rng)?;
                return Ok(AtomFeatureInitializer::Properties { dense, selection, max_z });
            }
            FeatureInitialization::Combined { selection } => {
                if n_atom_basis % 2 != 0 {
                    return Err(Error::Configuration(format!(
                        "the number of atomic features must be even to combine \
                        embedding and properties, got {}", n_atom_basis
                    )));
                }

                let half = n_atom_basis / 2;
                let embedding = Embedding::new(max_z, half, rng)?;
                let dense = Dense::new(selection.size(), half, true, None, rng)?;
                return Ok(AtomFeatureInitializer::Combined { dense, embedding, selection });
            }
        }
    }

    /// Number of features produced for each atom
    pub fn n_atom_basis(&self) -> usize {
        match self {
            AtomFeatureInitializer::Embedding(embedding) => embedding.width(),
            AtomFeatureInitializer::Properties { dense, .. } => dense.n_outputs(),
            AtomFeatureInitializer::Combined { dense, embedding, .. } => dense.n_outputs() + embedding.width(),
        }
    }

    /// Maximal atomic number (excluded) accepted by this initializer
    pub fn max_z(&self) -> usize {
        match self {
            AtomFeatureInitializer::Embedding(embedding) => embedding.max_z(),
            AtomFeatureInitializer::Properties { max_z, .. } => *max_z,
            AtomFeatureInitializer::Combined { embedding, .. } => embedding.max_z(),
        }
    }

    pub fn n_parameters(&self) -> usize {
        match self {
            AtomFeatureInitializer::Embedding(embedding) => embedding.n_parameters(),
            AtomFeatureInitializer::Properties { dense, .. } => dense.n_parameters(),
            AtomFeatureInitializer::Combined { dense, embedding, .. } => {
                dense.n_parameters() + embedding.n_parameters()
            }
        }
    }

    /// Compute the initial features from `atomic_numbers` with shape `(B,
    /// A)` and auxiliary `properties` with shape `(B, A, P)`.
    ///
    /// All atomic numbers must be in `[0, max_z)`, even when the features
    /// only depend on the properties.
    pub fn forward(&self, atomic_numbers: ArrayView2<'_, i32>, properties: ArrayView3<'_, f64>) -> Result<Array3<f64>, Error> {
        let max_z = self.max_z();
        for &z in atomic_numbers {
            if z < 0 || z as usize >= max_z {
                return Err(Error::InvalidInput(format!(
                    "atomic number {} is outside of the supported range [0, {})", z, max_z
                )));
            }
        }

        match self {
            AtomFeatureInitializer::Embedding(embedding) => embedding.forward(atomic_numbers),
            AtomFeatureInitializer::Properties { dense, selection, .. } => {
                dense.forward(selection.select(properties)?)
            }
            AtomFeatureInitializer::Combined { dense, embedding, selection } => {
                let (n_structures, n_atoms) = atomic_numbers.dim();
                let (b, a, _) = properties.dim();
                if (b, a) != (n_structures, n_atoms) {
                    return Err(Error::Shape(format!(
                        "properties are defined for {}x{} atoms, but atomic numbers for {}x{}",
                        b, a, n_structures, n_atoms
                    )));
                }

                let from_properties = dense.forward(selection.select(properties)?)?;
                let from_atomic_numbers = embedding.forward(atomic_numbers)?;

                let features = ndarray::concatenate(
                    Axis(2), &[from_properties.view(), from_atomic_numbers.view()]
                ).map_err(|e| Error::Shape(e.to_string()))?;
                return Ok(features);
            }
        }
    }
}
