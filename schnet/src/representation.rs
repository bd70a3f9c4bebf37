use ndarray::{Array1, Array3, Axis};
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::{AtomicBatch, Cutoff, Error, GaussianSmearing, Interaction};
use crate::{AtomFeatureInitializer, FeatureInitialization};
use crate::distances::pairwise_distances;

/// Number of filters used by the interaction blocks
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum Filters {
    /// Use the same number of filters for all interaction blocks
    Single(usize),
    /// Use a different number of filters for each interaction block. This
    /// list must contain exactly `n_interactions` entries.
    PerInteraction(Vec<usize>),
}

impl Default for Filters {
    fn default() -> Filters {
        Filters::Single(128)
    }
}

/// Hyper-parameters of a SchNet representation
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct SchNetParameters {
    /// Number of features describing each atom
    pub n_atom_basis: usize,
    /// Number of filters used in the continuous-filter convolutions
    pub n_filters: Filters,
    /// Number of interaction blocks
    pub n_interactions: usize,
    /// Cutoff radius and smoothing function for the convolutions
    pub cutoff: Cutoff,
    /// Number of Gaussian functions used to expand the pair distances
    pub n_gaussians: usize,
    /// Should the aggregated filters be divided by the number of neighbors?
    pub normalize_filter: bool,
    /// Should all interaction blocks share the same weights?
    pub coupled_interactions: bool,
    /// Should the features after each interaction block be returned?
    pub return_intermediate: bool,
    /// Maximal atomic number (excluded) supported by the embedding
    pub max_z: usize,
    /// Should the Gaussian centers and widths be learnable?
    pub trainable_gaussians: bool,
    /// How to compute the initial atomic features
    pub initialization: FeatureInitialization,
    /// Add a learnable contribution from the total charge of each structure
    /// to the initial features
    pub charged_systems: bool,
    /// Seed for the random weights initialization
    pub seed: u64,
}

impl Default for SchNetParameters {
    fn default() -> SchNetParameters {
        SchNetParameters {
            n_atom_basis: 128,
            n_filters: Filters::default(),
            n_interactions: 3,
            cutoff: Cutoff::step(5.0),
            n_gaussians: 25,
            normalize_filter: false,
            coupled_interactions: false,
            return_intermediate: false,
            max_z: 100,
            trainable_gaussians: false,
            initialization: FeatureInitialization::Embedding,
            charged_systems: false,
            seed: 0,
        }
    }
}

/// Interaction blocks of a SchNet model
#[derive(Debug, Clone, PartialEq)]
pub enum Interactions {
    /// A single block, applied `count` times
    Shared {
        block: Interaction,
        count: usize,
    },
    /// Separate blocks, applied one after the other
    Independent(Vec<Interaction>),
}

impl Interactions {
    /// Number of interaction steps
    pub fn len(&self) -> usize {
        match self {
            Interactions::Shared { count, .. } => *count,
            Interactions::Independent(blocks) => blocks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the blocks in the order they are applied. Shared blocks
    /// are yielded once per step.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &Interaction> + '_> {
        match self {
            Interactions::Shared { block, count } => Box::new(std::iter::repeat(block).take(*count)),
            Interactions::Independent(blocks) => Box::new(blocks.iter()),
        }
    }

    pub fn n_parameters(&self) -> usize {
        match self {
            Interactions::Shared { block, .. } => block.n_parameters(),
            Interactions::Independent(blocks) => blocks.iter().map(Interaction::n_parameters).sum(),
        }
    }
}

/// Output of a SchNet model
#[derive(Debug, Clone, PartialEq)]
pub struct Representation {
    /// Final atomic features, with shape `(B, A, n_atom_basis)`
    pub features: Array3<f64>,
    /// Atomic features before the first interaction and after each of them,
    /// if requested
    pub intermediate: Option<Vec<Array3<f64>>>,
}

/// SchNet representation of atomistic systems.
///
/// The atomic features are initialized from the atomic numbers and/or
/// properties of each atom, and then iteratively refined by interaction
/// blocks gathering information from the neighbors of each atom.
#[derive(Debug, Clone, PartialEq)]
pub struct SchNet {
    /// parameters used to create this model, if any
    parameters: Option<SchNetParameters>,
    initializer: AtomFeatureInitializer,
    expansion: GaussianSmearing,
    interactions: Interactions,
    charge: Option<Array1<f64>>,
    return_intermediate: bool,
}

impl SchNet {
    /// Create a new SchNet model with the given hyper-parameters. The
    /// weights are initialized randomly, from a generator seeded with
    /// `parameters.seed`.
    pub fn new(parameters: SchNetParameters) -> Result<SchNet, Error> {
        if parameters.n_interactions == 0 {
            return Err(Error::Configuration(
                "the number of interaction blocks must be positive".into()
            ));
        }
        parameters.cutoff.validate()?;

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(parameters.seed);

        let initializer = AtomFeatureInitializer::new(
            parameters.initialization,
            parameters.n_atom_basis,
            parameters.max_z,
            &mut rng,
        )?;

        let expansion = GaussianSmearing::new(
            0.0,
            parameters.cutoff.radius,
            parameters.n_gaussians,
            parameters.trainable_gaussians,
        )?;

        let new_interaction = |n_filters, rng: &mut Xoshiro256PlusPlus| Interaction::new(
            parameters.n_atom_basis,
            parameters.n_gaussians,
            n_filters,
            parameters.cutoff,
            parameters.normalize_filter,
            rng,
        );

        let interactions = match &parameters.n_filters {
            Filters::Single(n_filters) => {
                if parameters.coupled_interactions {
                    Interactions::Shared {
                        block: new_interaction(*n_filters, &mut rng)?,
                        count: parameters.n_interactions,
                    }
                } else {
                    let blocks = (0..parameters.n_interactions)
                        .map(|_| new_interaction(*n_filters, &mut rng))
                        .collect::<Result<Vec<_>, _>>()?;
                    Interactions::Independent(blocks)
                }
            }
            Filters::PerInteraction(n_filters) => {
                if n_filters.len() != parameters.n_interactions {
                    return Err(Error::Configuration(format!(
                        "got {} values for the number of filters, but there are {} interaction blocks",
                        n_filters.len(), parameters.n_interactions
                    )));
                }

                if parameters.coupled_interactions {
                    log::warn!(
                        "ignoring coupled_interactions since a different number \
                        of filters is used for each interaction block"
                    );
                }

                let blocks = n_filters.iter()
                    .map(|&n| new_interaction(n, &mut rng))
                    .collect::<Result<Vec<_>, _>>()?;
                Interactions::Independent(blocks)
            }
        };

        let charge = if parameters.charged_systems {
            let std = 1.0 / f64::sqrt(parameters.n_atom_basis as f64);
            Some(Array1::from_shape_simple_fn(parameters.n_atom_basis, || {
                std * rng.sample::<f64, _>(StandardNormal)
            }))
        } else {
            None
        };

        let mut schnet = SchNet::from_parts(
            initializer,
            expansion,
            interactions,
            charge,
            parameters.return_intermediate,
        )?;
        schnet.parameters = Some(parameters);

        log::debug!(
            "created SchNet model with {} interactions and {} parameters",
            schnet.interactions.len(),
            schnet.n_parameters()
        );

        return Ok(schnet);
    }

    /// Create a new SchNet model from hyper-parameters in JSON format.
    /// Missing hyper-parameters take their default value.
    pub fn from_json(parameters: &str) -> Result<SchNet, Error> {
        let parameters = serde_json::from_str::<SchNetParameters>(parameters)?;
        return SchNet::new(parameters);
    }

    /// Create a SchNet model from already existing layers
    pub fn from_parts(
        initializer: AtomFeatureInitializer,
        expansion: GaussianSmearing,
        interactions: Interactions,
        charge: Option<Array1<f64>>,
        return_intermediate: bool,
    ) -> Result<SchNet, Error> {
        if interactions.is_empty() {
            return Err(Error::Configuration(
                "a SchNet model needs at least one interaction block".into()
            ));
        }

        let n_atom_basis = initializer.n_atom_basis();
        for (i, interaction) in interactions.iter().enumerate() {
            if interaction.n_atom_basis() != n_atom_basis {
                return Err(Error::Shape(format!(
                    "interaction block {} expects {} atomic features, but the initializer produces {}",
                    i, interaction.n_atom_basis(), n_atom_basis
                )));
            }

            let n_spatial_basis = interaction.cfconv().filter_network().n_spatial_basis();
            if n_spatial_basis != expansion.size() {
                return Err(Error::Shape(format!(
                    "interaction block {} expects {} expanded distances, but there are {} Gaussian functions",
                    i, n_spatial_basis, expansion.size()
                )));
            }
        }

        if let Some(charge) = &charge {
            if charge.len() != n_atom_basis {
                return Err(Error::Shape(format!(
                    "expected the charge vector to contain {} values, got {}",
                    n_atom_basis, charge.len()
                )));
            }
        }

        return Ok(SchNet {
            parameters: None,
            initializer,
            expansion,
            interactions,
            charge,
            return_intermediate,
        });
    }

    /// Get the hyper-parameters used to create this model, or `None` if it
    /// was created with [`SchNet::from_parts`].
    pub fn parameters(&self) -> Option<&SchNetParameters> {
        self.parameters.as_ref()
    }

    /// Number of features describing each atom
    pub fn n_atom_basis(&self) -> usize {
        self.initializer.n_atom_basis()
    }

    pub fn initializer(&self) -> &AtomFeatureInitializer {
        &self.initializer
    }

    pub fn initializer_mut(&mut self) -> &mut AtomFeatureInitializer {
        &mut self.initializer
    }

    pub fn expansion(&self) -> &GaussianSmearing {
        &self.expansion
    }

    pub fn expansion_mut(&mut self) -> &mut GaussianSmearing {
        &mut self.expansion
    }

    pub fn interactions(&self) -> &Interactions {
        &self.interactions
    }

    pub fn interactions_mut(&mut self) -> &mut Interactions {
        &mut self.interactions
    }

    pub fn charge(&self) -> Option<&Array1<f64>> {
        self.charge.as_ref()
    }

    pub fn charge_mut(&mut self) -> Option<&mut Array1<f64>> {
        self.charge.as_mut()
    }

    pub fn return_intermediate(&self) -> bool {
        self.return_intermediate
    }

    /// Number of learnable scalar parameters in this model. Shared
    /// interaction blocks are only counted once.
    pub fn n_parameters(&self) -> usize {
        let charge = self.charge.as_ref().map_or(0, Array1::len);
        return self.initializer.n_parameters()
            + self.expansion.n_parameters()
            + self.interactions.n_parameters()
            + charge;
    }

    /// Compute the representation of all structures in the `batch`.
    #[time_graph::instrument(name = "SchNet::forward")]
    pub fn forward(&self, batch: &AtomicBatch) -> Result<Representation, Error> {
        batch.validate()?;

        let mut x = self.initializer.forward(batch.atomic_numbers.view(), batch.properties.view())?;

        if let Some(charge) = &self.charge {
            let total_charge = batch.total_charge.as_ref().ok_or_else(|| Error::InvalidInput(
                "this model uses the total charge of the structures, but the batch does not contain it".into()
            ))?;

            let atoms_count = batch.atoms_count();
            for (structure, mut x) in x.axis_iter_mut(Axis(0)).enumerate() {
                if atoms_count[structure] == 0 {
                    continue;
                }

                let per_atom = total_charge[structure] / atoms_count[structure] as f64;
                for mut atom in x.outer_iter_mut() {
                    atom.scaled_add(per_atom, charge);
                }
            }
        }

        let distances = pairwise_distances(
            batch.positions.view(),
            batch.neighbors.view(),
            batch.neighbor_mask.view(),
            batch.periodic.as_ref(),
        )?;
        let expanded = self.expansion.expand(distances.view());

        let mut intermediate = if self.return_intermediate {
            Some(vec![x.clone()])
        } else {
            None
        };

        for interaction in self.interactions.iter() {
            let update = interaction.update(
                x.view(),
                distances.view(),
                expanded.view(),
                batch.neighbors.view(),
                batch.neighbor_mask.view(),
            )?;
            x += &update;

            if let Some(intermediate) = &mut intermediate {
                intermediate.push(x.clone());
            }
        }

        return Ok(Representation {
            features: x,
            intermediate: intermediate,
        });
    }
}
