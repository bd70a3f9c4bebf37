#![warn(clippy::all, clippy::pedantic)]

// disable some style lints
#![allow(clippy::needless_return, clippy::must_use_candidate, clippy::comparison_chain)]
#![allow(clippy::redundant_field_names, clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unreadable_literal, clippy::option_if_let_else, clippy::range_plus_one)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::module_name_repetitions)]

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap, clippy::cast_lossless, clippy::cast_sign_loss)]
#![allow(clippy::default_trait_access)]

// Tests lints
#![cfg_attr(test, allow(clippy::float_cmp))]

//! SchNet representations of atomistic systems.
//!
//! This crate computes per-atom feature vectors for batches of padded
//! atomistic structures, by iteratively applying continuous-filter
//! convolutions over the neighbors of each atom within a cutoff radius. See
//! [`SchNet`] for the entry point.

mod errors;
pub use self::errors::Error;

mod batch;
pub use self::batch::{AtomicBatch, BatchShape, PeriodicImages};

pub mod cutoff;
pub use self::cutoff::{Cutoff, Smoothing};

pub mod basis;
pub use self::basis::GaussianSmearing;

mod distances;
pub use self::distances::pairwise_distances;

pub mod nn;

pub mod interaction;
pub use self::interaction::{CFConv, FilterNetwork, Interaction};

pub mod initializer;
pub use self::initializer::{AtomFeatureInitializer, FeatureInitialization, PropertySelection};

mod representation;
pub use self::representation::{SchNet, SchNetParameters, Filters, Interactions, Representation};
