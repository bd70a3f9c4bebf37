//! Learnable building blocks shared by the different parts of the model.

mod activation;
pub use self::activation::{Activation, shifted_softplus};

mod dense;
pub use self::dense::Dense;

mod embedding;
pub use self::embedding::Embedding;
