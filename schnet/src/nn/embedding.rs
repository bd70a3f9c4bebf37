use ndarray::{Array2, Array3, ArrayView2, Axis};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::Error;

/// Lookup table associating a learnable vector to each atomic number.
///
/// The atomic number 0 is reserved for padding atoms, and always maps to the
/// zero vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// table with shape `(max_z, width)`
    table: Array2<f64>,
}

impl Embedding {
    /// Create a new embedding for atomic numbers in `[0, max_z)`, each
    /// represented by a vector of size `width`. The table is initialized
    /// following a standard normal distribution.
    pub fn new<R: Rng>(max_z: usize, width: usize, rng: &mut R) -> Result<Embedding, Error> {
        if max_z == 0 || width == 0 {
            return Err(Error::Configuration(format!(
                "embedding table must not be empty, got max_z={} and width={}",
                max_z, width
            )));
        }

        let mut table = Array2::from_shape_simple_fn((max_z, width), || rng.sample(StandardNormal));
        table.row_mut(0).fill(0.0);

        return Ok(Embedding { table });
    }

    /// Maximal atomic number (excluded) supported by this embedding
    pub fn max_z(&self) -> usize {
        self.table.nrows()
    }

    /// Size of the vector associated with each atomic number
    pub fn width(&self) -> usize {
        self.table.ncols()
    }

    /// Get the lookup table, with shape `(max_z, width)`
    pub fn table(&self) -> &Array2<f64> {
        &self.table
    }

    /// Get mutable access to the lookup table. The padding row should stay
    /// zero.
    pub fn table_mut(&mut self) -> &mut Array2<f64> {
        &mut self.table
    }

    /// Number of learnable scalar parameters. The padding row is not
    /// learnable.
    pub fn n_parameters(&self) -> usize {
        (self.max_z() - 1) * self.width()
    }

    /// Get the vectors associated with the `atomic_numbers` of shape `(B, A)`
    /// as an array of shape `(B, A, width)`
    pub fn forward(&self, atomic_numbers: ArrayView2<'_, i32>) -> Result<Array3<f64>, Error> {
        for &z in atomic_numbers {
            if z < 0 || z as usize >= self.max_z() {
                return Err(Error::InvalidInput(format!(
                    "atomic number {} is outside of the range supported by the embedding [0, {})",
                    z, self.max_z()
                )));
            }
        }

        let (n_structures, n_atoms) = atomic_numbers.dim();
        let mut output = Array3::zeros((n_structures, n_atoms, self.width()));
        for ((structure, atom), &z) in atomic_numbers.indexed_iter() {
            if z == 0 {
                continue;
            }
            output.index_axis_mut(Axis(0), structure)
                .row_mut(atom)
                .assign(&self.table.row(z as usize));
        }

        return Ok(output);
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{array, s};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    use super::*;

    #[test]
    fn lookup() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let embedding = Embedding::new(10, 4, &mut rng).unwrap();
        assert_eq!(embedding.max_z(), 10);
        assert_eq!(embedding.width(), 4);
        assert_eq!(embedding.n_parameters(), 36);

        let output = embedding.forward(array![[6, 8, 0], [1, 1, 6]].view()).unwrap();
        assert_eq!(output.dim(), (2, 3, 4));

        assert_eq!(output.slice(s![0, 0, ..]), embedding.table().row(6));
        assert_eq!(output.slice(s![0, 1, ..]), embedding.table().row(8));
        assert_eq!(output.slice(s![0, 2, ..]), array![0.0, 0.0, 0.0, 0.0]);
        assert_eq!(output.slice(s![1, 0, ..]), output.slice(s![1, 1, ..]));
        assert_eq!(output.slice(s![1, 2, ..]), output.slice(s![0, 0, ..]));

        assert_ne!(embedding.table().row(6), embedding.table().row(8));
    }

    #[test]
    fn padding_is_always_zero() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let mut embedding = Embedding::new(3, 2, &mut rng).unwrap();
        assert_eq!(embedding.table().row(0), array![0.0, 0.0]);

        embedding.table_mut().fill(3.0);
        let output = embedding.forward(array![[0, 2]].view()).unwrap();
        assert_eq!(output, array![[[0.0, 0.0], [3.0, 3.0]]]);
    }

    #[test]
    fn invalid_atomic_numbers() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let embedding = Embedding::new(10, 4, &mut rng).unwrap();

        let error = embedding.forward(array![[6, 10]].view()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid input: atomic number 10 is outside of the range supported by the embedding [0, 10)"
        );

        let error = embedding.forward(array![[-1, 1]].view()).unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));

        assert!(matches!(Embedding::new(0, 4, &mut rng), Err(Error::Configuration(_))));
    }
}
