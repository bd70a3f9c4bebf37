use ndarray::{Array3, ArrayView1, ArrayView2, ArrayView3, Axis, Zip};
use ndarray::parallel::prelude::*;

use crate::{Error, PeriodicImages};
use crate::errors::check_extent;

/// Check that the arrays given to [`pairwise_distances`] have consistent
/// shapes, and that all valid neighbors are inside their structure.
fn check_inputs(
    positions: &ArrayView3<'_, f64>,
    neighbors: &ArrayView3<'_, usize>,
    neighbor_mask: &ArrayView3<'_, bool>,
    periodic: Option<&PeriodicImages>,
) -> Result<(), Error> {
    let (n_structures, n_atoms, spatial) = positions.dim();
    check_extent("the last dimension of positions", spatial, 3)?;

    let (b, a, n_neighbors) = neighbors.dim();
    check_extent("the number of structures in neighbors", b, n_structures)?;
    check_extent("the number of atoms in neighbors", a, n_atoms)?;

    if neighbor_mask.dim() != neighbors.dim() {
        return Err(Error::Shape(format!(
            "expected neighbor_mask to have the same shape as neighbors {:?}, got {:?}",
            neighbors.dim(), neighbor_mask.dim()
        )));
    }

    if let Some(periodic) = periodic {
        if periodic.cell.dim() != (n_structures, 3, 3) {
            return Err(Error::Shape(format!(
                "expected cell to have shape {:?}, got {:?}",
                (n_structures, 3, 3), periodic.cell.dim()
            )));
        }

        let expected = (n_structures, n_atoms, n_neighbors, 3);
        if periodic.cell_offsets.dim() != expected {
            return Err(Error::Shape(format!(
                "expected cell_offsets to have shape {:?}, got {:?}",
                expected, periodic.cell_offsets.dim()
            )));
        }
    }

    for ((structure, atom, k), &neighbor) in neighbors.indexed_iter() {
        if neighbor_mask[[structure, atom, k]] && neighbor >= n_atoms {
            return Err(Error::InvalidInput(format!(
                "neighbor {} of atom {} in structure {} has index {}, \
                but there are only {} atoms per structure",
                k, atom, structure, neighbor, n_atoms
            )));
        }
    }

    return Ok(());
}

/// Shift a neighbor position by `offset · cell`
#[inline]
fn image_position(position: ArrayView1<'_, f64>, offset: ArrayView1<'_, f64>, cell: ArrayView2<'_, f64>) -> [f64; 3] {
    let mut image = [position[0], position[1], position[2]];
    for (i, value) in image.iter_mut().enumerate() {
        *value += offset[0] * cell[[0, i]] + offset[1] * cell[[1, i]] + offset[2] * cell[[2, i]];
    }
    return image;
}

/// Compute the distance between each atom and all of its neighbors.
///
/// `positions` has shape `(B, A, 3)`, `neighbors` and `neighbor_mask` have
/// shape `(B, A, K)`. The returned array has shape `(B, A, K)`, and contains
/// the distance between atom `a` and the (possibly periodic image of) atom
/// `neighbors[b, a, k]` in structure `b`. Entries where `neighbor_mask` is
/// `false` are set to zero and the corresponding neighbor index is never
/// read, so these entries must be masked by the caller.
///
/// A pair made of an atom and itself gives a distance of exactly 0.
#[time_graph::instrument(name = "pairwise_distances")]
pub fn pairwise_distances(
    positions: ArrayView3<'_, f64>,
    neighbors: ArrayView3<'_, usize>,
    neighbor_mask: ArrayView3<'_, bool>,
    periodic: Option<&PeriodicImages>,
) -> Result<Array3<f64>, Error> {
    check_inputs(&positions, &neighbors, &neighbor_mask, periodic)?;

    let mut distances = Array3::zeros(neighbors.dim());
    distances.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(structure, mut distances)| {
            let positions = positions.index_axis(Axis(0), structure);
            let neighbors = neighbors.index_axis(Axis(0), structure);
            let mask = neighbor_mask.index_axis(Axis(0), structure);

            let images = periodic.map(|periodic| (
                periodic.cell.index_axis(Axis(0), structure),
                periodic.cell_offsets.index_axis(Axis(0), structure),
            ));

            Zip::indexed(&mut distances)
                .and(&neighbors)
                .and(&mask)
                .for_each(|(atom, k), distance, &neighbor, &valid| {
                    if !valid {
                        *distance = 0.0;
                        return;
                    }

                    let center = positions.row(atom);
                    let other = match images {
                        Some((cell, offsets)) => image_position(
                            positions.row(neighbor),
                            offsets.slice(ndarray::s![atom, k, ..]),
                            cell,
                        ),
                        None => {
                            let other = positions.row(neighbor);
                            [other[0], other[1], other[2]]
                        }
                    };

                    let dx = other[0] - center[0];
                    let dy = other[1] - center[1];
                    let dz = other[2] - center[2];
                    *distance = f64::sqrt(dx * dx + dy * dy + dz * dz);
                });
        });

    return Ok(distances);
}
