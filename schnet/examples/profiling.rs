use ndarray::{Array2, Array3};

use schnet::{AtomicBatch, Representation, SchNet};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let n_structures = std::env::args().nth(1)
        .map(|n| n.parse::<usize>())
        .transpose()?
        .unwrap_or(64);

    // enable collection of profiling data
    time_graph::enable_data_collection(true);
    // clear any existing collected data
    time_graph::clear_collected_data();

    // run the calculation
    let _representation = compute_schnet(n_structures)?;

    // get the call graph and display it
    let graph = time_graph::get_full_graph();
    // (this requires the "table" feature for the time_graph crate)
    println!("{}", graph.as_short_table());

    // also available for saving profiling data to the disk & future analysis
    // (this requires the "json" feature for the time_graph crate)
    println!("{}", graph.as_json());

    Ok(())
}

/// Compute the SchNet representation of `n_structures` water dimers
fn compute_schnet(n_structures: usize) -> Result<Representation, Box<dyn std::error::Error>> {
    let parameters = r#"{
        "n_atom_basis": 64,
        "n_filters": 64,
        "n_interactions": 3,
        "cutoff": {
            "radius": 5.0,
            "smoothing": {"type": "ShiftedCosine", "width": 0.5}
        },
        "n_gaussians": 25
    }"#;

    let batch = water_dimers(n_structures);

    let representation = time_graph::spanned!("Full calculation", {
        let schnet = SchNet::from_json(parameters)?;
        schnet.forward(&batch)?
    });

    Ok(representation)
}

fn water_dimers(n_structures: usize) -> AtomicBatch {
    let dimer = [
        (8, [0.0, 0.0, 0.1173]),
        (1, [0.0, 0.7572, -0.4692]),
        (1, [0.0, -0.7572, -0.4692]),
        (8, [2.9, 0.0, 0.1173]),
        (1, [2.9, 0.7572, -0.4692]),
        (1, [2.9, -0.7572, -0.4692]),
    ];
    let n_atoms = dimer.len();

    let mut atomic_numbers = Array2::zeros((n_structures, n_atoms));
    let mut positions = Array3::zeros((n_structures, n_atoms, 3));
    let mut neighbors = Array3::zeros((n_structures, n_atoms, n_atoms - 1));
    for b in 0..n_structures {
        let shift = 0.01 * b as f64;
        for (i, (z, position)) in dimer.iter().enumerate() {
            atomic_numbers[[b, i]] = *z;
            for d in 0..3 {
                positions[[b, i, d]] = position[d] + shift * d as f64;
            }

            for (k, j) in (0..n_atoms).filter(|&j| j != i).enumerate() {
                neighbors[[b, i, k]] = j;
            }
        }
    }

    AtomicBatch {
        atomic_numbers,
        positions,
        periodic: None,
        neighbors,
        neighbor_mask: Array3::from_elem((n_structures, n_atoms, n_atoms - 1), true),
        atom_mask: Array2::from_elem((n_structures, n_atoms), true),
        properties: Array3::zeros((n_structures, n_atoms, 1)),
        total_charge: None,
    }
}
