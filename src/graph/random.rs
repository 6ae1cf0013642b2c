//! Random G(n, p) instances
//!
//! Each of the n(n-1)/2 vertex pairs is joined independently with
//! probability `density`. The generator is seeded so an instance can be
//! reproduced from its `(n, density, seed)` triple.

use super::{Graph, GraphError};
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Generate a random graph
pub fn random_graph(n: usize, density: f64, seed: u64) -> Result<Graph, GraphError> {
    if !(0.0..=1.0).contains(&density) {
        return Err(GraphError::InvalidDensity(density));
    }

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut edges = Vec::new();
    for u in 0..n {
        for v in (u + 1)..n {
            if rng.gen_bool(density) {
                edges.push((u, v));
            }
        }
    }
    Graph::from_edges(n, edges)
}

/// Instance name used when persisting results of a random run
pub fn instance_name(n: usize, density: f64, seed: u64) -> String {
    format!("random_n{}_p{}_s{}", n, density, seed)
}
