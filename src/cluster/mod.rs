// logcore - cluster/mod.rs
//
// Density clustering (DBSCAN), brute-force and k-d tree neighborhood
// queries sharing one expansion algorithm. Both variants must agree on
// labels up to cluster-id relabeling; cross-checked in `kdtree`'s tests.

pub mod dbscan;
pub mod kdtree;

pub use dbscan::fit as fit_brute_force;
pub use kdtree::fit as fit_kdtree;

/// Label assigned to points that never join a cluster.
pub const NOISE: i64 = -1;
