// logcore - cluster/kdtree.rs
//
// Same DBSCAN expansion as `dbscan::fit`, but neighborhood queries go
// through a balanced k-d tree (median split, axis = depth mod dims)
// instead of a linear scan. Grounded on
// `original_source/src/dbscan_clustering_kdtree.cpp`'s `KDTree::build_tree`
// (median-of-sorted-indices split cycling through dimensions) and
// `search_radius` (near-subtree-always, far-subtree-only-if-splitting-
// plane-is-within-radius pruning). Cross-checked to agree with the
// brute-force variant up to cluster-id relabeling below.

use super::dbscan::{euclidean, validate};
use super::NOISE;
use crate::error::LoaderError;
use std::collections::VecDeque;

struct KdNode {
    point_index: usize,
    axis: usize,
    left: Option<Box<KdNode>>,
    right: Option<Box<KdNode>>,
}

struct KdTree<'a> {
    points: &'a [Vec<f64>],
    root: Option<Box<KdNode>>,
    dims: usize,
}

impl<'a> KdTree<'a> {
    fn build(points: &'a [Vec<f64>]) -> Self {
        let dims = points.first().map(Vec::len).unwrap_or(0);
        let mut indices: Vec<usize> = (0..points.len()).collect();
        let root = build_subtree(points, &mut indices, 0, dims);
        Self { points, root, dims }
    }

    fn range_query(&self, target: usize, eps: f64) -> Vec<usize> {
        let mut found = Vec::new();
        if let Some(root) = &self.root {
            search(root, self.points, &self.points[target], eps, &mut found);
        }
        found
    }
}

fn build_subtree(
    points: &[Vec<f64>],
    indices: &mut [usize],
    depth: usize,
    dims: usize,
) -> Option<Box<KdNode>> {
    if indices.is_empty() || dims == 0 {
        return None;
    }
    let axis = depth % dims;
    indices.sort_by(|&a, &b| points[a][axis].partial_cmp(&points[b][axis]).unwrap());
    let median = indices.len() / 2;
    let point_index = indices[median];

    let (left_slice, rest) = indices.split_at_mut(median);
    let right_slice = &mut rest[1..];
    let left = build_subtree(points, left_slice, depth + 1, dims);
    let right = build_subtree(points, right_slice, depth + 1, dims);

    Some(Box::new(KdNode {
        point_index,
        axis,
        left,
        right,
    }))
}

fn search(node: &KdNode, points: &[Vec<f64>], target: &[f64], eps: f64, found: &mut Vec<usize>) {
    let candidate = &points[node.point_index];
    if euclidean(candidate, target) <= eps {
        found.push(node.point_index);
    }

    let axis_distance = target[node.axis] - candidate[node.axis];
    let (near, far) = if axis_distance <= 0.0 {
        (&node.left, &node.right)
    } else {
        (&node.right, &node.left)
    };

    if let Some(near) = near {
        search(near, points, target, eps, found);
    }
    // Prune the far subtree unless the splitting plane itself is within eps.
    if axis_distance.abs() <= eps {
        if let Some(far) = far {
            search(far, points, target, eps, found);
        }
    }
}

/// Same contract as `dbscan::fit`, backed by a k-d tree for neighborhood
/// queries.
pub fn fit(points: &[Vec<f64>], eps: f64, min_samples: usize) -> Result<Vec<i64>, LoaderError> {
    validate(points)?;

    let tree = KdTree::build(points);
    let n = points.len();
    let mut labels = vec![NOISE; n];
    let mut visited = vec![false; n];
    let mut next_cluster_id = 0i64;

    for point_index in 0..n {
        if visited[point_index] {
            continue;
        }
        visited[point_index] = true;

        let neighbors = tree.range_query(point_index, eps);
        if neighbors.len() < min_samples {
            continue;
        }

        let cluster_id = next_cluster_id;
        next_cluster_id += 1;
        labels[point_index] = cluster_id;

        let mut seeds: VecDeque<usize> = neighbors.into_iter().collect();
        while let Some(seed) = seeds.pop_front() {
            if labels[seed] == NOISE {
                labels[seed] = cluster_id;
            }
            if visited[seed] {
                continue;
            }
            visited[seed] = true;

            let seed_neighbors = tree.range_query(seed, eps);
            if seed_neighbors.len() >= min_samples {
                for candidate in seed_neighbors {
                    if labels[candidate] == NOISE && !seeds.contains(&candidate) {
                        seeds.push_back(candidate);
                    }
                }
            }
        }
    }

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::dbscan;

    fn relabel_canonical(labels: &[i64]) -> Vec<i64> {
        let mut next_id = 0i64;
        let mut mapping = std::collections::HashMap::new();
        labels
            .iter()
            .map(|&label| {
                if label == NOISE {
                    return NOISE;
                }
                *mapping.entry(label).or_insert_with(|| {
                    let id = next_id;
                    next_id += 1;
                    id
                })
            })
            .collect()
    }

    #[test]
    fn agrees_with_brute_force_up_to_relabeling() {
        let points = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.1],
            vec![0.2, 0.0],
            vec![0.15, 0.2],
            vec![10.0, 10.0],
            vec![10.1, 10.1],
            vec![50.0, 50.0],
        ];
        let brute = dbscan::fit(&points, 0.5, 2).unwrap();
        let tree = fit(&points, 0.5, 2).unwrap();
        assert_eq!(relabel_canonical(&brute), relabel_canonical(&tree));
    }

    #[test]
    fn empty_input_is_invalid() {
        assert!(fit(&[], 0.5, 2).is_err());
    }

    #[test]
    fn single_point_is_noise_when_min_samples_exceeds_one() {
        let labels = fit(&[vec![0.0, 0.0]], 1.0, 2).unwrap();
        assert_eq!(labels, vec![NOISE]);
    }
}
