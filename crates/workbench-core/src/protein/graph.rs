use super::error::BatchError;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point3;
use std::ops::Range;
use std::str::FromStr;

/// Directed edges in `[source; target]` layout; `target` is the centre node
/// whose neighbourhood the edge belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EdgeIndex {
    pub source: Vec<usize>,
    pub target: Vec<usize>,
}

impl EdgeIndex {
    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.source.iter().copied().zip(self.target.iter().copied())
    }

    fn push(&mut self, source: usize, target: usize) {
        self.source.push(source);
        self.target.push(target);
    }
}

/// How neighbours are chosen: `knn_K` or `eps_R` (radius in Å).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgeSpec {
    Knn(usize),
    Radius(f64),
}

impl FromStr for EdgeSpec {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| BatchError::InvalidEdgeSpec {
            spec: s.to_string(),
            reason: reason.to_string(),
        };
        if let Some(k) = s.strip_prefix("knn_") {
            let k: usize = k
                .parse()
                .map_err(|_| invalid("K must be a positive integer"))?;
            if k == 0 {
                return Err(invalid("K must be a positive integer"));
            }
            Ok(EdgeSpec::Knn(k))
        } else if let Some(r) = s.strip_prefix("eps_") {
            let r: f64 = r.parse().map_err(|_| invalid("radius must be a number"))?;
            if !(r.is_finite() && r > 0.0) {
                return Err(invalid("radius must be positive and finite"));
            }
            Ok(EdgeSpec::Radius(r))
        } else {
            Err(invalid("expected 'knn_<K>' or 'eps_<radius>'"))
        }
    }
}

fn graph_ranges(ptr: &[usize]) -> impl Iterator<Item = Range<usize>> + '_ {
    ptr.windows(2).map(|w| w[0]..w[1])
}

fn query_point(p: &Point3<f64>) -> [f64; 3] {
    [p.x, p.y, p.z]
}

/// Relative widening of tree queries; the exact `<=` test is applied after.
const CUTOFF_SLACK: f64 = 1e-9;

/// One tree per graph; items are node offsets within `range`.
fn graph_tree(pos: &[Point3<f64>], range: &Range<usize>) -> KdTree<f64, 3> {
    let points: Vec<[f64; 3]> = pos[range.clone()].iter().map(query_point).collect();
    (&points).into()
}

/// Neighbours of `center` no farther than `cutoff` (squared distance), self
/// excluded, ordered by distance then node index.
fn neighbours_within(
    tree: &KdTree<f64, 3>,
    pos: &[Point3<f64>],
    range: &Range<usize>,
    center: usize,
    cutoff: f64,
) -> Vec<(f64, usize)> {
    let padded = cutoff + CUTOFF_SLACK * cutoff.max(1.0);
    let mut found: Vec<(f64, usize)> = tree
        .within::<SquaredEuclidean>(&query_point(&pos[center]), padded)
        .into_iter()
        .filter(|n| n.distance <= cutoff)
        .map(|n| (n.distance, range.start + n.item as usize))
        .filter(|&(_, j)| j != center)
        .collect();
    found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    found
}

/// K nearest neighbours per node within each graph of a batch.
///
/// `ptr` holds graph offsets (`ptr[g]..ptr[g + 1]` are the nodes of graph
/// `g`). Self loops are excluded and K is capped at the graph size minus one.
/// Ties at the K-th distance go to the lower node index.
pub fn knn_graph(pos: &[Point3<f64>], ptr: &[usize], k: usize) -> EdgeIndex {
    let mut edges = EdgeIndex::default();
    for range in graph_ranges(ptr) {
        let take = k.min(range.len().saturating_sub(1));
        if take == 0 {
            continue;
        }
        let tree = graph_tree(pos, &range);
        for center in range.clone() {
            let kth = tree
                .nearest_n::<SquaredEuclidean>(&query_point(&pos[center]), take + 1)
                .into_iter()
                .filter(|n| range.start + n.item as usize != center)
                .map(|n| n.distance)
                .take(take)
                .fold(0.0, f64::max);
            for (_, j) in neighbours_within(&tree, pos, &range, center, kth)
                .into_iter()
                .take(take)
            {
                edges.push(j, center);
            }
        }
    }
    edges
}

/// All pairs within `radius` Å inside each graph, self loops excluded.
pub fn radius_graph(pos: &[Point3<f64>], ptr: &[usize], radius: f64) -> EdgeIndex {
    let mut edges = EdgeIndex::default();
    let r2 = radius * radius;
    for range in graph_ranges(ptr) {
        if range.is_empty() {
            continue;
        }
        let tree = graph_tree(pos, &range);
        for center in range.clone() {
            for (_, j) in neighbours_within(&tree, pos, &range, center, r2) {
                edges.push(j, center);
            }
        }
    }
    edges
}

pub fn build_edges(pos: &[Point3<f64>], ptr: &[usize], spec: EdgeSpec) -> EdgeIndex {
    match spec {
        EdgeSpec::Knn(k) => knn_graph(pos, ptr, k),
        EdgeSpec::Radius(r) => radius_graph(pos, ptr, r),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize, offset: f64) -> Vec<Point3<f64>> {
        (0..n).map(|i| Point3::new(offset + i as f64, 0.0, 0.0)).collect()
    }

    #[test]
    fn parses_edge_specs() {
        assert_eq!("knn_8".parse::<EdgeSpec>().unwrap(), EdgeSpec::Knn(8));
        assert_eq!("eps_6.5".parse::<EdgeSpec>().unwrap(), EdgeSpec::Radius(6.5));
        for bad in ["knn_0", "knn_x", "eps_-1", "eps_nan", "radius_5", ""] {
            assert!(
                matches!(bad.parse::<EdgeSpec>(), Err(BatchError::InvalidEdgeSpec { .. })),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn knn_picks_nearest_and_excludes_self() {
        let pos = line(5, 0.0);
        let edges = knn_graph(&pos, &[0, 5], 2);
        assert_eq!(edges.len(), 10);
        let of_node_0: Vec<usize> = edges
            .iter()
            .filter(|&(_, t)| t == 0)
            .map(|(s, _)| s)
            .collect();
        assert_eq!(of_node_0, vec![1, 2]);
        assert!(edges.iter().all(|(s, t)| s != t));
    }

    #[test]
    fn knn_is_capped_by_graph_size_and_never_crosses_graphs() {
        let mut pos = line(3, 0.0);
        pos.extend(line(4, 0.5));
        let ptr = [0, 3, 7];
        let edges = knn_graph(&pos, &ptr, 8);

        assert_eq!(edges.len(), 3 * 2 + 4 * 3);
        for (s, t) in edges.iter() {
            assert_eq!(s < 3, t < 3, "edge {}->{} crosses graphs", s, t);
        }
    }

    #[test]
    fn single_node_graph_has_no_edges() {
        let edges = knn_graph(&line(1, 0.0), &[0, 1], 8);
        assert!(edges.is_empty());
    }

    #[test]
    fn knn_breaks_distance_ties_by_node_index() {
        // Node 2 sits between 1 and 3; with K = 1 the lower index wins.
        let pos = line(5, 0.0);
        let edges = knn_graph(&pos, &[0, 5], 1);
        let of_node_2: Vec<usize> = edges
            .iter()
            .filter(|&(_, t)| t == 2)
            .map(|(s, _)| s)
            .collect();
        assert_eq!(of_node_2, vec![1]);
    }

    #[test]
    fn knn_matches_a_full_scan_on_scattered_points() {
        let pos: Vec<Point3<f64>> = (0..40)
            .map(|i| {
                let t = i as f64;
                Point3::new((t * 1.7).sin() * 9.0, (t * 0.9).cos() * 7.0, t * 0.31)
            })
            .collect();
        let ptr = [0, 25, 40];
        let edges = knn_graph(&pos, &ptr, 8);
        for range in [0..25usize, 25..40] {
            for center in range.clone() {
                let mut expected: Vec<(f64, usize)> = range
                    .clone()
                    .filter(|&j| j != center)
                    .map(|j| ((pos[j] - pos[center]).norm_squared(), j))
                    .collect();
                expected.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                let expected: Vec<usize> = expected.iter().take(8).map(|&(_, j)| j).collect();
                let got: Vec<usize> = edges
                    .iter()
                    .filter(|&(_, t)| t == center)
                    .map(|(s, _)| s)
                    .collect();
                assert_eq!(got, expected, "neighbours of node {}", center);
            }
        }
    }

    #[test]
    fn radius_graph_is_symmetric_within_cutoff() {
        let pos = line(4, 0.0);
        let edges = radius_graph(&pos, &[0, 4], 1.0);
        assert_eq!(edges.len(), 6);
        for (s, t) in edges.iter() {
            assert!(edges.iter().any(|e| e == (t, s)));
            assert_eq!((s as i64 - t as i64).abs(), 1);
        }
    }

    #[test]
    fn radius_graph_never_crosses_graphs() {
        let mut pos = line(3, 0.0);
        pos.extend(line(3, 0.0));
        let edges = radius_graph(&pos, &[0, 3, 6], 5.0);
        assert_eq!(edges.len(), 2 * 3 * 2);
        for (s, t) in edges.iter() {
            assert_eq!(s < 3, t < 3, "edge {}->{} crosses graphs", s, t);
        }
    }
}
