//! 2D k-d tree for fixed-radius neighbor queries
//!
//! Lets the coordinate-backed provider visit only the pairs that can fall
//! inside the largest radius instead of every pair of the pattern.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

/// A 2D k-d tree over point coordinates.
#[derive(Debug)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    coords: Vec<(f64, f64)>,
}

#[derive(Debug)]
struct KdNode {
    /// Index into `coords`
    point_idx: usize,
    /// Split dimension: 0 = x, 1 = y
    split_dim: u8,
    left: Option<usize>,
    right: Option<usize>,
}

impl KdTree {
    /// Build a k-d tree from coordinates.
    ///
    /// Construction is O(n log² n) using median-of-coordinate splitting.
    pub fn build(coords: &[(f64, f64)]) -> Self {
        let coords = coords.to_vec();
        let mut nodes = Vec::with_capacity(coords.len());
        if !coords.is_empty() {
            let mut indices: Vec<usize> = (0..coords.len()).collect();
            build_recursive(&coords, &mut indices, 0, &mut nodes);
        }
        Self { nodes, coords }
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Append to `out` the index of every point within `radius` of
    /// `(qx, qy)`, boundary included. Order is unspecified.
    pub fn within_radius(&self, qx: f64, qy: f64, radius: f64, out: &mut Vec<usize>) {
        if self.nodes.is_empty() || radius < 0.0 {
            return;
        }
        self.radius_recursive(0, qx, qy, radius * radius, out);
    }

    fn radius_recursive(&self, node_idx: usize, qx: f64, qy: f64, radius_sq: f64, out: &mut Vec<usize>) {
        let node = &self.nodes[node_idx];
        let (px, py) = self.coords[node.point_idx];

        let dx = qx - px;
        let dy = qy - py;
        if dx * dx + dy * dy <= radius_sq {
            out.push(node.point_idx);
        }

        let diff = if node.split_dim == 0 { dx } else { dy };

        // Descend into a side only if the splitting line is within reach
        if let Some(left) = node.left {
            if diff <= 0.0 || diff * diff <= radius_sq {
                self.radius_recursive(left, qx, qy, radius_sq, out);
            }
        }
        if let Some(right) = node.right {
            if diff >= 0.0 || diff * diff <= radius_sq {
                self.radius_recursive(right, qx, qy, radius_sq, out);
            }
        }
    }
}

fn build_recursive(
    coords: &[(f64, f64)],
    indices: &mut [usize],
    depth: usize,
    nodes: &mut Vec<KdNode>,
) -> usize {
    let n = indices.len();
    let split_dim = (depth % 2) as u8;

    let key = |i: usize| if split_dim == 0 { coords[i].0 } else { coords[i].1 };
    indices.sort_by(|&a, &b| key(a).total_cmp(&key(b)));

    let median = n / 2;
    let node_idx = nodes.len();
    nodes.push(KdNode {
        point_idx: indices[median],
        split_dim,
        left: None,
        right: None,
    });

    let (left, rest) = indices.split_at_mut(median);
    let right = &mut rest[1..];

    if !left.is_empty() {
        let left_idx = build_recursive(coords, left, depth + 1, nodes);
        nodes[node_idx].left = Some(left_idx);
    }
    if !right.is_empty() {
        let right_idx = build_recursive(coords, right, depth + 1, nodes);
        nodes[node_idx].right = Some(right_idx);
    }

    node_idx
}
