// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::cmp::Ordering;

/// A union-find structure for finding and merging connected components
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    /// Initialize a new union-find object with `n` elements in `n` sets
    pub fn new(n: usize) -> Self {
        UnionFind {
            parent: (0..n).collect(),
            rank: vec![1; n],
        }
    }

    /// Find the root of the set containing `x`
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        // Path compression
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }

        root
    }

    /// Merge sets containing `x` and `y`
    pub fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);

        if root_x != root_y {
            match self.rank[root_x].cmp(&self.rank[root_y]) {
                Ordering::Greater => self.parent[root_y] = root_x,
                Ordering::Less => self.parent[root_x] = root_y,
                Ordering::Equal => {
                    self.parent[root_y] = root_x;
                    self.rank[root_x] += 1;
                }
            }
        }
    }

    /// Check if `x` and `y` belong to the same set
    pub fn connected(&mut self, x: usize, y: usize) -> bool {
        self.find(x) == self.find(y)
    }
}

/// Neighbourhood used to decide whether two pixels touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// Edge neighbours only
    Four,
    /// Edge and diagonal neighbours
    Eight,
}

/// Two-pass connected component labeling on a binary mask
///
/// Labels are sequential (1, 2, 3, ..) and assigned in raster order of each
/// component's first pixel. Background pixels are labelled 0.
///
/// # Arguments
///
/// * `width` - Width of mask
/// * `height` - Height of mask
/// * `mask` - A row-major foreground mask
/// * `connectivity` - Four or eight connectivity
///
/// # Examples
///
/// ```
/// use czarr_core::cv::{Connectivity, label_components};
///
/// let mask = vec![true, false, false, true];
///
/// let (labels, n) = label_components(2, 2, &mask, Connectivity::Eight);
/// assert_eq!(n, 1);
/// assert_eq!(labels, [1, 0, 0, 1]);
///
/// let (labels, n) = label_components(2, 2, &mask, Connectivity::Four);
/// assert_eq!(n, 2);
/// assert_eq!(labels, [1, 0, 0, 2]);
/// ```
pub fn label_components(
    width: usize,
    height: usize,
    mask: &[bool],
    connectivity: Connectivity,
) -> (Vec<u32>, usize) {
    let size = width * height;

    let mut labels = vec![0u32; size];
    let mut next_label = 1usize;
    let mut uf = UnionFind::new(size + 1);

    // Assign preliminary labels (1st pass)
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if !mask[idx] {
                continue;
            }

            let mut neighbors = [0u32; 4];
            let mut n = 0;

            // Left
            if x > 0 && mask[idx - 1] {
                neighbors[n] = labels[idx - 1];
                n += 1;
            }

            // Top
            if y > 0 && mask[idx - width] {
                neighbors[n] = labels[idx - width];
                n += 1;
            }

            if connectivity == Connectivity::Eight && y > 0 {
                // Top-left
                if x > 0 && mask[idx - width - 1] {
                    neighbors[n] = labels[idx - width - 1];
                    n += 1;
                }

                // Top-right
                if x + 1 < width && mask[idx - width + 1] {
                    neighbors[n] = labels[idx - width + 1];
                    n += 1;
                }
            }

            if n == 0 {
                labels[idx] = next_label as u32;
                next_label += 1;
            } else {
                let min_label = *neighbors[..n].iter().min().unwrap_or(&neighbors[0]);
                labels[idx] = min_label;

                for &label in &neighbors[..n] {
                    uf.union(min_label as usize, label as usize);
                }
            }
        }
    }

    // Resolve provisional labels to sequential labels (2nd pass)
    let mut sequential = vec![0u32; next_label];
    let mut count = 0usize;

    for label in labels.iter_mut() {
        if *label == 0 {
            continue;
        }

        let root = uf.find(*label as usize);
        if sequential[root] == 0 {
            count += 1;
            sequential[root] = count as u32;
        }

        *label = sequential[root];
    }

    (labels, count)
}

/// Number of pixels carrying each label, indexed by label
///
/// # Arguments
///
/// * `labels` - A row-major label image
/// * `count` - Largest label value in `labels`
pub fn component_sizes(labels: &[u32], count: usize) -> Vec<usize> {
    let mut sizes = vec![0usize; count + 1];
    for &label in labels {
        sizes[label as usize] += 1;
    }

    sizes[0] = 0;
    sizes
}

#[cfg(test)]
mod test {

    use super::*;

    fn four_regions() -> (usize, usize, [bool; 9]) {
        let mut buffer = [false; 9];

        buffer[0] = true;
        buffer[2] = true;
        buffer[6] = true;
        buffer[8] = true;

        (3, 3, buffer)
    }

    fn three_regions() -> (usize, usize, [bool; 9]) {
        let mut buffer = [false; 9];

        buffer[0] = true;
        buffer[2] = true;
        buffer[6] = true;
        buffer[7] = true;
        buffer[8] = true;

        (3, 3, buffer)
    }

    fn touching_regions() -> (usize, usize, [bool; 9]) {
        let mut buffer = [false; 9];

        buffer[0] = true;
        buffer[2] = true;
        buffer[4] = true;
        buffer[6] = true;
        buffer[7] = true;
        buffer[8] = true;

        (3, 3, buffer)
    }

    #[test]
    fn test_four_regions() {
        let (w, h, buffer) = four_regions();

        let (labels, n) = label_components(w, h, &buffer, Connectivity::Eight);

        assert_eq!(n, 4);
        assert_eq!(labels, vec![1, 0, 2, 0, 0, 0, 3, 0, 4]);
    }

    #[test]
    fn test_three_regions() {
        let (w, h, buffer) = three_regions();

        let (labels, n) = label_components(w, h, &buffer, Connectivity::Eight);

        assert_eq!(n, 3);
        assert_eq!(labels, vec![1, 0, 2, 0, 0, 0, 3, 3, 3]);
    }

    #[test]
    fn test_middle_regions() {
        let (w, h, buffer) = touching_regions();

        let (labels, n) = label_components(w, h, &buffer, Connectivity::Eight);
        assert_eq!(n, 1);
        assert!(labels.iter().zip(buffer.iter()).all(|(l, m)| (*l == 1) == *m));

        let (labels, n) = label_components(w, h, &buffer, Connectivity::Four);
        assert_eq!(n, 3);
        assert_eq!(labels, vec![1, 0, 2, 0, 3, 0, 3, 3, 3]);
    }

    #[test]
    fn test_u_shape_merges_to_one_label() {
        #[rustfmt::skip]
        let buffer = [
            true, false, true,
            true, false, true,
            true, true,  true,
        ];

        let (labels, n) = label_components(3, 3, &buffer, Connectivity::Four);
        assert_eq!(n, 1);
        assert_eq!(labels, vec![1, 0, 1, 1, 0, 1, 1, 1, 1]);
    }

    #[test]
    fn test_component_sizes() {
        let (w, h, buffer) = three_regions();
        let (labels, n) = label_components(w, h, &buffer, Connectivity::Eight);

        assert_eq!(component_sizes(&labels, n), vec![0, 1, 1, 3]);
    }

    #[test]
    fn test_empty_mask() {
        let (labels, n) = label_components(4, 2, &[false; 8], Connectivity::Eight);

        assert_eq!(n, 0);
        assert!(labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn test_union_find() {
        let mut uf = UnionFind::new(5);
        uf.union(0, 1);
        uf.union(3, 4);

        assert!(uf.connected(0, 1));
        assert!(!uf.connected(1, 3));

        uf.union(1, 4);
        assert!(uf.connected(0, 3));
    }
}
