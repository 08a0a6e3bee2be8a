use super::*;
use std::ops::ControlFlow;

const RTREE_CHILDREN_PER_NODE: usize = 8;
const HILBERT_ITERATIONS: u32 = 16;

#[derive(Debug)]
enum RTreeNode {
    Node {
        bbox: BoundingBox,
        children: Vec<RTreeNode>,
    },
    Leaf {
        bbox: BoundingBox,
        hilbert_num: u64,
        index: usize,
    },
}

impl RTreeNode {
    fn bounding_box(&self) -> BoundingBox {
        match self {
            Self::Node { bbox, .. } => *bbox,
            Self::Leaf { bbox, .. } => *bbox,
        }
    }

    fn new_node(children: Vec<Self>) -> Self {
        let mut bbox = BoundingBox::empty();
        for child in &children {
            bbox.union(&child.bounding_box());
        }

        Self::Node { bbox, children }
    }

    /// Visit every leaf whose bounding box overlaps `region`.
    ///
    /// `visit` receives the item, its index in the underlying slice, and the accumulator. Returning
    /// `Break` stops the traversal immediately.
    fn foreach<T, V, F>(
        &self,
        data: &[T],
        region: &BoundingBox,
        visit: &mut F,
        acc: V,
    ) -> ControlFlow<V, V>
    where
        F: FnMut(&T, usize, V) -> ControlFlow<V, V>,
    {
        if !self.bounding_box().overlap(region, 0.0) {
            return ControlFlow::Continue(acc);
        }

        match self {
            Self::Leaf { index, .. } => visit(&data[*index], *index, acc),
            Self::Node { children, .. } => {
                let mut acc = acc;
                for child in children {
                    match child.foreach(data, region, visit, acc) {
                        ControlFlow::Continue(value) => acc = value,
                        brk => return brk,
                    }
                }
                ControlFlow::Continue(acc)
            }
        }
    }
}

/**
 * A read only spatial index over a slice of geographic items.
 *
 * The tree is bulk loaded once: leaves are sorted by their position along a Hilbert curve spanning
 * the data domain and then packed bottom up into nodes of [RTREE_CHILDREN_PER_NODE] children. The
 * Hilbert ordering keeps neighboring items in the same nodes, so region queries only descend into
 * a small part of the tree.
 */
#[derive(Debug)]
pub struct Hilbert2DRTreeView<'a, T> {
    root: RTreeNode,
    data: &'a [T],
}

impl<'a, T: Geo> Hilbert2DRTreeView<'a, T> {
    /// Build a view into the provided list. Returns `None` if the list is empty.
    pub fn build_for(data: &'a [T], precomputed_domain: Option<BoundingBox>) -> Option<Self> {
        if data.is_empty() {
            return None;
        }

        let domain = precomputed_domain.unwrap_or_else(|| Self::build_domain(data));
        let hc = HilbertCurve::new(HILBERT_ITERATIONS, domain);

        let mut level_nodes: Vec<RTreeNode> = data
            .iter()
            .enumerate()
            .map(|(index, item)| RTreeNode::Leaf {
                bbox: item.bounding_box(),
                hilbert_num: hc.translate_to_curve_distance(item.centroid()),
                index,
            })
            .collect();

        level_nodes.sort_unstable_by_key(|node| match node {
            RTreeNode::Leaf { hilbert_num, .. } => *hilbert_num,
            RTreeNode::Node { .. } => u64::MAX,
        });

        while level_nodes.len() > 1 {
            let mut parents = Vec::with_capacity(level_nodes.len() / RTREE_CHILDREN_PER_NODE + 1);
            let mut children = level_nodes.into_iter().peekable();

            while children.peek().is_some() {
                let group: Vec<RTreeNode> = children.by_ref().take(RTREE_CHILDREN_PER_NODE).collect();
                parents.push(RTreeNode::new_node(group));
            }

            level_nodes = parents;
        }

        let root = level_nodes.pop()?;

        Some(Hilbert2DRTreeView { root, data })
    }

    /// Fold over every item whose bounding box overlaps `region`.
    pub fn foreach<V, F>(&self, region: BoundingBox, user_data: V, mut visit: F) -> V
    where
        F: FnMut(&T, usize, V) -> ControlFlow<V, V>,
    {
        match self.root.foreach(self.data, &region, &mut visit, user_data) {
            ControlFlow::Break(value) => value,
            ControlFlow::Continue(value) => value,
        }
    }

    /// Indexes of every item whose centroid is strictly closer than `radius` to `center`.
    pub fn indexes_within(&self, center: Coord, radius: f64) -> Vec<usize> {
        let radius_sq = radius * radius;
        let region = BoundingBox::around(center, radius);

        self.foreach(region, Vec::new(), |item, index, mut hits| {
            if item.centroid().distance_sq(center) < radius_sq {
                hits.push(index);
            }
            ControlFlow::Continue(hits)
        })
    }

    /// The number of items in the view.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn build_domain(data: &[T]) -> BoundingBox {
        let mut mbr = BoundingBox::empty();
        for item in data {
            mbr.union(&item.bounding_box());
        }
        mbr
    }
}

#[derive(Debug)]
struct HilbertCurve {
    // Side length of the curve in cells, 2^iterations.
    side: u32,
    domain: BoundingBox,
    width: f64,
    height: f64,
}

impl HilbertCurve {
    fn new(iterations: u32, domain: BoundingBox) -> Self {
        // iterations must be in the range 1 to 31 inclusive
        assert!((1..=31).contains(&iterations));

        // A degenerate domain (a single point or a line of points) maps everything onto one axis.
        let width = domain.ur.lon - domain.ll.lon;
        let height = domain.ur.lat - domain.ll.lat;
        let width = if width > 0.0 { width } else { 1.0 };
        let height = if height > 0.0 { height } else { 1.0 };

        Self {
            side: 1u32 << iterations,
            domain,
            width,
            height,
        }
    }

    fn coords_to_integer(&self, HilbertCoord { x, y }: HilbertCoord) -> u64 {
        debug_assert!(x < self.side && y < self.side);

        let n = self.side;
        let (mut x, mut y) = (x, y);
        let mut d: u64 = 0;

        let mut s = n / 2;
        while s > 0 {
            let rx = u32::from(x & s > 0);
            let ry = u32::from(y & s > 0);
            d += u64::from(s) * u64::from(s) * u64::from((3 * rx) ^ ry);

            // Rotate the quadrant so the sub-curve has the right orientation.
            if ry == 0 {
                if rx == 1 {
                    x = n - 1 - x;
                    y = n - 1 - y;
                }
                std::mem::swap(&mut x, &mut y);
            }

            s /= 2;
        }

        d
    }

    fn translate_to_hilbert_coords(&self, coord: Coord) -> HilbertCoord {
        let max_dim = self.side - 1;
        let edge = f64::from(self.side);

        // Casting a negative float to u32 saturates at zero.
        let x = ((coord.lon - self.domain.ll.lon) / self.width * edge) as u32;
        let y = ((coord.lat - self.domain.ll.lat) / self.height * edge) as u32;

        HilbertCoord {
            x: x.min(max_dim),
            y: y.min(max_dim),
        }
    }

    fn translate_to_curve_distance(&self, coord: Coord) -> u64 {
        self.coords_to_integer(self.translate_to_hilbert_coords(coord))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HilbertCoord {
    x: u32,
    y: u32,
}
