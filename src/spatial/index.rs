//! Bounding-box spatial index backed by an R-tree.

use geo::{Coord, Rect};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// Wrapper for R-tree indexing of an arbitrary value under a box
#[derive(Debug, Clone)]
pub struct IndexedEntry<T> {
    pub value: T,
    envelope: AABB<[f64; 2]>,
}

impl<T> RTreeObject for IndexedEntry<T> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl<T> PointDistance for IndexedEntry<T> {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        self.envelope.distance_2(point)
    }
}

impl<T> IndexedEntry<T> {
    pub fn new(rect: Rect<f64>, value: T) -> Self {
        Self {
            value,
            envelope: to_aabb(&rect),
        }
    }

    /// Indexed box as a rect
    pub fn rect(&self) -> Rect<f64> {
        let lower = self.envelope.lower();
        let upper = self.envelope.upper();
        Rect::new(
            Coord {
                x: lower[0],
                y: lower[1],
            },
            Coord {
                x: upper[0],
                y: upper[1],
            },
        )
    }
}

fn to_aabb(rect: &Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

/// Box index over projected coordinates.
///
/// Usually bulk-loaded once and queried many times; single inserts are
/// supported for incrementally filled caches. There is no removal, only
/// [`SpatialIndex::clear`].
pub struct SpatialIndex<T> {
    tree: RTree<IndexedEntry<T>>,
}

impl<T> SpatialIndex<T> {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Build the index from a batch of entries
    pub fn build(entries: Vec<(Rect<f64>, T)>) -> Self {
        let indexed: Vec<IndexedEntry<T>> = entries
            .into_iter()
            .map(|(rect, value)| IndexedEntry::new(rect, value))
            .collect();

        Self {
            tree: RTree::bulk_load(indexed),
        }
    }

    pub fn insert(&mut self, rect: Rect<f64>, value: T) {
        self.tree.insert(IndexedEntry::new(rect, value));
    }

    /// All entries whose box intersects `rect` (boundaries included)
    pub fn query_intersecting(&self, rect: &Rect<f64>) -> impl Iterator<Item = &IndexedEntry<T>> {
        self.tree.locate_in_envelope_intersecting(&to_aabb(rect))
    }

    /// All entries whose box contains `point`
    pub fn query_point(&self, point: Coord<f64>) -> impl Iterator<Item = &IndexedEntry<T>> {
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([point.x, point.y]))
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexedEntry<T>> {
        self.tree.iter()
    }
}

impl<T: Ord + Clone> SpatialIndex<T> {
    /// Up to `k` values nearest to `point`, ordered by planar distance and
    /// then by value. `max_distance` (planar units) drops anything farther.
    ///
    /// Entries tied with the k-th distance are all considered before the
    /// cut, so the answer does not depend on how the tree was built.
    pub fn query_nearest(&self, point: Coord<f64>, k: usize, max_distance: Option<f64>) -> Vec<T> {
        if k == 0 {
            return Vec::new();
        }

        let max_distance_2 = max_distance.map(|d| d * d);
        let mut candidates: Vec<(f64, &T)> = Vec::with_capacity(k);

        for (entry, distance_2) in self.tree.nearest_neighbor_iter_with_distance_2(&[point.x, point.y]) {
            if let Some(limit) = max_distance_2 {
                if distance_2 > limit {
                    break;
                }
            }
            if candidates.len() >= k {
                let kth = candidates[k - 1].0;
                if distance_2 > kth {
                    break;
                }
            }
            candidates.push((distance_2, &entry.value));
        }

        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));
        candidates.truncate(k);
        candidates.into_iter().map(|(_, v)| v.clone()).collect()
    }
}

impl<T> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    fn pt(x: f64, y: f64) -> Rect<f64> {
        let c = coord! { x: x, y: y };
        Rect::new(c, c)
    }

    #[test]
    fn test_empty_index() {
        let index: SpatialIndex<u32> = SpatialIndex::build(vec![]);
        assert!(index.is_empty());
        assert!(index.query_nearest(coord! { x: 0.0, y: 0.0 }, 3, None).is_empty());
    }

    #[test]
    fn test_query_intersecting() {
        let index = SpatialIndex::build(vec![
            (pt(0.0, 0.0), 1u32),
            (pt(5.0, 1.0), 2),
            (pt(0.3, 0.2), 3),
        ]);

        let query = Rect::new(coord! { x: -0.5, y: -0.5 }, coord! { x: 0.6, y: 0.6 });
        let mut found: Vec<u32> = index.query_intersecting(&query).map(|e| e.value).collect();
        found.sort();
        assert_eq!(found, vec![1, 3]);
    }

    #[test]
    fn test_query_point_inside_box() {
        let mut index = SpatialIndex::new();
        index.insert(Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 2.0, y: 2.0 }), "a");
        index.insert(Rect::new(coord! { x: 1.0, y: 1.0 }, coord! { x: 3.0, y: 3.0 }), "b");

        let mut found: Vec<&str> = index
            .query_point(coord! { x: 1.5, y: 1.5 })
            .map(|e| e.value)
            .collect();
        found.sort();
        assert_eq!(found, vec!["a", "b"]);
        assert_eq!(index.query_point(coord! { x: 2.5, y: 0.5 }).count(), 0);
    }

    #[test]
    fn test_nearest_orders_by_distance() {
        let index = SpatialIndex::build(vec![
            (pt(3.0, 0.0), 30u32),
            (pt(1.0, 0.0), 10),
            (pt(2.0, 0.0), 20),
            (pt(9.0, 0.0), 90),
        ]);

        let found = index.query_nearest(coord! { x: 0.0, y: 0.0 }, 3, None);
        assert_eq!(found, vec![10, 20, 30]);

        let bounded = index.query_nearest(coord! { x: 0.0, y: 0.0 }, 3, Some(2.5));
        assert_eq!(bounded, vec![10, 20]);
    }

    #[test]
    fn test_nearest_ties_independent_of_build_order() {
        let entries = vec![
            (pt(1.0, 0.0), 7u32),
            (pt(-1.0, 0.0), 3),
            (pt(0.0, 1.0), 5),
            (pt(0.0, -1.0), 4),
        ];
        let mut reversed = entries.clone();
        reversed.reverse();

        let origin = coord! { x: 0.0, y: 0.0 };
        let a = SpatialIndex::build(entries).query_nearest(origin, 2, None);
        let b = SpatialIndex::build(reversed).query_nearest(origin, 2, None);
        assert_eq!(a, vec![3, 4]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_clear() {
        let mut index = SpatialIndex::build(vec![(pt(0.0, 0.0), 1u32)]);
        assert_eq!(index.len(), 1);
        index.clear();
        assert!(index.is_empty());
    }
}
