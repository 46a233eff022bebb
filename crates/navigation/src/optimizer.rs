//! Greedy nearest-neighbour ordering of the sites of an itinerary.

use indexmap::IndexSet;
use model::{geo::Coordinate, site::Site, WithId};
use utility::id::Id;

/// Orders `sites` for visiting, starting at `start`.
///
/// Sites not in `excluded` are chained greedily: each step picks the closest
/// remaining site (Haversine) to the previously picked one, ties going to the
/// site that comes first in `sites`. Excluded sites follow in their input
/// order, so the result is always a permutation of the input ids.
pub fn optimize(
    start: &Coordinate,
    sites: &[WithId<Site>],
    excluded: &IndexSet<Id<Site>>,
) -> Vec<Id<Site>> {
    let (mut candidates, tail): (Vec<&WithId<Site>>, Vec<&WithId<Site>>) =
        sites.iter().partition(|site| !excluded.contains(&site.id));

    let mut order = Vec::with_capacity(sites.len());
    let mut current = *start;
    while !candidates.is_empty() {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (index, site) in candidates.iter().enumerate() {
            let distance = current.distance_to(&site.content.coordinate());
            // strict comparison keeps the first of equally distant sites
            if distance < best_distance {
                best = index;
                best_distance = distance;
            }
        }
        let next = candidates.remove(best);
        current = next.content.coordinate();
        order.push(next.id.clone());
    }

    order.extend(tail.into_iter().map(|site| site.id.clone()));
    order
}

/// First site of `order` that has not been visited, `None` once all have.
pub fn next_site<'a>(
    order: &'a [Id<Site>],
    visited: &IndexSet<Id<Site>>,
) -> Option<&'a Id<Site>> {
    order.iter().find(|id| !visited.contains(*id))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use model::ExampleData;

    use super::*;

    fn site(id: &str, latitude: f64, longitude: f64) -> WithId<Site> {
        WithId::new(
            Id::from(id),
            Site {
                name: id.to_uppercase(),
                latitude,
                longitude,
                ..Site::example_data()
            },
        )
    }

    fn ids(raw: &[&str]) -> Vec<Id<Site>> {
        raw.iter().map(|id| Id::from(*id)).collect()
    }

    fn scattered() -> Vec<WithId<Site>> {
        vec![
            site("a", 14.60, 120.98),
            site("b", 14.55, 121.02),
            site("c", 14.59, 120.97),
            site("d", 14.65, 121.05),
            site("e", 14.58, 120.99),
            site("f", 14.60, 120.98),
        ]
    }

    #[test]
    fn nearest_neighbour_on_a_line() {
        let sites = vec![site("s3", 0.0, 3.0), site("s1", 0.0, 0.0), site("s2", 0.0, 1.0)];
        let order = optimize(&Coordinate::new(0.0, -1.0), &sites, &IndexSet::new());
        assert_eq!(order, ids(&["s1", "s2", "s3"]));
    }

    #[test]
    fn result_is_a_permutation() {
        let sites = scattered();
        let mut excluded = IndexSet::new();
        excluded.insert(Id::from("c"));
        excluded.insert(Id::from("zz"));
        for start in [(14.5, 120.9), (14.7, 121.1), (0.0, 0.0)] {
            let order = optimize(&Coordinate::from(start), &sites, &excluded);
            assert_eq!(order.len(), sites.len());
            let unique = order.iter().collect::<HashSet<_>>();
            assert_eq!(unique.len(), sites.len());
            assert!(sites.iter().all(|site| unique.contains(&site.id)));
        }
    }

    #[test]
    fn excluded_sites_trail_in_input_order() {
        let sites = scattered();
        let mut visited = IndexSet::new();
        visited.insert(Id::from("e"));
        visited.insert(Id::from("a"));
        let order = optimize(&Coordinate::new(14.58, 120.99), &sites, &visited);
        assert_eq!(&order[4..], &ids(&["a", "e"])[..]);
        assert!(!order[..4].contains(&Id::from("a")));
    }

    #[test]
    fn ties_go_to_the_first_candidate() {
        // "a" and "f" share a location
        let sites = scattered();
        let order = optimize(&Coordinate::new(14.60, 120.98), &sites, &IndexSet::new());
        assert_eq!(&order[..2], &ids(&["a", "f"])[..]);
    }

    #[test]
    fn empty_input_gives_empty_order() {
        assert!(optimize(&Coordinate::new(0.0, 0.0), &[], &IndexSet::new()).is_empty());
    }

    #[test]
    fn all_visited_keeps_original_order() {
        let sites = scattered();
        let visited: IndexSet<Id<Site>> = sites.iter().rev().map(|site| site.id.clone()).collect();
        let order = optimize(&Coordinate::new(0.0, 0.0), &sites, &visited);
        assert_eq!(order, ids(&["a", "b", "c", "d", "e", "f"]));
    }

    #[test]
    fn next_site_is_none_iff_everything_visited() {
        let order = ids(&["a", "b", "c"]);
        let mut visited = IndexSet::new();
        assert_eq!(next_site(&order, &visited), Some(&Id::from("a")));
        visited.insert(Id::from("a"));
        visited.insert(Id::from("c"));
        assert_eq!(next_site(&order, &visited), Some(&Id::from("b")));
        visited.insert(Id::from("b"));
        assert_eq!(next_site(&order, &visited), None);
        assert_eq!(next_site(&[], &visited), None);
    }
}
