use placement::io::{read_assignment, read_facility, write_assignment};
use placement::{
    place_all, pool_guaranteed_capacity, seed_pools, Capacity, Facility, LocalSearch, Objective,
    Optimizer, PoolId, SearchConfig, Slot,
};

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaChaRng;
use testing::{layouts, Layout};

fn load(layout: &Layout) -> Facility {
    read_facility(layout.to_input().as_bytes()).expect("generated layouts are valid")
}

fn seeded(layout: &Layout, rng: &mut ChaChaRng) -> Facility {
    let mut facility = load(layout);
    place_all(&mut facility, rng);
    seed_pools(&mut facility, rng);
    facility
}

/// Guaranteed capacity computed from the servers' own records, ignoring pool member lists.
fn brute_force_capacity(facility: &Facility, pool: PoolId) -> Capacity {
    let mut per_row = vec![0; facility.rows().len()];
    for server in facility.servers() {
        if let (Some(location), Some(p)) = (server.location(), server.pool()) {
            if p == pool {
                per_row[usize::from(location.row)] += server.capacity();
            }
        }
    }
    per_row.iter().sum::<Capacity>() - per_row.iter().copied().max().unwrap_or(0)
}

fn config(iterations: usize) -> SearchConfig {
    SearchConfig {
        swap_iterations: iterations,
        move_iterations: iterations,
        ..SearchConfig::default()
    }
}

proptest! {
    #[test]
    fn test_placement_validity(seed: u64, layout in layouts()) {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        let facility = seeded(&layout, &mut rng);
        prop_assert!(facility.check_consistency().is_empty());
        for server in facility.servers() {
            if let Some(location) = server.location() {
                let row = facility.row(location.row);
                prop_assert!(location.slot + server.size() <= row.num_slots());
                for slot in location.slot..location.slot + server.size() {
                    prop_assert_ne!(row.slot(slot), Some(Slot::Unavailable));
                    prop_assert_eq!(row.occupant_at(slot), Some(server.id()));
                }
                prop_assert!(server.pool().is_some());
            } else {
                prop_assert_eq!(server.pool(), None);
            }
        }
        let placed: usize = facility.rows().iter().map(|r| r.servers().count()).sum();
        prop_assert_eq!(placed, facility.num_placed());
    }

    #[test]
    fn test_monotonic_score_and_fresh_cache(seed: u64, layout in layouts()) {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        let mut facility = seeded(&layout, &mut rng);
        let search_config = config(0);
        let mut search = LocalSearch::new(&mut facility, &mut rng, &search_config);
        let mut score = search.score();
        for iteration in 0..200 {
            if iteration % 2 == 0 {
                search.try_swap();
            } else {
                search.try_move();
            }
            for pool in search.facility().pools() {
                if let Some(cached) = search.objective().cached(pool.id()) {
                    prop_assert_eq!(
                        cached,
                        brute_force_capacity(search.facility(), pool.id())
                    );
                }
            }
            let next = search.score();
            prop_assert!(next >= score);
            score = next;
        }
        prop_assert!(facility.check_consistency().is_empty());
    }

    #[test]
    fn test_guaranteed_capacity_from_scratch(seed: u64, layout in layouts()) {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        let mut facility = load(&layout);
        let score = Optimizer::new(config(100)).optimize(&mut facility, &mut rng);
        let capacities: Vec<_> = facility
            .pools()
            .iter()
            .map(|p| pool_guaranteed_capacity(&facility, p.id()))
            .collect();
        for (idx, capacity) in capacities.iter().enumerate() {
            prop_assert_eq!(*capacity, brute_force_capacity(&facility, PoolId::from(idx)));
        }
        prop_assert_eq!(Some(score), capacities.iter().copied().min());
        prop_assert!(score <= layout.total_capacity());
    }

    #[test]
    fn test_zero_budget_keeps_seeded_score(seed: u64, layout in layouts()) {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        let expected = Objective::new(layout.num_pools).global_score(&seeded(&layout, &mut rng));
        let mut rng = ChaChaRng::seed_from_u64(seed);
        let mut facility = load(&layout);
        prop_assert_eq!(Optimizer::new(config(0)).optimize(&mut facility, &mut rng), expected);
    }

    #[test]
    fn test_written_assignment_rescores_equal(seed: u64, layout in layouts()) {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        let mut facility = load(&layout);
        let score = Optimizer::new(config(50)).optimize(&mut facility, &mut rng);
        let mut output = Vec::new();
        write_assignment(&mut output, &facility).unwrap();

        let mut reloaded = load(&layout);
        read_assignment(output.as_slice(), &mut reloaded).unwrap();
        prop_assert_eq!(Objective::new(layout.num_pools).global_score(&reloaded), score);
        prop_assert!(reloaded.check_consistency().is_empty());
    }
}

#[test]
fn test_search_improves_random_layout() {
    let mut rng = ChaChaRng::seed_from_u64(2015);
    let layout = Layout::random(&mut rng, (8, 40), 120, 10, 0.05, (5, 50));
    let mut facility = seeded(&layout, &mut rng);
    let search_config = config(0);
    let mut search = LocalSearch::new(&mut facility, &mut rng, &search_config);
    let swaps = search.run_swaps(5000, None);
    let moves = search.run_moves(5000, None);
    assert!(swaps.final_score >= swaps.initial_score);
    assert_eq!(moves.initial_score, swaps.final_score);
    assert!(moves.final_score >= moves.initial_score);
    assert!(moves.final_score > swaps.initial_score);
    assert!(facility.check_consistency().is_empty());
}

#[test]
fn test_one_server_per_row() {
    let layout = Layout {
        num_rows: 2,
        num_slots: 3,
        unavailable: vec![],
        servers: vec![(2, 10), (2, 10)],
        num_pools: 1,
    };
    let mut facility = load(&layout);
    let mut rng = ChaChaRng::seed_from_u64(4);
    assert_eq!(Optimizer::new(config(10)).optimize(&mut facility, &mut rng), 10);
}
