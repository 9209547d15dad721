use pacbelief_core::{
    BehaviorMode, BeliefFilter, BeliefMap, BeliefView, Cell, EvidenceGenerator, GridMap,
    TargetOutcome, TrackerConfig, TransitionModel,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const MAZE: &str = "\
%%%%%%%%%
%.......%
%.%%.%%.%
%.%...%.%
%...%...%
%%%%%%%%%
";

fn assert_belief_invariants(grid: &GridMap, belief: &BeliefMap, eliminated: bool) {
    for (cell, prob) in belief.iter() {
        assert!(prob >= 0.0, "negative mass at {cell}");
        if grid.is_wall(cell.x, cell.y) {
            assert_eq!(prob, 0.0, "mass on wall {cell}");
        }
    }
    if eliminated {
        assert!(belief.is_zero());
    } else {
        assert!((belief.total() - 1.0).abs() < 1e-9, "total {}", belief.total());
    }
}

#[test]
fn single_open_cell_always_holds_all_mass() {
    let grid = GridMap::open(1, 1).expect("grid");
    let config = TrackerConfig::with_shared_mode(2.0, BehaviorMode::Scared, 1);
    let mut filter = BeliefFilter::with_uniform_priors(grid, &config).expect("filter");
    for evidence in [0.0, 3.0, -2.0, 1e6] {
        let beliefs = filter
            .update(&[evidence], Cell::new(0, 0), &[false])
            .expect("update");
        assert_eq!(beliefs[0].get(Cell::new(0, 0)), 1.0);
    }
}

#[test]
fn eliminated_target_is_all_zero_regardless_of_evidence() {
    let grid = GridMap::from_ascii(MAZE).expect("layout");
    let config = TrackerConfig::new(1.0, vec![BehaviorMode::Afraid, BehaviorMode::Confused]);
    let prior = BeliefMap::point(&grid, Cell::new(1, 1));
    let mut filter =
        BeliefFilter::new(grid.clone(), &config, vec![prior.clone(), prior]).expect("filter");
    let beliefs = filter
        .update(&[0.0, 2.0], Cell::new(1, 1), &[true, false])
        .expect("update");
    assert!(beliefs[0].is_zero());
    assert_belief_invariants(&grid, &beliefs[1], false);
    assert_eq!(filter.most_likely(0), None);
}

#[test]
fn impossible_reading_falls_back_to_uniform() {
    let grid = GridMap::from_ascii(MAZE).expect("layout");
    let config = TrackerConfig::with_shared_mode(1.0, BehaviorMode::Confused, 1);
    let mut filter = BeliefFilter::with_uniform_priors(grid.clone(), &config).expect("filter");
    let beliefs = filter
        .update(&[1_000.0], Cell::new(1, 1), &[false])
        .expect("update");
    let expected = 1.0 / grid.open_count() as f64;
    for cell in grid.open_cells() {
        assert!((beliefs[0].get(cell) - expected).abs() < 1e-12);
    }
    assert_belief_invariants(&grid, &beliefs[0], false);
    assert_eq!(
        filter.last_report().expect("report").outcomes,
        vec![TargetOutcome::Reset]
    );
}

#[test]
fn scared_mode_prefers_escape_more_than_confused_mode() {
    let grid = GridMap::from_ascii(MAZE).expect("layout");
    let observer = Cell::new(4, 3);
    let scared = TransitionModel::build(&grid, observer, BehaviorMode::Scared);
    let confused = TransitionModel::build(&grid, observer, BehaviorMode::Confused);
    for cell in grid.open_cells() {
        let distance = cell.manhattan(observer);
        let escapes: Vec<Cell> = grid
            .legal_neighbors(cell)
            .into_iter()
            .filter(|next| next.manhattan(observer) >= distance)
            .collect();
        let closer = grid
            .legal_neighbors(cell)
            .into_iter()
            .any(|next| next.manhattan(observer) < distance);
        if escapes.is_empty() || !closer {
            continue;
        }
        let scared_escape: f64 = escapes.iter().map(|next| scared.probability(cell, *next)).sum();
        let confused_escape: f64 = escapes
            .iter()
            .map(|next| confused.probability(cell, *next))
            .sum();
        assert!(
            scared_escape > confused_escape,
            "{cell}: scared {scared_escape} vs confused {confused_escape}"
        );
    }
}

#[test]
fn single_cell_with_exact_reading_concentrates_belief() {
    let grid = GridMap::from_ascii("%%%\n%.%\n%%%\n").expect("layout");
    let config = TrackerConfig::with_shared_mode(1.0, BehaviorMode::Afraid, 1);
    let mut filter = BeliefFilter::with_uniform_priors(grid, &config).expect("filter");
    let beliefs = filter
        .update(&[0.0], Cell::new(1, 1), &[false])
        .expect("update");
    assert_eq!(beliefs[0].get(Cell::new(1, 1)), 1.0);
}

#[test]
fn simulated_sessions_preserve_mass_and_keep_walls_empty() {
    let grid = GridMap::from_ascii(MAZE).expect("layout");
    let modes = vec![
        BehaviorMode::Scared,
        BehaviorMode::Afraid,
        BehaviorMode::Confused,
    ];
    let config = TrackerConfig::new(2.0, modes.clone());
    let generator = EvidenceGenerator::from_variance(config.sensor_variance).expect("generator");
    let open: Vec<Cell> = grid.open_cells().collect();
    let mut rng = SmallRng::seed_from_u64(42);

    for _ in 0..8 {
        let mut ghosts: Vec<Cell> = (0..modes.len())
            .map(|_| open[rng.gen_range(0..open.len())])
            .collect();
        let priors = ghosts
            .iter()
            .map(|ghost| BeliefMap::point(&grid, *ghost))
            .collect();
        let mut filter = BeliefFilter::new(grid.clone(), &config, priors).expect("filter");
        let mut eaten = vec![false; modes.len()];

        for turn in 0..25 {
            let observer = open[rng.gen_range(0..open.len())];
            for (index, ghost) in ghosts.iter_mut().enumerate() {
                let model = TransitionModel::build(&grid, observer, modes[index]);
                let row = model.row(*ghost);
                *ghost = row[rng.gen_range(0..row.len())].0;
            }
            if turn == 10 {
                eaten[1] = true;
            }
            let evidence = generator.sample_all(&ghosts, observer, &mut rng);
            let beliefs = filter.update(&evidence, observer, &eaten).expect("update");
            for (index, belief) in beliefs.iter().enumerate() {
                assert_belief_invariants(&grid, belief, eaten[index]);
            }
        }
    }
}
