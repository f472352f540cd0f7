//! End-to-end runs of every search strategy against a scripted trainer.

use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use path_search::schema::{
    BestPolicy, CrossoverPolicy, FitParams, FitResult, GenerationalConfig, PathGenome,
    SearchAlgorithm, SearchConfig, SelectionPolicy, SerialTournamentConfig, ShapeError,
    SyntheticTrainerConfig, TournamentConfig,
};
use path_search::search::{
    GenerationalSearch, Model, PathSearch, SearchRng, SerialTournamentSearch, SyntheticTrainer,
    TournamentSearch, Trainer, TrainerError, TrainerOp, TrainingCounter,
};
use path_search::SearchError;

const DEPTH: usize = 2;
const WIDTH: usize = 8;

fn path(i: usize) -> PathGenome {
    PathGenome::from_indices([vec![i], vec![0]])
}

/// Trainer whose random paths, fitness values and mutations are fixed up front.
struct ScriptedTrainer {
    queue: VecDeque<PathGenome>,
    scores: HashMap<PathGenome, f64>,
    mutations: HashMap<PathGenome, PathGenome>,
    fail_on: Option<TrainerOp>,
    counter: TrainingCounter,
    random_calls: usize,
    mutate_probabilities: Vec<f64>,
    builds: usize,
    resets: usize,
    live_models: Rc<Cell<usize>>,
    live_at_build: Vec<usize>,
    live_at_reset: Vec<usize>,
}

impl ScriptedTrainer {
    fn new(queue: Vec<(PathGenome, f64)>) -> Self {
        let scores = queue.iter().cloned().collect();
        Self {
            queue: queue.into_iter().map(|(p, _)| p).collect(),
            scores,
            mutations: HashMap::new(),
            fail_on: None,
            counter: TrainingCounter::new(DEPTH, WIDTH),
            random_calls: 0,
            mutate_probabilities: Vec::new(),
            builds: 0,
            resets: 0,
            live_models: Rc::new(Cell::new(0)),
            live_at_build: Vec::new(),
            live_at_reset: Vec::new(),
        }
    }

    fn with_score(mut self, genome: PathGenome, fitness: f64) -> Self {
        self.scores.insert(genome, fitness);
        self
    }

    fn with_mutation(mut self, from: PathGenome, to: PathGenome) -> Self {
        self.mutations.insert(from, to);
        self
    }

    fn failing_on(mut self, op: TrainerOp) -> Self {
        self.fail_on = Some(op);
        self
    }

    fn check(&self, op: TrainerOp) -> Result<(), TrainerError> {
        match self.fail_on {
            Some(failing) if failing == op => Err(TrainerError::new(op, "scripted failure")),
            _ => Ok(()),
        }
    }
}

struct ScriptedModel {
    fitness: f64,
    fail: bool,
    live: Rc<Cell<usize>>,
}

impl Drop for ScriptedModel {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

impl Model for ScriptedModel {
    fn fit(&mut self, params: &FitParams) -> Result<FitResult, TrainerError> {
        if self.fail {
            return Err(TrainerError::new(TrainerOp::Fit, "scripted failure"));
        }
        Ok(FitResult {
            val_acc: vec![self.fitness; params.epochs],
            loss: vec![1.0 - self.fitness; params.epochs],
        })
    }
}

impl Trainer for ScriptedTrainer {
    type Model = ScriptedModel;

    fn depth(&self) -> usize {
        DEPTH
    }

    fn width(&self) -> usize {
        WIDTH
    }

    fn random_path(&mut self, _max_modules_per_layer: usize) -> Result<PathGenome, TrainerError> {
        self.check(TrainerOp::RandomPath)?;
        self.random_calls += 1;
        self.queue
            .pop_front()
            .ok_or_else(|| TrainerError::new(TrainerOp::RandomPath, "script exhausted"))
    }

    fn build_model_from_path(&mut self, path: &PathGenome) -> Result<ScriptedModel, TrainerError> {
        self.check(TrainerOp::BuildModel)?;
        self.builds += 1;
        self.live_at_build.push(self.live_models.get());
        self.live_models.set(self.live_models.get() + 1);
        Ok(ScriptedModel {
            fitness: self.scores.get(path).copied().unwrap_or(0.5),
            fail: self.fail_on == Some(TrainerOp::Fit),
            live: Rc::clone(&self.live_models),
        })
    }

    fn mutate_path(
        &mut self,
        path: &PathGenome,
        mutation_prob: f64,
    ) -> Result<PathGenome, TrainerError> {
        self.check(TrainerOp::MutatePath)?;
        self.mutate_probabilities.push(mutation_prob);
        Ok(self.mutations.get(path).cloned().unwrap_or_else(|| path.clone()))
    }

    fn increment_training_counter(&mut self, path: &PathGenome) {
        self.counter.increment(path);
    }

    fn training_counter(&self) -> &TrainingCounter {
        &self.counter
    }

    fn reset_backend_session(&mut self) -> Result<(), TrainerError> {
        self.check(TrainerOp::ResetSession)?;
        self.live_at_reset.push(self.live_models.get());
        self.resets += 1;
        Ok(())
    }
}

fn tournament(population_size: usize, seasons: usize, best: BestPolicy) -> TournamentConfig {
    TournamentConfig {
        population_size,
        seasons,
        max_modules_per_layer: 2,
        best,
    }
}

fn serial(rounds: usize) -> SerialTournamentConfig {
    SerialTournamentConfig {
        rounds,
        max_modules_per_layer: 2,
    }
}

fn generational(population_size: usize, generations: usize) -> GenerationalConfig {
    GenerationalConfig {
        population_size,
        generations,
        clear_session_every: 0,
        max_modules_per_layer: 2,
        keep_fraction: 0.5,
        selection: SelectionPolicy::Truncation,
        crossover: CrossoverPolicy::Alternating,
    }
}

#[test]
fn test_tournament_winner_fills_both_slots() {
    let mutant = PathGenome::from_indices([vec![1], vec![5]]);
    let mut trainer = ScriptedTrainer::new(vec![(path(0), 0.4), (path(1), 0.8)])
        .with_mutation(path(1), mutant.clone());
    let mut search = TournamentSearch::new(
        tournament(2, 1, BestPolicy::FinalRound),
        FitParams::default(),
        SearchRng::new(3),
    );

    let result = search.run(&mut trainer).unwrap();

    assert_eq!(search.population(), &[mutant.clone(), mutant]);
    assert_eq!(trainer.mutate_probabilities.len(), 2);
    // population_size / (depth * width)
    assert!((trainer.mutate_probabilities[0] - 2.0 / 16.0).abs() < 1e-12);
    assert_eq!(result.history.len(), 1);
    assert!((result.history[0] - 0.6).abs() < 1e-9);
    assert_eq!(result.best.genome, path(1));
    assert_eq!(result.best.fitness, 0.8);
    assert_eq!(result.stats.total_evaluations, 2);
    assert_eq!(trainer.counter.total(), 4);
}

#[test]
fn test_tournament_best_policy() {
    let build = || {
        ScriptedTrainer::new(vec![(path(0), 0.4), (path(1), 0.8)])
            .with_score(path(2), 0.3)
            .with_mutation(path(1), path(2))
    };

    let mut trainer = build();
    let final_round = TournamentSearch::new(
        tournament(2, 2, BestPolicy::FinalRound),
        FitParams::default(),
        SearchRng::new(5),
    )
    .run(&mut trainer)
    .unwrap();
    assert_eq!(final_round.best.genome, path(2));
    assert_eq!(final_round.best.fitness, 0.3);

    let mut trainer = build();
    let best_ever = TournamentSearch::new(
        tournament(2, 2, BestPolicy::BestEver),
        FitParams::default(),
        SearchRng::new(5),
    )
    .run(&mut trainer)
    .unwrap();
    assert_eq!(best_ever.best.genome, path(1));
    assert_eq!(best_ever.best.fitness, 0.8);
    assert_eq!(best_ever.rounds.len(), 2);
}

#[test]
fn test_serial_challenger_wins() {
    let mut trainer = ScriptedTrainer::new(vec![(path(0), 0.7), (path(1), 0.9)]);
    let mut search = SerialTournamentSearch::new(serial(1), FitParams::default());

    let result = search.run(&mut trainer).unwrap();

    assert_eq!(result.best.genome, path(1));
    assert_eq!(result.best.fitness, 0.9);
    assert_eq!(result.history, vec![0.9]);
    assert_eq!(search.champion(), Some(&path(1)));
    assert!(trainer.mutate_probabilities.is_empty());
}

#[test]
fn test_serial_champion_defends() {
    let mut trainer = ScriptedTrainer::new(vec![(path(0), 0.9), (path(1), 0.7)]);
    let result = SerialTournamentSearch::new(serial(1), FitParams::default())
        .run(&mut trainer)
        .unwrap();

    assert_eq!(result.best.genome, path(0));
    assert_eq!(result.best.fitness, 0.9);
}

#[test]
fn test_serial_tie_keeps_champion() {
    let mut trainer = ScriptedTrainer::new(vec![(path(0), 0.8), (path(1), 0.8)]);
    let result = SerialTournamentSearch::new(serial(1), FitParams::default())
        .run(&mut trainer)
        .unwrap();

    assert_eq!(result.best.genome, path(0));
}

#[test]
fn test_serial_mutates_between_rounds() {
    let mut trainer = ScriptedTrainer::new(vec![
        (path(0), 0.6),
        (path(1), 0.7),
        (path(2), 0.2),
    ]);
    let result = SerialTournamentSearch::new(serial(2), FitParams::default())
        .run(&mut trainer)
        .unwrap();

    assert_eq!(trainer.random_calls, 3);
    assert_eq!(trainer.mutate_probabilities.len(), 1);
    // 1 / (max_modules_per_layer * depth)
    assert!((trainer.mutate_probabilities[0] - 0.25).abs() < 1e-12);
    assert_eq!(result.history, vec![0.7, 0.7]);
    assert_eq!(result.rounds[1].candidates[0].genome, path(1));
    assert_eq!(result.rounds[1].candidates[1].genome, path(2));
    assert_eq!(result.stats.total_evaluations, 4);
}

#[test]
fn test_generational_single_generation() {
    let mut trainer = ScriptedTrainer::new(vec![
        (path(3), 0.1),
        (path(1), 0.5),
        (path(0), 0.9),
        (path(2), 0.3),
    ]);
    let mut search =
        GenerationalSearch::new(generational(4, 1), FitParams::default(), SearchRng::new(1));

    let result = search.run(&mut trainer).unwrap();

    assert_eq!(result.best.genome, path(0));
    assert_eq!(result.best.fitness, 0.9);
    assert_eq!(result.history, vec![0.9]);
    assert_eq!(search.population(), &[path(0), path(1), path(2), path(3)]);
    assert!(trainer.mutate_probabilities.is_empty());
}

#[test]
fn test_generational_survivors_carry_over() {
    let mut trainer = ScriptedTrainer::new(vec![
        (path(0), 0.9),
        (path(1), 0.5),
        (path(2), 0.3),
        (path(3), 0.1),
    ]);
    let mut search =
        GenerationalSearch::new(generational(4, 2), FitParams::default(), SearchRng::new(9));
    let result = search.run(&mut trainer).unwrap();

    assert_eq!(result.history.len(), 2);
    assert_eq!(trainer.mutate_probabilities.len(), 2);
    assert_eq!(trainer.builds, 8);

    let second = &result.rounds[1].candidates;
    assert_eq!(second.len(), 4);
    assert_eq!(second[0].genome, path(0));
    assert_eq!(second[1].genome, path(1));
    assert_eq!(result.best.genome, path(0));
    assert_eq!(result.history[1], 0.9);
}

#[test]
fn test_generational_roulette_union() {
    let mut trainer = ScriptedTrainer::new(vec![
        (path(0), 0.9),
        (path(1), 0.5),
        (path(2), 0.3),
        (path(3), 0.1),
        (path(4), 0.2),
        (path(5), 0.4),
    ]);
    let config = GenerationalConfig {
        selection: SelectionPolicy::Roulette,
        crossover: CrossoverPolicy::Union,
        ..generational(6, 3)
    };
    let result = GenerationalSearch::new(config, FitParams::default(), SearchRng::new(11))
        .run(&mut trainer)
        .unwrap();

    assert_eq!(result.rounds.len(), 3);
    assert!(result.rounds.iter().all(|r| r.candidates.len() == 6));
    // the elite always survives
    assert!(result.history.iter().all(|&f| f == 0.9));
}

#[test]
fn test_generational_session_resets() {
    let mut trainer = ScriptedTrainer::new((0..4).map(|i| (path(i), 0.2 * i as f64)).collect());
    let config = GenerationalConfig {
        clear_session_every: 2,
        ..generational(4, 5)
    };
    let result = GenerationalSearch::new(config, FitParams::default(), SearchRng::new(2))
        .run(&mut trainer)
        .unwrap();

    assert_eq!(trainer.resets, 2);
    assert_eq!(result.stats.session_resets, 2);
}

#[test]
fn test_models_dropped_before_build_and_reset() {
    let mut trainer = ScriptedTrainer::new((0..4).map(|i| (path(i), 0.2 * i as f64)).collect());
    let config = GenerationalConfig {
        clear_session_every: 1,
        ..generational(4, 3)
    };
    GenerationalSearch::new(config, FitParams::default(), SearchRng::new(4))
        .run(&mut trainer)
        .unwrap();

    assert_eq!(trainer.live_at_build.len(), 12);
    assert!(trainer.live_at_build.iter().all(|&live| live == 0));
    assert_eq!(trainer.live_at_reset, vec![0, 0, 0]);
    assert_eq!(trainer.live_models.get(), 0);
}

#[test]
fn test_oversized_mutation_rejected() {
    let wide = PathGenome::from_indices([vec![0, 1, 2], vec![0]]);
    let mut trainer = ScriptedTrainer::new(vec![(path(0), 0.6), (path(1), 0.7), (path(2), 0.2)])
        .with_mutation(path(1), wide);
    let mut search = SerialTournamentSearch::new(serial(2), FitParams::default());

    let err = search.run(&mut trainer).unwrap_err();

    assert!(matches!(
        err,
        SearchError::Shape(ShapeError::TooManyModules {
            layer: 0,
            count: 3,
            max: 2
        })
    ));
    assert_eq!(trainer.builds, 2);
}

#[test]
fn test_oversized_offspring_mutation_rejected() {
    let mut trainer = ScriptedTrainer::new(vec![
        (path(0), 0.9),
        (path(1), 0.5),
        (path(2), 0.3),
        (path(3), 0.1),
    ]);
    // every alternating child of path(0)/path(1) is one of the parents
    let wide = PathGenome::from_indices([vec![0, 1, 2, 3], vec![0]]);
    trainer = trainer
        .with_mutation(path(0), wide.clone())
        .with_mutation(path(1), wide);
    let err = GenerationalSearch::new(generational(4, 2), FitParams::default(), SearchRng::new(3))
        .run(&mut trainer)
        .unwrap_err();

    assert!(matches!(err, SearchError::Shape(ShapeError::TooManyModules { .. })));
}

#[test]
fn test_trainer_errors_propagate() {
    for op in [
        TrainerOp::RandomPath,
        TrainerOp::BuildModel,
        TrainerOp::Fit,
        TrainerOp::MutatePath,
    ] {
        let mut trainer =
            ScriptedTrainer::new(vec![(path(0), 0.4), (path(1), 0.8)]).failing_on(op);
        let err = TournamentSearch::new(
            tournament(2, 1, BestPolicy::FinalRound),
            FitParams::default(),
            SearchRng::new(0),
        )
        .run(&mut trainer)
        .unwrap_err();

        match err {
            SearchError::Trainer(e) => assert_eq!(e.op, op),
            other => panic!("expected trainer error for {op}, got {other}"),
        }
    }
}

#[test]
fn test_reset_failure_propagates() {
    let mut trainer = ScriptedTrainer::new((0..4).map(|i| (path(i), 0.1)).collect())
        .failing_on(TrainerOp::ResetSession);
    let config = GenerationalConfig {
        clear_session_every: 1,
        ..generational(4, 2)
    };
    let err = GenerationalSearch::new(config, FitParams::default(), SearchRng::new(0))
        .run(&mut trainer)
        .unwrap_err();
    assert!(matches!(err, SearchError::Trainer(e) if e.op == TrainerOp::ResetSession));
}

#[test]
fn test_invalid_config_fails_before_trainer_calls() {
    let mut trainer = ScriptedTrainer::new(vec![(path(0), 0.4)]);
    let err = TournamentSearch::new(
        tournament(1, 1, BestPolicy::FinalRound),
        FitParams::default(),
        SearchRng::new(0),
    )
    .run(&mut trainer)
    .unwrap_err();

    assert!(matches!(err, SearchError::Config(_)));
    assert_eq!(trainer.random_calls, 0);
    assert_eq!(trainer.builds, 0);

    let config = GenerationalConfig {
        keep_fraction: 0.1,
        ..generational(4, 2)
    };
    let err = GenerationalSearch::new(config, FitParams::default(), SearchRng::new(0))
        .run(&mut trainer)
        .unwrap_err();
    assert!(matches!(err, SearchError::Config(_)));
    assert_eq!(trainer.random_calls, 0);
}

#[test]
fn test_fitness_out_of_range_rejected() {
    let mut trainer = ScriptedTrainer::new(vec![(path(0), 1.5), (path(1), 0.2)]);
    let err = SerialTournamentSearch::new(serial(1), FitParams::default())
        .run(&mut trainer)
        .unwrap_err();
    assert!(matches!(err, SearchError::FitnessOutOfRange(f) if f == 1.5));
}

#[test]
fn test_oversized_random_path_rejected() {
    let wide = PathGenome::from_indices([vec![0, 1, 2], vec![0]]);
    let mut trainer = ScriptedTrainer::new(vec![(wide, 0.5), (path(1), 0.5)]);
    let err = SerialTournamentSearch::new(serial(1), FitParams::default())
        .run(&mut trainer)
        .unwrap_err();
    assert!(matches!(err, SearchError::Shape(_)));
}

#[test]
fn test_path_search_is_reproducible() {
    let config = SearchConfig {
        algorithm: SearchAlgorithm::Generational(GenerationalConfig {
            population_size: 6,
            generations: 4,
            ..Default::default()
        }),
        trainer: SyntheticTrainerConfig {
            depth: 3,
            width: 6,
            noise_std: 0.01,
        },
        random_seed: Some(17),
        ..Default::default()
    };

    let run = || {
        let mut trainer = SyntheticTrainer::new(config.trainer.clone(), 17);
        PathSearch::new(config.clone()).run(&mut trainer).unwrap()
    };
    let first = run();
    let second = run();

    assert_eq!(first.best.genome, second.best.genome);
    assert_eq!(first.history, second.history);
    assert_eq!(first.stats.strategy, "generational");
    assert!(first.history.iter().all(|f| (0.0..=1.0).contains(f)));
}

#[test]
fn test_path_search_dispatches_every_strategy() {
    let algorithms = [
        SearchAlgorithm::Tournament(TournamentConfig {
            population_size: 4,
            seasons: 3,
            ..Default::default()
        }),
        SearchAlgorithm::SerialTournament(SerialTournamentConfig {
            rounds: 3,
            ..Default::default()
        }),
        SearchAlgorithm::Generational(GenerationalConfig {
            population_size: 4,
            generations: 3,
            ..Default::default()
        }),
    ];

    for algorithm in algorithms {
        let config = SearchConfig {
            algorithm,
            random_seed: Some(1),
            ..Default::default()
        };
        let mut trainer = SyntheticTrainer::new(config.trainer.clone(), 1);
        let mut seen = 0;
        let result = PathSearch::new(config)
            .run_with_callback(&mut trainer, |progress| {
                seen += 1;
                assert_eq!(progress.round, seen);
                assert!(progress.best_fitness >= progress.round_best);
            })
            .unwrap();

        assert_eq!(seen, 3);
        assert_eq!(result.history.len(), 3);
        assert_eq!(result.stats.rounds, 3);
        assert!(trainer.training_counter().total() > 0);
    }
}
