//! Path Search CLI - Run an architecture search from JSON configuration.

use std::path::PathBuf;
use std::time::Instant;

use path_search::{
    schema::SearchConfig,
    search::{PathSearch, SearchRng, SyntheticTrainer, Trainer},
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [seed]", args[0]);
        eprintln!();
        eprintln!("Run a path search against the synthetic trainer.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to search configuration file");
        eprintln!("  seed         Trainer seed (default: derived from random_seed in config)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);

    let config = SearchConfig::from_json_file(&config_path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = config.validate() {
        eprintln!("Invalid config: {}", e);
        std::process::exit(1);
    }

    let trainer_seed: u64 = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SearchRng::from_seed(config.random_seed).next_seed());

    let search = PathSearch::new(config);
    let config = search.config();

    println!("Path Search");
    println!("===========");
    println!("Strategy: {}", config.algorithm.name());
    println!(
        "Network: {} layers x {} modules (noise {})",
        config.trainer.depth, config.trainer.width, config.trainer.noise_std
    );
    println!(
        "Fit: {} epoch(s), batch {}, validation split {}",
        config.fit.epochs, config.fit.batch_size, config.fit.validation_split
    );
    println!("Trainer seed: {}", trainer_seed);
    println!();

    let mut trainer = SyntheticTrainer::new(config.trainer.clone(), trainer_seed);

    println!("Running search...");
    let start = Instant::now();

    let result = search
        .run_with_callback(&mut trainer, |progress| {
            println!(
                "  Round {}/{}: fitness={:.4}, round best={:.4}, best={:.4}, evals={}",
                progress.round,
                progress.total_rounds,
                progress.round_fitness,
                progress.round_best,
                progress.best_fitness,
                progress.evaluations
            );
        })
        .unwrap_or_else(|e| {
            eprintln!("Search failed: {}", e);
            std::process::exit(1);
        });

    let elapsed = start.elapsed();

    println!();
    println!(
        "Best path: {} ({} modules)",
        result.best.genome,
        result.best.genome.module_count()
    );
    println!("  Fitness: {:.6}", result.best.fitness);
    println!(
        "  Expected accuracy: {:.6}",
        trainer.expected_accuracy(&result.best.genome)
    );
    println!();
    println!("History:");
    for (round, fitness) in result.history.iter().enumerate() {
        println!("  {:>3}: {:.6}", round + 1, fitness);
    }
    println!();
    println!("Training counter:");
    println!("{}", trainer.training_counter());
    println!();
    println!(
        "Evaluations: {}, session resets: {}",
        result.stats.total_evaluations, result.stats.session_resets
    );
    println!("Time: {:.2}s", elapsed.as_secs_f32());
}

fn print_example_config() {
    let config = SearchConfig {
        random_seed: Some(42),
        ..Default::default()
    };

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
