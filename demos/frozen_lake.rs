use rand::SeedableRng;
use rand_pcg::Pcg64;
use std::path::PathBuf;
use symbios_pathfinder::{
    Environment,
    config::Config,
    encoding::format_gene,
    grid::GridWorld,
    manager::PopulationManager,
};

fn render(env: &GridWorld) -> String {
    let size = env.size() as i32;
    let mut out = String::new();
    for row in 0..size {
        for col in 0..size {
            let cell = (row, col);
            out.push(if cell == env.start() {
                'S'
            } else if cell == env.goal_position() {
                'G'
            } else if env.is_hazard(cell) {
                'H'
            } else {
                '.'
            });
        }
        out.push('\n');
    }
    out
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("demos/frozen_lake.toml"));
    let config = Config::load(&path)?;

    let mut layout_rng = Pcg64::seed_from_u64(config.search.rng_seed);
    let env = GridWorld::generate(&config.grid, &mut layout_rng)?;
    println!("Lake layout ({}):\n{}", path.display(), render(&env));

    let mut manager = PopulationManager::new(config.search, env)?;
    let stats = manager.run_with_callback(|stats| {
        if stats.generation() % 100 == 0 {
            println!(
                "Generation {}: best fitness {:.3} ({})",
                stats.generation(),
                stats.best_fitness(),
                format_gene(stats.best_gene())
            );
        }
    });

    println!("{}", serde_json::to_string_pretty(&stats)?);
    if stats.is_solved() {
        let replay = manager.evaluate(stats.best_gene());
        println!(
            "Winning path: {} ({} moves)",
            format_gene(&stats.best_gene()[..replay.steps_applied]),
            replay.steps_applied
        );
    }
    Ok(())
}
