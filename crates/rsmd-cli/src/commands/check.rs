use crate::cli::CheckArgs;
use crate::config;
use crate::error::Result;
use rsmd::engine::config::{Acceptance, SimulationConfig};
use rsmd::engine::universe::Universe;
use tracing::info;

pub fn run(args: CheckArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let config = config::load(&args.simulation)?;
    let templates = Universe::load_templates(&config.reaction_files, &config.acceptance)?;
    Universe::new(templates.clone(), config.units)?;

    println!("{}", describe(&config));
    for (path, template) in config.reaction_files.iter().zip(&templates) {
        println!("\n{} ({})", template.name, path.display());
        println!("{template}");
    }
    println!(
        "\n✓ Configuration and {} reaction template(s) are valid.",
        templates.len()
    );
    Ok(())
}

fn describe(config: &SimulationConfig) -> String {
    let units = &config.units;
    let criterion = match config.acceptance {
        Acceptance::Metropolis { temperature } => format!(
            "Metropolis at {temperature} {} (RT = {:.4} {})",
            units.temperature,
            units.thermal_energy(temperature),
            units.energy
        ),
        Acceptance::Rate { frequency } => format!("rate with frequency {frequency}"),
    };
    let start = match config.restart {
        Some(restart) => format!(
            "restart at cycle {} from cycle {}",
            restart.cycle, restart.baseline
        ),
        None => "fresh start".to_string(),
    };
    let seed = match config.seed {
        0 => "random".to_string(),
        seed => seed.to_string(),
    };
    format!(
        "Simulation: {} cycles, {start}, seed {seed}\nAcceptance: {criterion}",
        config.cycles
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsmd::engine::config::{RestartPoint, SimulationConfigBuilder};
    use rsmd::engine::units::UnitSystem;
    use std::path::PathBuf;

    #[test]
    fn description_names_criterion_and_start() {
        let config = SimulationConfigBuilder::new()
            .cycles(20)
            .seed(3)
            .acceptance(Acceptance::Metropolis { temperature: 300.0 })
            .units(UnitSystem::from_energy_unit("kcal/mol").unwrap())
            .reaction_file(PathBuf::from("a.reaction"))
            .restart(RestartPoint {
                cycle: 8,
                baseline: 6,
            })
            .build()
            .unwrap();

        let description = describe(&config);
        assert!(description.contains("20 cycles"));
        assert!(description.contains("restart at cycle 8 from cycle 6"));
        assert!(description.contains("seed 3"));
        assert!(description.contains("Metropolis at 300 K (RT = 0.5962 kcal/mol)"));
    }
}
