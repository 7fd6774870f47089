use crate::cli::SearchArgs;
use crate::config;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use rsmd::core::io::snapshot::read_snapshot;
use rsmd::core::reaction::candidate::ReactionCandidate;
use rsmd::engine::progress::{Progress, ProgressReporter};
use rsmd::engine::random::RandomContext;
use rsmd::engine::universe::Universe;
use std::path::Path;
use tracing::info;

/// Candidates found in one snapshot.
#[derive(Debug)]
pub struct SnapshotCandidates {
    pub cycle: usize,
    pub candidates: Vec<ReactionCandidate>,
}

pub fn run(args: SearchArgs) -> Result<()> {
    let config = config::load(&args.simulation)?;
    let templates = Universe::load_templates(&config.reaction_files, &config.acceptance)?;
    let mut universe = Universe::new(templates, config.units)?;
    let mut random = RandomContext::from_seed_option(config.seed);

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let results = search_snapshots(&mut universe, &mut random, &args.snapshots, &reporter)?;

    let length = universe.units().length;
    for (path, found) in args.snapshots.iter().zip(&results) {
        println!(
            "{} (cycle {}): {} candidate(s)",
            path.display(),
            found.cycle,
            found.candidates.len()
        );
        for candidate in &found.candidates {
            println!(
                "  {} at {:.4} {length}",
                candidate.short_info(),
                candidate.current_distance()
            );
        }
    }
    Ok(())
}

/// Runs the candidate search on each snapshot in turn, numbering them as cycles from 1.
pub fn search_snapshots(
    universe: &mut Universe,
    random: &mut RandomContext,
    snapshots: &[impl AsRef<Path>],
    reporter: &ProgressReporter,
) -> Result<Vec<SnapshotCandidates>> {
    reporter.report(Progress::RunStart {
        first_cycle: 1,
        last_cycle: snapshots.len(),
    });

    let mut results = Vec::with_capacity(snapshots.len());
    for (index, path) in snapshots.iter().enumerate() {
        let path = path.as_ref();
        let cycle = index + 1;
        reporter.report(Progress::CycleStart { cycle });

        info!("Loading topology snapshot from {:?}", path);
        let topology = read_snapshot(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        universe.load(topology);
        let candidates = universe.search_candidates(random)?;

        reporter.report(Progress::StepFinished {
            cycle,
            candidates: candidates.len(),
            outcome: "searched",
        });
        reporter.report(Progress::CycleFinish { cycle });
        results.push(SnapshotCandidates { cycle, candidates });
    }

    reporter.report(Progress::RunFinish);
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};
    use rsmd::core::io::reaction::ReactionParser;
    use rsmd::core::io::snapshot::write_snapshot;
    use rsmd::core::models::atom::Atom;
    use rsmd::core::models::ids::{AtomId, MoleculeId};
    use rsmd::core::models::molecule::Molecule;
    use rsmd::core::models::topology::Topology;
    use rsmd::engine::units::UnitSystem;
    use std::io::Cursor;
    use std::sync::Mutex;
    use tempfile::tempdir;

    const ASSOCIATION: &str = "\
[name]
association
[reactants]
1 A X 1
2 B Y 1
[products]
1 AB X 1 1 1
1 AB Y 2 2 1
[criteria]
dist 1 1 2 1 0.0 0.5
";

    fn snapshot(b_offset: f64) -> Topology {
        let mut topology = Topology::new(Vector3::new(4.0, 4.0, 4.0));
        for (id, name, atom, x) in [(1, "A", "X", 1.0), (2, "B", "Y", 1.0 + b_offset)] {
            topology.push_molecule(Molecule::with_atoms(
                MoleculeId(id),
                name,
                vec![Atom::new(AtomId(id), atom, Point3::new(x, 1.0, 1.0))],
            ));
        }
        topology
    }

    #[test]
    fn each_snapshot_is_searched_as_one_cycle() {
        let dir = tempdir().unwrap();
        let close = dir.path().join("1.toml");
        let far = dir.path().join("2.toml");
        write_snapshot(&snapshot(0.3), &close).unwrap();
        write_snapshot(&snapshot(1.5), &far).unwrap();

        let template = ReactionParser::read_from(&mut Cursor::new(ASSOCIATION)).unwrap();
        let mut universe = Universe::new(vec![template], UnitSystem::default()).unwrap();
        let mut random = RandomContext::seeded(5);
        let finished = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event: Progress| {
            if let Progress::StepFinished {
                cycle, candidates, ..
            } = event
            {
                finished.lock().unwrap().push((cycle, candidates));
            }
        }));

        let results =
            search_snapshots(&mut universe, &mut random, &[close, far], &reporter).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].candidates.len(), 1);
        assert!((results[0].candidates[0].current_distance() - 0.3).abs() < 1e-9);
        assert!(results[1].candidates.is_empty());
        assert_eq!(*finished.lock().unwrap(), vec![(1, 1), (2, 0)]);
    }

    #[test]
    fn unreadable_snapshot_is_reported_with_its_path() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let template = ReactionParser::read_from(&mut Cursor::new(ASSOCIATION)).unwrap();
        let mut universe = Universe::new(vec![template], UnitSystem::default()).unwrap();
        let mut random = RandomContext::seeded(5);

        let err = search_snapshots(
            &mut universe,
            &mut random,
            &[missing.clone()],
            &ProgressReporter::new(),
        )
        .unwrap_err();
        assert!(matches!(err, CliError::FileParsing { path, .. } if path == missing));
    }
}
