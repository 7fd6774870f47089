use nalgebra::{Point3, Vector3};
use rand::rngs::mock::StepRng;
use rsmd::core::io::reaction::ReactionParser;
use rsmd::core::io::statistics::{METROPOLIS_HEADER, RATE_HEADER, StatisticsWriter};
use rsmd::core::io::traits::{CollaboratorError, EnergyReader, TopologyIo};
use rsmd::core::models::atom::Atom;
use rsmd::core::models::ids::{AtomId, MoleculeId};
use rsmd::core::models::molecule::Molecule;
use rsmd::core::models::topology::Topology;
use rsmd::core::reaction::template::ReactionTemplate;
use rsmd::engine::config::{Acceptance, SimulationConfig, SimulationConfigBuilder};
use rsmd::engine::error::EngineError;
use rsmd::engine::md::MdEngine;
use rsmd::engine::progress::{Progress, ProgressReporter};
use rsmd::engine::random::RandomContext;
use rsmd::engine::shutdown::{CIVILISED_SIGNAL, ShutdownController};
use rsmd::engine::state::{AcceptanceSummary, Checkpoint};
use rsmd::engine::transaction::StepState;
use rsmd::engine::units::UnitSystem;
use rsmd::engine::universe::Universe;
use rsmd::workflows::metropolis::MetropolisPolicy;
use rsmd::workflows::rate::RatePolicy;
use rsmd::workflows::simulation::Simulation;
use rsmd::workflows::{AcceptancePolicy, Collaborators, StepOutcome, StepReport};
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
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
[energy]
-66
[activation]
10
[rate]
0.0 1.0
";

fn association() -> ReactionTemplate {
    ReactionParser::read_from(&mut Cursor::new(ASSOCIATION)).unwrap()
}

fn single(id: usize, name: &str, atom: &str, position: Point3<f64>) -> Molecule {
    Molecule::with_atoms(
        MoleculeId(id),
        name,
        vec![Atom::new(AtomId(id), atom, position)],
    )
}

/// One A-B pair, 0.3 apart.
fn pair_system() -> Topology {
    let mut topology = Topology::new(Vector3::new(5.0, 5.0, 5.0));
    topology.push_molecule(single(1, "A", "X", Point3::new(1.0, 1.0, 1.0)));
    topology.push_molecule(single(2, "B", "Y", Point3::new(1.3, 1.0, 1.0)));
    topology
}

/// A1 is close to B2 and B5, A3 is close to B4.
fn crowded_system() -> Topology {
    let mut topology = Topology::new(Vector3::new(5.0, 5.0, 5.0));
    topology.push_molecule(single(1, "A", "X", Point3::new(1.0, 1.0, 1.0)));
    topology.push_molecule(single(2, "B", "Y", Point3::new(1.2, 1.0, 1.0)));
    topology.push_molecule(single(3, "A", "X", Point3::new(3.0, 3.0, 3.0)));
    topology.push_molecule(single(4, "B", "Y", Point3::new(3.2, 3.0, 3.0)));
    topology.push_molecule(single(5, "B", "Y", Point3::new(1.0, 1.3, 1.0)));
    topology
}

/// Serves the committed structure of a cycle from what was written for it, falling back to
/// the initial structure. Relaxation is the identity unless a displacement is configured.
#[derive(Default)]
struct MemoryIo {
    initial: Topology,
    written: HashMap<usize, Topology>,
    displacement: Option<Vector3<f64>>,
}

impl MemoryIo {
    fn new(initial: Topology) -> Self {
        Self {
            initial,
            ..Self::default()
        }
    }
}

impl TopologyIo for MemoryIo {
    fn read(&mut self, topology: &mut Topology, cycle: usize) -> Result<(), CollaboratorError> {
        *topology = self
            .written
            .get(&cycle)
            .cloned()
            .unwrap_or_else(|| self.initial.clone());
        Ok(())
    }

    fn read_relaxed(
        &mut self,
        topology: &mut Topology,
        cycle: usize,
    ) -> Result<(), CollaboratorError> {
        let mut relaxed = self
            .written
            .get(&cycle)
            .cloned()
            .ok_or_else(|| CollaboratorError::Message(format!("nothing written for {cycle}")))?;
        if let Some(shift) = self.displacement {
            for molecule in relaxed.molecules_mut() {
                for atom in molecule.atoms_mut() {
                    atom.position += shift;
                }
            }
        }
        *topology = relaxed;
        Ok(())
    }

    fn write(&mut self, topology: &Topology, cycle: usize) -> Result<(), CollaboratorError> {
        self.written.insert(cycle, topology.clone());
        Ok(())
    }
}

struct ScriptedEnergy(f64);

impl EnergyReader for ScriptedEnergy {
    fn read_potential_energy_difference(
        &mut self,
        _cycle: usize,
        _baseline: usize,
    ) -> Result<f64, CollaboratorError> {
        Ok(self.0)
    }
}

/// Records every call and optionally raises a signal after the MD sequence of a cycle.
struct RecordingMd {
    calls: Vec<String>,
    relaxation_succeeds: bool,
    signal_after: Option<(usize, i32, Arc<ShutdownController>)>,
}

impl RecordingMd {
    fn new(relaxation_succeeds: bool) -> Self {
        Self {
            calls: Vec::new(),
            relaxation_succeeds,
            signal_after: None,
        }
    }

    fn raise_signal(&self, cycle: usize) {
        if let Some((at, signal, shutdown)) = &self.signal_after {
            if *at == cycle {
                shutdown.notify(*signal);
            }
        }
    }
}

impl MdEngine for RecordingMd {
    fn run_initial(&mut self) -> Result<(), CollaboratorError> {
        self.calls.push("initial".to_string());
        Ok(())
    }

    fn run(&mut self, cycle: usize) -> Result<(), CollaboratorError> {
        self.calls.push(format!("run {cycle}"));
        self.raise_signal(cycle);
        Ok(())
    }

    fn run_appending(&mut self, cycle: usize, baseline: usize) -> Result<(), CollaboratorError> {
        self.calls.push(format!("append {cycle} {baseline}"));
        self.raise_signal(cycle);
        Ok(())
    }

    fn run_relaxation(&mut self, cycle: usize) -> Result<bool, CollaboratorError> {
        self.calls.push(format!("relax {cycle}"));
        Ok(self.relaxation_succeeds)
    }

    fn run_energy_computation(
        &mut self,
        cycle: usize,
        baseline: usize,
    ) -> Result<(), CollaboratorError> {
        self.calls.push(format!("energy {cycle} {baseline}"));
        Ok(())
    }

    fn cleanup(&mut self, cycle: usize) -> Result<(), CollaboratorError> {
        self.calls.push(format!("cleanup {cycle}"));
        Ok(())
    }
}

fn universe() -> Universe {
    Universe::new(vec![association()], UnitSystem::default()).unwrap()
}

fn config(cycles: usize, acceptance: Acceptance) -> SimulationConfig {
    SimulationConfigBuilder::new()
        .cycles(cycles)
        .seed(42)
        .acceptance(acceptance)
        .reaction_file("association.reaction".into())
        .build()
        .unwrap()
}

const METROPOLIS: Acceptance = Acceptance::Metropolis { temperature: 300.0 };
const RATE: Acceptance = Acceptance::Rate { frequency: 1.0 };

#[test]
fn metropolis_commits_favourable_reaction() {
    let mut universe = universe();
    let mut random = RandomContext::from_rng(StepRng::new(0, 0));
    let mut md = RecordingMd::new(true);
    let mut io = MemoryIo::new(pair_system());
    let mut energy = ScriptedEnergy(0.0);
    let mut policy = MetropolisPolicy::new(300.0, UnitSystem::default(), &[association()]);

    let report = policy
        .reactive_step(
            &mut universe,
            &mut random,
            &mut Collaborators {
                md: &mut md,
                topology_io: &mut io,
                energy: &mut energy,
            },
            1,
            0,
        )
        .unwrap();

    assert_eq!(report.state, StepState::Accepted);
    assert_eq!(report.baseline, 1);
    assert_eq!(report.candidates, 1);
    assert_eq!(
        report.outcome,
        StepOutcome::Metropolis {
            chosen_reaction: Some("association".to_string())
        }
    );
    assert!(!report.movement.unwrap().is_suspicious());
    assert_eq!(md.calls, vec!["relax 1", "energy 1 0"]);

    let written = &io.written[&1];
    assert_eq!(written.len(), 1);
    let product = written.molecule(MoleculeId(1)).unwrap();
    assert_eq!(product.name(), "AB");
    assert_eq!(product.atoms()[0].id, AtomId(1));
    assert_eq!(product.atoms()[1].id, AtomId(2));
    assert_eq!(product.atoms()[1].position, Point3::new(1.3, 1.0, 1.0));
}

#[test]
fn metropolis_rejects_unfavourable_reaction_and_cleans_up() {
    let mut universe = universe();
    let mut random = RandomContext::from_rng(StepRng::new(u64::MAX, 0));
    let mut md = RecordingMd::new(true);
    let mut io = MemoryIo::new(pair_system());
    let mut energy = ScriptedEnergy(100.0);
    let mut policy = MetropolisPolicy::new(300.0, UnitSystem::default(), &[association()]);

    let report = policy
        .reactive_step(
            &mut universe,
            &mut random,
            &mut Collaborators {
                md: &mut md,
                topology_io: &mut io,
                energy: &mut energy,
            },
            1,
            0,
        )
        .unwrap();

    assert_eq!(report.state, StepState::Rejected);
    assert_eq!(report.baseline, 0);
    assert_eq!(md.calls, vec!["relax 1", "energy 1 0", "cleanup 1"]);
    let AcceptanceSummary::Metropolis(summary) = policy.summary() else {
        panic!("expected a Metropolis summary");
    };
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.accepted, 0);
}

const LOOSE_ASSOCIATION: &str = "\
[name]
loose association
[reactants]
1 A X 1
2 B Y 1
[products]
1 AB X 1 1 1
1 AB Y 2 2 1
[criteria]
dist 1 1 2 1 0.0 4.0
[energy]
-66
[activation]
10
";

/// Runs the reactive step of cycle 5 on an A-B pair 3.0 apart, with cycle 2 as baseline.
/// The energy difference read back puts the acceptance probability at exactly one half.
fn loose_pair_step(draw: u64) -> (StepReport, Vec<String>) {
    let template = ReactionParser::read_from(&mut Cursor::new(LOOSE_ASSOCIATION)).unwrap();
    let units = UnitSystem::default();
    let mut universe = Universe::new(vec![template.clone()], units).unwrap();
    let mut topology = Topology::new(Vector3::new(10.0, 10.0, 10.0));
    topology.push_molecule(single(1, "A", "X", Point3::new(2.0, 2.0, 2.0)));
    topology.push_molecule(single(2, "B", "Y", Point3::new(5.0, 2.0, 2.0)));

    let mut random = RandomContext::from_rng(StepRng::new(draw, 0));
    let mut md = RecordingMd::new(true);
    let mut io = MemoryIo::new(topology);
    let mut energy = ScriptedEnergy(66.0 + units.thermal_energy(300.0) * 2.0_f64.ln());
    let mut policy = MetropolisPolicy::new(300.0, units, &[template]);
    assert!((policy.acceptance_probability(energy.0 - 66.0) - 0.5).abs() < 1e-12);

    let report = policy
        .reactive_step(
            &mut universe,
            &mut random,
            &mut Collaborators {
                md: &mut md,
                topology_io: &mut io,
                energy: &mut energy,
            },
            5,
            2,
        )
        .unwrap();
    (report, md.calls)
}

#[test]
fn metropolis_draw_below_acceptance_probability_commits() {
    let (report, calls) = loose_pair_step(0);

    assert_eq!(report.candidates, 1);
    assert_eq!(report.state, StepState::Accepted);
    assert_eq!(report.baseline, 5);
    assert_eq!(calls, vec!["relax 5", "energy 5 2"]);
}

#[test]
fn metropolis_draw_above_acceptance_probability_rolls_back() {
    let (report, calls) = loose_pair_step(u64::MAX);

    assert_eq!(report.candidates, 1);
    assert_eq!(report.state, StepState::Rejected);
    assert_eq!(report.baseline, 2);
    assert_eq!(calls, vec!["relax 5", "energy 5 2", "cleanup 5"]);
}

#[test]
fn metropolis_counts_failed_relaxation_as_rejection() {
    let mut universe = universe();
    let mut random = RandomContext::from_rng(StepRng::new(0, 0));
    let mut md = RecordingMd::new(false);
    let mut io = MemoryIo::new(pair_system());
    let mut energy = ScriptedEnergy(0.0);
    let mut policy = MetropolisPolicy::new(300.0, UnitSystem::default(), &[association()]);

    let report = policy
        .reactive_step(
            &mut universe,
            &mut random,
            &mut Collaborators {
                md: &mut md,
                topology_io: &mut io,
                energy: &mut energy,
            },
            1,
            0,
        )
        .unwrap();

    assert_eq!(report.state, StepState::RejectedFailedRelaxation);
    assert_eq!(report.state.label(), "rej_relax");
    assert_eq!(report.baseline, 0);
    assert!(report.movement.is_none());
    assert_eq!(md.calls, vec!["relax 1", "cleanup 1"]);

    let AcceptanceSummary::Metropolis(summary) = policy.summary() else {
        panic!("expected a Metropolis summary");
    };
    assert_eq!(summary.rejected_failed_relaxation, 1);
    assert_eq!(summary.failed_relaxations["association"], 1);
}

#[test]
fn rate_reacts_every_accepted_candidate_and_skips_consumed_ones() {
    let mut universe = universe();
    let mut random = RandomContext::from_rng(StepRng::new(0, 0));
    let mut md = RecordingMd::new(true);
    let mut io = MemoryIo::new(crowded_system());
    let mut energy = ScriptedEnergy(0.0);
    let mut policy = RatePolicy::new(1.0);

    let report = policy
        .reactive_step(
            &mut universe,
            &mut random,
            &mut Collaborators {
                md: &mut md,
                topology_io: &mut io,
                energy: &mut energy,
            },
            1,
            0,
        )
        .unwrap();

    assert_eq!(report.candidates, 3);
    assert_eq!(
        report.outcome,
        StepOutcome::Rate {
            accepted: 2,
            attempted: 2
        }
    );
    assert_eq!(report.state, StepState::Accepted);
    assert_eq!(report.baseline, 1);
    assert_eq!(md.calls, vec!["relax 1"]);

    let written = &io.written[&1];
    let summary: Vec<(usize, &str)> = written
        .molecules()
        .iter()
        .map(|molecule| (molecule.id().0, molecule.name()))
        .collect();
    assert_eq!(summary, vec![(1, "AB"), (2, "AB"), (3, "B")]);
    let atom_ids: Vec<usize> = written.atoms().map(|atom| atom.id.0).collect();
    assert_eq!(atom_ids, vec![1, 2, 3, 4, 5]);
    // A1 reacted with B5, so B2 is left over.
    assert_eq!(
        written.molecule(MoleculeId(3)).unwrap().atoms()[0].position,
        Point3::new(1.2, 1.0, 1.0)
    );
}

#[test]
fn rate_treats_failed_relaxation_as_fatal() {
    let mut universe = universe();
    let mut random = RandomContext::from_rng(StepRng::new(0, 0));
    let mut md = RecordingMd::new(false);
    let mut io = MemoryIo::new(pair_system());
    let mut energy = ScriptedEnergy(0.0);
    let mut policy = RatePolicy::new(1.0);

    let result = policy.reactive_step(
        &mut universe,
        &mut random,
        &mut Collaborators {
            md: &mut md,
            topology_io: &mut io,
            energy: &mut energy,
        },
        4,
        3,
    );

    assert!(matches!(result, Err(EngineError::RelaxationFailed { cycle: 4 })));
}

#[test]
fn rate_with_zero_frequency_only_propagates() {
    let mut universe = universe();
    let mut random = RandomContext::from_rng(StepRng::new(0, 0));
    let mut md = RecordingMd::new(true);
    let mut io = MemoryIo::new(pair_system());
    let mut energy = ScriptedEnergy(0.0);
    let mut policy = RatePolicy::new(0.0);

    let report = policy
        .reactive_step(
            &mut universe,
            &mut random,
            &mut Collaborators {
                md: &mut md,
                topology_io: &mut io,
                energy: &mut energy,
            },
            2,
            1,
        )
        .unwrap();

    assert_eq!(report.state, StepState::MdOnly);
    assert_eq!(report.baseline, 1);
    assert_eq!(
        report.outcome,
        StepOutcome::Rate {
            accepted: 0,
            attempted: 1
        }
    );
    assert!(md.calls.is_empty());
    assert!(io.written.is_empty());
}

#[test]
fn relaxation_displacement_is_reported_as_suspicious_movement() {
    let mut universe = universe();
    let mut random = RandomContext::from_rng(StepRng::new(0, 0));
    let mut md = RecordingMd::new(true);
    let mut system = pair_system();
    system.push_molecule(Molecule::with_atoms(
        MoleculeId(3),
        "SOL",
        vec![
            Atom::new(AtomId(3), "OW", Point3::new(4.0, 4.0, 4.0)),
            Atom::new(AtomId(4), "HW1", Point3::new(4.1, 4.0, 4.0)),
            Atom::new(AtomId(5), "HW2", Point3::new(4.0, 4.1, 4.0)),
        ],
    ));
    let mut io = MemoryIo::new(system);
    // 4.16 against a typical distance of 1.81 for five atoms in the box.
    io.displacement = Some(Vector3::new(2.4, 2.4, 2.4));
    let mut energy = ScriptedEnergy(0.0);
    let mut policy = RatePolicy::new(1.0);

    let report = policy
        .reactive_step(
            &mut universe,
            &mut random,
            &mut Collaborators {
                md: &mut md,
                topology_io: &mut io,
                energy: &mut energy,
            },
            1,
            0,
        )
        .unwrap();

    let movement = report.movement.unwrap();
    assert_eq!(movement.checked_atoms, 2);
    assert_eq!(movement.above_twice, 2);
    assert_eq!(movement.above_thrice, 0);
    assert!(movement.is_suspicious());
    assert_eq!(report.state, StepState::Accepted);
}

#[test]
fn simulation_alternates_reactive_steps_with_md_and_writes_statistics() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("statistics.data");
    let writer = StatisticsWriter::open(&path, &METROPOLIS_HEADER, false).unwrap();

    let mut simulation = Simulation::with_parts(
        config(3, METROPOLIS),
        vec![association()],
        RandomContext::from_rng(StepRng::new(0, 0)),
    )
    .unwrap()
    .with_statistics(writer);

    let mut md = RecordingMd::new(true);
    let mut io = MemoryIo::new(pair_system());
    let mut energy = ScriptedEnergy(0.0);
    let events = Mutex::new(Vec::new());
    let reporter = ProgressReporter::with_callback(Box::new(|event| {
        if let Progress::StepFinished { outcome, .. } = event {
            events.lock().unwrap().push(outcome);
        }
    }));

    let summary = simulation
        .run(
            &mut Collaborators {
                md: &mut md,
                topology_io: &mut io,
                energy: &mut energy,
            },
            &reporter,
        )
        .unwrap();

    assert_eq!(
        md.calls,
        vec!["initial", "relax 1", "energy 1 0", "run 1", "append 2 1", "append 3 1"]
    );
    assert_eq!(summary.cycles_completed, 3);
    assert_eq!(summary.next_cycle, 4);
    assert_eq!(summary.baseline, 1);
    assert!(!summary.interrupted);
    assert_eq!(summary.checkpoint, None);
    assert_eq!(*events.lock().unwrap(), vec!["acc", "none", "none"]);

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(
        content,
        "# cycle\tcandidates\tchosen_reaction\toutcome\n\
         1\t1\tassociation\tacc\n\
         2\t0\tnone\tnone\n\
         3\t0\tnone\tnone\n"
    );
}

#[test]
fn civilised_shutdown_finishes_the_cycle_and_writes_a_checkpoint() {
    let dir = tempdir().unwrap();
    let checkpoint_path = dir.path().join("restart.toml");
    let statistics_path = dir.path().join("statistics.data");
    let writer = StatisticsWriter::open(&statistics_path, &RATE_HEADER, false).unwrap();

    let mut config = config(10, RATE);
    config.checkpoint_path = Some(checkpoint_path.clone());
    let shutdown = Arc::new(ShutdownController::new());
    let mut simulation = Simulation::with_parts(
        config,
        vec![association()],
        RandomContext::from_rng(StepRng::new(0, 0)),
    )
    .unwrap()
    .with_statistics(writer)
    .with_shutdown(Arc::clone(&shutdown));

    let mut md = RecordingMd::new(true);
    md.signal_after = Some((2, CIVILISED_SIGNAL, Arc::clone(&shutdown)));
    let mut io = MemoryIo::new(pair_system());
    let mut energy = ScriptedEnergy(0.0);

    let summary = simulation
        .run(
            &mut Collaborators {
                md: &mut md,
                topology_io: &mut io,
                energy: &mut energy,
            },
            &ProgressReporter::new(),
        )
        .unwrap();

    let expected = Checkpoint {
        restart_cycle: 3,
        restart_cycle_files: 1,
    };
    assert!(summary.interrupted);
    assert_eq!(summary.cycles_completed, 2);
    assert_eq!(summary.checkpoint, Some(expected));
    assert_eq!(Checkpoint::read(&checkpoint_path).unwrap(), expected);
    assert_eq!(md.calls, vec!["initial", "relax 1", "run 1", "append 2 1"]);

    let content = fs::read_to_string(&statistics_path).unwrap();
    assert_eq!(
        content,
        "# cycle\tcandidates\taccepted\tattempted\n1\t1\t1\t1\n2\t0\t0\t0\n"
    );
}

#[test]
fn plain_shutdown_request_stops_at_the_next_cycle_boundary() {
    let shutdown = Arc::new(ShutdownController::new());
    let mut simulation = Simulation::with_parts(
        config(5, METROPOLIS),
        vec![association()],
        RandomContext::seeded(3),
    )
    .unwrap()
    .with_shutdown(Arc::clone(&shutdown));

    let mut md = RecordingMd::new(true);
    md.signal_after = Some((1, 2, Arc::clone(&shutdown)));
    let mut io = MemoryIo::new(Topology::new(Vector3::new(5.0, 5.0, 5.0)));
    let mut energy = ScriptedEnergy(0.0);

    let summary = simulation
        .run(
            &mut Collaborators {
                md: &mut md,
                topology_io: &mut io,
                energy: &mut energy,
            },
            &ProgressReporter::new(),
        )
        .unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.cycles_completed, 1);
    assert_eq!(summary.next_cycle, 2);
    assert_eq!(summary.checkpoint, None);
    assert_eq!(md.calls, vec!["initial", "append 1 0"]);
}

#[test]
fn restarted_simulation_resumes_from_checkpoint_without_initial_run() {
    let mut config = config(4, RATE);
    config.restart = Some(
        Checkpoint {
            restart_cycle: 3,
            restart_cycle_files: 1,
        }
        .restart_point(),
    );
    let mut simulation = Simulation::with_parts(
        config,
        vec![association()],
        RandomContext::from_rng(StepRng::new(0, 0)),
    )
    .unwrap();

    let mut md = RecordingMd::new(true);
    let mut io = MemoryIo::new(Topology::new(Vector3::new(5.0, 5.0, 5.0)));
    let mut energy = ScriptedEnergy(0.0);

    let summary = simulation
        .run(
            &mut Collaborators {
                md: &mut md,
                topology_io: &mut io,
                energy: &mut energy,
            },
            &ProgressReporter::new(),
        )
        .unwrap();

    assert_eq!(md.calls, vec!["append 3 1", "append 4 1"]);
    assert_eq!(summary.cycles_completed, 2);
    assert_eq!(summary.next_cycle, 5);
    let AcceptanceSummary::Rate(rate) = summary.acceptance else {
        panic!("expected a rate summary");
    };
    assert_eq!(rate.cycles_without_reaction, 2);
}
