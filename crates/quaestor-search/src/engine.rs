use crate::fitness::score;
use crate::selection::{best_of, elite_count, select_elites};
use crate::window::{LabeledWindow, TrainingWindow};
use quaestor_core::config::{Settings, TrainingConfig};
use quaestor_core::domain::{GenerationSummary, QuaestorError, Result, TrainingStarted};
use quaestor_core::sink::LogSink;
use quaestor_data::{HistoricalEntry, HistorySource};
use quaestor_models::mutation::{mutate, mutation_count};
use quaestor_models::{decide, Network, NetworkShape, Signal};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::env;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Once, RwLock};
use tracing::{debug, info};

static RAYON_INIT: Once = Once::new();

fn init_rayon(configured: usize) {
    RAYON_INIT.call_once(|| {
        let threads = Some(configured).filter(|&v| v > 0).or_else(|| {
            env::var("QUAESTOR_THREADS")
                .ok()
                .or_else(|| env::var("RAYON_NUM_THREADS").ok())
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|&v| v > 0)
        });
        if let Some(n) = threads {
            if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(n).build_global() {
                debug!("Rayon pool already configured: {}", e);
            }
        }
    });
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredNetwork {
    pub network: Network,
    pub fitness: f64,
}

/// Shared read access to the best network found so far.
#[derive(Debug, Clone, Default)]
pub struct BestNetworkHandle {
    inner: Arc<RwLock<Option<ScoredNetwork>>>,
}

impl BestNetworkHandle {
    pub fn get(&self) -> Option<ScoredNetwork> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn fitness(&self) -> Option<f64> {
        self.get().map(|best| best.fitness)
    }

    /// Signal of the current best network for `entry`, if one exists yet.
    pub fn decide(&self, entry: &HistoricalEntry) -> Option<Signal> {
        let guard = match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.as_ref().map(|best| decide(&best.network, entry))
    }

    fn publish(&self, best: ScoredNetwork) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(best);
    }
}

/// Progress owned by one training run.
#[derive(Debug, Clone)]
pub struct TrainingState {
    pub generation: u64,
    pub best_ever: Option<ScoredNetwork>,
    pub best_ever_fitness: f64,
}

impl Default for TrainingState {
    fn default() -> Self {
        Self {
            generation: 0,
            best_ever: None,
            best_ever_fitness: f64::NEG_INFINITY,
        }
    }
}

impl TrainingState {
    /// Keeps `candidate` if it beats the best so far (or nothing is kept yet).
    pub fn offer(&mut self, candidate: &Network, fitness: f64) -> bool {
        let improves = fitness.partial_cmp(&self.best_ever_fitness) == Some(Ordering::Greater);
        if self.best_ever.is_some() && !improves {
            return false;
        }
        self.best_ever = Some(ScoredNetwork {
            network: candidate.clone(),
            fitness,
        });
        // NaN never becomes the running maximum.
        if !fitness.is_nan() {
            self.best_ever_fitness = fitness;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Evaluating,
    Selecting,
}

/// Everything a finished generation produced.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub summary: GenerationSummary,
    /// Score of each individual, in population order.
    pub scores: Vec<f64>,
    /// Indices into the evaluated population, best first.
    pub elites: Vec<usize>,
}

/// How the next population is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreedingPlan {
    pub elites: usize,
    pub mutants: usize,
    pub fresh: usize,
}

impl BreedingPlan {
    pub fn new(population: usize, elite_divisor: usize) -> Self {
        let elites = elite_count(population, elite_divisor);
        let mutants = population.saturating_sub(2 * elites);
        Self {
            elites,
            mutants,
            fresh: population - elites - mutants,
        }
    }
}

pub struct Trainer {
    training: TrainingConfig,
    shape: NetworkShape,
    bot_name: String,
    window: TrainingWindow,
    sink: Arc<dyn LogSink>,
    rng: StdRng,
    population: Vec<Network>,
    state: TrainingState,
    phase: Phase,
    best: BestNetworkHandle,
    subscribers: Vec<Sender<GenerationSummary>>,
}

impl Trainer {
    pub fn new(
        settings: &Settings,
        source: Arc<dyn HistorySource>,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self> {
        settings
            .validate()
            .map_err(|e| QuaestorError::Configuration(format!("{:#}", e)))?;
        init_rayon(settings.training.threads);

        let mut rng = match settings.training.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let shape = NetworkShape::from(&settings.network);
        let population = (0..settings.training.population_size)
            .map(|_| shape.try_random(&mut rng))
            .collect::<std::result::Result<Vec<Network>, _>>()?;

        let window = TrainingWindow::new(
            source,
            settings.data.market.clone(),
            settings.training.window_seconds,
            settings.training.window_start,
            settings.training.window_advance_seconds,
        );

        Ok(Self {
            training: settings.training.clone(),
            shape,
            bot_name: settings.sink.bot_name.clone(),
            window,
            sink,
            rng,
            population,
            state: TrainingState::default(),
            phase: Phase::Idle,
            best: BestNetworkHandle::default(),
            subscribers: Vec::new(),
        })
    }

    pub fn state(&self) -> &TrainingState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn population(&self) -> &[Network] {
        &self.population
    }

    pub fn best_network(&self) -> BestNetworkHandle {
        self.best.clone()
    }

    /// Receives every generation summary from now on.
    pub fn subscribe(&mut self) -> Receiver<GenerationSummary> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn announce(&mut self) {
        let start = self.window.resolve_start().unwrap_or(0);
        let started = TrainingStarted::new(
            self.bot_name.clone(),
            self.window.market(),
            self.population.len(),
            start,
            self.window.window_seconds(),
        );
        self.sink.log(&started.message());
    }

    /// Runs `max_generations` generations, or forever when `None`.
    pub fn run(&mut self, max_generations: Option<u64>) -> TrainingState {
        self.announce();
        let mut completed = 0u64;
        while max_generations.map_or(true, |max| completed < max) {
            self.run_generation();
            completed += 1;
        }
        self.state.clone()
    }

    pub fn run_generation(&mut self) -> GenerationOutcome {
        let window = self.window.next_window();

        self.phase = Phase::Evaluating;
        let scores = evaluate(&self.population, &window);

        self.phase = Phase::Selecting;
        let summary = self.record(&scores, window.len());
        let plan = BreedingPlan::new(self.population.len(), self.training.elite_divisor);
        let elites = select_elites(&scores, plan.elites);
        self.population = self.breed(&elites, plan);
        self.state.generation += 1;
        self.phase = Phase::Idle;

        GenerationOutcome {
            summary,
            scores,
            elites,
        }
    }

    fn record(&mut self, scores: &[f64], window_len: usize) -> GenerationSummary {
        let size = self.population.len();
        let best_idx = best_of(scores);
        let best_score = scores.get(best_idx).copied().unwrap_or(f64::NEG_INFINITY);
        let average = if size == 0 {
            0.0
        } else {
            scores.iter().sum::<f64>() / size as f64
        };

        if let Some(best) = self.population.get(best_idx) {
            if self.state.offer(best, best_score) {
                if let Some(kept) = &self.state.best_ever {
                    self.best.publish(kept.clone());
                }
            }
        }

        let summary = GenerationSummary::new(
            self.state.generation,
            best_score,
            self.state.best_ever_fitness,
            average,
            size,
            window_len,
        );
        info!(
            generation = summary.generation,
            best = summary.best_of_generation,
            best_ever = summary.best_ever,
            average = summary.average,
            "Generation complete"
        );
        self.sink.log(&summary.message());
        self.subscribers.retain(|tx| tx.send(summary.clone()).is_ok());
        summary
    }

    fn breed(&mut self, elites: &[usize], plan: BreedingPlan) -> Vec<Network> {
        let size = self.population.len();
        let mut next = Vec::with_capacity(size);
        next.extend(elites.iter().map(|&idx| self.population[idx].clone()));

        if !elites.is_empty() {
            for _ in 0..plan.mutants {
                let parent = elites[self.rng.gen_range(0..elites.len())];
                let count = mutation_count(
                    self.training.min_mutations,
                    self.training.max_mutations,
                    &mut self.rng,
                );
                next.push(mutate(&self.population[parent], count, &mut self.rng));
            }
        }

        while next.len() < size {
            next.push(self.shape.random(&mut self.rng));
        }
        debug!(
            "Bred {} elites, {} mutants, {} fresh networks",
            plan.elites, plan.mutants, plan.fresh
        );
        next
    }
}

/// Scores every network against the window; returns once all have finished.
pub fn evaluate(population: &[Network], window: &LabeledWindow) -> Vec<f64> {
    population.par_iter().map(|net| score(net, window)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quaestor_core::sink::MemorySink;
    use quaestor_data::MemoryHistory;

    fn settings(population: usize) -> Settings {
        let mut settings = Settings::default();
        settings.training.population_size = population;
        settings.training.seed = Some(7);
        settings.network.hidden_layers = vec![4, 4];
        settings
    }

    #[test]
    fn test_breeding_plan() {
        assert_eq!(
            BreedingPlan::new(100, 10),
            BreedingPlan {
                elites: 10,
                mutants: 80,
                fresh: 10
            }
        );
        assert_eq!(
            BreedingPlan::new(2, 10),
            BreedingPlan {
                elites: 1,
                mutants: 0,
                fresh: 1
            }
        );
        assert_eq!(
            BreedingPlan::new(3, 1),
            BreedingPlan {
                elites: 3,
                mutants: 0,
                fresh: 0
            }
        );
    }

    #[test]
    fn test_state_offer_is_monotonic() {
        let mut state = TrainingState::default();
        let net = Network::empty();
        assert!(state.offer(&net, -3.0));
        assert!(!state.offer(&net, -4.0));
        assert!(!state.offer(&net, -3.0));
        assert!(state.offer(&net, 1.0));
        assert_eq!(state.best_ever_fitness, 1.0);
    }

    #[test]
    fn test_nan_first_generation_still_sets_best() {
        let mut state = TrainingState::default();
        assert!(state.offer(&Network::empty(), f64::NAN));
        assert!(state.best_ever.is_some());
        assert_eq!(state.best_ever_fitness, f64::NEG_INFINITY);
        assert!(state.offer(&Network::empty(), -1.0));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let result = Trainer::new(&settings(1), Arc::new(MemoryHistory::default()), Arc::new(MemorySink::new()));
        assert!(matches!(result, Err(QuaestorError::Configuration(_))));
    }

    #[test]
    fn test_empty_history_still_trains() {
        let sink = MemorySink::new();
        let mut trainer = Trainer::new(
            &settings(10),
            Arc::new(MemoryHistory::default()),
            Arc::new(sink.clone()),
        )
        .unwrap();

        let outcome = trainer.run_generation();
        assert_eq!(outcome.summary.window_len, 0);
        assert_eq!(outcome.summary.best_of_generation, 0.0);
        assert_eq!(outcome.summary.average, 0.0);
        assert_eq!(trainer.population().len(), 10);
        assert_eq!(trainer.state().generation, 1);
        assert_eq!(trainer.phase(), Phase::Idle);
        assert!(trainer.best_network().get().is_some());
        assert_eq!(sink.messages().len(), 1);
    }

    #[test]
    fn test_run_announces_then_summarises() {
        let sink = MemorySink::new();
        let mut trainer = Trainer::new(
            &settings(4),
            Arc::new(MemoryHistory::default()),
            Arc::new(sink.clone()),
        )
        .unwrap();
        let state = trainer.run(Some(3));
        assert_eq!(state.generation, 3);

        let messages = sink.messages();
        assert_eq!(messages.len(), 4);
        assert!(messages[0].contains("Bot Starting"));
        assert!(messages[3].starts_with("Generation 2"));
    }
}
