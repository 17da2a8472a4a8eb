use colored::Colorize;
use lifepath_engine::{Metrics, ValidatedJourney};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::logic::playthrough::{PlaythroughRecord, run_playthrough};
use crate::logic::policy::PlayStrategy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub journey_id: String,
    pub strategy: PlayStrategy,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
    /// Metrics at the end of the last successful iteration.
    pub final_metrics: Metrics,
    pub distinct_paths: usize,
}

pub struct LogicTester {
    verbose: bool,
}

impl LogicTester {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Run every strategy against every journey for each seed.
    pub fn run_matrix(
        &self,
        journeys: &[ValidatedJourney],
        strategies: &[PlayStrategy],
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();
        for journey in journeys {
            for &strategy in strategies {
                results.extend(self.run_scenario(journey, strategy, seeds, iterations));
            }
        }
        results
    }

    pub fn run_scenario(
        &self,
        journey: &ValidatedJourney,
        strategy: PlayStrategy,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (strategy: {} seed: {})",
                    journey.id.bright_white(),
                    strategy,
                    seed
                );
            }
            results.push(self.run_single_scenario(journey, strategy, seed, iterations));
        }

        results
    }

    fn run_single_scenario(
        &self,
        journey: &ValidatedJourney,
        strategy: PlayStrategy,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let outcome = self.run_iterations(journey, strategy, seed, iterations);

        let average_duration = if outcome.performance_data.is_empty() {
            Duration::ZERO
        } else {
            outcome.performance_data.iter().sum::<Duration>()
                / u32::try_from(outcome.performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: format!("{}/{}", journey.id, strategy),
            journey_id: journey.id.clone(),
            strategy,
            seed,
            passed: outcome.failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: outcome.successes,
            failures: outcome.failures,
            average_duration,
            performance_data: outcome.performance_data,
            final_metrics: outcome
                .last_record
                .map(|record| record.final_metrics)
                .unwrap_or_default(),
            distinct_paths: outcome.paths.len(),
        }
    }

    fn run_iterations(
        &self,
        journey: &ValidatedJourney,
        strategy: PlayStrategy,
        seed: u64,
        iterations: usize,
    ) -> IterationOutcome {
        let mut outcome = IterationOutcome::default();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            match run_playthrough(journey, strategy, iteration_seed) {
                Ok(record) => {
                    let duration = start_time.elapsed();
                    outcome.successes += 1;
                    outcome.performance_data.push(duration);
                    outcome.paths.insert(record.path().join(">"));
                    if self.verbose {
                        println!(
                            "  ✅ Iteration {}/{} passed ({duration:?}) path: {}",
                            i + 1,
                            iterations,
                            summarize_decision_path(&record)
                        );
                    }
                    outcome.last_record = Some(record);
                }
                Err(err) => {
                    let message = format!(
                        "Iteration {} (journey {}, strategy {}, seed {}): {err:#}",
                        i + 1,
                        journey.id,
                        strategy,
                        iteration_seed
                    );
                    log::warn!("{message}");
                    if self.verbose {
                        println!(
                            "  ❌ Iteration {}/{} failed: {}",
                            i + 1,
                            iterations,
                            format!("{err:#}").red()
                        );
                    }
                    outcome.failures.push(message);
                }
            }
        }

        outcome
    }
}

#[derive(Default)]
struct IterationOutcome {
    successes: usize,
    failures: Vec<String>,
    performance_data: Vec<Duration>,
    paths: BTreeSet<String>,
    last_record: Option<PlaythroughRecord>,
}

fn summarize_decision_path(record: &PlaythroughRecord) -> String {
    if record.decisions.is_empty() {
        return "no decisions recorded".to_string();
    }

    record
        .decisions
        .iter()
        .map(|entry| {
            let rationale = entry
                .rationale
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or("-");
            format!("{} -> {} [{}]", entry.stage_id, entry.option_id, rationale)
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_micros().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let micros = u128::deserialize(deserializer)?;
        Ok(Duration::from_micros(u64::try_from(micros).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        durations
            .iter()
            .map(Duration::as_micros)
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Vec::<u128>::deserialize(deserializer)?
            .into_iter()
            .map(|m| Duration::from_micros(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}
