use std::fmt;
use std::str::FromStr;

use lifepath_engine::{PlayerState, Stage, StageOption};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decision returned by a [`PlayerPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub option_index: usize,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub fn new(option_index: usize, rationale: Option<String>) -> Self {
        Self {
            option_index,
            rationale,
        }
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Select an option for the current stage.
    fn pick_option(&mut self, state: &PlayerState, stage: &Stage) -> PolicyDecision;
}

/// Built-in strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayStrategy {
    Cautious,
    Growth,
    Balanced,
    Random,
}

impl PlayStrategy {
    pub const ALL: [Self; 4] = [Self::Cautious, Self::Growth, Self::Balanced, Self::Random];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            PlayStrategy::Cautious => "cautious",
            PlayStrategy::Growth => "growth",
            PlayStrategy::Balanced => "balanced",
            PlayStrategy::Random => "random",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            PlayStrategy::Cautious => Box::new(CautiousPolicy),
            PlayStrategy::Growth => Box::new(GrowthPolicy),
            PlayStrategy::Balanced => Box::new(BalancedPolicy),
            PlayStrategy::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for PlayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown strategy '{0}' (expected cautious, growth, balanced or random)")]
pub struct UnknownStrategy(pub String);

impl FromStr for PlayStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.label() == key)
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}

/// Expand a comma-separated strategy list, where `all` means every strategy.
pub fn parse_strategies(tokens: &[String]) -> Result<Vec<PlayStrategy>, UnknownStrategy> {
    let mut strategies = Vec::new();
    for token in tokens {
        if token.eq_ignore_ascii_case("all") {
            strategies.extend(PlayStrategy::ALL);
            continue;
        }
        strategies.push(token.parse()?);
    }
    strategies.sort();
    strategies.dedup();
    Ok(strategies)
}

struct CautiousPolicy;
struct GrowthPolicy;
struct BalancedPolicy;

struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl PlayerPolicy for CautiousPolicy {
    fn name(&self) -> &'static str {
        "Cautious"
    }

    fn pick_option(&mut self, _state: &PlayerState, stage: &Stage) -> PolicyDecision {
        // Least added risk, then the better net worth outcome.
        let (idx, risk) = stage
            .options
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.delta("risk")
                    .total_cmp(&b.delta("risk"))
                    .then_with(|| b.delta("netWorth").total_cmp(&a.delta("netWorth")))
            })
            .map_or((0, 0.0), |(idx, option)| (idx, option.delta("risk")));

        PolicyDecision::new(idx, Some(format!("risk {risk:+}")))
    }
}

impl PlayerPolicy for GrowthPolicy {
    fn name(&self) -> &'static str {
        "Growth"
    }

    fn pick_option(&mut self, _state: &PlayerState, stage: &Stage) -> PolicyDecision {
        let (idx, gain) = best_by(stage, |option| option.delta("netWorth"));
        PolicyDecision::new(idx, Some(format!("net worth {gain:+}")))
    }
}

impl PlayerPolicy for BalancedPolicy {
    fn name(&self) -> &'static str {
        "Balanced"
    }

    fn pick_option(&mut self, _state: &PlayerState, stage: &Stage) -> PolicyDecision {
        let (idx, score) = best_by(stage, balanced_score);
        PolicyDecision::new(idx, Some(format!("score {score:.2}")))
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn pick_option(&mut self, _state: &PlayerState, stage: &Stage) -> PolicyDecision {
        if stage.options.is_empty() {
            return PolicyDecision::new(0, Some("no options".to_string()));
        }
        let idx = self.rng.gen_range(0..stage.options.len());
        PolicyDecision::new(idx, None)
    }
}

/// First option with the highest score.
fn best_by(stage: &Stage, score: impl Fn(&StageOption) -> f64) -> (usize, f64) {
    let mut best: Option<(usize, f64)> = None;
    for (idx, option) in stage.options.iter().enumerate() {
        let value = score(option);
        if best.is_none_or(|(_, top)| value > top) {
            best = Some((idx, value));
        }
    }
    best.unwrap_or((0, 0.0))
}

fn balanced_score(option: &StageOption) -> f64 {
    option.delta("netWorth") / 1000.0 + option.delta("knowledge") + option.delta("emotion")
        - option.delta("risk")
}
