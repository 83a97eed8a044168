//! Solver configuration.
use serde::Deserialize;

use thiserror::Error;

/// Configurable parameters used during solving.
///
/// The documented default of each field is the value produced by `SolverConfig::default()`.
#[derive(Clone)]
pub struct SolverConfig {
    /// Multiplicative decay for the VSIDS decision heuristic. (Default: 0.95)
    pub vsids_decay: f32,

    /// Multiplicative decay for clause activities. (Default: 0.999)
    pub clause_activity_decay: f32,

    /// Glue bound of the core tier of redundant clauses. (Default: 2)
    pub tier1_glue: u32,

    /// Glue bound of the mid tier of redundant clauses. (Default: 6)
    pub tier2_glue: u32,

    /// Recompute the tier glue bounds from the recent glue distribution. (Default: true)
    pub recompute_tiers: bool,

    /// Exponential moving average weight for the fast glue average. (Default: 3.33e-2)
    pub fast_glue_alpha: f64,

    /// Exponential moving average weight for the slow glue average. (Default: 1e-5)
    pub slow_glue_alpha: f64,

    /// Restart when the fast glue average exceeds this multiple of the slow glue average in
    /// focused mode. (Default: 1.1)
    pub restart_margin: f64,

    /// Minimal number of conflicts between two restarts in focused mode. (Default: 2)
    pub restart_interval: u64,

    /// Conflict interval scale of reluctant-doubling restarts in stable mode. (Default: 1024)
    pub stable_restart_scale: u64,

    /// Keep the reusable prefix of the trail on restarts. (Default: true)
    pub reuse_trail: bool,

    /// Alternate between focused and stable search. (Default: true)
    pub stabilize: bool,

    /// Conflict budget of the first stabilization phase, doubled on every mode switch.
    /// (Default: 1000)
    pub stabilize_interval: u64,

    /// Base conflict interval between clause database reductions, scaled by the number of
    /// reductions performed so far. (Default: 300)
    pub reduce_interval: u64,

    /// Conflict interval between rephasings, growing by the same amount each time.
    /// (Default: 1000)
    pub rephase_interval: u64,

    /// Default phase of decision variables without any saved phase. (Default: false)
    pub initial_phase: bool,

    /// Use chronological backtracking for distant backjumps. (Default: true)
    pub chrono: bool,

    /// Backjump distance above which backtracking proceeds chronologically. (Default: 100)
    pub chrono_distance: usize,

    /// Shrink learned clauses by searching for level-local UIPs. (Default: true)
    pub shrink: bool,

    /// Conflict interval between inprocessing rounds, scaled by the number of rounds performed
    /// so far. (Default: 2000)
    pub inprocess_interval: u64,

    /// Enable binary clause deduplication during inprocessing. (Default: true)
    pub dedup: bool,

    /// Enable transitive reduction of the binary implication graph. (Default: true)
    pub transred: bool,

    /// Enable equivalent literal substitution. (Default: true)
    pub decompose: bool,

    /// Enable subsumption and self-subsuming resolution. (Default: true)
    pub subsume: bool,

    /// Enable clause vivification. (Default: true)
    pub vivify: bool,

    /// Enable covered clause elimination. (Default: true)
    pub cover: bool,

    /// Enable bounded variable elimination. (Default: true)
    pub elim: bool,

    /// Maximal number of extra resolvents a variable elimination may produce. (Default: 0)
    pub elim_growth: usize,

    /// Maximal occurrence count of variable elimination candidates. (Default: 100)
    pub elim_occurrence_limit: usize,

    /// Enable blocked clause elimination. (Default: true)
    pub block: bool,

    /// Enable failed literal probing with hyper-binary resolution. (Default: true)
    pub probe: bool,

    /// Enable autarky detection. (Default: true)
    pub autarky: bool,

    /// Seed for the per-solver pseudo random number generator. (Default: 0)
    pub seed: u64,
}

impl Default for SolverConfig {
    fn default() -> SolverConfig {
        SolverConfig {
            vsids_decay: 0.95,
            clause_activity_decay: 0.999,
            tier1_glue: 2,
            tier2_glue: 6,
            recompute_tiers: true,
            fast_glue_alpha: 3.33e-2,
            slow_glue_alpha: 1e-5,
            restart_margin: 1.1,
            restart_interval: 2,
            stable_restart_scale: 1024,
            reuse_trail: true,
            stabilize: true,
            stabilize_interval: 1000,
            reduce_interval: 300,
            rephase_interval: 1000,
            initial_phase: false,
            chrono: true,
            chrono_distance: 100,
            shrink: true,
            inprocess_interval: 2000,
            dedup: true,
            transred: true,
            decompose: true,
            subsume: true,
            vivify: true,
            cover: true,
            elim: true,
            elim_growth: 0,
            elim_occurrence_limit: 100,
            block: true,
            probe: true,
            autarky: true,
            seed: 0,
        }
    }
}

/// A partial update of a [`SolverConfig`].
///
/// Fields that are `None` leave the corresponding configuration value unchanged. Deserializes
/// from string-keyed representations, which backs the name/value option interface of the solver.
#[derive(Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverConfigUpdate {
    pub vsids_decay: Option<f32>,
    pub clause_activity_decay: Option<f32>,
    pub tier1_glue: Option<u32>,
    pub tier2_glue: Option<u32>,
    pub recompute_tiers: Option<bool>,
    pub fast_glue_alpha: Option<f64>,
    pub slow_glue_alpha: Option<f64>,
    pub restart_margin: Option<f64>,
    pub restart_interval: Option<u64>,
    pub stable_restart_scale: Option<u64>,
    pub reuse_trail: Option<bool>,
    pub stabilize: Option<bool>,
    pub stabilize_interval: Option<u64>,
    pub reduce_interval: Option<u64>,
    pub rephase_interval: Option<u64>,
    pub initial_phase: Option<bool>,
    pub chrono: Option<bool>,
    pub chrono_distance: Option<usize>,
    pub shrink: Option<bool>,
    pub inprocess_interval: Option<u64>,
    pub dedup: Option<bool>,
    pub transred: Option<bool>,
    pub decompose: Option<bool>,
    pub subsume: Option<bool>,
    pub vivify: Option<bool>,
    pub cover: Option<bool>,
    pub elim: Option<bool>,
    pub elim_growth: Option<usize>,
    pub elim_occurrence_limit: Option<usize>,
    pub block: Option<bool>,
    pub probe: Option<bool>,
    pub autarky: Option<bool>,
    pub seed: Option<u64>,
}

impl SolverConfigUpdate {
    /// Create an empty update.
    pub fn new() -> SolverConfigUpdate {
        SolverConfigUpdate::default()
    }

    /// Check the update against the allowed parameter ranges.
    pub fn check(&self) -> Result<(), ConfigError> {
        let mut errors = vec![];

        if let Some(decay) = self.vsids_decay {
            if !(decay < 1.0 && decay > 1.0 / 16.0) {
                errors.push("vsids_decay must be within (1/16, 1)".to_owned());
            }
        }

        if let Some(decay) = self.clause_activity_decay {
            if !(decay < 1.0 && decay > 1.0 / 16.0) {
                errors.push("clause_activity_decay must be within (1/16, 1)".to_owned());
            }
        }

        if let (Some(tier1), Some(tier2)) = (self.tier1_glue, self.tier2_glue) {
            if tier1 > tier2 {
                errors.push("tier1_glue must not exceed tier2_glue".to_owned());
            }
        }

        for &(name, alpha) in [
            ("fast_glue_alpha", self.fast_glue_alpha),
            ("slow_glue_alpha", self.slow_glue_alpha),
        ]
        .iter()
        {
            if let Some(alpha) = alpha {
                if !(alpha > 0.0 && alpha <= 1.0) {
                    errors.push(format!("{} must be within (0, 1]", name));
                }
            }
        }

        if let Some(margin) = self.restart_margin {
            if !(margin >= 1.0) {
                errors.push("restart_margin must be at least 1".to_owned());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError { errors })
        }
    }

    /// Apply the update to a configuration.
    ///
    /// The update has to be checked before it is applied.
    pub fn apply(&self, config: &mut SolverConfig) {
        macro_rules! apply_fields {
            ($($field:ident),* $(,)?) => {
                $(
                    if let Some(value) = self.$field {
                        config.$field = value;
                    }
                )*
            };
        }

        apply_fields!(
            vsids_decay,
            clause_activity_decay,
            tier1_glue,
            tier2_glue,
            recompute_tiers,
            fast_glue_alpha,
            slow_glue_alpha,
            restart_margin,
            restart_interval,
            stable_restart_scale,
            reuse_trail,
            stabilize,
            stabilize_interval,
            reduce_interval,
            rephase_interval,
            initial_phase,
            chrono,
            chrono_distance,
            shrink,
            inprocess_interval,
            dedup,
            transred,
            decompose,
            subsume,
            vivify,
            cover,
            elim,
            elim_growth,
            elim_occurrence_limit,
            block,
            probe,
            autarky,
            seed,
        );
    }
}

/// A rejected configuration update.
#[derive(Debug, Error)]
#[error("invalid configuration: {}", errors.join("; "))]
pub struct ConfigError {
    /// A description for each offending parameter.
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_values() {
        let mut update = SolverConfigUpdate::new();
        update.vsids_decay = Some(1.5);
        update.restart_margin = Some(0.5);
        let err = update.check().unwrap_err();
        assert_eq!(err.errors.len(), 2);
    }

    #[test]
    fn applies_only_set_fields() {
        let mut config = SolverConfig::default();
        let mut update = SolverConfigUpdate::new();
        update.tier2_glue = Some(8);
        update.check().unwrap();
        update.apply(&mut config);
        assert_eq!(config.tier2_glue, 8);
        assert_eq!(config.tier1_glue, SolverConfig::default().tier1_glue);
    }
}
