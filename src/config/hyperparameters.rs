use super::traits::{ConfigManifest, ConfigSection, FieldManifest};
use crate::error::SymbindError;
use crate::metrics::Metric;
use crate::program::FunctionRegistry;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Everything the fitting engine needs besides the data.
///
/// Field order mirrors the engine's parameter order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    pub const_max: f64,
    pub const_min: f64,
    /// Empty means "same as `loss_metric`".
    pub eval_metric: String,
    /// Comma-separated function names, e.g. `sum,sub,mul,div`.
    pub funcs: String,
    pub loss_metric: String,
    pub max_height: usize,
    pub min_height: usize,
    pub n_generations: usize,
    pub n_populations: usize,
    pub n_rounds: usize,
    pub p_constant: f64,
    pub p_full: f64,
    pub p_hoist_mutation: f64,
    pub p_point_mutation: f64,
    pub p_subtree_crossover: f64,
    pub p_subtree_mutation: f64,
    pub p_terminal: f64,
    pub parsimony_coeff: f64,
    pub point_mutation_rate: f64,
    pub population_size: usize,
    /// `None` draws a fresh seed for every fit.
    pub seed: Option<i64>,
    pub tuning_n_generations: usize,
    pub verbose: bool,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            const_max: 5.0,
            const_min: -5.0,
            eval_metric: String::new(),
            funcs: "sum,sub,mul,div".to_string(),
            loss_metric: "mae".to_string(),
            max_height: 6,
            min_height: 3,
            n_generations: 30,
            n_populations: 1,
            n_rounds: 1,
            p_constant: 0.5,
            p_full: 0.5,
            p_hoist_mutation: 0.1,
            p_point_mutation: 0.1,
            p_subtree_crossover: 0.5,
            p_subtree_mutation: 0.1,
            p_terminal: 0.3,
            parsimony_coeff: 0.0,
            point_mutation_rate: 0.3,
            population_size: 30,
            seed: None,
            tuning_n_generations: 10,
            verbose: false,
        }
    }
}

impl Hyperparameters {
    pub fn probabilities(&self) -> [(&'static str, f64); 8] {
        [
            ("p_constant", self.p_constant),
            ("p_full", self.p_full),
            ("p_hoist_mutation", self.p_hoist_mutation),
            ("p_point_mutation", self.p_point_mutation),
            ("p_subtree_crossover", self.p_subtree_crossover),
            ("p_subtree_mutation", self.p_subtree_mutation),
            ("p_terminal", self.p_terminal),
            ("point_mutation_rate", self.point_mutation_rate),
        ]
    }

    pub fn loss(&self) -> Result<Metric, SymbindError> {
        Metric::parse(&self.loss_metric)
    }

    /// Evaluation metric, defaulting to the loss metric.
    pub fn eval(&self) -> Result<Metric, SymbindError> {
        if self.eval_metric.is_empty() {
            self.loss()
        } else {
            Metric::parse(&self.eval_metric)
        }
    }

    /// The configured seed, or a fresh random one when unset.
    pub fn resolve_seed(&self) -> i64 {
        self.seed.unwrap_or_else(|| rand::thread_rng().gen::<i64>())
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl ConfigSection for Hyperparameters {
    fn section_name() -> &'static str {
        "hyperparameters"
    }

    fn validate(&self) -> Result<(), SymbindError> {
        for (name, p) in self.probabilities() {
            if !(0.0..=1.0).contains(&p) {
                return Err(SymbindError::Configuration(format!(
                    "{} must be between 0 and 1, got {}",
                    name, p
                )));
            }
        }
        if self.min_height > self.max_height {
            return Err(SymbindError::Configuration(format!(
                "min_height ({}) must not exceed max_height ({})",
                self.min_height, self.max_height
            )));
        }
        if !(self.const_min <= self.const_max) {
            return Err(SymbindError::Configuration(format!(
                "const_min ({}) must not exceed const_max ({})",
                self.const_min, self.const_max
            )));
        }
        if self.population_size < 1 {
            return Err(SymbindError::Configuration(
                "Population size must be at least 1".to_string(),
            ));
        }
        if self.n_populations < 1 {
            return Err(SymbindError::Configuration(
                "Number of populations must be at least 1".to_string(),
            ));
        }
        if self.n_rounds < 1 {
            return Err(SymbindError::Configuration(
                "Number of rounds must be at least 1".to_string(),
            ));
        }
        if self.parsimony_coeff < 0.0 {
            return Err(SymbindError::Configuration(
                "Parsimony coefficient must not be negative".to_string(),
            ));
        }
        self.loss()
            .and_then(|_| self.eval())
            .map_err(|e| SymbindError::Configuration(e.to_string()))?;
        FunctionRegistry::global().parse_function_set(&self.funcs)?;
        Ok(())
    }

    fn to_manifest(&self) -> ConfigManifest {
        let d = Hyperparameters::default();
        let unit = (Some(0.0), Some(1.0));
        let count = (Some(1.0), None);
        ConfigManifest {
            section: "Hyperparameters".to_string(),
            fields: vec![
                FieldManifest::new("const_max", "float", json!(d.const_max), (None, None), "Upper bound for generated constants"),
                FieldManifest::new("const_min", "float", json!(d.const_min), (None, None), "Lower bound for generated constants"),
                FieldManifest::new("eval_metric", "string", json!(d.eval_metric), (None, None), "Metric reported during fitting; empty uses the loss metric"),
                FieldManifest::new("funcs", "string", json!(d.funcs), (None, None), "Comma-separated function set"),
                FieldManifest::new("loss_metric", "string", json!(d.loss_metric), (None, None), "Metric minimized by the search"),
                FieldManifest::new("max_height", "integer", json!(d.max_height), (Some(0.0), None), "Maximum program height"),
                FieldManifest::new("min_height", "integer", json!(d.min_height), (Some(0.0), None), "Minimum program height"),
                FieldManifest::new("n_generations", "integer", json!(d.n_generations), (Some(0.0), None), "Generations per round"),
                FieldManifest::new("n_populations", "integer", json!(d.n_populations), count, "Number of populations"),
                FieldManifest::new("n_rounds", "integer", json!(d.n_rounds), count, "Number of boosting rounds"),
                FieldManifest::new("p_constant", "float", json!(d.p_constant), unit, "Probability of a constant when picking a terminal"),
                FieldManifest::new("p_full", "float", json!(d.p_full), unit, "Probability of full initialization"),
                FieldManifest::new("p_hoist_mutation", "float", json!(d.p_hoist_mutation), unit, "Hoist mutation probability"),
                FieldManifest::new("p_point_mutation", "float", json!(d.p_point_mutation), unit, "Point mutation probability"),
                FieldManifest::new("p_subtree_crossover", "float", json!(d.p_subtree_crossover), unit, "Sub-tree crossover probability"),
                FieldManifest::new("p_subtree_mutation", "float", json!(d.p_subtree_mutation), unit, "Sub-tree mutation probability"),
                FieldManifest::new("p_terminal", "float", json!(d.p_terminal), unit, "Probability of a terminal during grow initialization"),
                FieldManifest::new("parsimony_coeff", "float", json!(d.parsimony_coeff), (Some(0.0), None), "Penalty per program node"),
                FieldManifest::new("point_mutation_rate", "float", json!(d.point_mutation_rate), unit, "Per-node rate during point mutation"),
                FieldManifest::new("population_size", "integer", json!(d.population_size), count, "Individuals per population"),
                FieldManifest::new("seed", "integer", json!(d.seed), (None, None), "Random seed; unset draws one per fit"),
                FieldManifest::new("tuning_n_generations", "integer", json!(d.tuning_n_generations), (Some(0.0), None), "Generations spent tuning constants"),
                FieldManifest::new("verbose", "boolean", json!(d.verbose), (None, None), "Let the engine print progress"),
            ],
        }
    }
}
