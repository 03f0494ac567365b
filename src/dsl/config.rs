//! Compiler configuration: optional YAML, every field defaulted.

use serde::{Deserialize, Serialize};

use crate::schema::{IdGenerator, SeededIds, SequentialIds, SharedIds};

/// How block identifiers are generated when emitting a schema.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum IdStrategy {
    /// Per-call counter: `b1`, `b2`, ...
    Sequential {
        #[serde(default = "default_prefix")]
        prefix: String,
    },
    /// Process-wide counter, unique across calls.
    Shared {
        #[serde(default = "default_prefix")]
        prefix: String,
    },
    /// Random ids from a fixed seed.
    Seeded { seed: u64 },
}

fn default_prefix() -> String {
    "b".to_string()
}

impl Default for IdStrategy {
    fn default() -> Self {
        IdStrategy::Sequential {
            prefix: default_prefix(),
        }
    }
}

impl IdStrategy {
    /// A fresh generator. Sequential and seeded generators restart for
    /// every call; the shared one continues the process-wide count.
    pub fn generator(&self) -> Box<dyn IdGenerator> {
        match self {
            IdStrategy::Sequential { prefix } => Box::new(SequentialIds::with_prefix(prefix.clone())),
            IdStrategy::Shared { prefix } => Box::new(SharedIds::new(prefix.clone())),
            IdStrategy::Seeded { seed } => Box::new(SeededIds::new(*seed)),
        }
    }
}

/// Compiler configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CompilerConfig {
    /// Reject signals that are used but never declared, instead of
    /// promoting them into the signal set.
    #[serde(default)]
    pub strict_signals: bool,
    #[serde(default)]
    pub ids: IdStrategy,
}

impl CompilerConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn strict() -> Self {
        Self {
            strict_signals: true,
            ..Self::default()
        }
    }
}
