use crate::least::{DEFAULT_MAX_EXTRA_REPEATS, MAX_EXTRA_REPEATS_LIMIT};
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Random instantiation of the whole tree per artifact.
    #[default]
    Fuzz,
    /// Deterministic walk over the tree's permutation indices.
    Permutations,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct GeneratorSettings {
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_count")]
    pub count: u64,
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Drop artifacts whose text was already generated.
    #[serde(default)]
    pub unique: bool,
}

pub fn default_seed() -> u64 {
    0
}
pub fn default_count() -> u64 {
    100
}
pub fn default_threads() -> usize {
    1
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            seed: default_seed(),
            count: default_count(),
            threads: default_threads(),
            unique: false,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct ListSettings {
    #[serde(default = "default_max_extra_repeats")]
    pub max_extra_repeats: usize,
}

fn default_max_extra_repeats() -> usize {
    DEFAULT_MAX_EXTRA_REPEATS
}

impl Default for ListSettings {
    fn default() -> Self {
        Self {
            max_extra_repeats: default_max_extra_repeats(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct TokgenConfig {
    #[serde(default)]
    pub generator: Option<GeneratorSettings>,
    #[serde(default)]
    pub lists: Option<ListSettings>,
}

impl TokgenConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        Self::from_toml_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, anyhow::Error> {
        let config: TokgenConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would let a single fuzz grow without bound.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let max_extra_repeats = self.lists().max_extra_repeats;
        if max_extra_repeats > MAX_EXTRA_REPEATS_LIMIT {
            anyhow::bail!(
                "lists.max-extra-repeats is {} but must not exceed {}",
                max_extra_repeats,
                MAX_EXTRA_REPEATS_LIMIT
            );
        }
        Ok(())
    }

    /// Generator settings, falling back to defaults when the section is missing.
    pub fn generator(&self) -> GeneratorSettings {
        self.generator.clone().unwrap_or_default()
    }

    /// List settings, falling back to defaults when the section is missing.
    pub fn lists(&self) -> ListSettings {
        self.lists.clone().unwrap_or_default()
    }
}
