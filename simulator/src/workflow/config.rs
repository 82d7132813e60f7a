use crate::generator::profile::ToolDefaults;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";

pub const DEFAULT_DELAY_MS: u64 = 1500;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpretationConfig {
    pub endpoint: String,
    /// Environment variable holding the API key; unset means no `key` parameter.
    pub api_key_env: String,
}

impl Default for InterpretationConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
        }
    }
}

impl InterpretationConfig {
    pub fn api_key(&self) -> Option<String> {
        env::var(&self.api_key_env).ok().filter(|key| !key.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub seed: Option<u64>,
    /// Pause before a simulation result is published.
    pub simulation_delay_ms: u64,
    pub bind: SocketAddr,
    pub interpretation: InterpretationConfig,
    pub tools: ToolDefaults,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            seed: None,
            simulation_delay_ms: DEFAULT_DELAY_MS,
            bind: SocketAddr::from(([127, 0, 0, 1], 9000)),
            interpretation: InterpretationConfig::default(),
            tools: ToolDefaults::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(seed: Option<u64>, simulation_delay_ms: u64) -> Self {
        Self {
            seed,
            simulation_delay_ms,
            ..Default::default()
        }
    }
}
