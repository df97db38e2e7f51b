// config.rs

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Represents the full configuration of a group chat run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Upper bound on turns.
    pub max_round: u32,

    /// Extra attempts a speaker gets after a failed function call.
    #[serde(default)]
    pub invocation_retries: u32,

    /// Participants in speaking order.
    pub agents: Vec<AgentConfig>,

    /// The Ollama model used by model-backed agents.
    pub ollama_model: Option<String>,

    /// Where to write the transcript as JSON, if anywhere.
    #[serde(default)]
    pub transcript_path: Option<PathBuf>,

    /// Debug mode flag (also prints the transcript as JSON).
    #[serde(default)]
    pub debug: bool,
}

/// Defines the configuration of an individual agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent's name, unique within the chat.
    pub name: String,

    /// Persona instructions.
    pub system_message: String,

    /// Names of the functions the agent exposes.
    #[serde(default)]
    pub functions: Vec<String>,

    /// Whether this agent directs speaker selection.
    #[serde(default)]
    pub admin: bool,
}

impl Config {
    pub const DEFAULT_MODEL: &'static str = "llama3.2:latest";

    /// Returns the math classroom configuration.
    pub fn default() -> Self {
        use crate::classroom::{
            ADMIN, ADMIN_SYSTEM_MESSAGE, STUDENT, STUDENT_SYSTEM_MESSAGE, TEACHER,
            TEACHER_SYSTEM_MESSAGE,
        };
        Self {
            max_round: 50,
            invocation_retries: 0,
            agents: vec![
                AgentConfig {
                    name: ADMIN.to_string(),
                    system_message: ADMIN_SYSTEM_MESSAGE.to_string(),
                    functions: vec!["update_progress".to_string()],
                    admin: true,
                },
                AgentConfig {
                    name: TEACHER.to_string(),
                    system_message: TEACHER_SYSTEM_MESSAGE.to_string(),
                    functions: vec![
                        "create_math_question".to_string(),
                        "answer_is_correct".to_string(),
                    ],
                    admin: false,
                },
                AgentConfig {
                    name: STUDENT.to_string(),
                    system_message: STUDENT_SYSTEM_MESSAGE.to_string(),
                    functions: vec!["answer_question".to_string()],
                    admin: false,
                },
            ],
            ollama_model: None,
            transcript_path: None,
            debug: false,
        }
    }

    /// The configured model, or [`Config::DEFAULT_MODEL`].
    pub fn model(&self) -> &str {
        self.ollama_model.as_deref().unwrap_or(Self::DEFAULT_MODEL)
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Arguments
    /// * `path` - The file path to load the configuration from.
    ///
    /// # Returns
    /// * `Ok(Config)` if the file is successfully read and parsed.
    /// * `Err(ConfigError)` if an error occurs.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Loads `path` if it exists, the default configuration otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Saves the current configuration to a JSON file.
    ///
    /// # Arguments
    /// * `path` - The file path to save the configuration to.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
