//! Layered configuration for a sentvec run.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults (the three demo sentences, `paraphrase-MiniLM-L6-v2`,
//!    `embeddings.json`),
//! 2. an optional config file: `sentvec.{yaml,toml,json}` in the working directory,
//!    or an explicit path which must then exist,
//! 3. environment variables prefixed `SENTVEC` with `__` between segments,
//!    e.g. `SENTVEC__MODEL__NAME` or `SENTVEC__OUTPUT__PATH`.
//!    `SENTVEC__INPUT__SENTENCES` holds the sentence list separated by `|`.
//!
//! CLI flags are applied on top by the binary.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//!
//! model:
//!   name: "paraphrase-MiniLM-L6-v2"
//!   mode: "onnx"
//!   cache_dir: "./models"
//!   max_sequence_length: 128
//!   pooling: "mean"
//!   normalize: false
//!
//! input:
//!   sentences:
//!     - "This is an example sentence."
//!     - "Each sentence is converted"
//!     - "into a vector using BERT."
//!
//! output:
//!   path: "embeddings.json"
//!   id_prefix: "sentence_"
//!   pretty: false
//!
//! query:
//!   top_k: 5
//!   cache_capacity: 100
//!
//! logging:
//!   level: "info"
//!   format: "pretty"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use semantic::{EncoderMode, PoolingStrategy, SemanticConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentences encoded when none are configured.
pub const DEFAULT_SENTENCES: [&str; 3] = [
    "This is an example sentence.",
    "Each sentence is converted",
    "into a vector using BERT.",
];

const ENV_PREFIX: &str = "SENTVEC";
const ENV_SEPARATOR: &str = "__";
const DEFAULT_CONFIG_STEM: &str = "sentvec";
const SENTENCES_ENV_VAR: &str = "SENTVEC__INPUT__SENTENCES";
const SENTENCE_LIST_SEPARATOR: char = '|';

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to load config: {0}")]
    Source(#[from] config::ConfigError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration for one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SentvecConfig {
    /// Configuration format version
    pub version: String,
    pub model: ModelConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
    pub query: QueryConfig,
    pub logging: LoggingConfig,
}

impl Default for SentvecConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            model: ModelConfig::default(),
            input: InputConfig::default(),
            output: OutputConfig::default(),
            query: QueryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SentvecConfig {
    /// Loads defaults, then the config file, then `SENTVEC__*` environment variables.
    ///
    /// With `path = None` a `sentvec.*` file in the working directory is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        Self::load_with_env(path, None)
    }

    /// Same as [`load`](Self::load) but reads environment overrides from `env` instead of
    /// the process environment when given.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigLoadError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_STEM).required(false),
        };

        // Only the sentence list is split. Other values stay strings until deserialization.
        let sentences = match &env {
            Some(vars) => vars.get(SENTENCES_ENV_VAR).cloned(),
            None => std::env::var(SENTENCES_ENV_VAR).ok(),
        };

        let environment = config::Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .source(env);

        let mut builder = config::Config::builder()
            .add_source(file)
            .add_source(environment);
        if let Some(list) = sentences {
            builder = builder.set_override(
                "input.sentences",
                list.split(SENTENCE_LIST_SEPARATOR).collect::<Vec<_>>(),
            )?;
        }

        let cfg: SentvecConfig = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parses YAML configuration from a string, without file or environment layers.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let cfg: SentvecConfig = config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.model.validate()?;
        self.input.validate()?;
        self.output.validate()?;
        Ok(())
    }
}

/// Which model to load and how to post-process its vectors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    pub mode: EncoderMode,
    pub revision: String,
    pub cache_dir: PathBuf,
    pub model_path: Option<PathBuf>,
    pub tokenizer_path: Option<PathBuf>,
    pub model_url: Option<String>,
    pub tokenizer_url: Option<String>,
    pub offline: bool,
    pub max_sequence_length: usize,
    pub pooling: PoolingStrategy,
    pub normalize: bool,
    pub stub_dimension: usize,
}

impl ModelConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.name.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "model.name must not be empty".to_string(),
            ));
        }
        if self.max_sequence_length == 0 {
            return Err(ConfigLoadError::Validation(
                "model.max_sequence_length must be >= 1".to_string(),
            ));
        }
        if self.stub_dimension == 0 {
            return Err(ConfigLoadError::Validation(
                "model.stub_dimension must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Converts this section into the encoder crate's config.
    pub fn to_semantic_config(&self) -> SemanticConfig {
        SemanticConfig {
            mode: self.mode,
            model_name: self.name.clone(),
            revision: self.revision.clone(),
            cache_dir: self.cache_dir.clone(),
            model_path: self.model_path.clone(),
            tokenizer_path: self.tokenizer_path.clone(),
            model_url: self.model_url.clone(),
            tokenizer_url: self.tokenizer_url.clone(),
            offline: self.offline,
            max_sequence_length: self.max_sequence_length,
            pooling: self.pooling,
            normalize: self.normalize,
            stub_dimension: self.stub_dimension,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        let sem = SemanticConfig::default();
        Self {
            name: sem.model_name,
            mode: sem.mode,
            revision: sem.revision,
            cache_dir: sem.cache_dir,
            model_path: sem.model_path,
            tokenizer_path: sem.tokenizer_path,
            model_url: sem.model_url,
            tokenizer_url: sem.tokenizer_url,
            offline: sem.offline,
            max_sequence_length: sem.max_sequence_length,
            pooling: sem.pooling,
            normalize: sem.normalize,
            stub_dimension: sem.stub_dimension,
        }
    }
}

/// Sentences to encode, in output order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    pub sentences: Vec<String>,
}

impl InputConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.sentences.is_empty() {
            return Err(ConfigLoadError::Validation(
                "input.sentences must contain at least one sentence".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            sentences: DEFAULT_SENTENCES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Where and how the embedding document is written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    /// Record ids are `{id_prefix}{index}`.
    pub id_prefix: String,
    /// Indented JSON instead of the compact form.
    pub pretty: bool,
}

impl OutputConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigLoadError::Validation(
                "output.path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("embeddings.json"),
            id_prefix: "sentence_".to_string(),
            pretty: false,
        }
    }
}

/// Settings for `sentvec query`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueryConfig {
    pub top_k: usize,
    /// Memoized queries kept in the LRU; 0 disables caching.
    pub cache_capacity: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            cache_capacity: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn default_config_reproduces_hardcoded_run() {
        let cfg = SentvecConfig::default();
        assert_eq!(cfg.model.name, "paraphrase-MiniLM-L6-v2");
        assert_eq!(cfg.model.mode, EncoderMode::Onnx);
        assert_eq!(cfg.input.sentences, DEFAULT_SENTENCES);
        assert_eq!(cfg.output.path, PathBuf::from("embeddings.json"));
        assert_eq!(cfg.output.id_prefix, "sentence_");
        assert!(!cfg.output.pretty);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn model_section_maps_onto_semantic_config() {
        let cfg = SentvecConfig::default();
        assert_eq!(cfg.model.to_semantic_config(), SemanticConfig::default());
    }

    #[test]
    fn test_load_valid_yaml() {
        let yaml = r#"
version: "1.0"
model:
  name: "all-MiniLM-L6-v2"
  mode: "fast"
  pooling: "cls"
input:
  sentences:
    - "one"
    - "two"
output:
  path: "out/vectors.json"
  pretty: true
"#;

        let cfg = SentvecConfig::from_yaml(yaml).unwrap();
        assert_eq!(cfg.model.name, "all-MiniLM-L6-v2");
        assert_eq!(cfg.model.mode, EncoderMode::Fast);
        assert_eq!(cfg.model.pooling, PoolingStrategy::Cls);
        assert_eq!(cfg.input.sentences, vec!["one", "two"]);
        assert_eq!(cfg.output.path, PathBuf::from("out/vectors.json"));
        assert!(cfg.output.pretty);
        // untouched sections keep their defaults
        assert_eq!(cfg.output.id_prefix, "sentence_");
        assert_eq!(cfg.query.top_k, 5);
    }

    #[test]
    fn test_load_from_file() {
        let yaml = "version: \"1\"\noutput:\n  id_prefix: \"s\"\n";
        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        temp_file.write_all(yaml.as_bytes()).unwrap();

        let cfg = SentvecConfig::load_with_env(Some(temp_file.path()), env(&[])).unwrap();
        assert_eq!(cfg.output.id_prefix, "s");
        assert_eq!(cfg.input.sentences.len(), 3);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        let err = SentvecConfig::load_with_env(Some(&missing), env(&[])).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Source(_)));
    }

    #[test]
    fn environment_overrides_file() {
        let yaml = "model:\n  name: \"from-file\"\n";
        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        temp_file.write_all(yaml.as_bytes()).unwrap();

        let cfg = SentvecConfig::load_with_env(
            Some(temp_file.path()),
            env(&[
                ("SENTVEC__MODEL__NAME", "from-env"),
                ("SENTVEC__OUTPUT__PATH", "/tmp/e.json"),
                ("SENTVEC__QUERY__TOP_K", "2"),
            ]),
        )
        .unwrap();

        assert_eq!(cfg.model.name, "from-env");
        assert_eq!(cfg.output.path, PathBuf::from("/tmp/e.json"));
        assert_eq!(cfg.query.top_k, 2);
    }

    #[test]
    fn environment_sentence_list() {
        let cfg = SentvecConfig::load_with_env(
            None,
            env(&[("SENTVEC__INPUT__SENTENCES", "alpha, beta|gamma")]),
        )
        .unwrap();
        assert_eq!(cfg.input.sentences, vec!["alpha, beta", "gamma"]);
    }

    #[test]
    fn numeric_looking_strings_stay_strings() {
        let cfg = SentvecConfig::load_with_env(
            None,
            env(&[
                ("SENTVEC__OUTPUT__ID_PREFIX", "007"),
                ("SENTVEC__MODEL__REVISION", "1.10"),
                ("SENTVEC__OUTPUT__PRETTY", "true"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.output.id_prefix, "007");
        assert_eq!(cfg.model.revision, "1.10");
        assert!(cfg.output.pretty);
    }

    #[test]
    fn single_numeric_or_boolean_sentence_is_kept() {
        for raw in ["2024", "true", "NaN"] {
            let cfg = SentvecConfig::load_with_env(
                None,
                env(&[("SENTVEC__INPUT__SENTENCES", raw)]),
            )
            .unwrap();
            assert_eq!(cfg.input.sentences, vec![raw]);
        }
    }

    #[test]
    fn empty_output_path_is_rejected() {
        let err = SentvecConfig::from_yaml("output:\n  path: \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigLoadError::Validation(ref m) if m.contains("output.path")));
    }

    #[test]
    fn empty_model_name_is_rejected() {
        let err = SentvecConfig::from_yaml("model:\n  name: \"  \"\n").unwrap_err();
        assert!(matches!(err, ConfigLoadError::Validation(ref m) if m.contains("model.name")));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let err = SentvecConfig::from_yaml("version: \"2.0\"\n").unwrap_err();
        assert!(matches!(err, ConfigLoadError::UnsupportedVersion(v) if v == "2.0"));
    }

    #[test]
    fn empty_sentence_list_is_rejected() {
        let err = SentvecConfig::from_yaml("input:\n  sentences: []\n").unwrap_err();
        assert!(err.to_string().contains("input.sentences"));
    }

    #[test]
    fn zero_sequence_length_is_rejected() {
        let err = SentvecConfig::from_yaml("model:\n  max_sequence_length: 0\n").unwrap_err();
        assert!(err.to_string().contains("max_sequence_length"));
    }

    #[test]
    fn invalid_mode_fails_to_parse() {
        let err = SentvecConfig::from_yaml("model:\n  mode: \"gpu\"\n").unwrap_err();
        assert!(matches!(err, ConfigLoadError::Source(_)));
    }
}
