use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Hugging Face organisation used when a bare model name is given.
pub const DEFAULT_MODEL_ORG: &str = "sentence-transformers";
/// Model loaded when nothing else is configured.
pub const DEFAULT_MODEL_NAME: &str = "paraphrase-MiniLM-L6-v2";
/// Upper bound on tokens per sentence for the default model.
pub const DEFAULT_MAX_SEQUENCE_LENGTH: usize = 128;
/// Output width of the default model, reused by the stub backend.
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

const HF_BASE_URL: &str = "https://huggingface.co";

/// Which backend turns text into vectors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EncoderMode {
    /// Tokenizer + ONNX Runtime session over the real model.
    #[default]
    Onnx,
    /// Deterministic hash-based vectors. No assets, no network.
    Fast,
}

/// How token-level hidden states collapse into one sentence vector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PoolingStrategy {
    /// Attention-mask weighted average over tokens.
    #[default]
    Mean,
    /// Hidden state of the first (`[CLS]`) token.
    Cls,
}

/// Runtime configuration describing which model/tokenizer to use and how to post-process vectors.
///
/// # Example
/// ```no_run
/// use semantic::{SemanticConfig, SentenceEncoder};
///
/// # async fn run() -> Result<(), semantic::SemanticError> {
/// let cfg = SemanticConfig::for_model("paraphrase-MiniLM-L6-v2");
/// let encoder = SentenceEncoder::load(&cfg).await?;
/// let vectors = encoder.encode(&["This is an example sentence."])?;
/// assert_eq!(vectors.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SemanticConfig {
    /// Backend selector.
    pub mode: EncoderMode,
    /// Model name, either bare (`paraphrase-MiniLM-L6-v2`) or a full repo id (`org/name`).
    pub model_name: String,
    /// Hub revision (branch, tag or commit) used when building download URLs.
    pub revision: String,
    /// Root directory for locally stored model assets.
    pub cache_dir: PathBuf,
    /// Explicit ONNX file location. Derived from [`cache_dir`](Self::cache_dir) when absent.
    pub model_path: Option<PathBuf>,
    /// Explicit `tokenizer.json` location. Derived from [`cache_dir`](Self::cache_dir) when absent.
    pub tokenizer_path: Option<PathBuf>,
    /// Download URL for the ONNX file. Derived from the model name when absent.
    pub model_url: Option<String>,
    /// Download URL for the tokenizer. Derived from the model name when absent.
    pub tokenizer_url: Option<String>,
    /// Never download; missing assets fail immediately.
    pub offline: bool,
    /// Longer inputs are truncated to this many tokens.
    pub max_sequence_length: usize,
    /// Pooling applied to rank-3 model outputs.
    pub pooling: PoolingStrategy,
    /// Normalize the resulting vector to unit length.
    pub normalize: bool,
    /// Vector width produced by [`EncoderMode::Fast`].
    pub stub_dimension: usize,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self::for_model(DEFAULT_MODEL_NAME)
    }
}

impl SemanticConfig {
    /// Builds a config for `model_name` with every other knob at its default.
    pub fn for_model(model_name: impl Into<String>) -> Self {
        Self {
            mode: EncoderMode::Onnx,
            model_name: model_name.into(),
            revision: "main".into(),
            cache_dir: PathBuf::from("./models"),
            model_path: None,
            tokenizer_path: None,
            model_url: None,
            tokenizer_url: None,
            offline: false,
            max_sequence_length: DEFAULT_MAX_SEQUENCE_LENGTH,
            pooling: PoolingStrategy::Mean,
            normalize: false,
            stub_dimension: DEFAULT_EMBEDDING_DIM,
        }
    }

    /// Hub repository id, e.g. `sentence-transformers/paraphrase-MiniLM-L6-v2`.
    pub fn repo_id(&self) -> String {
        if self.model_name.contains('/') {
            self.model_name.clone()
        } else {
            format!("{DEFAULT_MODEL_ORG}/{}", self.model_name)
        }
    }

    /// Directory under [`cache_dir`](Self::cache_dir) holding this model's files.
    pub fn model_dir(&self) -> PathBuf {
        let local_name = self
            .model_name
            .rsplit('/')
            .next()
            .unwrap_or(self.model_name.as_str());
        self.cache_dir.join(local_name)
    }

    pub fn resolved_model_path(&self) -> PathBuf {
        self.model_path
            .clone()
            .unwrap_or_else(|| self.model_dir().join("onnx").join("model.onnx"))
    }

    pub fn resolved_tokenizer_path(&self) -> PathBuf {
        self.tokenizer_path
            .clone()
            .unwrap_or_else(|| self.model_dir().join("tokenizer.json"))
    }

    pub fn resolved_model_url(&self) -> String {
        self.model_url
            .clone()
            .unwrap_or_else(|| self.hub_file_url("onnx/model.onnx"))
    }

    pub fn resolved_tokenizer_url(&self) -> String {
        self.tokenizer_url
            .clone()
            .unwrap_or_else(|| self.hub_file_url("tokenizer.json"))
    }

    fn hub_file_url(&self, file: &str) -> String {
        // Use `/resolve/`, not `/blob/`, to get the raw file.
        format!(
            "{HF_BASE_URL}/{}/resolve/{}/{file}",
            self.repo_id(),
            self.revision
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let cfg = SemanticConfig::default();
        assert_eq!(cfg.mode, EncoderMode::Onnx);
        assert_eq!(cfg.model_name, "paraphrase-MiniLM-L6-v2");
        assert_eq!(cfg.revision, "main");
        assert_eq!(cfg.cache_dir, PathBuf::from("./models"));
        assert!(cfg.model_path.is_none());
        assert!(cfg.tokenizer_path.is_none());
        assert!(!cfg.offline);
        assert_eq!(cfg.max_sequence_length, 128);
        assert_eq!(cfg.pooling, PoolingStrategy::Mean);
        assert!(!cfg.normalize);
        assert_eq!(cfg.stub_dimension, 384);
    }

    #[test]
    fn bare_name_maps_to_sentence_transformers_repo() {
        let cfg = SemanticConfig::default();
        assert_eq!(cfg.repo_id(), "sentence-transformers/paraphrase-MiniLM-L6-v2");
        assert_eq!(
            cfg.resolved_model_url(),
            "https://huggingface.co/sentence-transformers/paraphrase-MiniLM-L6-v2/resolve/main/onnx/model.onnx"
        );
        assert_eq!(
            cfg.resolved_tokenizer_url(),
            "https://huggingface.co/sentence-transformers/paraphrase-MiniLM-L6-v2/resolve/main/tokenizer.json"
        );
    }

    #[test]
    fn qualified_name_keeps_org() {
        let cfg = SemanticConfig::for_model("BAAI/bge-small-en-v1.5");
        assert_eq!(cfg.repo_id(), "BAAI/bge-small-en-v1.5");
        assert_eq!(
            cfg.resolved_model_path(),
            PathBuf::from("./models/bge-small-en-v1.5/onnx/model.onnx")
        );
    }

    #[test]
    fn local_paths_derive_from_cache_dir() {
        let cfg = SemanticConfig {
            cache_dir: PathBuf::from("/var/cache/sentvec"),
            ..SemanticConfig::default()
        };
        assert_eq!(
            cfg.resolved_model_path(),
            PathBuf::from("/var/cache/sentvec/paraphrase-MiniLM-L6-v2/onnx/model.onnx")
        );
        assert_eq!(
            cfg.resolved_tokenizer_path(),
            PathBuf::from("/var/cache/sentvec/paraphrase-MiniLM-L6-v2/tokenizer.json")
        );
    }

    #[test]
    fn explicit_overrides_win() {
        let cfg = SemanticConfig {
            model_path: Some(PathBuf::from("/m.onnx")),
            tokenizer_path: Some(PathBuf::from("/t.json")),
            model_url: Some("https://example.com/m.onnx".into()),
            tokenizer_url: Some("https://example.com/t.json".into()),
            ..SemanticConfig::default()
        };
        assert_eq!(cfg.resolved_model_path(), PathBuf::from("/m.onnx"));
        assert_eq!(cfg.resolved_tokenizer_path(), PathBuf::from("/t.json"));
        assert_eq!(cfg.resolved_model_url(), "https://example.com/m.onnx");
        assert_eq!(cfg.resolved_tokenizer_url(), "https://example.com/t.json");
    }

    #[test]
    fn revision_is_part_of_url() {
        let cfg = SemanticConfig {
            revision: "v1.0".into(),
            ..SemanticConfig::default()
        };
        assert!(cfg.resolved_model_url().contains("/resolve/v1.0/"));
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = SemanticConfig {
            mode: EncoderMode::Fast,
            pooling: PoolingStrategy::Cls,
            normalize: true,
            model_url: Some("https://example.com/model.onnx".into()),
            ..SemanticConfig::default()
        };

        let serialized = serde_json::to_string(&cfg).unwrap();
        let deserialized: SemanticConfig = serde_json::from_str(&serialized).unwrap();

        assert_eq!(cfg, deserialized);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: SemanticConfig =
            serde_json::from_str(r#"{"mode":"fast","pooling":"cls"}"#).unwrap();
        assert_eq!(cfg.mode, EncoderMode::Fast);
        assert_eq!(cfg.pooling, PoolingStrategy::Cls);
        assert_eq!(cfg.model_name, DEFAULT_MODEL_NAME);
    }
}
