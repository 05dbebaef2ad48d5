//! Configuration for the ingestion and retrieval pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const OPENAI_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const OPENAI_EMBEDDING_DIMENSIONS: usize = 1536;
const OPENAI_GENERATE_MODEL: &str = "gpt-4o-mini";
const OLLAMA_EMBEDDING_MODEL: &str = "nomic-embed-text";
const OLLAMA_EMBEDDING_DIMENSIONS: usize = 768;
const OLLAMA_GENERATE_MODEL: &str = "llama3.2";

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Embedding provider selection
    pub backend: BackendProvider,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Vector database configuration
    pub vector_db: VectorDbConfig,
    /// Answer generation configuration
    pub llm: LlmConfig,
    /// OpenAI-compatible API access
    pub openai: OpenAiConfig,
    /// Ollama access (backend = ollama)
    pub ollama: OllamaConfig,
    /// Video transcription configuration
    pub transcription: TranscriptionConfig,
    /// Image description configuration
    pub vision: VisionConfig,
    /// Acquisition and indexing configuration
    pub ingestion: IngestionConfig,
    /// Processing configuration
    pub processing: ProcessingConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Load from `path` if given, else from the default location if it exists, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(path)?,
                _ => Self::default(),
            },
        };
        let config = config.with_backend_defaults().with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Swap OpenAI model defaults for Ollama ones when the backend is Ollama
    ///
    /// Only values still equal to the OpenAI defaults are replaced, so models
    /// set explicitly in the file are kept.
    pub fn with_backend_defaults(mut self) -> Self {
        if self.backend != BackendProvider::Ollama {
            return self;
        }
        if self.embeddings.model == OPENAI_EMBEDDING_MODEL {
            self.embeddings.model = OLLAMA_EMBEDDING_MODEL.to_string();
            if self.embeddings.dimensions == OPENAI_EMBEDDING_DIMENSIONS {
                self.embeddings.dimensions = OLLAMA_EMBEDDING_DIMENSIONS;
            }
        }
        if self.llm.generate_model == OPENAI_GENERATE_MODEL {
            self.llm.generate_model = OLLAMA_GENERATE_MODEL.to_string();
        }
        self
    }

    /// Fill credentials that are absent from the file with environment variables
    pub fn with_env_overrides(mut self) -> Self {
        if self.openai.api_key.is_none() {
            self.openai.api_key = std::env::var("OPENAI_API_KEY").ok();
        }
        if self.vector_db.api_key.is_none() {
            self.vector_db.api_key = std::env::var("PINECONE_API_KEY").ok();
        }
        self
    }

    /// Reject settings the pipeline cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be positive".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.ingestion.batch_size == 0 {
            return Err(Error::Config("ingestion.batch_size must be positive".to_string()));
        }
        if self.vector_db.index_name.trim().is_empty() {
            return Err(Error::Config("vector_db.index_name is empty".to_string()));
        }
        Ok(())
    }
}

/// `$XDG_CONFIG_HOME/media-rag/config.toml` or the platform equivalent
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("media-rag").join("config.toml"))
}

/// Provider used for embeddings and answer generation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    /// OpenAI-compatible HTTP API
    #[default]
    OpenAi,
    /// Local Ollama server
    Ollama,
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 700,
            chunk_overlap: 50,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model identifier, recorded with every indexed vector
    pub model: String,
    /// Embedding dimensions
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: OPENAI_EMBEDDING_MODEL.to_string(),
            dimensions: OPENAI_EMBEDDING_DIMENSIONS,
        }
    }
}

/// Vector store selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreKind {
    /// Process-local store, lost on exit
    #[default]
    Memory,
    /// Pinecone data-plane API
    Pinecone,
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Which store to use
    pub kind: VectorStoreKind,
    /// Index name chunks are written to and read from
    pub index_name: String,
    /// Index host, e.g. `https://my-index-abc123.svc.us-east-1.pinecone.io`
    pub host: Option<String>,
    /// API key (falls back to `PINECONE_API_KEY`)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Optional namespace within the index
    pub namespace: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            kind: VectorStoreKind::Memory,
            index_name: "formacao-drive-documents".to_string(),
            host: None,
            api_key: None,
            namespace: None,
            timeout_secs: 30,
        }
    }
}

/// Answer generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Number of chunks retrieved as context for an answer
    pub top_k: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            generate_model: OPENAI_GENERATE_MODEL.to_string(),
            temperature: 0.2,
            top_k: 10,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// OpenAI-compatible API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// Base URL, without trailing `/`
    pub base_url: String,
    /// API key (falls back to `OPENAI_API_KEY`)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
        }
    }
}

/// Ollama configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama base URL
    pub base_url: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
        }
    }
}

/// Video transcription configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Speech-to-text model
    pub model: String,
    /// ffmpeg executable used to extract the audio track
    pub ffmpeg_path: PathBuf,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            timeout_secs: 600,
        }
    }
}

/// Image description configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Vision-capable chat model
    pub model: String,
    /// Role given to the model in the system message
    pub system_prompt: String,
    /// Instruction sent alongside the images
    pub instruction: String,
    /// Image detail level (`low`, `high`, `auto`)
    pub detail: String,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            system_prompt: "You are an image analyzer and your job is to make a very detailed \
                analysis of all the images presented and describe every single detail as \
                thoroughly as possible."
                .to_string(),
            instruction: "Analyze this image in detail and provide a meticulous description \
                of everything it contains."
                .to_string(),
            detail: "low".to_string(),
        }
    }
}

/// Acquisition and indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Root directory files are acquired from; `relative_path` is computed against it
    pub docs_root: PathBuf,
    /// Chunks per upsert batch
    pub batch_size: usize,
    /// Retries per failed batch before it is reported and skipped
    pub max_batch_retries: u32,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            docs_root: PathBuf::from("docs"),
            batch_size: 100,
            max_batch_retries: 2,
        }
    }
}

/// Processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Files normalized concurrently (1 = sequential)
    pub parallel_files: usize,
    /// Timeout for normalizing a single file in seconds
    pub file_timeout_secs: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_files: 1,
            file_timeout_secs: 900,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunking.chunk_size, 700);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.ingestion.batch_size, 100);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = RagConfig::default();
        config.chunking.chunk_overlap = 700;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let raw = r#"
            backend = "ollama"

            [chunking]
            chunk_size = 500

            [vector_db]
            kind = "pinecone"
            index_name = "team-docs"
        "#;
        let config: RagConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.backend, BackendProvider::Ollama);
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.vector_db.kind, VectorStoreKind::Pinecone);
        assert_eq!(config.vector_db.index_name, "team-docs");
        assert_eq!(config.llm.top_k, 10);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ingestion]\nbatch_size = 25\n").unwrap();

        let config = RagConfig::from_file(&path).unwrap();
        assert_eq!(config.ingestion.batch_size, 25);

        std::fs::write(&path, "[ingestion]\nbatch_size = \"many\"\n").unwrap();
        assert!(matches!(RagConfig::from_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_ollama_backend_gets_ollama_models() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "backend = \"ollama\"\n").unwrap();

        let config = RagConfig::load(Some(&path)).unwrap();
        assert_eq!(config.embeddings.model, "nomic-embed-text");
        assert_eq!(config.embeddings.dimensions, 768);
        assert_eq!(config.llm.generate_model, "llama3.2");
    }

    #[test]
    fn test_explicit_ollama_models_are_kept() {
        let raw = r#"
            backend = "ollama"

            [embeddings]
            model = "mxbai-embed-large"
            dimensions = 1024

            [llm]
            generate_model = "qwen2.5:7b"
        "#;
        let config = toml::from_str::<RagConfig>(raw)
            .unwrap()
            .with_backend_defaults();
        assert_eq!(config.embeddings.model, "mxbai-embed-large");
        assert_eq!(config.embeddings.dimensions, 1024);
        assert_eq!(config.llm.generate_model, "qwen2.5:7b");
    }

    #[test]
    fn test_openai_backend_keeps_openai_models() {
        let config = RagConfig::default().with_backend_defaults();
        assert_eq!(config.embeddings.model, "text-embedding-ada-002");
        assert_eq!(config.llm.generate_model, "gpt-4o-mini");
    }
}
