use crate::analysis::{AnalysisError, Embedder};
use crate::config::KeywordConfig;
use anyhow::{Result, bail};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::debug;

/// Sentence embedding model used to rank keyphrase candidates
pub struct EmbeddingService {
    model: TextEmbedding,
    batch_size: usize,
    dimension: usize,
}

impl EmbeddingService {
    /// Load the model, downloading it on first use. Fails if the artifacts are unavailable.
    pub fn new(config: &KeywordConfig) -> Result<Self> {
        let (model_kind, dimension) = resolve_model(&config.model_name)?;

        let mut options = InitOptions::new(model_kind)
            .with_max_length(config.max_length)
            .with_show_download_progress(config.show_download_progress);
        if let Some(cache_dir) = &config.cache_dir {
            options = options.with_cache_dir(cache_dir.clone());
        }

        let model = TextEmbedding::try_new(options)?;

        Ok(Self {
            model,
            batch_size: config.batch_size,
            dimension,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

impl Embedder for EmbeddingService {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AnalysisError> {
        debug!(texts = texts.len(), "Embedding batch");
        self.model
            .embed(texts.to_vec(), Some(self.batch_size))
            .map_err(|e| AnalysisError::Embedding(e.to_string()))
    }
}

/// Map a configured model name onto a supported embedding model and its output size
fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize)> {
    let resolved = match name {
        "sentence-transformers/all-MiniLM-L6-v2" | "all-MiniLM-L6-v2" => {
            (EmbeddingModel::AllMiniLML6V2, 384)
        }
        "sentence-transformers/all-MiniLM-L12-v2" | "all-MiniLM-L12-v2" => {
            (EmbeddingModel::AllMiniLML12V2, 384)
        }
        "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => (EmbeddingModel::BGESmallENV15, 384),
        "BAAI/bge-base-en-v1.5" | "bge-base-en-v1.5" => (EmbeddingModel::BGEBaseENV15, 768),
        other => bail!("unsupported keyphrase embedding model '{}'", other),
    };
    Ok(resolved)
}
