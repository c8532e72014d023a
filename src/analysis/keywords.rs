use super::AnalysisError;
use super::stopwords::is_stop_word;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Number of keyphrases surfaced per review
pub const DEFAULT_TOP_N: usize = 5;
/// Longest candidate phrase, in words
pub const MAX_NGRAM: usize = 2;

/// Returns ranked keyphrases (text only) drawn from the input
pub trait KeyphraseExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Result<Vec<String>, AnalysisError>;
}

/// Maps texts to dense vectors, one per input, in input order
pub trait Embedder: Send + Sync {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AnalysisError>;
}

/// A candidate phrase with its similarity to the whole document
#[derive(Debug, Clone, PartialEq)]
pub struct Keyphrase {
    pub phrase: String,
    pub relevance: f32,
}

/// Lowercased word tokens: runs of alphanumerics or `_`, at least two chars long
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

/// Unigrams and bigrams over the stop-word filtered token stream, deduplicated
pub fn candidate_phrases(text: &str) -> Vec<String> {
    let tokens: Vec<String> = tokenize(text)
        .into_iter()
        .filter(|token| !is_stop_word(token))
        .collect();

    let mut candidates = BTreeSet::new();
    for n in 1..=MAX_NGRAM {
        for window in tokens.windows(n) {
            candidates.insert(window.join(" "));
        }
    }

    candidates.into_iter().collect()
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Ranks candidate phrases by embedding similarity to the full document
pub struct EmbeddingKeyphraseExtractor<E> {
    embedder: E,
    top_n: usize,
}

impl<E: Embedder> EmbeddingKeyphraseExtractor<E> {
    pub fn new(embedder: E) -> Self {
        Self {
            embedder,
            top_n: DEFAULT_TOP_N,
        }
    }

    /// Scored phrases, best first, at most `top_n`
    pub fn rank(&self, text: &str) -> Result<Vec<Keyphrase>, AnalysisError> {
        let candidates = candidate_phrases(text);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut batch = Vec::with_capacity(candidates.len() + 1);
        batch.push(text.to_string());
        batch.extend(candidates.iter().cloned());

        let embeddings = self.embedder.embed_batch(&batch)?;
        if embeddings.len() != batch.len() {
            return Err(AnalysisError::Embedding(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                embeddings.len()
            )));
        }

        let (document, phrases) = embeddings.split_at(1);
        let mut ranked: Vec<Keyphrase> = candidates
            .into_iter()
            .zip(phrases)
            .map(|(phrase, embedding)| Keyphrase {
                relevance: cosine_similarity(&document[0], embedding),
                phrase,
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.phrase.cmp(&b.phrase))
        });
        ranked.truncate(self.top_n);

        Ok(ranked)
    }
}

impl<E: Embedder> KeyphraseExtractor for EmbeddingKeyphraseExtractor<E> {
    fn extract(&self, text: &str) -> Result<Vec<String>, AnalysisError> {
        Ok(self.rank(text)?.into_iter().map(|k| k.phrase).collect())
    }
}
