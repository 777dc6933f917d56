//! TF-IDF weighting over a fitted vocabulary, and cosine similarity between the vectors.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::text::Analyzer;

/// Vocabulary bounds; document-frequency limits are proportions of the fitted corpus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VectorizerConfig {
    pub max_df: f64,
    pub min_df: f64,
    pub ngram_min: usize,
    pub ngram_max: usize,
}

/// Per-key override of a [`VectorizerConfig`]; keys left out keep the base value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VectorizerOverride {
    pub max_df: Option<f64>,
    pub min_df: Option<f64>,
    pub ngram_min: Option<usize>,
    pub ngram_max: Option<usize>,
}

impl VectorizerOverride {
    pub fn apply(&self, base: VectorizerConfig) -> VectorizerConfig {
        VectorizerConfig {
            max_df: self.max_df.unwrap_or(base.max_df),
            min_df: self.min_df.unwrap_or(base.min_df),
            ngram_min: self.ngram_min.unwrap_or(base.ngram_min),
            ngram_max: self.ngram_max.unwrap_or(base.ngram_max),
        }
    }
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_df: 0.5,
            min_df: 0.05,
            ngram_min: 1,
            ngram_max: 2,
        }
    }
}

/// L2-normalised sparse vector, entries sorted by term index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j, mut sum) = (0, 0, 0.0);
        while i < self.entries.len() && j < other.entries.len() {
            let (a, wa) = self.entries[i];
            let (b, wb) = other.entries[j];
            match a.cmp(&b) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += wa * wb;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

/// Cosine of the angle between two vectors; 0 when either is all zeros.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let denom = a.norm() * b.norm();
    if denom == 0.0 {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(0.0, 1.0)
}

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    analyzer: Analyzer,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Learn vocabulary and inverse document frequencies from `documents`.
    ///
    /// Terms outside `[min_df * n, max_df * n]` documents are dropped. If that would leave
    /// nothing, the unpruned vocabulary is kept instead.
    pub fn fit<S: AsRef<str>>(analyzer: Analyzer, config: &VectorizerConfig, documents: &[S]) -> Self {
        let n_docs = documents.len();
        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();
        for doc in documents {
            let mut terms = analyzer.terms(doc.as_ref());
            terms.sort_unstable();
            terms.dedup();
            for term in terms {
                *doc_freq.entry(term).or_default() += 1;
            }
        }

        let high = config.max_df * n_docs as f64;
        let low = config.min_df * n_docs as f64;
        let pruned: Vec<(&String, usize)> = doc_freq
            .iter()
            .filter(|(_, &df)| df as f64 <= high && df as f64 >= low)
            .map(|(t, &df)| (t, df))
            .collect();
        let kept: Vec<(&String, usize)> = if pruned.is_empty() && !doc_freq.is_empty() {
            debug!(terms = doc_freq.len(), "document-frequency bounds removed every term; keeping all");
            doc_freq.iter().map(|(t, &df)| (t, df)).collect()
        } else {
            pruned
        };

        let mut vocabulary = HashMap::with_capacity(kept.len());
        let mut idf = Vec::with_capacity(kept.len());
        for (index, (term, df)) in kept.into_iter().enumerate() {
            vocabulary.insert(term.clone(), index);
            idf.push(((1.0 + n_docs as f64) / (1.0 + df as f64)).ln() + 1.0);
        }
        debug!(documents = n_docs, vocabulary = vocabulary.len(), "vectorizer fitted");
        Self {
            analyzer,
            vocabulary,
            idf,
        }
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Project a document into the fitted space. Unknown terms are ignored.
    pub fn transform(&self, document: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in self.analyzer.terms(document) {
            if let Some(&index) = self.vocabulary.get(&term) {
                *counts.entry(index).or_default() += 1.0;
            }
        }
        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(index, tf)| (index, tf * self.idf[index]))
            .collect();
        let norm = entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut entries {
                *w /= norm;
            }
        }
        SparseVector { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::default_stopwords;

    fn analyzer() -> Analyzer {
        Analyzer::new(default_stopwords(), 1, 2)
    }

    #[test]
    fn identical_documents_are_fully_similar() {
        let doc = "Stealth assassin infiltrates a neon city";
        let v = TfidfVectorizer::fit(analyzer(), &VectorizerConfig::default(), &[doc]);
        assert!(v.vocabulary_len() > 0);
        let sim = cosine_similarity(&v.transform(doc), &v.transform(doc));
        assert!((sim - 1.0).abs() < 1e-9, "got {sim}");
    }

    #[test]
    fn disjoint_documents_score_zero() {
        let v = TfidfVectorizer::fit(analyzer(), &VectorizerConfig::default(), &["farming cozy village"]);
        let sim = cosine_similarity(&v.transform("farming cozy village"), &v.transform("space pirates"));
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn frequency_bounds_prune_ubiquitous_terms() {
        let docs = ["zombie survival", "zombie racing", "zombie puzzle", "chess tactics"];
        let config = VectorizerConfig {
            max_df: 0.5,
            min_df: 0.0,
            ..Default::default()
        };
        let v = TfidfVectorizer::fit(analyzer(), &config, &docs);
        assert!(v.transform("zombie").is_zero());
        assert!(!v.transform("chess").is_zero());
    }

    #[test]
    fn transformed_vectors_are_unit_length() {
        let docs = ["roguelike deckbuilder cards", "deckbuilder strategy cards", "racing cars"];
        let config = VectorizerConfig {
            max_df: 1.0,
            min_df: 0.0,
            ..Default::default()
        };
        let v = TfidfVectorizer::fit(analyzer(), &config, &docs);
        let norm = v.transform("roguelike cards cards").norm();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_corpus_projects_everything_to_zero() {
        let v = TfidfVectorizer::fit::<&str>(analyzer(), &VectorizerConfig::default(), &[]);
        assert!(v.transform("anything at all").is_zero());
    }
}
