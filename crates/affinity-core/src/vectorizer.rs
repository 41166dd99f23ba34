//! TF-IDF content vectors
//!
//! Turns item text (title + content + tags) into L2-normalised term-weight
//! vectors over a bounded, corpus-derived vocabulary. Unigrams and bigrams are
//! both eligible; English stop-words are dropped before n-grams are formed.

use crate::{
    aggregator::SparseRow,
    config::VectorizerConfig,
    types::{ItemId, ItemRecord},
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Common English words excluded from the vocabulary
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "an",
    "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere", "are",
    "around", "as", "at", "back", "be", "became", "because", "become", "becomes", "becoming",
    "been", "before", "beforehand", "behind", "being", "below", "beside", "besides", "between",
    "beyond", "both", "but", "by", "can", "cannot", "could", "did", "do", "does", "doing", "done",
    "down", "due", "during", "each", "either", "else", "elsewhere", "enough", "etc", "even",
    "ever", "every", "everyone", "everything", "everywhere", "except", "few", "for", "former",
    "formerly", "from", "further", "had", "has", "have", "having", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hers", "herself", "him", "himself", "his", "how",
    "however", "i", "ie", "if", "in", "indeed", "into", "is", "it", "its", "itself", "just",
    "last", "latter", "least", "less", "many", "may", "me", "meanwhile", "might", "mine", "more",
    "moreover", "most", "mostly", "much", "must", "my", "myself", "namely", "neither", "never",
    "nevertheless", "next", "no", "nobody", "none", "nor", "not", "nothing", "now", "nowhere",
    "of", "off", "often", "on", "once", "one", "only", "onto", "or", "other", "others",
    "otherwise", "our", "ours", "ourselves", "out", "over", "own", "per", "perhaps", "please",
    "rather", "re", "same", "seem", "seemed", "seeming", "seems", "several", "she", "should",
    "since", "so", "some", "somehow", "someone", "something", "sometime", "sometimes",
    "somewhere", "still", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "thence", "there", "thereafter", "thereby", "therefore", "therein",
    "these", "they", "this", "those", "though", "through", "throughout", "thru", "thus", "to",
    "together", "too", "toward", "towards", "under", "until", "up", "upon", "us", "very", "via",
    "was", "we", "well", "were", "what", "whatever", "when", "whence", "whenever", "where",
    "whereafter", "whereas", "whereby", "wherein", "whereupon", "wherever", "whether", "which",
    "while", "whither", "who", "whoever", "whole", "whom", "whose", "why", "will", "with",
    "within", "without", "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];

/// Term list and IDF table shared by every vector of one refresh
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    terms: Vec<String>,
    index: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl Vocabulary {
    /// Terms in index order (alphabetical)
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Index of a term, if it made the vocabulary
    pub fn position(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    /// IDF weight of a term
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.position(term).map(|i| self.idf[i])
    }
}

/// L2-normalised TF-IDF vector of one item
#[derive(Debug, Clone, PartialEq)]
pub struct ContentVector {
    pub item_id: ItemId,
    /// (vocabulary index, weight), sorted by index
    pub weights: SparseRow,
}

impl ContentVector {
    pub fn norm(&self) -> f64 {
        self.weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }

    pub fn is_zero(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Vocabulary plus one vector per item, in catalog order
#[derive(Debug, Clone, Default)]
pub struct ContentModel {
    pub vocabulary: Vocabulary,
    pub vectors: Vec<ContentVector>,
}

impl ContentModel {
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// An empty model disables content scoring
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn item_ids(&self) -> Vec<ItemId> {
        self.vectors.iter().map(|v| v.item_id).collect()
    }

    pub fn rows(&self) -> Vec<SparseRow> {
        self.vectors.iter().map(|v| v.weights.clone()).collect()
    }
}

/// TF-IDF vectorizer
pub struct ContentVectorizer {
    config: VectorizerConfig,
    stop_words: HashSet<&'static str>,
}

impl ContentVectorizer {
    pub fn new(config: VectorizerConfig) -> Self {
        let stop_words = if config.stop_words {
            ENGLISH_STOP_WORDS.iter().copied().collect()
        } else {
            HashSet::new()
        };
        Self { config, stop_words }
    }

    /// Lowercased tokens of two or more word characters, stop-words removed
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|t| t.chars().count() >= 2)
            .map(str::to_lowercase)
            .filter(|t| !self.stop_words.contains(t.as_str()))
            .collect()
    }

    /// Every n-gram in the configured range
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let tokens = self.tokenize(text);
        let mut terms = Vec::new();
        for n in self.config.ngram_min..=self.config.ngram_max {
            if n == 1 {
                terms.extend(tokens.iter().cloned());
            } else if tokens.len() >= n {
                terms.extend(tokens.windows(n).map(|w| w.join(" ")));
            }
        }
        terms
    }

    /// Fit a vocabulary on the catalog and vectorize every item
    pub fn fit_transform(&self, items: &[ItemRecord]) -> ContentModel {
        if items.is_empty() {
            return ContentModel::default();
        }

        let documents: Vec<Vec<String>> = items.iter().map(|item| self.analyze(&item.text())).collect();

        // Corpus-wide term frequency decides which terms survive the cap
        let mut corpus_counts: HashMap<&str, usize> = HashMap::new();
        for doc in &documents {
            for term in doc {
                *corpus_counts.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = corpus_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(self.config.max_features);

        let mut terms: Vec<String> = ranked.into_iter().map(|(t, _)| t.to_string()).collect();
        terms.sort();
        let index: HashMap<String, usize> =
            terms.iter().enumerate().map(|(i, t)| (t.clone(), i)).collect();

        // Document frequency over the selected vocabulary
        let mut df = vec![0usize; terms.len()];
        let mut term_counts: Vec<HashMap<usize, f64>> = Vec::with_capacity(documents.len());
        for doc in &documents {
            let mut counts: HashMap<usize, f64> = HashMap::new();
            for term in doc {
                if let Some(&i) = index.get(term) {
                    *counts.entry(i).or_insert(0.0) += 1.0;
                }
            }
            for i in counts.keys() {
                df[*i] += 1;
            }
            term_counts.push(counts);
        }

        let n_docs = documents.len() as f64;
        let idf: Vec<f64> = df
            .iter()
            .map(|&d| ((1.0 + n_docs) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        let vectors: Vec<ContentVector> = items
            .iter()
            .zip(term_counts)
            .map(|(item, counts)| {
                let mut weights: SparseRow = counts.into_iter().map(|(i, tf)| (i, tf * idf[i])).collect();
                weights.sort_by_key(|(i, _)| *i);
                l2_normalize(&mut weights);
                ContentVector {
                    item_id: item.id,
                    weights,
                }
            })
            .collect();

        debug!(
            items = items.len(),
            vocabulary = terms.len(),
            "Content vectors built"
        );

        ContentModel {
            vocabulary: Vocabulary { terms, index, idf },
            vectors,
        }
    }
}

impl Default for ContentVectorizer {
    fn default() -> Self {
        Self::new(VectorizerConfig::default())
    }
}

fn l2_normalize(weights: &mut SparseRow) {
    let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for (_, w) in weights.iter_mut() {
            *w /= norm;
        }
    }
}
