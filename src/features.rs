//! Extracción de características: texto de la queja → vector TF-IDF disperso.
//!
//! El vocabulario se ajusta una sola vez durante el entrenamiento y queda
//! congelado; en inferencia sólo se llama a `transform`. Nunca se reajusta un
//! vocabulario en el camino de una petición.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::OnceLock;

use anyhow::{bail, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ModelLoadError;

/// Unigramas y bigramas.
pub const DEFAULT_NGRAM_RANGE: (usize, usize) = (1, 2);

/// Lista de stop words en inglés (la misma familia que usan NLTK/scikit-learn).
const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "an",
    "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere", "are",
    "around", "as", "at", "back", "be", "became", "because", "become", "becomes", "becoming",
    "been", "before", "beforehand", "behind", "being", "below", "beside", "besides", "between",
    "beyond", "both", "but", "by", "can", "cannot", "could", "did", "do", "does", "doing", "done",
    "down", "during", "each", "eg", "either", "else", "elsewhere", "enough", "etc", "even",
    "ever", "every", "everyone", "everything", "everywhere", "except", "few", "for", "former",
    "formerly", "from", "further", "had", "has", "have", "having", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hers", "herself", "him", "himself", "his", "how",
    "however", "ie", "if", "in", "indeed", "into", "is", "it", "its", "itself", "just", "keep",
    "last", "latter", "latterly", "least", "less", "made", "many", "may", "me", "meanwhile",
    "might", "mine", "more", "moreover", "most", "mostly", "much", "must", "my", "myself",
    "namely", "neither", "never", "nevertheless", "next", "no", "nobody", "none", "noone", "nor",
    "not", "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto",
    "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own", "per",
    "perhaps", "please", "rather", "re", "same", "seem", "seemed", "seeming", "seems", "several",
    "she", "should", "since", "so", "some", "somehow", "someone", "something", "sometime",
    "sometimes", "somewhere", "still", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "thence", "there", "thereafter", "thereby", "therefore", "therein",
    "thereupon", "these", "they", "this", "those", "though", "through", "throughout", "thru",
    "thus", "to", "together", "too", "toward", "towards", "under", "until", "up", "upon", "us",
    "very", "via", "was", "we", "well", "were", "what", "whatever", "when", "whence", "whenever",
    "where", "whereafter", "whereas", "whereby", "wherein", "whereupon", "wherever", "whether",
    "which", "while", "whither", "who", "whoever", "whole", "whom", "whose", "why", "will",
    "with", "within", "without", "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("patrón de tokens válido"))
}

fn stop_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| ENGLISH_STOP_WORDS.iter().copied().collect())
}

/// Minúsculas, tokens de al menos dos caracteres de palabra, sin stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let stop = stop_words();
    token_pattern()
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| !stop.contains(t))
        .map(str::to_string)
        .collect()
}

/// Términos (n-gramas unidos por un espacio) de un documento.
pub fn analyze_terms(text: &str, ngram_range: (usize, usize)) -> Vec<String> {
    let tokens = tokenize(text);
    let (min_n, max_n) = ngram_range;
    let mut terms = Vec::new();
    for n in min_n.max(1)..=max_n {
        for window in tokens.windows(n) {
            terms.push(window.join(" "));
        }
    }
    terms
}

/// Vector TF-IDF disperso, con índices ordenados y norma L2 igual a 1 (o vacío).
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    dimension: usize,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }
}

/// Vocabulario congelado: término → índice y su IDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    ngram_range: (usize, usize),
    document_count: usize,
    terms: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl Vocabulary {
    pub fn fit<S: AsRef<str>>(corpus: &[S]) -> Result<Self> {
        Self::fit_with_ngrams(corpus, DEFAULT_NGRAM_RANGE)
    }

    /// Ajusta el vocabulario sobre un corpus. Sólo se usa al entrenar.
    ///
    /// `idf(t) = ln((1 + n) / (1 + df(t))) + 1`; los términos se indexan en
    /// orden lexicográfico para que la serialización sea determinista.
    pub fn fit_with_ngrams<S: AsRef<str>>(corpus: &[S], ngram_range: (usize, usize)) -> Result<Self> {
        if corpus.is_empty() {
            bail!("No se puede ajustar un vocabulario sobre un corpus vacío");
        }
        if ngram_range.0 == 0 || ngram_range.0 > ngram_range.1 {
            bail!("Rango de n-gramas inválido: {:?}", ngram_range);
        }

        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();
        for doc in corpus {
            let unique: BTreeSet<String> = analyze_terms(doc.as_ref(), ngram_range).into_iter().collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        if doc_freq.is_empty() {
            bail!("El corpus no contiene ningún término útil tras eliminar stop words");
        }

        let n = corpus.len() as f64;
        let mut terms = BTreeMap::new();
        let mut idf = Vec::with_capacity(doc_freq.len());
        for (index, (term, df)) in doc_freq.into_iter().enumerate() {
            idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
            terms.insert(term, index);
        }

        Ok(Self {
            ngram_range,
            document_count: corpus.len(),
            terms,
            idf,
        })
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains_key(term)
    }

    pub fn transform(&self, text: &str) -> FeatureVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in analyze_terms(text, self.ngram_range) {
            if let Some(&index) = self.terms.get(&term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let (indices, mut values): (Vec<usize>, Vec<f64>) = counts
            .into_iter()
            .map(|(index, count)| (index, count * self.idf[index]))
            .unzip();

        let norm = values.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in &mut values {
                *v /= norm;
            }
        }

        FeatureVector {
            dimension: self.len(),
            indices,
            values,
        }
    }

    /// Codificación JSON canónica. Es exactamente lo que se escribe a disco.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        Ok(fingerprint_bytes(&self.canonical_bytes()?))
    }

    /// Comprueba la coherencia interna de un vocabulario recién deserializado.
    pub fn validate(&self) -> Result<(), ModelLoadError> {
        if self.is_empty() {
            return Err(ModelLoadError::Invalid("vocabulario vacío".into()));
        }
        if self.idf.len() != self.terms.len() {
            return Err(ModelLoadError::Invalid(format!(
                "el vocabulario tiene {} términos pero {} valores IDF",
                self.terms.len(),
                self.idf.len()
            )));
        }
        let mut seen = vec![false; self.idf.len()];
        for &index in self.terms.values() {
            match seen.get_mut(index) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(ModelLoadError::Invalid(format!(
                        "índice de término {index} duplicado o fuera de rango"
                    )))
                }
            }
        }
        if self.idf.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(ModelLoadError::Invalid("valor IDF no válido".into()));
        }
        Ok(())
    }
}

/// SHA-256 en hexadecimal.
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
