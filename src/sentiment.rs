//! Puntuación de sentimiento basada en léxico y reglas.
//!
//! No depende de los modelos entrenados: si éstos no están cargados el
//! sentimiento se sigue calculando. La puntuación compuesta está en [-1, 1].

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::SentimentError;
use crate::models::SentimentLabel;

const NEGATION_SCALAR: f64 = -0.74;
const BOOSTER_INCREMENT: f64 = 0.293;
const EXCLAMATION_INCREMENT: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;
const NORMALIZATION_ALPHA: f64 = 15.0;

/// Léxico base (token, valencia en [-4, 4]).
const BASE_LEXICON: &[(&str, f64)] = &[
    // positivas
    ("love", 3.2), ("loved", 2.9), ("great", 3.1), ("good", 1.9), ("excellent", 2.7),
    ("amazing", 2.8), ("awesome", 3.1), ("best", 3.2), ("wonderful", 2.7), ("fantastic", 2.6),
    ("happy", 2.7), ("glad", 2.0), ("nice", 1.8), ("helpful", 1.7), ("thanks", 1.9),
    ("thank", 1.5), ("appreciate", 1.7), ("appreciated", 2.3), ("clean", 1.7), ("fast", 1.3),
    ("friendly", 2.2), ("satisfied", 1.8), ("pleased", 1.9), ("resolved", 0.7), ("fixed", 0.8),
    ("working", 0.4), ("like", 1.5), ("enjoy", 2.2), ("perfect", 2.7), ("comfortable", 1.6),
    ("safe", 1.9), ("fine", 0.8), ("well", 1.1), ("improve", 1.9), ("improved", 2.1),
    ("support", 1.7), ("kind", 2.4), ("polite", 1.8), ("quick", 1.1), ("useful", 1.9),
    // negativas
    ("terrible", -2.1), ("broken", -1.5), ("bad", -2.5), ("worst", -3.1), ("awful", -2.0),
    ("hate", -2.7), ("horrible", -2.5), ("poor", -2.1), ("dirty", -1.9), ("unfair", -2.1),
    ("angry", -2.3), ("frustrated", -2.0), ("frustrating", -1.9), ("disappointed", -1.9),
    ("disappointing", -2.2), ("problem", -1.7), ("problems", -1.7), ("fail", -2.5),
    ("failed", -2.3), ("fails", -1.8), ("failure", -2.3), ("useless", -1.8), ("rude", -2.0),
    ("unsafe", -2.2), ("dangerous", -2.1), ("slow", -1.0), ("delay", -1.3), ("delayed", -0.9),
    ("noisy", -0.7), ("smelly", -1.4), ("leaking", -1.1), ("damaged", -1.9), ("crash", -1.7),
    ("crashed", -1.7), ("crashes", -1.5), ("error", -1.5), ("errors", -1.4), ("annoying", -1.7),
    ("ignored", -1.4), ("unacceptable", -2.0), ("harassment", -2.9), ("stolen", -2.2),
    ("sick", -1.7), ("pain", -2.3), ("worse", -2.1), ("hard", -0.4), ("difficult", -1.5),
    ("waste", -1.8), ("wasted", -2.2), ("missing", -1.2), ("lost", -1.3), ("stuck", -1.3),
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nobody", "nothing", "neither", "nor", "nowhere", "cannot",
    "without", "hardly", "dont", "doesnt", "didnt", "isnt", "wasnt", "arent", "cant", "wont",
];

const BOOSTERS: &[&str] = &[
    "very", "really", "extremely", "so", "too", "absolutely", "completely", "totally",
    "incredibly", "highly", "especially", "super",
];

const DAMPENERS: &[&str] = &[
    "slightly", "somewhat", "barely", "kinda", "sortof", "little", "marginally", "partly",
];

/// Puntuador léxico. Inmutable una vez construido.
#[derive(Debug, Clone)]
pub struct SentimentScorer {
    lexicon: HashMap<String, f64>,
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer {
    /// Scorer con el léxico incorporado.
    pub fn new() -> Self {
        let lexicon = BASE_LEXICON
            .iter()
            .map(|(word, valence)| (word.to_string(), *valence))
            .collect();
        Self { lexicon }
    }

    /// Léxico incorporado más las entradas de un fichero `token<TAB>valencia`.
    /// Las líneas vacías y las que empiezan por `#` se ignoran; las entradas del
    /// fichero sobrescriben las incorporadas.
    pub fn with_lexicon_file(path: &Path) -> Result<Self, SentimentError> {
        let content = fs::read_to_string(path).map_err(|source| SentimentError::LexiconIo {
            path: path.to_path_buf(),
            source,
        })?;

        let mut scorer = Self::new();
        let mut added = 0usize;
        for (number, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut parts = trimmed.split('\t');
            let token = parts.next().map(str::trim).filter(|t| !t.is_empty());
            let valence = parts.next().and_then(|v| v.trim().parse::<f64>().ok());
            match (token, valence) {
                (Some(token), Some(valence)) if valence.is_finite() => {
                    scorer.lexicon.insert(token.to_lowercase(), valence);
                    added += 1;
                }
                _ => {
                    return Err(SentimentError::LexiconFormat {
                        line: number + 1,
                        content: line.to_string(),
                    })
                }
            }
        }

        info!("Léxico de sentimiento ampliado con {added} entradas desde {}", path.display());
        Ok(scorer)
    }

    pub fn lexicon_size(&self) -> usize {
        self.lexicon.len()
    }

    /// Puntuación compuesta en [-1, 1].
    pub fn score(&self, text: &str) -> Result<f64, SentimentError> {
        let tokens = sentiment_tokens(text);
        let but_position = tokens.iter().position(|t| t == "but");

        let mut total = 0.0;
        for (i, token) in tokens.iter().enumerate() {
            let Some(&base) = self.lexicon.get(token.as_str()) else {
                continue;
            };
            let mut valence = base;

            if let Some(previous) = i.checked_sub(1).map(|p| tokens[p].as_str()) {
                let shift = if BOOSTERS.contains(&previous) {
                    BOOSTER_INCREMENT
                } else if DAMPENERS.contains(&previous) {
                    -BOOSTER_INCREMENT
                } else {
                    0.0
                };
                valence += shift * valence.signum();
            }

            let window_start = i.saturating_sub(3);
            if tokens[window_start..i].iter().any(|t| is_negation(t)) {
                valence *= NEGATION_SCALAR;
            }

            if let Some(but) = but_position {
                if i < but {
                    valence *= 0.5;
                } else if i > but {
                    valence *= 1.5;
                }
            }

            total += valence;
        }

        if total != 0.0 {
            let exclamations = text.matches('!').count().min(MAX_EXCLAMATIONS) as f64;
            total += exclamations * EXCLAMATION_INCREMENT * total.signum();
        }

        let compound = total / (total * total + NORMALIZATION_ALPHA).sqrt();
        if !compound.is_finite() {
            return Err(SentimentError::NonFinite);
        }
        Ok(compound.clamp(-1.0, 1.0))
    }

    #[cfg(test)]
    pub fn label(&self, text: &str) -> Result<SentimentLabel, SentimentError> {
        self.score(text).map(SentimentLabel::from_compound)
    }
}

/// Tokens en minúsculas sin puntuación en los extremos. Se conservan los
/// apóstrofos internos ("it's", "don't").
fn sentiment_tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|raw| {
            raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .trim_matches('\'')
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

fn is_negation(token: &str) -> bool {
    NEGATIONS.contains(&token) || token.ends_with("n't")
}
