//! Clasificadores por aspecto: naive Bayes multinomial sobre vectores TF-IDF.
//!
//! Hay cuatro aspectos independientes (categoría, prioridad, departamento y
//! tipo). Todos consumen el mismo `FeatureVector`; cada uno tiene su propio
//! conjunto cerrado de etiquetas y su propio suavizado aditivo.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, ModelLoadError};
use crate::features::{FeatureVector, Vocabulary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aspect {
    Category,
    Priority,
    Department,
    Type,
}

impl Aspect {
    pub const ALL: [Aspect; 4] = [
        Aspect::Category,
        Aspect::Priority,
        Aspect::Department,
        Aspect::Type,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Aspect::Category => "category",
            Aspect::Priority => "priority",
            Aspect::Department => "department",
            Aspect::Type => "type",
        }
    }

    /// Categoría y departamento tienen más clases y necesitan menos
    /// regularización; prioridad y tipo están más desbalanceados.
    pub fn default_smoothing(&self) -> f64 {
        match self {
            Aspect::Category | Aspect::Department => 0.1,
            Aspect::Priority | Aspect::Type => 0.5,
        }
    }

    /// Nombre del fichero del artefacto, p. ej. `category_model.json`.
    pub fn artifact_file(&self) -> String {
        format!("{}_model.json", self.name())
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Etiqueta ganadora y distribución completa de probabilidades.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub probabilities: BTreeMap<String, f64>,
}

impl Prediction {
    pub fn max_probability(&self) -> f64 {
        self.probabilities
            .values()
            .copied()
            .fold(0.0_f64, f64::max)
    }
}

/// Naive Bayes multinomial entrenado para un aspecto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaiveBayesModel {
    aspect: Aspect,
    alpha: f64,
    /// Huella SHA-256 del vocabulario con el que se entrenó.
    vocabulary_fingerprint: String,
    labels: Vec<String>,
    class_log_prior: Vec<f64>,
    /// `[clase][característica]`
    feature_log_prob: Vec<Vec<f64>>,
}

impl NaiveBayesModel {
    pub fn fit(
        aspect: Aspect,
        alpha: f64,
        vocabulary: &Vocabulary,
        vectors: &[FeatureVector],
        labels: &[String],
    ) -> Result<Self> {
        if vectors.is_empty() {
            bail!("No hay ejemplos para entrenar el modelo '{aspect}'");
        }
        if vectors.len() != labels.len() {
            bail!(
                "Modelo '{aspect}': {} vectores pero {} etiquetas",
                vectors.len(),
                labels.len()
            );
        }
        if !(alpha > 0.0 && alpha.is_finite()) {
            bail!("El suavizado debe ser positivo (recibido {alpha})");
        }

        let n_features = vocabulary.len();
        let mut class_labels: Vec<String> = labels.to_vec();
        class_labels.sort();
        class_labels.dedup();
        let class_index: BTreeMap<&str, usize> = class_labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.as_str(), i))
            .collect();

        let mut class_count = vec![0usize; class_labels.len()];
        let mut feature_count = vec![vec![0.0_f64; n_features]; class_labels.len()];

        for (vector, label) in vectors.iter().zip(labels) {
            if vector.dimension() != n_features {
                bail!(
                    "Vector de dimensión {} incompatible con el vocabulario ({n_features})",
                    vector.dimension()
                );
            }
            let c = class_index[label.as_str()];
            class_count[c] += 1;
            for (j, value) in vector.iter() {
                feature_count[c][j] += value;
            }
        }

        let total = vectors.len() as f64;
        let class_log_prior = class_count
            .iter()
            .map(|&count| (count as f64 / total).ln())
            .collect();

        let feature_log_prob = feature_count
            .into_iter()
            .map(|row| {
                let denominator = (row.iter().sum::<f64>() + alpha * n_features as f64).ln();
                row.into_iter()
                    .map(|count| (count + alpha).ln() - denominator)
                    .collect()
            })
            .collect();

        Ok(Self {
            aspect,
            alpha,
            vocabulary_fingerprint: vocabulary.fingerprint()?,
            labels: class_labels,
            class_log_prior,
            feature_log_prob,
        })
    }

    pub fn aspect(&self) -> Aspect {
        self.aspect
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn vocabulary_fingerprint(&self) -> &str {
        &self.vocabulary_fingerprint
    }

    pub fn n_features(&self) -> usize {
        self.feature_log_prob.first().map_or(0, Vec::len)
    }

    /// Etiqueta más probable y distribución normalizada (softmax de la
    /// log-verosimilitud conjunta). En caso de empate gana la primera etiqueta.
    pub fn predict(&self, vector: &FeatureVector) -> Result<Prediction, AnalysisError> {
        if vector.dimension() != self.n_features() {
            return Err(AnalysisError::Unexpected(format!(
                "el modelo '{}' espera {} características y recibió {}",
                self.aspect,
                self.n_features(),
                vector.dimension()
            )));
        }

        let joint: Vec<f64> = self
            .class_log_prior
            .iter()
            .zip(&self.feature_log_prob)
            .map(|(prior, row)| prior + vector.iter().map(|(j, x)| x * row[j]).sum::<f64>())
            .collect();

        let max = joint.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return Err(AnalysisError::Unexpected(format!(
                "log-verosimilitud no finita en el modelo '{}'",
                self.aspect
            )));
        }
        let exps: Vec<f64> = joint.iter().map(|j| (j - max).exp()).collect();
        let sum: f64 = exps.iter().sum();

        let mut best = 0;
        for (i, value) in exps.iter().enumerate() {
            if *value > exps[best] {
                best = i;
            }
        }

        let probabilities = self
            .labels
            .iter()
            .cloned()
            .zip(exps.iter().map(|e| e / sum))
            .collect();

        Ok(Prediction {
            label: self.labels[best].clone(),
            probabilities,
        })
    }

    pub fn validate(&self) -> Result<(), ModelLoadError> {
        let invalid = |msg: String| Err(ModelLoadError::Invalid(format!("modelo '{}': {msg}", self.aspect)));

        if self.labels.is_empty() {
            return invalid("sin etiquetas".into());
        }
        if self.class_log_prior.len() != self.labels.len()
            || self.feature_log_prob.len() != self.labels.len()
        {
            return invalid("número de clases inconsistente".into());
        }
        let n_features = self.n_features();
        if n_features == 0 || self.feature_log_prob.iter().any(|row| row.len() != n_features) {
            return invalid("matriz de características irregular".into());
        }
        let all_finite = self.class_log_prior.iter().all(|v| v.is_finite())
            && self.feature_log_prob.iter().flatten().all(|v| v.is_finite());
        if !all_finite {
            return invalid("parámetros no finitos".into());
        }
        Ok(())
    }
}

/// Proporción de aciertos sobre un conjunto etiquetado.
pub fn accuracy(model: &NaiveBayesModel, vectors: &[FeatureVector], labels: &[String]) -> f64 {
    if vectors.is_empty() {
        return 0.0;
    }
    let hits = vectors
        .iter()
        .zip(labels)
        .filter(|(v, l)| model.predict(v).map(|p| &p.label == *l).unwrap_or(false))
        .count();
    hits as f64 / vectors.len() as f64
}
