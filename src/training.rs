//! Entrenamiento de los cuatro modelos a partir de un CSV de quejas etiquetadas.
//!
//! Flujo:
//!   1. Lectura del CSV base y, si existe, del CSV incremental de usuarios.
//!   2. Descarte de filas con alguna columna obligatoria vacía.
//!   3. Partición 80/20 con semilla fija, común a los cuatro aspectos.
//!   4. Ajuste del vocabulario sobre la partición de entrenamiento.
//!   5. Entrenamiento de cada aspecto con su suavizado y cálculo de la precisión.
//!   6. Escritura de artefactos e informe en el directorio de modelos.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analyzer::{AspectModels, InferenceContext};
use crate::artifacts;
use crate::classifier::{accuracy, Aspect, NaiveBayesModel};
use crate::features::{FeatureVector, Vocabulary};

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// Fila del CSV de entrenamiento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    pub complaint_text: String,
    pub category: String,
    pub priority: String,
    #[serde(rename = "type")]
    pub complaint_type: String,
    pub department: String,
}

impl TrainingRow {
    pub fn label(&self, aspect: Aspect) -> &str {
        match aspect {
            Aspect::Category => &self.category,
            Aspect::Priority => &self.priority,
            Aspect::Department => &self.department,
            Aspect::Type => &self.complaint_type,
        }
    }
}

/// Misma fila con todas las columnas opcionales, tal y como llega del CSV.
#[derive(Debug, Deserialize)]
struct RawRow {
    complaint_text: Option<String>,
    category: Option<String>,
    priority: Option<String>,
    #[serde(rename = "type")]
    complaint_type: Option<String>,
    department: Option<String>,
}

impl RawRow {
    fn into_row(self) -> Option<TrainingRow> {
        fn present(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        Some(TrainingRow {
            complaint_text: present(self.complaint_text)?,
            category: present(self.category)?,
            priority: present(self.priority)?,
            complaint_type: present(self.complaint_type)?,
            department: present(self.department)?,
        })
    }
}

/// Lee un CSV con cabecera `complaint_text,category,priority,type,department`.
pub fn load_rows(path: &Path) -> Result<Vec<TrainingRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("No se pudo abrir el CSV de entrenamiento {}", path.display()))?;

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for record in reader.deserialize::<RawRow>() {
        let raw = record.with_context(|| format!("Fila inválida en {}", path.display()))?;
        match raw.into_row() {
            Some(row) => rows.push(row),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!("{dropped} filas descartadas en {} por columnas vacías", path.display());
    }
    Ok(rows)
}

/// Índices de entrenamiento y de prueba tras un barajado con semilla.
pub fn split_indices(n: usize, test_size: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(0.0..1.0).contains(&test_size) {
        bail!("test_size debe estar en [0, 1) (recibido {test_size})");
    }
    if n < 2 {
        bail!("Se necesitan al menos 2 quejas etiquetadas para entrenar (hay {n})");
    }

    let test_count = (n as f64 * test_size).ceil() as usize;
    if test_count >= n {
        bail!("La partición de prueba dejaría vacío el conjunto de entrenamiento");
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(test_count);
    Ok((train, indices))
}

/// Ajusta vocabulario y modelos sobre todas las filas recibidas.
pub fn fit_context(rows: &[TrainingRow]) -> Result<InferenceContext> {
    let texts: Vec<&str> = rows.iter().map(|r| r.complaint_text.as_str()).collect();
    let vocabulary = Vocabulary::fit(&texts)?;
    let vectors: Vec<FeatureVector> = texts.iter().map(|t| vocabulary.transform(t)).collect();

    let fit = |aspect: Aspect| -> Result<NaiveBayesModel> {
        let labels: Vec<String> = rows.iter().map(|r| r.label(aspect).to_string()).collect();
        NaiveBayesModel::fit(aspect, aspect.default_smoothing(), &vocabulary, &vectors, &labels)
    };

    let models = AspectModels {
        category: fit(Aspect::Category)?,
        priority: fit(Aspect::Priority)?,
        department: fit(Aspect::Department)?,
        complaint_type: fit(Aspect::Type)?,
    };

    Ok(InferenceContext::from_trained(vocabulary, models)?)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AspectReport {
    pub aspect: Aspect,
    pub alpha: f64,
    pub labels: Vec<String>,
    pub accuracy: f64,
}

/// Informe de calidad del entrenamiento (se guarda junto a los modelos).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingReport {
    pub trained_at: DateTime<Utc>,
    pub seed: u64,
    pub test_size: f64,
    pub train_rows: usize,
    pub test_rows: usize,
    pub vocabulary_size: usize,
    pub vocabulary_fingerprint: String,
    pub aspects: Vec<AspectReport>,
}

pub struct TrainingOutcome {
    pub context: InferenceContext,
    pub report: TrainingReport,
}

pub fn train(rows: &[TrainingRow], test_size: f64, seed: u64) -> Result<TrainingOutcome> {
    let (train_idx, test_idx) = split_indices(rows.len(), test_size, seed)?;
    let train_rows: Vec<TrainingRow> = train_idx.iter().map(|&i| rows[i].clone()).collect();
    let test_rows: Vec<&TrainingRow> = test_idx.iter().map(|&i| &rows[i]).collect();

    let context = fit_context(&train_rows)?;

    let test_vectors: Vec<FeatureVector> = test_rows
        .iter()
        .map(|r| context.vocabulary().transform(&r.complaint_text))
        .collect();

    let aspects = Aspect::ALL
        .iter()
        .map(|&aspect| {
            let model = context.models().get(aspect);
            let labels: Vec<String> = test_rows.iter().map(|r| r.label(aspect).to_string()).collect();
            let acc = accuracy(model, &test_vectors, &labels);
            info!("Precisión del modelo '{aspect}': {acc:.2}");
            AspectReport {
                aspect,
                alpha: model.alpha(),
                labels: model.labels().to_vec(),
                accuracy: acc,
            }
        })
        .collect();

    let report = TrainingReport {
        trained_at: Utc::now(),
        seed,
        test_size,
        train_rows: train_rows.len(),
        test_rows: test_rows.len(),
        vocabulary_size: context.vocabulary().len(),
        vocabulary_fingerprint: context.vocabulary_fingerprint().to_string(),
        aspects,
    };

    Ok(TrainingOutcome { context, report })
}

/// Opciones del subcomando `train`.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub data: PathBuf,
    pub extra: Option<PathBuf>,
    pub models_dir: PathBuf,
    pub seed: u64,
    pub test_size: f64,
}

/// Entrena y escribe los artefactos en `models_dir`.
pub fn run_training(options: &TrainOptions) -> Result<TrainingReport> {
    info!("Cargando datos de entrenamiento desde {}...", options.data.display());
    let mut rows = load_rows(&options.data)?;

    if let Some(extra) = &options.extra {
        if extra.exists() {
            let extra_rows = load_rows(extra)?;
            info!("Datos incrementales de usuarios: {} filas", extra_rows.len());
            rows.extend(extra_rows);
        } else {
            info!("No hay datos incrementales en {}", extra.display());
        }
    }
    info!("Total de quejas en el conjunto de entrenamiento: {}", rows.len());

    let outcome = train(&rows, options.test_size, options.seed)?;

    artifacts::save_inference_context(&options.models_dir, &outcome.context)?;
    let report_path = options.models_dir.join(artifacts::REPORT_FILE);
    fs::write(&report_path, serde_json::to_vec_pretty(&outcome.report)?)
        .with_context(|| format!("No se pudo escribir {}", report_path.display()))?;

    info!(
        "✅ Los 4 modelos se guardaron en '{}'",
        options.models_dir.display()
    );
    Ok(outcome.report)
}
