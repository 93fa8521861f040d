//! Artefactos de modelo en disco: vocabulario congelado + un fichero por aspecto.
//!
//! API pública:
//!   - `load_inference_context(&Path)`: se llama una vez al arrancar.
//!   - `save_inference_context(&Path, &InferenceContext)`: lo usa el entrenamiento.
//!
//! La huella del vocabulario se calcula sobre los bytes exactos del fichero,
//! de modo que un modelo sólo se acepta si se entrenó con ese mismo fichero.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::analyzer::{AspectModels, InferenceContext};
use crate::classifier::{Aspect, NaiveBayesModel};
use crate::error::ModelLoadError;
use crate::features::{fingerprint_bytes, Vocabulary};

pub const VOCABULARY_FILE: &str = "vocabulary.json";
pub const REPORT_FILE: &str = "training_report.json";

fn read_artifact(path: &Path) -> Result<Vec<u8>, ModelLoadError> {
    if !path.exists() {
        return Err(ModelLoadError::MissingArtifact(path.to_path_buf()));
    }
    fs::read(path).map_err(|source| ModelLoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_artifact<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, ModelLoadError> {
    serde_json::from_slice(bytes).map_err(|source| ModelLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn load_model(dir: &Path, aspect: Aspect) -> Result<NaiveBayesModel, ModelLoadError> {
    let path = dir.join(aspect.artifact_file());
    let bytes = read_artifact(&path)?;
    let model = parse_artifact(&path, &bytes)?;
    info!("Modelo '{aspect}' cargado");
    Ok(model)
}

/// Carga el vocabulario y los cuatro modelos, validando que encajan entre sí.
pub fn load_inference_context(dir: &Path) -> Result<InferenceContext, ModelLoadError> {
    info!("Cargando modelos desde {}...", dir.display());

    let vocabulary_path = dir.join(VOCABULARY_FILE);
    let vocabulary_bytes = read_artifact(&vocabulary_path)?;
    let fingerprint = fingerprint_bytes(&vocabulary_bytes);
    let vocabulary: Vocabulary = parse_artifact(&vocabulary_path, &vocabulary_bytes)?;

    let models = AspectModels {
        category: load_model(dir, Aspect::Category)?,
        priority: load_model(dir, Aspect::Priority)?,
        department: load_model(dir, Aspect::Department)?,
        complaint_type: load_model(dir, Aspect::Type)?,
    };

    let context = InferenceContext::new(vocabulary, fingerprint, models)?;
    info!(
        "Vocabulario de {} términos (huella {}) y 4 modelos cargados correctamente",
        context.vocabulary().len(),
        &context.vocabulary_fingerprint()[..12]
    );
    Ok(context)
}

/// Escribe el vocabulario con su codificación canónica y un JSON por aspecto.
pub fn save_inference_context(dir: &Path, context: &InferenceContext) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("No se pudo crear el directorio de modelos {}", dir.display()))?;

    let vocabulary_path = dir.join(VOCABULARY_FILE);
    fs::write(&vocabulary_path, context.vocabulary().canonical_bytes()?)
        .with_context(|| format!("No se pudo escribir {}", vocabulary_path.display()))?;

    for aspect in Aspect::ALL {
        let path = dir.join(aspect.artifact_file());
        let model = context.models().get(aspect);
        fs::write(&path, serde_json::to_vec_pretty(model)?)
            .with_context(|| format!("No se pudo escribir {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture_context;

    #[test]
    fn save_then_load_preserves_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let context = fixture_context();
        save_inference_context(dir.path(), &context).unwrap();

        let loaded = load_inference_context(dir.path()).unwrap();
        assert_eq!(loaded.vocabulary_fingerprint(), context.vocabulary_fingerprint());
        assert_eq!(loaded.vocabulary(), context.vocabulary());

        let text = "Internet connection in the hostel is down";
        let original = context.models().department.predict(&context.vocabulary().transform(text));
        let reloaded = loaded.models().department.predict(&loaded.vocabulary().transform(text));
        assert_eq!(original.unwrap(), reloaded.unwrap());
    }

    #[test]
    fn missing_artifact_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        save_inference_context(dir.path(), &fixture_context()).unwrap();
        fs::remove_file(dir.path().join("priority_model.json")).unwrap();

        let err = load_inference_context(dir.path()).unwrap_err();
        match err {
            ModelLoadError::MissingArtifact(path) => assert!(path.ends_with("priority_model.json")),
            other => panic!("error inesperado: {other}"),
        }
    }

    #[test]
    fn edited_vocabulary_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        save_inference_context(dir.path(), &fixture_context()).unwrap();

        // Reescribir el mismo vocabulario en formato "bonito" cambia los bytes.
        let path = dir.path().join(VOCABULARY_FILE);
        let vocabulary: Vocabulary = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        fs::write(&path, serde_json::to_vec_pretty(&vocabulary).unwrap()).unwrap();

        let err = load_inference_context(dir.path()).unwrap_err();
        assert!(matches!(err, ModelLoadError::VocabularyMismatch { .. }));
    }

    #[test]
    fn corrupt_model_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        save_inference_context(dir.path(), &fixture_context()).unwrap();
        fs::write(dir.path().join("type_model.json"), b"{ no es json").unwrap();

        let err = load_inference_context(dir.path()).unwrap_err();
        assert!(matches!(err, ModelLoadError::Parse { .. }));
    }

    #[test]
    fn empty_directory_reports_missing_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_inference_context(dir.path()).unwrap_err();
        assert!(matches!(err, ModelLoadError::MissingArtifact(_)));
    }
}
