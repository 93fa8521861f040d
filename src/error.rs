//! Tipos de error del dominio (análisis, carga de modelos, sentimiento y almacenamiento).
//!
//! Los errores del arranque y de la CLI siguen usando `anyhow`; aquí sólo viven
//! los errores que el resto del código necesita distinguir por variante.

use std::path::PathBuf;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::AnalysisResult;

/// Fallos de `ComplaintAnalyzer::analyze`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("El texto de la queja no puede estar vacío")]
    EmptyInput,

    #[error("El texto de la queja supera el máximo de {max} caracteres (recibidos {actual})")]
    InputTooLong { max: usize, actual: usize },

    /// Los modelos no se cargaron al arrancar. No se arregla reintentando.
    #[error("Modelos de clasificación no disponibles: {0}")]
    ModelsUnavailable(String),

    #[error("Error inesperado durante el análisis: {0}")]
    Unexpected(String),
}

/// Fallos al cargar (o validar) los artefactos de modelo desde disco.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("No se encontró el artefacto de modelo: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("Error de E/S leyendo {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Artefacto corrupto en {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("El modelo '{aspect}' se entrenó con otro vocabulario (esperado {expected}, encontrado {found})")]
    VocabularyMismatch {
        aspect: String,
        expected: String,
        found: String,
    },

    #[error("Modelo inválido: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("No se pudo leer el léxico de sentimiento {}: {source}", path.display())]
    LexiconIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Línea {line} inválida en el léxico de sentimiento: '{content}'")]
    LexiconFormat { line: usize, content: String },

    #[error("Puntuación de sentimiento no finita")]
    NonFinite,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Queja no encontrada: {0}")]
    NotFound(String),

    #[error("Error de E/S en el almacenamiento: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error de serialización en el almacenamiento: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(test)]
    #[error("{0}")]
    Other(String),
}

/// Resultado de registrar una queja cuando algo falla por el camino.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// El análisis terminó bien pero la queja no llegó a guardarse.
    #[error("Queja analizada pero no guardada: {source}")]
    NotSaved {
        analysis: Option<AnalysisResult>,
        #[source]
        source: StorageError,
    },
}

/// Prefijo hexadecimal del SHA-256 del texto, para trazas sin filtrar el contenido.
pub fn text_fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    format!("{:x}", digest)[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_short() {
        let a = text_fingerprint("la wifi no funciona");
        let b = text_fingerprint("la wifi no funciona");
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
        assert_ne!(a, text_fingerprint("otra queja"));
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = AnalysisError::InputTooLong { max: 10, actual: 42 };
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains("42"));

        let err = StorageError::NotFound("abc".into());
        assert_eq!(err.to_string(), "Queja no encontrada: abc");
    }
}
