//! Carga y gestión de configuración de la aplicación (modelos + almacenamiento).

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use crate::analyzer::DEFAULT_MAX_COMPLAINT_CHARS;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Json,
    Memory,
}

impl StorageBackend {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow!("Backend de almacenamiento no soportado: {other}")),
        }
    }
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,
    pub models_dir: PathBuf,
    pub storage_backend: StorageBackend,
    pub complaints_file: PathBuf,
    pub frontend_dir: PathBuf,
    pub max_complaint_chars: usize,
    pub sentiment_lexicon: Option<PathBuf>,
    pub open_browser: bool,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env`, con una fuente de variables arbitraria.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server_addr = var("SERVER_ADDR").unwrap_or_else(|| "127.0.0.1:5001".to_string());
        let models_dir = var("MODELS_DIR").map_or_else(|| PathBuf::from("models"), PathBuf::from);

        let storage_backend_str = var("STORAGE_BACKEND").unwrap_or_else(|| "json".to_string());
        let storage_backend = StorageBackend::from_str(&storage_backend_str)?;

        let complaints_file = var("COMPLAINTS_FILE")
            .map_or_else(|| PathBuf::from("data/complaints.json"), PathBuf::from);
        let frontend_dir =
            var("FRONTEND_DIR").map_or_else(|| PathBuf::from("frontend"), PathBuf::from);

        let max_complaint_chars = match var("MAX_COMPLAINT_CHARS") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("MAX_COMPLAINT_CHARS inválido: {raw}"))?,
            None => DEFAULT_MAX_COMPLAINT_CHARS,
        };
        if max_complaint_chars == 0 {
            return Err(anyhow!("MAX_COMPLAINT_CHARS debe ser mayor que cero"));
        }

        let sentiment_lexicon = var("SENTIMENT_LEXICON").map(PathBuf::from);

        let open_browser = match var("OPEN_BROWSER") {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| anyhow!("OPEN_BROWSER inválido: {raw} (usa true/false)"))?,
            None => false,
        };

        Ok(Self {
            server_addr,
            models_dir,
            storage_backend,
            complaints_file,
            frontend_dir,
            max_complaint_chars,
            sentiment_lexicon,
            open_browser,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
