// Módulos de la aplicación
mod analytics;
mod analyzer;
mod api;
mod app_state;
mod artifacts;
mod classifier;
mod config;
mod error;
mod features;
mod intake;
mod models;
mod sentiment;
mod storage;
mod training;

#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::analyzer::{ComplaintAnalyzer, ModelState};
use crate::classifier::Aspect;
use crate::app_state::AppState;
use crate::config::{AppConfig, StorageBackend};
use crate::sentiment::SentimentScorer;
use crate::storage::{ComplaintStore, JsonFileComplaintStore, MemoryComplaintStore};
use crate::training::{TrainOptions, DEFAULT_SEED, DEFAULT_TEST_SIZE};

#[derive(Parser)]
#[command(name = "complaint-analyzer")]
#[command(about = "Recepción y clasificación automática de quejas de estudiantes", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Arranca el servidor HTTP (comando por defecto)
    Serve,

    /// Entrena los cuatro modelos a partir de un CSV etiquetado
    Train {
        /// CSV con columnas complaint_text,category,priority,type,department
        #[arg(long)]
        data: PathBuf,

        /// CSV incremental con quejas confirmadas por usuarios
        #[arg(long)]
        extra: Option<PathBuf>,

        /// Directorio de salida de los artefactos
        #[arg(long, env = "MODELS_DIR", default_value = "models")]
        models_dir: PathBuf,

        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Fracción de filas reservada para evaluar
        #[arg(long, default_value_t = DEFAULT_TEST_SIZE)]
        test_size: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::Train {
            data,
            extra,
            models_dir,
            seed,
            test_size,
        } => {
            let options = TrainOptions {
                data,
                extra,
                models_dir,
                seed,
                test_size,
            };
            let report = tokio::task::spawn_blocking(move || training::run_training(&options))
                .await
                .context("La tarea de entrenamiento terminó de forma anómala")??;
            for aspect in &report.aspects {
                info!(
                    "{}: {} etiquetas, precisión {:.2}",
                    aspect.aspect,
                    aspect.labels.len(),
                    aspect.accuracy
                );
            }
            Ok(())
        }
    }
}

async fn serve() -> Result<()> {
    // 2. Cargar configuración
    let cfg = AppConfig::from_env().context("Error al cargar la configuración")?;

    // 3. Cargar modelos; si fallan, el servicio arranca degradado
    let models = ModelState::from_load_result(artifacts::load_inference_context(&cfg.models_dir));
    if let ModelState::Unavailable { reason } = &models {
        warn!("⚠️ Modelos no disponibles, el análisis devolverá 503: {}", reason);
    }

    // 4. Puntuador de sentimiento (léxico extra opcional)
    let sentiment = match &cfg.sentiment_lexicon {
        Some(path) => match SentimentScorer::with_lexicon_file(path) {
            Ok(scorer) => Some(scorer),
            Err(err) => {
                warn!("⚠️ Léxico de sentimiento no cargado, el análisis irá sin sentimiento: {}", err);
                None
            }
        },
        None => Some(SentimentScorer::new()),
    };

    if let Some(scorer) = &sentiment {
        info!("Léxico de sentimiento con {} entradas", scorer.lexicon_size());
    }

    let analyzer = Arc::new(ComplaintAnalyzer::new(
        models,
        sentiment,
        cfg.max_complaint_chars,
    ));
    info!("Longitud máxima de queja: {} caracteres", analyzer.max_chars());
    if let Some(context) = analyzer.context() {
        for aspect in Aspect::ALL {
            info!("Aspecto '{aspect}': {} etiquetas", context.labels(aspect).len());
        }
    }

    // 5. Almacenamiento de quejas
    let store: Arc<dyn ComplaintStore> = match cfg.storage_backend {
        StorageBackend::Json => Arc::new(
            JsonFileComplaintStore::open(&cfg.complaints_file)
                .await
                .with_context(|| {
                    format!("Error abriendo el almacén {}", cfg.complaints_file.display())
                })?,
        ),
        StorageBackend::Memory => {
            info!("Usando almacenamiento en memoria: las quejas no se conservarán");
            Arc::new(MemoryComplaintStore::new())
        }
    };

    // 6. Crear estado compartido de la aplicación
    let app_state = AppState {
        analyzer,
        store,
    };

    // 7. Configurar el router de la API y el servicio de ficheros estáticos
    let app = api::create_router(app_state)
        .fallback_service(ServeDir::new(&cfg.frontend_dir))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // 8. Iniciar el servidor
    let listener = tokio::net::TcpListener::bind(&cfg.server_addr)
        .await
        .with_context(|| format!("No se pudo escuchar en {}", cfg.server_addr))?;
    let server_url = format!("http://{}", cfg.server_addr);
    info!("🚀 Servidor escuchando en {}", &server_url);

    // Abrir el frontend en el navegador por defecto
    if cfg.open_browser && webbrowser::open(&server_url).is_err() {
        info!("No se pudo abrir el navegador. Por favor, accede a {} manualmente.", server_url);
    }

    // Configurar el apagado ordenado.
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await
        .context("Error en el servidor HTTP")?;

    info!("✅ Servidor cerrado correctamente.");
    Ok(())
}
