//! Alta de quejas: análisis automático de los campos que falten y persistencia.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analyzer::{analyze_blocking, ComplaintAnalyzer};
use crate::error::{text_fingerprint, AnalysisError, StorageError, SubmitError};
use crate::models::{AnalysisResult, Complaint, ComplaintStatus, NewComplaint};
use crate::storage::ComplaintStore;

const TITLE_MAX_CHARS: usize = 60;

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Título por defecto: el principio de la descripción.
fn default_title(description: &str) -> String {
    let mut title: String = description.chars().take(TITLE_MAX_CHARS).collect();
    if description.chars().count() > TITLE_MAX_CHARS {
        title = title.trim_end().to_string();
        title.push_str("...");
    }
    title
}

/// Analiza (si hace falta) y guarda una queja nueva.
///
/// Los campos enviados por el usuario tienen prioridad sobre los predichos.
/// Sin modelos cargados la queja se guarda igualmente con `aiAnalyzed = false`.
pub async fn submit_complaint(
    analyzer: &Arc<ComplaintAnalyzer>,
    store: &dyn ComplaintStore,
    submission: NewComplaint,
) -> Result<Complaint, SubmitError> {
    // El límite de longitud se aplica aunque no haga falta analizar.
    let description = analyzer.validate_text(&submission.description)?.to_string();

    let analysis = if submission.needs_analysis() {
        match analyze_blocking(Arc::clone(analyzer), description.clone()).await {
            Ok(result) => Some(result),
            Err(AnalysisError::ModelsUnavailable(reason)) => {
                warn!(
                    "Queja {} guardada sin análisis automático: {}",
                    text_fingerprint(&description),
                    reason
                );
                None
            }
            Err(err) => return Err(err.into()),
        }
    } else {
        None
    };

    let complaint = build_complaint(submission, description, analysis.as_ref());

    if let Err(source) = store.insert(&complaint).await {
        return Err(SubmitError::NotSaved { analysis, source });
    }

    info!(
        "Queja {} registrada (analizada automáticamente: {})",
        complaint.id, complaint.ai_analyzed
    );
    Ok(complaint)
}

fn build_complaint(
    submission: NewComplaint,
    description: String,
    analysis: Option<&AnalysisResult>,
) -> Complaint {
    let title = present(submission.title).unwrap_or_else(|| default_title(&description));
    let mut category = present(submission.category);
    let mut priority = present(submission.priority);
    let mut department = present(submission.department);
    let mut complaint_type = present(submission.complaint_type);

    if let Some(result) = analysis {
        category.get_or_insert_with(|| result.category.clone());
        priority.get_or_insert_with(|| result.priority.clone());
        department.get_or_insert_with(|| result.department.clone());
        complaint_type.get_or_insert_with(|| result.complaint_type.to_string());
    }

    Complaint {
        id: Uuid::new_v4().to_string(),
        title,
        description,
        category,
        department,
        priority,
        complaint_type,
        contact_info: present(submission.contact_info),
        user_type: present(submission.user_type),
        status: ComplaintStatus::Pending,
        created_at: Utc::now(),
        updated_at: None,
        ai_analyzed: analysis.is_some(),
        ai_confidence: analysis.map(|r| r.confidence),
        sentiment: analysis.and_then(|r| r.sentiment),
    }
}

/// Cualquier transición de estado es válida.
pub async fn update_status(
    store: &dyn ComplaintStore,
    id: &str,
    status: ComplaintStatus,
) -> Result<Complaint, StorageError> {
    let complaint = store.update_status(id, status).await?;
    info!("Queja {id} pasa a estado '{status}'");
    Ok(complaint)
}
