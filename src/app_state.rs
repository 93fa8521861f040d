use std::sync::Arc;

use crate::{analyzer::ComplaintAnalyzer, storage::ComplaintStore};

/// Estado compartido por todos los handlers.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<ComplaintAnalyzer>,
    pub store: Arc<dyn ComplaintStore>,
}
