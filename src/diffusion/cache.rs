use super::pipeline::{Pipeline, PipelineLoader};
use crate::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Process-wide pipeline handle, constructed lazily on first use.
///
/// The loader runs at most once. A failed construction is remembered and
/// returned to every later caller instead of being retried.
pub struct PipelineCache {
    loader: Box<dyn PipelineLoader>,
    cell: OnceCell<std::result::Result<Arc<dyn Pipeline>, String>>,
    loads: AtomicUsize,
}

impl PipelineCache {
    pub fn new(loader: Box<dyn PipelineLoader>) -> Self {
        Self {
            loader,
            cell: OnceCell::new(),
            loads: AtomicUsize::new(0),
        }
    }

    pub async fn get(&self) -> Result<Arc<dyn Pipeline>> {
        let outcome = self
            .cell
            .get_or_init(|| async {
                self.loads.fetch_add(1, Ordering::SeqCst);
                self.loader.load().await.map_err(|e| match e {
                    Error::ModelLoad(message) => message,
                    other => other.to_string(),
                })
            })
            .await;

        match outcome {
            Ok(pipeline) => Ok(Arc::clone(pipeline)),
            Err(message) => Err(Error::ModelLoad(message.clone())),
        }
    }

    /// Number of construction attempts so far (0 or 1).
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.cell.get(), Some(Ok(_)))
    }
}
