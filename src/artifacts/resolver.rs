//! Artifact location resolution
//!
//! Computes the (container, path) pair of a run artifact. Resolution order:
//!
//! 1. Container recorded and folder-style path: list the folder and take the
//!    first blob whose file name matches the kind's pattern, else the kind's
//!    fallback file in that folder.
//! 2. Container recorded and direct path: the path itself when the kind accepts
//!    direct paths and it is non-empty, else the default per-run path.
//! 3. No container (legacy run): whitespace-stripped agent id as container and
//!    the default per-run path.

use super::naming::legacy_container_name;
use super::{ArtifactKind, ArtifactReference};
use crate::models::EvalRun;
use crate::storage::{BlobStore, StorageResult};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct ArtifactLocationResolver {
    blobs: Arc<dyn BlobStore>,
}

impl std::fmt::Debug for ArtifactLocationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactLocationResolver").finish_non_exhaustive()
    }
}

impl ArtifactLocationResolver {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Resolve where `kind` lives for `run`. Performs at most one listing call.
    pub async fn resolve(
        &self,
        run: &EvalRun,
        kind: ArtifactKind,
    ) -> StorageResult<ArtifactReference> {
        let container = run
            .container_name
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let reference = match (container, run.blob_file_path.as_deref()) {
            (Some(container), Some(folder)) if run.blob_path_is_folder() => {
                let listed = self.blobs.list(container, folder).await?;
                let blob_path = listed
                    .into_iter()
                    .find(|path| kind.matches(file_name(path)))
                    .unwrap_or_else(|| format!("{folder}{}", kind.fallback_file()));
                ArtifactReference::new(container, blob_path)
            }
            (Some(container), Some(path)) if kind.accepts_direct_path() && !path.trim().is_empty() => {
                ArtifactReference::new(container, path)
            }
            (Some(container), _) => {
                ArtifactReference::new(container, kind.default_path(run.eval_run_id))
            }
            (None, _) => ArtifactReference::new(
                legacy_container_name(&run.agent_id),
                kind.default_path(run.eval_run_id),
            ),
        };

        debug!(
            eval_run_id = %run.eval_run_id,
            kind = %kind,
            container = %reference.container_name,
            blob_path = %reference.blob_path,
            "Resolved artifact location"
        );
        Ok(reference)
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
