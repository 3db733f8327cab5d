// src/assignment/mod.rs

// Persistence contract for assignment snapshots and target status

pub mod postgres;
pub mod submitter;

use async_trait::async_trait;
use log::{error, warn};

use crate::error::{DispatchError, Result};
use crate::models::{AssignmentSnapshot, AssignmentStatus, ResponderKind, Target, TargetRecord};

pub use postgres::PgAssignmentStore;
pub use submitter::AssignmentSubmitter;

/// A status change that must land together with a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub from: AssignmentStatus,
    pub to: AssignmentStatus,
}

/// Storage for disasters and reports.
///
/// `set_status` and `assign` must be safe to repeat with the same payload.
/// Failures are reported as [`DispatchError::PersistenceFailure`], or
/// [`DispatchError::TargetNotFound`] when the target does not exist.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn load_target(&self, target: &Target) -> Result<TargetRecord>;

    /// The snapshot currently attached for `kind`, if any
    async fn load_snapshot(
        &self,
        target: &Target,
        kind: ResponderKind,
    ) -> Result<Option<AssignmentSnapshot>>;

    async fn set_status(&self, target: &Target, status: AssignmentStatus) -> Result<()>;

    /// Replaces the stored snapshot for `snapshot.responder_kind` wholesale
    async fn assign(&self, target: &Target, snapshot: &AssignmentSnapshot) -> Result<()>;

    /// Applies an optional status transition and the snapshot as one unit.
    ///
    /// The default writes the status first, then the snapshot. If the
    /// snapshot write fails the previous status is restored on a best-effort
    /// basis and the snapshot error is returned. Stores with transactions
    /// should override this.
    async fn commit_assignment(
        &self,
        target: &Target,
        transition: Option<StatusTransition>,
        snapshot: &AssignmentSnapshot,
    ) -> Result<()> {
        let Some(transition) = transition else {
            return self.assign(target, snapshot).await;
        };

        self.set_status(target, transition.to).await?;
        if let Err(assign_err) = self.assign(target, snapshot).await {
            match self.set_status(target, transition.from).await {
                Ok(()) => warn!(
                    "Snapshot write for {} failed, restored status to {}",
                    target,
                    transition.from.as_str()
                ),
                Err(restore_err) => error!(
                    "Snapshot write for {} failed and status could not be restored to {}: {}",
                    target,
                    transition.from.as_str(),
                    restore_err
                ),
            }
            return Err(match assign_err {
                DispatchError::PersistenceFailure(_) => assign_err,
                other => DispatchError::PersistenceFailure(other.to_string()),
            });
        }
        Ok(())
    }
}
