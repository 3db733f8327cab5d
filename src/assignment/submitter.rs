// src/assignment/submitter.rs
//
// Turns a selection into a stored assignment snapshot, manually or by
// auto-assigning the nearest responder.

use log::{debug, info};
use std::time::Instant;

use super::{AssignmentStore, StatusTransition};
use crate::config::{DispatchConfig, AUTO_ASSIGN_COUNT};
use crate::directory::ResponderDirectory;
use crate::error::{DispatchError, Result};
use crate::matching::{fetch_candidates, rank, Selection};
use crate::models::{
    AssignmentSnapshot, AssignmentStatus, DistanceAnnotatedResponder, ResponderKind, Target,
};

pub struct AssignmentSubmitter<D, S> {
    directory: D,
    store: S,
    config: DispatchConfig,
}

impl<D, S> AssignmentSubmitter<D, S>
where
    D: ResponderDirectory,
    S: AssignmentStore,
{
    pub fn new(directory: D, store: S, config: DispatchConfig) -> Self {
        Self {
            directory,
            store,
            config,
        }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Ranked candidates around the target, closest first
    pub async fn candidates_for(
        &self,
        target: &Target,
        kind: ResponderKind,
    ) -> Result<Vec<DistanceAnnotatedResponder>> {
        let record = self.store.load_target(target).await?;
        let candidates = fetch_candidates(
            &self.directory,
            record.location,
            kind,
            self.config.candidate_limit,
            self.config.max_distance_meters,
            &self.config,
        )
        .await?;
        Ok(rank(candidates))
    }

    /// A selection pre-seeded with whatever is already assigned
    pub async fn open_selection(&self, target: &Target, kind: ResponderKind) -> Result<Selection> {
        Ok(match self.store.load_snapshot(target, kind).await? {
            Some(snapshot) => Selection::from_snapshot(&snapshot),
            None => Selection::new(),
        })
    }

    /// Stores the current selection as the target's assignment for `kind`,
    /// replacing any earlier snapshot. A declined target moves to processing
    /// in the same unit of work.
    pub async fn submit(
        &self,
        target: &Target,
        kind: ResponderKind,
        selection: &Selection,
    ) -> Result<AssignmentSnapshot> {
        if selection.is_empty() && !self.config.allow_empty_submission {
            return Err(DispatchError::EmptySelection);
        }

        let record = self.store.load_target(target).await?;
        let transition = if record.status == AssignmentStatus::Declined {
            Some(StatusTransition {
                from: AssignmentStatus::Declined,
                to: AssignmentStatus::Processing,
            })
        } else {
            None
        };

        let snapshot = AssignmentSnapshot::new(kind, selection.entries().to_vec());
        self.store
            .commit_assignment(target, transition, &snapshot)
            .await?;

        if let Some(t) = transition {
            info!(
                "Moved {} from {} to {}",
                target,
                t.from.as_str(),
                t.to.as_str()
            );
        }
        info!(
            "Assigned {} {} responder(s) to {} (assignment {})",
            snapshot.entries.len(),
            kind,
            target,
            snapshot.assignment_id
        );
        Ok(snapshot)
    }

    /// Fetches, ranks and assigns the single nearest responder
    pub async fn auto_assign(
        &self,
        target: &Target,
        kind: ResponderKind,
    ) -> Result<AssignmentSnapshot> {
        let start = Instant::now();
        let ranked = self.candidates_for(target, kind).await?;
        if ranked.is_empty() {
            return Err(DispatchError::NoCandidates { kind });
        }

        let mut selection = Selection::new();
        selection.auto_select_nearest(&ranked, AUTO_ASSIGN_COUNT);
        debug!(
            "Auto-selected {} at {:.0}m for {}",
            ranked[0].responder.name, ranked[0].distance_meters, target
        );

        let snapshot = self.submit(target, kind, &selection).await?;
        info!("Auto-assignment for {} finished in {:.2?}", target, start.elapsed());
        Ok(snapshot)
    }
}
