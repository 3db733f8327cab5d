// src/assignment/postgres.rs
//
// Disaster and citizen-report storage in PostgreSQL. Snapshots live in one
// JSONB column per responder kind.

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use log::debug;
use tokio_postgres::GenericClient;

use super::{AssignmentStore, StatusTransition};
use crate::db::PgPool;
use crate::error::{DispatchError, Result};
use crate::models::{
    AssignmentSnapshot, AssignmentStatus, GeoPoint, ResponderKind, Target, TargetKind,
    TargetRecord,
};

pub struct PgAssignmentStore {
    pool: PgPool,
}

fn table_for(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Disaster => "disaster",
        TargetKind::Report => "citizen_report",
    }
}

fn snapshot_column(kind: ResponderKind) -> &'static str {
    match kind {
        ResponderKind::Firefighter => "assigned_firefighters",
        ResponderKind::Ngo => "assigned_ngos",
    }
}

async fn update_status<C: GenericClient + Sync>(
    client: &C,
    target: &Target,
    status: AssignmentStatus,
) -> AnyResult<u64> {
    let query = format!(
        "UPDATE {} SET status = $1, updated_at = NOW() WHERE id = $2",
        table_for(target.kind)
    );
    client
        .execute(query.as_str(), &[&status.as_str(), &target.id.0])
        .await
        .with_context(|| format!("Failed to set status of {} to {}", target, status.as_str()))
}

async fn write_snapshot<C: GenericClient + Sync>(
    client: &C,
    target: &Target,
    snapshot: &AssignmentSnapshot,
) -> AnyResult<u64> {
    let query = format!(
        "UPDATE {} SET {} = $1, updated_at = NOW() WHERE id = $2",
        table_for(target.kind),
        snapshot_column(snapshot.responder_kind)
    );
    let payload =
        serde_json::to_value(snapshot).context("Failed to serialize assignment snapshot")?;
    client
        .execute(query.as_str(), &[&payload, &target.id.0])
        .await
        .with_context(|| format!("Failed to write {} snapshot for {}", snapshot.responder_kind, target))
}

fn expect_row(target: &Target, updated: u64) -> Result<()> {
    if updated == 0 {
        Err(DispatchError::TargetNotFound(target.to_string()))
    } else {
        Ok(())
    }
}

/// Builds a target from its nullable columns. A target without coordinates
/// cannot be matched and fails; a NULL status reads as pending.
fn target_record(
    target: &Target,
    latitude: Option<f64>,
    longitude: Option<f64>,
    status: Option<String>,
) -> Result<TargetRecord> {
    let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
        return Err(DispatchError::PersistenceFailure(format!(
            "{} has no stored location",
            target
        )));
    };
    let status = match status {
        Some(s) => s
            .parse::<AssignmentStatus>()
            .map_err(DispatchError::PersistenceFailure)?,
        None => AssignmentStatus::Pending,
    };
    Ok(TargetRecord {
        target: target.clone(),
        location: GeoPoint {
            latitude,
            longitude,
        },
        status,
    })
}

impl PgAssignmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn commit_in_transaction(
        &self,
        target: &Target,
        transition: Option<StatusTransition>,
        snapshot: &AssignmentSnapshot,
    ) -> AnyResult<u64> {
        let mut conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for assignment")?;
        let tx = conn
            .transaction()
            .await
            .context("Failed to start assignment transaction")?;

        if let Some(t) = transition {
            update_status(&tx, target, t.to).await?;
        }
        let updated = write_snapshot(&tx, target, snapshot).await?;

        tx.commit()
            .await
            .context("Failed to commit assignment transaction")?;
        Ok(updated)
    }
}

#[async_trait]
impl AssignmentStore for PgAssignmentStore {
    async fn load_target(&self, target: &Target) -> Result<TargetRecord> {
        let query = format!(
            "SELECT latitude, longitude, status FROM {} WHERE id = $1",
            table_for(target.kind)
        );
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for target lookup")
            .map_err(DispatchError::persistence)?;
        let row = conn
            .query_opt(query.as_str(), &[&target.id.0])
            .await
            .with_context(|| format!("Failed to load {}", target))
            .map_err(DispatchError::persistence)?
            .ok_or_else(|| DispatchError::TargetNotFound(target.to_string()))?;

        let latitude: Option<f64> = row
            .try_get("latitude")
            .context("Failed to get 'latitude' for target")
            .map_err(DispatchError::persistence)?;
        let longitude: Option<f64> = row
            .try_get("longitude")
            .context("Failed to get 'longitude' for target")
            .map_err(DispatchError::persistence)?;
        let status: Option<String> = row
            .try_get("status")
            .context("Failed to get 'status' for target")
            .map_err(DispatchError::persistence)?;

        target_record(target, latitude, longitude, status)
    }

    async fn load_snapshot(
        &self,
        target: &Target,
        kind: ResponderKind,
    ) -> Result<Option<AssignmentSnapshot>> {
        let query = format!(
            "SELECT {} AS snapshot FROM {} WHERE id = $1",
            snapshot_column(kind),
            table_for(target.kind)
        );
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for snapshot lookup")
            .map_err(DispatchError::persistence)?;
        let row = conn
            .query_opt(query.as_str(), &[&target.id.0])
            .await
            .with_context(|| format!("Failed to load {} snapshot for {}", kind, target))
            .map_err(DispatchError::persistence)?
            .ok_or_else(|| DispatchError::TargetNotFound(target.to_string()))?;

        let raw: Option<serde_json::Value> = row
            .try_get("snapshot")
            .context("Failed to get assignment snapshot column")
            .map_err(DispatchError::persistence)?;
        match raw {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value::<AssignmentSnapshot>(value)
                .map(Some)
                .with_context(|| format!("Stored {} snapshot for {} is malformed", kind, target))
                .map_err(DispatchError::persistence),
        }
    }

    async fn set_status(&self, target: &Target, status: AssignmentStatus) -> Result<()> {
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for status update")
            .map_err(DispatchError::persistence)?;
        let updated = update_status(&*conn, target, status)
            .await
            .map_err(DispatchError::persistence)?;
        expect_row(target, updated)
    }

    async fn assign(&self, target: &Target, snapshot: &AssignmentSnapshot) -> Result<()> {
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for snapshot write")
            .map_err(DispatchError::persistence)?;
        let updated = write_snapshot(&*conn, target, snapshot)
            .await
            .map_err(DispatchError::persistence)?;
        expect_row(target, updated)
    }

    async fn commit_assignment(
        &self,
        target: &Target,
        transition: Option<StatusTransition>,
        snapshot: &AssignmentSnapshot,
    ) -> Result<()> {
        let updated = self
            .commit_in_transaction(target, transition, snapshot)
            .await
            .map_err(DispatchError::persistence)?;
        debug!(
            "Committed {} snapshot with {} entries for {}",
            snapshot.responder_kind,
            snapshot.entries.len(),
            target
        );
        expect_row(target, updated)
    }
}
