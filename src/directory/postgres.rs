// src/directory/postgres.rs
//
// PostgreSQL-backed responder directory. Uses PostGIS when the extension is
// installed, otherwise falls back to haversine over the raw coordinates.

use anyhow::{anyhow, Context, Result as AnyResult};
use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::sync::OnceCell;
use tokio_postgres::Row;

use super::{DirectoryRecord, ResponderDirectory};
use crate::db::PgPool;
use crate::error::{DispatchError, Result};
use crate::matching::distance::distance;
use crate::models::{DistanceAnnotatedResponder, GeoPoint, Responder, ResponderKind};

pub struct PgResponderDirectory {
    pool: PgPool,
    has_postgis: OnceCell<bool>,
}

/// Table and affiliation column for each responder kind
fn table_for(kind: ResponderKind) -> (&'static str, &'static str) {
    match kind {
        ResponderKind::Firefighter => ("firefighter", "station_name"),
        ResponderKind::Ngo => ("ngo", "organization_name"),
    }
}

/// Column values of one directory row, before NULL checks
#[derive(Debug)]
struct DirectoryRow {
    id: Option<String>,
    name: Option<String>,
    affiliation: Option<String>,
    phone_number: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    distance_meters: Option<f64>,
}

impl DirectoryRow {
    fn from_row(row: &Row, with_distance: bool) -> AnyResult<Self> {
        Ok(Self {
            id: row.try_get("id").context("Failed to get 'id' for responder")?,
            name: row.try_get("name").context("Failed to get 'name' for responder")?,
            affiliation: row
                .try_get("affiliation")
                .context("Failed to get 'affiliation' for responder")?,
            phone_number: row
                .try_get("phone_number")
                .context("Failed to get 'phone_number' for responder")?,
            latitude: row
                .try_get("latitude")
                .context("Failed to get 'latitude' for responder")?,
            longitude: row
                .try_get("longitude")
                .context("Failed to get 'longitude' for responder")?,
            distance_meters: if with_distance {
                row.try_get("distance_meters")
                    .context("Failed to get 'distance_meters' for responder")?
            } else {
                None
            },
        })
    }

    /// Name, affiliation and coordinates are required; a NULL in any of them
    /// fails the record
    fn into_record(self) -> AnyResult<DirectoryRecord> {
        let label = self.id.clone().unwrap_or_else(|| "<no id>".to_string());
        let missing = |column: &str| anyhow!("Responder {} has NULL {}", label, column);
        Ok(DirectoryRecord {
            name: self.name.ok_or_else(|| missing("name"))?,
            affiliation: self.affiliation.ok_or_else(|| missing("affiliation"))?,
            latitude: self.latitude.ok_or_else(|| missing("latitude"))?,
            longitude: self.longitude.ok_or_else(|| missing("longitude"))?,
            id: self.id,
            phone_number: self.phone_number,
            distance_meters: self.distance_meters,
        })
    }
}

fn record_from_row(row: &Row, with_distance: bool) -> AnyResult<DirectoryRecord> {
    DirectoryRow::from_row(row, with_distance)?.into_record()
}

/// Records a PostGIS check result. `None` (no connection) answers `false`
/// for this call only and leaves the cell empty.
fn remember_postgis(cell: &OnceCell<bool>, checked: Option<bool>) -> bool {
    let Some(available) = checked else {
        return false;
    };
    if cell.set(available).is_ok() {
        info!(
            "{}",
            if available {
                "Using PostGIS for responder distance queries"
            } else {
                "PostGIS not available, using fallback calculations"
            }
        );
    }
    cell.get().copied().unwrap_or(available)
}

impl PgResponderDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            has_postgis: OnceCell::new(),
        }
    }

    /// Checks for PostGIS once per directory. A failed connection is not
    /// remembered, so the next call checks again.
    async fn postgis_available(&self) -> bool {
        if let Some(&known) = self.has_postgis.get() {
            return known;
        }
        let checked = match self.pool.get().await {
            Ok(conn) => Some(conn.query_one("SELECT PostGIS_Version()", &[]).await.is_ok()),
            Err(e) => {
                warn!("Could not check for PostGIS: {}", e);
                None
            }
        };
        remember_postgis(&self.has_postgis, checked)
    }

    async fn query_nearby_postgis(
        &self,
        kind: ResponderKind,
        origin: GeoPoint,
        limit: usize,
        max_distance_meters: f64,
    ) -> AnyResult<Vec<DirectoryRecord>> {
        let (table, affiliation_col) = table_for(kind);
        let query = format!(
            "
            SELECT
                id, name, {affiliation_col} AS affiliation, phone_number, latitude, longitude,
                ST_Distance(geom, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography) AS distance_meters
            FROM
                {table}
            WHERE
                geom IS NOT NULL
                AND ST_DWithin(geom, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography, $3)
            ORDER BY
                distance_meters ASC
            LIMIT $4
        "
        );

        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for nearby responder query")?;
        let rows = conn
            .query(
                query.as_str(),
                &[
                    &origin.longitude,
                    &origin.latitude,
                    &max_distance_meters,
                    &(limit as i64),
                ],
            )
            .await
            .with_context(|| format!("Failed to query nearby {} responders with PostGIS", kind))?;

        rows.iter().map(|row| record_from_row(row, true)).collect()
    }

    async fn query_all(&self, kind: ResponderKind) -> AnyResult<Vec<DirectoryRecord>> {
        let (table, affiliation_col) = table_for(kind);
        let query = format!(
            "
            SELECT id, name, {affiliation_col} AS affiliation, phone_number, latitude, longitude
            FROM {table}
            WHERE latitude IS NOT NULL AND longitude IS NOT NULL
        "
        );

        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for responder listing")?;
        let rows = conn
            .query(query.as_str(), &[])
            .await
            .with_context(|| format!("Failed to list {} responders", kind))?;

        rows.iter().map(|row| record_from_row(row, false)).collect()
    }
}

#[async_trait]
impl ResponderDirectory for PgResponderDirectory {
    async fn nearby(
        &self,
        kind: ResponderKind,
        origin: GeoPoint,
        limit: usize,
        max_distance_meters: f64,
    ) -> Result<Vec<DistanceAnnotatedResponder>> {
        if self.postgis_available().await {
            let records = self
                .query_nearby_postgis(kind, origin, limit, max_distance_meters)
                .await
                .map_err(DispatchError::directory)?;
            return records
                .into_iter()
                .map(DirectoryRecord::into_annotated)
                .collect();
        }

        let responders = self.all(kind).await?;
        let total = responders.len();
        let mut within: Vec<DistanceAnnotatedResponder> = responders
            .into_iter()
            .map(|r| {
                let d = distance(origin, r.location);
                DistanceAnnotatedResponder::new(r, d)
            })
            .filter(|c| c.distance_meters <= max_distance_meters)
            .collect();
        within.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
        within.truncate(limit);

        debug!(
            "Fallback nearby query kept {} of {} {} responders",
            within.len(),
            total,
            kind
        );
        Ok(within)
    }

    async fn all(&self, kind: ResponderKind) -> Result<Vec<Responder>> {
        let records = self.query_all(kind).await.map_err(DispatchError::directory)?;
        records
            .into_iter()
            .map(DirectoryRecord::into_responder)
            .collect()
    }
}
