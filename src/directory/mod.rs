// src/directory/mod.rs

// Read-only access to the firefighter and NGO directory

pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result};
use crate::models::{DistanceAnnotatedResponder, GeoPoint, Responder, ResponderId, ResponderKind};

pub use postgres::PgResponderDirectory;

/// Source of responder records.
///
/// Implementations report every failure, including malformed records, as
/// [`DispatchError::DirectoryUnavailable`].
#[async_trait]
pub trait ResponderDirectory: Send + Sync {
    /// Responders within `max_distance_meters` of `origin`, closest first,
    /// at most `limit` of them.
    async fn nearby(
        &self,
        kind: ResponderKind,
        origin: GeoPoint,
        limit: usize,
        max_distance_meters: f64,
    ) -> Result<Vec<DistanceAnnotatedResponder>>;

    /// Every responder of the given kind, unfiltered and unordered
    async fn all(&self, kind: ResponderKind) -> Result<Vec<Responder>>;
}

/// A responder as the directory returns it over the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryRecord {
    pub id: Option<String>,
    pub name: String,
    pub affiliation: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub distance_meters: Option<f64>,
}

impl DirectoryRecord {
    pub fn into_responder(self) -> Result<Responder> {
        let location = GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        };
        if !location.is_valid() {
            return Err(DispatchError::DirectoryUnavailable(format!(
                "record {:?} has invalid coordinates ({}, {})",
                self.id.as_deref().unwrap_or(&self.name),
                self.latitude,
                self.longitude
            )));
        }

        Ok(Responder {
            id: self.id.map(ResponderId),
            name: self.name,
            affiliation: self.affiliation,
            phone_number: self.phone_number,
            location,
        })
    }

    /// Converts a `nearby` record, which must carry a non-negative distance
    pub fn into_annotated(self) -> Result<DistanceAnnotatedResponder> {
        let distance_meters = match self.distance_meters {
            Some(d) if d.is_finite() && d >= 0.0 => d,
            other => {
                return Err(DispatchError::DirectoryUnavailable(format!(
                    "record {:?} has missing or invalid distance {:?}",
                    self.id.as_deref().unwrap_or(&self.name),
                    other
                )))
            }
        };
        Ok(DistanceAnnotatedResponder::new(
            self.into_responder()?,
            distance_meters,
        ))
    }
}
