// src/matching/fetcher.rs
//
// Candidate retrieval with broadening when the nearby query comes back sparse

use log::{debug, info, warn};

use super::distance::distance;
use crate::config::DispatchConfig;
use crate::directory::ResponderDirectory;
use crate::error::{DispatchError, Result};
use crate::models::{DistanceAnnotatedResponder, GeoPoint, ResponderKind};

/// Fetches responders near `origin`.
///
/// The directory's own ordering is trusted for the radius query. When that
/// query yields fewer than `config.min_candidates`, the full directory is
/// pulled and distances are computed here, sorted closest first and capped
/// at `limit`. If that broadening query fails the sparse result is kept.
pub async fn fetch_candidates<D>(
    directory: &D,
    origin: GeoPoint,
    kind: ResponderKind,
    limit: usize,
    max_distance_meters: f64,
    config: &DispatchConfig,
) -> Result<Vec<DistanceAnnotatedResponder>>
where
    D: ResponderDirectory + ?Sized,
{
    origin.validate()?;
    if !max_distance_meters.is_finite() || max_distance_meters < 0.0 {
        return Err(DispatchError::InvalidCoordinates {
            latitude: origin.latitude,
            longitude: origin.longitude,
        });
    }
    if limit == 0 {
        return Ok(Vec::new());
    }

    let nearby = directory
        .nearby(kind, origin, limit, max_distance_meters)
        .await
        .map_err(|e| match e {
            DispatchError::DirectoryUnavailable(_) => e,
            other => DispatchError::DirectoryUnavailable(other.to_string()),
        })?;

    debug!(
        "Directory returned {} {} candidates within {}m of ({}, {})",
        nearby.len(),
        kind,
        max_distance_meters,
        origin.latitude,
        origin.longitude
    );

    if nearby.len() >= config.min_candidates {
        return Ok(nearby);
    }

    info!(
        "Only {} {} candidates within {}m (minimum {}), broadening to the full directory",
        nearby.len(),
        kind,
        max_distance_meters,
        config.min_candidates
    );

    let everyone = match directory.all(kind).await {
        Ok(responders) => responders,
        Err(e) => {
            warn!(
                "Broadening query for {} candidates failed, keeping {} nearby results: {}",
                kind,
                nearby.len(),
                e
            );
            return Ok(nearby);
        }
    };

    let mut broadened: Vec<DistanceAnnotatedResponder> = everyone
        .into_iter()
        .filter_map(|responder| {
            if !responder.location.is_valid() {
                warn!(
                    "Skipping {} '{}' with invalid location ({}, {})",
                    kind,
                    responder.name,
                    responder.location.latitude,
                    responder.location.longitude
                );
                return None;
            }
            let d = distance(origin, responder.location);
            Some(DistanceAnnotatedResponder::new(responder, d))
        })
        .collect();

    broadened.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
    broadened.truncate(limit);

    info!(
        "Broadened {} candidate list to {} responders",
        kind,
        broadened.len()
    );
    Ok(broadened)
}
