// src/models.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DispatchError, Result};

//------------------------------------------------------------------------------
// IDENTIFIER TYPES
//------------------------------------------------------------------------------

/// Stable identifier of a firefighter or NGO in the responder directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResponderId(pub String);

/// Identifier of a disaster or citizen report that receives assignments
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(pub String);

impl fmt::Display for ResponderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//------------------------------------------------------------------------------
// GEOGRAPHY
//------------------------------------------------------------------------------

/// A point on the globe in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Builds a point, rejecting anything outside lat [-90, 90] / lon [-180, 180].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let point = GeoPoint {
            latitude,
            longitude,
        };
        point.validate()?;
        Ok(point)
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(DispatchError::InvalidCoordinates {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

//------------------------------------------------------------------------------
// RESPONDERS
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponderKind {
    Firefighter,
    Ngo,
}

impl ResponderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponderKind::Firefighter => "firefighter",
            ResponderKind::Ngo => "ngo",
        }
    }
}

impl fmt::Display for ResponderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firefighter" | "firefighters" => Ok(ResponderKind::Firefighter),
            "ngo" | "ngos" => Ok(ResponderKind::Ngo),
            other => Err(format!("Unknown responder kind: {}", other)),
        }
    }
}

/// A firefighter or NGO as read from the responder directory.
///
/// `affiliation` is the station name for firefighters and the organization
/// name for NGOs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Responder {
    pub id: Option<ResponderId>,
    pub name: String,
    pub affiliation: String,
    pub phone_number: Option<String>,
    pub location: GeoPoint,
}

/// Presentation hint for the three closest candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankLabel {
    Nearest,
    SecondNearest,
    ThirdNearest,
}

impl RankLabel {
    pub fn for_position(position: usize) -> Option<RankLabel> {
        match position {
            0 => Some(RankLabel::Nearest),
            1 => Some(RankLabel::SecondNearest),
            2 => Some(RankLabel::ThirdNearest),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RankLabel::Nearest => "nearest",
            RankLabel::SecondNearest => "second nearest",
            RankLabel::ThirdNearest => "third nearest",
        }
    }
}

/// A responder together with its distance from the query origin.
/// Built per query and never persisted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceAnnotatedResponder {
    pub responder: Responder,
    pub distance_meters: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<RankLabel>,
}

impl DistanceAnnotatedResponder {
    pub fn new(responder: Responder, distance_meters: f64) -> Self {
        Self {
            responder,
            distance_meters,
            rank: None,
        }
    }

    /// Denormalized copy suitable for a selection or a stored snapshot
    pub fn to_snapshot_entry(&self) -> SnapshotEntry {
        SnapshotEntry {
            responder_id: self.responder.id.clone(),
            name: self.responder.name.clone(),
            affiliation: self.responder.affiliation.clone(),
            phone_number: self.responder.phone_number.clone(),
            location: Some(self.responder.location),
            distance_meters: Some(self.distance_meters),
        }
    }
}

//------------------------------------------------------------------------------
// ASSIGNMENT SNAPSHOTS
//------------------------------------------------------------------------------

/// One responder as stored on a disaster or report.
///
/// Location and distance are optional because entries typed in by hand or
/// stored by older clients may not carry them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    #[serde(default)]
    pub responder_id: Option<ResponderId>,
    pub name: String,
    pub affiliation: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub distance_meters: Option<f64>,
}

impl SnapshotEntry {
    /// The one identity rule for selections: ids decide when both sides
    /// carry one, otherwise `(name, affiliation)` does.
    pub fn same_responder(&self, other: &SnapshotEntry) -> bool {
        match (&self.responder_id, &other.responder_id) {
            (Some(a), Some(b)) => a == b,
            _ => {
                self.name.trim() == other.name.trim()
                    && self.affiliation.trim() == other.affiliation.trim()
            }
        }
    }
}

/// The full set of responders attached to a target at submission time.
/// A new submission replaces the previous snapshot wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSnapshot {
    pub assignment_id: Uuid,
    pub responder_kind: ResponderKind,
    pub entries: Vec<SnapshotEntry>,
    pub assigned_at: DateTime<Utc>,
}

impl AssignmentSnapshot {
    pub fn new(responder_kind: ResponderKind, entries: Vec<SnapshotEntry>) -> Self {
        Self {
            assignment_id: Uuid::new_v4(),
            responder_kind,
            entries,
            assigned_at: Utc::now(),
        }
    }
}

//------------------------------------------------------------------------------
// TARGETS
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Disaster,
    Report,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Disaster => "disaster",
            TargetKind::Report => "report",
        }
    }
}

impl FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disaster" => Ok(TargetKind::Disaster),
            "report" => Ok(TargetKind::Report),
            other => Err(format!("Unknown target kind: {}", other)),
        }
    }
}

/// A disaster or citizen report that responders are dispatched to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub kind: TargetKind,
    pub id: TargetId,
}

impl Target {
    pub fn disaster(id: impl Into<String>) -> Self {
        Target {
            kind: TargetKind::Disaster,
            id: TargetId(id.into()),
        }
    }

    pub fn report(id: impl Into<String>) -> Self {
        Target {
            kind: TargetKind::Report,
            id: TargetId(id.into()),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_str(), self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Pending,
    Processing,
    Declined,
    Resolved,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Processing => "processing",
            AssignmentStatus::Declined => "declined",
            AssignmentStatus::Resolved => "resolved",
        }
    }
}

impl FromStr for AssignmentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(AssignmentStatus::Pending),
            "processing" => Ok(AssignmentStatus::Processing),
            "declined" => Ok(AssignmentStatus::Declined),
            "resolved" => Ok(AssignmentStatus::Resolved),
            other => Err(format!("Invalid assignment status: {}", other)),
        }
    }
}

/// What the assignment store knows about a target
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRecord {
    pub target: Target,
    pub location: GeoPoint,
    pub status: AssignmentStatus,
}
