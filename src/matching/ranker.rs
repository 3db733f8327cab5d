// src/matching/ranker.rs

use crate::models::{DistanceAnnotatedResponder, RankLabel};

/// Orders candidates closest first and labels the top three.
///
/// The sort is stable, so candidates at the same distance keep the order
/// they arrived in. Labels are presentation metadata only.
pub fn rank(mut candidates: Vec<DistanceAnnotatedResponder>) -> Vec<DistanceAnnotatedResponder> {
    candidates.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));

    for (position, candidate) in candidates.iter_mut().enumerate() {
        candidate.rank = RankLabel::for_position(position);
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoPoint, Responder, ResponderId};

    fn candidate(id: &str, distance_meters: f64) -> DistanceAnnotatedResponder {
        DistanceAnnotatedResponder::new(
            Responder {
                id: Some(ResponderId(id.to_string())),
                name: format!("Responder {}", id),
                affiliation: "Central Station".to_string(),
                phone_number: None,
                location: GeoPoint { latitude: 23.8, longitude: 90.4 },
            },
            distance_meters,
        )
    }

    fn ids(ranked: &[DistanceAnnotatedResponder]) -> Vec<&str> {
        ranked
            .iter()
            .map(|c| c.responder.id.as_ref().map(|id| id.0.as_str()).unwrap_or(""))
            .collect()
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let ranked = rank(vec![
            candidate("first", 500.0),
            candidate("second", 500.0),
            candidate("close", 300.0),
        ]);

        assert_eq!(ids(&ranked), vec!["close", "first", "second"]);
        let distances: Vec<f64> = ranked.iter().map(|c| c.distance_meters).collect();
        assert_eq!(distances, vec![300.0, 500.0, 500.0]);
    }

    #[test]
    fn test_rank_labels_top_three_only() {
        let ranked = rank(vec![
            candidate("d", 4000.0),
            candidate("a", 1000.0),
            candidate("c", 3000.0),
            candidate("b", 2000.0),
        ]);

        let labels: Vec<Option<RankLabel>> = ranked.iter().map(|c| c.rank).collect();
        assert_eq!(
            labels,
            vec![
                Some(RankLabel::Nearest),
                Some(RankLabel::SecondNearest),
                Some(RankLabel::ThirdNearest),
                None,
            ]
        );
    }

    #[test]
    fn test_rank_clears_stale_labels() {
        let mut stale = candidate("far", 9000.0);
        stale.rank = Some(RankLabel::Nearest);

        let ranked = rank(vec![
            stale,
            candidate("a", 10.0),
            candidate("b", 20.0),
            candidate("c", 30.0),
        ]);

        assert_eq!(ids(&ranked)[3], "far");
        assert_eq!(ranked[3].rank, None);
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank(Vec::new()).is_empty());
    }
}
