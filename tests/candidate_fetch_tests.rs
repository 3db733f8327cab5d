// tests/candidate_fetch_tests.rs

mod common;

use common::{annotated, responder, MemoryDirectory, DHAKA};
use dispatch_lib::{
    distance, fetch_candidates, rank, DispatchConfig, DispatchError, GeoPoint, RankLabel,
    ResponderKind,
};

fn ids(list: &[dispatch_lib::DistanceAnnotatedResponder]) -> Vec<String> {
    list.iter()
        .map(|c| c.responder.id.as_ref().map(|id| id.0.clone()).unwrap_or_default())
        .collect()
}

#[tokio::test]
async fn test_trusts_directory_order_when_enough_results() {
    // Deliberately not sorted: the directory's order is kept as-is
    let directory = MemoryDirectory::new(
        vec![annotated("a", 900.0), annotated("b", 100.0), annotated("c", 400.0)],
        Vec::new(),
    );

    let fetched = fetch_candidates(
        &directory,
        DHAKA,
        ResponderKind::Firefighter,
        10,
        5_000.0,
        &DispatchConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(ids(&fetched), vec!["a", "b", "c"]);
    assert_eq!(directory.all_calls(), 0);
}

#[tokio::test]
async fn test_broadens_when_results_are_sparse() {
    // ~1.1 km per 0.01 degree of latitude, listed out of order
    let everyone = vec![
        responder("far", "Far", DHAKA.latitude + 0.05, DHAKA.longitude),
        responder("near", "Near", DHAKA.latitude + 0.01, DHAKA.longitude),
        responder("mid", "Mid", DHAKA.latitude + 0.03, DHAKA.longitude),
        responder("nearest", "Nearest", DHAKA.latitude + 0.005, DHAKA.longitude),
    ];
    let directory = MemoryDirectory::new(
        vec![annotated("near", 1_112.0), annotated("nearest", 556.0)],
        everyone.clone(),
    );

    let fetched = fetch_candidates(
        &directory,
        DHAKA,
        ResponderKind::Firefighter,
        10,
        2_000.0,
        &DispatchConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(directory.all_calls(), 1);
    assert_eq!(ids(&fetched), vec!["nearest", "near", "mid", "far"]);
    for candidate in &fetched {
        let expected = distance(DHAKA, candidate.responder.location);
        assert!((candidate.distance_meters - expected).abs() < 1e-6);
    }
    assert!(fetched
        .windows(2)
        .all(|w| w[0].distance_meters <= w[1].distance_meters));
}

#[tokio::test]
async fn test_broadened_list_respects_limit_and_skips_bad_coordinates() {
    let everyone = vec![
        responder("bad", "Bad", 123.0, DHAKA.longitude),
        responder("b", "B", DHAKA.latitude + 0.02, DHAKA.longitude),
        responder("a", "A", DHAKA.latitude + 0.01, DHAKA.longitude),
        responder("c", "C", DHAKA.latitude + 0.03, DHAKA.longitude),
    ];
    let directory = MemoryDirectory::new(Vec::new(), everyone);

    let fetched = fetch_candidates(
        &directory,
        DHAKA,
        ResponderKind::Ngo,
        2,
        1_000.0,
        &DispatchConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(ids(&fetched), vec!["a", "b"]);
}

#[tokio::test]
async fn test_primary_failure_is_directory_unavailable() {
    let directory = MemoryDirectory::unreachable();

    let result = fetch_candidates(
        &directory,
        DHAKA,
        ResponderKind::Firefighter,
        10,
        5_000.0,
        &DispatchConfig::default(),
    )
    .await;

    assert!(matches!(result, Err(DispatchError::DirectoryUnavailable(_))));
    assert_eq!(directory.all_calls(), 0);
}

#[tokio::test]
async fn test_failed_broadening_keeps_sparse_results() {
    let directory =
        MemoryDirectory::new(vec![annotated("only", 250.0)], Vec::new()).with_failing_all();

    let fetched = fetch_candidates(
        &directory,
        DHAKA,
        ResponderKind::Firefighter,
        10,
        5_000.0,
        &DispatchConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(directory.all_calls(), 1);
    assert_eq!(ids(&fetched), vec!["only"]);
}

#[tokio::test]
async fn test_invalid_origin_is_rejected_before_querying() {
    let directory = MemoryDirectory::new(Vec::new(), Vec::new());
    let origin = GeoPoint {
        latitude: 23.8,
        longitude: 200.0,
    };

    let result = fetch_candidates(
        &directory,
        origin,
        ResponderKind::Firefighter,
        10,
        5_000.0,
        &DispatchConfig::default(),
    )
    .await;

    assert!(matches!(result, Err(DispatchError::InvalidCoordinates { .. })));
    assert_eq!(directory.nearby_calls(), 0);

    let negative_radius = fetch_candidates(
        &directory,
        DHAKA,
        ResponderKind::Firefighter,
        10,
        -1.0,
        &DispatchConfig::default(),
    )
    .await;
    assert!(matches!(
        negative_radius,
        Err(DispatchError::InvalidCoordinates { .. })
    ));
}

#[tokio::test]
async fn test_zero_limit_skips_directory() {
    let directory = MemoryDirectory::unreachable();

    let fetched = fetch_candidates(
        &directory,
        DHAKA,
        ResponderKind::Firefighter,
        0,
        5_000.0,
        &DispatchConfig::default(),
    )
    .await
    .unwrap();

    assert!(fetched.is_empty());
    assert_eq!(directory.nearby_calls(), 0);
}

#[tokio::test]
async fn test_fetch_then_rank_orders_and_labels() {
    let directory = MemoryDirectory::new(
        vec![
            annotated("x", 1_200.0),
            annotated("y", 3_000.0),
            annotated("z", 500.0),
        ],
        Vec::new(),
    );

    let fetched = fetch_candidates(
        &directory,
        DHAKA,
        ResponderKind::Firefighter,
        10,
        5_000.0,
        &DispatchConfig::default(),
    )
    .await
    .unwrap();
    let ranked = rank(fetched);

    assert_eq!(ids(&ranked), vec!["z", "x", "y"]);
    assert_eq!(ranked[0].rank, Some(RankLabel::Nearest));
    assert_eq!(ranked[2].rank, Some(RankLabel::ThirdNearest));
}
