use finanzas_game_core::models::{BadgeId, EducationLevel, ModuleId, UserId};
use finanzas_game_core::services::progress_client::RemoteProgressClient;
use finanzas_game_core::ApiError;
use serde_json::json;
use std::time::Duration;

mod common;
use common::FakeBackend;

#[tokio::test]
async fn missing_progress_reads_as_empty() {
    let backend = FakeBackend::start().await;
    let user_id = UserId::new(backend.add_user("mateo"));
    let client = backend.client();

    let snapshot = client.get_progress(&user_id).await.unwrap();
    assert_eq!(snapshot.user_id, user_id);
    assert!(snapshot.completed_modules.is_empty());
    assert!(snapshot.module_scores.is_empty());
    assert_eq!(snapshot.total_score, 0);
}

#[tokio::test]
async fn progress_timestamps_are_parsed_leniently() {
    let backend = FakeBackend::start().await;
    let id = backend.add_user("mateo");
    backend.set_progress(
        &id,
        json!({
            "user_id": id,
            "completed_modules": ["piggy_bank"],
            "module_scores": { "piggy_bank": 67 },
            "total_score": 67,
            "updated_at": "2026-03-02T08:15:00.5",
        }),
    );

    let snapshot = backend.client().get_progress(&UserId::new(&id)).await.unwrap();
    assert_eq!(snapshot.best_score(&ModuleId::new("piggy_bank")), Some(67));
    assert!(snapshot.updated_at.is_some());
}

#[tokio::test]
async fn progress_of_another_user_is_rejected() {
    let backend = FakeBackend::start().await;
    let id = backend.add_user("mateo");
    backend.set_progress(&id, json!({ "user_id": "someone-else", "total_score": 0 }));

    let err = backend
        .client()
        .get_progress(&UserId::new(&id))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse { operation: "get_progress", .. }));
}

#[tokio::test]
async fn out_of_range_scores_are_rejected() {
    let backend = FakeBackend::start().await;
    let id = backend.add_user("mateo");
    backend.set_progress(
        &id,
        json!({
            "user_id": id,
            "completed_modules": ["needs_wants"],
            "module_scores": { "needs_wants": 140 },
            "total_score": 140,
        }),
    );

    let err = backend
        .client()
        .get_progress(&UserId::new(&id))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse { .. }));
}

#[tokio::test]
async fn error_detail_is_carried_into_status_errors() {
    let backend = FakeBackend::start().await;
    let err = backend
        .client()
        .add_coins(&UserId::new("ghost"), 10)
        .await
        .unwrap_err();

    match err {
        ApiError::Status {
            operation,
            status,
            detail,
        } => {
            assert_eq!(operation, "add_coins");
            assert_eq!(status, 404);
            assert_eq!(detail, "Usuario no encontrado");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn success_false_is_treated_as_failure() {
    let backend = FakeBackend::start().await;
    let id = backend.add_user("mateo");
    backend.respond_with("add_coins", 200, json!({ "success": false, "new_total": 0 }));

    let err = backend
        .client()
        .add_coins(&UserId::new(&id), 10)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse { operation: "add_coins", .. }));
}

#[tokio::test]
async fn malformed_body_is_an_invalid_response() {
    let backend = FakeBackend::start().await;
    let id = backend.add_user("mateo");
    backend.respond_with("add_xp", 200, json!({ "success": true }));

    let err = backend
        .client()
        .add_xp(&UserId::new(&id), 10)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse { operation: "add_xp", .. }));
}

#[tokio::test]
async fn zero_level_in_xp_answer_fails_validation() {
    let backend = FakeBackend::start().await;
    let id = backend.add_user("mateo");
    backend.respond_with(
        "add_xp",
        200,
        json!({
            "success": true,
            "new_xp": 10,
            "new_level": 0,
            "level_up": false,
            "total_coins": 0,
        }),
    );

    let err = backend
        .client()
        .add_xp(&UserId::new(&id), 10)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse { .. }));
}

#[tokio::test]
async fn requests_are_bounded_by_the_timeout() {
    let backend = FakeBackend::start().await;
    let id = backend.add_user("mateo");
    backend.delay("unlock_badge", Duration::from_secs(2));

    let err = backend
        .client_with_timeout(Duration::from_millis(100))
        .unlock_badge(&UserId::new(&id), &BadgeId::new("saver"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Timeout { operation: "unlock_badge", .. }));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    // port 9 (discard) on localhost is practically never bound
    let client = finanzas_game_core::services::progress_client::HttpApiClient::new(
        url::Url::parse("http://127.0.0.1:9/").unwrap(),
        Duration::from_secs(2),
    );
    let err = client.get_progress(&UserId::new("u1")).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport { .. } | ApiError::Timeout { .. }));
}

#[tokio::test]
async fn badge_unlock_reports_whether_it_was_new() {
    let backend = FakeBackend::start().await;
    let id = UserId::new(backend.add_user("mateo"));
    let client = backend.client();
    let badge = BadgeId::new("saver");

    let first = client.unlock_badge(&id, &badge).await.unwrap();
    let second = client.unlock_badge(&id, &badge).await.unwrap();
    assert!(first.is_new);
    assert!(!second.is_new);
}

#[tokio::test]
async fn refused_badge_unlock_is_an_error() {
    let backend = FakeBackend::start().await;
    let id = backend.add_user("mateo");
    backend.respond_with("unlock_badge", 200, json!({ "success": false, "new_badge": false }));

    let err = backend
        .client()
        .unlock_badge(&UserId::new(&id), &BadgeId::new("saver"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse { operation: "unlock_badge", .. }));
}

#[tokio::test]
async fn module_catalogue_is_fetched_per_level() {
    let backend = FakeBackend::start().await;
    let modules = backend
        .client()
        .modules_by_level(EducationLevel::Primaria)
        .await
        .unwrap();

    assert_eq!(modules.len(), 2);
    assert_eq!(modules[0].id, "coin_recognition");
    assert_eq!(modules[0].kind, "game");
    assert!(modules.iter().all(|m| m.level == EducationLevel::Primaria));
    assert_eq!(backend.calls(), vec!["modules_by_level"]);
}
