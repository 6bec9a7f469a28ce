use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use studyplan_backend::db::operations::{assessments, plans, tasks};
use studyplan_backend::models::{LearningSpeed, MaterialCategory, PlanStatus};
use studyplan_backend::workers::run_maintenance;

mod common;

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_root() {
    let (db, _dir) = common::file_db().await;
    let app = common::test_app(db);

    let response = send(&app, "GET", "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_unknown_route_uses_error_envelope() {
    let (db, _dir) = common::file_db().await;
    let app = common::test_app(db);

    let response = send(&app, "GET", "/api/nowhere", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_unknown_plan_is_not_found() {
    let (db, _dir) = common::file_db().await;
    let app = common::test_app(db);

    let response = send(&app, "POST", "/api/plans/missing/pre-assessment", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");

    let response = send(&app, "GET", "/api/plans/missing/status", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_plan_without_flashcards_is_unprocessable() {
    let (db, _dir) = common::file_db().await;
    let plan = {
        let mut tx = db.begin().await.unwrap();
        let user = common::seed_user(&mut tx, LearningSpeed::Moderate, 10).await;
        let plan = common::seed_plan(&mut tx, &user.id, None, None).await;
        tx.commit().await.unwrap();
        plan
    };
    let app = common::test_app(db);

    let response = send(&app, "POST", &format!("/api/plans/{}/pre-assessment", plan.id), None).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["code"], "NO_FLASHCARDS");
}

#[tokio::test]
async fn test_assessment_submission_regenerates_schedule() {
    let (db, _dir) = common::file_db().await;
    let plan = {
        let mut tx = db.begin().await.unwrap();
        let user = common::seed_user(&mut tx, LearningSpeed::Moderate, 10).await;
        let plan = common::seed_plan(&mut tx, &user.id, Some(MaterialCategory::Vocabulary), None).await;
        common::seed_cards(&mut tx, &plan.id, 8, 0.0).await;
        tx.commit().await.unwrap();
        plan
    };
    let app = common::test_app(db.clone());

    let response = send(&app, "POST", &format!("/api/plans/{}/pre-assessment", plan.id), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let generated = json_body(response).await;
    let assessment_id = generated["data"]["id"].as_str().unwrap().to_string();
    let questions = generated["data"]["questionsData"].as_array().unwrap().clone();
    // eight cards: the minimum sample of five
    assert_eq!(questions.len(), 5);

    let responses: Vec<Value> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| json!({ "flashcardId": q["flashcardId"], "isCorrect": i == 0 }))
        .collect();
    let submit_uri = format!("/api/pre-assessments/{assessment_id}/submit");

    let response = send(&app, "POST", &submit_uri, Some(json!({ "responses": responses }))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let submitted = json_body(response).await;
    assert_eq!(submitted["data"]["assessment"]["status"], "completed");
    assert_eq!(submitted["data"]["assessment"]["correctScore"], 20.0);
    assert_eq!(submitted["data"]["scheduleDispatched"], true);

    let status_uri = format!("/api/plans/{}/status", plan.id);
    let mut status = Value::Null;
    for _ in 0..100 {
        status = json_body(send(&app, "GET", &status_uri, None).await).await;
        if status["data"]["status"] == "active" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(status["data"]["status"], "active");
    assert_eq!(status["data"]["needsRetry"], false);

    let response = send(&app, "GET", &format!("/api/plans/{}/tasks", plan.id), None).await;
    let tasks = json_body(response).await;
    assert_eq!(tasks["data"].as_array().unwrap().len(), 7);

    let response = send(&app, "POST", &submit_uri, Some(json!({ "responses": [] }))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["code"], "CONFLICT");
}

#[tokio::test]
async fn test_manual_regeneration_returns_summary() {
    let (db, _dir) = common::file_db().await;
    let plan = {
        let mut tx = db.begin().await.unwrap();
        let user = common::seed_user(&mut tx, LearningSpeed::Slow, 7).await;
        let plan = common::seed_plan(&mut tx, &user.id, None, None).await;
        common::seed_cards(&mut tx, &plan.id, 3, 0.0).await;
        plans::set_plan_status(&mut tx, &plan.id, PlanStatus::GenerationFailed).await.unwrap();
        tx.commit().await.unwrap();
        plan
    };
    let app = common::test_app(db);

    let response = send(&app, "POST", &format!("/api/plans/{}/schedule", plan.id), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["outcome"], "scheduled");
    assert_eq!(body["data"]["tasksCreated"], 7);
    // no learner profile yet: moderate base rate
    assert_eq!(body["data"]["throughput"], 20.0);

    let status = json_body(send(&app, "GET", &format!("/api/plans/{}/status", plan.id), None).await).await;
    assert_eq!(status["data"]["status"], "active");
}

#[tokio::test]
async fn test_dispatcher_reports_final_status() {
    let (db, _dir) = common::file_db().await;
    let plan = {
        let mut tx = db.begin().await.unwrap();
        let user = common::seed_user(&mut tx, LearningSpeed::Moderate, 10).await;
        let plan = common::seed_plan(&mut tx, &user.id, None, None).await;
        common::seed_cards(&mut tx, &plan.id, 4, 0.0).await;
        tx.commit().await.unwrap();
        plan
    };
    let state = common::test_state(db.clone());

    let handle = state.dispatcher().dispatch(&plan.id).await.unwrap().unwrap();
    assert_eq!(handle.await.unwrap(), PlanStatus::Active);

    let mut conn = db.pool().acquire().await.unwrap();
    let stored = plans::get_plan(&mut conn, &plan.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PlanStatus::Active);
    assert_eq!(tasks::list_for_plan(&mut conn, &plan.id).await.unwrap().len(), 7);
    drop(conn);

    assert!(state.dispatcher().dispatch("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_maintenance_backfills_and_redispatches() {
    let (db, _dir) = common::file_db().await;
    let (fresh, stuck, empty) = {
        let mut tx = db.begin().await.unwrap();
        let user = common::seed_user(&mut tx, LearningSpeed::Moderate, 10).await;
        let fresh = common::seed_plan(&mut tx, &user.id, None, None).await;
        common::seed_cards(&mut tx, &fresh.id, 4, 0.0).await;
        let stuck = common::seed_plan(&mut tx, &user.id, None, None).await;
        common::seed_cards(&mut tx, &stuck.id, 4, 0.0).await;
        let empty = common::seed_plan(&mut tx, &user.id, None, None).await;
        tx.commit().await.unwrap();
        (fresh, stuck, empty)
    };
    {
        let mut conn = db.pool().acquire().await.unwrap();
        sqlx::query(r#"UPDATE "study_plans" SET "status" = 'generating', "updatedAt" = ? WHERE "id" = ?"#)
            .bind(Utc::now() - chrono::Duration::hours(2))
            .bind(&stuck.id)
            .execute(&mut *conn)
            .await
            .unwrap();
    }
    let state = common::test_state(db.clone());

    let report = run_maintenance(&db, state.dispatcher(), chrono::Duration::minutes(30))
        .await
        .unwrap();
    assert_eq!(report.assessments_created, 2);
    assert_eq!(report.assessments_failed, 0);
    assert_eq!(report.plans_redispatched, 1);

    let mut status = PlanStatus::Generating;
    for _ in 0..100 {
        let mut conn = db.pool().acquire().await.unwrap();
        status = plans::get_plan(&mut conn, &stuck.id).await.unwrap().unwrap().status;
        if status == PlanStatus::Active {
            break;
        }
        drop(conn);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(status, PlanStatus::Active);

    let mut conn = db.pool().acquire().await.unwrap();
    assert!(assessments::get_by_plan(&mut conn, &fresh.id).await.unwrap().is_some());
    assert!(assessments::get_by_plan(&mut conn, &empty.id).await.unwrap().is_none());
    drop(conn);

    // second sweep finds nothing to do
    let report = run_maintenance(&db, state.dispatcher(), chrono::Duration::minutes(30))
        .await
        .unwrap();
    assert_eq!(report.assessments_created, 0);
    assert_eq!(report.plans_redispatched, 0);
}

#[tokio::test]
async fn test_onboarding_and_tracking_endpoints() {
    let (db, _dir) = common::file_db().await;
    let (user, plan, cards) = {
        let mut tx = db.begin().await.unwrap();
        let user = common::seed_user(&mut tx, LearningSpeed::Moderate, 10).await;
        let plan = common::seed_plan(&mut tx, &user.id, Some(MaterialCategory::Facts), None).await;
        let cards = common::seed_cards(&mut tx, &plan.id, 2, 0.0).await;
        tx.commit().await.unwrap();
        (user, plan, cards)
    };
    let app = common::test_app(db);

    let response = send(
        &app,
        "POST",
        &format!("/api/users/{}/onboarding", user.id),
        Some(json!({
            "learningSpeed": "fast",
            "studyHoursPerWeek": 6,
            "preferredStudyModes": ["quiz"],
            "favoriteSubjects": ["Facts"]
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let onboarded = json_body(response).await;
    assert_eq!(onboarded["data"]["user"]["onboardingCompleted"], true);
    assert_eq!(onboarded["data"]["profile"]["subjectStrengths"]["facts"], 0.7);

    let response = send(
        &app,
        "POST",
        &format!("/api/users/{}/tracking", user.id),
        Some(json!({
            "studyPlanId": plan.id,
            "mode": "quiz",
            "flashcardId": cards[0].id,
            "isCorrect": true,
            "responseTimeMs": 1800
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let tracked = json_body(response).await;
    // 0.7 * 0.8 + 1.0 * 0.2
    assert_eq!(tracked["data"]["profile"]["subjectStrengths"]["facts"], 0.76);
    assert_eq!(tracked["data"]["event"]["attemptsNeeded"], 1);

    let response = send(
        &app,
        "POST",
        &format!("/api/users/{}/tracking", user.id),
        Some(json!({ "studyPlanId": plan.id, "mode": "quiz", "attemptsNeeded": 0 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "VALIDATION_ERROR");

    let response = send(&app, "GET", &format!("/api/users/{}/profile", user.id), None).await;
    let profile = json_body(response).await;
    assert_eq!(profile["data"]["selfReportedSpeed"], "fast");

    let response = send(&app, "GET", &format!("/api/users/{}/tasks/today?date=tomorrow", user.id), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "BAD_REQUEST");

    let response = send(&app, "GET", "/api/users/ghost/profile", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
