//! HTTP-level tests for `/api/v1/projects`.

mod common;

use axum::http::StatusCode;
use buildtrack_db::repositories::OutboxRepo;
use common::{
    build_test_app, create_user, expect_json, get_auth, post_json_auth, put_json_auth, token_for,
};
use serde_json::json;
use sqlx::PgPool;

struct Cast {
    admin: String,
    manager_id: i64,
    manager: String,
    client_id: i64,
    client: String,
    outsider: String,
}

async fn cast(pool: &PgPool) -> Cast {
    let admin_id = create_user(pool, "admin@buildtrack.test", "admin").await;
    let manager_id = create_user(pool, "pm@buildtrack.test", "project_manager").await;
    let client_id = create_user(pool, "client@buildtrack.test", "client").await;
    let outsider_id = create_user(pool, "other@buildtrack.test", "client").await;
    Cast {
        admin: token_for(admin_id, "admin"),
        manager_id,
        manager: token_for(manager_id, "project_manager"),
        client_id,
        client: token_for(client_id, "client"),
        outsider: token_for(outsider_id, "client"),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_admin_creates_project_with_manager(pool: PgPool) {
    let c = cast(&pool).await;
    let app = build_test_app(pool.clone());

    let response = post_json_auth(
        app,
        "/api/v1/projects",
        json!({
            "name": "Lekki Duplex",
            "budget": 45_000_000,
            "manager_id": c.manager_id,
            "client_ids": [c.client_id],
        }),
        &c.admin,
    )
    .await;

    let json = expect_json(response, StatusCode::CREATED).await;
    assert_eq!(json["data"]["name"], "Lekki Duplex");
    assert_eq!(json["data"]["manager_id"], c.manager_id);
    assert_eq!(json["data"]["status"], "pending");
    assert_eq!(json["data"]["task_timeline"], json!([]));

    let pending = OutboxRepo::list_pending(&pool).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].event_type, "project.manager_assigned");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_non_admin_cannot_create_project(pool: PgPool) {
    let c = cast(&pool).await;
    let app = build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/projects",
        json!({ "name": "Rogue", "budget": 1 }),
        &c.manager,
    )
    .await;

    let json = expect_json(response, StatusCode::FORBIDDEN).await;
    assert_eq!(json["code"], "FORBIDDEN");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_blank_name_is_rejected(pool: PgPool) {
    let c = cast(&pool).await;
    let app = build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/projects",
        json!({ "name": "", "budget": 1000 }),
        &c.admin,
    )
    .await;

    let json = expect_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_members_see_only_their_projects(pool: PgPool) {
    let c = cast(&pool).await;
    let app = build_test_app(pool.clone());

    for name in ["Mine", "Not mine"] {
        let clients = if name == "Mine" { vec![c.client_id] } else { vec![] };
        let response = post_json_auth(
            app.clone(),
            "/api/v1/projects",
            json!({ "name": name, "budget": 100, "client_ids": clients }),
            &c.admin,
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let json = expect_json(
        get_auth(app.clone(), "/api/v1/projects", &c.client).await,
        StatusCode::OK,
    )
    .await;
    let names: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Mine"]);

    let json = expect_json(
        get_auth(app, "/api/v1/projects", &c.admin).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_non_member_cannot_read_project(pool: PgPool) {
    let c = cast(&pool).await;
    let app = build_test_app(pool);

    let created = expect_json(
        post_json_auth(
            app.clone(),
            "/api/v1/projects",
            json!({ "name": "Private", "budget": 100, "client_ids": [c.client_id] }),
            &c.admin,
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let uri = format!("/api/v1/projects/{}", created["data"]["id"]);

    let response = get_auth(app.clone(), &uri, &c.outsider).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(app, &uri, &c.client).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_missing_project_is_404(pool: PgPool) {
    let c = cast(&pool).await;
    let app = build_test_app(pool);

    let json = expect_json(
        get_auth(app, "/api/v1/projects/999999", &c.admin).await,
        StatusCode::NOT_FOUND,
    )
    .await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_assign_manager_requires_project_manager_role(pool: PgPool) {
    let c = cast(&pool).await;
    let app = build_test_app(pool.clone());

    let created = expect_json(
        post_json_auth(
            app.clone(),
            "/api/v1/projects",
            json!({ "name": "Ikoyi Towers", "budget": 100, "client_ids": [c.client_id] }),
            &c.admin,
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let uri = format!("/api/v1/projects/{}/manager", created["data"]["id"]);

    let response = put_json_auth(
        app.clone(),
        &uri,
        json!({ "manager_id": c.client_id }),
        &c.admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = expect_json(
        put_json_auth(app.clone(), &uri, json!({ "manager_id": c.manager_id }), &c.admin).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["manager_id"], c.manager_id);

    // Same manager again: nothing new is queued.
    let response =
        put_json_auth(app, &uri, json!({ "manager_id": c.manager_id }), &c.admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(OutboxRepo::list_pending(&pool).await.unwrap().len(), 1);
}
