//! HTTP-level tests for `/api/v1/invoices`.

mod common;

use axum::http::StatusCode;
use axum::Router;
use buildtrack_db::models::project::CreateProject;
use buildtrack_db::repositories::{InvoiceRepo, OutboxRepo, ProjectRepo};
use chrono::{Duration, Utc};
use common::{
    build_test_app, create_user, delete_auth, expect_json, get_auth, post_json_auth,
    put_json_auth, token_for,
};
use serde_json::{json, Value};
use sqlx::PgPool;

struct Fixture {
    app: Router,
    project_id: i64,
    manager: String,
    client: String,
    outsider: String,
}

async fn fixture(pool: PgPool) -> Fixture {
    let manager_id = create_user(&pool, "pm@buildtrack.test", "project_manager").await;
    let client_id = create_user(&pool, "client@buildtrack.test", "client").await;
    let outsider_id = create_user(&pool, "other@buildtrack.test", "client").await;
    let project = ProjectRepo::create(
        &pool,
        &CreateProject {
            name: "Ikoyi Terraces".into(),
            address: None,
            status: None,
            budget: 30_000_000,
            start_date: None,
            completion_date: None,
            manager_id: Some(manager_id),
            client_ids: vec![client_id],
            success_manager_ids: vec![],
        },
    )
    .await
    .unwrap();

    Fixture {
        app: build_test_app(pool),
        project_id: project.id,
        manager: token_for(manager_id, "project_manager"),
        client: token_for(client_id, "client"),
        outsider: token_for(outsider_id, "client"),
    }
}

fn invoice_body(project_id: i64, amount: Value, due_in_days: i64) -> Value {
    json!({
        "projectId": project_id,
        "amount": amount,
        "description": "Foundation works, first draw",
        "due_date": (Utc::now() + Duration::days(due_in_days)).to_rfc3339(),
        "payment": {
            "method": "bank_transfer",
            "bank_name": "Zenith Bank",
            "account_name": "BuildTrack Ltd",
            "account_number": "1012345678"
        }
    })
}

impl Fixture {
    async fn create_invoice(&self, amount: Value, due_in_days: i64) -> Value {
        let response = post_json_auth(
            self.app.clone(),
            "/api/v1/invoices",
            invoice_body(self.project_id, amount, due_in_days),
            &self.manager,
        )
        .await;
        expect_json(response, StatusCode::CREATED).await
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invoice_numbers_are_sequential_per_project(pool: PgPool) {
    let f = fixture(pool.clone()).await;

    let first = f.create_invoice(json!(250_000), 14).await;
    let second = f.create_invoice(json!("₦1,500,000"), 30).await;

    assert_eq!(first["data"]["invoice_number"], "INV-001");
    assert_eq!(second["data"]["invoice_number"], "INV-002");
    assert_eq!(second["data"]["amount"], 1_500_000);
    assert_eq!(first["data"]["status"], "pending");
    assert_eq!(first["data"]["sent_to"], json!(["client@buildtrack.test"]));
    assert_eq!(first["data"]["bank_details"]["bank_name"], "Zenith Bank");
    assert!(first["data"]["tx_ref"].as_str().unwrap().starts_with("bt-"));

    let pending = OutboxRepo::list_pending(&pool).await.unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|e| e.event_type == "invoice.created"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invalid_amount_and_payment_method_are_rejected(pool: PgPool) {
    let f = fixture(pool).await;

    let response = post_json_auth(
        f.app.clone(),
        "/api/v1/invoices",
        invoice_body(f.project_id, json!(0), 14),
        &f.manager,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut body = invoice_body(f.project_id, json!(1000), 14);
    body["payment"] = json!({ "method": "link", "url": "ftp://pay.example.com" });
    let response = post_json_auth(f.app.clone(), "/api/v1/invoices", body, &f.manager).await;
    let json = expect_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_past_due_invoice_reads_as_overdue(pool: PgPool) {
    let f = fixture(pool.clone()).await;
    let created = f.create_invoice(json!(250_000), -1).await;
    let id = created["data"]["id"].as_i64().unwrap();
    assert_eq!(created["data"]["status"], "overdue");

    let json = expect_json(
        get_auth(f.app.clone(), &format!("/api/v1/invoices/{id}"), &f.client).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["status"], "overdue");

    let json = expect_json(
        get_auth(
            f.app.clone(),
            &format!("/api/v1/invoices?projectId={}", f.project_id),
            &f.client,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"][0]["status"], "overdue");

    // The projection is never written back.
    let stored = InvoiceRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(stored.status.as_str(), "pending");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_non_member_list_is_empty(pool: PgPool) {
    let f = fixture(pool).await;
    f.create_invoice(json!(250_000), 14).await;

    let json = expect_json(
        get_auth(
            f.app.clone(),
            &format!("/api/v1/invoices?projectId={}", f.project_id),
            &f.outsider,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"], json!([]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_client_cannot_create_invoice(pool: PgPool) {
    let f = fixture(pool).await;
    let response = post_json_auth(
        f.app.clone(),
        "/api/v1/invoices",
        invoice_body(f.project_id, json!(1000), 14),
        &f.client,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_status_overwrite_and_paid_invoice_cannot_be_deleted(pool: PgPool) {
    let f = fixture(pool).await;
    let created = f.create_invoice(json!(250_000), 14).await;
    let id = created["data"]["id"].as_i64().unwrap();

    let response = put_json_auth(
        f.app.clone(),
        &format!("/api/v1/invoices/{id}/status"),
        json!({ "status": "settled" }),
        &f.manager,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = expect_json(
        put_json_auth(
            f.app.clone(),
            &format!("/api/v1/invoices/{id}/status"),
            json!({ "status": "paid" }),
            &f.manager,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["status"], "paid");
    assert!(json["data"]["paid_at"].is_string());

    let delete_uri = format!("/api/v1/projects/{}/invoices/{id}", f.project_id);
    let json = expect_json(
        delete_auth(f.app.clone(), &delete_uri, &f.manager).await,
        StatusCode::CONFLICT,
    )
    .await;
    assert_eq!(json["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_pending_invoice_can_be_deleted(pool: PgPool) {
    let f = fixture(pool).await;
    let created = f.create_invoice(json!(250_000), 14).await;
    let id = created["data"]["id"].as_i64().unwrap();
    let delete_uri = format!("/api/v1/projects/{}/invoices/{id}", f.project_id);

    let response = delete_auth(f.app.clone(), &delete_uri, &f.manager).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(f.app.clone(), &format!("/api/v1/invoices/{id}"), &f.manager).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_numbering_continues_after_deleting_an_earlier_invoice(pool: PgPool) {
    let f = fixture(pool).await;
    let first = f.create_invoice(json!(250_000), 14).await;
    f.create_invoice(json!(300_000), 14).await;

    let id = first["data"]["id"].as_i64().unwrap();
    let delete_uri = format!("/api/v1/projects/{}/invoices/{id}", f.project_id);
    let response = delete_auth(f.app.clone(), &delete_uri, &f.manager).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let third = f.create_invoice(json!(100_000), 14).await;
    assert_eq!(third["data"]["invoice_number"], "INV-003");
    let fourth = f.create_invoice(json!(100_000), 14).await;
    assert_eq!(fourth["data"]["invoice_number"], "INV-004");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invoice_is_created_when_recipients_cannot_be_resolved(pool: PgPool) {
    let f = fixture(pool.clone()).await;
    sqlx::query("ALTER TABLE users RENAME COLUMN is_active TO was_active")
        .execute(&pool)
        .await
        .unwrap();

    let created = f.create_invoice(json!(250_000), 14).await;
    assert_eq!(created["data"]["invoice_number"], "INV-001");
    assert_eq!(created["data"]["sent_to"], json!([]));

    let id = created["data"]["id"].as_i64().unwrap();
    assert!(InvoiceRepo::find_by_id(&pool, id).await.unwrap().is_some());
}
