#[macro_use]
mod common;

use actix_web::{http::StatusCode, test};
use common::*;
use lms::model::role::RoleName;
use serde_json::{Value, json};

#[actix_web::test]
async fn filed_request_reduces_balance_and_is_visible_up_the_chain() {
    let pool = seeded_pool().await;
    let config = config();
    let app = test_app!(pool, config);

    let sales = add_department(&pool, "Sales").await;
    add_user(&pool, "sales.manager@test", Some(sales), Some(20), RoleName::Manager).await;

    let employee = token_for(&pool, "employee@test").await;
    let manager = token_for(&pool, "manager@test").await;
    let admin = token_for(&pool, "admin").await;
    let outsider = token_for(&pool, "sales.manager@test").await;

    let resp = test::call_service(
        &app,
        post("/admin/request", Some(&employee), &leave("Family trip", "2024-01-01", "2024-01-06"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["status"], "Pending");
    assert_eq!(created["user_id"], user_id(&pool, "employee@test").await);
    assert_eq!(created["start_date"], "2024-01-01");

    let resp = test::call_service(&app, get("/admin/request", Some(&employee)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let list: Value = test::read_body_json(resp).await;
    assert_eq!(list["total"], 1);
    assert_eq!(list["days_left"], 15);
    assert_eq!(
        list["capabilities"],
        json!({ "can_create": true, "can_edit": false, "can_delete": false })
    );

    for (token, expected) in [(&manager, 1), (&admin, 1), (&outsider, 0)] {
        let resp = test::call_service(&app, get("/admin/request", Some(token)).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let list: Value = test::read_body_json(resp).await;
        assert_eq!(list["total"], expected);
        assert_eq!(list["data"].as_array().map(Vec::len), Some(expected as usize));
    }

    // a row outside the caller's predicate does not exist for them
    let id = created["id"].as_i64().unwrap();
    let resp = test::call_service(
        &app,
        get(&format!("/admin/request/{}", id), Some(&outsider)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn managers_only_see_their_own_department() {
    let pool = seeded_pool().await;
    let config = config();
    let app = test_app!(pool, config);

    let general = 1;
    let ops = add_department(&pool, "Ops").await;
    let legal = add_department(&pool, "Legal").await;
    add_user(&pool, "ops.manager@test", Some(ops), Some(20), RoleName::Manager).await;
    add_user(&pool, "ops.employee@test", Some(ops), Some(20), RoleName::Employee).await;
    add_user(&pool, "legal.manager@test", Some(legal), Some(20), RoleName::Manager).await;

    for email in ["employee@test", "ops.employee@test"] {
        let token = token_for(&pool, email).await;
        let resp = test::call_service(
            &app,
            post("/admin/request", Some(&token), &leave("", "2024-03-01", "2024-03-02"))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    for (email, department, expected) in [
        ("manager@test", general, 1),
        ("ops.manager@test", ops, 1),
        ("legal.manager@test", legal, 0),
    ] {
        let token = token_for(&pool, email).await;
        let resp = test::call_service(&app, get("/admin/request", Some(&token)).to_request()).await;
        let list: Value = test::read_body_json(resp).await;
        assert_eq!(list["total"], expected, "{}", email);
        for row in list["data"].as_array().unwrap() {
            assert_eq!(row["department_id"], department);
        }
    }

    let admin = token_for(&pool, "admin").await;
    let resp = test::call_service(&app, get("/admin/request", Some(&admin)).to_request()).await;
    let list: Value = test::read_body_json(resp).await;
    assert_eq!(list["total"], 2);
}

#[actix_web::test]
async fn anonymous_caller_is_sent_to_login_with_next() {
    let pool = seeded_pool().await;
    let config = config();
    let app = test_app!(pool, config);

    let resp = test::call_service(&app, get("/admin/request", None).to_request()).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers().get("Location").unwrap(),
        "/auth/login?next=%2Fadmin%2Frequest"
    );

    let resp = test::call_service(&app, get("/admin/request", Some("not-a-jwt")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[actix_web::test]
async fn reference_data_is_closed_to_staff() {
    let pool = seeded_pool().await;
    let config = config();
    let app = test_app!(pool, config);

    for email in ["employee@test", "manager@test"] {
        let token = token_for(&pool, email).await;
        for section in ["/admin/user", "/admin/role", "/admin/department"] {
            let resp = test::call_service(&app, get(section, Some(&token)).to_request()).await;
            assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{} on {}", email, section);
        }
    }
}

#[actix_web::test]
async fn manager_reviews_status_but_cannot_rewrite_the_request() {
    let pool = seeded_pool().await;
    let config = config();
    let app = test_app!(pool, config);

    let employee = token_for(&pool, "employee@test").await;
    let manager = token_for(&pool, "manager@test").await;

    let resp = test::call_service(
        &app,
        post("/admin/request", Some(&employee), &leave("Dentist", "2024-02-01", "2024-02-02"))
            .to_request(),
    )
    .await;
    let created: Value = test::read_body_json(resp).await;
    let uri = format!("/admin/request/{}", created["id"]);

    let resp = test::call_service(
        &app,
        put(&uri, Some(&manager), &json!({ "status": "Approved" })).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = test::read_body_json(resp).await;
    assert_eq!(updated["status"], "Approved");
    assert_eq!(updated["reason"], "Dentist");

    let resp = test::call_service(
        &app,
        put(&uri, Some(&manager), &json!({ "reason": "Changed by manager" })).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(
        &app,
        put(&uri, Some(&manager), &json!({ "status": "Maybe" })).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(
        &app,
        put(&format!("{}/reject", uri), Some(&manager), &json!({})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let rejected: Value = test::read_body_json(resp).await;
    assert_eq!(rejected["status"], "Rejected");

    // edit form of someone else's row: only the status is open
    let resp = test::call_service(
        &app,
        get(&format!("{}/edit", uri), Some(&manager)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let form: Value = test::read_body_json(resp).await;
    assert_eq!(form["fields"]["status"]["disabled"], false);
    assert_eq!(form["fields"]["reason"]["disabled"], true);
    assert_eq!(form["fields"]["user"]["disabled"], true);
    assert_eq!(form["values"]["reason"], "Dentist");
}

#[actix_web::test]
async fn manager_edits_dates_of_own_request() {
    let pool = seeded_pool().await;
    let config = config();
    let app = test_app!(pool, config);

    let manager = token_for(&pool, "manager@test").await;

    let resp = test::call_service(
        &app,
        post("/admin/request", Some(&manager), &leave("Conference", "2024-05-01", "2024-05-03"))
            .to_request(),
    )
    .await;
    let created: Value = test::read_body_json(resp).await;

    let resp = test::call_service(
        &app,
        put(
            &format!("/admin/request/{}", created["id"]),
            Some(&manager),
            &json!({ "end_date": "2024-05-04", "status": "Approved" }),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = test::read_body_json(resp).await;
    assert_eq!(updated["end_date"], "2024-05-04");
    assert_eq!(updated["status"], "Approved");
}

#[actix_web::test]
async fn employee_cannot_edit_even_own_request() {
    let pool = seeded_pool().await;
    let config = config();
    let app = test_app!(pool, config);

    let employee = token_for(&pool, "employee@test").await;

    let resp = test::call_service(
        &app,
        post("/admin/request", Some(&employee), &leave("Trip", "2024-04-01", "2024-04-03"))
            .to_request(),
    )
    .await;
    let created: Value = test::read_body_json(resp).await;
    let uri = format!("/admin/request/{}", created["id"]);

    let resp = test::call_service(
        &app,
        put(&uri, Some(&employee), &json!({ "reason": "Longer trip" })).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(
        &app,
        put(&format!("{}/approve", uri), Some(&employee), &json!({})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(&app, delete(&uri, Some(&employee)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn employee_cannot_set_status_when_filing() {
    let pool = seeded_pool().await;
    let config = config();
    let app = test_app!(pool, config);

    let employee = token_for(&pool, "employee@test").await;

    let mut body = leave("Sneaky", "2024-04-01", "2024-04-02");
    body["status"] = json!("Approved");

    let resp = test::call_service(
        &app,
        post("/admin/request", Some(&employee), &body).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn only_superuser_deletes() {
    let pool = seeded_pool().await;
    let config = config();
    let app = test_app!(pool, config);

    let employee = token_for(&pool, "employee@test").await;
    let manager = token_for(&pool, "manager@test").await;
    let admin = token_for(&pool, "admin").await;

    let resp = test::call_service(
        &app,
        post("/admin/request", Some(&employee), &leave("Moving", "2024-06-01", "2024-06-02"))
            .to_request(),
    )
    .await;
    let created: Value = test::read_body_json(resp).await;
    let uri = format!("/admin/request/{}", created["id"]);

    let resp = test::call_service(&app, delete(&uri, Some(&manager)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(&app, delete(&uri, Some(&admin)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, get(&uri, Some(&admin)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // balance is back to the full allotment
    let resp = test::call_service(&app, get("/admin/request", Some(&employee)).to_request()).await;
    let list: Value = test::read_body_json(resp).await;
    assert_eq!(list["days_left"], 20);
}

#[actix_web::test]
async fn superuser_never_files_requests() {
    let pool = seeded_pool().await;
    let config = config();
    let app = test_app!(pool, config);

    let admin = token_for(&pool, "admin").await;

    let resp = test::call_service(&app, get("/admin/request", Some(&admin)).to_request()).await;
    let list: Value = test::read_body_json(resp).await;
    assert_eq!(list["days_left"], 0);
    assert_eq!(
        list["capabilities"],
        json!({ "can_create": false, "can_edit": false, "can_delete": true })
    );

    let resp = test::call_service(
        &app,
        post("/admin/request", Some(&admin), &leave("", "2024-01-01", "2024-01-02")).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn overdrawn_balance_blocks_new_requests() {
    let pool = seeded_pool().await;
    let config = config();
    let app = test_app!(pool, config);

    let employee = token_for(&pool, "employee@test").await;

    // 24 days against an allotment of 20 is still accepted while the balance is not negative
    let resp = test::call_service(
        &app,
        post("/admin/request", Some(&employee), &leave("Sabbatical", "2024-01-01", "2024-01-25"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(&app, get("/admin/request", Some(&employee)).to_request()).await;
    let list: Value = test::read_body_json(resp).await;
    assert_eq!(list["days_left"], -4);
    assert_eq!(list["capabilities"]["can_create"], false);

    let resp = test::call_service(
        &app,
        post("/admin/request", Some(&employee), &leave("More", "2024-02-01", "2024-02-02"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(&app, get("/admin/request/new", Some(&employee)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn create_form_reports_locks_and_defaults() {
    let pool = seeded_pool().await;
    let config = config();
    let app = test_app!(pool, config);

    let employee = token_for(&pool, "employee@test").await;

    let resp = test::call_service(&app, get("/admin/request/new", Some(&employee)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let form: Value = test::read_body_json(resp).await;

    assert_eq!(form["fields"]["reason"]["disabled"], false);
    assert_eq!(form["fields"]["start_date"]["disabled"], false);
    assert_eq!(form["fields"]["status"]["disabled"], true);
    assert_eq!(form["fields"]["days_left"]["disabled"], true);
    assert_eq!(form["values"]["status"], "Pending");
    assert_eq!(form["values"]["days_left"], 20);
    assert_eq!(form["values"]["department"], 1);
}

#[actix_web::test]
async fn list_filters_by_status() {
    let pool = seeded_pool().await;
    let config = config();
    let app = test_app!(pool, config);

    let employee = token_for(&pool, "employee@test").await;
    let manager = token_for(&pool, "manager@test").await;

    let mut ids = Vec::new();
    for start in ["2024-07-01", "2024-08-01"] {
        let resp = test::call_service(
            &app,
            post("/admin/request", Some(&employee), &leave("", start, start)).to_request(),
        )
        .await;
        let created: Value = test::read_body_json(resp).await;
        ids.push(created["id"].as_i64().unwrap());
    }

    let resp = test::call_service(
        &app,
        put(&format!("/admin/request/{}/approve", ids[0]), Some(&manager), &json!({})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        get("/admin/request?status=Pending", Some(&manager)).to_request(),
    )
    .await;
    let list: Value = test::read_body_json(resp).await;
    assert_eq!(list["total"], 1);
    assert_eq!(list["data"][0]["id"], ids[1]);
}
