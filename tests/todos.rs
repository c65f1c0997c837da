mod common;

use actix_web::{http::StatusCode, test};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use common::{bearer, register_user, send, test_app, test_state, TestUser};
use todolist::notifications::Notification;

fn create_req(user: &TestUser, payload: Value) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/todos")
        .insert_header(bearer(&user.access_token))
        .set_json(payload)
}

fn list_req(user: &TestUser, query: &str) -> test::TestRequest {
    test::TestRequest::get()
        .uri(&format!("/api/todos{}", query))
        .insert_header(bearer(&user.access_token))
}

fn titles(body: &Value) -> Vec<String> {
    body["data"]["todos"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap().to_string())
        .collect()
}

#[actix_rt::test]
async fn test_todo_crud_flow() {
    let (state, _) = test_state().await;
    let app = test_app(state).await;
    let user = register_user(&app, "crud@example.com", "Crud").await;

    let (status, body) = send(
        &app,
        create_req(
            &user,
            json!({
                "title": "Write integration tests",
                "description": "Cover the todo routes",
                "due_date": "2030-01-15T09:00:00Z"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    assert_eq!(body["message"], "Todo created");
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["user_id"].as_i64(), Some(user.id));
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/todos/{}", id))
            .insert_header(bearer(&user.access_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Write integration tests");
    assert_eq!(body["data"]["description"], "Cover the todo routes");

    let (status, body) = send(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/todos/{}", id))
            .insert_header(bearer(&user.access_token))
            .set_json(json!({ "title": "", "status": "in_progress" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "update failed: {}", body);
    assert_eq!(body["data"]["title"], "Write integration tests");
    assert_eq!(body["data"]["status"], "in_progress");

    let (status, body) = send(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/todos/{}", id))
            .insert_header(bearer(&user.access_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Todo deleted");

    for req in [
        test::TestRequest::get().uri(&format!("/api/todos/{}", id)),
        test::TestRequest::delete().uri(&format!("/api/todos/{}", id)),
    ] {
        let (status, _) = send(&app, req.insert_header(bearer(&user.access_token))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let (_, body) = send(&app, list_req(&user, "")).await;
    assert_eq!(body["data"]["total"], 0);
}

#[actix_rt::test]
async fn test_other_users_todos_are_not_found() {
    let (state, _) = test_state().await;
    let app = test_app(state).await;
    let alice = register_user(&app, "alice@example.com", "Alice").await;
    let bob = register_user(&app, "bob@example.com", "Bob").await;

    let (_, body) = send(&app, create_req(&alice, json!({ "title": "Alice only" }))).await;
    let id = body["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/todos/{}", id);

    let (_, missing) = send(
        &app,
        test::TestRequest::get()
            .uri("/api/todos/999999")
            .insert_header(bearer(&bob.access_token)),
    )
    .await;

    let attempts = [
        test::TestRequest::get().uri(&uri),
        test::TestRequest::put().uri(&uri).set_json(json!({ "title": "Hijacked" })),
        test::TestRequest::delete().uri(&uri),
    ];
    for req in attempts {
        let (status, body) = send(&app, req.insert_header(bearer(&bob.access_token))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, missing);
    }

    let (_, body) = send(&app, list_req(&bob, "")).await;
    assert_eq!(body["data"]["total"], 0);

    let (status, body) = send(
        &app,
        test::TestRequest::get()
            .uri(&uri)
            .insert_header(bearer(&alice.access_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Alice only");
}

#[actix_rt::test]
async fn test_todo_routes_require_authentication() {
    let (state, _) = test_state().await;
    let app = test_app(state).await;

    let requests = [
        test::TestRequest::get().uri("/api/todos"),
        test::TestRequest::post().uri("/api/todos").set_json(json!({ "title": "x" })),
        test::TestRequest::get().uri("/api/todos/1"),
        test::TestRequest::delete().uri("/api/todos/1"),
    ];
    for req in requests {
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }
}

#[actix_rt::test]
async fn test_invalid_input_is_rejected() {
    let (state, _) = test_state().await;
    let app = test_app(state).await;
    let user = register_user(&app, "invalid@example.com", "Invalid").await;

    let (status, body) = send(
        &app,
        test::TestRequest::get()
            .uri("/api/todos/abc")
            .insert_header(bearer(&user.access_token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid todo ID");

    let bad_payloads = [
        json!({ "title": "" }),
        json!({ "description": "no title" }),
        json!({ "title": "x".repeat(201) }),
        json!({ "title": "ok", "status": "archived" }),
    ];
    for payload in bad_payloads {
        let (status, _) = send(&app, create_req(&user, payload.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {} was accepted", payload);
    }
}

#[actix_rt::test]
async fn test_list_pagination_is_coerced() {
    let (state, _) = test_state().await;
    let app = test_app(state).await;
    let user = register_user(&app, "pages@example.com", "Pages").await;

    for n in 0..12 {
        let (status, _) = send(&app, create_req(&user, json!({ "title": format!("Todo {:02}", n) }))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, default_page) = send(&app, list_req(&user, "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(default_page["message"], "Todos retrieved");
    assert_eq!(default_page["data"]["total"], 12);
    assert_eq!(default_page["data"]["page"], 1);
    assert_eq!(default_page["data"]["page_size"], 10);
    assert_eq!(default_page["data"]["total_pages"], 2);
    assert_eq!(titles(&default_page).len(), 10);

    for query in ["?page=0", "?page=-3&page_size=1000", "?page=abc&page_size=0"] {
        let (_, body) = send(&app, list_req(&user, query)).await;
        assert_eq!(body["data"], default_page["data"], "query {}", query);
    }

    let (_, second) = send(&app, list_req(&user, "?page=2")).await;
    assert_eq!(titles(&second).len(), 2);

    let (_, beyond) = send(&app, list_req(&user, "?page=5")).await;
    assert_eq!(beyond["data"]["total"], 12);
    assert!(titles(&beyond).is_empty());
}

#[actix_rt::test]
async fn test_list_filters_search_and_sorting() {
    let (state, _) = test_state().await;
    let app = test_app(state).await;
    let user = register_user(&app, "filters@example.com", "Filters").await;

    for payload in [
        json!({ "title": "banana", "description": "Buy MILK" }),
        json!({ "title": "apple", "status": "completed" }),
        json!({ "title": "cherry 100%" }),
    ] {
        send(&app, create_req(&user, payload)).await;
    }

    let (_, body) = send(&app, list_req(&user, "?status=completed")).await;
    assert_eq!(titles(&body), vec!["apple"]);

    let (_, body) = send(&app, list_req(&user, "?status=archived")).await;
    assert_eq!(body["data"]["total"], 0);

    let (_, body) = send(&app, list_req(&user, "?search=milk")).await;
    assert_eq!(titles(&body), vec!["banana"]);

    let (_, body) = send(&app, list_req(&user, "?search=%25")).await;
    assert_eq!(titles(&body), vec!["cherry 100%"]);

    let (_, body) = send(&app, list_req(&user, "?sort_by=title&sort_dir=ASC")).await;
    assert_eq!(titles(&body), vec!["apple", "banana", "cherry 100%"]);

    let (_, body) = send(&app, list_req(&user, "?sort_by=title&sort_dir=DESC")).await;
    assert_eq!(titles(&body), vec!["cherry 100%", "banana", "apple"]);

    // Unknown columns and injection attempts fall back to created_at DESC.
    let (_, fallback) = send(&app, list_req(&user, "")).await;
    for query in [
        "?sort_by=password_hash",
        "?sort_by=title%3B%20DROP%20TABLE%20todos&sort_dir=asc",
    ] {
        let (status, body) = send(&app, list_req(&user, query)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(titles(&body), titles(&fallback), "query {}", query);
    }
    assert_eq!(titles(&fallback), vec!["cherry 100%", "apple", "banana"]);
}

#[actix_rt::test]
async fn test_completing_a_todo_queues_notification() {
    let (state, recorder) = test_state().await;
    let app = test_app(state).await;
    let user = register_user(&app, "done@example.com", "Done").await;

    let (_, body) = send(&app, create_req(&user, json!({ "title": "Ship it" }))).await;
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/todos/{}", id))
            .insert_header(bearer(&user.access_token))
            .set_json(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");

    let expected = Notification::TodoCompleted {
        todo_id: id,
        title: "Ship it".to_string(),
    };
    let seen = recorder.wait_for(|seen| seen.contains(&expected)).await;
    assert!(seen.contains(&expected), "recorded: {:?}", seen);
}
