//! End-to-end tests that drive the router over the in-memory store.

use api_lib::config::Config;
use api_lib::web::{auth::hash_password, router, AppState};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use flashdeck_core::{InMemoryStore, NewUser, Role};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const PASSWORD: &str = "Secret#123";

struct TestApp {
    app: Router,
    state: Arc<AppState>,
}

struct Reply {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: Value,
}

impl TestApp {
    fn new() -> Self {
        let config = Config::from_source(|key| match key {
            "DATABASE_URL" => Some("memory://".to_string()),
            "SECRET_KEY" => Some("test-secret-key-0123456789".to_string()),
            _ => None,
        })
        .unwrap();
        let state = Arc::new(AppState::new(Arc::new(config), Arc::new(InMemoryStore::new())).unwrap());
        Self {
            app: router(state.clone()),
            state,
        }
    }

    async fn send(&self, method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Reply { status, headers, body }
    }

    async fn register(&self, username: &str) -> Reply {
        self.send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": PASSWORD,
                "confirm_password": PASSWORD,
            })),
        )
        .await
    }

    /// Logs in and returns the `session=...` cookie pair.
    async fn login(&self, username: &str) -> String {
        let reply = self
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "username": username, "password": PASSWORD })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        let set_cookie = reply.headers[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn user(&self, username: &str) -> String {
        assert_eq!(self.register(username).await.status, StatusCode::CREATED);
        self.login(username).await
    }

    async fn admin(&self, username: &str) -> String {
        self.state
            .accounts
            .ensure_admin(NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                hashed_password: hash_password(PASSWORD).unwrap(),
                role: Role::Admin,
            })
            .await
            .unwrap()
            .unwrap();
        self.login(username).await
    }

    async fn add_card(&self, cookie: &str, topic: &str, question: &str, answer: &str) -> Value {
        let reply = self
            .send(
                Method::POST,
                "/cards",
                Some(cookie),
                Some(json!({ "topic": topic, "question": question, "answer": answer })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        reply.body
    }
}

#[tokio::test]
async fn protected_routes_need_a_session() {
    let t = TestApp::new();
    let reply = t.send(Method::GET, "/topics", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = t.send(Method::GET, "/topics", Some("session=bogus"), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_validates_and_rejects_duplicates() {
    let t = TestApp::new();
    let reply = t
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "username": "amy",
                "email": "nope",
                "password": "short",
                "confirm_password": "short",
            })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["details"]
        .as_array()
        .unwrap()
        .contains(&json!("Email not valid")));

    assert_eq!(t.register("amy").await.status, StatusCode::CREATED);
    let reply = t.register("amy").await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.body["error"], "Username not available");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let t = TestApp::new();
    t.register("amy").await;
    let reply = t
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "amy", "password": "Secret#124" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "Invalid username or password");
}

#[tokio::test]
async fn logout_ends_the_session() {
    let t = TestApp::new();
    let cookie = t.user("amy").await;
    assert_eq!(t.send(Method::GET, "/dashboard", Some(&cookie), None).await.status, StatusCode::OK);

    let reply = t.send(Method::POST, "/auth/logout", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.headers[header::SET_COOKIE].to_str().unwrap().contains("Max-Age=0"));
    assert_eq!(
        t.send(Method::GET, "/dashboard", Some(&cookie), None).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn topics_list_real_and_revision_buckets() {
    let t = TestApp::new();
    let cookie = t.user("amy").await;
    let card = t.add_card(&cookie, " Math ", "1+1", "2").await;
    assert_eq!(card["topic"], "math");
    assert_eq!(card["ease"], 0);

    let reply = t.send(Method::GET, "/topics", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let keys: Vec<&str> = reply.body["topics"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["math", "revision", "revision - math"]);

    for topic in ["Revision".to_string(), "revision - math".to_string(), "t".repeat(121)] {
        let reply = t
            .send(
                Method::POST,
                "/cards",
                Some(&cookie),
                Some(json!({ "topic": topic, "question": "q", "answer": "a" })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn reviewing_a_card_flips_and_grades_it() {
    let t = TestApp::new();
    let cookie = t.user("amy").await;
    t.add_card(&cookie, "math", "1+1", "2").await;

    let shown = t.send(Method::GET, "/topics/math/next/question", Some(&cookie), None).await;
    assert_eq!(shown.status, StatusCode::OK);
    assert_eq!(shown.body["text"], "1+1");
    assert_eq!(shown.body["total"], 1);
    assert_eq!(shown.body["complete"], 1);
    let token = shown.body["token"].as_str().unwrap().to_string();
    assert_ne!(token, "1");

    let flipped = t
        .send(Method::POST, &format!("/topics/math/{}/question/flip", token), Some(&cookie), None)
        .await;
    assert_eq!(flipped.body["side"], "answer");
    assert_eq!(flipped.body["text"], "2");

    let graded = t
        .send(Method::POST, &format!("/topics/math/{}/answer/correct", token), Some(&cookie), None)
        .await;
    assert_eq!(graded.status, StatusCode::OK);
    assert_eq!(graded.body["side"], "question");
    assert_eq!(graded.body["times_correct"], 1);
    assert_eq!(graded.body["ease"], 100);

    let graded = t
        .send(Method::POST, &format!("/topics/math/{}/question/wrong", token), Some(&cookie), None)
        .await;
    assert_eq!(graded.body["times_wrong"], 1);
    assert_eq!(graded.body["ease"], 50);
}

#[tokio::test]
async fn empty_topics_redirect_to_the_topic_list() {
    let t = TestApp::new();
    let cookie = t.user("amy").await;

    let reply = t.send(Method::GET, "/topics/history/next/question", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.headers[header::LOCATION], "/topics");
    assert_eq!(reply.body["notice"], "No cards exists for this topic.");
}

#[tokio::test]
async fn bad_review_requests_are_rejected() {
    let t = TestApp::new();
    let cookie = t.user("amy").await;
    t.add_card(&cookie, "math", "1+1", "2").await;

    let reply = t.send(Method::GET, "/topics/math/next/sideways", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = t
        .send(Method::POST, "/topics/math/not-a-token/question/correct", Some(&cookie), None)
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cards_of_other_users_are_invisible() {
    let t = TestApp::new();
    let amy = t.user("amy").await;
    let tom = t.user("tom").await;
    let card = t.add_card(&amy, "math", "1+1", "2").await;
    let id = card["id"].as_i64().unwrap();

    let body = json!({ "topic": "math", "question": "2+2", "answer": "4" });
    let reply = t.send(Method::PUT, &format!("/cards/{}", id), Some(&tom), Some(body.clone())).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    let reply = t.send(Method::DELETE, &format!("/cards/{}", id), Some(&tom), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = t.send(Method::PUT, &format!("/cards/{}", id), Some(&amy), Some(body)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["question"], "2+2");
}

#[tokio::test]
async fn drafts_prefill_the_card_form() {
    let t = TestApp::new();
    let cookie = t.user("amy").await;
    let card = t.add_card(&cookie, "world history", "who?", "them").await;
    let id = card["id"].as_i64().unwrap();

    let reply = t
        .send(Method::GET, &format!("/cards/{}/draft?mode=edit", id), Some(&cookie), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["topic"], "World History");
    assert_eq!(reply.body["question"], "Who?");

    let reply = t
        .send(Method::GET, &format!("/cards/{}/draft?mode=new", id), Some(&cookie), None)
        .await;
    assert_eq!(reply.body["card_id"], Value::Null);
    assert_eq!(reply.body["question"], Value::Null);
}

#[tokio::test]
async fn password_change_needs_the_current_password() {
    let t = TestApp::new();
    let cookie = t.user("amy").await;
    let change = |current: &str| {
        json!({
            "password": current,
            "new_password": "Better#456",
            "confirm_password": "Better#456",
        })
    };

    let reply = t
        .send(Method::POST, "/auth/password", Some(&cookie), Some(change("Wrong#999")))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = t
        .send(Method::POST, "/auth/password", Some(&cookie), Some(change(PASSWORD)))
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = t
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "amy", "password": "Better#456" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn admins_manage_users_but_keep_one_admin() {
    let t = TestApp::new();
    let admin = t.admin("root").await;
    let amy = t.user("amy").await;
    t.add_card(&amy, "math", "1+1", "2").await;

    let reply = t.send(Method::GET, "/admin/users", Some(&amy), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = t.send(Method::GET, "/admin/users", Some(&admin), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let users = reply.body.as_array().unwrap().clone();
    assert_eq!(users.len(), 2);
    let root_id = users[0]["id"].as_i64().unwrap();
    let amy_id = users[1]["id"].as_i64().unwrap();

    let reply = t.send(Method::DELETE, &format!("/admin/users/{}", root_id), Some(&admin), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body["error"], "Must have at least one admin");

    let reply = t.send(Method::DELETE, &format!("/admin/users/{}", amy_id), Some(&admin), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "amy has been deleted successfully");
    assert_eq!(reply.body["logged_out"], false);
    assert_eq!(
        t.send(Method::GET, "/topics", Some(&amy), None).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn admin_demoting_themselves_is_logged_out() {
    let t = TestApp::new();
    let root = t.admin("root").await;
    t.user("amy").await;

    let users = t.send(Method::GET, "/admin/users", Some(&root), None).await.body;
    let root_id = users[0]["id"].as_i64().unwrap();
    let amy_id = users[1]["id"].as_i64().unwrap();

    let reply = t.send(Method::POST, &format!("/admin/users/{}/role", amy_id), Some(&root), None).await;
    assert_eq!(reply.body["user"]["role"], "Admin");

    let reply = t.send(Method::POST, &format!("/admin/users/{}/role", root_id), Some(&root), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["logged_out"], true);
    assert_eq!(
        t.send(Method::GET, "/dashboard", Some(&root), None).await.status,
        StatusCode::UNAUTHORIZED
    );
}
