//! Shared helpers for HTTP-level tests.
//!
//! Requests go straight into the router via `tower::ServiceExt::oneshot`,
//! backed by a seeded in-memory store.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use marquee_server::auth::{generate_token, ROLE_ADMIN, ROLE_USER};
use marquee_server::config::Config;
use marquee_server::models::Showtime;
use marquee_server::routes::create_routes;
use marquee_server::seed;
use marquee_server::state::AppState;
use marquee_server::store::MemoryStore;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn user_token(&self, user_id: Uuid) -> String {
        generate_token(user_id, ROLE_USER, &self.state.config.jwt).unwrap()
    }

    pub fn admin_token(&self) -> String {
        generate_token(Uuid::new_v4(), ROLE_ADMIN, &self.state.config.jwt).unwrap()
    }

    /// First showtime of the newest featured work.
    pub async fn showtime(&self) -> Showtime {
        let work = self.state.store.featured_works().await.unwrap().remove(0);
        self.state
            .store
            .showtimes_for_work(work.id)
            .await
            .unwrap()
            .remove(0)
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, None).await
    }

    pub async fn get_auth(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// Place an order through the API and return the response `data`.
    pub async fn place_order(&self, buyer: Uuid, quantity: i32) -> Value {
        let showtime = self.showtime().await;
        let (status, json) = self
            .post(
                "/api/orders",
                Some(&self.user_token(buyer)),
                serde_json::json!({ "showtime_id": showtime.id, "quantity": quantity }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["data"].clone()
    }
}

fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "JWT_SECRET" => Some("integration-jwt-secret".to_string()),
        "QR_SECRET" => Some("integration-qr-secret".to_string()),
        "STORAGE_BACKEND" => Some("memory".to_string()),
        _ => None,
    })
    .unwrap()
}

pub async fn empty_app() -> TestApp {
    let state = AppState::new(Arc::new(MemoryStore::new()), test_config());
    TestApp {
        router: create_routes(state.clone()),
        state,
    }
}

pub async fn spawn_app() -> TestApp {
    let app = empty_app().await;
    seed::run(app.state.store.as_ref()).await.unwrap();
    app
}
