//! HTTP-level tests for the catalog, locations, ratings and seeding.

mod common;

use axum::http::StatusCode;
use common::{empty_app, spawn_app};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;

    let (status, json) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["service"], "marquee-api");
}

#[tokio::test]
async fn test_regions_and_cities() {
    let app = spawn_app().await;

    let (status, json) = app.get("/api/regions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    let (_, all) = app.get("/api/cities").await;
    let (_, scottish) = app.get("/api/cities?region=scotland").await;
    let names: Vec<&str> = scottish["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();

    assert_eq!(all["data"].as_array().unwrap().len(), 3);
    assert_eq!(names, ["Edinburgh", "Glasgow"]);
}

#[tokio::test]
async fn test_featured_and_by_type() {
    let app = spawn_app().await;

    let (status, json) = app.get("/api/creative-works/featured").await;
    assert_eq!(status, StatusCode::OK);
    let featured = json["data"].as_array().unwrap();
    assert_eq!(featured.len(), 2);
    assert!(featured.iter().all(|w| w["featured"] == true));

    let (status, json) = app.get("/api/creative-works/type/concert").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"][0]["kind"], "concert");

    let (status, json) = app.get("/api/creative-works/type/opera").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_search_requires_query() {
    let app = spawn_app().await;

    for uri in [
        "/api/creative-works/search",
        "/api/creative-works/search?q=",
        "/api/persons/search?q=%20%20",
    ] {
        let (status, _) = app.get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn test_search_matches_case_insensitively() {
    let app = spawn_app().await;

    let (status, json) = app.get("/api/creative-works/search?q=LIGHTHOUSE").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"][0]["slug"], "the-long-light");

    let (status, json) = app.get("/api/persons/search?q=okafor").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"][0]["full_name"], "Amara Okafor");
}

#[tokio::test]
async fn test_work_detail() {
    let app = spawn_app().await;

    let (status, json) = app.get("/api/creative-works/the-long-light").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["title"], "The Long Light");
    assert_eq!(json["data"]["showtimes"].as_array().unwrap().len(), 2);
    assert_eq!(json["data"]["rating"]["count"], 0);

    let (status, _) = app.get("/api/creative-works/no-such-work").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rating_a_work() {
    let app = spawn_app().await;
    let work = app
        .state
        .store
        .find_work_by_slug("harbour-walls")
        .await
        .unwrap()
        .unwrap();
    let uri = format!("/api/creative-works/{}/ratings", work.id);
    let user = app.user_token(Uuid::new_v4());

    let (status, _) = app.post(&uri, Some(&user), json!({ "score": 6 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post(&uri, Some(&user), json!({ "score": 2 })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.post(&uri, Some(&user), json!({ "score": 4 })).await;
    assert_eq!(status, StatusCode::OK);
    let other = app.user_token(Uuid::new_v4());
    app.post(&uri, Some(&other), json!({ "score": 5 })).await;

    let (_, json) = app.get("/api/creative-works/harbour-walls").await;
    assert_eq!(json["data"]["rating"]["count"], 2);
    assert_eq!(json["data"]["rating"]["average"], 4.5);

    let missing = format!("/api/creative-works/{}/ratings", Uuid::new_v4());
    let (status, _) = app.post(&missing, Some(&user), json!({ "score": 3 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_work_cascades() {
    let app = spawn_app().await;
    let work = app
        .state
        .store
        .find_work_by_slug("paper-cities")
        .await
        .unwrap()
        .unwrap();
    let uri = format!("/api/creative-works/{}", work.id);

    let user = app.user_token(Uuid::new_v4());
    let (status, _) = app.delete(&uri, &user).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.admin_token();
    let (status, json) = app.delete(&uri, &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["showtimes_removed"], 1);

    let (status, _) = app.get("/api/creative-works/paper-cities").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.delete(&uri, &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.delete("/api/creative-works/not-a-uuid", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_work_with_orders_is_refused() {
    let app = spawn_app().await;
    app.place_order(Uuid::new_v4(), 1).await;
    let work = app
        .state
        .store
        .find_work_by_slug("the-long-light")
        .await
        .unwrap()
        .unwrap();

    let (status, json) = app
        .delete(&format!("/api/creative-works/{}", work.id), &app.admin_token())
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_seed_endpoint() {
    let app = empty_app().await;
    let admin = app.admin_token();

    let (status, _) = app.post("/api/admin/seed", None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = app.post("/api/admin/seed", Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["creative_works"], 4);

    let (status, _) = app.post("/api/admin/seed", Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = spawn_app().await;
    let response = tower::ServiceExt::oneshot(
        app.router.clone(),
        axum::http::Request::builder()
            .uri("/health")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert!(!response.headers().contains_key("strict-transport-security"));
}
