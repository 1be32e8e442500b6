mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;

use common::{pdf_bytes, TestApp};
use studydrop_server::db::UploadRepository;
use studydrop_server::storage::ObjectStore;

#[tokio::test]
async fn unknown_college_is_a_bad_request() {
    let app = TestApp::new().await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            json!({
                "email": "ada@example.edu",
                "username": "ada",
                "password": "correct-horse",
                "college_id": "no-such-college",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(body["code"], "bad_request");

    let (token, _) = app.register("ada").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/classes",
            Some(&token),
            json!({ "code": "BIO 1", "name": "Biology", "college_id": "no-such-college" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(body["code"], "bad_request");

    let (status, body) = app
        .json(
            Method::PUT,
            "/api/users/me",
            Some(&token),
            json!({ "college_id": "no-such-college" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn existing_college_is_accepted() {
    let app = TestApp::new().await;
    let (admin, _) = app.register_admin("dean").await;

    let (status, college) = app
        .json(Method::POST, "/api/colleges", Some(&admin), json!({ "name": "State University" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", college);
    let college_id = college["id"].as_str().unwrap();

    let (status, class) = app
        .json(
            Method::POST,
            "/api/classes",
            Some(&admin),
            json!({ "code": "BIO 1", "name": "Biology", "college_id": college_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", class);
    assert_eq!(class["college_id"], college_id);

    let (status, me) = app
        .json(Method::PUT, "/api/users/me", Some(&admin), json!({ "college_id": college_id }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", me);
    assert_eq!(me["college_id"], college_id);
}

#[tokio::test]
async fn missing_field_is_a_json_bad_request() {
    let app = TestApp::new().await;

    let (status, body) = app
        .json(Method::POST, "/api/auth/register", None, json!({ "email": "x@uni.edu" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
    assert!(body["error"].as_str().unwrap().contains("username"), "{}", body);
}

#[tokio::test]
async fn malformed_body_and_query_are_json_bad_requests() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/classes")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from("{\"code\": "))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .body(Body::from("email=a"))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");

    let (status, body) = app.get("/api/notifications?limit=lots", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn search_treats_wildcards_literally() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada").await;
    let class_id = app.create_class(&token, "STAT 2").await;

    for title in ["100% effort", "1000 words", "chi_square"] {
        let (status, _) = app
            .upload(&token, "doc.pdf", "application/pdf", &pdf_bytes(), &[("class_id", class_id.as_str()), ("title", title)])
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, found) = app.get("/api/uploads?q=100%25", Some(&token)).await;
    let titles: Vec<&str> = found
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["100% effort"]);

    // "0_w" would match "1000 words" if `_` were a wildcard
    let (_, found) = app.get("/api/uploads?q=0_w", Some(&token)).await;
    assert!(found.as_array().unwrap().is_empty(), "{}", found);

    let (_, found) = app.get("/api/uploads?q=i_s", Some(&token)).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["title"], "chi_square");
}

#[tokio::test]
async fn download_of_missing_object_records_nothing() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada").await;
    let class_id = app.create_class(&token, "GEO 3").await;

    let (_, created) = app
        .upload(&token, "map.pdf", "application/pdf", &pdf_bytes(), &[("class_id", class_id.as_str()), ("title", "Map")])
        .await;
    let id = created["id"].as_str().unwrap();

    let upload = UploadRepository::new(app.state.db())
        .get(id)
        .await
        .unwrap()
        .unwrap();
    app.store.delete_object(&upload.storage_key).await.unwrap();

    let (status, body) = app
        .json(Method::POST, &format!("/api/downloads/{}", id), Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{}", body);

    let (_, history) = app.get("/api/downloads", Some(&token)).await;
    assert!(history.as_array().unwrap().is_empty());
    let (_, upload) = app.get(&format!("/api/uploads/{}", id), Some(&token)).await;
    assert_eq!(upload["download_count"], 0);
}
