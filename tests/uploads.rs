mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use common::{pdf_bytes, TestApp};
use studydrop_server::Config;

#[tokio::test]
async fn upload_round_trips_through_class_listing() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada").await;
    let class_id = app.create_class(&token, "BIO 210").await;

    let (status, created) = app
        .upload(
            &token,
            "week3.pdf",
            "application/pdf",
            &pdf_bytes(),
            &[
                ("class_id", class_id.as_str()),
                ("title", "Mendelian Genetics"),
                ("summary", "Punnett squares and ratios"),
                ("category", "notes"),
                ("tags", r#"["Genetics", "peas"]"#),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert!(created.get("storage_key").is_none());
    assert_eq!(created["file_size"], pdf_bytes().len());
    assert_eq!(created["file_hash"].as_str().unwrap().len(), 64);

    let (status, listing) = app
        .get(&format!("/api/classes/{}/uploads", class_id), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);

    let uploads = listing.as_array().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0]["title"], "Mendelian Genetics");
    assert_eq!(uploads[0]["category"], "notes");
    assert_eq!(uploads[0]["tags"], json!(["Genetics", "peas"]));
    assert_eq!(uploads[0]["uploader"], "ada");
    assert_eq!(app.store.len().await, 1);
}

#[tokio::test]
async fn missing_metadata_falls_back_to_file_name() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada").await;
    let class_id = app.create_class(&token, "BIO 210").await;

    let (status, created) = app
        .upload(
            &token,
            "cell_biology_midterm.pdf",
            "application/pdf",
            &pdf_bytes(),
            &[("class_id", class_id.as_str())],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["title"], "Cell Biology Midterm");
    assert_eq!(created["category"], "exam");
    assert_eq!(created["tags"], json!(["cell", "biology", "midterm"]));
}

#[tokio::test]
async fn upload_rejects_bad_input() {
    let mut config = Config::default();
    config.uploads.max_bytes = 1024;
    let app = TestApp::with_config(config).await;
    let (token, _) = app.register("ada").await;
    let class_id = app.create_class(&token, "CS 101").await;

    let (status, _) = app
        .upload(&token, "essay.docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document", b"PK..", &[("class_id", class_id.as_str())])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .upload(&token, "huge.pdf", "application/pdf", &vec![b'x'; 2048], &[("class_id", class_id.as_str())])
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], "payload_too_large");

    let (status, _) = app
        .upload(&token, "notes.pdf", "application/pdf", &pdf_bytes(), &[("class_id", "no-such-class")])
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .upload(&token, "notes.pdf", "application/pdf", &pdf_bytes(), &[("category", "poetry"), ("class_id", class_id.as_str())])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn delete_is_owner_or_admin_only() {
    let app = TestApp::new().await;
    let (owner, _) = app.register("owner").await;
    let (other, _) = app.register("other").await;
    let (admin, _) = app.register_admin("admin").await;
    let class_id = app.create_class(&owner, "PHYS 1").await;

    let mut ids = Vec::new();
    for name in ["a.pdf", "b.pdf"] {
        let (_, created) = app
            .upload(&owner, name, "application/pdf", &pdf_bytes(), &[("class_id", class_id.as_str()), ("title", name)])
            .await;
        ids.push(created["id"].as_str().unwrap().to_string());
    }

    let (status, body) = app.delete(&format!("/api/uploads/{}", ids[0]), &other).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
    assert_eq!(app.store.len().await, 2);

    let (status, _) = app.delete(&format!("/api/uploads/{}", ids[0]), &owner).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.delete(&format!("/api/uploads/{}", ids[1]), &admin).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert!(app.store.is_empty().await);
    let (status, _) = app.get(&format!("/api/uploads/{}", ids[0]), Some(&owner)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_is_owner_only_and_normalises_category() {
    let app = TestApp::new().await;
    let (owner, _) = app.register("owner").await;
    let (other, _) = app.register("other").await;
    let class_id = app.create_class(&owner, "MATH 2").await;

    let (_, created) = app
        .upload(&owner, "sheet.pdf", "application/pdf", &pdf_bytes(), &[("class_id", class_id.as_str())])
        .await;
    let uri = format!("/api/uploads/{}", created["id"].as_str().unwrap());

    let (status, _) = app
        .json(Method::PUT, &uri, Some(&other), json!({ "title": "Mine now" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .json(
            Method::PUT,
            &uri,
            Some(&owner),
            json!({ "title": "Formula Sheet", "category": "Study Guide", "tags": ["calculus"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["title"], "Formula Sheet");
    assert_eq!(updated["category"], "study_guide");
    assert_eq!(updated["tags"], json!(["calculus"]));
}

#[tokio::test]
async fn search_filters_by_tag_and_category() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada").await;
    let class_id = app.create_class(&token, "CHEM 5").await;

    for (title, category, tags) in [
        ("Orgo lab 1", "lab", "chemistry,organic"),
        ("Orgo final", "exam", "chemistry"),
    ] {
        let (status, _) = app
            .upload(
                &token,
                "doc.pdf",
                "application/pdf",
                &pdf_bytes(),
                &[("class_id", class_id.as_str()), ("title", title), ("category", category), ("tags", tags)],
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, by_tag) = app.get("/api/uploads?tag=organic", Some(&token)).await;
    assert_eq!(by_tag.as_array().unwrap().len(), 1);
    assert_eq!(by_tag[0]["title"], "Orgo lab 1");

    let (_, by_category) = app.get("/api/uploads?category=exam", Some(&token)).await;
    assert_eq!(by_category.as_array().unwrap().len(), 1);
    assert_eq!(by_category[0]["title"], "Orgo final");

    let (_, recent) = app.get("/api/uploads/recent?limit=1", Some(&token)).await;
    assert_eq!(recent.as_array().unwrap().len(), 1);
    assert_eq!(recent[0]["title"], "Orgo final");
}

#[tokio::test]
async fn proxy_and_signed_url_serve_the_stored_file() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada").await;
    let class_id = app.create_class(&token, "ART 9").await;

    let (_, created) = app
        .upload(&token, "sketch.png", "image/png", b"\x89PNG fake", &[("class_id", class_id.as_str()), ("title", "Sketch")])
        .await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/proxy/{}", id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .starts_with("inline; filename=\"sketch.png\""));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"\x89PNG fake");

    let (status, signed) = app.get(&format!("/api/uploads/{}/url", id), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(signed["url"].as_str().unwrap().starts_with("memory://"));
    assert_eq!(signed["mime_type"], "image/png");
}
