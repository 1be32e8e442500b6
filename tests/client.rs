mod common;

use std::net::SocketAddr;

use common::{pdf_bytes, TestApp};
use studydrop_server::client::{ApiClient, ClientError, UploadMetadata, UploadQuery};
use studydrop_server::db::CreateClass;

/// Serve the test app on an ephemeral port
async fn serve(app: &TestApp) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn second_get_is_served_from_cache_until_a_mutation() {
    let app = TestApp::new().await;
    let addr = serve(&app).await;
    let client = ApiClient::new(&format!("http://{}", addr)).unwrap();

    client.register("ada@example.edu", "ada", "correct-horse").await.unwrap();

    let first = client.classes(None).await.unwrap();
    let second = client.classes(None).await.unwrap();
    assert!(first.is_empty() && second.is_empty());

    let stats = client.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.entries, 1);

    client
        .create_class(&CreateClass {
            code: "BIO 210".into(),
            name: "Genetics".into(),
            description: None,
            college_id: None,
        })
        .await
        .unwrap();
    assert_eq!(client.cache_stats().entries, 0);

    let refreshed = client.classes(None).await.unwrap();
    assert_eq!(refreshed.len(), 1);
    assert_eq!(client.cache_stats().hits, 1);
}

#[tokio::test]
async fn api_errors_carry_status_and_message() {
    let app = TestApp::new().await;
    let addr = serve(&app).await;
    let client = ApiClient::new(&format!("http://{}", addr)).unwrap();

    match client.me().await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Access token required");
        }
        other => panic!("expected api error, got {:?}", other.map(|u| u.id)),
    }

    client.register("ada@example.edu", "ada", "correct-horse").await.unwrap();
    match client.register("ada@example.edu", "ada", "correct-horse").await {
        Err(ClientError::Api { status, .. }) => assert_eq!(status, 400),
        other => panic!("expected api error, got {:?}", other.map(|a| a.token)),
    }
}

#[tokio::test]
async fn client_uploads_and_searches() {
    let app = TestApp::new().await;
    let addr = serve(&app).await;
    let client = ApiClient::new(&format!("http://{}", addr)).unwrap();
    client.register("ada@example.edu", "ada", "correct-horse").await.unwrap();

    let class = client
        .create_class(&CreateClass {
            code: "CHEM 5".into(),
            name: "Organic".into(),
            description: None,
            college_id: None,
        })
        .await
        .unwrap();

    let upload = client
        .upload_file(
            &class.id,
            "alkenes.pdf",
            "application/pdf",
            pdf_bytes(),
            &UploadMetadata {
                title: Some("Alkene reactions".into()),
                category: Some("notes".into()),
                tags: vec!["organic".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(upload.tags, vec!["organic"]);

    let found = client
        .search_uploads(&UploadQuery {
            tag: Some("organic".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "Alkene reactions");

    let link = client.record_download(&upload.id).await.unwrap();
    assert_eq!(link.upload_id, upload.id);

    client.delete_upload(&upload.id).await.unwrap();
    assert!(client.class_uploads(&class.id).await.unwrap().is_empty());
}
