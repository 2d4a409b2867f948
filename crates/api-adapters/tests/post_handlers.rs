use std::sync::Arc;

use api_adapters::{router, AppState};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use services::{AttachmentLayout, PostService, ReconcileLimits};
use storage_adapters::{LocalFileStore, MemoryPostRepository};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "community-board-test-boundary";

struct Form {
    body: Vec<u8>,
}

impl Form {
    fn new() -> Self {
        Self { body: Vec::new() }
    }

    fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    fn file(mut self, file_name: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn put(mut self, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

fn put_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

struct TestApp {
    _tmp: TempDir,
    app: Router,
}

impl TestApp {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let service = PostService::new(
            Arc::new(MemoryPostRepository::new()),
            Arc::new(LocalFileStore::new()),
            AttachmentLayout::new(tmp.path().join("dbFiles")),
            ReconcileLimits::default(),
        );
        let app = router(
            AppState {
                service: Arc::new(service),
            },
            10 * 1024 * 1024,
        );
        Self { _tmp: tmp, app }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = self.send(request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn create(&self, files: &[(&str, &[u8])]) -> Value {
        let mut form = Form::new()
            .text("title", "Lashing check")
            .text("text", "Bay 14 lashing bars loose")
            .text("vesselCode", "HMMX")
            .text("bay", "14");
        for (name, bytes) in files {
            form = form.file(name, bytes);
        }
        let (status, body) = self.send_json(form.put("/community/create")).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["result"].clone()
    }
}

fn images(post: &Value) -> Vec<String> {
    post["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn create_places_uploads_and_serves_them() {
    let app = TestApp::new();
    let post = app.create(&[("a.jpg", b"first".as_slice()), ("b.png", b"second".as_slice())]).await;

    let id = post["communityId"].as_str().unwrap().to_string();
    let refs = images(&post);
    assert_eq!(refs.len(), 2);
    assert!(refs[0].starts_with(&format!("dbFiles/{id}/1-")));
    assert!(refs[0].ends_with(".jpg"));
    assert!(refs[1].starts_with(&format!("dbFiles/{id}/2-")));
    assert_eq!(post["isHold"], json!(true));
    assert_eq!(post["isLD"], json!(true));

    let (status, bytes) = app
        .send(
            Request::builder()
                .uri(format!("/{}", refs[1]))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"second");
}

#[tokio::test]
async fn update_reorders_deletes_and_appends() {
    let app = TestApp::new();
    let post = app
        .create(&[("a.jpg", b"A".as_slice()), ("b.jpg", b"B".as_slice()), ("c.jpg", b"C".as_slice())])
        .await;
    let id = post["communityId"].as_str().unwrap().to_string();
    let refs = images(&post);

    let changed = json!([{ "index": 0, "url": refs[2] }, { "index": 1, "url": refs[0] }]);
    let deleted = json!([refs[1]]);
    let request = Form::new()
        .text("communityId", &id)
        .text("title", "Lashing check (fixed)")
        .text("isHold", "false")
        .text("isLD", "true")
        .text("changedImages", &changed.to_string())
        .text("deletedImages", &deleted.to_string())
        .file("d.gif", b"D")
        .put("/community/update");

    let (status, body) = app.send_json(request).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let updated = &body["result"];
    assert_eq!(updated["title"], json!("Lashing check (fixed)"));
    assert_eq!(updated["isHold"], json!(false));

    let new_refs = images(updated);
    assert_eq!(new_refs.len(), 3);
    let mut served = Vec::new();
    for reference in &new_refs {
        let (status, bytes) = app
            .send(
                Request::builder()
                    .uri(format!("/{reference}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        served.push(bytes);
    }
    assert_eq!(served, vec![b"C".to_vec(), b"A".to_vec(), b"D".to_vec()]);
    assert!(new_refs[2].ends_with(".gif"));
}

#[tokio::test]
async fn malformed_change_list_is_rejected() {
    let app = TestApp::new();
    let post = app.create(&[("a.jpg", b"A".as_slice())]).await;
    let id = post["communityId"].as_str().unwrap().to_string();

    let request = Form::new()
        .text("communityId", &id)
        .text("changedImages", "[{\"index\": -1, \"url\": \"x\"}]")
        .put("/community/update");
    let (status, body) = app.send_json(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["result"]["errorCode"], json!(400));

    let (_, body) = app
        .send_json(put_json("/community/read", json!({ "communityId": id })))
        .await;
    assert_eq!(images(&body["result"]), images(&post));
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_not_found() {
    let app = TestApp::new();
    for id in ["0190c1b2-0000-7000-8000-000000000000", "not-an-id"] {
        let (status, body) = app
            .send_json(put_json("/community/read", json!({ "communityId": id })))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["result"]["errorCode"], json!(404));
    }
}

#[tokio::test]
async fn delete_removes_post_and_files() {
    let app = TestApp::new();
    let post = app.create(&[("a.jpg", b"A".as_slice())]).await;
    let id = post["communityId"].as_str().unwrap().to_string();
    let reference = images(&post).remove(0);

    let (status, body) = app
        .send_json(put_json("/community/delete", json!({ "communityId": id })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["communityId"], json!(id));

    let (status, _) = app
        .send_json(put_json("/community/read", json!({ "communityId": id })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            Request::builder()
                .uri(format!("/{reference}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_searches_case_insensitively_and_treats_negative_page_as_first() {
    let app = TestApp::new();
    app.create(&[]).await;
    let request = Form::new()
        .text("title", "Reefer alarm")
        .text("vesselCode", "KMTC")
        .put("/community/create");
    let (status, _) = app.send_json(request).await;
    assert_eq!(status, StatusCode::OK);

    let (_, hits) = app
        .send_json(put_json(
            "/community/read/list",
            json!({ "search": "kmtc", "page": 0 }),
        ))
        .await;
    let communities = hits["result"]["communities"].as_array().unwrap();
    assert_eq!(communities.len(), 1);
    assert_eq!(communities[0]["title"], json!("Reefer alarm"));

    let (_, first) = app
        .send_json(put_json("/community/read/list", json!({ "search": "", "page": 0 })))
        .await;
    let (_, unskipped) = app
        .send_json(put_json("/community/read/list", json!({ "page": -1 })))
        .await;
    assert_eq!(first["result"], unskipped["result"]);
    assert_eq!(first["result"]["communities"].as_array().unwrap().len(), 2);
}
