//! HTTP API tests against the router, without binding a socket.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use portfolio_checkup::{build_router, AppState};
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "checkup-test-boundary";

fn test_app(upload_dir: &std::path::Path) -> axum::Router {
    build_router(AppState::new(upload_dir))
}

fn multipart_body(field: &str, file_name: &str, contents: &str) -> Body {
    Body::from(format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: text/csv\r\n\r\n{contents}\r\n--{b}--\r\n",
        b = BOUNDARY,
    ))
}

fn upload(body: Body) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(body)
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_healthy() {
    let dir = tempfile::tempdir().unwrap();
    let response = test_app(dir.path())
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "portfolio-checkup");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn demo_data_payload() {
    let dir = tempfile::tempdir().unwrap();
    let response = test_app(dir.path())
        .oneshot(Request::builder().uri("/api/demo-data").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);

    let data = &json["data"];
    assert_eq!(data["totalStocks"], 3);
    assert_eq!(data["totalInvested"], 710000.0);
    assert_eq!(data["currentValue"], 735000.0);
    assert_eq!(data["totalLoss"], 25000.0);
    assert_eq!(data["stocksMatrix"].as_array().unwrap().len(), 3);
    assert_eq!(data["sectorAllocation"][0]["sector"], "Energy & Utilities");
}

#[tokio::test]
async fn analyze_uploaded_csv() {
    let dir = tempfile::tempdir().unwrap();
    let csv = "Symbol,Quantity,Avg Price,Current Price\nCDSL,289,1723,1419.9\nGSFC,384,275,173.45\n";

    let response = test_app(dir.path())
        .oneshot(upload(multipart_body("file", "holdings.csv", csv)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(
        json["message"],
        "Successfully analyzed portfolio with 2 stocks"
    );
    assert_eq!(json["data"]["totalStocks"], 2);

    // upload is removed once parsed
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_uploads_with_same_name_stay_separate() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    let one = "Symbol,Quantity,Avg Price,Current Price\nTCS,50,3200,3500\n";
    let three = "Symbol,Quantity,Avg Price,Current Price\nTCS,50,3200,3500\nINFY,200,1500,1600\nRELIANCE,100,2500,2400\n";

    let mut requests = Vec::new();
    for i in 0..8 {
        let contents = if i % 2 == 0 { one } else { three };
        let app = app.clone();
        requests.push(tokio::spawn(async move {
            let response = app
                .oneshot(upload(multipart_body("file", "holdings.csv", contents)))
                .await
                .unwrap();
            (i, response.status(), json_body(response).await)
        }));
    }

    for request in requests {
        let (i, status, json) = request.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        let expected = if i % 2 == 0 { 1 } else { 3 };
        assert_eq!(json["data"]["totalStocks"], expected);
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn non_csv_upload_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let response = test_app(dir.path())
        .oneshot(upload(multipart_body("file", "holdings.xlsx", "binary")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "UNSUPPORTED_FILE");
}

#[tokio::test]
async fn missing_file_field_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let response = test_app(dir.path())
        .oneshot(upload(multipart_body("attachment", "holdings.csv", "Symbol\nTCS\n")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn csv_without_symbol_column_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let response = test_app(dir.path())
        .oneshot(upload(multipart_body("file", "bad.csv", "Name,Value\nfoo,1\n")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["code"], "MISSING_COLUMN");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn non_multipart_request_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let response = test_app(dir.path())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/analyze")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
}
