// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use super::*;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use yare::parameterized;

fn api(base: &str) -> HttpApi {
    HttpApi::new(base, None, Duration::from_secs(5)).unwrap()
}

#[test]
fn endpoint_urls() {
    let api = api("http://evcc.local:7070/api");
    assert_eq!(
        api.state_url().unwrap().as_str(),
        "http://evcc.local:7070/api/state"
    );
    assert_eq!(
        api.plans_url("db:1").unwrap().as_str(),
        "http://evcc.local:7070/api/vehicles/db:1/plan/repeating"
    );
}

#[test]
fn trailing_slash_base_is_tolerated() {
    let api = api("http://evcc.local:7070/api/");
    assert_eq!(
        api.state_url().unwrap().as_str(),
        "http://evcc.local:7070/api/state"
    );
}

#[test]
fn vehicle_ids_are_escaped() {
    let api = api("http://evcc.local:7070/api");
    let url = api.plans_url("odd/id").unwrap();
    assert_eq!(url.path(), "/api/vehicles/odd%2Fid/plan/repeating");
}

#[test]
fn invalid_base_url_is_rejected() {
    let err = HttpApi::new("not a url", None, Duration::from_secs(1)).err().unwrap();
    assert!(matches!(err, TransportError::Request(_)));
}

#[test]
fn from_config_uses_scheme() {
    let mut conn = ConnectionConfig::new("evcc.local");
    conn.ssl = true;
    let api = HttpApi::from_config(&conn).unwrap();
    assert_eq!(api.base_url().as_str(), "https://evcc.local:7070/api");
}

fn state() -> Value {
    json!({
        "vehicles": {"db:1": {"title": "Car", "repeatingPlans": [
            {"time": "08:00", "weekdays": [1, 2], "soc": 80, "active": true}
        ]}},
        "loadpoints": [{"vehicleName": "db:1"}]
    })
}

#[test]
fn decode_state_plain_and_wrapped() {
    let plain = decode_state(Some(state())).unwrap();
    let wrapped = decode_state(Some(json!({"result": state()}))).unwrap();
    assert_eq!(plain, wrapped);
    assert_eq!(plain.vehicle("db:1").unwrap().plans.len(), 1);
}

#[test]
fn decode_state_rejects_empty_body() {
    assert!(matches!(decode_state(None), Err(TransportError::Decode(_))));
    assert!(matches!(
        decode_state(Some(json!([1]))),
        Err(TransportError::Decode(_))
    ));
}

fn submitted() -> Vec<Plan> {
    vec![Plan::new("07:30", vec![1, 2, 3], 80)]
}

#[parameterized(
    no_body = { None },
    null = { Some(json!(null)) },
    empty_object = { Some(json!({})) },
    wrapped_null = { Some(json!({"result": null})) },
    empty_list = { Some(json!([])) },
)]
fn empty_responses_mean_accepted(body: Option<Value>) {
    assert_eq!(decode_plans(body, &submitted()).unwrap(), submitted());
}

#[test]
fn response_list_is_authoritative() {
    let body = json!({"result": [{"time": "09:00", "weekdays": [0], "soc": 50, "active": false}]});
    let plans = decode_plans(Some(body), &submitted()).unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].time, "09:00");
    assert!(!plans[0].active);
}

#[test]
fn non_list_response_is_decode_error() {
    let err = decode_plans(Some(json!({"error": "x"})), &submitted()).unwrap_err();
    assert!(matches!(err, TransportError::Decode(_)));
}

/// Serves one canned HTTP response and returns the raw request it received.
async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}/api", listener.local_addr().unwrap());
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let length = text[..header_end]
                    .lines()
                    .find_map(|l| {
                        let lower = l.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap())
                    })
                    .unwrap_or(0);
                if request.len() >= header_end + 4 + length {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&request).into_owned()
    });
    (base, handle)
}

#[tokio::test]
async fn fetch_snapshot_over_http() {
    let (base, server) = serve_once("200 OK", &state().to_string()).await;
    let api = HttpApi::new(&base, Some("secret".into()), Duration::from_secs(5)).unwrap();

    let snapshot = api.fetch_snapshot().await.unwrap();
    assert_eq!(snapshot.active_vehicles(), ["db:1".to_string()]);

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /api/state "));
    assert!(request
        .to_ascii_lowercase()
        .contains("authorization: bearer secret"));
}

#[tokio::test]
async fn submit_plans_posts_full_list() {
    let (base, server) = serve_once("200 OK", "").await;
    let api = api(&base);

    let plans = api.submit_plans("db:1", &submitted()).await.unwrap();
    assert_eq!(plans, submitted());

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/vehicles/db:1/plan/repeating "));
    let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
    let sent: Value = serde_json::from_str(body).unwrap();
    assert_eq!(sent[0]["time"], "07:30");
    assert_eq!(sent[0]["weekdays"], json!([1, 2, 3]));
}

#[tokio::test]
async fn rejection_carries_status_and_body() {
    let (base, _server) = serve_once("404 Not Found", "vehicle not found").await;
    let api = api(&base);

    let err = api.submit_plans("db:9", &submitted()).await.unwrap_err();
    match err {
        TransportError::Http { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "vehicle not found");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unreachable_host_is_request_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}/api", listener.local_addr().unwrap());
    drop(listener);

    let err = api(&base).fetch_snapshot().await.unwrap_err();
    assert!(matches!(err, TransportError::Request(_)));
}
