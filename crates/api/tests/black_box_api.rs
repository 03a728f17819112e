use std::time::Duration;

use maintops_api::config::AppConfig;
use reqwest::StatusCode;
use serde_json::{Value, json};

const ADMIN_PASSWORD: &str = "test-admin-pw";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod (in-memory stores), bound to an ephemeral port.
        let config = AppConfig {
            admin_password: ADMIN_PASSWORD.to_string(),
            ..AppConfig::default()
        };
        let app = maintops_api::app::build_app(&config)
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}/api/v1", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, client: &reqwest::Client, login: &str, password: &str) -> String {
        let res = client
            .post(self.url("/auth/login"))
            .json(&json!({ "login": login, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn admin_token(&self, client: &reqwest::Client) -> String {
        self.login(client, "admin", ADMIN_PASSWORD).await
    }

    async fn create(&self, client: &reqwest::Client, token: &str, path: &str, body: Value) -> String {
        let res = client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED, "POST {path}");
        let body: Value = res.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_is_public_and_everything_else_needs_a_session() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/workorders")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");

    let res = client
        .get(srv.url("/auth/me"))
        .bearer_auth("never-issued")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_sets_a_cookie_and_logout_ends_the_session() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "login": "admin", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "login": "admin", "password": ADMIN_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["ok"], true);
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 32);

    let session_cookie = format!("session={token}");
    let res = client
        .get(srv.url("/auth/me"))
        .header(reqwest::header::COOKIE, &session_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let me: Value = res.json().await.unwrap();
    assert_eq!(me["login"], "admin");
    assert!(me["roles"].as_array().unwrap().contains(&json!("admin")));

    let res = client
        .post(srv.url("/auth/logout"))
        .header(reqwest::header::COOKIE, &session_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url("/auth/me"))
        .header(reqwest::header::COOKIE, &session_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn work_order_lifecycle_is_audited() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.admin_token(&client).await;

    let site_id = srv
        .create(&client, &token, "/sites", json!({ "name": "Plant A", "region": "North" }))
        .await;
    let wo_id = srv
        .create(
            &client,
            &token,
            "/workorders",
            json!({ "site_id": site_id, "type": "corrective", "priority": "high" }),
        )
        .await;

    let res = client
        .post(srv.url(&format!("/workorders/{wo_id}/status")))
        .bearer_auth(&token)
        .json(&json!({ "status": "done" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url(&format!("/workorders/{wo_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let wo: Value = res.json().await.unwrap();
    assert_eq!(wo["status"], "done");
    assert_eq!(wo["priority"], "high");
    assert_eq!(wo["title"], "Maintenance request");
    assert_eq!(wo["materials"], json!([]));

    let res = client
        .get(srv.url("/events?limit=1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let events: Value = res.json().await.unwrap();
    let latest = &events["results"][0];
    assert_eq!(latest["type"], "work_order_status");
    assert_eq!(latest["severity"], "success");
    assert_eq!(latest["meta"]["work_order_id"], wo_id.as_str());
}

#[tokio::test]
async fn materials_and_comments_round_through_the_detail_view() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.admin_token(&client).await;

    let site_id = srv
        .create(&client, &token, "/sites", json!({ "name": "Plant A", "region": "North" }))
        .await;
    let material_id = srv
        .create(&client, &token, "/materials", json!({ "name": "Belt", "unit": "pcs" }))
        .await;
    let wo_id = srv
        .create(
            &client,
            &token,
            "/workorders",
            json!({ "site_id": site_id, "type": "preventive" }),
        )
        .await;

    let res = client
        .post(srv.url(&format!("/workorders/{wo_id}/materials")))
        .bearer_auth(&token)
        .json(&json!({ "items": [{ "material_id": material_id, "qty_planned": 2.0 }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    srv.create(
        &client,
        &token,
        &format!("/workorders/{wo_id}/comment"),
        json!({ "text": "belt worn" }),
    )
    .await;

    let wo: Value = client
        .get(srv.url(&format!("/workorders/{wo_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(wo["materials"].as_array().unwrap().len(), 1);
    assert_eq!(wo["materials"][0]["qty_planned"], 2.0);
    assert_eq!(wo["materials"][0]["qty_fact"], 0.0);
    assert_eq!(wo["comments"][0]["text"], "belt worn");
}

#[tokio::test]
async fn consuming_more_than_on_hand_reports_the_shortfall() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.admin_token(&client).await;

    let site_id = srv
        .create(&client, &token, "/sites", json!({ "name": "Plant A", "region": "North" }))
        .await;
    let material_id = srv
        .create(&client, &token, "/materials", json!({ "name": "Bearing", "unit": "pcs" }))
        .await;

    let res = client
        .put(srv.url(&format!("/sites/{site_id}/inventory/{material_id}")))
        .bearer_auth(&token)
        .json(&json!({ "qty_on_hand": 5.0, "reorder_point": 10.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .post(srv.url("/inventory/consume"))
        .bearer_auth(&token)
        .json(&json!({ "site_id": site_id, "material_id": material_id, "qty": 8.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let withdrawal: Value = res.json().await.unwrap();
    assert_eq!(withdrawal["qty_on_hand"], 0.0);
    assert_eq!(withdrawal["shortfall"], 3.0);
    assert_eq!(withdrawal["clamped"], true);

    let inventory: Value = client
        .get(srv.url(&format!("/sites/{site_id}/inventory")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(inventory["items"][0]["material_name"], "Bearing");
    assert_eq!(inventory["items"][0]["low"], true);

    let breakdown: Value = client
        .get(srv.url("/reports/inventory_breakdown"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(breakdown, json!({ "ok": 0, "low": 1 }));
}

#[tokio::test]
async fn administration_is_admin_only_and_rejects_duplicates() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = srv.admin_token(&client).await;

    srv.create(
        &client,
        &admin,
        "/users",
        json!({ "login": "tech", "password": "pw", "roles": ["maintainer"] }),
    )
    .await;

    let res = client
        .post(srv.url("/users"))
        .bearer_auth(&admin)
        .json(&json!({ "login": "tech", "password": "other" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "conflict");

    let tech = srv.login(&client, "tech", "pw").await;
    let res = client
        .get(srv.url("/users"))
        .bearer_auth(&tech)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(srv.url("/roles"))
        .bearer_auth(&tech)
        .json(&json!({ "name": "auditor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Non-admin sessions still reach the shared endpoints.
    let res = client
        .get(srv.url("/workorders"))
        .bearer_auth(&tech)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn bad_input_and_missing_entities_map_to_status_codes() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.admin_token(&client).await;

    let res = client
        .get(srv.url("/workorders/not-a-uuid"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let missing = "0190f0b2-7c3a-7000-8000-000000000000";
    let res = client
        .get(srv.url(&format!("/workorders/{missing}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .delete(srv.url(&format!("/workorders/{missing}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let site_id = srv
        .create(&client, &token, "/sites", json!({ "name": "Plant A", "region": "North" }))
        .await;
    let res = client
        .post(srv.url("/workorders"))
        .bearer_auth(&token)
        .json(&json!({ "site_id": site_id, "type": "emergency" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn event_stream_delivers_new_records() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.admin_token(&client).await;

    let mut stream = client
        .get(srv.url("/events/stream"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(stream.status(), StatusCode::OK);

    srv.create(&client, &token, "/sites", json!({ "name": "Plant B", "region": "South" }))
        .await;

    let received = tokio::time::timeout(Duration::from_secs(5), async {
        let mut buffer = String::new();
        while let Some(chunk) = stream.chunk().await.unwrap() {
            buffer.push_str(&String::from_utf8_lossy(&chunk));
            if buffer.contains("site_created") {
                return buffer;
            }
        }
        buffer
    })
    .await
    .expect("no event within timeout");

    assert!(received.contains("event: site_created"));
    assert!(received.contains("Plant B"));
}
