//! Shared harness for the end-to-end HTTP tests: each test spawns the
//! compiled server binary (in-memory store, registration open) on a fixed
//! port and drives it with real HTTP requests, mirroring the pack's own
//! spawn-the-server-then-connect-over-the-wire integration style.

use std::process::{Child, Command, Stdio};
use std::time::Duration;

use serde_json::{json, Value};

pub struct TestServer {
    child: Child,
    base_url: String,
    client: reqwest::Client,
}

impl TestServer {
    pub async fn spawn(port: u16) -> Self {
        let child = Command::new(env!("CARGO_BIN_EXE_mango-gateway"))
            .env("MANGO_CONFIG", "/nonexistent-mango-test-config.toml")
            .env("MANGO__SERVER__HOST", "127.0.0.1")
            .env("MANGO__SERVER__PORT", port.to_string())
            .env("MANGO__DATABASE__URL", "")
            .env("MANGO__AUTH__ALLOW_REGISTRATION", "true")
            .env("MANGO__LOGGING__LEVEL", "error")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn the mango-gateway binary");

        let base_url = format!("http://127.0.0.1:{port}");
        let client = reqwest::Client::new();

        let mut ready = false;
        for _ in 0..200 {
            if client.get(format!("{base_url}/v1/me")).send().await.is_ok() {
                ready = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        assert!(ready, "server on port {port} never came up");

        Self { child, base_url, client }
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (u16, Value) {
        self.request(reqwest::Method::POST, path, token, Some(body)).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (u16, Value) {
        self.request(reqwest::Method::GET, path, token, None).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> (u16, Value) {
        self.request(reqwest::Method::PUT, path, token, Some(body)).await
    }

    pub async fn patch(&self, path: &str, token: Option<&str>, body: Value) -> (u16, Value) {
        self.request(reqwest::Method::PATCH, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> (u16, Value) {
        self.request(reqwest::Method::DELETE, path, token, None).await
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (u16, Value) {
        let mut request = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }
        let response = request.send().await.expect("request reaches the server");
        let status = response.status().as_u16();
        let bytes = response.bytes().await.unwrap_or_default();
        let parsed = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, parsed)
    }

    /// Register a fresh user, returning (session_token, user_id).
    pub async fn register(&self, username: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/v1/auth/register",
                None,
                json!({
                    "email": format!("{username}@example.com"),
                    "username": username,
                    "display_name": username,
                    "password": "hunter2hunter2",
                }),
            )
            .await;
        assert_eq!(status, 201, "register failed: {body:?}");
        let token = body["token"].as_str().unwrap().to_string();
        let user_id = body["user"]["id"].as_str().unwrap().to_string();
        (token, user_id)
    }

    pub async fn create_server(&self, token: &str, name: &str) -> Value {
        let (status, body) = self.post("/v1/servers", Some(token), json!({ "name": name })).await;
        assert_eq!(status, 201, "create server failed: {body:?}");
        body
    }

    pub async fn create_channel(&self, token: &str, server_id: &str, name: &str) -> Value {
        let (status, body) = self
            .post(
                &format!("/v1/servers/{server_id}/channels"),
                Some(token),
                json!({ "name": name, "channel_type": "text" }),
            )
            .await;
        assert_eq!(status, 201, "create channel failed: {body:?}");
        body
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
