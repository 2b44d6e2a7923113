use std::net::SocketAddr;
use std::process::{Command, Output};
use std::sync::{mpsc, Arc, Mutex};

use axum::body::{to_bytes, Body};
use axum::extract::{Query, Request, State};
use axum::http::{Method, Response, StatusCode};
use axum::Router;
use serde_json::{json, Map, Value};
use tempfile::TempDir;

/// Minimal PostgREST stand-in: `eq.` filters, insert and patch on one table.
#[derive(Clone, Default)]
struct Table {
    rows: Arc<Mutex<Vec<Value>>>,
    requests: Arc<Mutex<usize>>,
}

impl Table {
    fn requests(&self) -> usize {
        *self.requests.lock().expect("lock")
    }

    fn rows(&self) -> Vec<Value> {
        self.rows.lock().expect("lock").clone()
    }
}

fn matches(row: &Value, filters: &[(String, String)]) -> bool {
    filters.iter().all(|(field, value)| {
        let Some(expected) = value.strip_prefix("eq.") else {
            return true;
        };
        match row.get(field) {
            Some(Value::String(actual)) => actual == expected,
            Some(Value::Number(actual)) => actual.to_string() == expected,
            _ => false,
        }
    })
}

fn reply(status: StatusCode, body: Value) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("response")
}

async fn handle(State(table): State<Table>, request: Request) -> Response<Body> {
    *table.requests.lock().expect("lock") += 1;
    let (parts, body) = request.into_parts();
    if parts.uri.path() != "/rest/v1/tasks" {
        return reply(StatusCode::NOT_FOUND, json!({ "message": "unknown table" }));
    }
    let filters: Vec<(String, String)> = Query::try_from_uri(&parts.uri)
        .map(|Query(pairs)| pairs)
        .unwrap_or_default();
    let filters: Vec<(String, String)> = filters
        .into_iter()
        .filter(|(field, _)| field != "order")
        .collect();
    let bytes = to_bytes(body, usize::MAX).await.expect("body");
    let mut rows = table.rows.lock().expect("lock");

    match parts.method {
        Method::GET => {
            let found: Vec<Value> = rows
                .iter()
                .filter(|row| matches(row, &filters))
                .cloned()
                .collect();
            reply(StatusCode::OK, Value::Array(found))
        }
        Method::POST => {
            let mut row: Map<String, Value> = serde_json::from_slice(&bytes).expect("insert body");
            row.insert("id".to_string(), json!(rows.len() + 1));
            row.insert("created_at".to_string(), json!("2026-02-02T09:00:00Z"));
            let row = Value::Object(row);
            rows.push(row.clone());
            reply(StatusCode::CREATED, json!([row]))
        }
        Method::PATCH => {
            let patch: Map<String, Value> = serde_json::from_slice(&bytes).expect("patch body");
            let mut updated = Vec::new();
            for row in rows.iter_mut().filter(|row| matches(row, &filters)) {
                if let Value::Object(fields) = row {
                    fields.extend(patch.clone());
                }
                updated.push(row.clone());
            }
            reply(StatusCode::OK, Value::Array(updated))
        }
        _ => reply(StatusCode::METHOD_NOT_ALLOWED, json!({})),
    }
}

fn spawn_backend(table: Table) -> SocketAddr {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind");
            tx.send(listener.local_addr().expect("addr")).expect("send addr");
            let app = Router::new().fallback(handle).with_state(table);
            axum::serve(listener, app).await.expect("serve");
        });
    });
    rx.recv().expect("backend address")
}

struct Harness {
    home: TempDir,
    addr: SocketAddr,
    table: Table,
}

impl Harness {
    fn new() -> Self {
        let table = Table::default();
        let addr = spawn_backend(table.clone());
        Self {
            home: TempDir::new().expect("tempdir"),
            addr,
            table,
        }
    }

    fn todo(&self, args: &[&str]) -> Output {
        let mut command = Command::new(env!("CARGO_BIN_EXE_todo"));
        for (name, _) in std::env::vars() {
            if name.starts_with("TODO_CLI_")
                || name.starts_with("TELEGRAM_")
                || name.starts_with("SUPABASE_")
            {
                command.env_remove(name);
            }
        }
        command
            .args(args)
            .current_dir(self.home.path())
            .env("HOME", self.home.path())
            .env("TASKWIRE_HOME", self.home.path().join(".taskwire"))
            .env("SUPABASE_URL", format!("http://{}", self.addr))
            .env("SUPABASE_SERVICE_ROLE_KEY", "service-key")
            .env("NO_COLOR", "1")
            .output()
            .expect("run todo")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn add_list_done_round_trip() {
    let harness = Harness::new();

    let added = harness.todo(&["add", "[P0]", "Renew", "passport", "2030-05-01"]);
    assert!(added.status.success(), "stderr: {}", stderr(&added));
    assert_eq!(
        stdout(&added),
        "✅ Task added: Renew passport — due 2030-05-01 [P0]\n"
    );
    let rows = harness.table.rows();
    assert_eq!(rows[0]["user_id"], "cli");
    assert_eq!(rows[0]["status"], "Todo");

    let listed = harness.todo(&["ls"]);
    assert!(listed.status.success(), "stderr: {}", stderr(&listed));
    assert_eq!(
        stdout(&listed),
        "📋 All pending tasks:\n\n[id:1] [P0] Renew passport — due 2030-05-01\n"
    );

    let done = harness.todo(&["done", "1"]);
    assert!(done.status.success(), "stderr: {}", stderr(&done));
    assert_eq!(stdout(&done), "✅ Marked as done: Renew passport\n");
    assert_eq!(harness.table.rows()[0]["status"], "Done");

    let empty = harness.todo(&["list"]);
    assert_eq!(stdout(&empty), "🎉 No pending tasks!\n");
}

#[test]
fn done_on_unknown_task_fails() {
    let harness = Harness::new();
    let output = harness.todo(&["done", "99"]);
    assert!(!output.status.success());
    assert_eq!(stderr(&output).trim_end(), "❌ Task not found");
}

#[test]
fn invalid_id_is_rejected_without_a_request() {
    let harness = Harness::new();
    let output = harness.todo(&["snooze", "abc"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("❌ Invalid task ID: abc"));
    assert_eq!(harness.table.requests(), 0);
}

#[test]
fn missing_title_prints_usage() {
    let harness = Harness::new();
    let output = harness.todo(&["add"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Usage: todo add <task>"));
    assert_eq!(harness.table.requests(), 0);
}

#[test]
fn no_subcommand_prints_help() {
    let harness = Harness::new();
    let output = harness.todo(&[]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage: todo"));
}

#[test]
fn version_carries_git_suffix() {
    let harness = Harness::new();
    let output = harness.todo(&["--version"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.starts_with(&format!("todo {}", env!("CARGO_PKG_VERSION"))));
    assert!(text.contains("+git."));
}
