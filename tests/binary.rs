//! Drives the `canopy` binary end to end: startup banner, the demo routes
//! and a real SIGINT.

#![cfg(unix)]

use std::process::Stdio;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio_tungstenite::tungstenite::Message;

const DEADLINE: Duration = Duration::from_secs(10);

fn spawn() -> Child {
    Command::new(env!("CARGO_BIN_EXE_canopy"))
        .args(["--host", "127.0.0.1", "--port", "0", "--routes"])
        .arg(concat!(env!("CARGO_MANIFEST_DIR"), "/routes"))
        .env("RUST_LOG", "info")
        .env("NO_COLOR", "1")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .expect("spawn canopy")
}

/// Reads log lines until the banner reports the local URL.
async fn local_url(lines: &mut Lines<BufReader<ChildStdout>>) -> String {
    while let Some(line) = lines.next_line().await.unwrap() {
        let line = console::strip_ansi_codes(&line).into_owned();
        if let Some((_, url)) = line.split_once("Local:") {
            return url.trim().to_owned();
        }
    }
    panic!("canopy exited before announcing its address");
}

#[tokio::test]
async fn demo_routes_then_sigint_exits_cleanly() {
    let mut child = spawn();
    let mut lines = BufReader::new(child.stdout.take().unwrap()).lines();
    let base = tokio::time::timeout(DEADLINE, local_url(&mut lines)).await.unwrap();
    let rest = tokio::spawn(async move {
        let mut rest = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            rest.push(line);
        }
        rest
    });

    let client = reqwest::Client::new();

    let body: Value = client.get(format!("{base}/")).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["data"], json!({ "success": true }));

    let body: Value = client.get(format!("{base}/users")).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["message"], "GET all users");

    let body: Value = client
        .post(format!("{base}/users"))
        .json(&json!({ "name": "alice" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["message"], "User created");
    assert_eq!(body["data"]["data"], json!({ "name": "alice" }));

    let body: Value = client.get(format!("{base}/users/7")).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["data"]["id"], "7");
    drop(client);

    let ws_url = format!("{}/users", base.replacen("http://", "ws://", 1));
    let (mut socket, _) = tokio_tungstenite::connect_async(ws_url).await.unwrap();

    socket.send(Message::text(r#"{"hello":"world"}"#)).await.unwrap();
    let reply: Value = serde_json::from_str(socket.next().await.unwrap().unwrap().to_text().unwrap()).unwrap();
    assert_eq!(reply["echo"], json!({ "hello": "world" }));
    assert!(reply["timestamp"].as_str().unwrap().ends_with('Z'), "{reply}");

    socket.send(Message::text("plain")).await.unwrap();
    let reply: Value = serde_json::from_str(socket.next().await.unwrap().unwrap().to_text().unwrap()).unwrap();
    assert_eq!(reply["echo"], "plain");

    socket.close(None).await.unwrap();
    while let Some(Ok(_)) = socket.next().await {}

    let pid = child.id().expect("canopy still running") as libc::pid_t;
    // SAFETY: plain signal delivery to a child process we own.
    assert_eq!(unsafe { libc::kill(pid, libc::SIGINT) }, 0);

    let status = tokio::time::timeout(DEADLINE, child.wait()).await.unwrap().unwrap();
    assert_eq!(status.code(), Some(0));

    let rest = rest.await.unwrap().join("\n");
    assert!(rest.contains("shutting down"), "{rest}");
    assert!(rest.contains("server stopped"), "{rest}");
}
