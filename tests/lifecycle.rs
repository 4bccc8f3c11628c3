mod common;

use std::net::{IpAddr, Ipv4Addr, TcpListener};
use std::time::Duration;

use canopy::{Config, Error, Method, Request, Response, Router, Server, Shutdown, WebSocket};
use common::TestServer;
use futures_util::SinkExt;
use tokio_tungstenite::tungstenite::Message;

async fn hello(_req: Request) -> Response {
    Response::text("hello")
}

/// Holds the socket open until the peer goes away.
async fn hold(mut ws: WebSocket, _req: Request) {
    while let Some(Ok(_)) = ws.recv().await {}
}

fn router() -> Router {
    Router::new().on(Method::Get, "/", hello).ws("/hold", hold)
}

fn localhost(port: u16) -> Config {
    Config { host: IpAddr::V4(Ipv4Addr::LOCALHOST), port, ..Config::default() }
}

#[tokio::test]
async fn taken_port_moves_to_the_next_one() {
    let taken = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let port = taken.local_addr().unwrap().port();

    let server = Server::bind(&localhost(port)).await.unwrap();
    assert!(server.local_addr().port() > port);
}

#[tokio::test]
async fn other_bind_errors_are_fatal() {
    // TEST-NET-1 is never assigned to a local interface.
    let config = Config { host: IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), port: 0, ..Config::default() };
    match Server::bind(&config).await {
        Err(Error::Bind { addr, .. }) => assert_eq!(addr.ip(), config.host),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(server) => panic!("bound {}", server.local_addr()),
    }
}

#[tokio::test]
async fn idle_server_drains_promptly() {
    let server = TestServer::start(router()).await;
    let outcome = tokio::time::timeout(Duration::from_secs(2), server.stop()).await.unwrap();
    assert_eq!(outcome, Shutdown::Drained);
}

#[tokio::test]
async fn keep_alive_connections_are_closed_on_shutdown() {
    let server = TestServer::start(router()).await;

    // The client pools the connection, leaving it open and idle.
    let client = reqwest::Client::new();
    let body = client.get(server.url("/")).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, "hello");

    let outcome = tokio::time::timeout(Duration::from_secs(2), server.stop()).await.unwrap();
    assert_eq!(outcome, Shutdown::Drained);
    drop(client);
}

#[tokio::test]
async fn open_sockets_force_the_shutdown_after_grace() {
    let server = TestServer::start_with_grace(router(), Duration::from_millis(200)).await;

    let (mut client, _) = tokio_tungstenite::connect_async(server.ws_url("/hold")).await.unwrap();
    client.send(Message::text("still here")).await.unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(2), server.stop()).await.unwrap();
    assert_eq!(outcome, Shutdown::Forced);
    drop(client);
}

#[test]
fn exit_codes_follow_the_outcome() {
    assert_eq!(format!("{:?}", Shutdown::Drained.exit_code()), format!("{:?}", std::process::ExitCode::SUCCESS));
    assert_eq!(format!("{:?}", Shutdown::Forced.exit_code()), format!("{:?}", std::process::ExitCode::FAILURE));
}
