use std::process::ExitCode;

use canopy::{Config, RouteLoader, Router, Server, net};
use clap::Parser;
use tracing::{error, info, warn};

mod api;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    if let Err(e) = canopy::log::init() {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let mut router = Router::new();
    let report = RouteLoader::new(api::modules())
        .load(&config.routes, &mut router)
        .await;
    if !report.failures.is_empty() {
        warn!(target: "server", failed = report.failures.len(), "some routes failed to load");
    }

    let server = match Server::bind(&config).await {
        Ok(server) => server,
        Err(e) => {
            error!(target: "server", "failed to start server: {e}");
            return ExitCode::FAILURE;
        }
    };

    if config.public {
        tokio::spawn(announce_public(server.local_addr().port()));
    }

    server.serve(router).await.exit_code()
}

async fn announce_public(port: u16) {
    match net::public_ip().await {
        Ok(ip) => {
            let url = net::http_url(ip, port);
            if net::is_reachable(&url).await {
                info!(target: "server", "  ➜ Public:  {url}");
            } else {
                warn!(target: "server", "  ➜ Public URL is not reachable: {url}");
            }
        }
        Err(e) => warn!(target: "server", "could not determine public IP: {e}"),
    }
}
