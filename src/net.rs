//! Addresses for the startup banner.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use serde::Deserialize;

const PUBLIC_IP_LOOKUP: &str = "https://api.ipify.org?format=json";
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// The IPv4 address other machines on the LAN would reach us at.
///
/// Asks the OS which local address routes outward; no packet is sent.
/// Falls back to `0.0.0.0` on hosts without a route.
pub fn local_ipv4() -> IpAddr {
    let probe = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect((Ipv4Addr::new(192, 0, 2, 1), 9))?;
        Ok(socket.local_addr()?.ip())
    };
    match probe() {
        Ok(ip) if !ip.is_loopback() && !ip.is_unspecified() => ip,
        _ => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
    }
}

/// `http://` URL for `ip:port`, bracketing IPv6 addresses.
pub fn http_url(ip: IpAddr, port: u16) -> String {
    format!("http://{}", SocketAddr::new(ip, port))
}

#[derive(Deserialize)]
struct PublicIp {
    ip: IpAddr,
}

/// Looks up this host's public address.
pub async fn public_ip() -> reqwest::Result<IpAddr> {
    let client = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?;
    let body: PublicIp = client
        .get(PUBLIC_IP_LOOKUP)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(body.ip)
}

/// Whether `url` answers `200 OK` from the outside.
pub async fn is_reachable(url: &str) -> bool {
    let Ok(client) = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() else {
        return false;
    };
    matches!(client.get(url).send().await, Ok(r) if r.status() == reqwest::StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_bracket_ipv6() {
        assert_eq!(http_url(IpAddr::V4(Ipv4Addr::LOCALHOST), 5050), "http://127.0.0.1:5050");
        assert_eq!(http_url("::1".parse().unwrap(), 80), "http://[::1]:80");
    }

    #[test]
    fn local_address_is_never_loopback() {
        assert!(!local_ipv4().is_loopback());
    }
}
