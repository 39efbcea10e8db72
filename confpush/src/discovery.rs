//! Finding live hosts on a subnet before a run.
//!
//! The result is informational: it is logged, never merged into the
//! inventory.

use std::fmt;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout_at};

use crate::error::DiscoveryError;

/// Smallest prefix length accepted for a sweep (65534 hosts).
pub const MIN_PREFIX_LEN: u8 = 16;

/// An IPv4 network in CIDR form. Host bits of the input are masked off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Subnet {
    network: u32,
    prefix_len: u8,
}

impl Ipv4Subnet {
    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.network)
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    fn broadcast(&self) -> u32 {
        self.network | !mask(self.prefix_len)
    }

    /// Usable host addresses in ascending order.
    ///
    /// Network and broadcast addresses are excluded except on /31
    /// point-to-point links and /32 single hosts.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> + use<> {
        let (first, last) = match self.prefix_len {
            31 | 32 => (self.network, self.broadcast()),
            _ => (self.network + 1, self.broadcast() - 1),
        };
        (first..=last).map(Ipv4Addr::from)
    }

    pub fn host_count(&self) -> usize {
        match self.prefix_len {
            32 => 1,
            31 => 2,
            len => (1usize << (32 - len)) - 2,
        }
    }
}

fn mask(prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        len => u32::MAX << (32 - u32::from(len)),
    }
}

impl FromStr for Ipv4Subnet {
    type Err = DiscoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| DiscoveryError::InvalidSubnet {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let (address, prefix_len) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| invalid("expected <address>/<prefix length>"))?;
        let address: Ipv4Addr = address
            .parse()
            .map_err(|_| invalid("not an IPv4 address"))?;
        let prefix_len: u8 = prefix_len
            .parse()
            .map_err(|_| invalid("prefix length is not a number"))?;

        if prefix_len > 32 {
            return Err(invalid("prefix length must be at most 32"));
        }
        if prefix_len < MIN_PREFIX_LEN {
            return Err(DiscoveryError::TooLarge {
                prefix: prefix_len,
                min: MIN_PREFIX_LEN,
            });
        }

        Ok(Self {
            network: u32::from(address) & mask(prefix_len),
            prefix_len,
        })
    }
}

impl fmt::Display for Ipv4Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix_len)
    }
}

/// Finds hosts that are up on a subnet.
pub trait DiscoveryProbe: Send + Sync {
    /// Responding addresses in ascending order. Hosts that stay silent are
    /// simply absent.
    fn discover(
        &self,
        subnet: &Ipv4Subnet,
    ) -> impl Future<Output = Result<Vec<IpAddr>, DiscoveryError>> + Send;
}

/// Sweeps a subnet for hosts accepting TCP connections on the SSH port.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    pub port: u16,
    /// Bound on the whole sweep.
    pub timeout: Duration,
    /// Connection attempts in flight at once.
    pub parallelism: usize,
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self {
            port: 22,
            timeout: Duration::from_secs(3),
            parallelism: 256,
        }
    }
}

impl TcpProbe {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl DiscoveryProbe for TcpProbe {
    async fn discover(&self, subnet: &Ipv4Subnet) -> Result<Vec<IpAddr>, DiscoveryError> {
        let deadline = Instant::now() + self.timeout;
        let permits = Arc::new(Semaphore::new(self.parallelism.max(1)));
        let mut probes = JoinSet::new();

        debug!(
            "Probing {} hosts on {subnet} port {}",
            subnet.host_count(),
            self.port
        );

        for host in subnet.hosts() {
            let permits = Arc::clone(&permits);
            let addr = SocketAddr::new(IpAddr::V4(host), self.port);
            probes.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                match timeout_at(deadline, TcpStream::connect(addr)).await {
                    Ok(Ok(_)) => Some(addr.ip()),
                    _ => None,
                }
            });
        }

        let mut found = Vec::new();
        while let Some(result) = probes.join_next().await {
            if let Some(ip) = result.map_err(|e| DiscoveryError::Io(e.into()))? {
                found.push(ip);
            }
        }
        found.sort();
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_hosts() {
        let subnet: Ipv4Subnet = "192.168.1.0/29".parse().unwrap();
        assert_eq!(subnet.to_string(), "192.168.1.0/29");
        let hosts: Vec<_> = subnet.hosts().collect();
        assert_eq!(hosts.len(), 6);
        assert_eq!(hosts[0], Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(hosts[5], Ipv4Addr::new(192, 168, 1, 6));
        assert_eq!(subnet.host_count(), 6);
    }

    #[test]
    fn test_host_bits_are_masked() {
        let subnet: Ipv4Subnet = "10.20.30.40/24".parse().unwrap();
        assert_eq!(subnet.network(), Ipv4Addr::new(10, 20, 30, 0));
        assert_eq!(subnet.hosts().count(), 254);
    }

    #[test]
    fn test_point_to_point_and_single_host() {
        let p2p: Ipv4Subnet = "10.0.0.0/31".parse().unwrap();
        assert_eq!(
            p2p.hosts().collect::<Vec<_>>(),
            vec![Ipv4Addr::new(10, 0, 0, 0), Ipv4Addr::new(10, 0, 0, 1)]
        );

        let single: Ipv4Subnet = "10.0.0.7/32".parse().unwrap();
        assert_eq!(single.hosts().collect::<Vec<_>>(), vec![Ipv4Addr::new(10, 0, 0, 7)]);
    }

    #[test]
    fn test_rejects_bad_input() {
        for input in ["10.0.0.0", "10.0.0/24", "10.0.0.0/33", "10.0.0.0/x", "fe80::/64"] {
            assert!(
                matches!(input.parse::<Ipv4Subnet>(), Err(DiscoveryError::InvalidSubnet { .. })),
                "{input}"
            );
        }
        assert!(matches!(
            "10.0.0.0/8".parse::<Ipv4Subnet>(),
            Err(DiscoveryError::TooLarge { prefix: 8, min: 16 })
        ));
    }

    #[tokio::test]
    async fn test_tcp_probe_finds_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while listener.accept().await.is_ok() {}
        });

        let probe = TcpProbe::default()
            .with_port(port)
            .with_timeout(Duration::from_secs(2));
        let subnet: Ipv4Subnet = "127.0.0.1/32".parse().unwrap();
        let found = probe.discover(&subnet).await.unwrap();
        assert_eq!(found, vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]);
    }
}
