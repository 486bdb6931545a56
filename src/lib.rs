/*!
# Overview

[bgpkit-birdc][crate] is a client for the control socket of the [BIRD](https://bird.network.cz)
routing daemon. It speaks the same line-oriented protocol as `birdc`, and decodes the text the
daemon prints for common queries into typed values: route and FIB totals, BGP session counts,
origin ASN statistics, prefix-length histograms, RPKI validation counts, reverse lookups for an
IP address, ROA evaluation, VRP listings and inventories of RPKI invalid prefixes.

Every call opens a fresh connection, sends one command per query, reads the full response and
closes the connection. Nothing is cached or retried.

# Examples

## Querying Summary Counters

```no_run
use bgpkit_birdc::BirdClient;

let client = BirdClient::new().socket_path("/run/bird/bird.ctl");

let totals = client.bgp_totals().unwrap();
println!("IPv4 RIB {} FIB {}", totals.v4_rib, totals.v4_fib);

let peers = client.peers().unwrap();
println!("{}/{} IPv6 sessions established", peers.v6_established, peers.v6_configured);
```

## Looking Up a Destination

Lookups that find nothing return `Ok(None)` rather than an error.

```no_run
use bgpkit_birdc::{BirdClient, DaemonVersion};
use std::net::IpAddr;

let client = BirdClient::for_daemon(DaemonVersion::Bird3);
let ip: IpAddr = "8.8.8.8".parse().unwrap();

match client.as_path_from_ip(ip).unwrap() {
    Some(path) => println!("path {:?}, as-set {:?}", path.path, path.set),
    None => println!("no route to {}", ip),
}
```

## Sending Raw Commands

Commands without a decoder can be passed through with [BirdClient::run_command]; the result is the
response payload with the status codes stripped.

```no_run
let client = bgpkit_birdc::BirdClient::new();
println!("{}", client.run_command("show memory").unwrap());
```
*/

mod config;
pub mod decode;
mod error;
mod item;
mod queries;
mod session;

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

pub use config::{ClientConfig, DaemonVersion, DEFAULT_BIRD2_SOCKET, DEFAULT_BIRD3_SOCKET};
pub use error::BirdError;
pub use item::{
    AsPath, AsnStatistics, InvalidInventory, LargeCommunityCounts, MaskHistogram, PeerCounts,
    RoaCounts, RoaStatus, RouteTotals, Vrp,
};
pub use session::{classify_line, read_response, Line, Querier, SocketQuerier};

/// BirdClient binds a control socket to the typed BIRD queries.
///
/// See [module doc][crate#examples] for usage examples.
#[derive(Clone)]
pub struct BirdClient {
    pub config: ClientConfig,
    querier: Arc<dyn Querier>,
}

impl Default for BirdClient {
    fn default() -> Self {
        Self::with_config(ClientConfig::from_env())
    }
}

impl std::fmt::Debug for BirdClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BirdClient")
            .field("config", &self.config)
            .finish()
    }
}

impl BirdClient {
    /// Construct new BirdClient object.
    ///
    /// The socket path is read from `BIRDC_SOCKET_PATH` and the deadline from
    /// `BIRDC_TIMEOUT_SECS`; without them the BIRD 2 defaults are used (`/run/bird.ctl`, 10
    /// seconds).
    ///
    /// # Examples
    /// ```
    /// use bgpkit_birdc::BirdClient;
    /// let client = BirdClient::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a client for the default socket of a given daemon version.
    ///
    /// # Examples
    /// ```
    /// use bgpkit_birdc::{BirdClient, DaemonVersion};
    /// let client = BirdClient::for_daemon(DaemonVersion::Bird3);
    /// assert_eq!(client.config.socket_path, "/run/bird3.ctl");
    /// ```
    pub fn for_daemon(version: DaemonVersion) -> Self {
        Self::with_config(ClientConfig::for_daemon(version))
    }

    /// Construct a client from an explicit configuration.
    pub fn with_config(config: ClientConfig) -> Self {
        let querier = Arc::new(SocketQuerier::new(&config.socket_path, config.timeout));
        Self { config, querier }
    }

    /// Configure the control socket path.
    ///
    /// # Examples
    /// ```
    /// let client = bgpkit_birdc::BirdClient::new()
    ///     .socket_path("/run/bird/bird.ctl");
    /// ```
    pub fn socket_path<S: Display>(self, socket_path: S) -> Self {
        let mut config = self.config;
        config.socket_path = socket_path.to_string();
        Self::with_config(config)
    }

    /// Configure the absolute deadline of each exchange with the daemon.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// let client = bgpkit_birdc::BirdClient::new()
    ///     .timeout(Duration::from_secs(30));
    /// ```
    pub fn timeout(self, timeout: Duration) -> Self {
        let mut config = self.config;
        config.timeout = timeout;
        Self::with_config(config)
    }

    /// Replace the transport, e.g. to replay recorded daemon output.
    ///
    /// Later calls to [Self::socket_path] or [Self::timeout] install a socket transport again.
    pub fn querier<Q: Querier + 'static>(self, querier: Q) -> Self {
        Self {
            config: self.config,
            querier: Arc::new(querier),
        }
    }

    /// Send an arbitrary command and return the response payload.
    ///
    /// # Examples
    /// ```no_run
    /// let client = bgpkit_birdc::BirdClient::new();
    /// let status = client.run_command("show status").unwrap();
    /// ```
    pub fn run_command(&self, command: &str) -> Result<String, BirdError> {
        self.query(command)
    }

    fn query(&self, command: &str) -> Result<String, BirdError> {
        log::debug!("sending command to {}: {}", &self.config.socket_path, command);
        self.querier.query(command)
    }
}
