mod output;

use crate::output::{print_json, print_list, print_mask_table, print_row, print_table, MaskRow};
use bgpkit_birdc::{BirdClient, BirdError, ClientConfig, DaemonVersion};
use clap::{Parser, Subcommand};
use ipnet::IpNet;
use itertools::Itertools;
use std::net::IpAddr;
use std::process::exit;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// control socket path, defaults to $BIRDC_SOCKET_PATH or the daemon's default socket
    #[clap(short, long, global = true)]
    socket: Option<String>,

    /// use the BIRD 3 default socket path
    #[clap(long, global = true)]
    bird3: bool,

    /// deadline in seconds for each exchange with the daemon
    #[clap(short, long, global = true)]
    timeout: Option<u64>,

    /// print out results in JSON format instead of Markdown table
    #[clap(short, long, global = true)]
    json: bool,

    /// disable logging
    #[clap(long, global = true)]
    no_log: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the daemon version
    Version,

    /// RIB and FIB sizes per address family
    Totals,

    /// Configured and established BGP sessions
    Peers,

    /// Unique origin ASN counts
    Asns,

    /// Prefix length distribution
    Masks,

    /// RPKI validation state counts
    Roas,

    /// Prefixes carrying large communities
    LargeCommunities,

    /// Prefixes originated by an ASN
    Prefixes {
        /// origin ASN
        asn: u32,

        /// only list IPv4 prefixes
        #[clap(short = '4', long, group = "family")]
        ipv4: bool,

        /// only list IPv6 prefixes
        #[clap(short = '6', long, group = "family")]
        ipv6: bool,
    },

    /// Origin ASN of the best route towards an IP
    Origin { ip: IpAddr },

    /// AS path of the best route towards an IP
    AsPath { ip: IpAddr },

    /// Forwarding entry covering an IP
    Route { ip: IpAddr },

    /// RPKI state of a prefix and origin ASN
    Roa { prefix: IpNet, asn: u32 },

    /// Validated ROA payloads of an ASN
    Vrps { asn: u32 },

    /// ASNs advertising RPKI invalid prefixes
    Invalids,

    /// Send a raw command and print the response
    Run {
        /// command words, e.g. `show memory`
        #[clap(required = true, num_args = 1..)]
        command: Vec<String>,
    },
}

fn build_client(cli: &Cli) -> BirdClient {
    let mut config = match cli.bird3 {
        true => ClientConfig::for_daemon(DaemonVersion::Bird3),
        false => ClientConfig::from_env(),
    };
    if let Some(socket) = &cli.socket {
        config.socket_path = socket.clone();
    }
    if let Some(secs) = cli.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    info!("using client config: {}", &config);
    BirdClient::with_config(config)
}

fn run(cli: &Cli, client: &BirdClient) -> Result<(), BirdError> {
    let json = cli.json;
    match &cli.command {
        Commands::Version => println!("{}", client.version()?),
        Commands::Totals => print_row(&client.bgp_totals()?, json),
        Commands::Peers => print_row(&client.peers()?, json),
        Commands::Asns => print_row(&client.source_asns()?, json),
        Commands::Masks => {
            let masks = client.masks()?;
            match json {
                true => print_json(&masks),
                false => print_mask_table(MaskRow::from_histogram(&masks)),
            }
        }
        Commands::Roas => print_row(&client.roas()?, json),
        Commands::LargeCommunities => print_row(&client.large_communities()?, json),
        Commands::Prefixes { asn, ipv4, ipv6 } => {
            let mut prefixes = vec![];
            if !ipv6 {
                prefixes.extend(client.ipv4_from_source(*asn)?);
            }
            if !ipv4 {
                prefixes.extend(client.ipv6_from_source(*asn)?);
            }
            info!("found {} prefixes for AS{}", prefixes.len(), asn);
            print_list(&prefixes, json);
        }
        Commands::Origin { ip } => match client.origin_from_ip(*ip)? {
            Some(asn) => println!("{}", asn),
            None => println!("no origin found for {}", ip),
        },
        Commands::AsPath { ip } => match client.as_path_from_ip(*ip)? {
            Some(path) if json => print_json(&path),
            Some(path) => {
                println!("AS path: {}", path.path.iter().join(" "));
                if !path.set.is_empty() {
                    println!("AS set: {{{}}}", path.set.iter().join(" "));
                }
            }
            None => println!("no AS path found for {}", ip),
        },
        Commands::Route { ip } => match client.route(*ip)? {
            Some(prefix) => println!("{}", prefix),
            None => println!("no route found for {}", ip),
        },
        Commands::Roa { prefix, asn } => match client.roa(prefix, *asn)? {
            Some(status) => println!("{}", status),
            None => println!("no ROA state returned for {} AS{}", prefix, asn),
        },
        Commands::Vrps { asn } => print_table(&client.vrps(*asn)?, json),
        Commands::Invalids => {
            let invalids = client.invalids()?;
            match json {
                true => print_json(&invalids),
                false => {
                    for (asn, prefixes) in invalids
                        .iter()
                        .sorted_by_key(|(_, prefixes)| std::cmp::Reverse(prefixes.len()))
                    {
                        println!("AS{}: {}", asn, prefixes.iter().join(", "));
                    }
                }
            }
        }
        Commands::Run { command } => println!("{}", client.run_command(&command.join(" "))?),
    }
    Ok(())
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if !cli.no_log {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .init();
    }

    let client = build_client(&cli);
    if let Err(e) = run(&cli, &client) {
        eprintln!("error: {}", e);
        exit(1);
    }
}
