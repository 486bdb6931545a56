//! Decoders turning BIRD command output into typed values.
//!
//! BIRD prints whatever its human-facing CLI prints, so there is no schema. Each function here
//! handles one output shape, works on the already de-framed text returned by a
//! [crate::Querier], and never talks to the daemon itself.
use crate::item::{
    AsPath, AsnStatistics, InvalidInventory, PeerCounts, RoaStatus, RouteTotals, Vrp,
};
use crate::BirdError;
use ipnet::IpNet;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Label preceding the AS path in `show route all` output.
pub(crate) const AS_PATH_LABEL: &str = "BGP.as_path:";

lazy_static! {
    static ref ROUTE_COUNT_PATTERN: Regex =
        Regex::new(r"(\d+)\s+of\s+\d+\s+routes\s+for\s+(\d+)\s+networks")
            .expect("invalid regex pattern");
    static ref SOURCE_ASN_PATTERN: Regex =
        Regex::new(r"\[AS(\d+)[ie]?\]").expect("invalid regex pattern");
    static ref AS_SET_PATTERN: Regex = Regex::new(r"\{[^}]*\}").expect("invalid regex pattern");
    static ref NUMBER_PATTERN: Regex = Regex::new(r"\d+").expect("invalid regex pattern");
}

/// Protocols BIRD always configures that are never BGP sessions.
const SYSTEM_PROTOCOLS: [&str; 2] = ["device1", "kernel1"];

/// Parse a decimal counter, reading anything unparsable as zero.
fn parse_count(s: &str) -> u32 {
    s.trim().parse::<u32>().unwrap_or(0)
}

/// First whitespace-delimited token of a line, if any.
fn first_token(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

/// Parse a CIDR token, truncating host bits the way the daemon's network column reads.
fn parse_prefix(token: &str) -> Result<IpNet, BirdError> {
    Ok(token.parse::<IpNet>()?.trunc())
}

/// Decode `show route count`.
///
/// Lines look like `2076414 of 2076414 routes for 1038207 networks in table master4`; the first
/// number is the RIB size and the networks count is the FIB size.
pub fn decode_route_totals(output: &str) -> RouteTotals {
    let mut totals = RouteTotals::default();
    for line in output.lines() {
        let Some(cap) = ROUTE_COUNT_PATTERN.captures(line) else {
            continue;
        };
        if line.contains("master4") {
            totals.v4_rib = parse_count(&cap[1]);
            totals.v4_fib = parse_count(&cap[2]);
        } else if line.contains("master6") {
            totals.v6_rib = parse_count(&cap[1]);
            totals.v6_fib = parse_count(&cap[2]);
        }
    }
    totals
}

/// Decode `show protocols`.
///
/// Sessions are recognised by a `_v4`/`_v6` marker in the protocol name. Every such session
/// counts as configured; the sixth column being `Established` counts it as established.
pub fn decode_peer_counts(output: &str) -> PeerCounts {
    let mut peers = PeerCounts::default();
    for line in output.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 6 {
            continue;
        }
        let (name, state) = (fields[0], fields[5]);
        if SYSTEM_PROTOCOLS.iter().any(|p| line.contains(p)) {
            continue;
        }
        let established = state == "Established";
        if name.contains("_v4") {
            peers.v4_configured += 1;
            peers.v4_established += established as u32;
        } else if name.contains("_v6") {
            peers.v6_configured += 1;
            peers.v6_established += established as u32;
        }
    }
    peers
}

/// Collect the unique origin ASNs annotated as `[AS<n>i]` on route lines.
pub fn extract_source_asns(output: &str) -> HashSet<String> {
    output
        .lines()
        .filter_map(|line| SOURCE_ASN_PATTERN.captures(line))
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Set algebra over the origin ASNs of the two address families.
pub fn asn_statistics(as4: &HashSet<String>, as6: &HashSet<String>) -> AsnStatistics {
    AsnStatistics {
        as4: as4.len() as u32,
        as6: as6.len() as u32,
        as_union: as4.union(as6).count() as u32,
        as4_only: as4.difference(as6).count() as u32,
        as6_only: as6.difference(as4).count() as u32,
        as_both: as4.intersection(as6).count() as u32,
    }
}

/// Count route lines per prefix length, keyed by the length as printed.
pub fn decode_mask_histogram(output: &str) -> HashMap<String, u32> {
    let mut masks = HashMap::new();
    for token in output.lines().filter_map(first_token) {
        if !token.contains('/') {
            continue;
        }
        let parts: Vec<&str> = token.split('/').collect();
        if parts.len() == 2 {
            *masks.entry(parts[1].to_string()).or_insert(0) += 1;
        }
    }
    masks
}

/// Decode the output of a `... count` query: the first token is the number of routes.
pub fn decode_count(output: &str) -> u32 {
    first_token(output).map(parse_count).unwrap_or(0)
}

/// Count the lines that begin with an IP literal rather than prose.
///
/// This is a heuristic: a prose line that happens to start with a digit is counted too.
pub fn count_route_lines(output: &str) -> u32 {
    output
        .trim()
        .lines()
        .filter(|line| {
            line.chars()
                .next()
                .map(|c| c.is_ascii_digit() || c == ':')
                .unwrap_or(false)
        })
        .count() as u32
}

/// Every parseable prefix starting a line, in output order.
pub fn extract_prefixes(output: &str) -> Vec<IpNet> {
    output
        .lines()
        .filter_map(first_token)
        .filter(|token| token.contains('/'))
        .filter_map(|token| parse_prefix(token).ok())
        .collect()
}

/// The route line answering `show route primary for <ip>`, if there is one.
pub fn decode_route(output: &str) -> Option<IpNet> {
    extract_prefixes(output).into_iter().next()
}

/// Text following the first `BGP.as_path:` label, trimmed.
pub fn find_as_path(output: &str) -> Option<&str> {
    output
        .lines()
        .find_map(|line| line.split_once(AS_PATH_LABEL))
        .map(|(_, path)| path.trim())
}

/// Split an AS path into its ordered part and a trailing AS-SET.
///
/// Only a single trailing AS-SET is understood. Once a brace is seen every later token counts
/// as a set member, so a path with ASNs after the set (or with a second set) misplaces them:
/// `3356 {1212} 9876 {3434}` yields path `[3356]` and set `[1212, 9876]`.
///
/// ```
/// use bgpkit_birdc::decode::decode_as_path;
///
/// let path = decode_as_path("3356 12345 9876 {1212 3434}");
/// assert_eq!(path.path, vec![3356, 12345, 9876]);
/// assert_eq!(path.set, vec![1212, 3434]);
/// ```
pub fn decode_as_path(input: &str) -> AsPath {
    let normalized = if input.contains(&['{', '}'][..]) {
        input.replacen('{', "{ ", 1).replacen('}', " }", 1)
    } else {
        input.to_string()
    };

    let mut as_path = AsPath::default();
    let mut in_set = false;
    for token in normalized.split_whitespace() {
        if token.contains(&['{', '}'][..]) {
            in_set = true;
            continue;
        }
        match in_set {
            false => as_path.path.push(parse_count(token)),
            true => as_path.set.push(parse_count(token)),
        }
    }
    as_path
}

/// Origin ASN of an AS path: the last ASN once any AS-SET block is removed.
pub fn decode_origin(path: &str) -> Result<Option<u32>, BirdError> {
    let stripped = AS_SET_PATTERN.replace_all(path, "");
    let Some(last) = stripped.split_whitespace().last() else {
        return Ok(None);
    };
    match NUMBER_PATTERN.find(last) {
        Some(m) => Ok(Some(m.as_str().parse::<u32>()?)),
        None => Ok(None),
    }
}

/// Decode the trailing enum digit of `eval roa_check(...)`, e.g. `(enum 35)1`.
pub fn decode_roa_status(output: &str) -> Option<RoaStatus> {
    output.chars().last().and_then(RoaStatus::from_code)
}

/// Decode VRP rows such as `192.0.2.0/24-24 AS64496 [roa_v4 ...]`.
///
/// A row with an invalid prefix or maximum length fails the whole decode.
pub fn decode_vrps(output: &str) -> Result<Vec<Vrp>, BirdError> {
    let mut vrps = vec![];
    for token in output.lines().filter_map(first_token) {
        if !token.contains('-') {
            continue;
        }
        let parts: Vec<&str> = token.split('-').collect();
        if parts.len() != 2 {
            continue;
        }
        let prefix = parse_prefix(parts[0])
            .map_err(|e| BirdError::DecodeError(format!("invalid VRP prefix {}: {}", parts[0], e)))?;
        let max_length = parts[1].parse::<u8>().map_err(|e| {
            BirdError::DecodeError(format!("invalid VRP max length {}: {}", parts[1], e))
        })?;
        vrps.push(Vrp { prefix, max_length });
    }
    Ok(vrps)
}

/// Prefix and origin ASN of an RPKI invalid route line, e.g.
/// `192.0.2.0/24 unicast [bgp1 10:00] * (100) [AS64496i]`.
///
/// The ASN is the first number from the first `[` onward, so the origin annotation has to be the
/// first bracketed segment of the line.
pub fn parse_invalid_line(line: &str) -> Option<(&str, &str)> {
    let mut fields = line.split_whitespace();
    let prefix = fields.next()?;
    fields.next()?;
    let idx = line.find('[')?;
    let asn = NUMBER_PATTERN.find(&line[idx..])?;
    Some((prefix, asn.as_str()))
}

/// Append every invalid route line of `output` to the inventory.
pub fn collect_invalids(output: &str, inventory: &mut InvalidInventory) {
    for line in output.lines() {
        match parse_invalid_line(line) {
            Some((prefix, asn)) => inventory
                .entry(asn.to_string())
                .or_default()
                .push(prefix.to_string()),
            None => {
                if line.contains('/') {
                    warn!("skipping unrecognized invalid route line: {}", line);
                }
            }
        }
    }
}
