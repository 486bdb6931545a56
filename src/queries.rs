//! Typed queries against the BIRD daemon.
//!
//! Each method sends one or more commands through the client's [crate::Querier] and decodes the
//! output with the functions in [crate::decode]. Methods that send several commands do so one
//! after another without any snapshot, so their counts may straddle a change in the daemon's
//! tables.

use crate::decode::{
    asn_statistics, collect_invalids, count_route_lines, decode_as_path, decode_count,
    decode_mask_histogram, decode_origin, decode_peer_counts, decode_roa_status, decode_route,
    decode_route_totals, decode_vrps, extract_prefixes, extract_source_asns, find_as_path,
};
use crate::{
    AsPath, AsnStatistics, BirdClient, BirdError, InvalidInventory, LargeCommunityCounts,
    MaskHistogram, PeerCounts, RoaCounts, RoaStatus, RouteTotals, Vrp,
};
use ipnet::IpNet;
use std::net::IpAddr;
use tracing::debug;

/// Address family, selecting the routing and ROA tables to query.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Family {
    V4,
    V6,
}

impl Family {
    const ALL: [Family; 2] = [Family::V4, Family::V6];

    fn table(&self) -> &'static str {
        match self {
            Family::V4 => "master4",
            Family::V6 => "master6",
        }
    }

    fn roa_table(&self) -> &'static str {
        match self {
            Family::V4 => "roa_v4",
            Family::V6 => "roa_v6",
        }
    }

    fn primary_routes(&self) -> String {
        format!("show route primary table {}", self.table())
    }

    fn roa_filter(&self, state: &str) -> String {
        format!(
            "{} where roa_check({}) = {}",
            self.primary_routes(),
            self.roa_table(),
            state
        )
    }
}

impl BirdClient {
    /// Get the daemon version line from `show status`, e.g. `BIRD 2.15.1`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// let client = bgpkit_birdc::BirdClient::new();
    /// println!("{}", client.version().unwrap());
    /// ```
    pub fn version(&self) -> Result<String, BirdError> {
        let out = self.query("show status")?;
        match out.lines().next() {
            Some(line) if !line.is_empty() => Ok(line.to_string()),
            _ => Err(BirdError::DecodeError("empty status output".to_string())),
        }
    }

    /// Get the RIB and FIB sizes of the IPv4 and IPv6 master tables.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// let totals = bgpkit_birdc::BirdClient::new().bgp_totals().unwrap();
    /// println!("IPv4 RIB: {}, FIB: {}", totals.v4_rib, totals.v4_fib);
    /// println!("IPv6 RIB: {}, FIB: {}", totals.v6_rib, totals.v6_fib);
    /// ```
    pub fn bgp_totals(&self) -> Result<RouteTotals, BirdError> {
        let out = self.query("show route count")?;
        Ok(decode_route_totals(&out))
    }

    /// Get the number of configured and established BGP sessions per address family.
    ///
    /// Sessions are recognised by `_v4` or `_v6` in their protocol name.
    pub fn peers(&self) -> Result<PeerCounts, BirdError> {
        let out = self.query("show protocols")?;
        Ok(decode_peer_counts(&out))
    }

    /// Count the unique origin ASNs of the IPv4 and IPv6 tables and how they overlap.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// let asns = bgpkit_birdc::BirdClient::new().source_asns().unwrap();
    /// assert_eq!(asns.as4_only + asns.as_both, asns.as4);
    /// ```
    pub fn source_asns(&self) -> Result<AsnStatistics, BirdError> {
        let out4 = self.query(&Family::V4.primary_routes())?;
        let out6 = self.query(&Family::V6.primary_routes())?;

        let as4 = extract_source_asns(&out4);
        let as6 = extract_source_asns(&out6);
        debug!(
            "found {} IPv4 and {} IPv6 origin ASNs",
            as4.len(),
            as6.len()
        );
        Ok(asn_statistics(&as4, &as6))
    }

    /// Count the primary routes of each prefix length, per address family.
    pub fn masks(&self) -> Result<MaskHistogram, BirdError> {
        let out4 = self.query(&Family::V4.primary_routes())?;
        let out6 = self.query(&Family::V6.primary_routes())?;
        Ok(MaskHistogram {
            v4: decode_mask_histogram(&out4),
            v6: decode_mask_histogram(&out6),
        })
    }

    /// Count primary routes per RPKI validation state and address family.
    ///
    /// This sends six separate count queries.
    pub fn roas(&self) -> Result<RoaCounts, BirdError> {
        let count = |family: Family, state: &str| -> Result<u32, BirdError> {
            let out = self.query(&format!("{} count", family.roa_filter(state)))?;
            Ok(decode_count(&out))
        };

        Ok(RoaCounts {
            v4_valid: count(Family::V4, "ROA_VALID")?,
            v4_invalid: count(Family::V4, "ROA_INVALID")?,
            v4_unknown: count(Family::V4, "ROA_UNKNOWN")?,
            v6_valid: count(Family::V6, "ROA_VALID")?,
            v6_invalid: count(Family::V6, "ROA_INVALID")?,
            v6_unknown: count(Family::V6, "ROA_UNKNOWN")?,
        })
    }

    /// Count the prefixes that carry at least one large community (RFC 8092).
    ///
    /// Route lines are told apart from other output by starting with a digit or a colon, so a
    /// prose line starting with a digit would be miscounted.
    pub fn large_communities(&self) -> Result<LargeCommunityCounts, BirdError> {
        let count = |family: Family| -> Result<u32, BirdError> {
            let out = self.query(&format!(
                "{} where bgp_large_community ~ [(*,*,*)]",
                family.primary_routes()
            ))?;
            Ok(count_route_lines(&out))
        };

        Ok(LargeCommunityCounts {
            v4: count(Family::V4)?,
            v6: count(Family::V6)?,
        })
    }

    /// Get all IPv4 prefixes originated by `asn`, in the order the daemon lists them.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// let prefixes = bgpkit_birdc::BirdClient::new().ipv4_from_source(13335).unwrap();
    /// for prefix in prefixes {
    ///     println!("{}", prefix);
    /// }
    /// ```
    pub fn ipv4_from_source(&self, asn: u32) -> Result<Vec<IpNet>, BirdError> {
        self.prefixes_from_source(Family::V4, asn)
    }

    /// Get all IPv6 prefixes originated by `asn`, in the order the daemon lists them.
    pub fn ipv6_from_source(&self, asn: u32) -> Result<Vec<IpNet>, BirdError> {
        self.prefixes_from_source(Family::V6, asn)
    }

    fn prefixes_from_source(&self, family: Family, asn: u32) -> Result<Vec<IpNet>, BirdError> {
        let out = self.query(&format!(
            "{} where bgp_path ~ [= * {} =]",
            family.primary_routes(),
            asn
        ))?;
        Ok(extract_prefixes(&out))
    }

    /// Get the AS path, and the trailing AS-SET if any, of the best route towards `ip`.
    ///
    /// Returns `Ok(None)` when there is no route or the route has no AS path.
    pub fn as_path_from_ip(&self, ip: IpAddr) -> Result<Option<AsPath>, BirdError> {
        let out = self.query(&format!("show route primary all for {}", ip))?;
        Ok(find_as_path(&out).map(decode_as_path))
    }

    /// Get the origin ASN of the best route towards `ip`.
    ///
    /// The origin is the last ASN of the path with any AS-SET removed. Returns `Ok(None)` when
    /// there is no route or the route has no AS path.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::net::IpAddr;
    ///
    /// let client = bgpkit_birdc::BirdClient::new();
    /// let ip: IpAddr = "1.1.1.1".parse().unwrap();
    /// if let Some(asn) = client.origin_from_ip(ip).unwrap() {
    ///     println!("{} is originated by AS{}", ip, asn);
    /// }
    /// ```
    pub fn origin_from_ip(&self, ip: IpAddr) -> Result<Option<u32>, BirdError> {
        let out = self.query(&format!("show route primary all for {}", ip))?;
        match find_as_path(&out) {
            Some(path) => decode_origin(path),
            None => Ok(None),
        }
    }

    /// Get the prefix of the forwarding entry covering `ip`, or `Ok(None)` if there is none.
    pub fn route(&self, ip: IpAddr) -> Result<Option<IpNet>, BirdError> {
        let out = self.query(&format!("show route primary for {}", ip))?;
        Ok(decode_route(&out))
    }

    /// Evaluate the RPKI state of `prefix` originated by `asn` against the daemon's ROA tables.
    ///
    /// Returns `Ok(None)` when the daemon's answer does not end in a known state.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use bgpkit_birdc::{BirdClient, RoaStatus};
    ///
    /// let client = BirdClient::new();
    /// let prefix = "1.1.1.0/24".parse().unwrap();
    /// assert_eq!(client.roa(&prefix, 13335).unwrap(), Some(RoaStatus::Valid));
    /// ```
    pub fn roa(&self, prefix: &IpNet, asn: u32) -> Result<Option<RoaStatus>, BirdError> {
        let prefix = prefix.to_string();
        let table = match prefix.contains(':') {
            true => Family::V6.roa_table(),
            false => Family::V4.roa_table(),
        };
        let out = self.query(&format!("eval roa_check({}, {}, {})", table, prefix, asn))?;
        Ok(decode_roa_status(&out))
    }

    /// Get the Validated ROA Payloads of `asn`, IPv4 first.
    ///
    /// A malformed VRP row fails the whole call.
    pub fn vrps(&self, asn: u32) -> Result<Vec<Vrp>, BirdError> {
        let mut vrps = vec![];
        for family in Family::ALL {
            let out = self.query(&format!(
                "show route all table {} where net.asn={}",
                family.roa_table(),
                asn
            ))?;
            if !out.is_empty() {
                vrps.extend(decode_vrps(&out)?);
            }
        }
        Ok(vrps)
    }

    /// Get the ASNs advertising RPKI invalid routes, each with the prefixes it advertises.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// let invalids = bgpkit_birdc::BirdClient::new().invalids().unwrap();
    /// for (asn, prefixes) in &invalids {
    ///     println!("AS{}: {} invalid prefixes", asn, prefixes.len());
    /// }
    /// ```
    pub fn invalids(&self) -> Result<InvalidInventory, BirdError> {
        let mut inventory = InvalidInventory::new();
        for family in Family::ALL {
            let out = self.query(&family.roa_filter("ROA_INVALID"))?;
            collect_invalids(&out, &mut inventory);
        }
        Ok(inventory)
    }
}
