//! Typed results decoded from BIRD command output.
//!
//! Every value here is built fresh from the output of one client call and holds no reference
//! back to the client.
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};

/// RIB and FIB sizes per address family, from `show route count`.
///
/// The FIB is expected to be no larger than the RIB, but this is not enforced.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[cfg_attr(feature = "cli", derive(tabled::Tabled))]
pub struct RouteTotals {
    /// number of IPv4 routes
    pub v4_rib: u32,
    /// number of IPv4 networks selected for forwarding
    pub v4_fib: u32,
    /// number of IPv6 routes
    pub v6_rib: u32,
    /// number of IPv6 networks selected for forwarding
    pub v6_fib: u32,
}

/// BGP session counts per address family.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[cfg_attr(feature = "cli", derive(tabled::Tabled))]
pub struct PeerCounts {
    pub v4_configured: u32,
    pub v4_established: u32,
    pub v6_configured: u32,
    pub v6_established: u32,
}

/// Counts of unique origin ASNs seen in the IPv4 and IPv6 tables.
///
/// - `as4`: ASNs originating IPv4
/// - `as6`: ASNs originating IPv6
/// - `as_union`: ASNs originating IPv4, IPv6, or both
/// - `as4_only`: ASNs originating IPv4 only
/// - `as6_only`: ASNs originating IPv6 only
/// - `as_both`: ASNs originating both IPv4 and IPv6
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[cfg_attr(feature = "cli", derive(tabled::Tabled))]
pub struct AsnStatistics {
    pub as4: u32,
    pub as6: u32,
    pub as_union: u32,
    pub as4_only: u32,
    pub as6_only: u32,
    pub as_both: u32,
}

/// RPKI validation outcomes per address family.
///
/// The six values come from six separate queries, so they do not have to add up to the route
/// totals.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[cfg_attr(feature = "cli", derive(tabled::Tabled))]
pub struct RoaCounts {
    pub v4_valid: u32,
    pub v4_invalid: u32,
    pub v4_unknown: u32,
    pub v6_valid: u32,
    pub v6_invalid: u32,
    pub v6_unknown: u32,
}

/// Number of prefixes carrying RFC 8092 large communities.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[cfg_attr(feature = "cli", derive(tabled::Tabled))]
pub struct LargeCommunityCounts {
    pub v4: u32,
    pub v6: u32,
}

/// Prefix-length histograms, keyed by the mask length as printed by the daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct MaskHistogram {
    pub v4: HashMap<String, u32>,
    pub v6: HashMap<String, u32>,
}

/// AS path towards a destination.
///
/// `path` is in path order. `set` holds the members of a trailing AS-SET (`{...}`) and is empty
/// when the path has none.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct AsPath {
    pub path: Vec<u32>,
    pub set: Vec<u32>,
}

impl AsPath {
    /// The last ASN of the ordered path, if any.
    pub fn origin(&self) -> Option<u32> {
        self.path.last().copied()
    }
}

/// RPKI verdict for a prefix and origin ASN.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RoaStatus {
    Unknown = 0,
    Valid = 1,
    Invalid = 2,
}

impl RoaStatus {
    /// Map the enum digit printed by `eval roa_check(...)` to a status.
    pub fn from_code(code: char) -> Option<RoaStatus> {
        match code {
            '0' => Some(RoaStatus::Unknown),
            '1' => Some(RoaStatus::Valid),
            '2' => Some(RoaStatus::Invalid),
            _ => None,
        }
    }
}

impl Display for RoaStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RoaStatus::Unknown => write!(f, "unknown"),
            RoaStatus::Valid => write!(f, "valid"),
            RoaStatus::Invalid => write!(f, "invalid"),
        }
    }
}

/// A Validated ROA Payload listed for an ASN.
///
/// `max_length` is trusted as printed; it is not checked against the prefix length.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "cli", derive(tabled::Tabled))]
pub struct Vrp {
    pub prefix: IpNet,
    pub max_length: u8,
}

/// ASN (as printed) to the prefixes it advertises with an RPKI invalid state, in discovery order.
pub type InvalidInventory = BTreeMap<String, Vec<String>>;

macro_rules! json_display {
    ($($ty:ty),*) => {
        $(
            #[allow(clippy::unwrap_used)]
            impl Display for $ty {
                fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", serde_json::to_string(self).unwrap())
                }
            }
        )*
    };
}

json_display!(
    RouteTotals,
    PeerCounts,
    AsnStatistics,
    RoaCounts,
    LargeCommunityCounts,
    MaskHistogram,
    AsPath,
    Vrp
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roa_status_codes() {
        assert_eq!(RoaStatus::from_code('0'), Some(RoaStatus::Unknown));
        assert_eq!(RoaStatus::from_code('1'), Some(RoaStatus::Valid));
        assert_eq!(RoaStatus::from_code('2'), Some(RoaStatus::Invalid));
        assert_eq!(RoaStatus::from_code('3'), None);
        assert_eq!(RoaStatus::from_code(')'), None);
        assert_eq!(RoaStatus::Invalid as u8, 2);
    }

    #[test]
    fn test_display_json() {
        let totals = RouteTotals {
            v4_rib: 10,
            v4_fib: 5,
            v6_rib: 2,
            v6_fib: 1,
        };
        assert_eq!(
            totals.to_string(),
            r#"{"v4_rib":10,"v4_fib":5,"v6_rib":2,"v6_fib":1}"#
        );

        let vrp = Vrp {
            prefix: "192.0.2.0/24".parse().unwrap(),
            max_length: 24,
        };
        assert_eq!(vrp.to_string(), r#"{"prefix":"192.0.2.0/24","max_length":24}"#);
    }

    #[test]
    fn test_as_path_origin() {
        let path = AsPath {
            path: vec![3356, 15169],
            set: vec![],
        };
        assert_eq!(path.origin(), Some(15169));
        assert_eq!(AsPath::default().origin(), None);
    }
}
