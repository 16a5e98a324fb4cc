// Route line extractor for Cisco IOS 'show ip route' and ASA 'show route' output
//
// Two header shapes are recognised. Local/Connected lines resolve in one
// line. Static/Dynamic headers may carry an inline `via` and may be followed
// by indented `[ad/metric] via <ip>` continuation lines, bracket optional,
// which are folded into the same entry in the order they appear.

use regex::{Captures, Regex};
use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::OnceLock;
use thiserror::Error;

use super::netmask::{canonical_subnet, convert_netmask_to_prefix_length};
use super::{CanonicalCidr, RouteEntry, RouteKind};

const IPV4: &str = r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}";

static LOCAL_CONNECTED_REGEX: OnceLock<Regex> = OnceLock::new();
static HEADER_REGEX: OnceLock<Regex> = OnceLock::new();
static INLINE_VIA_REGEX: OnceLock<Regex> = OnceLock::new();
static CONTINUATION_REGEX: OnceLock<Regex> = OnceLock::new();
static SUBNETTED_REGEX: OnceLock<Regex> = OnceLock::new();

fn local_connected_regex() -> &'static Regex {
    LOCAL_CONNECTED_REGEX.get_or_init(|| {
        Regex::new(&format!(
            r"^(?P<code>[LC])\s+(?P<address>{ip})\s?(?P<mask>/\d{{1,2}}|{ip})?\s+is directly connected,\s*(?P<interface>\S+)",
            ip = IPV4
        ))
        .expect("Invalid Regex")
    })
}

fn header_regex() -> &'static Regex {
    HEADER_REGEX.get_or_init(|| {
        Regex::new(&format!(
            r"^(?P<code>[A-Za-z][A-Za-z0-9]?\*?(?:\s?[A-Za-z0-9]{{1,2}}\*?)?)\s+(?P<address>{ip})(?:\s?(?P<mask>/\d{{1,2}}|{ip}))?(?P<rest>.*)$",
            ip = IPV4
        ))
        .expect("Invalid Regex")
    })
}

fn inline_via_regex() -> &'static Regex {
    INLINE_VIA_REGEX.get_or_init(|| {
        Regex::new(&format!(
            r"^\s*(?:\[\d+/\d+\]\s+)?via\s+(?P<next_hop>{ip})",
            ip = IPV4
        ))
        .expect("Invalid Regex")
    })
}

fn continuation_regex() -> &'static Regex {
    CONTINUATION_REGEX.get_or_init(|| {
        Regex::new(&format!(
            r"^\s+(?:\[\d+/\d+\]\s+)?via\s+(?P<next_hop>{ip})",
            ip = IPV4
        ))
        .expect("Invalid Regex")
    })
}

fn subnetted_regex() -> &'static Regex {
    SUBNETTED_REGEX.get_or_init(|| {
        Regex::new(&format!(
            r"^\s+{ip}\s?(?P<mask>/\d{{1,2}}|{ip})\s+is (?P<variably>variably )?subnetted",
            ip = IPV4
        ))
        .expect("Invalid Regex")
    })
}

/// Non-fatal problems found while extracting routes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    /// A header was opened but no `via` line was ever found for it
    MalformedEntry { line: usize, subnet: CanonicalCidr },
    /// A mask was present but was neither `/len` nor dotted
    UnrecognizedMask { line: usize, mask: String },
    /// No mask on the line and no enclosing `is subnetted` header
    MissingMask { line: usize, address: String },
    InvalidNextHop { line: usize, next_hop: String },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::MalformedEntry { line, subnet } => {
                write!(f, "line {}: route to {} has no next hop, dropped", line, subnet)
            }
            ParseWarning::UnrecognizedMask { line, mask } => {
                write!(f, "line {}: mask '{}' could not be determined", line, mask)
            }
            ParseWarning::MissingMask { line, address } => {
                write!(f, "line {}: no mask for {}", line, address)
            }
            ParseWarning::InvalidNextHop { line, next_hop } => {
                write!(f, "line {}: next hop '{}' is not an IPv4 address", line, next_hop)
            }
        }
    }
}

/// Zero lines of the input matched any route grammar rule
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no routing table entries found in output")]
pub struct NoEntriesFound;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedRoutes {
    pub routes: Vec<RouteEntry>,
    pub warnings: Vec<ParseWarning>,
}

/// Parse one device's raw route output into entries, in the order they appear.
pub fn extract_routes(raw: &str) -> Result<ExtractedRoutes, NoEntriesFound> {
    let mut extractor = Extractor::new();
    for (index, line) in raw.lines().enumerate() {
        extractor.feed(index + 1, line);
    }
    extractor.finish()
}

#[derive(Debug)]
struct PendingRoute {
    subnet: CanonicalCidr,
    kind: RouteKind,
    next_hops: Vec<Ipv4Addr>,
    raw_lines: Vec<String>,
    line: usize,
}

impl PendingRoute {
    fn into_entry(self) -> RouteEntry {
        RouteEntry::via(self.subnet, self.kind, self.next_hops, self.raw_lines.join("\n"))
    }
}

#[derive(Debug)]
enum State {
    Scanning,
    InContinuation(PendingRoute),
}

struct Extractor {
    state: State,
    routes: Vec<RouteEntry>,
    warnings: Vec<ParseWarning>,
    matched_lines: usize,
    subnetted_prefix: Option<String>,
}

impl Extractor {
    fn new() -> Self {
        Extractor {
            state: State::Scanning,
            routes: Vec::new(),
            warnings: Vec::new(),
            matched_lines: 0,
            subnetted_prefix: None,
        }
    }

    fn feed(&mut self, line_number: usize, line: &str) {
        let continued = match &mut self.state {
            State::InContinuation(pending) => match continuation_regex().captures(line) {
                Some(caps) => {
                    self.matched_lines += 1;
                    match parse_next_hop(&caps, line_number) {
                        Ok(next_hop) => pending.next_hops.push(next_hop),
                        Err(warning) => self.warnings.push(warning),
                    }
                    pending.raw_lines.push(line.trim_end().to_string());
                    true
                }
                None => false,
            },
            State::Scanning => false,
        };

        if continued {
            return;
        }

        // Any other line closes the buffered entry and is scanned afresh
        self.close_pending();
        self.scan(line_number, line);
    }

    fn scan(&mut self, line_number: usize, line: &str) {
        if let Some(caps) = local_connected_regex().captures(line) {
            self.matched_lines += 1;
            let subnet = self.subnet_key(
                line_number,
                &caps["address"],
                caps.name("mask").map(|m| m.as_str()),
            );
            let kind = if &caps["code"] == "L" {
                RouteKind::Local
            } else {
                RouteKind::Connected
            };
            self.routes.push(RouteEntry::attached(
                subnet,
                kind,
                caps["interface"].to_string(),
                line.trim_end().to_string(),
            ));
            return;
        }

        if let Some(caps) = subnetted_regex().captures(line) {
            self.subnetted_prefix = if caps.name("variably").is_some() {
                None
            } else {
                Some(convert_netmask_to_prefix_length(&caps["mask"])).filter(|p| !p.is_empty())
            };
            return;
        }

        let Some(caps) = header_regex().captures(line) else {
            if continuation_regex().is_match(line) {
                tracing::debug!("line {}: continuation without a route header, ignored", line_number);
            }
            return;
        };

        let code = caps["code"].trim();
        if code == "L" || code == "C" {
            tracing::debug!("line {}: attached route without an interface, ignored", line_number);
            return;
        }

        self.matched_lines += 1;
        let subnet = self.subnet_key(
            line_number,
            &caps["address"],
            caps.name("mask").map(|m| m.as_str()),
        );
        let mut pending = PendingRoute {
            subnet,
            kind: RouteKind::from_code(code),
            next_hops: Vec::new(),
            raw_lines: vec![line.trim_end().to_string()],
            line: line_number,
        };

        if let Some(via) = inline_via_regex().captures(&caps["rest"]) {
            match parse_next_hop(&via, line_number) {
                Ok(next_hop) => pending.next_hops.push(next_hop),
                Err(warning) => self.warnings.push(warning),
            }
        }

        self.state = State::InContinuation(pending);
    }

    fn close_pending(&mut self) {
        let State::InContinuation(pending) = std::mem::replace(&mut self.state, State::Scanning)
        else {
            return;
        };

        if pending.next_hops.is_empty() {
            self.warnings.push(ParseWarning::MalformedEntry {
                line: pending.line,
                subnet: pending.subnet,
            });
        } else {
            self.routes.push(pending.into_entry());
        }
    }

    fn subnet_key(&mut self, line_number: usize, address: &str, mask: Option<&str>) -> CanonicalCidr {
        let warning = match (mask, &self.subnetted_prefix) {
            (Some(mask), _) => {
                if let Some(subnet) = canonical_subnet(address, mask) {
                    return subnet;
                }
                ParseWarning::UnrecognizedMask {
                    line: line_number,
                    mask: mask.to_string(),
                }
            }
            (None, Some(prefix)) => return format!("{}{}", address, prefix),
            (None, None) => ParseWarning::MissingMask {
                line: line_number,
                address: address.to_string(),
            },
        };

        self.warnings.push(warning);
        address.to_string()
    }

    fn finish(mut self) -> Result<ExtractedRoutes, NoEntriesFound> {
        self.close_pending();

        if self.matched_lines == 0 {
            return Err(NoEntriesFound);
        }

        Ok(ExtractedRoutes {
            routes: self.routes,
            warnings: self.warnings,
        })
    }
}

fn parse_next_hop(caps: &Captures<'_>, line_number: usize) -> Result<Ipv4Addr, ParseWarning> {
    let text = &caps["next_hop"];
    text.parse().map_err(|_| ParseWarning::InvalidNextHop {
        line: line_number,
        next_hop: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const IOS_OUTPUT: &str = r#"Codes: L - local, C - connected, S - static, R - RIP, M - mobile, B - BGP
       D - EIGRP, EX - EIGRP external, O - OSPF, IA - OSPF inter area
       E1 - OSPF external type 1, E2 - OSPF external type 2

Gateway of last resort is 10.0.0.1 to network 0.0.0.0

S*    0.0.0.0/0 [1/0] via 10.0.0.1
      10.0.0.0/8 is variably subnetted, 2 subnets, 2 masks
C        10.0.0.0/24 is directly connected, GigabitEthernet0/1
L        10.0.0.2/32 is directly connected, GigabitEthernet0/1
O E2     172.16.0.0/16 [110/20] via 10.0.0.5, 00:01:02, GigabitEthernet0/1
                       [110/20] via 10.0.0.6, 00:01:02, GigabitEthernet0/1
B        192.168.50.0/24 [20/0] via 10.0.0.9, 2w1d"#;

    #[test]
    fn test_parse_ios_route_table() {
        let extracted = extract_routes(IOS_OUTPUT).unwrap();
        let subnets: Vec<&str> = extracted.routes.iter().map(|r| r.subnet.as_str()).collect();

        assert_eq!(
            subnets,
            vec![
                "0.0.0.0/0",
                "10.0.0.0/24",
                "10.0.0.2/32",
                "172.16.0.0/16",
                "192.168.50.0/24"
            ]
        );
        assert!(extracted.warnings.is_empty());

        assert_eq!(extracted.routes[0].kind, RouteKind::Static);
        assert_eq!(extracted.routes[1].kind, RouteKind::Connected);
        assert_eq!(extracted.routes[2].kind, RouteKind::Local);
        assert_eq!(
            extracted.routes[2].interface.as_deref(),
            Some("GigabitEthernet0/1")
        );
        assert_eq!(extracted.routes[4].kind, RouteKind::Dynamic);
        assert!(extracted.routes.iter().all(|r| r.is_well_formed()));
    }

    #[test]
    fn test_inline_via_keeps_following_continuations() {
        let extracted = extract_routes(IOS_OUTPUT).unwrap();
        let ospf = &extracted.routes[3];

        assert_eq!(
            ospf.next_hops,
            vec![
                "10.0.0.5".parse::<Ipv4Addr>().unwrap(),
                "10.0.0.6".parse::<Ipv4Addr>().unwrap()
            ]
        );
        assert_eq!(ospf.raw_text.lines().count(), 2);
    }

    #[test]
    fn test_header_with_continuation_lines() {
        let output = "D EX  192.168.10.0/24\n\
                      \x20          [170/2816] via 10.0.0.7, 1d02h, GigabitEthernet0/1\n\
                      \x20          [170/2816] via 10.0.0.8, 1d02h, GigabitEthernet0/2\n\
                      \x20          [170/2816] via 10.0.0.9, 1d02h, GigabitEthernet0/3\n";

        let extracted = extract_routes(output).unwrap();

        assert_eq!(extracted.routes.len(), 1);
        let route = &extracted.routes[0];
        assert_eq!(route.subnet, "192.168.10.0/24");
        let hops: Vec<String> = route.next_hops.iter().map(|h| h.to_string()).collect();
        assert_eq!(hops, vec!["10.0.0.7", "10.0.0.8", "10.0.0.9"]);
    }

    #[test]
    fn test_continuation_without_metric_bracket() {
        let output = "S     10.50.0.0/16\n    via 10.0.0.1\n    via 10.0.0.2\n    via 10.0.0.3\n";

        let extracted = extract_routes(output).unwrap();

        assert_eq!(extracted.routes.len(), 1);
        assert_eq!(extracted.routes[0].next_hops.len(), 3);
        assert_eq!(extracted.routes[0].next_hops[2].to_string(), "10.0.0.3");
    }

    #[test]
    fn test_parse_asa_show_route() {
        let output = r#"Gateway of last resort is 203.0.113.1 to network 0.0.0.0

S*       0.0.0.0 0.0.0.0 [1/0] via 203.0.113.1, outside
C        10.1.1.0 255.255.255.0 is directly connected, inside
L        10.1.1.1 255.255.255.255 is directly connected, inside
S        10.20.0.0 255.255.0.0 [1/0] via 10.1.1.254, inside
                               [1/0] via 10.1.1.253, inside"#;

        let extracted = extract_routes(output).unwrap();
        let subnets: Vec<&str> = extracted.routes.iter().map(|r| r.subnet.as_str()).collect();

        assert_eq!(
            subnets,
            vec!["0.0.0.0/0", "10.1.1.0/24", "10.1.1.1/32", "10.20.0.0/16"]
        );
        assert_eq!(extracted.routes[3].next_hops.len(), 2);
        assert_eq!(extracted.routes[1].interface.as_deref(), Some("inside"));
    }

    #[test]
    fn test_header_without_via_is_dropped_at_end_of_input() {
        let output = "C 10.0.0.0/24 is directly connected, Gi0/0\nO 10.9.0.0/16\n";

        let extracted = extract_routes(output).unwrap();

        assert_eq!(extracted.routes.len(), 1);
        assert_eq!(
            extracted.warnings,
            vec![ParseWarning::MalformedEntry {
                line: 2,
                subnet: "10.9.0.0/16".to_string()
            }]
        );
    }

    #[test]
    fn test_header_without_via_is_closed_by_next_header() {
        let output = "S 10.0.0.0/8 is directly connected, Null0\nS 10.1.0.0/16 [1/0] via 10.0.0.1\n";

        let extracted = extract_routes(output).unwrap();

        assert_eq!(extracted.routes.len(), 1);
        assert_eq!(extracted.routes[0].subnet, "10.1.0.0/16");
        assert_eq!(extracted.warnings.len(), 1);
    }

    #[test]
    fn test_garbage_yields_no_entries() {
        let output = "% Invalid input detected at '^' marker.\n\nR1#";
        assert_eq!(extract_routes(output), Err(NoEntriesFound));
        assert_eq!(extract_routes(""), Err(NoEntriesFound));
    }

    #[test]
    fn test_maskless_entries_use_subnetted_header() {
        let output = r#"     10.0.0.0/24 is subnetted, 2 subnets
C       10.1.1.0 is directly connected, FastEthernet0/0
O       10.2.2.0 [110/2] via 10.1.1.2, 00:00:12, FastEthernet0/0
C    192.168.1.0/24 is directly connected, FastEthernet0/1"#;

        let extracted = extract_routes(output).unwrap();
        let subnets: Vec<&str> = extracted.routes.iter().map(|r| r.subnet.as_str()).collect();

        assert_eq!(subnets, vec!["10.1.1.0/24", "10.2.2.0/24", "192.168.1.0/24"]);
        assert!(extracted.warnings.is_empty());
    }

    #[test]
    fn test_unrecognized_mask_is_reported() {
        let output = "C 10.0.0.0/40 is directly connected, Gi0/0\n";

        let extracted = extract_routes(output).unwrap();

        assert_eq!(extracted.routes[0].subnet, "10.0.0.0");
        assert_eq!(
            extracted.warnings,
            vec![ParseWarning::UnrecognizedMask {
                line: 1,
                mask: "/40".to_string()
            }]
        );
    }

    #[test]
    fn test_invalid_next_hop_is_skipped() {
        let output = "S 10.5.0.0/16 [1/0] via 10.0.0.300\n  [1/0] via 10.0.0.3\n";

        let extracted = extract_routes(output).unwrap();

        assert_eq!(extracted.routes.len(), 1);
        assert_eq!(extracted.routes[0].next_hops.len(), 1);
        assert!(matches!(
            extracted.warnings[0],
            ParseWarning::InvalidNextHop { line: 1, .. }
        ));
    }
}
