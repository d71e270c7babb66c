//! IPv4 and IPv6 addresses.
//!
//! Candidates are found by shape and then parsed; only real addresses are
//! replaced. The canonical key is the parsed address, so `FE80::1` and
//! `fe80::1` share one replacement.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use mgc_core::Result;
use regex::Regex;

use crate::obfuscator::{is_isolated, replace_matches, replace_spans};
use crate::{Generator, Obfuscator, ReplacementTracker, ReplacementType, ReportingObfuscator};

static IPV4_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").unwrap());

static IPV6_REGEX: LazyLock<Regex> =
    LazyLock::new(|| {
        Regex::new(r"(?i)[0-9a-f]{0,4}(?::[0-9a-f]{0,4}){2,7}(?:(?:\.[0-9]{1,3}){3})?").unwrap()
    });

pub const STATIC_IPV4: &str = "xxx.xxx.xxx.xxx";
pub const STATIC_IPV6: &str = "xxxx:xxxx:xxxx:xxxx:xxxx:xxxx:xxxx:xxxx";
pub const IPV4_TEMPLATE: &str = "x-ipv4-%010d-x";
pub const IPV6_TEMPLATE: &str = "x-ipv6-%010d-x";

pub struct IpObfuscator {
    ipv4: Generator,
    ipv6: Generator,
    tracker: ReplacementTracker,
}

impl IpObfuscator {
    pub fn new(mode: ReplacementType, max_count: Option<u64>) -> Result<Self> {
        Ok(Self {
            ipv4: Generator::new(mode, IPV4_TEMPLATE, STATIC_IPV4, max_count)?,
            ipv6: Generator::new(mode, IPV6_TEMPLATE, STATIC_IPV6, max_count)?,
            tracker: ReplacementTracker::new(),
        })
    }

    fn obfuscate(&self, input: &str) -> Result<String> {
        // v6 first so a mapped address (::ffff:10.0.0.1) is taken whole.
        let output = self.replace_ipv6(input)?;
        self.replace_ipv4(&output)
    }

    fn replace_ipv4(&self, input: &str) -> Result<String> {
        if !input.contains('.') {
            return Ok(input.to_string());
        }
        let output = replace_matches(&IPV4_REGEX, input, |candidate, count| {
            let Ok(addr) = candidate.parse::<Ipv4Addr>() else {
                return Ok(None);
            };
            let canonical = addr.to_string();
            self.tracker
                .generate_if_absent(&canonical, candidate, count, || self.ipv4.generate())
                .map(Some)
        })?;
        Ok(output)
    }

    fn replace_ipv6(&self, input: &str) -> Result<String> {
        if !input.contains(':') {
            return Ok(input.to_string());
        }

        // Fragments such as `std::io` are rejected by position, so only the
        // accepted spans are handed to the replacement pass.
        let spans: Vec<(usize, usize)> = IPV6_REGEX
            .find_iter(input)
            .filter(|m| {
                m.as_str().bytes().any(|b| b.is_ascii_hexdigit())
                    && is_isolated(input, m.start(), m.end(), |c| c.is_ascii_alphanumeric())
                    && m.as_str().parse::<Ipv6Addr>().is_ok()
            })
            .map(|m| (m.start(), m.end()))
            .collect();

        replace_spans(input, &spans, |candidate, count| {
            let Ok(addr) = candidate.parse::<Ipv6Addr>() else {
                return Ok(None);
            };
            let canonical = addr.to_string();
            self.tracker
                .generate_if_absent(&canonical, candidate, count, || self.ipv6.generate())
                .map(Some)
        })
    }
}

impl Obfuscator for IpObfuscator {
    fn path(&self, input: &str) -> Result<String> {
        self.obfuscate(input)
    }

    fn contents(&self, input: &str) -> Result<String> {
        self.obfuscate(input)
    }
}

impl ReportingObfuscator for IpObfuscator {
    fn kind(&self) -> &'static str {
        "ip"
    }

    fn tracker(&self) -> &ReplacementTracker {
        &self.tracker
    }

    fn initialize(&self, report: &mgc_core::ReplacementReport) -> Result<()> {
        self.tracker.initialize(report)?;
        for r in &report.replacements {
            self.ipv4.observe(&r.replaced_with);
            self.ipv6.observe(&r.replaced_with);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn static_ip() -> IpObfuscator {
        IpObfuscator::new(ReplacementType::Static, None).unwrap()
    }

    #[test]
    fn test_ipv4_static() {
        let ip = static_ip();
        assert_eq!(
            ip.contents("received request from 192.168.1.10").unwrap(),
            "received request from xxx.xxx.xxx.xxx"
        );
        let report = ip.report();
        assert_eq!(report.len(), 1);
        assert_eq!(report.replacements[0].canonical, "192.168.1.10");
    }

    #[test]
    fn test_invalid_ipv4_is_left_alone() {
        let ip = static_ip();
        assert_eq!(ip.contents("version 999.1.1.1").unwrap(), "version 999.1.1.1");
        assert!(ip.report().is_empty());
    }

    #[test]
    fn test_ipv6_static_and_canonical() {
        let ip = static_ip();
        let out = ip.contents("peer FE80::1 and fe80::1 via 2001:db8::8a2e:370:7334").unwrap();
        assert_eq!(out, format!("peer {0} and {0} via {0}", STATIC_IPV6));
        let report = ip.report();
        assert_eq!(report.len(), 2);
        let link_local = report.get("fe80::1").unwrap();
        assert_eq!(link_local.occurrences["FE80::1"], 1);
        assert_eq!(link_local.occurrences["fe80::1"], 1);
    }

    #[test]
    fn test_ipv6_lookalikes_ignored() {
        let ip = static_ip();
        for line in [
            "std::io::Result",
            "started at 12:30:45",
            "mac 29:7e:8c:8c:60:c9",
            "separator :: here",
        ] {
            assert_eq!(ip.contents(line).unwrap(), line);
        }
        assert!(ip.report().is_empty());
    }

    #[test]
    fn test_ipv4_mapped_ipv6_is_replaced_whole() {
        let ip = static_ip();
        assert_eq!(
            ip.contents("peer ::ffff:10.0.0.1 ok").unwrap(),
            format!("peer {} ok", STATIC_IPV6)
        );
        let report = ip.report();
        assert_eq!(report.len(), 1);
        assert_eq!(report.replacements[0].canonical, "::ffff:10.0.0.1");
    }

    #[test]
    fn test_fragment_next_to_real_address_is_kept() {
        let ip = static_ip();
        assert_eq!(
            ip.contents("fe80::1 and xfe80::1").unwrap(),
            format!("{} and xfe80::1", STATIC_IPV6)
        );
    }

    #[test]
    fn test_consistent_mode() {
        let ip = IpObfuscator::new(ReplacementType::Consistent, None).unwrap();
        let out = ip.contents("10.0.0.1 -> 10.0.0.2 -> 10.0.0.1").unwrap();
        assert_eq!(out, "x-ipv4-0000000001-x -> x-ipv4-0000000002-x -> x-ipv4-0000000001-x");
        assert_eq!(ip.contents("::1").unwrap(), "x-ipv6-0000000001-x");
        assert_eq!(ip.contents(&out).unwrap(), out);
    }

    #[test]
    fn test_static_output_is_stable_on_second_pass() {
        let ip = static_ip();
        let once = ip.contents("a 10.1.2.3 b 2001:db8::1").unwrap();
        assert_eq!(ip.contents(&once).unwrap(), once);
    }

    #[test]
    fn test_path() {
        let ip = static_ip();
        assert_eq!(
            ip.path("nodes/10.0.0.5/kubelet.log").unwrap(),
            "nodes/xxx.xxx.xxx.xxx/kubelet.log"
        );
    }
}
