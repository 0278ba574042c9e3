//! Hosts-format parsing: `<IP> <name> [<name>…] [# comment]` per line.

use relay_dns_domain::CanonicalName;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::debug;

/// An immutable, fully parsed view of the hosts file. Replaced wholesale on
/// reload; readers never observe a partial parse.
#[derive(Debug, Default)]
pub struct HostsSnapshot {
    by_name: HashMap<CanonicalName, Vec<IpAddr>>,
    by_addr: HashMap<IpAddr, Vec<CanonicalName>>,
    entries: usize,
}

impl HostsSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse file contents. A line that does not parse is skipped and
    /// counted; parsing never fails as a whole.
    pub fn parse(contents: &str) -> (Self, usize) {
        let mut snapshot = Self::empty();
        let mut skipped = 0usize;

        for (lineno, raw) in contents.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let ip: IpAddr = match tokens.next().and_then(|t| t.parse().ok()) {
                Some(ip) => ip,
                None => {
                    debug!(line = lineno + 1, "Skipping hosts line without an IP literal");
                    skipped += 1;
                    continue;
                }
            };

            let names: Option<Vec<CanonicalName>> = tokens
                .map(|t| CanonicalName::from_user(t).ok())
                .collect();
            match names {
                Some(names) if !names.is_empty() => {
                    for name in names {
                        snapshot.insert(name, ip);
                    }
                }
                _ => {
                    debug!(line = lineno + 1, "Skipping hosts line with invalid names");
                    skipped += 1;
                }
            }
        }

        (snapshot, skipped)
    }

    fn insert(&mut self, name: CanonicalName, ip: IpAddr) {
        let addrs = self.by_name.entry(name.clone()).or_default();
        if addrs.contains(&ip) {
            return;
        }
        addrs.push(ip);
        self.by_addr.entry(ip).or_default().push(name);
        self.entries += 1;
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn addresses(&self, name: &CanonicalName) -> Option<&[IpAddr]> {
        self.by_name.get(name).map(Vec::as_slice)
    }

    /// Names bound to an address, in insertion order.
    pub fn names_for(&self, ip: IpAddr) -> Option<&[CanonicalName]> {
        self.by_addr.get(&ip).map(Vec::as_slice)
    }
}

/// Decode a reverse-lookup name (`5.0.0.10.in-addr.arpa.` or the nibble
/// form under `ip6.arpa.`) into the address it points at.
pub fn parse_reverse_name(name: &CanonicalName) -> Option<IpAddr> {
    let labels: Vec<&str> = name.labels().collect();

    if labels.len() == 6 && labels[4] == "in-addr" && labels[5] == "arpa" {
        let mut octets = [0u8; 4];
        for (i, label) in labels[..4].iter().enumerate() {
            octets[3 - i] = label.parse().ok()?;
        }
        return Some(IpAddr::V4(Ipv4Addr::from(octets)));
    }

    if labels.len() == 34 && labels[32] == "ip6" && labels[33] == "arpa" {
        let mut bytes = [0u8; 16];
        for (i, label) in labels[..32].iter().enumerate() {
            if label.len() != 1 {
                return None;
            }
            let nibble = u8::from_str_radix(label, 16).ok()?;
            let byte = 15 - i / 2;
            if i % 2 == 0 {
                bytes[byte] |= nibble;
            } else {
                bytes[byte] |= nibble << 4;
            }
        }
        return Some(IpAddr::V6(Ipv6Addr::from(bytes)));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> CanonicalName {
        CanonicalName::from_user(s).unwrap()
    }

    #[test]
    fn parses_comments_blanks_and_multiple_names() {
        let contents = "\
# local services
10.0.0.5 foo.local bar.local  # both point here

10.0.0.6 baz.local
";
        let (snapshot, skipped) = HostsSnapshot::parse(contents);
        assert_eq!(skipped, 0);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(
            snapshot.addresses(&name("foo.local")).unwrap(),
            &["10.0.0.5".parse::<IpAddr>().unwrap()]
        );
        assert_eq!(
            snapshot.names_for("10.0.0.5".parse().unwrap()).unwrap(),
            &[name("foo.local"), name("bar.local")]
        );
    }

    #[test]
    fn bad_lines_are_skipped_not_fatal() {
        let contents = "\
not-an-ip foo.local
10.0.0.5 foo.local
10.0.0.6
";
        let (snapshot, skipped) = HostsSnapshot::parse(contents);
        assert_eq!(skipped, 2);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn duplicate_pairs_are_deduplicated() {
        let contents = "\
10.0.0.5 foo.local
10.0.0.5 foo.local
";
        let (snapshot, _) = HostsSnapshot::parse(contents);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.addresses(&name("foo.local")).unwrap().len(), 1);
    }

    #[test]
    fn names_are_canonicalised() {
        let (snapshot, _) = HostsSnapshot::parse("10.0.0.5 Foo.LOCAL");
        assert!(snapshot.addresses(&name("foo.local.")).is_some());
    }

    #[test]
    fn reverse_v4_name_decodes() {
        let ip = parse_reverse_name(&name("5.0.0.10.in-addr.arpa")).unwrap();
        assert_eq!(ip, "10.0.0.5".parse::<IpAddr>().unwrap());

        assert!(parse_reverse_name(&name("0.10.in-addr.arpa")).is_none());
        assert!(parse_reverse_name(&name("example.com")).is_none());
    }

    #[test]
    fn reverse_v6_name_decodes() {
        // ::1 reversed: 31 zero nibbles then 1, under ip6.arpa.
        let mut labels: Vec<String> = vec!["1".to_string()];
        labels.extend(std::iter::repeat("0".to_string()).take(31));
        let reverse = format!("{}.ip6.arpa", labels.join("."));
        let ip = parse_reverse_name(&name(&reverse)).unwrap();
        assert_eq!(ip, "::1".parse::<IpAddr>().unwrap());
    }
}
