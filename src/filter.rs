// Copyright 2025 Anapaya Systems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! CIDR containment over multiaddrs.

use std::net::IpAddr;

use crate::{
    errors::{InvalidParametersError, Result},
    multiaddr::Multiaddr,
    registry::{CODE_IP4, CODE_IP6, CODE_IPCIDR},
};

/// Tests whether multiaddrs fall inside a CIDR range.
///
/// The range is itself a multiaddr carrying an IP component and an
/// `ipcidr` prefix length, e.g. `/ip4/192.168.10.10/ipcidr/24`.
///
/// # Examples
///
/// ```
/// use multiaddr::{Multiaddr, MultiaddrFilter};
///
/// let range: Multiaddr = "/ip4/192.168.10.10/ipcidr/24".parse().unwrap();
/// let filter = MultiaddrFilter::new(range).unwrap();
///
/// let input: Multiaddr = "/ip4/192.168.10.2/udp/60".parse().unwrap();
/// assert!(filter.contains(&input));
/// ```
#[derive(Debug, Clone)]
pub struct MultiaddrFilter {
    multiaddr: Multiaddr,
    network: IpAddr,
    prefix: u8,
}

impl MultiaddrFilter {
    /// Creates a filter from a range multiaddr.
    ///
    /// Fails with [`InvalidParametersError`] when the address has no
    /// decodable IP and `ipcidr` components.
    pub fn new(multiaddr: Multiaddr) -> Result<Self> {
        let mut network = None;
        let mut prefix = None;

        for component in &multiaddr {
            match component.code() {
                CODE_IP4 | CODE_IP6 => {
                    network = component.value().and_then(|value| value.parse().ok());
                }
                CODE_IPCIDR => {
                    prefix = component.value().and_then(|value| value.parse().ok());
                }
                _ => {}
            }
        }

        let (Some(network), Some(prefix)) = (network, prefix) else {
            return Err(InvalidParametersError(
                "multiaddr must contain an IP address and an ipcidr prefix length".into(),
            )
            .into());
        };

        Ok(Self {
            multiaddr,
            network,
            prefix,
        })
    }

    /// The range multiaddr this filter was built from.
    pub fn multiaddr(&self) -> &Multiaddr {
        &self.multiaddr
    }

    /// Returns true when the first IP component of `addr` falls inside the
    /// range. Addresses without an IP component are not contained.
    pub fn contains(&self, addr: &Multiaddr) -> bool {
        let ip = addr.iter().find_map(|component| {
            matches!(component.code(), CODE_IP4 | CODE_IP6)
                .then(|| component.value())
                .flatten()
                .and_then(|value| value.parse::<IpAddr>().ok())
        });

        match ip {
            Some(ip) => in_prefix(self.network, self.prefix, ip),
            None => false,
        }
    }
}

fn in_prefix(network: IpAddr, prefix: u8, ip: IpAddr) -> bool {
    match (network, ip) {
        (IpAddr::V4(network), IpAddr::V4(ip)) => {
            octets_match(&network.octets(), &ip.octets(), prefix)
        }
        (IpAddr::V6(network), IpAddr::V6(ip)) => {
            octets_match(&network.octets(), &ip.octets(), prefix)
        }
        _ => false,
    }
}

fn octets_match(network: &[u8], ip: &[u8], prefix: u8) -> bool {
    let prefix = usize::from(prefix).min(network.len() * 8);
    let full_bytes = prefix / 8;
    let remaining_bits = prefix % 8;

    if network[..full_bytes] != ip[..full_bytes] {
        return false;
    }
    if remaining_bits == 0 {
        return true;
    }

    let mask = 0xffu8 << (8 - remaining_bits);
    (network[full_bytes] & mask) == (ip[full_bytes] & mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(range: &str) -> MultiaddrFilter {
        MultiaddrFilter::new(range.parse().unwrap()).unwrap()
    }

    fn addr(input: &str) -> Multiaddr {
        input.parse().unwrap()
    }

    #[test]
    fn contains_addresses_in_the_range() {
        let filter = filter("/ip4/192.168.10.10/ipcidr/24");

        assert!(filter.contains(&addr("/ip4/192.168.10.2/udp/60")));
        assert!(filter.contains(&addr("/ip4/192.168.10.255/tcp/80")));
        assert!(!filter.contains(&addr("/ip4/192.168.11.2/udp/60")));
        assert!(!filter.contains(&addr("/ip4/10.0.0.1/udp/60")));
    }

    #[test]
    fn partial_byte_prefixes() {
        let filter = filter("/ip4/10.0.0.0/ipcidr/9");

        assert!(filter.contains(&addr("/ip4/10.127.0.1")));
        assert!(!filter.contains(&addr("/ip4/10.128.0.1")));
    }

    #[test]
    fn ipv6_ranges() {
        let filter = filter("/ip6/2001:db8::/ipcidr/32");

        assert!(filter.contains(&addr("/ip6/2001:db8::1/tcp/443")));
        assert!(!filter.contains(&addr("/ip6/2001:db9::1/tcp/443")));
    }

    #[test]
    fn mismatched_families_are_not_contained() {
        let filter = filter("/ip4/192.168.10.10/ipcidr/24");
        assert!(!filter.contains(&addr("/ip6/::1/tcp/80")));
    }

    #[test]
    fn addresses_without_ip_components_are_not_contained() {
        let filter = filter("/ip4/192.168.10.10/ipcidr/24");
        assert!(!filter.contains(&addr("/dns4/example.com/tcp/443")));
    }

    #[test]
    fn range_without_ipcidr_fails() {
        let err = MultiaddrFilter::new(addr("/ip4/192.168.10.10")).unwrap_err();
        assert!(matches!(err, crate::errors::Error::InvalidParameters(_)));
    }
}
