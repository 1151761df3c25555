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

//! The immutable multiaddr value type.

use std::{
    fmt::{self, Debug, Display, Formatter},
    hash::{Hash, Hasher},
    str::FromStr,
};

use bytes::Bytes;
use cid::Cid;
use multibase::Base;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    codec,
    component::Component,
    errors::{Error, InvalidParametersError, Result},
    registry::{
        self, Registry, CODE_DNS, CODE_DNS4, CODE_DNS6, CODE_DNSADDR, CODE_IP4, CODE_IP6,
        CODE_IP6ZONE, CODE_P2P, CODE_P2P_CIRCUIT, CODE_TCP, CODE_UDP,
    },
};

const DNS_CODES: [u64; 4] = [CODE_DNS, CODE_DNS4, CODE_DNS6, CODE_DNSADDR];

/// The IP family of a resolved endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpFamily {
    /// IPv4.
    V4,
    /// IPv6.
    V6,
}

impl IpFamily {
    /// The numeric family, 4 or 6.
    pub const fn number(&self) -> u8 {
        match self {
            IpFamily::V4 => 4,
            IpFamily::V6 => 6,
        }
    }
}

/// The transport of a resolved endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transport {
    /// TCP.
    Tcp,
    /// UDP.
    Udp,
}

impl Display for Transport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Transport::Tcp => "tcp",
            Transport::Udp => "udp",
        })
    }
}

/// The endpoint description derived from a multiaddr's components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiaddrOptions {
    /// IP family of the host.
    pub family: IpFamily,
    /// Host address or name, including any IPv6 zone suffix.
    pub host: String,
    /// Transport protocol.
    pub transport: Transport,
    /// Transport port.
    pub port: u16,
}

/// A host / port pair for dialing, derived from a multiaddr's components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddress {
    /// IP family of the address.
    pub family: IpFamily,
    /// Host address or name.
    pub address: String,
    /// Transport port.
    pub port: u16,
}

/// An immutable, self-describing network address: an ordered sequence of
/// typed [`Component`]s with interchangeable binary and string forms.
///
/// Every transformation returns a fresh value; a constructed multiaddr is
/// never mutated. Equality is byte-exact comparison of the binary
/// encodings.
///
/// # Examples
///
/// ```
/// use multiaddr::Multiaddr;
///
/// let addr: Multiaddr = "/ip4/127.0.0.1/udp/1234".parse().unwrap();
/// assert_eq!(addr.to_bytes().as_ref(), b"\x04\x7f\x00\x00\x01\x91\x02\x04\xd2");
/// assert_eq!(addr.to_string(), "/ip4/127.0.0.1/udp/1234");
/// ```
#[derive(Clone)]
pub struct Multiaddr {
    components: Vec<Component>,
    bytes: Bytes,
}

impl Multiaddr {
    /// The multiaddr with no components. Its string form is `/` and its
    /// binary form is empty.
    pub fn empty() -> Self {
        Self {
            components: Vec::new(),
            bytes: Bytes::new(),
        }
    }

    /// Parses a string multiaddr against the given registry.
    pub fn parse(registry: &Registry, input: &str) -> Result<Self> {
        Ok(Self::from_components(codec::string_to_components(
            registry, input,
        )?))
    }

    /// Decodes a binary multiaddr against the given registry.
    pub fn from_bytes(registry: &Registry, bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_components(codec::bytes_to_components(
            registry, bytes,
        )?))
    }

    /// Builds a multiaddr from components that were constructed through a
    /// registry. No re-validation takes place.
    pub fn from_components(components: Vec<Component>) -> Self {
        let bytes = codec::components_to_bytes(&components);

        Self { components, bytes }
    }

    /// The ordered component sequence.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Iterates over the components.
    pub fn iter(&self) -> std::slice::Iter<'_, Component> {
        self.components.iter()
    }

    /// The number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns true if the multiaddr has no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// The binary encoding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The binary encoding, shared without copying.
    pub fn to_bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    /// The protocol code of every component, in order.
    pub fn protocol_codes(&self) -> Vec<u64> {
        self.components.iter().map(Component::code).collect()
    }

    /// The protocol name of every component, in order.
    pub fn protocol_names(&self) -> Vec<&str> {
        self.components.iter().map(Component::name).collect()
    }

    /// The registry descriptor of every component, in order.
    pub fn protocols<'r>(
        &self,
        registry: &'r Registry,
    ) -> Result<Vec<&'r registry::ProtocolCodec>> {
        self.components
            .iter()
            .map(|component| Ok(registry.get_protocol(component.code())?))
            .collect()
    }

    /// Returns a new multiaddr with `other`'s components appended.
    ///
    /// Components are individually valid already, so no re-validation
    /// takes place.
    pub fn encapsulate(&self, other: &Multiaddr) -> Multiaddr {
        let mut components = self.components.clone();
        components.extend_from_slice(&other.components);

        Self::from_components(components)
    }

    /// Returns a new multiaddr truncated immediately before the last
    /// occurrence of `other`'s component sequence.
    ///
    /// Fails with [`InvalidParametersError`] when `other` does not occur in
    /// `self`. An empty `other` occurs trivially at the end, returning an
    /// equal multiaddr.
    pub fn decapsulate(&self, other: &Multiaddr) -> Result<Multiaddr> {
        let needle = other.components();
        if needle.is_empty() {
            return Ok(self.clone());
        }

        let haystack = &self.components;
        let start = (haystack.len() >= needle.len()).then(|| {
            (0..=haystack.len() - needle.len())
                .rev()
                .find(|&i| &haystack[i..i + needle.len()] == needle)
        });

        match start.flatten() {
            Some(i) => Ok(Self::from_components(haystack[..i].to_vec())),
            None => Err(InvalidParametersError(format!(
                "address {} does not contain subaddress: {}",
                self, other
            ))
            .into()),
        }
    }

    /// Returns a new multiaddr truncated immediately before the last
    /// component with the given code, or an equal multiaddr when no
    /// component matches.
    pub fn decapsulate_code(&self, code: u64) -> Multiaddr {
        match self.components.iter().rposition(|c| c.code() == code) {
            Some(i) => Self::from_components(self.components[..i].to_vec()),
            None => self.clone(),
        }
    }

    /// Extracts the target peer id as a canonical base58btc multihash
    /// string.
    ///
    /// Peer ids that belong to a relay hop (appearing before a
    /// `p2p-circuit` component) are discarded; of the remaining ids the
    /// last one wins. Returns `None` when no id is present or a value
    /// fails to decode.
    pub fn peer_id(&self) -> Option<String> {
        let mut candidates: Vec<&str> = Vec::new();

        for component in &self.components {
            if component.code() == CODE_P2P {
                candidates.push(component.value()?);
            }
            if component.code() == CODE_P2P_CIRCUIT {
                candidates.clear();
            }
        }

        canonical_peer_id(candidates.pop()?)
    }

    /// The value of the first component whose protocol is a path protocol,
    /// looked up in the given registry.
    pub fn path_with<'a>(&'a self, registry: &Registry) -> Option<&'a str> {
        self.components.iter().find_map(|component| {
            registry
                .get_protocol(component.code())
                .is_ok_and(|codec| codec.path)
                .then(|| component.value())
                .flatten()
        })
    }

    /// The value of the first path-protocol component, per the process-wide
    /// registry.
    pub fn path(&self) -> Option<&str> {
        self.path_with(&registry::read_default())
    }

    /// Derives `{family, host, transport, port}` from the components.
    ///
    /// DNS components imply TCP on port 443 until a later component
    /// overrides them; `ip6zone` components attach a `%zone` suffix to the
    /// following host. Fails with [`InvalidParametersError`] when any field
    /// is left undetermined.
    pub fn to_options(&self) -> Result<MultiaddrOptions> {
        let mut family = None;
        let mut transport = None;
        let mut host = None;
        let mut port = None;
        let mut zone = String::new();

        for component in &self.components {
            let code = component.code();
            let value = component.value().unwrap_or("");

            if code == CODE_IP6ZONE {
                zone = format!("%{value}");
            }

            if DNS_CODES.contains(&code) {
                transport = Some(Transport::Tcp);
                port = Some(443);
                host = Some(format!("{value}{zone}"));
                family = Some(if code == CODE_DNS6 {
                    IpFamily::V6
                } else {
                    IpFamily::V4
                });
            }

            if code == CODE_TCP || code == CODE_UDP {
                transport = Some(if code == CODE_TCP {
                    Transport::Tcp
                } else {
                    Transport::Udp
                });
                port = value.parse().ok();
            }

            if code == CODE_IP4 || code == CODE_IP6 {
                transport = Some(Transport::Tcp);
                host = Some(format!("{value}{zone}"));
                family = Some(if code == CODE_IP6 {
                    IpFamily::V6
                } else {
                    IpFamily::V4
                });
            }
        }

        match (family, host, transport, port) {
            (Some(family), Some(host), Some(transport), Some(port)) => Ok(MultiaddrOptions {
                family,
                host,
                transport,
                port,
            }),
            _ => Err(InvalidParametersError(
                "multiaddr must have a valid format: \
                 \"/{ip4, ip6, dns4, dns6, dnsaddr}/{address}/{tcp, udp}/{port}\""
                    .into(),
            )
            .into()),
        }
    }

    /// Derives the host / port pair for dialing. See [`Self::to_options`].
    pub fn node_address(&self) -> Result<NodeAddress> {
        let options = self.to_options()?;

        Ok(NodeAddress {
            family: options.family,
            address: options.host,
            port: options.port,
        })
    }

    /// Returns true iff the multiaddr is exactly an IP component followed
    /// by a TCP or UDP component.
    pub fn is_thin_waist_address(&self) -> bool {
        let [ip, transport] = self.components.as_slice() else {
            return false;
        };

        (ip.code() == CODE_IP4 || ip.code() == CODE_IP6)
            && (transport.code() == CODE_TCP || transport.code() == CODE_UDP)
    }
}

/// Re-encodes a peer id value as a canonical base58btc multihash string.
fn canonical_peer_id(value: &str) -> Option<String> {
    if value.starts_with('Q') || value.starts_with('1') {
        let multihash = Base::Base58Btc.decode(value).ok()?;
        return Some(Base::Base58Btc.encode(multihash));
    }

    let cid = Cid::try_from(value).ok()?;
    Some(Base::Base58Btc.encode(cid.hash().to_bytes()))
}

impl Display for Multiaddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }

        for component in &self.components {
            f.write_str(component.as_str())?;
        }

        Ok(())
    }
}

impl Debug for Multiaddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Multiaddr({})", self)
    }
}

impl PartialEq for Multiaddr {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Multiaddr {}

impl Hash for Multiaddr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl FromStr for Multiaddr {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        Self::parse(&registry::read_default(), input)
    }
}

impl TryFrom<&str> for Multiaddr {
    type Error = Error;

    fn try_from(input: &str) -> Result<Self> {
        input.parse()
    }
}

impl TryFrom<&[u8]> for Multiaddr {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes(&registry::read_default(), bytes)
    }
}

impl TryFrom<Bytes> for Multiaddr {
    type Error = Error;

    fn try_from(bytes: Bytes) -> Result<Self> {
        Self::from_bytes(&registry::read_default(), &bytes)
    }
}

impl From<Vec<Component>> for Multiaddr {
    fn from(components: Vec<Component>) -> Self {
        Self::from_components(components)
    }
}

impl<'a> IntoIterator for &'a Multiaddr {
    type Item = &'a Component;
    type IntoIter = std::slice::Iter<'a, Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.iter()
    }
}

impl Serialize for Multiaddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Multiaddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let input = String::deserialize(deserializer)?;

        input.parse().map_err(serde::de::Error::custom)
    }
}
