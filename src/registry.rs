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

//! The protocol registry.
//!
//! A [`Registry`] maps numeric protocol codes and names to
//! [`ProtocolCodec`] descriptors. A process-wide instance seeded with the
//! default protocol table is available through [`default_registry`];
//! independent instances can be constructed for isolation.
//!
//! Registry values are not internally synchronized: mutation requires
//! `&mut`, and the process-wide instance is wrapped in an [`RwLock`] that
//! callers share. The intended usage is to register custom protocols once at
//! startup and treat the table as read-only afterwards.

use std::{
    collections::HashMap,
    sync::{LazyLock, PoisonError, RwLock, RwLockReadGuard},
};

use bytes::Bytes;

use crate::{
    convert,
    errors::{Error, UnknownProtocolError, ValidationError},
    validation,
};

pub const CODE_IP4: u64 = 4;
pub const CODE_TCP: u64 = 6;
pub const CODE_DCCP: u64 = 33;
pub const CODE_IP6: u64 = 41;
pub const CODE_IP6ZONE: u64 = 42;
pub const CODE_IPCIDR: u64 = 43;
pub const CODE_DNS: u64 = 53;
pub const CODE_DNS4: u64 = 54;
pub const CODE_DNS6: u64 = 55;
pub const CODE_DNSADDR: u64 = 56;
pub const CODE_SCTP: u64 = 132;
pub const CODE_UDP: u64 = 273;
pub const CODE_P2P_WEBRTC_STAR: u64 = 275;
pub const CODE_P2P_WEBRTC_DIRECT: u64 = 276;
pub const CODE_P2P_STARDUST: u64 = 277;
pub const CODE_WEBRTC_DIRECT: u64 = 280;
pub const CODE_WEBRTC: u64 = 281;
pub const CODE_P2P_CIRCUIT: u64 = 290;
pub const CODE_UDT: u64 = 301;
pub const CODE_UTP: u64 = 302;
pub const CODE_UNIX: u64 = 400;
pub const CODE_P2P: u64 = 421;
pub const CODE_HTTPS: u64 = 443;
pub const CODE_ONION: u64 = 444;
pub const CODE_ONION3: u64 = 445;
pub const CODE_GARLIC64: u64 = 446;
pub const CODE_GARLIC32: u64 = 447;
pub const CODE_TLS: u64 = 448;
pub const CODE_SNI: u64 = 449;
pub const CODE_NOISE: u64 = 454;
pub const CODE_QUIC: u64 = 460;
pub const CODE_QUIC_V1: u64 = 461;
pub const CODE_WEBTRANSPORT: u64 = 465;
pub const CODE_CERTHASH: u64 = 466;
pub const CODE_WS: u64 = 477;
pub const CODE_WSS: u64 = 478;
pub const CODE_P2P_WEBSOCKET_STAR: u64 = 479;
pub const CODE_HTTP: u64 = 480;
pub const CODE_HTTP_PATH: u64 = 481;
pub const CODE_MEMORY: u64 = 777;

/// The size class of a protocol's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Size {
    /// A fixed-size value of the given number of bits; `Fixed(0)` means the
    /// protocol carries no value.
    Fixed(u32),
    /// A varint-length-prefixed value.
    Variable,
}

impl Size {
    /// The number of value bytes of a fixed-size protocol, or `None` for
    /// variable-size protocols.
    pub const fn data_bytes(&self) -> Option<usize> {
        match self {
            Size::Fixed(bits) => Some(*bits as usize / 8),
            Size::Variable => None,
        }
    }

    /// Returns true if the value is varint-length-prefixed.
    pub const fn is_variable(&self) -> bool {
        matches!(self, Size::Variable)
    }

    /// Returns true if the protocol carries a value at all.
    pub const fn has_value(&self) -> bool {
        !matches!(self, Size::Fixed(0))
    }
}

impl Default for Size {
    fn default() -> Self {
        Size::Fixed(0)
    }
}

/// Decodes a string token into the protocol's value form.
pub type StringToValueFn = fn(&str) -> Result<String, Error>;
/// Escapes a value for the string representation.
pub type ValueToStringFn = fn(&str) -> String;
/// Encodes a value into its canonical value byte string.
pub type ValueToBytesFn = fn(&str) -> Result<Bytes, Error>;
/// Decodes a canonical value byte string into the value form.
pub type BytesToValueFn = fn(&[u8]) -> Result<String, Error>;
/// Rejects malformed values after string-to-value conversion.
pub type ValidateFn = fn(&str) -> Result<(), ValidationError>;

/// A registered protocol: its numeric code, names, value size class, flags,
/// and optional converter hooks.
///
/// Hooks that are absent fall back to defaults applied by the component
/// codec: variable-size values round-trip as length-prefixed UTF-8 text and
/// fixed-size values as base16 text.
#[derive(Debug, Clone, Default)]
pub struct ProtocolCodec {
    /// Numeric code used in the binary representation.
    pub code: u64,
    /// Primary name used in the string representation.
    pub name: String,
    /// Size class of the value.
    pub size: Size,
    /// The value is a path consuming the remainder of the string form.
    pub path: bool,
    /// The protocol name can be resolved with a configured resolver.
    pub resolvable: bool,
    /// Additional names this protocol can be parsed from.
    pub aliases: Vec<String>,
    /// Decodes a string token into the value form.
    pub string_to_value: Option<StringToValueFn>,
    /// Escapes a value for the string representation.
    pub value_to_string: Option<ValueToStringFn>,
    /// Encodes a value into its canonical value byte string.
    pub value_to_bytes: Option<ValueToBytesFn>,
    /// Decodes a canonical value byte string into the value form.
    pub bytes_to_value: Option<BytesToValueFn>,
    /// Rejects malformed values.
    pub validate: Option<ValidateFn>,
}

impl ProtocolCodec {
    /// Creates a descriptor with the given identity and no hooks.
    pub fn new(code: u64, name: impl Into<String>, size: Size) -> Self {
        Self {
            code,
            name: name.into(),
            size,
            ..Self::default()
        }
    }
}

/// A protocol lookup key: either the numeric code or a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolId<'a> {
    /// Lookup by numeric code.
    Code(u64),
    /// Lookup by name or alias.
    Name(&'a str),
}

impl From<u64> for ProtocolId<'static> {
    fn from(code: u64) -> Self {
        ProtocolId::Code(code)
    }
}

impl<'a> From<&'a str> for ProtocolId<'a> {
    fn from(name: &'a str) -> Self {
        ProtocolId::Name(name)
    }
}

/// A mutable mapping from protocol codes and names to descriptors.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    by_code: HashMap<u64, ProtocolCodec>,
    by_name: HashMap<String, ProtocolCodec>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry seeded with the default protocol table.
    pub fn with_default_protocols() -> Self {
        let mut registry = Self::new();
        for codec in default_codecs() {
            registry.add_protocol(codec);
        }

        registry
    }

    /// Looks up a protocol by code or name.
    pub fn get_protocol<'a, I: Into<ProtocolId<'a>>>(
        &self,
        id: I,
    ) -> Result<&ProtocolCodec, UnknownProtocolError> {
        match id.into() {
            ProtocolId::Code(code) => self
                .by_code
                .get(&code)
                .ok_or(UnknownProtocolError::Code(code)),
            ProtocolId::Name(name) => self
                .by_name
                .get(name)
                .ok_or_else(|| UnknownProtocolError::Name(name.to_string())),
        }
    }

    /// Registers a protocol, overwriting any existing entry with the same
    /// code or name and registering all declared aliases.
    pub fn add_protocol(&mut self, codec: ProtocolCodec) {
        self.by_code.insert(codec.code, codec.clone());
        for alias in &codec.aliases {
            self.by_name.insert(alias.clone(), codec.clone());
        }
        self.by_name.insert(codec.name.clone(), codec);
    }

    /// Removes a protocol along with its primary name and all aliases.
    /// A no-op when the code is not registered.
    pub fn remove_protocol(&mut self, code: u64) {
        let Some(codec) = self.by_code.remove(&code) else {
            return;
        };

        self.by_name.remove(&codec.name);
        for alias in &codec.aliases {
            self.by_name.remove(alias);
        }
    }
}

static DEFAULT_REGISTRY: LazyLock<RwLock<Registry>> =
    LazyLock::new(|| RwLock::new(Registry::with_default_protocols()));

/// Returns the process-wide registry, seeded with the default protocol
/// table. Register custom protocols here before sharing addresses across
/// concurrent contexts.
pub fn default_registry() -> &'static RwLock<Registry> {
    &DEFAULT_REGISTRY
}

/// Read access to the process-wide registry, disregarding lock poisoning
/// since the registry is only read behind this interface.
pub(crate) fn read_default() -> RwLockReadGuard<'static, Registry> {
    DEFAULT_REGISTRY.read().unwrap_or_else(PoisonError::into_inner)
}

fn default_codecs() -> Vec<ProtocolCodec> {
    vec![
        ProtocolCodec {
            value_to_bytes: Some(convert::ip4_to_bytes),
            bytes_to_value: Some(convert::ip4_to_string),
            validate: Some(validation::validate_ip4),
            ..ProtocolCodec::new(CODE_IP4, "ip4", Size::Fixed(32))
        },
        ProtocolCodec {
            value_to_bytes: Some(convert::port_to_bytes),
            bytes_to_value: Some(convert::port_to_string),
            validate: Some(validation::validate_port),
            ..ProtocolCodec::new(CODE_TCP, "tcp", Size::Fixed(16))
        },
        ProtocolCodec {
            value_to_bytes: Some(convert::port_to_bytes),
            bytes_to_value: Some(convert::port_to_string),
            validate: Some(validation::validate_port),
            ..ProtocolCodec::new(CODE_DCCP, "dccp", Size::Fixed(16))
        },
        ProtocolCodec {
            string_to_value: Some(convert::ip6_string_to_value),
            value_to_bytes: Some(convert::ip6_to_bytes),
            bytes_to_value: Some(convert::ip6_to_string),
            validate: Some(validation::validate_ip6),
            ..ProtocolCodec::new(CODE_IP6, "ip6", Size::Fixed(128))
        },
        ProtocolCodec::new(CODE_IP6ZONE, "ip6zone", Size::Variable),
        ProtocolCodec {
            value_to_bytes: Some(convert::cidr_to_bytes),
            bytes_to_value: Some(convert::cidr_to_string),
            ..ProtocolCodec::new(CODE_IPCIDR, "ipcidr", Size::Fixed(8))
        },
        ProtocolCodec {
            resolvable: true,
            ..ProtocolCodec::new(CODE_DNS, "dns", Size::Variable)
        },
        ProtocolCodec {
            resolvable: true,
            ..ProtocolCodec::new(CODE_DNS4, "dns4", Size::Variable)
        },
        ProtocolCodec {
            resolvable: true,
            ..ProtocolCodec::new(CODE_DNS6, "dns6", Size::Variable)
        },
        ProtocolCodec {
            resolvable: true,
            ..ProtocolCodec::new(CODE_DNSADDR, "dnsaddr", Size::Variable)
        },
        ProtocolCodec {
            value_to_bytes: Some(convert::port_to_bytes),
            bytes_to_value: Some(convert::port_to_string),
            validate: Some(validation::validate_port),
            ..ProtocolCodec::new(CODE_SCTP, "sctp", Size::Fixed(16))
        },
        ProtocolCodec {
            value_to_bytes: Some(convert::port_to_bytes),
            bytes_to_value: Some(convert::port_to_string),
            validate: Some(validation::validate_port),
            ..ProtocolCodec::new(CODE_UDP, "udp", Size::Fixed(16))
        },
        ProtocolCodec::new(CODE_P2P_WEBRTC_STAR, "p2p-webrtc-star", Size::Fixed(0)),
        ProtocolCodec::new(CODE_P2P_WEBRTC_DIRECT, "p2p-webrtc-direct", Size::Fixed(0)),
        ProtocolCodec::new(CODE_P2P_STARDUST, "p2p-stardust", Size::Fixed(0)),
        ProtocolCodec::new(CODE_WEBRTC_DIRECT, "webrtc-direct", Size::Fixed(0)),
        ProtocolCodec::new(CODE_WEBRTC, "webrtc", Size::Fixed(0)),
        ProtocolCodec::new(CODE_P2P_CIRCUIT, "p2p-circuit", Size::Fixed(0)),
        ProtocolCodec::new(CODE_UDT, "udt", Size::Fixed(0)),
        ProtocolCodec::new(CODE_UTP, "utp", Size::Fixed(0)),
        ProtocolCodec {
            path: true,
            string_to_value: Some(convert::path_to_value),
            value_to_string: Some(convert::value_to_path),
            value_to_bytes: Some(convert::text_to_bytes),
            bytes_to_value: Some(convert::text_to_string),
            ..ProtocolCodec::new(CODE_UNIX, "unix", Size::Variable)
        },
        ProtocolCodec {
            aliases: vec!["ipfs".to_string()],
            string_to_value: Some(convert::peer_id_to_value),
            value_to_bytes: Some(convert::peer_id_to_bytes),
            bytes_to_value: Some(convert::bytes_to_peer_id),
            ..ProtocolCodec::new(CODE_P2P, "p2p", Size::Variable)
        },
        ProtocolCodec::new(CODE_HTTPS, "https", Size::Fixed(0)),
        ProtocolCodec {
            value_to_bytes: Some(convert::onion_to_bytes),
            bytes_to_value: Some(convert::onion_to_string),
            ..ProtocolCodec::new(CODE_ONION, "onion", Size::Fixed(96))
        },
        ProtocolCodec {
            value_to_bytes: Some(convert::onion3_to_bytes),
            bytes_to_value: Some(convert::onion_to_string),
            ..ProtocolCodec::new(CODE_ONION3, "onion3", Size::Fixed(296))
        },
        ProtocolCodec::new(CODE_GARLIC64, "garlic64", Size::Variable),
        ProtocolCodec::new(CODE_GARLIC32, "garlic32", Size::Variable),
        ProtocolCodec::new(CODE_TLS, "tls", Size::Fixed(0)),
        ProtocolCodec::new(CODE_SNI, "sni", Size::Variable),
        ProtocolCodec::new(CODE_NOISE, "noise", Size::Fixed(0)),
        ProtocolCodec::new(CODE_QUIC, "quic", Size::Fixed(0)),
        ProtocolCodec::new(CODE_QUIC_V1, "quic-v1", Size::Fixed(0)),
        ProtocolCodec::new(CODE_WEBTRANSPORT, "webtransport", Size::Fixed(0)),
        ProtocolCodec {
            value_to_bytes: Some(convert::multibase_to_bytes),
            bytes_to_value: Some(convert::bytes_to_multibase),
            ..ProtocolCodec::new(CODE_CERTHASH, "certhash", Size::Variable)
        },
        ProtocolCodec::new(CODE_WS, "ws", Size::Fixed(0)),
        ProtocolCodec::new(CODE_WSS, "wss", Size::Fixed(0)),
        ProtocolCodec::new(CODE_P2P_WEBSOCKET_STAR, "p2p-websocket-star", Size::Fixed(0)),
        ProtocolCodec::new(CODE_HTTP, "http", Size::Fixed(0)),
        ProtocolCodec {
            path: true,
            string_to_value: Some(convert::http_path_to_value),
            value_to_string: Some(convert::value_to_http_path),
            value_to_bytes: Some(convert::text_to_bytes),
            bytes_to_value: Some(convert::text_to_string),
            ..ProtocolCodec::new(CODE_HTTP_PATH, "http-path", Size::Variable)
        },
        ProtocolCodec::new(CODE_MEMORY, "memory", Size::Variable),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_consistent() {
        let registry = Registry::with_default_protocols();

        for codec in default_codecs() {
            let by_code = registry.get_protocol(codec.code).unwrap();
            let by_name = registry.get_protocol(codec.name.as_str()).unwrap();

            assert_eq!(by_code.code, codec.code);
            assert_eq!(by_name.name, codec.name);
            assert_eq!(by_code.name, by_name.name);
        }
    }

    #[test]
    fn lookup_by_code_and_name_agree() {
        let registry = Registry::with_default_protocols();

        let by_code = registry.get_protocol(CODE_TCP).unwrap();
        let by_name = registry.get_protocol("tcp").unwrap();
        assert_eq!(by_code.code, by_name.code);
        assert_eq!(by_code.size, Size::Fixed(16));
    }

    #[test]
    fn legacy_alias_resolves_to_canonical_descriptor() {
        let registry = Registry::with_default_protocols();

        let ipfs = registry.get_protocol("ipfs").unwrap();
        assert_eq!(ipfs.code, CODE_P2P);
        assert_eq!(ipfs.name, "p2p");
    }

    #[test]
    fn unknown_lookups_fail() {
        let registry = Registry::with_default_protocols();

        assert_eq!(
            registry.get_protocol(12345).unwrap_err(),
            UnknownProtocolError::Code(12345)
        );
        assert_eq!(
            registry.get_protocol("nope").unwrap_err(),
            UnknownProtocolError::Name("nope".to_string())
        );
    }

    #[test]
    fn add_and_remove_custom_protocol() {
        let mut registry = Registry::with_default_protocols();

        registry.add_protocol(ProtocolCodec {
            aliases: vec!["also-custom".to_string()],
            ..ProtocolCodec::new(9999, "custom", Size::Variable)
        });

        assert_eq!(registry.get_protocol(9999).unwrap().name, "custom");
        assert_eq!(registry.get_protocol("custom").unwrap().code, 9999);
        assert_eq!(registry.get_protocol("also-custom").unwrap().code, 9999);

        registry.remove_protocol(9999);
        assert!(registry.get_protocol(9999).is_err());
        assert!(registry.get_protocol("custom").is_err());
        assert!(registry.get_protocol("also-custom").is_err());
    }

    #[test]
    fn removing_p2p_removes_its_alias() {
        let mut registry = Registry::with_default_protocols();

        registry.remove_protocol(CODE_P2P);
        assert!(registry.get_protocol("p2p").is_err());
        assert!(registry.get_protocol("ipfs").is_err());
    }

    #[test]
    fn remove_unknown_code_is_a_no_op() {
        let mut registry = Registry::with_default_protocols();
        registry.remove_protocol(123456);
        assert!(registry.get_protocol("tcp").is_ok());
    }

    #[test]
    fn default_registry_is_seeded() {
        let registry = default_registry().read().unwrap();
        assert!(registry.get_protocol("ip4").is_ok());
    }
}
