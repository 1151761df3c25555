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

//! Self-describing, composable network addresses.
//!
//! A multiaddr is an ordered sequence of typed components (an IPv4 address,
//! a TCP port, a peer identifier, ...) with two interchangeable
//! representations: a compact binary encoding and a human-readable
//! path-like string. Addresses can be concatenated, truncated, and
//! inspected without losing type information, which lets networking stacks
//! pass around transport-agnostic endpoint descriptions.
//!
//! This crate provides:
//!
//! - the [binary/string codec][codec] and its framing rules;
//! - the [protocol registry][registry] mapping numeric codes and names to
//!   per-protocol converters and validators, open to runtime registration
//!   of custom protocols;
//! - the immutable [`Multiaddr`] value type and its structural operations
//!   (encapsulate, decapsulate, peer-id and path extraction, endpoint
//!   projection);
//! - the [resolver boundary][resolvers] for addresses containing
//!   resolvable name protocols; and
//! - [CIDR containment][filter] over decoded IP components.
//!
//! This crate does not perform any I/O: all codec operations are
//! synchronous and side-effect-free, and the only asynchronous operation,
//! address resolution, delegates lookups to caller-supplied resolvers.
//!
//! # Examples
//!
//! ```
//! use multiaddr::Multiaddr;
//!
//! let addr: Multiaddr = "/ip4/8.8.8.8/tcp/1080".parse().unwrap();
//! let relay: Multiaddr = "/ip4/127.0.0.1/tcp/4001".parse().unwrap();
//!
//! let through_relay = addr.encapsulate(&relay);
//! assert_eq!(
//!     through_relay.to_string(),
//!     "/ip4/8.8.8.8/tcp/1080/ip4/127.0.0.1/tcp/4001",
//! );
//! assert_eq!(through_relay.decapsulate(&relay).unwrap(), addr);
//! ```
//!
//! Custom protocols are registered at runtime, either on the process-wide
//! [`default_registry`] or on an isolated [`Registry`]:
//!
//! ```
//! use multiaddr::{Multiaddr, ProtocolCodec, Registry, Size};
//!
//! let mut registry = Registry::with_default_protocols();
//! registry.add_protocol(ProtocolCodec::new(4242, "my-proto", Size::Variable));
//!
//! let addr = Multiaddr::parse(&registry, "/ip4/127.0.0.1/my-proto/hello").unwrap();
//! assert_eq!(addr.components()[1].value(), Some("hello"));
//! ```

pub mod codec;
pub mod component;
pub mod convert;
pub mod errors;
pub mod filter;
pub mod multiaddr;
pub mod registry;
pub mod resolvers;
pub mod validation;
pub mod varint;

pub use component::Component;
pub use errors::{
    Error, InvalidMultiaddrError, InvalidParametersError, UnknownProtocolError, ValidationError,
};
pub use filter::MultiaddrFilter;
pub use multiaddr::{IpFamily, Multiaddr, MultiaddrOptions, NodeAddress, Transport};
pub use registry::{default_registry, ProtocolCodec, ProtocolId, Registry, Size};
pub use resolvers::{
    DnsAddrResolver, ResolveError, ResolveOptions, Resolver, Resolvers, TxtLookup,
};
