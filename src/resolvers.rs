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

//! The resolver plug-in boundary.
//!
//! Resolvers turn addresses containing resolvable protocols (`dns`,
//! `dnsaddr`, ...) into lists of candidate addresses. The core does not
//! perform any I/O itself: resolvers are registered per protocol name in a
//! [`Resolvers`] table, and the recursive `dnsaddr` resolver is generic
//! over a caller-supplied TXT lookup.
//!
//! Resolution is the only asynchronous, cancellable operation in the crate.
//! Callers signal cancellation through the
//! [`CancellationToken`] in [`ResolveOptions`] and bound recursive
//! resolution with `max_recursive_depth`.

use std::{collections::HashMap, future::Future, pin::Pin};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::{
    errors::Error,
    multiaddr::Multiaddr,
    registry::{self, CODE_DNSADDR},
};

/// The default bound on recursive resolution.
pub const MAX_RECURSIVE_DEPTH: usize = 32;

/// Errors raised while resolving a multiaddr.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The address contains a resolvable protocol with no registered
    /// resolver.
    #[error("no available resolver for {0}")]
    NoAvailableResolver(String),
    /// Recursive resolution exceeded the configured depth.
    #[error("max recursive depth reached")]
    RecursionLimit,
    /// The cancellation signal fired.
    #[error("resolution was aborted")]
    Aborted,
    /// The underlying lookup failed.
    #[error("lookup failed: {0}")]
    Lookup(String),
    /// A resolved candidate was not a valid multiaddr.
    #[error(transparent)]
    Multiaddr(#[from] Error),
}

/// Options supplied to a resolution.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Cancellation signal; outstanding lookups abort promptly once it
    /// fires.
    pub cancel: CancellationToken,
    /// Bound on recursive resolution when a resolved value is itself
    /// resolvable.
    pub max_recursive_depth: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            cancel: CancellationToken::new(),
            max_recursive_depth: MAX_RECURSIVE_DEPTH,
        }
    }
}

/// Resolves an address into candidate string-form addresses.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Returns the candidate addresses the given address resolves to.
    async fn resolve(
        &self,
        addr: &Multiaddr,
        options: &ResolveOptions,
    ) -> Result<Vec<String>, ResolveError>;
}

/// A table of resolvers keyed by protocol name.
#[derive(Default)]
pub struct Resolvers {
    resolvers: HashMap<String, Box<dyn Resolver>>,
}

impl Resolvers {
    /// Creates an empty resolver table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resolver for the given protocol name.
    pub fn add(&mut self, name: impl Into<String>, resolver: impl Resolver + 'static) {
        self.resolvers.insert(name.into(), Box::new(resolver));
    }

    /// Removes the resolver for the given protocol name.
    pub fn remove(&mut self, name: &str) {
        self.resolvers.remove(name);
    }

    /// Looks up the resolver for the given protocol name.
    pub fn get(&self, name: &str) -> Option<&dyn Resolver> {
        self.resolvers.get(name).map(Box::as_ref)
    }
}

impl Multiaddr {
    /// Resolves this address with the first applicable resolver.
    ///
    /// The first component whose protocol is resolvable selects the
    /// resolver by name; addresses without resolvable components resolve
    /// to themselves. Candidates returned by the resolver are parsed
    /// against the process-wide registry.
    pub async fn resolve(
        &self,
        resolvers: &Resolvers,
        options: &ResolveOptions,
    ) -> Result<Vec<Multiaddr>, ResolveError> {
        let resolvable = {
            let registry = registry::read_default();
            self.iter().find_map(|component| {
                registry
                    .get_protocol(component.code())
                    .ok()
                    .filter(|codec| codec.resolvable)
                    .map(|codec| codec.name.clone())
            })
        };

        let Some(name) = resolvable else {
            return Ok(vec![self.clone()]);
        };

        if options.cancel.is_cancelled() {
            return Err(ResolveError::Aborted);
        }

        let resolver = resolvers
            .get(&name)
            .ok_or_else(|| ResolveError::NoAvailableResolver(name.clone()))?;

        trace!(protocol = %name, addr = %self, "resolving multiaddr");
        let candidates = resolver.resolve(self, options).await?;

        candidates
            .iter()
            .map(|candidate| candidate.parse().map_err(ResolveError::Multiaddr))
            .collect()
    }
}

/// Performs TXT record lookups on behalf of [`DnsAddrResolver`].
///
/// Implementations own the actual DNS transport and should abort promptly
/// when the cancellation token fires.
#[async_trait]
pub trait TxtLookup: Send + Sync {
    /// Returns the TXT records of `hostname`.
    async fn lookup_txt(
        &self,
        hostname: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ResolveError>;
}

/// Resolves `dnsaddr` addresses by querying `_dnsaddr.<host>` TXT records
/// and recursing into nested `dnsaddr` results up to the configured depth.
pub struct DnsAddrResolver<L> {
    lookup: L,
}

impl<L: TxtLookup> DnsAddrResolver<L> {
    /// Creates a resolver over the given TXT lookup.
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }

    fn resolve_at_depth<'a>(
        &'a self,
        addr: &'a Multiaddr,
        options: &'a ResolveOptions,
        depth: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, ResolveError>> + Send + 'a>> {
        Box::pin(async move {
            if depth == 0 {
                return Err(ResolveError::RecursionLimit);
            }
            if options.cancel.is_cancelled() {
                return Err(ResolveError::Aborted);
            }

            let hostname = addr
                .iter()
                .find(|component| component.code() == CODE_DNSADDR)
                .and_then(|component| component.value())
                .ok_or_else(|| {
                    ResolveError::Lookup("address has no dnsaddr component".to_string())
                })?;

            let answers = self
                .lookup
                .lookup_txt(&format!("_dnsaddr.{hostname}"), &options.cancel)
                .await?;
            trace!(%hostname, answers = answers.len(), "dnsaddr TXT lookup");

            let peer_id = addr.peer_id();
            let mut output = Vec::new();

            for answer in answers {
                // TXT answers look like `dnsaddr=/dns4/host/tcp/443/...`,
                // possibly quoted.
                let cleaned: String = answer
                    .chars()
                    .filter(|ch| *ch != '"' && *ch != '\'')
                    .collect();
                let Some((_, candidate)) = cleaned.trim().split_once('=') else {
                    continue;
                };

                // A peer id in the query constrains the results.
                if let Some(peer_id) = &peer_id {
                    if !candidate.contains(peer_id.as_str()) {
                        continue;
                    }
                }

                let resolved: Multiaddr = candidate.parse()?;

                if candidate.starts_with("/dnsaddr") {
                    let nested = self.resolve_at_depth(&resolved, options, depth - 1).await?;
                    output.extend(nested);
                } else {
                    output.push(resolved.to_string());
                }
            }

            Ok(output)
        })
    }
}

#[async_trait]
impl<L: TxtLookup> Resolver for DnsAddrResolver<L> {
    async fn resolve(
        &self,
        addr: &Multiaddr,
        options: &ResolveOptions,
    ) -> Result<Vec<String>, ResolveError> {
        self.resolve_at_depth(addr, options, options.max_recursive_depth)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticResolver(Vec<String>);

    #[async_trait]
    impl Resolver for StaticResolver {
        async fn resolve(
            &self,
            _addr: &Multiaddr,
            _options: &ResolveOptions,
        ) -> Result<Vec<String>, ResolveError> {
            Ok(self.0.clone())
        }
    }

    /// Maps `_dnsaddr.` hostnames to TXT answers.
    struct StaticTxt(HashMap<String, Vec<String>>);

    #[async_trait]
    impl TxtLookup for StaticTxt {
        async fn lookup_txt(
            &self,
            hostname: &str,
            cancel: &CancellationToken,
        ) -> Result<Vec<String>, ResolveError> {
            if cancel.is_cancelled() {
                return Err(ResolveError::Aborted);
            }

            self.0
                .get(hostname)
                .cloned()
                .ok_or_else(|| ResolveError::Lookup(format!("no records for {hostname}")))
        }
    }

    fn addr(input: &str) -> Multiaddr {
        input.parse().unwrap()
    }

    #[tokio::test]
    async fn address_without_resolvable_components_resolves_to_itself() {
        let addr = addr("/ip4/127.0.0.1/tcp/4001");
        let resolved = addr.resolve(&Resolvers::new(), &ResolveOptions::default()).await.unwrap();

        assert_eq!(resolved, vec![addr]);
    }

    #[tokio::test]
    async fn missing_resolver_is_an_error() {
        let addr = addr("/dnsaddr/example.com");
        let err = addr
            .resolve(&Resolvers::new(), &ResolveOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::NoAvailableResolver(name) if name == "dnsaddr"));
    }

    #[tokio::test]
    async fn candidates_are_parsed() {
        let mut resolvers = Resolvers::new();
        resolvers.add(
            "dnsaddr",
            StaticResolver(vec!["/ip4/10.0.0.1/tcp/4001".to_string()]),
        );

        let resolved = addr("/dnsaddr/example.com")
            .resolve(&resolvers, &ResolveOptions::default())
            .await
            .unwrap();

        assert_eq!(resolved, vec![addr("/ip4/10.0.0.1/tcp/4001")]);
    }

    #[tokio::test]
    async fn cancellation_aborts_before_dispatch() {
        let mut resolvers = Resolvers::new();
        resolvers.add("dnsaddr", StaticResolver(vec![]));

        let options = ResolveOptions::default();
        options.cancel.cancel();

        let err = addr("/dnsaddr/example.com")
            .resolve(&resolvers, &options)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Aborted));
    }

    #[tokio::test]
    async fn dnsaddr_resolves_txt_answers() {
        let txt = StaticTxt(HashMap::from([(
            "_dnsaddr.bootstrap.example.com".to_string(),
            vec![
                "dnsaddr=/ip4/10.0.0.1/tcp/4001".to_string(),
                "unrelated record".to_string(),
            ],
        )]));

        let resolved = DnsAddrResolver::new(txt)
            .resolve(&addr("/dnsaddr/bootstrap.example.com"), &ResolveOptions::default())
            .await
            .unwrap();

        assert_eq!(resolved, vec!["/ip4/10.0.0.1/tcp/4001".to_string()]);
    }

    #[tokio::test]
    async fn dnsaddr_recurses_into_nested_records() {
        let txt = StaticTxt(HashMap::from([
            (
                "_dnsaddr.example.com".to_string(),
                vec!["dnsaddr=/dnsaddr/inner.example.com".to_string()],
            ),
            (
                "_dnsaddr.inner.example.com".to_string(),
                vec!["dnsaddr=/ip4/10.0.0.2/tcp/4001".to_string()],
            ),
        ]));

        let resolved = DnsAddrResolver::new(txt)
            .resolve(&addr("/dnsaddr/example.com"), &ResolveOptions::default())
            .await
            .unwrap();

        assert_eq!(resolved, vec!["/ip4/10.0.0.2/tcp/4001".to_string()]);
    }

    #[tokio::test]
    async fn recursion_depth_is_bounded() {
        // A record that resolves to itself, forever.
        let txt = StaticTxt(HashMap::from([(
            "_dnsaddr.example.com".to_string(),
            vec!["dnsaddr=/dnsaddr/example.com".to_string()],
        )]));

        let err = DnsAddrResolver::new(txt)
            .resolve(
                &addr("/dnsaddr/example.com"),
                &ResolveOptions {
                    max_recursive_depth: 4,
                    ..ResolveOptions::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::RecursionLimit));
    }

    #[tokio::test]
    async fn depth_zero_fails_immediately() {
        let txt = StaticTxt(HashMap::new());

        let err = DnsAddrResolver::new(txt)
            .resolve(
                &addr("/dnsaddr/example.com"),
                &ResolveOptions {
                    max_recursive_depth: 0,
                    ..ResolveOptions::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::RecursionLimit));
    }

    #[tokio::test]
    async fn peer_id_filters_candidates() {
        let id_a = {
            let mut mh = vec![0x12, 0x20];
            mh.extend_from_slice(&[0xaa; 32]);
            multibase::Base::Base58Btc.encode(&mh)
        };
        let id_b = {
            let mut mh = vec![0x12, 0x20];
            mh.extend_from_slice(&[0xbb; 32]);
            multibase::Base::Base58Btc.encode(&mh)
        };

        let txt = StaticTxt(HashMap::from([(
            "_dnsaddr.example.com".to_string(),
            vec![
                format!("dnsaddr=/ip4/10.0.0.1/tcp/4001/p2p/{id_a}"),
                format!("dnsaddr=/ip4/10.0.0.2/tcp/4001/p2p/{id_b}"),
            ],
        )]));

        let resolved = DnsAddrResolver::new(txt)
            .resolve(
                &addr(&format!("/dnsaddr/example.com/p2p/{id_a}")),
                &ResolveOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(resolved, vec![format!("/ip4/10.0.0.1/tcp/4001/p2p/{id_a}")]);
    }
}
