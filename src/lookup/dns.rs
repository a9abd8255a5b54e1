use super::{DnsLookup, Lookup};
use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::TokioAsyncResolver;
use std::time::Duration;

/// DNS lookups through hickory-resolver
///
/// Uses the system resolver configuration when it can be read, otherwise
/// the library's default upstreams.
#[derive(Clone)]
pub struct HickoryDns {
    resolver: TokioAsyncResolver,
}

impl HickoryDns {
    pub fn new() -> Self {
        match TokioAsyncResolver::tokio_from_system_conf() {
            Ok(resolver) => Self { resolver },
            Err(e) => {
                tracing::debug!("System resolver config unavailable ({}), using defaults", e);
                let mut opts = ResolverOpts::default();
                opts.timeout = Duration::from_secs(5);
                opts.attempts = 2;
                Self {
                    resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), opts),
                }
            }
        }
    }
}

impl Default for HickoryDns {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HickoryDns {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HickoryDns").finish_non_exhaustive()
    }
}

/// A definitive negative answer, as opposed to a failed query
fn is_no_records(err: &ResolveError) -> bool {
    matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

#[async_trait]
impl DnsLookup for HickoryDns {
    async fn resolves(&self, domain: &str) -> Lookup<bool> {
        match self.resolver.lookup_ip(domain).await {
            Ok(ips) => Lookup::Found(ips.iter().next().is_some()),
            Err(e) if is_no_records(&e) => {
                tracing::debug!("{} does not resolve: {}", domain, e);
                Lookup::Found(false)
            }
            Err(e) => Lookup::Unavailable(e.to_string()),
        }
    }

    async fn has_mail_exchange(&self, domain: &str) -> Lookup<bool> {
        match self.resolver.mx_lookup(domain).await {
            Ok(mx) => Lookup::Found(mx.iter().next().is_some()),
            Err(e) if is_no_records(&e) => Lookup::Found(false),
            Err(e) => Lookup::Unavailable(e.to_string()),
        }
    }
}
