// Forward -> reverse -> forward discovery over a shared provenance graph

use crate::candidates::Candidate;
use crate::error::{DiscoveryError, Result};
use crate::graph::{DiscoveryGraph, Recorded};
use chrono::{DateTime, Utc};
use dnspivot_resolver::{LookupError, Resolver, normalize_hostname};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore, watch};
use tracing::{debug, info, warn};

pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_MAX_DEPTH: usize = 8;
pub const DEFAULT_MAX_TRANSPORT_FAILURES: usize = 10;

/// Something the engine did, reported as it happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    Resolved {
        hostname: String,
        addresses: BTreeSet<IpAddr>,
        parent: Option<String>,
    },
    Merged {
        hostname: String,
        fresh: BTreeSet<IpAddr>,
    },
    Abandoned {
        hostname: String,
        error: LookupError,
    },
    Pivot {
        address: IpAddr,
        hostname: String,
    },
    NoPtr {
        address: IpAddr,
        error: LookupError,
    },
}

pub type EventCallback = Arc<dyn Fn(&DiscoveryEvent) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root candidates expanded at once, and the cap on in-flight queries.
    pub workers: usize,
    /// Reverse-lookup hops allowed away from a root candidate.
    pub max_depth: usize,
    /// Consecutive transport failures that mark the resolver unreachable.
    pub max_transport_failures: usize,
    /// Overall run deadline.
    pub deadline: Option<Duration>,
}

impl EngineConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_transport_failures(mut self, failures: usize) -> Self {
        self.max_transport_failures = failures.max(1);
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            max_depth: DEFAULT_MAX_DEPTH,
            max_transport_failures: DEFAULT_MAX_TRANSPORT_FAILURES,
            deadline: None,
        }
    }
}

/// Cloneable stop flag shared between the engine and whoever drives it.
#[derive(Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryStats {
    pub root_candidates: usize,
    pub forward_queries: usize,
    pub reverse_queries: usize,
    pub abandoned: usize,
    pub pivots: usize,
}

#[derive(Default)]
struct Counters {
    root_candidates: AtomicUsize,
    forward_queries: AtomicUsize,
    reverse_queries: AtomicUsize,
    abandoned: AtomicUsize,
    pivots: AtomicUsize,
}

impl Counters {
    fn snapshot(&self) -> DiscoveryStats {
        DiscoveryStats {
            root_candidates: self.root_candidates.load(Ordering::Relaxed),
            forward_queries: self.forward_queries.load(Ordering::Relaxed),
            reverse_queries: self.reverse_queries.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            pivots: self.pivots.load(Ordering::Relaxed),
        }
    }
}

/// Tracks consecutive transport failures across all workers.
///
/// Any answer from the nameserver, including NXDOMAIN, resets the streak.
struct TransportHealth {
    limit: usize,
    streak: AtomicUsize,
    tripped: AtomicBool,
    fatal: StdMutex<Option<(usize, LookupError)>>,
}

impl TransportHealth {
    fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            streak: AtomicUsize::new(0),
            tripped: AtomicBool::new(false),
            fatal: StdMutex::new(None),
        }
    }

    fn answered(&self) {
        self.streak.store(0, Ordering::Relaxed);
    }

    /// Returns true the first time the streak reaches the limit.
    fn failed(&self, error: &LookupError) -> bool {
        let streak = self.streak.fetch_add(1, Ordering::Relaxed) + 1;
        if streak < self.limit || self.tripped.swap(true, Ordering::SeqCst) {
            return false;
        }
        if let Ok(mut fatal) = self.fatal.lock() {
            *fatal = Some((streak, error.clone()));
        }
        true
    }

    fn fatal(&self) -> Option<(usize, LookupError)> {
        self.fatal.lock().ok().and_then(|fatal| fatal.clone())
    }
}

/// Result of a run: the graph as it stood when the run ended.
#[derive(Debug, Clone, Serialize)]
pub struct Discovery {
    pub graph: DiscoveryGraph,
    pub stats: DiscoveryStats,
    /// True when the deadline or a cancel signal cut the run short.
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct DiscoveryEngine {
    resolver: Arc<dyn Resolver>,
    config: EngineConfig,
    graph: Mutex<DiscoveryGraph>,
    // (hostname, address) -> shallowest hop count it was handled at
    expanded: StdMutex<HashMap<(String, IpAddr), usize>>,
    permits: Semaphore,
    counters: Counters,
    transport: TransportHealth,
    cancel: CancelSignal,
    on_event: Option<EventCallback>,
}

impl DiscoveryEngine {
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self::with_config(resolver, EngineConfig::default())
    }

    pub fn with_config(resolver: Arc<dyn Resolver>, config: EngineConfig) -> Self {
        Self {
            resolver,
            permits: Semaphore::new(config.workers.max(1)),
            transport: TransportHealth::new(config.max_transport_failures),
            config,
            graph: Mutex::new(DiscoveryGraph::new()),
            expanded: StdMutex::new(HashMap::new()),
            counters: Counters::default(),
            cancel: CancelSignal::new(),
            on_event: None,
        }
    }

    pub fn with_cancel_signal(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }

    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Copy of the graph as it currently stands.
    pub async fn snapshot(&self) -> DiscoveryGraph {
        self.graph.lock().await.clone()
    }

    pub fn stats(&self) -> DiscoveryStats {
        self.counters.snapshot()
    }

    /// Expand every root candidate and return the finished (or partial) graph.
    ///
    /// Per-candidate lookup failures only prune their branch. The run fails
    /// only when the resolver looks unreachable.
    pub async fn run<I>(&self, candidates: I) -> Result<Discovery>
    where
        I: IntoIterator<Item = Candidate>,
    {
        let started_at = Utc::now();
        let workers = self.config.workers.max(1);
        info!(workers, max_depth = self.config.max_depth, "Starting discovery");

        let work = stream::iter(candidates)
            .take_while(|_| futures::future::ready(!self.cancel.is_cancelled()))
            .for_each_concurrent(workers, |candidate| async move {
                self.counters.root_candidates.fetch_add(1, Ordering::Relaxed);
                self.discover(candidate).await;
            });

        tokio::select! {
            _ = work => {}
            _ = self.cancel.cancelled() => {
                debug!("Discovery cancelled");
            }
            _ = deadline_elapsed(self.config.deadline) => {
                info!("Deadline reached, returning partial results");
                self.cancel.cancel();
            }
        }

        let graph = self.snapshot().await;
        let cancelled = self.cancel.is_cancelled();
        let discovery = Discovery {
            graph,
            stats: self.counters.snapshot(),
            cancelled,
            started_at,
            finished_at: Utc::now(),
        };

        if let Some((failures, last_error)) = self.transport.fatal() {
            warn!(failures, error = %last_error, "Resolver unreachable, aborting");
            return Err(DiscoveryError::ResolverUnreachable {
                failures,
                last_error,
                partial: Box::new(discovery),
            });
        }

        info!(nodes = discovery.graph.len(), cancelled, "Discovery finished");
        Ok(discovery)
    }

    /// Resolve `candidate`, record it, and keep pivoting through PTR names.
    ///
    /// Traversal is an explicit stack. A (hostname, address) pair is
    /// handled once per run, and again only when it is reached through a
    /// shorter chain of PTR hops than before. Hop counts only shrink, so
    /// cyclic DNS data terminates, and the final graph does not depend on
    /// the order roots are processed in. `max_depth` caps the hop count.
    pub async fn discover(&self, candidate: Candidate) {
        let mut stack = vec![(candidate, 0usize)];

        while let Some((candidate, depth)) = stack.pop() {
            if self.cancel.is_cancelled() {
                break;
            }

            let Some((hostname, addresses)) = self.probe(&candidate).await else {
                continue;
            };
            let pending = self.claim(&hostname, &addresses, depth);
            if pending.is_empty() {
                continue;
            }
            if depth >= self.config.max_depth {
                debug!(hostname = %hostname, depth, "Depth limit reached, not pivoting");
                continue;
            }

            let names = join_all(pending.iter().map(|&address| self.pivot(address))).await;

            // Reversed so the first address is expanded first.
            for (address, name) in pending.into_iter().zip(names).rev() {
                if let Some(name) = name {
                    stack.push((Candidate::derived(name, hostname.clone(), address), depth + 1));
                }
            }
        }
    }

    /// Addresses of `hostname` not yet handled at `depth` or shallower.
    fn claim(&self, hostname: &str, addresses: &BTreeSet<IpAddr>, depth: usize) -> Vec<IpAddr> {
        let Ok(mut expanded) = self.expanded.lock() else {
            return Vec::new();
        };
        addresses
            .iter()
            .copied()
            .filter(|&address| {
                let seen = expanded
                    .entry((hostname.to_string(), address))
                    .or_insert(usize::MAX);
                if depth < *seen {
                    *seen = depth;
                    true
                } else {
                    false
                }
            })
            .collect()
    }

    /// Forward-resolve and record. Returns the normalized hostname and every
    /// address its node now holds.
    async fn probe(&self, candidate: &Candidate) -> Option<(String, BTreeSet<IpAddr>)> {
        let hostname = normalize_hostname(&candidate.hostname);

        let answer = {
            let _permit = self.permits.acquire().await.ok()?;
            self.counters.forward_queries.fetch_add(1, Ordering::Relaxed);
            self.resolver.resolve_forward(&hostname).await
        };

        let addresses = match answer {
            Ok(addresses) => {
                self.transport.answered();
                addresses
            }
            Err(error) => {
                self.lookup_failed(&error);
                debug!(hostname = %hostname, error = %error, "Abandoning candidate");
                self.counters.abandoned.fetch_add(1, Ordering::Relaxed);
                self.emit(DiscoveryEvent::Abandoned { hostname, error });
                return None;
            }
        };

        let (recorded, known) = {
            let mut graph = self.graph.lock().await;
            let recorded = graph.record(&hostname, &addresses, candidate.parent());
            let known = graph.get(&hostname).map(|node| node.addresses.clone());
            (recorded, known)
        };

        match recorded {
            Ok(Recorded::Created(fresh)) => {
                info!(hostname = %hostname, addresses = fresh.len(), "Resolved");
                self.emit(DiscoveryEvent::Resolved {
                    hostname: hostname.clone(),
                    addresses: fresh.clone(),
                    parent: candidate.parent().map(normalize_hostname),
                });
                Some((hostname, known.unwrap_or(fresh)))
            }
            Ok(Recorded::Merged(fresh)) => {
                debug!(hostname = %hostname, fresh = fresh.len(), "Rediscovered");
                if !fresh.is_empty() {
                    self.emit(DiscoveryEvent::Merged {
                        hostname: hostname.clone(),
                        fresh,
                    });
                }
                Some((hostname, known.unwrap_or_default()))
            }
            Err(e) => {
                warn!(hostname = %hostname, error = %e, "Could not record hostname");
                None
            }
        }
    }

    /// Reverse-resolve one address; `None` prunes it.
    async fn pivot(&self, address: IpAddr) -> Option<String> {
        if self.cancel.is_cancelled() {
            return None;
        }

        let answer = {
            let _permit = self.permits.acquire().await.ok()?;
            self.counters.reverse_queries.fetch_add(1, Ordering::Relaxed);
            self.resolver.resolve_reverse(address).await
        };

        match answer {
            Ok(hostname) => {
                self.transport.answered();
                let hostname = normalize_hostname(&hostname);
                debug!(address = %address, hostname = %hostname, "PTR pivot");
                self.counters.pivots.fetch_add(1, Ordering::Relaxed);
                self.emit(DiscoveryEvent::Pivot {
                    address,
                    hostname: hostname.clone(),
                });
                Some(hostname)
            }
            Err(error) => {
                self.lookup_failed(&error);
                if !matches!(error, LookupError::NoPtrRecord(_)) {
                    debug!(address = %address, error = %error, "Reverse lookup failed");
                }
                self.emit(DiscoveryEvent::NoPtr { address, error });
                None
            }
        }
    }

    fn lookup_failed(&self, error: &LookupError) {
        match error {
            LookupError::Transport(_) => {
                if self.transport.failed(error) {
                    warn!(error = %error, "Too many consecutive transport failures, stopping");
                    self.cancel.cancel();
                }
            }
            // Neither reached the nameserver with an answer: no count, no reset.
            LookupError::Timeout(_) | LookupError::InvalidName(_) => {}
            _ => self.transport.answered(),
        }
    }

    fn emit(&self, event: DiscoveryEvent) {
        if let Some(ref callback) = self.on_event {
            callback(&event);
        }
    }
}

async fn deadline_elapsed(deadline: Option<Duration>) {
    match deadline {
        Some(deadline) => tokio::time::sleep(deadline).await,
        None => std::future::pending().await,
    }
}
