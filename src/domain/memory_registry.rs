//! In-memory registry backend.
//!
//! [`MemoryRegistry`] keeps every domain in a single `RwLock<HashMap<...>>`
//! and fans changes out to watchers over a [`tokio::sync::broadcast`]
//! channel. Records registered with a TTL are hidden from reads once they
//! expire and are physically removed by [`MemoryRegistry::sweep_expired`].

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};
use tokio::time::Instant;

use super::backend::{RegistryBackend, Watcher};
use super::{EventType, Namespace, Service, WatchResult};
use crate::error::BackendError;

/// Default capacity of the change broadcast channel.
const DEFAULT_CHANGE_CAPACITY: usize = 1024;

#[derive(Debug)]
struct Record {
    service: Service,
    expires_at: Option<Instant>,
}

impl Record {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| deadline > now)
    }
}

#[derive(Debug, Clone)]
struct DomainChange {
    domain: Namespace,
    result: WatchResult,
}

type DomainMap = HashMap<Namespace, BTreeMap<String, Vec<Record>>>;

/// Concurrency-safe, process-local [`RegistryBackend`].
///
/// # Concurrency
///
/// - Reads on any domain run concurrently.
/// - Writes are serialized behind one lock and never await while holding it.
#[derive(Debug)]
pub struct MemoryRegistry {
    domains: RwLock<DomainMap>,
    changes: broadcast::Sender<DomainChange>,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANGE_CAPACITY)
    }

    /// Creates an empty registry whose watchers may lag by at most
    /// `capacity` changes before skipping.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self {
            domains: RwLock::new(HashMap::new()),
            changes,
        }
    }

    /// Removes every expired record, notifying watchers with a delete for
    /// each. Returns the number of records removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut expired = Vec::new();
        {
            let mut map = self.domains.write().await;
            for (domain, services) in map.iter_mut() {
                for versions in services.values_mut() {
                    let (live, dead): (Vec<_>, Vec<_>) =
                        versions.drain(..).partition(|r| r.is_live(now));
                    *versions = live;
                    expired.extend(dead.into_iter().map(|r| (domain.clone(), r.service)));
                }
                services.retain(|_, versions| !versions.is_empty());
            }
            map.retain(|_, services| !services.is_empty());
        }

        let count = expired.len();
        for (domain, service) in expired {
            tracing::debug!(%domain, service = %service.name, "registration expired");
            self.notify(domain, EventType::Delete, service);
        }
        count
    }

    fn notify(&self, domain: Namespace, action: EventType, service: Service) {
        let _ = self.changes.send(DomainChange {
            domain,
            result: WatchResult::new(action, service),
        });
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistryBackend for MemoryRegistry {
    async fn register(
        &self,
        service: &Service,
        domain: &Namespace,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        let now = Instant::now();
        // A deadline past the clock's range never expires.
        let expires_at = ttl
            .filter(|t| !t.is_zero())
            .and_then(|t| now.checked_add(t));

        let (action, snapshot, expired) = {
            let mut map = self.domains.write().await;
            let versions = map
                .entry(domain.clone())
                .or_default()
                .entry(service.name.clone())
                .or_default();
            let (live, dead): (Vec<_>, Vec<_>) =
                versions.drain(..).partition(|r| r.is_live(now));
            *versions = live;
            let expired: Vec<Service> = dead.into_iter().map(|r| r.service).collect();

            if let Some(record) = versions
                .iter_mut()
                .find(|r| r.service.same_identity(service))
            {
                for node in &service.nodes {
                    match record.service.nodes.iter_mut().find(|n| n.id == node.id) {
                        Some(existing) => *existing = node.clone(),
                        None => record.service.nodes.push(node.clone()),
                    }
                }
                record.service.metadata.clone_from(&service.metadata);
                record.service.endpoints.clone_from(&service.endpoints);
                record.expires_at = expires_at;
                (EventType::Update, record.service.clone(), expired)
            } else {
                versions.push(Record {
                    service: service.clone(),
                    expires_at,
                });
                (EventType::Create, service.clone(), expired)
            }
        };

        for gone in expired {
            tracing::debug!(%domain, service = %gone.name, "registration expired");
            self.notify(domain.clone(), EventType::Delete, gone);
        }
        self.notify(domain.clone(), action, snapshot);
        Ok(())
    }

    async fn deregister(&self, service: &Service, domain: &Namespace) -> Result<(), BackendError> {
        {
            let mut map = self.domains.write().await;
            let Some(services) = map.get_mut(domain) else {
                return Ok(());
            };
            let Some(versions) = services.get_mut(&service.name) else {
                return Ok(());
            };
            let Some(pos) = versions
                .iter()
                .position(|r| r.service.same_identity(service))
            else {
                return Ok(());
            };

            let drop_version = match versions.get_mut(pos) {
                Some(record) if !service.nodes.is_empty() => {
                    record
                        .service
                        .nodes
                        .retain(|n| !service.nodes.iter().any(|gone| gone.id == n.id));
                    record.service.nodes.is_empty()
                }
                _ => true,
            };
            if drop_version {
                versions.remove(pos);
            }
            if versions.is_empty() {
                services.remove(&service.name);
            }
            if services.is_empty() {
                map.remove(domain);
            }
        }

        self.notify(domain.clone(), EventType::Delete, service.clone());
        Ok(())
    }

    async fn get_service(
        &self,
        name: &str,
        domain: &Namespace,
    ) -> Result<Vec<Service>, BackendError> {
        let now = Instant::now();
        let map = self.domains.read().await;
        let found: Vec<Service> = map
            .get(domain)
            .and_then(|services| services.get(name))
            .into_iter()
            .flatten()
            .filter(|r| r.is_live(now))
            .map(|r| r.service.clone())
            .collect();

        if found.is_empty() {
            return Err(BackendError::NotFound);
        }
        Ok(found)
    }

    async fn list_services(&self, domain: &Namespace) -> Result<Vec<Service>, BackendError> {
        let now = Instant::now();
        let map = self.domains.read().await;
        Ok(map
            .get(domain)
            .into_iter()
            .flat_map(BTreeMap::values)
            .flatten()
            .filter(|r| r.is_live(now))
            .map(|r| r.service.clone())
            .collect())
    }

    async fn watch(
        &self,
        service: Option<&str>,
        domain: &Namespace,
    ) -> Result<Box<dyn Watcher>, BackendError> {
        Ok(Box::new(MemoryWatcher {
            rx: self.changes.subscribe(),
            domain: domain.clone(),
            service: service.filter(|s| !s.is_empty()).map(str::to_string),
            stopped: false,
        }))
    }
}

/// Watch subscription over a [`MemoryRegistry`].
#[derive(Debug)]
pub struct MemoryWatcher {
    rx: broadcast::Receiver<DomainChange>,
    domain: Namespace,
    service: Option<String>,
    stopped: bool,
}

impl MemoryWatcher {
    fn matches(&self, change: &DomainChange) -> bool {
        change.domain == self.domain
            && self
                .service
                .as_deref()
                .is_none_or(|name| name == change.result.service.name)
    }
}

#[async_trait]
impl Watcher for MemoryWatcher {
    async fn next(&mut self) -> Option<WatchResult> {
        while !self.stopped {
            match self.rx.recv().await {
                Ok(change) if self.matches(&change) => return Some(change.result),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(domain = %self.domain, lagged = n, "watcher lagged behind registry");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
        None
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}
