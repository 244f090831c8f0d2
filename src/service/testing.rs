//! Scriptable collaborators for service-layer tests.

use std::collections::HashMap;
use std::future::pending;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{
    EventPublisher, Namespace, RegistryBackend, RegistryEvent, Service, WatchResult, Watcher,
};
use crate::error::{BackendError, PublishError};

#[allow(clippy::panic)]
pub(crate) fn ns(s: &str) -> Namespace {
    let Ok(ns) = Namespace::parse(s) else {
        panic!("valid namespace {s}");
    };
    ns
}

/// Backend fake with per-domain data, injected errors, scripted watch
/// feeds and counted `stop()` calls.
#[derive(Debug, Default)]
pub(crate) struct FakeBackend {
    services: Mutex<HashMap<String, Vec<Service>>>,
    domain_errors: Mutex<HashMap<String, BackendError>>,
    watch_errors: Mutex<HashMap<String, BackendError>>,
    feeds: Mutex<HashMap<String, mpsc::UnboundedReceiver<WatchResult>>>,
    registered: Mutex<Vec<(String, Service, Option<Duration>)>>,
    deregistered: Mutex<Vec<(String, Service)>>,
    opened: AtomicUsize,
    stopped: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub(crate) fn insert(&self, domain: &str, service: Service) {
        self.services
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(domain.to_string())
            .or_default()
            .push(service);
    }

    pub(crate) fn fail_domain(&self, domain: &str, err: BackendError) {
        self.domain_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(domain.to_string(), err);
    }

    pub(crate) fn fail_watch(&self, domain: &str, err: BackendError) {
        self.watch_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(domain.to_string(), err);
    }

    /// Scripts the watch feed for `domain`. Dropping the sender ends the
    /// subscription; domains without a feed stay open and silent.
    pub(crate) fn feed(&self, domain: &str) -> mpsc::UnboundedSender<WatchResult> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.feeds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(domain.to_string(), rx);
        tx
    }

    pub(crate) fn registered(&self) -> Vec<(String, Service, Option<Duration>)> {
        self.registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn deregistered(&self) -> Vec<(String, Service)> {
        self.deregistered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    pub(crate) async fn wait_opened(&self, n: usize) {
        while self.opened() < n {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    fn domain_error(&self, domain: &Namespace) -> Option<BackendError> {
        self.domain_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(domain.as_str())
            .cloned()
    }
}

#[async_trait]
impl RegistryBackend for FakeBackend {
    async fn register(
        &self,
        service: &Service,
        domain: &Namespace,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        if let Some(err) = self.domain_error(domain) {
            return Err(err);
        }
        self.registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((domain.to_string(), service.clone(), ttl));
        Ok(())
    }

    async fn deregister(&self, service: &Service, domain: &Namespace) -> Result<(), BackendError> {
        if let Some(err) = self.domain_error(domain) {
            return Err(err);
        }
        self.deregistered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((domain.to_string(), service.clone()));
        Ok(())
    }

    async fn get_service(
        &self,
        name: &str,
        domain: &Namespace,
    ) -> Result<Vec<Service>, BackendError> {
        if let Some(err) = self.domain_error(domain) {
            return Err(err);
        }
        let found: Vec<Service> = self
            .services
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(domain.as_str())
            .into_iter()
            .flatten()
            .filter(|s| s.name == name)
            .cloned()
            .collect();
        if found.is_empty() {
            return Err(BackendError::NotFound);
        }
        Ok(found)
    }

    async fn list_services(&self, domain: &Namespace) -> Result<Vec<Service>, BackendError> {
        if let Some(err) = self.domain_error(domain) {
            return Err(err);
        }
        Ok(self
            .services
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(domain.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn watch(
        &self,
        _service: Option<&str>,
        domain: &Namespace,
    ) -> Result<Box<dyn Watcher>, BackendError> {
        if let Some(err) = self
            .watch_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(domain.as_str())
            .cloned()
        {
            return Err(err);
        }
        let feed = self
            .feeds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(domain.as_str());
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeWatcher {
            feed,
            stopped: Arc::clone(&self.stopped),
        }))
    }
}

#[derive(Debug)]
struct FakeWatcher {
    feed: Option<mpsc::UnboundedReceiver<WatchResult>>,
    stopped: Arc<AtomicUsize>,
}

#[async_trait]
impl Watcher for FakeWatcher {
    async fn next(&mut self) -> Option<WatchResult> {
        match self.feed.as_mut() {
            Some(feed) => feed.recv().await,
            None => pending().await,
        }
    }

    fn stop(&mut self) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
    }
}

/// How a [`RecordingPublisher`] answers.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PublishMode {
    Accept,
    Reject,
    Hang,
}

/// Publisher that records every event it is handed.
#[derive(Debug)]
pub(crate) struct RecordingPublisher {
    seen: mpsc::UnboundedSender<RegistryEvent>,
    mode: PublishMode,
}

impl RecordingPublisher {
    pub(crate) fn new(mode: PublishMode) -> (Self, mpsc::UnboundedReceiver<RegistryEvent>) {
        let (seen, rx) = mpsc::unbounded_channel();
        (Self { seen, mode }, rx)
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: RegistryEvent) -> Result<(), PublishError> {
        let _ = self.seen.send(event);
        match self.mode {
            PublishMode::Accept => Ok(()),
            PublishMode::Reject => Err(PublishError::Rejected("broker refused".to_string())),
            PublishMode::Hang => pending().await,
        }
    }
}
