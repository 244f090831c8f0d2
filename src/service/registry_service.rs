//! Registry service: namespace-aware aggregation over the backend.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;

use super::watch::{WatchEnd, WatchMultiplexer, WatchSink};
use crate::domain::{
    EventPublisher, EventType, Namespace, NamespaceResolver, RegistryBackend, RegistryEvent,
    RequestContext, Service, domain_set,
};
use crate::error::{BackendError, GatewayError};

/// Tunables for [`RegistryService`].
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Stamped as `id` on every published event.
    pub service_id: String,
    /// Bounded wait for one publish attempt.
    pub publish_timeout: Duration,
    /// Capacity of the watch merge channel.
    pub watch_capacity: usize,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            service_id: "go.micro.registry".to_string(),
            publish_timeout: Duration::from_secs(5),
            watch_capacity: 1,
        }
    }
}

/// Orchestration layer for all registry operations.
///
/// Holds no service state: every call resolves its domain set, queries the
/// backend per domain and merges the results. Mutations additionally fire
/// one event through the publisher in a detached task.
#[derive(Debug, Clone)]
pub struct RegistryService {
    backend: Arc<dyn RegistryBackend>,
    publisher: Arc<dyn EventPublisher>,
    resolver: NamespaceResolver,
    multiplexer: WatchMultiplexer,
    options: RegistryOptions,
}

impl RegistryService {
    /// Creates a new `RegistryService`.
    #[must_use]
    pub fn new(
        backend: Arc<dyn RegistryBackend>,
        publisher: Arc<dyn EventPublisher>,
        resolver: NamespaceResolver,
        options: RegistryOptions,
    ) -> Self {
        let multiplexer = WatchMultiplexer::new(Arc::clone(&backend), options.watch_capacity);
        Self {
            backend,
            publisher,
            resolver,
            multiplexer,
            options,
        }
    }

    /// Returns the namespace resolver.
    #[must_use]
    pub fn resolver(&self) -> &NamespaceResolver {
        &self.resolver
    }

    /// Registers `service` in the caller's namespace.
    ///
    /// The event is published after this returns; its outcome never
    /// affects the result.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for a nameless service and
    /// [`GatewayError::Internal`] if the backend rejects the write.
    pub async fn register(
        &self,
        ctx: &RequestContext,
        service: Service,
        ttl: Option<Duration>,
    ) -> Result<(), GatewayError> {
        validate(&service)?;
        let domain = self.resolver.resolve(ctx);

        self.backend
            .register(&service, &domain, ttl)
            .await
            .inspect_err(|err| {
                tracing::error!(%domain, service = %service.name, error = %err, "register failed");
            })?;

        tracing::info!(%domain, service = %service.name, version = %service.version, "service registered");
        self.publish_detached(EventType::Create, service);
        Ok(())
    }

    /// Deregisters `service` from the caller's namespace.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for a nameless service and
    /// [`GatewayError::Internal`] if the backend rejects the write.
    pub async fn deregister(
        &self,
        ctx: &RequestContext,
        service: Service,
    ) -> Result<(), GatewayError> {
        validate(&service)?;
        let domain = self.resolver.resolve(ctx);

        self.backend
            .deregister(&service, &domain)
            .await
            .inspect_err(|err| {
                tracing::error!(%domain, service = %service.name, error = %err, "deregister failed");
            })?;

        tracing::info!(%domain, service = %service.name, version = %service.version, "service deregistered");
        self.publish_detached(EventType::Delete, service);
        Ok(())
    }

    /// Looks `name` up across the default, caller and explicit domains.
    ///
    /// Results are concatenated in that domain order without
    /// deduplication.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ServiceNotFound`] if no domain holds the
    /// service, or [`GatewayError::Internal`] for the first domain (in
    /// precedence order) that failed with anything other than not-found.
    pub async fn get_service(
        &self,
        ctx: &RequestContext,
        name: &str,
        explicit: Option<&Namespace>,
    ) -> Result<Vec<Service>, GatewayError> {
        let domains = self.domains_for(ctx, explicit);
        let lookups = join_all(
            domains
                .iter()
                .map(|domain| self.backend.get_service(name, domain)),
        )
        .await;

        let services = merge(&domains, lookups)?;
        if services.is_empty() {
            return Err(GatewayError::ServiceNotFound(name.to_string()));
        }
        Ok(services)
    }

    /// Lists services across the default, caller and explicit domains.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] for the first domain (in
    /// precedence order) that failed.
    pub async fn list_services(
        &self,
        ctx: &RequestContext,
        explicit: Option<&Namespace>,
    ) -> Result<Vec<Service>, GatewayError> {
        let domains = self.domains_for(ctx, explicit);
        let listings = join_all(
            domains
                .iter()
                .map(|domain| self.backend.list_services(domain)),
        )
        .await;
        merge(&domains, listings)
    }

    /// Streams changes to `service` (or every service) from the default,
    /// caller and explicit domains into `sink` until `ctx` is cancelled,
    /// a subscription ends, or the sink fails.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if a subscription cannot be
    /// opened, or the sink's error if a write fails.
    pub async fn watch<S>(
        &self,
        ctx: &RequestContext,
        service: Option<&str>,
        explicit: Option<&Namespace>,
        sink: &mut S,
    ) -> Result<WatchEnd, GatewayError>
    where
        S: WatchSink + ?Sized,
    {
        let domains = self.domains_for(ctx, explicit);
        self.multiplexer
            .run(&ctx.cancel, service.filter(|s| !s.is_empty()), &domains, sink)
            .await
    }

    fn domains_for(&self, ctx: &RequestContext, explicit: Option<&Namespace>) -> Vec<Namespace> {
        let caller = self.resolver.resolve(ctx);
        if let Some(explicit) = explicit {
            // no authorization check: any caller may read any domain it names
            tracing::debug!(%caller, %explicit, "explicit domain requested");
        }
        domain_set(self.resolver.default_namespace(), &caller, explicit)
    }

    fn publish_detached(&self, event_type: EventType, service: Service) {
        let event = RegistryEvent::new(self.options.service_id.clone(), event_type, service);
        let publisher = Arc::clone(&self.publisher);
        let timeout = self.options.publish_timeout;

        tokio::spawn(async move {
            let event_id = event.event_id;
            tracing::debug!(%event_id, action = event.event_type.as_str(), "publishing event");
            match tokio::time::timeout(timeout, publisher.publish(event)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(%event_id, error = %err, "event publish failed");
                }
                Err(_) => {
                    tracing::warn!(%event_id, ?timeout, "event publish timed out");
                }
            }
        });
    }
}

fn validate(service: &Service) -> Result<(), GatewayError> {
    if service.name.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "service name must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Concatenates per-domain results in domain order. Not-found contributes
/// nothing; the first other error aborts.
fn merge(
    domains: &[Namespace],
    results: Vec<Result<Vec<Service>, BackendError>>,
) -> Result<Vec<Service>, GatewayError> {
    let mut services = Vec::new();
    for (domain, result) in domains.iter().zip(results) {
        match result {
            Ok(found) => services.extend(found),
            Err(BackendError::NotFound) => {}
            Err(err) => {
                tracing::error!(%domain, error = %err, "registry query failed");
                return Err(err.into());
            }
        }
    }
    Ok(services)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::service::testing::{FakeBackend, PublishMode, RecordingPublisher, ns};

    fn make_service(mode: PublishMode) -> (
        RegistryService,
        Arc<FakeBackend>,
        tokio::sync::mpsc::UnboundedReceiver<RegistryEvent>,
    ) {
        let backend = Arc::new(FakeBackend::default());
        let (publisher, events) = RecordingPublisher::new(mode);
        let service = RegistryService::new(
            Arc::clone(&backend) as Arc<dyn RegistryBackend>,
            Arc::new(publisher),
            NamespaceResolver::new(ns("go.micro")),
            RegistryOptions {
                publish_timeout: Duration::from_millis(50),
                ..RegistryOptions::default()
            },
        );
        (service, backend, events)
    }

    fn as_caller(namespace: &str) -> RequestContext {
        RequestContext::new(Some(ns(namespace)))
    }

    fn ids(services: &[Service]) -> Vec<String> {
        services
            .iter()
            .map(|s| format!("{}@{}", s.name, s.version))
            .collect()
    }

    #[tokio::test]
    async fn default_domain_visible_to_every_caller() {
        let (svc, backend, _) = make_service(PublishMode::Accept);
        backend.insert("go.micro", Service::new("shared", "v1"));

        for caller in ["go.micro", "tenant1", "tenant2"] {
            let Ok(found) = svc.get_service(&as_caller(caller), "shared", None).await else {
                panic!("shared service must be visible to {caller}");
            };
            assert_eq!(ids(&found), vec!["shared@v1"]);
        }
    }

    #[tokio::test]
    async fn tenant_services_hidden_from_other_tenants() {
        let (svc, backend, _) = make_service(PublishMode::Accept);
        backend.insert("tenant1", Service::new("private", "v1"));

        let result = svc.get_service(&as_caller("tenant2"), "private", None).await;
        assert!(matches!(result, Err(GatewayError::ServiceNotFound(_))));

        let Ok(found) = svc.get_service(&as_caller("tenant1"), "private", None).await else {
            panic!("owner must see its service");
        };
        assert_eq!(ids(&found), vec!["private@v1"]);
    }

    #[tokio::test]
    async fn default_entries_precede_caller_entries() {
        let (svc, backend, _) = make_service(PublishMode::Accept);
        backend.insert("tenant1", Service::new("greeter", "v2"));
        backend.insert("go.micro", Service::new("greeter", "v1"));

        let Ok(found) = svc.get_service(&as_caller("tenant1"), "greeter", None).await else {
            panic!("greeter should be found");
        };
        assert_eq!(ids(&found), vec!["greeter@v1", "greeter@v2"]);
    }

    #[tokio::test]
    async fn same_identity_in_two_domains_is_not_deduplicated() {
        let (svc, backend, _) = make_service(PublishMode::Accept);
        backend.insert("go.micro", Service::new("greeter", "v1"));
        backend.insert("tenant1", Service::new("greeter", "v1"));

        let Ok(found) = svc.get_service(&as_caller("tenant1"), "greeter", None).await else {
            panic!("greeter should be found");
        };
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn explicit_domain_is_appended_last() {
        let (svc, backend, _) = make_service(PublishMode::Accept);
        backend.insert("go.micro", Service::new("greeter", "v1"));
        backend.insert("tenant1", Service::new("greeter", "v2"));
        backend.insert("tenant9", Service::new("greeter", "v3"));

        let explicit = ns("tenant9");
        let Ok(found) = svc
            .get_service(&as_caller("tenant1"), "greeter", Some(&explicit))
            .await
        else {
            panic!("greeter should be found");
        };
        assert_eq!(ids(&found), vec!["greeter@v1", "greeter@v2", "greeter@v3"]);
    }

    #[tokio::test]
    async fn domain_error_beats_matches_elsewhere() {
        let (svc, backend, _) = make_service(PublishMode::Accept);
        backend.insert("go.micro", Service::new("greeter", "v1"));
        backend.fail_domain("tenant1", BackendError::Unavailable("down".to_string()));

        let result = svc.get_service(&as_caller("tenant1"), "greeter", None).await;
        assert!(matches!(result, Err(GatewayError::Internal(_))));

        let result = svc.list_services(&as_caller("tenant1"), None).await;
        assert!(matches!(result, Err(GatewayError::Internal(_))));
    }

    #[tokio::test]
    async fn missing_everywhere_is_not_found() {
        let (svc, _, _) = make_service(PublishMode::Accept);
        let result = svc.get_service(&as_caller("tenant1"), "ghost", None).await;
        assert!(matches!(result, Err(GatewayError::ServiceNotFound(ref n)) if n == "ghost"));
    }

    #[tokio::test]
    async fn list_scenario_across_tenants() {
        let (svc, backend, _) = make_service(PublishMode::Accept);
        backend.insert("go.micro", Service::new("A", "v1"));
        backend.insert("tenant1", Service::new("B", "v1"));

        let Ok(t1) = svc.list_services(&as_caller("tenant1"), None).await else {
            panic!("list should succeed");
        };
        assert_eq!(ids(&t1), vec!["A@v1", "B@v1"]);

        let Ok(t2) = svc.list_services(&as_caller("tenant2"), None).await else {
            panic!("list should succeed");
        };
        assert_eq!(ids(&t2), vec!["A@v1"]);

        let result = svc.get_service(&as_caller("tenant2"), "B", None).await;
        assert!(matches!(result, Err(GatewayError::ServiceNotFound(_))));
    }

    #[tokio::test]
    async fn missing_namespace_resolves_to_default() {
        let (svc, backend, _) = make_service(PublishMode::Accept);
        let ctx = RequestContext::default();
        assert!(svc.register(&ctx, Service::new("sys", "v1"), None).await.is_ok());

        let registered = backend.registered();
        assert_eq!(registered.first().map(|r| r.0.as_str()), Some("go.micro"));
    }

    #[tokio::test]
    async fn register_writes_caller_domain_and_emits_create() {
        let (svc, backend, mut events) = make_service(PublishMode::Accept);
        let ttl = Some(Duration::from_secs(30));

        let result = svc
            .register(&as_caller("tenant1"), Service::new("greeter", "v1"), ttl)
            .await;
        assert!(result.is_ok());

        let registered = backend.registered();
        let Some((domain, service, seen_ttl)) = registered.first() else {
            panic!("backend register not called");
        };
        assert_eq!(domain, "tenant1");
        assert_eq!(service.name, "greeter");
        assert_eq!(*seen_ttl, ttl);

        let event = tokio::time::timeout(Duration::from_secs(1), events.recv()).await;
        let Ok(Some(event)) = event else {
            panic!("expected a published event");
        };
        assert_eq!(event.event_type, EventType::Create);
        assert_eq!(event.id, "go.micro.registry");
        assert_eq!(event.service.name, "greeter");
    }

    #[tokio::test]
    async fn publish_failure_does_not_fail_register() {
        let (svc, _, mut events) = make_service(PublishMode::Reject);
        let result = svc
            .register(&as_caller("tenant1"), Service::new("greeter", "v1"), None)
            .await;
        assert!(result.is_ok());
        let event = tokio::time::timeout(Duration::from_secs(1), events.recv()).await;
        assert!(matches!(event, Ok(Some(_))));
    }

    #[tokio::test]
    async fn hanging_publisher_does_not_block_register() {
        let (svc, _, mut events) = make_service(PublishMode::Hang);
        let result = tokio::time::timeout(
            Duration::from_millis(500),
            svc.register(&as_caller("tenant1"), Service::new("greeter", "v1"), None),
        )
        .await;
        assert!(matches!(result, Ok(Ok(()))));
        let event = tokio::time::timeout(Duration::from_secs(1), events.recv()).await;
        assert!(matches!(event, Ok(Some(_))));
    }

    #[tokio::test]
    async fn deregister_emits_delete() {
        let (svc, backend, mut events) = make_service(PublishMode::Accept);
        let result = svc
            .deregister(&as_caller("tenant1"), Service::new("greeter", "v1"))
            .await;
        assert!(result.is_ok());
        assert_eq!(backend.deregistered().len(), 1);

        let Ok(Some(event)) = tokio::time::timeout(Duration::from_secs(1), events.recv()).await
        else {
            panic!("expected a published event");
        };
        assert_eq!(event.event_type, EventType::Delete);
    }

    #[tokio::test]
    async fn failed_register_emits_nothing() {
        let (svc, backend, mut events) = make_service(PublishMode::Accept);
        backend.fail_domain("tenant1", BackendError::Internal("boom".to_string()));

        let result = svc
            .register(&as_caller("tenant1"), Service::new("greeter", "v1"), None)
            .await;
        assert!(matches!(result, Err(GatewayError::Internal(_))));

        tokio::task::yield_now().await;
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn nameless_service_is_rejected() {
        let (svc, backend, _) = make_service(PublishMode::Accept);
        let result = svc
            .register(&as_caller("tenant1"), Service::new("  ", "v1"), None)
            .await;
        assert!(matches!(result, Err(GatewayError::InvalidRequest(_))));
        assert!(backend.registered().is_empty());
    }

    #[tokio::test]
    async fn watch_uses_caller_domain_set() {
        let (svc, backend, _) = make_service(PublishMode::Accept);
        let ctx = as_caller("tenant1");
        let (mut sink, _rx) = tokio::sync::mpsc::channel::<crate::domain::WatchResult>(4);

        let task = {
            let svc = svc.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move { svc.watch(&ctx, Some("greeter"), None, &mut sink).await })
        };
        backend.wait_opened(2).await;
        ctx.cancel.cancel();

        let Ok(Ok(outcome)) = tokio::time::timeout(Duration::from_secs(1), task).await else {
            panic!("watch did not finish");
        };
        assert_eq!(outcome.ok(), Some(WatchEnd::Cancelled));
        assert_eq!(backend.opened(), 2);
        assert_eq!(backend.stopped(), 2);
    }
}
