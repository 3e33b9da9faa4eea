//! Application builder and running application.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::app::proxy::ProxyService;
use crate::app::settings::Settings;
use crate::config::AppConfig;
use crate::error::DispatchResult;
use crate::routing::{PatternError, RequestContext, RouteAction, RouteNode, Router};
use crate::service::{ActionResolver, Method, Service, ServiceApi, ServiceCall};
use crate::transport::{self, Pattern, Request, Transport};

type SharedApi = Arc<dyn ServiceApi>;

/// Registration phase of an application.
pub struct Application<T> {
    domain: String,
    transport: Arc<T>,
    settings: Settings,
    routes: RouteNode,
    services: BTreeMap<String, SharedApi>,
}

impl<T: Transport> Application<T> {
    pub fn new(transport: T, domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            transport: Arc::new(transport),
            settings: Settings::new(),
            routes: RouteNode::root(),
            services: BTreeMap::new(),
        }
    }

    /// Domain and initial settings taken from `config`.
    pub fn from_config(transport: T, config: &AppConfig) -> Self {
        let mut app = Self::new(transport, config.domain.clone());
        app.settings = Settings::from_map(config.settings.clone());
        app
    }

    /// Register `service` at `location`, wrapped in an action resolver.
    pub fn service<S: Service>(self, location: &str, service: S) -> Self {
        let location = strip_slashes(location);
        let resolver = ActionResolver::new(location.clone(), service);
        self.register(location, Arc::new(resolver))
    }

    /// Register any [`ServiceApi`] at `location` as is.
    pub fn service_api(self, location: &str, api: SharedApi) -> Self {
        self.register(strip_slashes(location), api)
    }

    fn register(mut self, location: String, api: SharedApi) -> Self {
        tracing::debug!(location = %location, "Registering service");
        if self.services.insert(location.clone(), api).is_some() {
            tracing::warn!(location = %location, "Replaced previously registered service");
        }
        self
    }

    /// Add a middleware route. A route at `/error` becomes the error route.
    pub fn use_route(mut self, path: &str, action: RouteAction) -> Self {
        self.routes.push(RouteNode::new(path, action));
        self
    }

    /// Mount a route subtree under `path`.
    pub fn mount(mut self, path: &str, subtree: RouteNode) -> Self {
        self.routes.mount(path, subtree);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.settings.get(name)
    }

    pub fn set(mut self, name: &str, value: Value) -> Self {
        self.settings.set(name, value);
        self
    }

    pub fn enable(mut self, name: &str) -> Self {
        self.settings.enable(name);
        self
    }

    pub fn disable(mut self, name: &str) -> Self {
        self.settings.disable(name);
        self
    }

    pub fn enabled(&self, name: &str) -> bool {
        self.settings.enabled(name)
    }

    pub fn disabled(&self, name: &str) -> bool {
        self.settings.disabled(name)
    }

    /// Run `f` against the builder, for grouping related registrations.
    pub fn configure<F>(self, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        f(self)
    }

    /// Client for a service at `location`, local or remote.
    pub fn proxy(&self, location: &str) -> ProxyService<T> {
        ProxyService::new(&self.domain, location, self.transport.clone())
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Freeze the route tree, set services up and register their handlers.
    pub fn start(self) -> Result<App<T>, PatternError> {
        let router = Arc::new(Router::new(self.routes)?);

        for (location, api) in &self.services {
            api.setup(location);
        }

        for (location, api) in &self.services {
            let topic = format!("{}.{}", self.domain, location);
            for method in Method::ALL {
                let router = router.clone();
                let api = api.clone();
                let location = location.clone();
                self.transport.add(
                    Pattern::new(topic.clone(), method),
                    transport::handler(move |req: Request| {
                        let router = router.clone();
                        let api = api.clone();
                        let location = location.clone();
                        async move { serve(&router, api.as_ref(), &location, req).await }
                    }),
                );
            }
        }

        tracing::info!(
            domain = %self.domain,
            services = self.services.len(),
            error_route = router.has_error_route(),
            "Application started"
        );

        Ok(App {
            domain: self.domain,
            transport: self.transport,
            settings: Arc::new(self.settings),
            router,
            services: self.services,
        })
    }
}

/// Run the middleware chain for `location`, then the service itself.
async fn serve(router: &Router, api: &dyn ServiceApi, location: &str, req: Request) -> DispatchResult<Value> {
    let query = Value::Object(req.params.query.clone());
    tracing::debug!(service = location, cmd = %req.cmd, query = %query, "Service called");

    if !router.root().children().is_empty() {
        let ctx = RequestContext::new(format!("/{location}"))
            .with_params(req.params.to_map())
            .with_args(req.args.clone())
            .with_metadata("topic", Value::String(req.topic.clone()))
            .with_metadata("cmd", Value::String(req.cmd.as_str().to_string()))
            .with_metadata("service", Value::String(location.to_string()));

        if let Some(value) = router.dispatch_chain(ctx).await? {
            tracing::debug!(service = location, "Answered by middleware");
            return Ok(value);
        }
    }

    let call = ServiceCall::from_args(req.cmd, &req.args, req.params);
    api.call(req.cmd, call).await
}

fn strip_slashes(location: &str) -> String {
    location.trim_matches('/').to_string()
}

/// Serving phase of an application.
pub struct App<T> {
    domain: String,
    transport: Arc<T>,
    settings: Arc<Settings>,
    router: Arc<Router>,
    services: BTreeMap<String, SharedApi>,
}

impl<T: Transport> App<T> {
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Registered service locations, sorted.
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    /// The locally registered service at `location`, bypassing the transport.
    pub fn local(&self, location: &str) -> Option<SharedApi> {
        self.services.get(location.trim_matches('/')).cloned()
    }

    /// Client for `location` through the transport.
    pub fn service(&self, location: &str) -> ProxyService<T> {
        ProxyService::new(&self.domain, location, self.transport.clone())
    }

    /// Deliver a raw request through the transport.
    pub async fn request(&self, request: Request) -> DispatchResult<Value> {
        self.transport.act(request).await
    }
}
