//! Method routing from `namespace_method` to a registered service.

use crate::domain::error::{ApiError, ApiResult};
use crate::rpc::registry::{split_method, NamespaceRegistry};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Whether the caller passed an authentication gate.
///
/// Set once by the gate that admitted the request or connection. Plain
/// listeners always dispatch as `Anonymous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Anonymous,
    Authenticated,
}

impl AuthStatus {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthStatus::Authenticated)
    }
}

/// Which registered namespaces a listener exposes.
#[derive(Debug, Clone, Default)]
pub enum ListenerScope {
    /// Every registered namespace
    #[default]
    All,
    /// Only the named namespaces
    Modules(HashSet<String>),
}

impl ListenerScope {
    pub fn modules<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ListenerScope::Modules(modules.into_iter().map(Into::into).collect())
    }

    pub fn exposes(&self, namespace: &str) -> bool {
        match self {
            ListenerScope::All => true,
            ListenerScope::Modules(modules) => modules.contains(namespace),
        }
    }
}

/// Routes calls for one listener.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<NamespaceRegistry>,
    scope: ListenerScope,
}

impl Dispatcher {
    pub fn new(registry: Arc<NamespaceRegistry>, scope: ListenerScope) -> Self {
        Self { registry, scope }
    }

    /// Route `method` to its namespace.
    ///
    /// Namespaces outside this listener's scope are reported as not found.
    /// Namespaces flagged as authenticated refuse `Anonymous` callers.
    pub async fn dispatch(
        &self,
        method: &str,
        params: Option<&serde_json::Value>,
        status: AuthStatus,
    ) -> ApiResult<serde_json::Value> {
        let (namespace, name) =
            split_method(method).ok_or_else(|| ApiError::method_not_found(method))?;

        let api = self
            .registry
            .get(namespace)
            .filter(|_| self.scope.exposes(namespace))
            .ok_or_else(|| ApiError::method_not_found(method))?;

        if api.authenticated && !status.is_authenticated() {
            warn!(method = %method, "Authenticated namespace called without credentials");
            return Err(ApiError::unauthorized());
        }

        debug!(namespace = %namespace, method = %name, "Dispatching call");
        api.service.call(name, params).await
    }
}
