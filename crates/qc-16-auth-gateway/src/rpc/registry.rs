//! Namespace registry.

use crate::domain::error::GatewayError;
use crate::rpc::RpcService;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A service registered under a namespace.
#[derive(Clone)]
pub struct ApiDescriptor {
    pub namespace: String,
    pub version: String,
    pub service: Arc<dyn RpcService>,
    /// Calls into this namespace require an authenticated caller
    pub authenticated: bool,
}

impl ApiDescriptor {
    /// Open namespace, reachable without credentials.
    pub fn new(namespace: impl Into<String>, service: Arc<dyn RpcService>) -> Self {
        Self {
            namespace: namespace.into(),
            version: "1.0".to_string(),
            service,
            authenticated: false,
        }
    }

    /// Mark the namespace as requiring authentication.
    pub fn authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }
}

impl fmt::Debug for ApiDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiDescriptor")
            .field("namespace", &self.namespace)
            .field("version", &self.version)
            .field("authenticated", &self.authenticated)
            .finish_non_exhaustive()
    }
}

/// Namespace → service table.
#[derive(Debug, Clone, Default)]
pub struct NamespaceRegistry {
    apis: HashMap<String, ApiDescriptor>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, api: ApiDescriptor) -> Result<(), GatewayError> {
        if self.apis.contains_key(&api.namespace) {
            return Err(GatewayError::DuplicateNamespace(api.namespace));
        }
        self.apis.insert(api.namespace.clone(), api);
        Ok(())
    }

    pub fn get(&self, namespace: &str) -> Option<&ApiDescriptor> {
        self.apis.get(namespace)
    }

    /// Registered namespaces, sorted.
    pub fn namespaces(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.apis.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Split `namespace_method` at the first underscore.
pub fn split_method(method: &str) -> Option<(&str, &str)> {
    let (namespace, name) = method.split_once('_')?;
    if namespace.is_empty() || name.is_empty() {
        return None;
    }
    Some((namespace, name))
}
