//! Immutable route registry.

use tracing::debug;

use super::types::ConversionRoute;
use super::RouteError;

/// Source-format key to route, in registration order.
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    routes: Vec<(String, ConversionRoute)>,
}

impl RouteRegistry {
    pub fn builder() -> RouteRegistryBuilder {
        RouteRegistryBuilder::default()
    }

    /// A registry holding one route, as used by single-purpose tools.
    pub fn single(key: impl Into<String>, route: ConversionRoute) -> Result<Self, RouteError> {
        Ok(Self::builder().register(key, route)?.build())
    }

    pub fn lookup(&self, key: &str) -> Option<&ConversionRoute> {
        self.routes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, route)| route)
    }

    /// Looks up a route and checks it can produce `target`.
    pub fn resolve(&self, key: &str, target: &str) -> Result<&ConversionRoute, RouteError> {
        let route = self
            .lookup(key)
            .ok_or_else(|| RouteError::UnknownRoute(key.to_string()))?;
        if !route.supports(target) {
            return Err(RouteError::UnsupportedTarget {
                route: route.route_id.clone(),
                target: target.to_string(),
            });
        }
        Ok(route)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConversionRoute)> {
        self.routes.iter().map(|(k, r)| (k.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Collects routes and rejects misconfiguration before the registry exists.
#[derive(Debug, Default)]
pub struct RouteRegistryBuilder {
    routes: Vec<(String, ConversionRoute)>,
}

impl RouteRegistryBuilder {
    pub fn register(
        mut self,
        key: impl Into<String>,
        route: ConversionRoute,
    ) -> Result<Self, RouteError> {
        let key = key.into();
        if self.routes.iter().any(|(k, _)| *k == key) {
            return Err(RouteError::DuplicateRoute(key));
        }
        if route.target_formats.is_empty() {
            return Err(RouteError::NoTargets(route.route_id));
        }

        debug!("Registered route {} for '{}'", route.route_id, key);
        self.routes.push((key, route));
        Ok(self)
    }

    pub fn build(self) -> RouteRegistry {
        RouteRegistry {
            routes: self.routes,
        }
    }
}
