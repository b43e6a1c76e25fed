//! Service registry abstraction.
//!
//! The registry is an external collaborator: it returns the full list of
//! service descriptors and lookup-by-id happens client-side over that list.
//! The registry is read-only from the pipeline's point of view.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::descriptor::ServiceDescriptor;

/// Errors returned by a service registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The registry could not be reached.
    #[error("registry transport error: {0}")]
    Transport(String),
    /// The registry answered with something that is not a service list.
    #[error("malformed registry response: {0}")]
    Malformed(String),
}

/// Source of service descriptors.
///
/// Dyn-compatible so that executors can hold `Arc<dyn ServiceRegistry>`.
pub trait ServiceRegistry: Send + Sync {
    /// Returns every service the registry knows about.
    fn services(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ServiceDescriptor>, RegistryError>> + Send + '_>>;
}

impl<T: ServiceRegistry + ?Sized> ServiceRegistry for Arc<T> {
    fn services(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ServiceDescriptor>, RegistryError>> + Send + '_>>
    {
        (**self).services()
    }
}

/// A fixed, in-memory registry.
///
/// Used for inline server configuration and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    services: Vec<ServiceDescriptor>,
}

impl StaticRegistry {
    /// Creates a registry serving `services`.
    #[must_use]
    pub const fn new(services: Vec<ServiceDescriptor>) -> Self {
        Self { services }
    }
}

impl ServiceRegistry for StaticRegistry {
    fn services(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ServiceDescriptor>, RegistryError>> + Send + '_>>
    {
        Box::pin(async move { Ok(self.services.clone()) })
    }
}
