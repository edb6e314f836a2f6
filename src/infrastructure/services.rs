//! Service descriptors registered by options extensions.

/// How long a resolved service instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceLifetime {
    Singleton,
    Scoped,
    Transient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub service: &'static str,
    pub implementation: &'static str,
    pub lifetime: ServiceLifetime,
}

impl ServiceDescriptor {
    pub const fn new(
        service: &'static str,
        implementation: &'static str,
        lifetime: ServiceLifetime,
    ) -> Self {
        Self {
            service,
            implementation,
            lifetime,
        }
    }
}

/// Ordered list of service registrations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceCollection {
    descriptors: Vec<ServiceDescriptor>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a registration. A later registration of the same service wins on lookup.
    pub fn add(&mut self, descriptor: ServiceDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Register only if the service has no registration yet. Returns whether it was added.
    pub fn try_add(&mut self, descriptor: ServiceDescriptor) -> bool {
        if self.contains(descriptor.service) {
            return false;
        }
        self.descriptors.push(descriptor);
        true
    }

    pub fn contains(&self, service: &str) -> bool {
        self.descriptors.iter().any(|d| d.service == service)
    }

    pub fn find(&self, service: &str) -> Option<&ServiceDescriptor> {
        self.descriptors.iter().rev().find(|d| d.service == service)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
