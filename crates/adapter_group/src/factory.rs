//! RegistryFactory - component kinds resolved from a table of constructors

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use contracts::{Component, ComponentFactory, ContractError, Descriptor};
use tracing::debug;

use crate::mock_component::MockComponent;

/// Kind name under which [`RegistryFactory::with_mock`] registers [`MockComponent`]
pub const MOCK_KIND: &str = "mock";

type Constructor =
    Arc<dyn Fn(&Descriptor) -> Result<Arc<dyn Component>, ContractError> + Send + Sync>;

/// Factory backed by a `kind -> constructor` map
///
/// Kind names are matched case-insensitively.
#[derive(Default)]
pub struct RegistryFactory {
    constructors: HashMap<String, Constructor>,
}

impl RegistryFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor, replacing any previous one for `kind`
    pub fn register<F>(&mut self, kind: &str, constructor: F)
    where
        F: Fn(&Descriptor) -> Result<Arc<dyn Component>, ContractError> + Send + Sync + 'static,
    {
        self.constructors
            .insert(kind.to_lowercase(), Arc::new(constructor));
    }

    /// Builder form of [`register`](Self::register)
    pub fn with<F>(mut self, kind: &str, constructor: F) -> Self
    where
        F: Fn(&Descriptor) -> Result<Arc<dyn Component>, ContractError> + Send + Sync + 'static,
    {
        self.register(kind, constructor);
        self
    }

    /// Register [`MockComponent`] as `mock`
    pub fn with_mock(self) -> Self {
        self.with(MOCK_KIND, |descriptor: &Descriptor| {
            Ok(Arc::new(MockComponent::new(descriptor.id, descriptor.display_name()))
                as Arc<dyn Component>)
        })
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(&kind.to_lowercase())
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.constructors.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}

impl ComponentFactory for RegistryFactory {
    fn construct(&self, descriptor: &Descriptor) -> Result<Arc<dyn Component>, ContractError> {
        let kind = descriptor.component_kind.trim();
        let constructor = self
            .constructors
            .get(&kind.to_lowercase())
            .ok_or_else(|| {
                ContractError::invalid_configuration(
                    descriptor.display_name(),
                    format!("no constructor registered for component kind \"{kind}\""),
                )
            })?;

        debug!(kind, component = descriptor.display_name(), "constructing component");
        constructor(descriptor)
    }
}

impl fmt::Debug for RegistryFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryFactory")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construct_registered_kind() {
        let factory = RegistryFactory::new().with_mock();
        let component = factory
            .construct(&Descriptor::new(5, "pmu_e", "Mock", ""))
            .unwrap();
        assert_eq!(component.id(), 5);
        assert_eq!(component.name(), "pmu_e");
        assert!(factory.contains("MOCK"));
    }

    #[test]
    fn test_unknown_kind_is_invalid_configuration() {
        let factory = RegistryFactory::new();
        let err = factory
            .construct(&Descriptor::new(2, "pmu_b", "phasor_input", ""))
            .err()
            .unwrap();
        assert!(matches!(err, ContractError::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("pmu_b"));
        assert!(err.to_string().contains("phasor_input"));
    }
}
