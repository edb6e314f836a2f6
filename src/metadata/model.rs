//! Model storage: the [`Model`] primitives and an in-memory implementation.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use super::{
    annotation_names, AnnotationValue, Annotations, ChangeTrackingStrategy, EntityType,
    IndexerProperty, PropertyAccessMode, RuntimeType,
};
use crate::{Error, ErrorContext, Result};

/// Lookups a model implementation provides. Consumers normally go through
/// [`ModelExt`](super::ModelExt), which is implemented for every `Model`.
pub trait Model: Send + Sync {
    /// Every entity type: regular and shared types ordered by name, then
    /// dependent types grouped by runtime type name.
    fn entity_types(&self) -> Vec<&EntityType>;

    /// Regular or shared entity type with this name. Dependent types are not
    /// addressable by name alone.
    fn find_entity_type_by_name(&self, name: &str) -> Option<&EntityType>;

    /// Regular entity type mapped to exactly this runtime type.
    fn find_entity_type_for(&self, ty: &RuntimeType) -> Option<&EntityType>;

    /// Dependent entity type over `ty` mapped under `navigation` of `defining_entity_type`.
    fn find_dependent_entity_type(
        &self,
        ty: &RuntimeType,
        navigation: &str,
        defining_entity_type: &EntityType,
    ) -> Option<&EntityType>;

    /// All entity types over `ty`, including shared and dependent ones.
    fn entity_types_with_type(&self, ty: &RuntimeType) -> Vec<&EntityType>;

    /// All entity types named `name`, including dependent ones.
    fn entity_types_with_name(&self, name: &str) -> Vec<&EntityType>;

    fn is_shared_type(&self, ty: &RuntimeType) -> bool;

    fn annotations(&self) -> &Annotations;

    fn annotation(&self, name: &str) -> Option<&AnnotationValue> {
        self.annotations().get(name)
    }

    fn find_indexer_property(&self, ty: &RuntimeType) -> Option<&IndexerProperty>;
}

/// Immutable model produced by [`ModelBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryModel {
    entity_types: BTreeMap<String, EntityType>,
    // runtime type name -> entity type name, regular types only
    clr_type_map: HashMap<String, String>,
    shared_types: HashMap<String, BTreeSet<String>>,
    // runtime type name -> dependent entity types
    defining: BTreeMap<String, Vec<EntityType>>,
    indexers: HashMap<String, IndexerProperty>,
    annotations: Annotations,
}

impl Model for InMemoryModel {
    fn entity_types(&self) -> Vec<&EntityType> {
        self.entity_types
            .values()
            .chain(self.defining.values().flatten())
            .collect()
    }

    fn find_entity_type_by_name(&self, name: &str) -> Option<&EntityType> {
        self.entity_types.get(name)
    }

    fn find_entity_type_for(&self, ty: &RuntimeType) -> Option<&EntityType> {
        self.clr_type_map
            .get(ty.name())
            .and_then(|name| self.entity_types.get(name))
    }

    fn find_dependent_entity_type(
        &self,
        ty: &RuntimeType,
        navigation: &str,
        defining_entity_type: &EntityType,
    ) -> Option<&EntityType> {
        self.defining.get(ty.name())?.iter().find(|entity| {
            entity.defining_navigation().is_some_and(|def| {
                def.navigation == navigation && def.defining_entity_type == defining_entity_type.name()
            })
        })
    }

    fn entity_types_with_type(&self, ty: &RuntimeType) -> Vec<&EntityType> {
        let mut found: Vec<&EntityType> = Vec::new();
        if let Some(entity) = self.find_entity_type_for(ty) {
            found.push(entity);
        }
        if let Some(names) = self.shared_types.get(ty.name()) {
            found.extend(names.iter().filter_map(|name| self.entity_types.get(name)));
        }
        if let Some(dependents) = self.defining.get(ty.name()) {
            found.extend(dependents.iter());
        }
        found
    }

    fn entity_types_with_name(&self, name: &str) -> Vec<&EntityType> {
        self.entity_types
            .get(name)
            .into_iter()
            .chain(self.defining.values().flatten().filter(|e| e.name() == name))
            .collect()
    }

    fn is_shared_type(&self, ty: &RuntimeType) -> bool {
        self.shared_types.contains_key(ty.name())
    }

    fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    fn find_indexer_property(&self, ty: &RuntimeType) -> Option<&IndexerProperty> {
        self.indexers.get(ty.name())
    }
}

fn invalid(entity: &str, message: impl Into<String>) -> Error {
    Error::validation_with_context(
        message,
        ErrorContext::new()
            .with_field_path(format!("model.entity_types[{}]", entity))
            .with_source("model_builder"),
    )
}

/// Collects entity types and annotations, then validates them into an [`InMemoryModel`].
#[derive(Debug, Default)]
pub struct ModelBuilder {
    entity_types: Vec<EntityType>,
    indexers: Vec<IndexerProperty>,
    annotations: Annotations,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_type(mut self, entity_type: EntityType) -> Self {
        self.entity_types.push(entity_type);
        self
    }

    pub fn annotation(mut self, name: impl Into<String>, value: impl Into<AnnotationValue>) -> Self {
        self.annotations.set(name, value);
        self
    }

    pub fn change_tracking_strategy(self, strategy: ChangeTrackingStrategy) -> Self {
        self.annotation(annotation_names::CHANGE_TRACKING_STRATEGY, strategy)
    }

    pub fn property_access_mode(self, mode: PropertyAccessMode) -> Self {
        self.annotation(annotation_names::PROPERTY_ACCESS_MODE, mode)
    }

    pub fn product_version(self, version: impl Into<String>) -> Self {
        self.annotation(annotation_names::PRODUCT_VERSION, AnnotationValue::Text(version.into()))
    }

    /// Register the indexer of its declaring type. A later registration for the
    /// same type replaces the earlier one.
    pub fn indexer_property(mut self, indexer: IndexerProperty) -> Self {
        self.indexers.push(indexer);
        self
    }

    pub fn build(self) -> Result<InMemoryModel> {
        let mut model = InMemoryModel {
            annotations: self.annotations,
            ..InMemoryModel::default()
        };

        let (dependents, regular): (Vec<_>, Vec<_>) = self
            .entity_types
            .into_iter()
            .partition(EntityType::has_defining_navigation);

        for entity in regular {
            let name = entity.name().to_string();
            let ty = entity.runtime_type().name().to_string();
            if model.entity_types.contains_key(&name) {
                return Err(invalid(&name, format!("duplicate entity type '{}'", name)));
            }
            if entity.is_shared_type() {
                if model.clr_type_map.contains_key(&ty) {
                    return Err(invalid(
                        &name,
                        format!("type '{}' is already mapped by a non-shared entity type", ty),
                    ));
                }
                model.shared_types.entry(ty).or_default().insert(name.clone());
            } else {
                if model.shared_types.contains_key(&ty) {
                    return Err(invalid(
                        &name,
                        format!("type '{}' is already mapped by a shared entity type", ty),
                    ));
                }
                model.clr_type_map.insert(ty, name.clone());
            }
            model.entity_types.insert(name, entity);
        }

        let dependent_names: BTreeSet<String> =
            dependents.iter().map(|e| e.name().to_string()).collect();

        for entity in dependents {
            let name = entity.display_name();
            let ty = entity.runtime_type().name().to_string();
            if model.clr_type_map.contains_key(&ty) || model.shared_types.contains_key(&ty) {
                return Err(invalid(
                    &name,
                    format!("type '{}' is mapped both as a regular and as a dependent entity type", ty),
                ));
            }
            let Some(def) = entity.defining_navigation() else {
                continue;
            };
            if !model.entity_types.contains_key(&def.defining_entity_type)
                && !dependent_names.contains(&def.defining_entity_type)
            {
                return Err(invalid(
                    &name,
                    format!("unknown defining entity type '{}'", def.defining_entity_type),
                ));
            }
            let siblings = model.defining.entry(ty).or_default();
            if siblings
                .iter()
                .any(|other| other.defining_navigation() == entity.defining_navigation())
            {
                return Err(invalid(&name, format!("duplicate dependent entity type '{}'", name)));
            }
            siblings.push(entity);
        }

        for indexer in self.indexers {
            model
                .indexers
                .insert(indexer.declaring_type.name().to_string(), indexer);
        }

        debug!(
            entity_types = model.entity_types.len(),
            dependent_types = model.defining.values().map(Vec::len).sum::<usize>(),
            annotations = model.annotations.len(),
            "built model"
        );
        Ok(model)
    }
}
