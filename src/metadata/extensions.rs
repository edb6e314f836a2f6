//! Read-only queries layered over the [`Model`] primitives.

use super::{
    annotation_names, AnnotationValue, ChangeTrackingStrategy, DebugStringOptions, EntityType,
    MethodInfo, Model, PropertyAccessMode, RuntimeType,
};

/// Query facade available on every [`Model`].
pub trait ModelExt: Model {
    /// Entity type mapped to exactly `ty`.
    ///
    /// Returns `None` when `ty` backs shared-type entities or only appears
    /// under a defining navigation.
    fn find_entity_type(&self, ty: &RuntimeType) -> Option<&EntityType> {
        if self.is_shared_type(ty) {
            return None;
        }
        self.find_entity_type_for(ty)
            .filter(|entity| !entity.is_shared_type() && !entity.has_defining_navigation())
    }

    /// Like [`find_entity_type`](Self::find_entity_type), falling back once to
    /// the immediate base type of `ty` (proxies derive from the mapped type).
    fn find_runtime_entity_type(&self, ty: &RuntimeType) -> Option<&EntityType> {
        self.find_entity_type(ty)
            .or_else(|| ty.base_type().and_then(|base| self.find_entity_type(base)))
    }

    fn find_entity_type_with_defining_navigation(
        &self,
        ty: &RuntimeType,
        navigation: &str,
        defining_entity_type: &EntityType,
    ) -> Option<&EntityType> {
        self.find_dependent_entity_type(ty, navigation, defining_entity_type)
    }

    fn entity_types_of_type(&self, ty: &RuntimeType) -> Vec<&EntityType> {
        self.entity_types_with_type(ty)
    }

    fn entity_types_named(&self, name: &str) -> Vec<&EntityType> {
        self.entity_types_with_name(name)
    }

    fn has_entity_type_with_defining_navigation(&self, ty: &RuntimeType) -> bool {
        self.entity_types_with_type(ty)
            .iter()
            .any(|entity| entity.has_defining_navigation())
    }

    fn has_entity_type_with_defining_navigation_named(&self, name: &str) -> bool {
        self.entity_types_with_name(name)
            .iter()
            .any(|entity| entity.has_defining_navigation())
    }

    fn is_shared(&self, ty: &RuntimeType) -> bool {
        self.is_shared_type(ty)
    }

    fn change_tracking_strategy(&self) -> ChangeTrackingStrategy {
        match self.annotation(annotation_names::CHANGE_TRACKING_STRATEGY) {
            Some(AnnotationValue::ChangeTrackingStrategy(strategy)) => *strategy,
            _ => ChangeTrackingStrategy::default(),
        }
    }

    fn property_access_mode(&self) -> PropertyAccessMode {
        match self.annotation(annotation_names::PROPERTY_ACCESS_MODE) {
            Some(AnnotationValue::PropertyAccessMode(mode)) => *mode,
            _ => PropertyAccessMode::default(),
        }
    }

    /// Version of the library that built the model, when recorded.
    fn product_version(&self) -> Option<&str> {
        match self.annotation(annotation_names::PRODUCT_VERSION) {
            Some(AnnotationValue::Text(version)) => Some(version),
            _ => None,
        }
    }

    /// Whether `method` is an accessor of the indexer registered for its declaring type.
    fn is_indexer_method(&self, method: &MethodInfo) -> bool {
        !method.is_static
            && method.is_special_name
            && self
                .find_indexer_property(&method.declaring_type)
                .is_some_and(|indexer| indexer.is_accessor(method))
    }

    /// Human-readable dump of the model. The format is meant for debugging and
    /// is not stable.
    fn to_debug_string(&self, options: DebugStringOptions, indent: usize) -> String {
        let pad = " ".repeat(indent);
        let mut out = format!("{}Model: ", pad);

        let access_mode = self.property_access_mode();
        if access_mode != PropertyAccessMode::PreferField {
            out.push_str(&format!(" PropertyAccessMode.{}", access_mode));
        }
        let tracking = self.change_tracking_strategy();
        if tracking != ChangeTrackingStrategy::Snapshot {
            out.push_str(&format!(" ChangeTrackingStrategy.{}", tracking));
        }

        for entity in self.entity_types() {
            out.push('\n');
            out.push_str(&entity.to_debug_string(options, indent + 2));
        }

        if options.contains(DebugStringOptions::INCLUDE_ANNOTATIONS) {
            out.push_str(&self.annotations().to_debug_string(indent));
        }
        out
    }
}

impl<M: Model + ?Sized> ModelExt for M {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{IndexerProperty, InMemoryModel, ModelBuilder, Property};

    fn empty() -> InMemoryModel {
        ModelBuilder::new().build().unwrap()
    }

    #[test]
    fn defaults_apply_without_annotations() {
        let model = empty();
        assert_eq!(model.change_tracking_strategy(), ChangeTrackingStrategy::Snapshot);
        assert_eq!(model.property_access_mode(), PropertyAccessMode::PreferField);
        assert_eq!(model.product_version(), None);
        assert_eq!(model.to_debug_string(DebugStringOptions::LONG_DEFAULT, 0), "Model: ");
    }

    #[test]
    fn mistyped_annotation_falls_back_to_default() {
        let model = ModelBuilder::new()
            .annotation(annotation_names::CHANGE_TRACKING_STRATEGY, "ChangedNotifications")
            .build()
            .unwrap();
        assert_eq!(model.change_tracking_strategy(), ChangeTrackingStrategy::Snapshot);
    }

    #[test]
    fn facade_works_through_trait_objects() {
        let model: Box<dyn Model> = Box::new(
            ModelBuilder::new()
                .entity_type(EntityType::new(RuntimeType::new("app::Blog")))
                .build()
                .unwrap(),
        );
        assert!(model.find_entity_type(&RuntimeType::new("app::Blog")).is_some());
        assert!(!model.is_shared(&RuntimeType::new("app::Blog")));
    }

    #[test]
    fn indexer_method_requires_instance_special_accessor() {
        let bag = RuntimeType::new("app::PropertyBag");
        let model = ModelBuilder::new()
            .indexer_property(IndexerProperty::read_write(bag.clone()))
            .build()
            .unwrap();

        assert!(model.is_indexer_method(&MethodInfo::instance(bag.clone(), "index").special()));
        assert!(model.is_indexer_method(&MethodInfo::instance(bag.clone(), "index_mut").special()));
        assert!(!model.is_indexer_method(&MethodInfo::associated(bag.clone(), "index").special()));
        assert!(!model.is_indexer_method(&MethodInfo::instance(bag.clone(), "get").special()));
        assert!(!model.is_indexer_method(
            &MethodInfo::instance(RuntimeType::new("app::Other"), "index").special()
        ));
    }

    #[test]
    fn debug_string_lists_non_default_globals_and_entities() {
        let model = ModelBuilder::new()
            .property_access_mode(PropertyAccessMode::Field)
            .change_tracking_strategy(ChangeTrackingStrategy::ChangedNotifications)
            .product_version("0.1.0")
            .entity_type(
                EntityType::new(RuntimeType::new("app::Blog")).with_property(Property::new("id", "u64")),
            )
            .build()
            .unwrap();

        assert_eq!(
            model.to_debug_string(DebugStringOptions::SHORT_DEFAULT, 0),
            "Model:  PropertyAccessMode.Field ChangeTrackingStrategy.ChangedNotifications\n  \
             EntityType: app::Blog\n    Properties: \n      id (u64) Required"
        );

        let long = model.to_debug_string(DebugStringOptions::INCLUDE_ANNOTATIONS, 0);
        assert!(long.ends_with(
            "\nAnnotations: \n  ChangeTrackingStrategy: ChangedNotifications\
             \n  ProductVersion: 0.1.0\n  PropertyAccessMode: Field"
        ));
    }
}
