use super::{AnnotationValue, Annotations, DebugStringOptions, RuntimeType};

/// Scalar property of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub type_name: String,
    pub nullable: bool,
}

impl Property {
    /// A required (non-nullable) property.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Navigation on a defining entity type under which a dependent type is mapped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DefiningNavigation {
    pub navigation: String,
    pub defining_entity_type: String,
}

/// One mapped entity shape.
///
/// Three kinds exist: regular types (name taken from the runtime type), shared
/// types (several entity types with their own names over one runtime type) and
/// dependent types that only exist under a defining navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityType {
    name: String,
    runtime_type: RuntimeType,
    shared: bool,
    defining_navigation: Option<DefiningNavigation>,
    properties: Vec<Property>,
    annotations: Annotations,
}

impl EntityType {
    pub fn new(runtime_type: RuntimeType) -> Self {
        Self {
            name: runtime_type.name().to_string(),
            runtime_type,
            shared: false,
            defining_navigation: None,
            properties: Vec::new(),
            annotations: Annotations::new(),
        }
    }

    /// Shared-type entity: `name` is independent of the runtime type.
    pub fn shared(name: impl Into<String>, runtime_type: RuntimeType) -> Self {
        Self {
            name: name.into(),
            shared: true,
            ..Self::new(runtime_type)
        }
    }

    /// Dependent type mapped under `navigation` of the entity type named `defining_entity_type`.
    pub fn owned(
        runtime_type: RuntimeType,
        navigation: impl Into<String>,
        defining_entity_type: impl Into<String>,
    ) -> Self {
        Self {
            defining_navigation: Some(DefiningNavigation {
                navigation: navigation.into(),
                defining_entity_type: defining_entity_type.into(),
            }),
            ..Self::new(runtime_type)
        }
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_annotation(mut self, name: impl Into<String>, value: impl Into<AnnotationValue>) -> Self {
        self.annotations.set(name, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn runtime_type(&self) -> &RuntimeType {
        &self.runtime_type
    }

    pub fn is_shared_type(&self) -> bool {
        self.shared
    }

    pub fn defining_navigation(&self) -> Option<&DefiningNavigation> {
        self.defining_navigation.as_ref()
    }

    pub fn has_defining_navigation(&self) -> bool {
        self.defining_navigation.is_some()
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// `Definer.Navigation#Short` for dependent types, the name otherwise.
    pub fn display_name(&self) -> String {
        match &self.defining_navigation {
            Some(def) => format!(
                "{}.{}#{}",
                def.defining_entity_type,
                def.navigation,
                self.runtime_type.short_name()
            ),
            None => self.name.clone(),
        }
    }

    pub fn to_debug_string(&self, options: DebugStringOptions, indent: usize) -> String {
        let pad = " ".repeat(indent);
        let mut out = format!("{}EntityType: {}", pad, self.display_name());
        if self.shared {
            out.push_str(&format!(" CLR Type: {}", self.runtime_type.short_name()));
        }

        if !self.properties.is_empty() {
            out.push_str(&format!("\n{}  Properties: ", pad));
            for (index, property) in self.properties.iter().enumerate() {
                out.push_str(&format!("\n{}    {} ({})", pad, property.name, property.type_name));
                if !property.nullable {
                    out.push_str(" Required");
                }
                if options.contains(DebugStringOptions::INCLUDE_PROPERTY_INDEXES) {
                    out.push_str(&format!(" Index: {}", index));
                }
            }
        }

        if options.contains(DebugStringOptions::INCLUDE_ANNOTATIONS) {
            out.push_str(&self.annotations.to_debug_string(indent + 2));
        }
        out
    }
}
