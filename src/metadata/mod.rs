//! Read-only entity model and the introspection facade over it.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Model`] | Primitive lookups a model implementation provides |
//! | [`ModelExt`] | Facade used by consumers: runtime lookups, defaults, debug dumps |
//! | [`InMemoryModel`] / [`ModelBuilder`] | Validated, immutable model built in memory |
//! | [`EntityType`] | One mapped entity shape |
//!
//! ```rust
//! use cosmos_orm::metadata::{
//!     ChangeTrackingStrategy, EntityType, ModelBuilder, ModelExt, RuntimeType,
//! };
//!
//! let entity = RuntimeType::new("app::Entity");
//! let blog = RuntimeType::new("app::Blog").with_base_type(entity.clone());
//! let model = ModelBuilder::new()
//!     .entity_type(EntityType::new(entity.clone()))
//!     .build()?;
//!
//! assert!(model.find_entity_type(&blog).is_none());
//! assert_eq!(model.find_runtime_entity_type(&blog).map(|e| e.name()), Some("app::Entity"));
//! assert_eq!(model.change_tracking_strategy(), ChangeTrackingStrategy::Snapshot);
//! # Ok::<(), cosmos_orm::Error>(())
//! ```

pub mod entity_type;
pub mod extensions;
pub mod model;

pub use entity_type::{DefiningNavigation, EntityType, Property};
pub use extensions::ModelExt;
pub use model::{InMemoryModel, Model, ModelBuilder};

use std::collections::BTreeMap;
use std::fmt;
use std::ops::BitOr;

/// Names of the model-level annotations read by [`ModelExt`].
pub mod annotation_names {
    pub const CHANGE_TRACKING_STRATEGY: &str = "ChangeTrackingStrategy";
    pub const PROPERTY_ACCESS_MODE: &str = "PropertyAccessMode";
    pub const PRODUCT_VERSION: &str = "ProductVersion";
}

/// A runtime type, optionally derived from a single base type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuntimeType {
    name: String,
    base_type: Option<Box<RuntimeType>>,
}

impl RuntimeType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_type: None,
        }
    }

    /// The Rust type `T`, named by [`std::any::type_name`].
    pub fn of<T: ?Sized>() -> Self {
        Self::new(std::any::type_name::<T>())
    }

    pub fn with_base_type(mut self, base_type: RuntimeType) -> Self {
        self.base_type = Some(Box::new(base_type));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The immediate base type, if any.
    pub fn base_type(&self) -> Option<&RuntimeType> {
        self.base_type.as_deref()
    }

    /// Name without its module path: `app::model::Blog<app::Post>` → `Blog<app::Post>`.
    pub fn short_name(&self) -> &str {
        let generic_start = self.name.find('<').unwrap_or(self.name.len());
        let start = self.name[..generic_start]
            .rfind("::")
            .map_or(0, |idx| idx + 2);
        &self.name[start..]
    }
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodInfo {
    pub name: String,
    pub declaring_type: RuntimeType,
    pub is_static: bool,
    /// Set for accessors synthesized by the compiler rather than written by hand.
    pub is_special_name: bool,
}

impl MethodInfo {
    pub fn instance(declaring_type: RuntimeType, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declaring_type,
            is_static: false,
            is_special_name: false,
        }
    }

    pub fn associated(declaring_type: RuntimeType, name: impl Into<String>) -> Self {
        Self {
            is_static: true,
            ..Self::instance(declaring_type, name)
        }
    }

    pub fn special(mut self) -> Self {
        self.is_special_name = true;
        self
    }
}

/// Indexer registered for a type, reached through its `index`/`index_mut` accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerProperty {
    pub declaring_type: RuntimeType,
    pub getter: MethodInfo,
    pub setter: Option<MethodInfo>,
}

impl IndexerProperty {
    pub fn new(declaring_type: RuntimeType, getter: MethodInfo, setter: Option<MethodInfo>) -> Self {
        Self {
            declaring_type,
            getter,
            setter,
        }
    }

    /// Indexer backed by `Index::index` and `IndexMut::index_mut`.
    pub fn read_write(declaring_type: RuntimeType) -> Self {
        let getter = MethodInfo::instance(declaring_type.clone(), "index").special();
        let setter = MethodInfo::instance(declaring_type.clone(), "index_mut").special();
        Self::new(declaring_type, getter, Some(setter))
    }

    /// Indexer backed by `Index::index` only.
    pub fn read_only(declaring_type: RuntimeType) -> Self {
        let getter = MethodInfo::instance(declaring_type.clone(), "index").special();
        Self::new(declaring_type, getter, None)
    }

    pub fn is_accessor(&self, method: &MethodInfo) -> bool {
        self.getter == *method || self.setter.as_ref() == Some(method)
    }
}

/// How changes to entity instances are detected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ChangeTrackingStrategy {
    #[default]
    Snapshot,
    ChangedNotifications,
    ChangingAndChangedNotifications,
    ChangingAndChangedNotificationsWithOriginalValues,
}

impl fmt::Display for ChangeTrackingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Whether members are accessed through the backing field or the accessor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PropertyAccessMode {
    Field,
    FieldDuringConstruction,
    Property,
    #[default]
    PreferField,
    PreferFieldDuringConstruction,
    PreferProperty,
}

impl fmt::Display for PropertyAccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    Text(String),
    Integer(i64),
    Bool(bool),
    ChangeTrackingStrategy(ChangeTrackingStrategy),
    PropertyAccessMode(PropertyAccessMode),
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationValue::Text(s) => f.write_str(s),
            AnnotationValue::Integer(i) => write!(f, "{}", i),
            AnnotationValue::Bool(b) => write!(f, "{}", b),
            AnnotationValue::ChangeTrackingStrategy(s) => write!(f, "{}", s),
            AnnotationValue::PropertyAccessMode(m) => write!(f, "{}", m),
        }
    }
}

impl From<&str> for AnnotationValue {
    fn from(s: &str) -> Self {
        AnnotationValue::Text(s.to_string())
    }
}

impl From<String> for AnnotationValue {
    fn from(s: String) -> Self {
        AnnotationValue::Text(s)
    }
}

impl From<i64> for AnnotationValue {
    fn from(i: i64) -> Self {
        AnnotationValue::Integer(i)
    }
}

impl From<bool> for AnnotationValue {
    fn from(b: bool) -> Self {
        AnnotationValue::Bool(b)
    }
}

impl From<ChangeTrackingStrategy> for AnnotationValue {
    fn from(s: ChangeTrackingStrategy) -> Self {
        AnnotationValue::ChangeTrackingStrategy(s)
    }
}

impl From<PropertyAccessMode> for AnnotationValue {
    fn from(m: PropertyAccessMode) -> Self {
        AnnotationValue::PropertyAccessMode(m)
    }
}

/// Annotations keyed by name, kept in name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations(BTreeMap<String, AnnotationValue>);

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AnnotationValue> {
        self.0.get(name)
    }

    /// Returns the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AnnotationValue>) -> Option<AnnotationValue> {
        self.0.insert(name.into(), value.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnnotationValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Empty when there are no annotations; otherwise a leading newline, an
    /// `Annotations:` header and one indented line per annotation.
    pub fn to_debug_string(&self, indent: usize) -> String {
        if self.is_empty() {
            return String::new();
        }
        let pad = " ".repeat(indent);
        let mut out = format!("\n{}Annotations: ", pad);
        for (name, value) in self.iter() {
            out.push_str(&format!("\n{}  {}: {}", pad, name, value));
        }
        out
    }
}

/// Flags controlling `to_debug_string` output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DebugStringOptions(u32);

impl DebugStringOptions {
    pub const INCLUDE_ANNOTATIONS: Self = Self(1);
    pub const INCLUDE_PROPERTY_INDEXES: Self = Self(1 << 1);
    pub const SHORT_DEFAULT: Self = Self(0);
    pub const LONG_DEFAULT: Self = Self(Self::INCLUDE_ANNOTATIONS.0 | Self::INCLUDE_PROPERTY_INDEXES.0);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for DebugStringOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}
