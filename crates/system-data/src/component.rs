//! Component traits and type identifiers.
//!
//! A component is any user-defined record implementing the object-safe
//! [`Component`] trait. The sized [`ComponentType`] extension carries what
//! the registry needs at insertion time: a normalized type name and the
//! abstract [`Capability`] set of the type. The registry is keyed by
//! [`TypeKey`], built from the concrete type's `TypeId`.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::forecasts::Forecasts;

/// An abstract capability shared by several concrete component types,
/// e.g. "Generator" for thermal and renewable units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Capability(&'static str);

impl Capability {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Downcasting support for components stored behind `dyn Component`.
///
/// Implemented for every `'static` type. Call it on `&dyn Component`, not
/// on the `Box` holding it.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// JSON projection of a component, available on `dyn Component`.
pub trait JsonProjection {
    fn to_json_value(&self) -> serde_json::Result<serde_json::Value>;
}

impl<T: Serialize> JsonProjection for T {
    fn to_json_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// A uniquely named domain object stored in a [`ComponentRegistry`].
///
/// [`ComponentRegistry`]: crate::ComponentRegistry
pub trait Component: AsAny + JsonProjection + fmt::Debug {
    /// Name, unique among components of the same concrete type.
    fn name(&self) -> &str;

    /// Internal identifier; owner of the component's stored arrays.
    fn uuid(&self) -> Uuid;

    /// Forecast container, if this type supports forecasts.
    fn forecasts(&self) -> Option<&Forecasts> {
        None
    }

    fn forecasts_mut(&mut self) -> Option<&mut Forecasts> {
        None
    }

    /// Numeric field lookup used by range validation and forecast scaling.
    fn field_value(&self, _field: &str) -> Option<f64> {
        None
    }

    /// Structural validation run on insertion.
    fn validate(&self) -> bool {
        true
    }
}

/// Static type information for a concrete component type.
pub trait ComponentType: Component + Serialize + DeserializeOwned + Sized {
    /// Capabilities this type can be looked up by.
    const CAPABILITIES: &'static [Capability] = &[];

    /// Type name with any module path stripped.
    fn type_name() -> &'static str {
        normalize_type_name(std::any::type_name::<Self>())
    }
}

/// Strip the module path from a printable type name.
///
/// Generic arguments are kept as written: `a::b::Wrapper<c::D>` becomes
/// `Wrapper<c::D>`.
pub fn normalize_type_name(name: &str) -> &str {
    let base_end = name.find('<').unwrap_or(name.len());
    match name[..base_end].rfind("::") {
        Some(pos) => &name[pos + 2..],
        None => name,
    }
}

/// Identifier of a concrete component type.
///
/// Equality and hashing use the `TypeId`; the name is for messages and the
/// serialization projection.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ComponentType>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: T::type_name(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Which components a lookup addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentSelector {
    /// Exactly one concrete type.
    Concrete(TypeKey),
    /// Every concrete type declaring the capability.
    Capability(Capability),
}

impl ComponentSelector {
    pub fn of<T: ComponentType>() -> Self {
        Self::Concrete(TypeKey::of::<T>())
    }

    pub fn capability(capability: Capability) -> Self {
        Self::Capability(capability)
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self, Self::Concrete(_))
    }
}

impl fmt::Display for ComponentSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concrete(key) => write!(f, "{}", key),
            Self::Capability(capability) => write!(f, "capability {}", capability),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize)]
    struct Line {
        name: String,
        uuid: Uuid,
    }

    impl Component for Line {
        fn name(&self) -> &str {
            &self.name
        }

        fn uuid(&self) -> Uuid {
            self.uuid
        }
    }

    impl ComponentType for Line {}

    #[test]
    fn test_normalize_type_name() {
        assert_eq!(normalize_type_name("crate::models::Line"), "Line");
        assert_eq!(normalize_type_name("Line"), "Line");
        assert_eq!(
            normalize_type_name("a::b::Wrapper<c::Inner>"),
            "Wrapper<c::Inner>"
        );
    }

    #[test]
    fn test_type_key() {
        let key = TypeKey::of::<Line>();
        assert_eq!(key.name(), "Line");
        assert_eq!(key, TypeKey::of::<Line>());
        assert_eq!(key.id(), TypeId::of::<Line>());
    }

    #[test]
    fn test_downcast_through_dyn() {
        let line = Line {
            name: "l1".to_string(),
            uuid: Uuid::new_v4(),
        };
        let boxed: Box<dyn Component> = Box::new(line);
        let component: &dyn Component = boxed.as_ref();
        assert_eq!(component.as_any().downcast_ref::<Line>().map(|l| l.name.as_str()), Some("l1"));
        assert!(component.forecasts().is_none());
        assert!(component.validate());
    }

    #[test]
    fn test_selector() {
        assert!(ComponentSelector::of::<Line>().is_concrete());
        let selector = ComponentSelector::capability(Capability::new("Branch"));
        assert!(!selector.is_concrete());
        assert_eq!(selector.to_string(), "capability Branch");
    }
}
