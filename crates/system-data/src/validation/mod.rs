//! Insertion-time validation of components.
//!
//! Two checks run when a component is added to the registry, in order:
//! the field range check driven by [`ValidationDescriptors`], then the
//! component's own structural `Component::validate`.

mod descriptors;
mod validator;

pub use descriptors::{FieldDescriptor, RangeBound, TypeDescriptor, ValidRange, ValidationDescriptors};
pub use validator::FieldValidator;
