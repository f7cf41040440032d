//! Binding registries.
//!
//! A binding script claims declarations from parsed headers and registers
//! them here:
//! - Generics: structs instantiated per `/*<T>*/` annotation
//! - Classes: structs with their fields and functions
//! - Directors: hook tables overridable from Python
//! - Enums and `#define` constants
//!
//! Everything lands in one [`BindingContext`], consumed once by the emitter.

pub mod class;
pub mod context;
pub mod director;
pub mod enums;
pub mod errors;
pub mod func;
pub mod generic;
pub mod specialize;
pub mod typemap;

pub use class::{Class, ClassSpec, StalePolicy};
pub use context::{BindOptions, BindingContext, ClassHandle, GenericHandle};
pub use errors::BindError;
pub use func::{FuncOptions, GenericMarkers};
pub use generic::{GenericSpec, PointerPolicy};
pub use typemap::{Typemap, TypemapArg};
