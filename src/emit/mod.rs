//! Interface emission.
//!
//! - [`declarator`]: C declarator reconstruction
//! - [`swig`]: the SWIG transcript
//! - [`writer`]: indented line output

pub mod declarator;
pub mod swig;
pub mod writer;

pub use declarator::Declarator;
pub use swig::render;
pub use writer::Writer;
