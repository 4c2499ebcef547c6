//! Data types for forms, sheets and cells.

mod cell;
mod form;
mod keys;
mod selection;

pub use cell::*;
pub use form::*;
pub use keys::*;
pub use selection::*;
