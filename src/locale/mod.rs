//! # Locale Resolver
//!
//! Maps a product identifier and a locale to a render-ready [`ProductView`], and a
//! product to its siblings in other locales.
//!
//! [`ProductView`]: crate::model::ProductView

pub mod error;
pub mod resolver;
pub mod slug;

pub use error::*;
pub use resolver::*;
pub use slug::*;
