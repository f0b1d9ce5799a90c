//! Pure data structures shared by the resolver, the merge engine and the cart.

pub mod cart;
pub mod locale;
pub mod product;
pub mod translation;

pub use cart::*;
pub use locale::*;
pub use product::*;
pub use translation::*;
