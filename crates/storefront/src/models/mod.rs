//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the private row types
//! the repositories read from SQLite.

pub mod address;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use address::{DeliveryAddress, NewAddress};
pub use order::{DeliveryDetails, Order, OrderItem};
pub use product::{NewProduct, Product, ProductUpdate};
pub use session::{AuthenticatedSession, Session};
pub use user::{NewUser, ProfileUpdate, User};
