//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Sign-in through Supabase and cookie sessions
//! - `users` - Customer profiles and saved addresses
//! - `products` - Catalogue reads and admin edits
//! - `orders` - Pricing, placement and the order lifecycle
//! - `sync` - Full export of orders to the spreadsheet
//!
//! External collaborators sit behind the traits in [`ports`]; the concrete
//! HTTP clients are in `supabase`, `telegram`, `sheets` and `cloudinary`.
//!
//! Every service is constructed once (see [`crate::state::AppState`]) and
//! cloned into handlers; none of them keep global state.

pub mod auth;
pub mod cloudinary;
pub mod orders;
pub mod ports;
pub mod products;
pub mod sheets;
pub mod supabase;
pub mod sync;
pub mod telegram;
pub mod users;
