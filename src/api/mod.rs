//! OKX API access: request signing, wire types, and the exchange client.

pub mod auth;
mod exchange;
mod okx_client;
mod types;

pub use auth::Credentials;
pub use exchange::Exchange;
pub use okx_client::{OkxClient, OKX_URL};
