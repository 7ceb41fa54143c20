pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod models;
pub mod policy;
pub mod services;
pub mod session;
pub mod store;
pub mod validation;

pub use error::{MarketError, MarketResult};
pub use services::MarketContext;
