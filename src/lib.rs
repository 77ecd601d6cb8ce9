pub mod alphavantage;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod schema;
pub mod writer;

pub use error::{Result, TickerError};
