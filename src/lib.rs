pub mod adapter;
pub mod arena;
pub mod bridge;
pub mod channel;
pub mod config;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod guest;
pub mod protocol;
pub mod services;
