//! Model backend adapters.

pub mod gateway;

pub use gateway::GatewayProvider;
