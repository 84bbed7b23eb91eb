pub mod circuit_breaker;
pub mod ml_client;
