pub mod clock;
pub mod config;
pub mod credential;
pub mod insights;
pub mod iot_client;
pub mod logger;
pub mod tool_executor;
pub mod transport;
pub mod validation;
