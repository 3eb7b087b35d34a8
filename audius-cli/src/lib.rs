pub mod client;
pub mod config;
pub mod delegation;
pub mod error;
pub mod events;
pub mod governance;
pub mod service_types;
pub mod sp;
pub mod staking;
pub mod token;
pub mod tx;
pub mod utils;
