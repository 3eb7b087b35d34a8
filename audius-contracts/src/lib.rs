pub mod bindings;
pub mod claims_manager;
pub mod contracts;
pub mod delegate_manager;
pub mod entity_manager;
pub mod events;
pub mod governance;
pub mod key;
pub mod network;
pub mod registry;
pub mod rewards_manager;
pub mod service_provider_factory;
pub mod service_type;
pub mod service_type_manager;
pub mod staking;
pub mod token;
pub mod tx;

pub use contracts::{AudiusContracts, ContractAddresses};
pub use events::{AudiusEvent, EventSource, StreamEvent, WatchTarget};
pub use key::ContractKey;
pub use network::Network;
pub use service_type::ServiceType;

pub use ethers;
