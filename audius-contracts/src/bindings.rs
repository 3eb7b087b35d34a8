//! Generated bindings for every Audius contract deployed on Ethereum. The ABI files under `abi/`
//! are the published contract ABIs; nothing in this module is written by hand.
//!
//! Each binding is generic over the middleware, so the same type serves read-only calls over
//! HTTP, signed transactions through a `SignerMiddleware` and live event subscriptions over a
//! websocket provider.

pub mod audius_token {
    ethers::contract::abigen!(
        AudiusTokenAbi,
        "abi/AudiusToken.json",
        event_derives(serde::Deserialize, serde::Serialize),
        methods {
            DOMAIN_SEPARATOR() as domain_separator;
            PERMIT_TYPEHASH() as permit_typehash;
        }
    );
}

pub mod claims_manager {
    ethers::contract::abigen!(
        ClaimsManagerAbi,
        "abi/ClaimsManager.json",
        event_derives(serde::Deserialize, serde::Serialize),
        methods {
            initialize() as initialize;
            initialize(address,address) as initialize_with_addresses;
        }
    );
}

pub mod delegate_manager {
    ethers::contract::abigen!(
        DelegateManagerAbi,
        "abi/DelegateManager.json",
        event_derives(serde::Deserialize, serde::Serialize),
        methods {
            getSPMinDelegationAmount(address) as get_sp_min_delegation_amount;
            updateSPMinDelegationAmount(address,uint256) as update_sp_min_delegation_amount;
        }
    );
}

pub mod entity_manager {
    ethers::contract::abigen!(
        EntityManagerAbi,
        "abi/EntityManager.json",
        event_derives(serde::Deserialize, serde::Serialize)
    );
}

pub mod eth_rewards_manager {
    ethers::contract::abigen!(EthRewardsManagerAbi, "abi/EthRewardsManager.json");
}

pub mod governance {
    ethers::contract::abigen!(
        GovernanceAbi,
        "abi/Governance.json",
        event_derives(serde::Deserialize, serde::Serialize)
    );
}

pub mod registry {
    ethers::contract::abigen!(
        RegistryAbi,
        "abi/Registry.json",
        event_derives(serde::Deserialize, serde::Serialize),
        methods {
            getContract(bytes32) as get_contract;
            getContract(bytes32,uint256) as get_contract_version;
        }
    );
}

pub mod service_provider_factory {
    ethers::contract::abigen!(
        ServiceProviderFactoryAbi,
        "abi/ServiceProviderFactory.json",
        event_derives(serde::Deserialize, serde::Serialize)
    );
}

pub mod service_type_manager {
    ethers::contract::abigen!(
        ServiceTypeManagerAbi,
        "abi/ServiceTypeManager.json",
        event_derives(serde::Deserialize, serde::Serialize)
    );
}

pub mod staking {
    ethers::contract::abigen!(
        StakingAbi,
        "abi/Staking.json",
        event_derives(serde::Deserialize, serde::Serialize)
    );
}

pub use audius_token::{AudiusTokenAbi, AudiusTokenAbiEvents};
pub use claims_manager::{ClaimsManagerAbi, ClaimsManagerAbiEvents};
pub use delegate_manager::{DelegateManagerAbi, DelegateManagerAbiEvents};
pub use entity_manager::{EntityManagerAbi, EntityManagerAbiEvents};
pub use eth_rewards_manager::EthRewardsManagerAbi;
pub use governance::{GovernanceAbi, GovernanceAbiEvents};
pub use registry::{RegistryAbi, RegistryAbiEvents};
pub use service_provider_factory::{ServiceProviderFactoryAbi, ServiceProviderFactoryAbiEvents};
pub use service_type_manager::{ServiceTypeManagerAbi, ServiceTypeManagerAbiEvents};
pub use staking::{StakingAbi, StakingAbiEvents};
