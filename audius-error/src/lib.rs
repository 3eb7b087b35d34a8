pub mod error;

pub use error::{AudiusError, Result};
pub use ethers;

use audius_signer::AudiusWallet;
use ethers::{
    middleware::{signer::SignerMiddlewareError, SignerMiddleware},
    providers::{Http, Provider, Ws},
};

/// Read-only JSON-RPC client used for contract calls and historic log queries.
pub type AudiusProvider = Provider<Http>;
/// Signing client used for every transaction.
pub type AudiusSignerProvider = SignerMiddleware<Provider<Http>, AudiusWallet>;
pub type AudiusSignerProviderError = SignerMiddlewareError<Provider<Http>, AudiusWallet>;
/// Pubsub client used for live event subscriptions.
pub type AudiusWsProvider = Provider<Ws>;
