pub mod config;
pub mod crypto;
pub mod manager;
pub mod runtime;
pub mod share;
pub mod signer;
pub mod store;

pub use config::{ConfigError, DelegationConfig};
pub use manager::{erc20_transfer, native_transfer, ManagerAbiAdapter};
pub use runtime::{random_salt, OsSaltAdapter, SystemClockAdapter};
pub use share::{decode_share_payload, encode_share_payload};
pub use signer::{recover_signer, DisabledSigner, LocalSignerAdapter};
pub use store::StoreAdapter;
