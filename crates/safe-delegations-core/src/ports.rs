use alloy::primitives::{Address, Bytes, B256, U256};
use thiserror::Error;

use crate::caveats::TermsError;
use crate::domain::{Delegation, DelegationBundle, DelegationStatus, MergeResult, StoredDelegation};

#[derive(Debug, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid caveat terms: {0}")]
    Terms(#[from] TermsError),
}

/// One ERC-7579 execution performed on redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub target: Address,
    pub value: U256,
    pub call_data: Bytes,
}

/// Repository of locally tracked delegations, keyed by delegation hash.
pub trait DelegationStorePort {
    fn save(&self, record: &StoredDelegation) -> Result<(), PortError>;
    fn get(&self, delegation_hash: B256) -> Result<Option<StoredDelegation>, PortError>;
    fn list(&self) -> Result<Vec<StoredDelegation>, PortError>;
    fn remove(&self, delegation_hash: B256) -> Result<bool, PortError>;
    fn update_status(
        &self,
        delegation_hash: B256,
        status: DelegationStatus,
        updated_at_ms: u64,
    ) -> Result<StoredDelegation, PortError>;
    fn export_bundle(&self, hashes: &[B256], exported_at_ms: u64)
        -> Result<DelegationBundle, PortError>;
    fn import_bundle(&self, bundle: &DelegationBundle) -> Result<MergeResult, PortError>;
}

pub trait ClockPort {
    fn now_ms(&self) -> Result<u64, PortError>;
}

pub trait SaltPort {
    fn next_salt(&self) -> Result<U256, PortError>;
}

pub trait SignerPort {
    fn address(&self) -> Result<Address, PortError>;
    fn sign_digest(&self, digest: B256) -> Result<Bytes, PortError>;
}

pub trait ManagerAbiPort {
    /// Calldata for `redeemDelegations` with one entry per chain.
    fn redeem_calldata(
        &self,
        chains: &[Vec<Delegation>],
        executions: &[Vec<Execution>],
    ) -> Result<Bytes, PortError>;
    fn disable_calldata(&self, delegation: &Delegation) -> Result<Bytes, PortError>;
    fn enable_calldata(&self, delegation: &Delegation) -> Result<Bytes, PortError>;
}
