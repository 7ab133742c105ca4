use alloy::primitives::{address, b256, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::caveats::EnforcerAddressBook;

/// Authority value marking a delegation as the root of its chain.
pub const ROOT_AUTHORITY: B256 =
    b256!("ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff");

/// Delegate value that lets any address redeem the delegation.
pub const ANY_DELEGATE: Address = address!("0000000000000000000000000000000000000a11");

pub const STORE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimestampMs(pub u64);

impl TimestampMs {
    pub fn as_secs(self) -> u64 {
        self.0 / 1000
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caveat {
    pub enforcer: Address,
    pub terms: Bytes,
    /// Redemption-time arguments. Not covered by the delegation hash.
    #[serde(default)]
    pub args: Bytes,
}

impl Caveat {
    pub fn new(enforcer: Address, terms: impl Into<Bytes>) -> Self {
        Self {
            enforcer,
            terms: terms.into(),
            args: Bytes::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delegation {
    pub delegate: Address,
    pub delegator: Address,
    pub authority: B256,
    pub caveats: Vec<Caveat>,
    pub salt: U256,
    #[serde(default)]
    pub signature: Bytes,
}

impl Delegation {
    pub fn is_root(&self) -> bool {
        self.authority == ROOT_AUTHORITY
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }

    pub fn is_open(&self) -> bool {
        self.delegate == ANY_DELEGATE
    }

    pub fn with_signature(mut self, signature: impl Into<Bytes>) -> Self {
        self.signature = signature.into();
        self
    }
}

/// Chain-specific contract addresses the delegation framework is deployed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub chain_id: u64,
    pub delegation_manager: Address,
    pub enforcers: EnforcerAddressBook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DelegationStatus {
    Pending,
    Signed,
    Revoked,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScopeType {
    SpendingLimit,
    TransferIntent,
    SwapIntent,
    /// Executor link of a swap redelegation chain.
    SwapExecution,
}

impl ScopeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SpendingLimit => "spendingLimit",
            Self::TransferIntent => "transferIntent",
            Self::SwapIntent => "swapIntent",
            Self::SwapExecution => "swapExecution",
        }
    }
}

/// Human-readable amount shown next to a stored delegation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayAmount {
    pub role: String,
    /// `None` for the chain's native token.
    pub token: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub decimals: u8,
    pub base_units: U256,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDelegation {
    pub schema_version: u32,
    pub id: String,
    pub label: String,
    pub scope_type: ScopeType,
    pub chain_id: u64,
    pub status: DelegationStatus,
    pub delegation: Delegation,
    pub delegation_hash: B256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_hash: Option<B256>,
    #[serde(default)]
    pub amounts: Vec<DisplayAmount>,
    #[serde(rename = "createdAt")]
    pub created_at_ms: TimestampMs,
    #[serde(rename = "updatedAt")]
    pub updated_at_ms: TimestampMs,
}

/// Export file. Older exports are a bare `StoredDelegation` array; see
/// `DelegationBundle::from_json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationBundle {
    pub schema_version: u32,
    pub exported_at_ms: TimestampMs,
    pub delegations: Vec<StoredDelegation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity_mac: Option<B256>,
}

impl DelegationBundle {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        if value.is_array() {
            let delegations: Vec<StoredDelegation> = serde_json::from_value(value)?;
            return Ok(Self {
                schema_version: STORE_SCHEMA_VERSION,
                exported_at_ms: TimestampMs(0),
                delegations,
                integrity_mac: None,
            });
        }
        serde_json::from_value(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
    pub conflicted: usize,
}

impl MergeResult {
    pub fn empty() -> Self {
        Self::default()
    }
}
