//! EIP-712 hashing for delegations.
//!
//! `delegation_hash` matches the manager's `getDelegationHash`: the struct hash
//! over delegate, delegator, authority, caveats (enforcer and terms only) and
//! salt. The signature and caveat args never enter the hash. The value is
//! computed offline and is only advisory; the verifier's hash is authoritative.

use std::borrow::Cow;

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::sol_types::{Eip712Domain, SolStruct};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::Delegation;

pub const DOMAIN_NAME: &str = "DelegationManager";
pub const DOMAIN_VERSION: &str = "1";

pub const DELEGATION_TYPE: &str = "Delegation(address delegate,address delegator,bytes32 authority,Caveat[] caveats,uint256 salt)Caveat(address enforcer,bytes terms)";
pub const CAVEAT_TYPE: &str = "Caveat(address enforcer,bytes terms)";

mod typed {
    use alloy::sol;

    sol! {
        struct Caveat {
            address enforcer;
            bytes terms;
        }

        struct Delegation {
            address delegate;
            address delegator;
            bytes32 authority;
            Caveat[] caveats;
            uint256 salt;
        }
    }
}

impl From<&Delegation> for typed::Delegation {
    fn from(d: &Delegation) -> Self {
        Self {
            delegate: d.delegate,
            delegator: d.delegator,
            authority: d.authority,
            caveats: d
                .caveats
                .iter()
                .map(|c| typed::Caveat {
                    enforcer: c.enforcer,
                    terms: c.terms.clone(),
                })
                .collect(),
            salt: d.salt,
        }
    }
}

pub fn delegation_typehash() -> B256 {
    keccak256(DELEGATION_TYPE.as_bytes())
}

pub fn caveat_typehash() -> B256 {
    keccak256(CAVEAT_TYPE.as_bytes())
}

pub fn eip712_domain(chain_id: u64, delegation_manager: Address) -> Eip712Domain {
    Eip712Domain::new(
        Some(Cow::Borrowed(DOMAIN_NAME)),
        Some(Cow::Borrowed(DOMAIN_VERSION)),
        Some(U256::from(chain_id)),
        Some(delegation_manager),
        None,
    )
}

pub fn domain_separator(chain_id: u64, delegation_manager: Address) -> B256 {
    eip712_domain(chain_id, delegation_manager).separator()
}

pub fn delegation_hash(delegation: &Delegation) -> B256 {
    typed::Delegation::from(delegation).eip712_hash_struct()
}

/// Digest the delegator signs: `keccak256(0x1901 ‖ domainSeparator ‖ hashStruct)`.
pub fn signing_digest(delegation: &Delegation, chain_id: u64, delegation_manager: Address) -> B256 {
    typed::Delegation::from(delegation)
        .eip712_signing_hash(&eip712_domain(chain_id, delegation_manager))
}

/// `eth_signTypedData_v4` request body for a delegation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataPayload {
    pub types: Value,
    pub primary_type: String,
    pub domain: Value,
    pub message: Value,
}

pub fn typed_data(
    delegation: &Delegation,
    chain_id: u64,
    delegation_manager: Address,
) -> TypedDataPayload {
    let caveats: Vec<Value> = delegation
        .caveats
        .iter()
        .map(|c| json!({ "enforcer": c.enforcer, "terms": c.terms }))
        .collect();
    TypedDataPayload {
        types: json!({
            "EIP712Domain": [
                { "name": "name", "type": "string" },
                { "name": "version", "type": "string" },
                { "name": "chainId", "type": "uint256" },
                { "name": "verifyingContract", "type": "address" },
            ],
            "Delegation": [
                { "name": "delegate", "type": "address" },
                { "name": "delegator", "type": "address" },
                { "name": "authority", "type": "bytes32" },
                { "name": "caveats", "type": "Caveat[]" },
                { "name": "salt", "type": "uint256" },
            ],
            "Caveat": [
                { "name": "enforcer", "type": "address" },
                { "name": "terms", "type": "bytes" },
            ],
        }),
        primary_type: "Delegation".to_owned(),
        domain: json!({
            "name": DOMAIN_NAME,
            "version": DOMAIN_VERSION,
            "chainId": chain_id,
            "verifyingContract": delegation_manager,
        }),
        message: json!({
            "delegate": delegation.delegate,
            "delegator": delegation.delegator,
            "authority": delegation.authority,
            "caveats": caveats,
            "salt": delegation.salt.to_string(),
        }),
    }
}
