//! Solidity ABI shapes of the delegation framework.

use alloy::sol;
use alloy::sol_types::SolValue;

use crate::domain::{Caveat, Delegation};
use crate::ports::PortError;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct AbiCaveat {
        address enforcer;
        bytes terms;
        bytes args;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct AbiDelegation {
        address delegate;
        address delegator;
        bytes32 authority;
        AbiCaveat[] caveats;
        uint256 salt;
        bytes signature;
    }

    /// ERC-7579 execution, batch call type.
    #[derive(Debug, PartialEq, Eq)]
    struct AbiExecution {
        address target;
        uint256 value;
        bytes callData;
    }

    interface IDelegationManager {
        function redeemDelegations(
            bytes[] calldata _permissionContexts,
            bytes32[] calldata _modes,
            bytes[] calldata _executionCallDatas
        ) external;
        function disableDelegation(AbiDelegation calldata _delegation) external;
        function enableDelegation(AbiDelegation calldata _delegation) external;
    }

    interface IERC20 {
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

impl From<&Delegation> for AbiDelegation {
    fn from(d: &Delegation) -> Self {
        Self {
            delegate: d.delegate,
            delegator: d.delegator,
            authority: d.authority,
            caveats: d
                .caveats
                .iter()
                .map(|c| AbiCaveat {
                    enforcer: c.enforcer,
                    terms: c.terms.clone(),
                    args: c.args.clone(),
                })
                .collect(),
            salt: d.salt,
            signature: d.signature.clone(),
        }
    }
}

impl From<AbiDelegation> for Delegation {
    fn from(d: AbiDelegation) -> Self {
        Self {
            delegate: d.delegate,
            delegator: d.delegator,
            authority: d.authority,
            caveats: d
                .caveats
                .into_iter()
                .map(|c| Caveat {
                    enforcer: c.enforcer,
                    terms: c.terms,
                    args: c.args,
                })
                .collect(),
            salt: d.salt,
            signature: d.signature,
        }
    }
}

/// `abi.encode(Delegation[])` with the links in the given order.
pub fn encode_delegations(links: &[Delegation]) -> Vec<u8> {
    let abi: Vec<AbiDelegation> = links.iter().map(AbiDelegation::from).collect();
    abi.abi_encode()
}

pub fn decode_delegations(data: &[u8]) -> Result<Vec<Delegation>, PortError> {
    let abi = <Vec<AbiDelegation>>::abi_decode(data, true)
        .map_err(|e| PortError::Validation(format!("invalid permission context: {e}")))?;
    Ok(abi.into_iter().map(Delegation::from).collect())
}
