//! Calldata for the delegation manager and ERC-7579 execution payloads.

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::{SolCall, SolValue};

use safe_delegations_core::abi::{encode_delegations, AbiDelegation, AbiExecution, IDelegationManager, IERC20};
use safe_delegations_core::{Delegation, Execution, ManagerAbiPort, PortError};

/// Mode word for a single call with default exec type.
pub const MODE_SINGLE_DEFAULT: B256 = B256::ZERO;

/// Mode word for a batch call with default exec type.
pub const MODE_BATCH_DEFAULT: B256 = {
    let mut raw = [0u8; 32];
    raw[0] = 0x01;
    B256::new(raw)
};

#[derive(Debug, Clone, Default)]
pub struct ManagerAbiAdapter;

/// Returns the mode word and execution calldata for one redemption.
pub fn encode_executions(executions: &[Execution]) -> Result<(B256, Bytes), PortError> {
    match executions {
        [] => Err(PortError::Validation("no executions to redeem".to_owned())),
        [single] => {
            let mut out = Vec::with_capacity(20 + 32 + single.call_data.len());
            out.extend_from_slice(single.target.as_slice());
            out.extend_from_slice(&single.value.to_be_bytes::<32>());
            out.extend_from_slice(&single.call_data);
            Ok((MODE_SINGLE_DEFAULT, Bytes::from(out)))
        }
        many => {
            let batch: Vec<AbiExecution> = many
                .iter()
                .map(|e| AbiExecution {
                    target: e.target,
                    value: e.value,
                    callData: e.call_data.clone(),
                })
                .collect();
            Ok((MODE_BATCH_DEFAULT, Bytes::from(batch.abi_encode())))
        }
    }
}

pub fn erc20_transfer(token: Address, to: Address, amount: U256) -> Execution {
    Execution {
        target: token,
        value: U256::ZERO,
        call_data: Bytes::from(IERC20::transferCall { to, amount }.abi_encode()),
    }
}

pub fn native_transfer(to: Address, value: U256) -> Execution {
    Execution {
        target: to,
        value,
        call_data: Bytes::new(),
    }
}

impl ManagerAbiPort for ManagerAbiAdapter {
    fn redeem_calldata(
        &self,
        chains: &[Vec<Delegation>],
        executions: &[Vec<Execution>],
    ) -> Result<Bytes, PortError> {
        if chains.is_empty() {
            return Err(PortError::Validation("nothing to redeem".to_owned()));
        }
        if chains.len() != executions.len() {
            return Err(PortError::Validation(format!(
                "{} permission contexts but {} execution sets",
                chains.len(),
                executions.len()
            )));
        }

        let mut contexts = Vec::with_capacity(chains.len());
        let mut modes = Vec::with_capacity(chains.len());
        let mut calldatas = Vec::with_capacity(chains.len());
        for (links, execs) in chains.iter().zip(executions) {
            if links.is_empty() {
                return Err(PortError::Validation("empty delegation chain".to_owned()));
            }
            if let Some(unsigned) = links.iter().find(|d| !d.is_signed()) {
                return Err(PortError::Validation(format!(
                    "delegation from {} is unsigned",
                    unsigned.delegator
                )));
            }
            let (mode, data) = encode_executions(execs)?;
            contexts.push(Bytes::from(encode_delegations(links)));
            modes.push(mode);
            calldatas.push(data);
        }

        let call = IDelegationManager::redeemDelegationsCall {
            _permissionContexts: contexts,
            _modes: modes,
            _executionCallDatas: calldatas,
        };
        Ok(Bytes::from(call.abi_encode()))
    }

    fn disable_calldata(&self, delegation: &Delegation) -> Result<Bytes, PortError> {
        let call = IDelegationManager::disableDelegationCall {
            _delegation: AbiDelegation::from(delegation),
        };
        Ok(Bytes::from(call.abi_encode()))
    }

    fn enable_calldata(&self, delegation: &Delegation) -> Result<Bytes, PortError> {
        let call = IDelegationManager::enableDelegationCall {
            _delegation: AbiDelegation::from(delegation),
        };
        Ok(Bytes::from(call.abi_encode()))
    }
}
