use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::{SolCall, SolValue};

use safe_delegations_adapters::manager::{encode_executions, MODE_BATCH_DEFAULT};
use safe_delegations_adapters::{erc20_transfer, native_transfer, ManagerAbiAdapter};
use safe_delegations_core::abi::{AbiExecution, IDelegationManager, IERC20};
use safe_delegations_core::{
    Caveat, Delegation, Execution, ManagerAbiPort, PortError, ROOT_AUTHORITY,
};

fn signed_root() -> Delegation {
    Delegation {
        delegate: Address::repeat_byte(0x22),
        delegator: Address::repeat_byte(0x11),
        authority: ROOT_AUTHORITY,
        caveats: vec![Caveat::new(Address::repeat_byte(0xaa), vec![1u8; 32])],
        salt: U256::from(9u64),
        signature: Bytes::from(vec![0x5a; 65]),
    }
}

#[test]
fn single_execution_is_packed() {
    let exec = Execution {
        target: Address::repeat_byte(0x33),
        value: U256::from(5u64),
        call_data: Bytes::from(vec![0xde, 0xad]),
    };
    let (mode, data) = encode_executions(&[exec.clone()]).expect("encode");
    assert_eq!(mode, B256::ZERO);
    assert_eq!(data.len(), 20 + 32 + 2);
    assert_eq!(&data[..20], exec.target.as_slice());
    assert_eq!(U256::from_be_slice(&data[20..52]), U256::from(5u64));
    assert_eq!(&data[52..], &[0xde_u8, 0xad][..]);
}

#[test]
fn multiple_executions_use_batch_mode() {
    let execs = vec![
        native_transfer(Address::repeat_byte(0x01), U256::from(1u64)),
        erc20_transfer(Address::repeat_byte(0xc0), Address::repeat_byte(0x02), U256::from(2u64)),
    ];
    let (mode, data) = encode_executions(&execs).expect("encode");
    assert_eq!(mode, MODE_BATCH_DEFAULT);
    assert_eq!(mode[0], 0x01);
    assert!(mode[1..].iter().all(|b| *b == 0));

    let decoded = <Vec<AbiExecution>>::abi_decode(&data, true).expect("decode batch");
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded[0].value, U256::from(1u64));
    assert!(decoded[0].callData.is_empty());
    let transfer =
        IERC20::transferCall::abi_decode(&decoded[1].callData, true).expect("decode transfer");
    assert_eq!(transfer.to, Address::repeat_byte(0x02));
    assert_eq!(transfer.amount, U256::from(2u64));
}

#[test]
fn redeem_calldata_checks_shapes() {
    let manager = ManagerAbiAdapter;
    let exec = vec![native_transfer(Address::repeat_byte(0x01), U256::from(1u64))];

    assert!(matches!(
        manager.redeem_calldata(&[], &[]),
        Err(PortError::Validation(_))
    ));
    assert!(manager
        .redeem_calldata(&[vec![signed_root()]], &[exec.clone(), exec.clone()])
        .is_err());
    assert!(manager
        .redeem_calldata(&[vec![signed_root()]], &[vec![]])
        .is_err());
    assert!(manager.redeem_calldata(&[vec![]], &[exec.clone()]).is_err());

    let unsigned = Delegation {
        signature: Bytes::new(),
        ..signed_root()
    };
    let err = manager
        .redeem_calldata(&[vec![unsigned]], &[exec.clone()])
        .expect_err("unsigned link");
    assert!(err.to_string().contains("unsigned"));

    let calldata = manager
        .redeem_calldata(&[vec![signed_root()], vec![signed_root()]], &[exec.clone(), exec])
        .expect("two redemptions");
    assert_eq!(
        &calldata[..4],
        IDelegationManager::redeemDelegationsCall::SELECTOR.as_slice()
    );
    let call =
        IDelegationManager::redeemDelegationsCall::abi_decode(&calldata, true).expect("decode");
    assert_eq!(call._permissionContexts.len(), 2);
    assert_eq!(call._modes, vec![B256::ZERO, B256::ZERO]);
}

#[test]
fn disable_and_enable_carry_the_full_delegation() {
    let manager = ManagerAbiAdapter;
    let delegation = signed_root();

    let disable = manager.disable_calldata(&delegation).expect("disable");
    let call = IDelegationManager::disableDelegationCall::abi_decode(&disable, true)
        .expect("decode disable");
    assert_eq!(Delegation::from(call._delegation), delegation);

    let enable = manager.enable_calldata(&delegation).expect("enable");
    assert_eq!(
        &enable[..4],
        IDelegationManager::enableDelegationCall::SELECTOR.as_slice()
    );
    assert_ne!(disable[..4], enable[..4]);
}
