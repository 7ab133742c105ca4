#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};

use alloy::primitives::{Address, Bytes, U256};

use safe_delegations_adapters::{
    DelegationConfig, LocalSignerAdapter, ManagerAbiAdapter, StoreAdapter,
};
use safe_delegations_core::{
    ClockPort, Deployment, EnforcerAddressBook, EnforcerKind, Erc20Token, Orchestrator,
    PermissionScope, PortError, SaltPort, SpendingLimitConfig, SwapIntentConfig, TokenRef,
};

pub const START_MS: u64 = 1_739_750_400_000;
pub const START_SECS: u64 = START_MS / 1000;

/// Ticks one millisecond per read; `advance` jumps ahead.
#[derive(Debug)]
pub struct TestClock {
    now: AtomicU64,
}

impl Default for TestClock {
    fn default() -> Self {
        Self {
            now: AtomicU64::new(START_MS),
        }
    }
}

impl TestClock {
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl ClockPort for TestClock {
    fn now_ms(&self) -> Result<u64, PortError> {
        Ok(self.now.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[derive(Debug, Default)]
pub struct CountingSalt {
    next: AtomicU64,
}

impl SaltPort for CountingSalt {
    fn next_salt(&self) -> Result<U256, PortError> {
        Ok(U256::from(self.next.fetch_add(1, Ordering::SeqCst) + 1))
    }
}

pub type TestOrchestrator =
    Orchestrator<StoreAdapter, TestClock, CountingSalt, LocalSignerAdapter, ManagerAbiAdapter>;

pub const INTERMEDIATE_KEY: &str =
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

pub fn deployment() -> Deployment {
    let mut enforcers = EnforcerAddressBook::new();
    for (i, kind) in EnforcerKind::ALL.iter().enumerate() {
        enforcers.insert(*kind, Address::with_last_byte(0x40 + i as u8));
    }
    Deployment {
        chain_id: 8453,
        delegation_manager: "0xdb9B1e94B5b69Df7e401DDbedE43491141047dB3"
            .parse()
            .expect("manager address"),
        enforcers,
    }
}

pub fn config() -> DelegationConfig {
    DelegationConfig::default().with_deployment(deployment())
}

pub fn new_orchestrator() -> TestOrchestrator {
    new_orchestrator_with(StoreAdapter::in_memory(&config()))
}

pub fn new_orchestrator_with(store: StoreAdapter) -> TestOrchestrator {
    Orchestrator::new(
        deployment(),
        store,
        TestClock::default(),
        CountingSalt::default(),
        intermediate_signer(),
        ManagerAbiAdapter,
    )
}

pub fn intermediate_signer() -> LocalSignerAdapter {
    LocalSignerAdapter::from_hex(INTERMEDIATE_KEY).expect("intermediate key")
}

pub fn safe_address() -> Address {
    "0x000000000000000000000000000000000000BEEF"
        .parse()
        .expect("valid safe address")
}

pub fn grantee() -> Address {
    "0x2000000000000000000000000000000000000002"
        .parse()
        .expect("valid grantee address")
}

pub fn executor() -> Address {
    "0x3000000000000000000000000000000000000003"
        .parse()
        .expect("valid executor address")
}

pub fn usdc() -> Erc20Token {
    Erc20Token {
        address: Address::repeat_byte(0xc0),
        decimals: 6,
        symbol: Some("USDC".to_owned()),
    }
}

pub fn weth() -> Erc20Token {
    Erc20Token {
        address: Address::repeat_byte(0xe0),
        decimals: 18,
        symbol: Some("WETH".to_owned()),
    }
}

pub fn usdc_weekly(expiry: Option<u64>) -> PermissionScope {
    PermissionScope::SpendingLimit(SpendingLimitConfig {
        token: TokenRef::Erc20(usdc()),
        period_amount: "250".to_owned(),
        period_duration_secs: 7 * 86_400,
        start_date: None,
        expiry,
    })
}

pub fn usdc_for_weth(executor: Address) -> PermissionScope {
    PermissionScope::SwapIntent(SwapIntentConfig {
        sell_token: usdc(),
        sell_amount: "1000".to_owned(),
        buy_token: weth(),
        min_buy_amount: "0.3".to_owned(),
        executor,
        expiry: START_SECS + 3_600,
    })
}

/// Stand-in for a Safe owner signature; never verified off-chain.
pub fn safe_signature(seed: u8) -> Bytes {
    let mut v = vec![seed; 65];
    v[64] = 27;
    Bytes::from(v)
}
