//! Enforcer registry and caveat terms codecs.
//!
//! Every enforcer's packed byte layout lives here exactly once. Terms are
//! `abi.encodePacked` style: addresses take 20 bytes, `uint256` 32 bytes,
//! `uint128` 16 bytes, `bool` a single byte and selectors 4 bytes.

use std::collections::BTreeMap;
use std::fmt;

use alloy::primitives::{Address, Bytes, FixedBytes, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Caveat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EnforcerKind {
    #[serde(rename = "ERC20PeriodTransferEnforcer")]
    Erc20PeriodTransfer,
    #[serde(rename = "NativeTokenPeriodTransferEnforcer")]
    NativeTokenPeriodTransfer,
    #[serde(rename = "ERC20TransferAmountEnforcer")]
    Erc20TransferAmount,
    #[serde(rename = "NativeTokenTransferAmountEnforcer")]
    NativeTokenTransferAmount,
    #[serde(rename = "ERC20BalanceChangeEnforcer")]
    Erc20BalanceChange,
    #[serde(rename = "NativeBalanceChangeEnforcer")]
    NativeBalanceChange,
    #[serde(rename = "TimestampEnforcer")]
    Timestamp,
    #[serde(rename = "ValueLteEnforcer")]
    ValueLte,
    #[serde(rename = "LimitedCallsEnforcer")]
    LimitedCalls,
    #[serde(rename = "AllowedTargetsEnforcer")]
    AllowedTargets,
    #[serde(rename = "AllowedMethodsEnforcer")]
    AllowedMethods,
    #[serde(rename = "RedeemerEnforcer")]
    Redeemer,
}

impl EnforcerKind {
    pub const ALL: [EnforcerKind; 12] = [
        Self::Erc20PeriodTransfer,
        Self::NativeTokenPeriodTransfer,
        Self::Erc20TransferAmount,
        Self::NativeTokenTransferAmount,
        Self::Erc20BalanceChange,
        Self::NativeBalanceChange,
        Self::Timestamp,
        Self::ValueLte,
        Self::LimitedCalls,
        Self::AllowedTargets,
        Self::AllowedMethods,
        Self::Redeemer,
    ];

    pub fn contract_name(self) -> &'static str {
        match self {
            Self::Erc20PeriodTransfer => "ERC20PeriodTransferEnforcer",
            Self::NativeTokenPeriodTransfer => "NativeTokenPeriodTransferEnforcer",
            Self::Erc20TransferAmount => "ERC20TransferAmountEnforcer",
            Self::NativeTokenTransferAmount => "NativeTokenTransferAmountEnforcer",
            Self::Erc20BalanceChange => "ERC20BalanceChangeEnforcer",
            Self::NativeBalanceChange => "NativeBalanceChangeEnforcer",
            Self::Timestamp => "TimestampEnforcer",
            Self::ValueLte => "ValueLteEnforcer",
            Self::LimitedCalls => "LimitedCallsEnforcer",
            Self::AllowedTargets => "AllowedTargetsEnforcer",
            Self::AllowedMethods => "AllowedMethodsEnforcer",
            Self::Redeemer => "RedeemerEnforcer",
        }
    }

    /// Exact terms length for fixed layouts, `None` for list layouts.
    pub fn fixed_len(self) -> Option<usize> {
        match self {
            Self::Erc20PeriodTransfer => Some(20 + 32 * 3),
            Self::NativeTokenPeriodTransfer => Some(32 * 3),
            Self::Erc20TransferAmount => Some(20 + 32),
            Self::NativeTokenTransferAmount => Some(32),
            Self::Erc20BalanceChange => Some(1 + 20 + 20 + 32),
            Self::NativeBalanceChange => Some(1 + 20 + 32),
            Self::Timestamp => Some(16 + 16),
            Self::ValueLte | Self::LimitedCalls => Some(32),
            Self::AllowedTargets | Self::AllowedMethods | Self::Redeemer => None,
        }
    }
}

impl fmt::Display for EnforcerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.contract_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TermsError {
    #[error("{kind} terms must be {expected} bytes, got {actual}")]
    Length {
        kind: EnforcerKind,
        expected: usize,
        actual: usize,
    },
    #[error("{kind} terms length {actual} is not a multiple of {unit}")]
    ListLength {
        kind: EnforcerKind,
        unit: usize,
        actual: usize,
    },
    #[error("{kind} requires at least one entry")]
    EmptyList { kind: EnforcerKind },
    #[error("{kind}.{field} must be non-zero")]
    Zero {
        kind: EnforcerKind,
        field: &'static str,
    },
    #[error("{kind}.{field} does not fit in {bits} bits")]
    Overflow {
        kind: EnforcerKind,
        field: &'static str,
        bits: u32,
    },
    #[error("invalid bool flag byte 0x{0:02x}")]
    InvalidFlag(u8),
    #[error("timestamp window is empty: after {after} must be before {before}")]
    InvalidWindow { after: u128, before: u128 },
    #[error("unknown enforcer {0}")]
    UnknownEnforcer(Address),
    #[error("no {0} address configured for this chain")]
    UnmappedKind(EnforcerKind),
}

/// Decoded caveat terms, one variant per enforcer kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CaveatTerms {
    #[serde(rename_all = "camelCase")]
    Erc20PeriodTransfer {
        token: Address,
        period_amount: U256,
        period_duration: u64,
        start_date: u64,
    },
    #[serde(rename_all = "camelCase")]
    NativeTokenPeriodTransfer {
        period_amount: U256,
        period_duration: u64,
        start_date: u64,
    },
    #[serde(rename_all = "camelCase")]
    Erc20TransferAmount { token: Address, max_amount: U256 },
    #[serde(rename_all = "camelCase")]
    NativeTokenTransferAmount { allowance: U256 },
    #[serde(rename_all = "camelCase")]
    Erc20BalanceChange {
        enforce_decrease: bool,
        token: Address,
        recipient: Address,
        amount: U256,
    },
    #[serde(rename_all = "camelCase")]
    NativeBalanceChange {
        enforce_decrease: bool,
        recipient: Address,
        amount: U256,
    },
    /// Zero on either side leaves that side unbounded.
    #[serde(rename_all = "camelCase")]
    Timestamp {
        after_threshold: u128,
        before_threshold: u128,
    },
    #[serde(rename_all = "camelCase")]
    ValueLte { max_value: U256 },
    #[serde(rename_all = "camelCase")]
    LimitedCalls { limit: U256 },
    AllowedTargets { targets: Vec<Address> },
    AllowedMethods { selectors: Vec<FixedBytes<4>> },
    Redeemer { redeemers: Vec<Address> },
}

impl CaveatTerms {
    pub fn kind(&self) -> EnforcerKind {
        match self {
            Self::Erc20PeriodTransfer { .. } => EnforcerKind::Erc20PeriodTransfer,
            Self::NativeTokenPeriodTransfer { .. } => EnforcerKind::NativeTokenPeriodTransfer,
            Self::Erc20TransferAmount { .. } => EnforcerKind::Erc20TransferAmount,
            Self::NativeTokenTransferAmount { .. } => EnforcerKind::NativeTokenTransferAmount,
            Self::Erc20BalanceChange { .. } => EnforcerKind::Erc20BalanceChange,
            Self::NativeBalanceChange { .. } => EnforcerKind::NativeBalanceChange,
            Self::Timestamp { .. } => EnforcerKind::Timestamp,
            Self::ValueLte { .. } => EnforcerKind::ValueLte,
            Self::LimitedCalls { .. } => EnforcerKind::LimitedCalls,
            Self::AllowedTargets { .. } => EnforcerKind::AllowedTargets,
            Self::AllowedMethods { .. } => EnforcerKind::AllowedMethods,
            Self::Redeemer { .. } => EnforcerKind::Redeemer,
        }
    }

    /// Checks the value-level rules shared by encode and decode.
    pub fn validate(&self) -> Result<(), TermsError> {
        let kind = self.kind();
        let zero = |field| TermsError::Zero { kind, field };
        match self {
            Self::Erc20PeriodTransfer {
                period_amount,
                period_duration,
                start_date,
                ..
            }
            | Self::NativeTokenPeriodTransfer {
                period_amount,
                period_duration,
                start_date,
            } => {
                if period_amount.is_zero() {
                    return Err(zero("periodAmount"));
                }
                if *period_duration == 0 {
                    return Err(zero("periodDuration"));
                }
                if *start_date == 0 {
                    return Err(zero("startDate"));
                }
            }
            Self::Erc20TransferAmount { max_amount, .. } if max_amount.is_zero() => {
                return Err(zero("maxAmount"));
            }
            Self::NativeTokenTransferAmount { allowance } if allowance.is_zero() => {
                return Err(zero("allowance"));
            }
            Self::Erc20BalanceChange { amount, .. } | Self::NativeBalanceChange { amount, .. }
                if amount.is_zero() =>
            {
                return Err(zero("amount"));
            }
            Self::Timestamp {
                after_threshold,
                before_threshold,
            } => {
                let (after, before) = (*after_threshold, *before_threshold);
                if after == 0 && before == 0 {
                    return Err(TermsError::InvalidWindow { after, before });
                }
                if before != 0 && after >= before {
                    return Err(TermsError::InvalidWindow { after, before });
                }
            }
            Self::LimitedCalls { limit } if limit.is_zero() => return Err(zero("limit")),
            Self::AllowedTargets { targets } if targets.is_empty() => {
                return Err(TermsError::EmptyList { kind });
            }
            Self::AllowedMethods { selectors } if selectors.is_empty() => {
                return Err(TermsError::EmptyList { kind });
            }
            Self::Redeemer { redeemers } if redeemers.is_empty() => {
                return Err(TermsError::EmptyList { kind });
            }
            _ => {}
        }
        Ok(())
    }

    pub fn encode(&self) -> Result<Bytes, TermsError> {
        self.validate()?;
        let mut out = Vec::with_capacity(self.kind().fixed_len().unwrap_or(64));
        match self {
            Self::Erc20PeriodTransfer {
                token,
                period_amount,
                period_duration,
                start_date,
            } => {
                out.extend_from_slice(token.as_slice());
                push_u256(&mut out, *period_amount);
                push_u256(&mut out, U256::from(*period_duration));
                push_u256(&mut out, U256::from(*start_date));
            }
            Self::NativeTokenPeriodTransfer {
                period_amount,
                period_duration,
                start_date,
            } => {
                push_u256(&mut out, *period_amount);
                push_u256(&mut out, U256::from(*period_duration));
                push_u256(&mut out, U256::from(*start_date));
            }
            Self::Erc20TransferAmount { token, max_amount } => {
                out.extend_from_slice(token.as_slice());
                push_u256(&mut out, *max_amount);
            }
            Self::NativeTokenTransferAmount { allowance } => push_u256(&mut out, *allowance),
            Self::Erc20BalanceChange {
                enforce_decrease,
                token,
                recipient,
                amount,
            } => {
                out.push(u8::from(*enforce_decrease));
                out.extend_from_slice(token.as_slice());
                out.extend_from_slice(recipient.as_slice());
                push_u256(&mut out, *amount);
            }
            Self::NativeBalanceChange {
                enforce_decrease,
                recipient,
                amount,
            } => {
                out.push(u8::from(*enforce_decrease));
                out.extend_from_slice(recipient.as_slice());
                push_u256(&mut out, *amount);
            }
            Self::Timestamp {
                after_threshold,
                before_threshold,
            } => {
                out.extend_from_slice(&after_threshold.to_be_bytes());
                out.extend_from_slice(&before_threshold.to_be_bytes());
            }
            Self::ValueLte { max_value } => push_u256(&mut out, *max_value),
            Self::LimitedCalls { limit } => push_u256(&mut out, *limit),
            Self::AllowedTargets { targets: list } | Self::Redeemer { redeemers: list } => {
                for addr in list {
                    out.extend_from_slice(addr.as_slice());
                }
            }
            Self::AllowedMethods { selectors } => {
                for selector in selectors {
                    out.extend_from_slice(selector.as_slice());
                }
            }
        }
        Ok(Bytes::from(out))
    }

    pub fn decode(kind: EnforcerKind, terms: &[u8]) -> Result<Self, TermsError> {
        match kind.fixed_len() {
            Some(expected) if terms.len() != expected => {
                return Err(TermsError::Length {
                    kind,
                    expected,
                    actual: terms.len(),
                });
            }
            _ => {}
        }

        let mut r = Reader::new(kind, terms);
        let decoded = match kind {
            EnforcerKind::Erc20PeriodTransfer => Self::Erc20PeriodTransfer {
                token: r.address(),
                period_amount: r.u256(),
                period_duration: r.u64("periodDuration")?,
                start_date: r.u64("startDate")?,
            },
            EnforcerKind::NativeTokenPeriodTransfer => Self::NativeTokenPeriodTransfer {
                period_amount: r.u256(),
                period_duration: r.u64("periodDuration")?,
                start_date: r.u64("startDate")?,
            },
            EnforcerKind::Erc20TransferAmount => Self::Erc20TransferAmount {
                token: r.address(),
                max_amount: r.u256(),
            },
            EnforcerKind::NativeTokenTransferAmount => Self::NativeTokenTransferAmount {
                allowance: r.u256(),
            },
            EnforcerKind::Erc20BalanceChange => Self::Erc20BalanceChange {
                enforce_decrease: r.flag()?,
                token: r.address(),
                recipient: r.address(),
                amount: r.u256(),
            },
            EnforcerKind::NativeBalanceChange => Self::NativeBalanceChange {
                enforce_decrease: r.flag()?,
                recipient: r.address(),
                amount: r.u256(),
            },
            EnforcerKind::Timestamp => Self::Timestamp {
                after_threshold: r.u128(),
                before_threshold: r.u128(),
            },
            EnforcerKind::ValueLte => Self::ValueLte {
                max_value: r.u256(),
            },
            EnforcerKind::LimitedCalls => Self::LimitedCalls { limit: r.u256() },
            EnforcerKind::AllowedTargets => Self::AllowedTargets {
                targets: r.address_list()?,
            },
            EnforcerKind::Redeemer => Self::Redeemer {
                redeemers: r.address_list()?,
            },
            EnforcerKind::AllowedMethods => Self::AllowedMethods {
                selectors: r.selector_list()?,
            },
        };
        decoded.validate()?;
        Ok(decoded)
    }
}

fn push_u256(out: &mut Vec<u8>, value: U256) {
    out.extend_from_slice(&value.to_be_bytes::<32>());
}

/// Cursor over packed terms. Fixed layouts are length-checked before reading.
struct Reader<'a> {
    kind: EnforcerKind,
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(kind: EnforcerKind, buf: &'a [u8]) -> Self {
        Self { kind, buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> &'a [u8] {
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        out
    }

    fn address(&mut self) -> Address {
        Address::from_slice(self.take(20))
    }

    fn u256(&mut self) -> U256 {
        U256::from_be_slice(self.take(32))
    }

    fn u128(&mut self) -> u128 {
        let mut raw = [0u8; 16];
        raw.copy_from_slice(self.take(16));
        u128::from_be_bytes(raw)
    }

    fn u64(&mut self, field: &'static str) -> Result<u64, TermsError> {
        let kind = self.kind;
        u64::try_from(self.u256()).map_err(|_| TermsError::Overflow {
            kind,
            field,
            bits: 64,
        })
    }

    fn flag(&mut self) -> Result<bool, TermsError> {
        match self.take(1)[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(TermsError::InvalidFlag(other)),
        }
    }

    fn list_len(&self, unit: usize) -> Result<usize, TermsError> {
        let actual = self.buf.len();
        if actual == 0 {
            return Err(TermsError::EmptyList { kind: self.kind });
        }
        if actual % unit != 0 {
            return Err(TermsError::ListLength {
                kind: self.kind,
                unit,
                actual,
            });
        }
        Ok(actual / unit)
    }

    fn address_list(&mut self) -> Result<Vec<Address>, TermsError> {
        let n = self.list_len(20)?;
        Ok((0..n).map(|_| self.address()).collect())
    }

    fn selector_list(&mut self) -> Result<Vec<FixedBytes<4>>, TermsError> {
        let n = self.list_len(4)?;
        Ok((0..n).map(|_| FixedBytes::from_slice(self.take(4))).collect())
    }
}

/// Enforcer addresses deployed on one chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnforcerAddressBook {
    addresses: BTreeMap<EnforcerKind, Address>,
}

impl EnforcerAddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: EnforcerKind, address: Address) -> Self {
        self.insert(kind, address);
        self
    }

    pub fn insert(&mut self, kind: EnforcerKind, address: Address) {
        self.addresses.insert(kind, address);
    }

    pub fn address_of(&self, kind: EnforcerKind) -> Result<Address, TermsError> {
        self.addresses
            .get(&kind)
            .copied()
            .ok_or(TermsError::UnmappedKind(kind))
    }

    pub fn kind_of(&self, enforcer: Address) -> Option<EnforcerKind> {
        self.addresses
            .iter()
            .find(|(_, addr)| **addr == enforcer)
            .map(|(kind, _)| *kind)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Encodes `terms` and pairs them with the configured enforcer address.
    pub fn caveat(&self, terms: &CaveatTerms) -> Result<Caveat, TermsError> {
        let enforcer = self.address_of(terms.kind())?;
        Ok(Caveat::new(enforcer, terms.encode()?))
    }

    pub fn decode_caveat(&self, caveat: &Caveat) -> Result<CaveatTerms, TermsError> {
        let kind = self
            .kind_of(caveat.enforcer)
            .ok_or(TermsError::UnknownEnforcer(caveat.enforcer))?;
        CaveatTerms::decode(kind, &caveat.terms)
    }
}
