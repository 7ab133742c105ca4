//! Permission categories and the caveats each one expands to.

use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::caveats::{CaveatTerms, EnforcerAddressBook};
use crate::domain::{Caveat, DisplayAmount, ScopeType};
use crate::ports::PortError;

pub const NATIVE_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("{field}: invalid amount '{raw}': {reason}")]
    InvalidAmount {
        field: &'static str,
        raw: String,
        reason: String,
    },
    #[error("{0} must be greater than zero")]
    ZeroAmount(&'static str),
    #[error("{0} must be a non-zero address")]
    ZeroAddress(&'static str),
    #[error("period duration must be greater than zero")]
    ZeroDuration,
    #[error("expiry {expiry} is not after {now}")]
    Expired { expiry: u64, now: u64 },
    #[error("validFrom {valid_from} must be before expiry {expiry}")]
    EmptyWindow { valid_from: u64, expiry: u64 },
    #[error("sell and buy token must differ")]
    SameToken,
}

impl From<ScopeError> for PortError {
    fn from(e: ScopeError) -> Self {
        PortError::Validation(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20Token {
    pub address: Address,
    pub decimals: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TokenRef {
    Native,
    Erc20(Erc20Token),
}

impl TokenRef {
    pub fn decimals(&self) -> u8 {
        match self {
            Self::Native => NATIVE_DECIMALS,
            Self::Erc20(t) => t.decimals,
        }
    }

    pub fn address(&self) -> Option<Address> {
        match self {
            Self::Native => None,
            Self::Erc20(t) => Some(t.address),
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::Native => None,
            Self::Erc20(t) => t.symbol.as_deref(),
        }
    }

    fn validate(&self, field: &'static str) -> Result<(), ScopeError> {
        match self {
            Self::Erc20(t) if t.address == Address::ZERO => Err(ScopeError::ZeroAddress(field)),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingLimitConfig {
    pub token: TokenRef,
    /// Human amount, e.g. `"250.5"`.
    pub period_amount: String,
    pub period_duration_secs: u64,
    /// Defaults to the build time when absent.
    #[serde(default)]
    pub start_date: Option<u64>,
    #[serde(default)]
    pub expiry: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferIntentConfig {
    pub token: TokenRef,
    pub recipient: Address,
    pub amount: String,
    #[serde(default)]
    pub valid_from: Option<u64>,
    pub expiry: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapIntentConfig {
    pub sell_token: Erc20Token,
    pub sell_amount: String,
    pub buy_token: Erc20Token,
    pub min_buy_amount: String,
    /// Contract that finally redeems the redelegated permission.
    pub executor: Address,
    pub expiry: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PermissionScope {
    SpendingLimit(SpendingLimitConfig),
    TransferIntent(TransferIntentConfig),
    SwapIntent(SwapIntentConfig),
}

pub fn parse_amount(field: &'static str, raw: &str, decimals: u8) -> Result<U256, ScopeError> {
    let trimmed = raw.trim();
    let invalid = |reason: String| ScopeError::InvalidAmount {
        field,
        raw: raw.to_owned(),
        reason,
    };
    if trimmed.starts_with('-') {
        return Err(invalid("negative".to_owned()));
    }
    // parse_units truncates extra fraction digits; only trailing zeros may go.
    if let Some((_, fraction)) = trimmed.split_once('.') {
        let excess = fraction.get(usize::from(decimals)..).unwrap_or_default();
        if excess.bytes().any(|b| b != b'0') {
            return Err(invalid(format!("more than {decimals} decimal places")));
        }
    }
    let value = parse_units(trimmed, decimals)
        .map_err(|e| invalid(e.to_string()))?
        .get_absolute();
    if value.is_zero() {
        return Err(ScopeError::ZeroAmount(field));
    }
    Ok(value)
}

/// Renders base units with trailing fractional zeros removed.
pub fn format_amount(value: U256, decimals: u8) -> String {
    let Ok(formatted) = format_units(value, decimals) else {
        return value.to_string();
    };
    if !formatted.contains('.') {
        return formatted;
    }
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_owned()
}

fn display(role: &'static str, token: &TokenRef, raw: &str) -> Result<DisplayAmount, ScopeError> {
    let decimals = token.decimals();
    let base_units = parse_amount(role, raw, decimals)?;
    Ok(DisplayAmount {
        role: role.to_owned(),
        token: token.address(),
        symbol: token.symbol().map(str::to_owned),
        decimals,
        base_units,
        display: format_amount(base_units, decimals),
    })
}

fn window(valid_from: Option<u64>, expiry: Option<u64>) -> Option<CaveatTerms> {
    let after = u128::from(valid_from.unwrap_or(0));
    let before = u128::from(expiry.unwrap_or(0));
    if after == 0 && before == 0 {
        return None;
    }
    Some(CaveatTerms::Timestamp {
        after_threshold: after,
        before_threshold: before,
    })
}

/// Caveats of the executor link of a swap chain: `executor` as the only
/// redeemer, then the first timestamp window found among the parent's terms.
pub fn executor_link_terms(executor: Address, parent_terms: &[CaveatTerms]) -> Vec<CaveatTerms> {
    let mut terms = vec![CaveatTerms::Redeemer {
        redeemers: vec![executor],
    }];
    terms.extend(
        parent_terms
            .iter()
            .find(|t| matches!(t, CaveatTerms::Timestamp { .. }))
            .cloned(),
    );
    terms
}

fn check_expiry(expiry: u64, now_secs: u64) -> Result<(), ScopeError> {
    if expiry <= now_secs {
        return Err(ScopeError::Expired {
            expiry,
            now: now_secs,
        });
    }
    Ok(())
}

impl PermissionScope {
    pub fn scope_type(&self) -> ScopeType {
        match self {
            Self::SpendingLimit(_) => ScopeType::SpendingLimit,
            Self::TransferIntent(_) => ScopeType::TransferIntent,
            Self::SwapIntent(_) => ScopeType::SwapIntent,
        }
    }

    pub fn validate(&self, now_secs: u64) -> Result<(), ScopeError> {
        match self {
            Self::SpendingLimit(c) => {
                c.token.validate("token")?;
                parse_amount("periodAmount", &c.period_amount, c.token.decimals())?;
                if c.period_duration_secs == 0 {
                    return Err(ScopeError::ZeroDuration);
                }
                if let Some(expiry) = c.expiry {
                    check_expiry(expiry, now_secs)?;
                    let start = c.start_date.unwrap_or(now_secs);
                    if start >= expiry {
                        return Err(ScopeError::EmptyWindow {
                            valid_from: start,
                            expiry,
                        });
                    }
                }
            }
            Self::TransferIntent(c) => {
                c.token.validate("token")?;
                if c.recipient == Address::ZERO {
                    return Err(ScopeError::ZeroAddress("recipient"));
                }
                parse_amount("amount", &c.amount, c.token.decimals())?;
                check_expiry(c.expiry, now_secs)?;
                if let Some(valid_from) = c.valid_from {
                    if valid_from >= c.expiry {
                        return Err(ScopeError::EmptyWindow {
                            valid_from,
                            expiry: c.expiry,
                        });
                    }
                }
            }
            Self::SwapIntent(c) => {
                if c.sell_token.address == Address::ZERO {
                    return Err(ScopeError::ZeroAddress("sellToken"));
                }
                if c.buy_token.address == Address::ZERO {
                    return Err(ScopeError::ZeroAddress("buyToken"));
                }
                if c.sell_token.address == c.buy_token.address {
                    return Err(ScopeError::SameToken);
                }
                if c.executor == Address::ZERO {
                    return Err(ScopeError::ZeroAddress("executor"));
                }
                parse_amount("sellAmount", &c.sell_amount, c.sell_token.decimals)?;
                parse_amount("minBuyAmount", &c.min_buy_amount, c.buy_token.decimals)?;
                check_expiry(c.expiry, now_secs)?;
            }
        }
        Ok(())
    }

    /// Ordered caveat terms for the delegation the Safe grants.
    pub fn caveat_terms(
        &self,
        delegator: Address,
        now_secs: u64,
    ) -> Result<Vec<CaveatTerms>, ScopeError> {
        self.validate(now_secs)?;
        let mut terms = Vec::with_capacity(5);
        match self {
            Self::SpendingLimit(c) => {
                let period_amount =
                    parse_amount("periodAmount", &c.period_amount, c.token.decimals())?;
                let start_date = c.start_date.unwrap_or(now_secs);
                match &c.token {
                    TokenRef::Native => terms.push(CaveatTerms::NativeTokenPeriodTransfer {
                        period_amount,
                        period_duration: c.period_duration_secs,
                        start_date,
                    }),
                    TokenRef::Erc20(t) => {
                        terms.push(CaveatTerms::Erc20PeriodTransfer {
                            token: t.address,
                            period_amount,
                            period_duration: c.period_duration_secs,
                            start_date,
                        });
                        terms.push(CaveatTerms::ValueLte {
                            max_value: U256::ZERO,
                        });
                    }
                }
                terms.extend(window(None, c.expiry));
            }
            Self::TransferIntent(c) => {
                let amount = parse_amount("amount", &c.amount, c.token.decimals())?;
                match &c.token {
                    TokenRef::Native => {
                        terms.push(CaveatTerms::NativeTokenTransferAmount { allowance: amount });
                        terms.push(CaveatTerms::NativeBalanceChange {
                            enforce_decrease: false,
                            recipient: c.recipient,
                            amount,
                        });
                    }
                    TokenRef::Erc20(t) => {
                        terms.push(CaveatTerms::Erc20TransferAmount {
                            token: t.address,
                            max_amount: amount,
                        });
                        terms.push(CaveatTerms::ValueLte {
                            max_value: U256::ZERO,
                        });
                        terms.push(CaveatTerms::Erc20BalanceChange {
                            enforce_decrease: false,
                            token: t.address,
                            recipient: c.recipient,
                            amount,
                        });
                    }
                }
                terms.push(CaveatTerms::LimitedCalls {
                    limit: U256::from(1u8),
                });
                terms.extend(window(c.valid_from, Some(c.expiry)));
            }
            Self::SwapIntent(c) => {
                let sell = parse_amount("sellAmount", &c.sell_amount, c.sell_token.decimals)?;
                let min_buy =
                    parse_amount("minBuyAmount", &c.min_buy_amount, c.buy_token.decimals)?;
                terms.push(CaveatTerms::Erc20TransferAmount {
                    token: c.sell_token.address,
                    max_amount: sell,
                });
                terms.push(CaveatTerms::ValueLte {
                    max_value: U256::ZERO,
                });
                terms.push(CaveatTerms::Erc20BalanceChange {
                    enforce_decrease: false,
                    token: c.buy_token.address,
                    recipient: delegator,
                    amount: min_buy,
                });
                terms.push(CaveatTerms::LimitedCalls {
                    limit: U256::from(1u8),
                });
                terms.extend(window(None, Some(c.expiry)));
            }
        }
        Ok(terms)
    }

    pub fn caveats(
        &self,
        book: &EnforcerAddressBook,
        delegator: Address,
        now_secs: u64,
    ) -> Result<Vec<Caveat>, PortError> {
        self.caveat_terms(delegator, now_secs)?
            .iter()
            .map(|t| book.caveat(t).map_err(PortError::from))
            .collect()
    }

    pub fn display_amounts(&self) -> Result<Vec<DisplayAmount>, ScopeError> {
        let out = match self {
            Self::SpendingLimit(c) => vec![display("periodAmount", &c.token, &c.period_amount)?],
            Self::TransferIntent(c) => vec![display("amount", &c.token, &c.amount)?],
            Self::SwapIntent(c) => vec![
                display(
                    "sellAmount",
                    &TokenRef::Erc20(c.sell_token.clone()),
                    &c.sell_amount,
                )?,
                display(
                    "minBuyAmount",
                    &TokenRef::Erc20(c.buy_token.clone()),
                    &c.min_buy_amount,
                )?,
            ],
        };
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caveats::EnforcerKind;

    const NOW: u64 = 1_750_000_000;

    fn usdc() -> Erc20Token {
        Erc20Token {
            address: Address::repeat_byte(0xc0),
            decimals: 6,
            symbol: Some("USDC".to_owned()),
        }
    }

    #[test]
    fn amounts_respect_decimals() {
        assert_eq!(parse_amount("a", "1.5", 6), Ok(U256::from(1_500_000u64)));
        assert_eq!(format_amount(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_amount(U256::from(2_000_000u64), 6), "2");
        assert_eq!(parse_amount("a", "0", 6), Err(ScopeError::ZeroAmount("a")));
        assert!(parse_amount("a", "-1", 6).is_err());
        assert!(parse_amount("a", "abc", 6).is_err());
    }

    #[test]
    fn amounts_beyond_token_precision_are_rejected() {
        assert!(matches!(
            parse_amount("minBuyAmount", "0.3000009", 6),
            Err(ScopeError::InvalidAmount { field: "minBuyAmount", .. })
        ));
        assert!(parse_amount("a", "1.5", 0).is_err());
        assert_eq!(parse_amount("a", "0.3000000", 6), Ok(U256::from(300_000u64)));
        assert_eq!(parse_amount("a", "0.300001", 6), Ok(U256::from(300_001u64)));
    }

    #[test]
    fn erc20_spending_limit_pins_native_value() {
        let scope = PermissionScope::SpendingLimit(SpendingLimitConfig {
            token: TokenRef::Erc20(usdc()),
            period_amount: "100".to_owned(),
            period_duration_secs: 86_400,
            start_date: None,
            expiry: Some(NOW + 30 * 86_400),
        });
        let terms = scope.caveat_terms(Address::repeat_byte(1), NOW).expect("terms");
        let kinds: Vec<_> = terms.iter().map(CaveatTerms::kind).collect();
        assert_eq!(
            kinds,
            vec![
                EnforcerKind::Erc20PeriodTransfer,
                EnforcerKind::ValueLte,
                EnforcerKind::Timestamp
            ]
        );
        assert_eq!(
            terms[0],
            CaveatTerms::Erc20PeriodTransfer {
                token: usdc().address,
                period_amount: U256::from(100_000_000u64),
                period_duration: 86_400,
                start_date: NOW,
            }
        );
    }

    #[test]
    fn native_spending_limit_without_expiry_has_single_caveat() {
        let scope = PermissionScope::SpendingLimit(SpendingLimitConfig {
            token: TokenRef::Native,
            period_amount: "0.1".to_owned(),
            period_duration_secs: 3_600,
            start_date: Some(NOW - 10),
            expiry: None,
        });
        let terms = scope.caveat_terms(Address::repeat_byte(1), NOW).expect("terms");
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].kind(), EnforcerKind::NativeTokenPeriodTransfer);
    }

    #[test]
    fn transfer_intent_requires_recipient_balance_increase() {
        let recipient = Address::repeat_byte(0x77);
        let scope = PermissionScope::TransferIntent(TransferIntentConfig {
            token: TokenRef::Erc20(usdc()),
            recipient,
            amount: "25".to_owned(),
            valid_from: None,
            expiry: NOW + 600,
        });
        let terms = scope.caveat_terms(Address::repeat_byte(1), NOW).expect("terms");
        assert!(terms.contains(&CaveatTerms::Erc20BalanceChange {
            enforce_decrease: false,
            token: usdc().address,
            recipient,
            amount: U256::from(25_000_000u64),
        }));
        assert!(terms.contains(&CaveatTerms::LimitedCalls {
            limit: U256::from(1u8)
        }));
        assert_eq!(terms.last().map(CaveatTerms::kind), Some(EnforcerKind::Timestamp));
    }

    #[test]
    fn expired_intent_is_rejected() {
        let scope = PermissionScope::TransferIntent(TransferIntentConfig {
            token: TokenRef::Native,
            recipient: Address::repeat_byte(0x77),
            amount: "1".to_owned(),
            valid_from: None,
            expiry: NOW,
        });
        assert_eq!(
            scope.validate(NOW),
            Err(ScopeError::Expired { expiry: NOW, now: NOW })
        );
    }

    #[test]
    fn swap_intent_protects_delegator_and_names_executor() {
        let safe = Address::repeat_byte(0x5a);
        let weth = Erc20Token {
            address: Address::repeat_byte(0xee),
            decimals: 18,
            symbol: None,
        };
        let scope = PermissionScope::SwapIntent(SwapIntentConfig {
            sell_token: usdc(),
            sell_amount: "1000".to_owned(),
            buy_token: weth.clone(),
            min_buy_amount: "0.3".to_owned(),
            executor: Address::repeat_byte(0xec),
            expiry: NOW + 3_600,
        });
        let terms = scope.caveat_terms(safe, NOW).expect("terms");
        assert!(terms.contains(&CaveatTerms::Erc20BalanceChange {
            enforce_decrease: false,
            token: weth.address,
            recipient: safe,
            amount: U256::from(300_000_000_000_000_000u64),
        }));

        let executor = Address::repeat_byte(0xec);
        let link = executor_link_terms(executor, &terms);
        assert_eq!(
            link,
            vec![
                CaveatTerms::Redeemer {
                    redeemers: vec![executor]
                },
                CaveatTerms::Timestamp {
                    after_threshold: 0,
                    before_threshold: u128::from(NOW + 3600),
                },
            ]
        );

        let amounts = scope.display_amounts().expect("amounts");
        assert_eq!(amounts[0].display, "1000");
        assert_eq!(amounts[0].symbol.as_deref(), Some("USDC"));
        assert_eq!(amounts[1].display, "0.3");
        assert_eq!(amounts[1].symbol, None);
    }

    #[test]
    fn executor_link_without_parent_window_only_names_redeemer() {
        let executor = Address::repeat_byte(0xec);
        let parent = vec![CaveatTerms::LimitedCalls {
            limit: U256::from(1u8),
        }];
        assert_eq!(
            executor_link_terms(executor, &parent),
            vec![CaveatTerms::Redeemer {
                redeemers: vec![executor]
            }]
        );
    }

    #[test]
    fn swap_of_same_token_is_rejected() {
        let scope = PermissionScope::SwapIntent(SwapIntentConfig {
            sell_token: usdc(),
            sell_amount: "1".to_owned(),
            buy_token: usdc(),
            min_buy_amount: "1".to_owned(),
            executor: Address::repeat_byte(0xec),
            expiry: NOW + 1,
        });
        assert_eq!(scope.validate(NOW), Err(ScopeError::SameToken));
    }

    #[test]
    fn scope_json_is_tagged_by_type() {
        let json = serde_json::json!({
            "type": "transferIntent",
            "token": { "kind": "native" },
            "recipient": "0x7777777777777777777777777777777777777777",
            "amount": "0.5",
            "expiry": NOW + 60
        });
        let scope: PermissionScope = serde_json::from_value(json).expect("parse scope");
        assert_eq!(scope.scope_type(), ScopeType::TransferIntent);
    }
}
