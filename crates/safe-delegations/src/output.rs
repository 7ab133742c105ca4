use alloy::primitives::{Address, Bytes, B256};
use eyre::Result;
use serde::Serialize;

use safe_delegations_core::{CaveatTerms, MergeResult, StoredDelegation};

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_record(record: &StoredDelegation, json: bool) -> Result<()> {
    if json {
        return print_json(record);
    }
    println!("Hash: {}", record.delegation_hash);
    println!("Label: {}", record.label);
    println!("Scope: {}", record.scope_type.as_str());
    println!("Status: {:?}", record.status);
    println!("Chain: {}", record.chain_id);
    println!("Delegator: {}", record.delegation.delegator);
    println!("Delegate: {}", record.delegation.delegate);
    if let Some(parent) = record.parent_hash {
        println!("Parent: {parent}");
    }
    for amount in &record.amounts {
        match (&amount.symbol, amount.token) {
            (Some(symbol), Some(token)) => {
                println!("  {}: {} {symbol} ({token})", amount.role, amount.display)
            }
            (None, Some(token)) => println!("  {}: {} ({token})", amount.role, amount.display),
            (_, None) => println!("  {}: {} (native)", amount.role, amount.display),
        }
    }
    Ok(())
}

pub fn print_list(records: &[StoredDelegation], json: bool) -> Result<()> {
    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No delegations stored");
    }
    for r in records {
        println!(
            "{}  {:<8} {:<15} {}",
            r.delegation_hash,
            format!("{:?}", r.status).to_lowercase(),
            r.scope_type.as_str(),
            r.label
        );
    }
    Ok(())
}

pub fn print_merge(merge: &MergeResult, json: bool) -> Result<()> {
    if json {
        return print_json(merge);
    }
    println!(
        "Imported: {} added, {} updated, {} skipped, {} conflicted",
        merge.added, merge.updated, merge.skipped, merge.conflicted
    );
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HashOutput {
    pub delegation_hash: B256,
    pub signing_digest: B256,
    pub domain_separator: B256,
}

impl HashOutput {
    pub fn print(&self, json: bool) -> Result<()> {
        if json {
            return print_json(self);
        }
        println!("Delegation hash: {}", self.delegation_hash);
        println!("Signing digest: {}", self.signing_digest);
        println!("Domain separator: {}", self.domain_separator);
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedCaveat {
    pub enforcer: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms: Option<CaveatTerms>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn print_caveats(caveats: &[DecodedCaveat], json: bool) -> Result<()> {
    if json {
        return print_json(&caveats);
    }
    for (i, c) in caveats.iter().enumerate() {
        match (&c.terms, &c.error) {
            (Some(terms), _) => println!("{}: {} {}", i, c.enforcer, serde_json::to_string(terms)?),
            (None, Some(err)) => println!("{}: {} <{err}>", i, c.enforcer),
            (None, None) => println!("{}: {}", i, c.enforcer),
        }
    }
    Ok(())
}

pub fn print_calldata(to: Address, calldata: &Bytes, json: bool) -> Result<()> {
    if json {
        return print_json(&serde_json::json!({ "to": to, "data": calldata }));
    }
    println!("To: {to}");
    println!("Data: {calldata}");
    Ok(())
}
