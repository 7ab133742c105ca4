use alloy::primitives::B256;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use safe_delegations_core::{PortError, StoredDelegation};

type HmacSha256 = Hmac<Sha256>;

pub const BUNDLE_MAC_KEY_ID: &str = "bundle-mac-v1";

pub fn derive_mac_key(secret: &[u8], key_id: &str) -> Result<[u8; 32], PortError> {
    let hk = Hkdf::<Sha256>::new(None, secret);
    let mut key = [0u8; 32];
    hk.expand(key_id.as_bytes(), &mut key)
        .map_err(|_| PortError::Validation(format!("hkdf expand for {key_id} failed")))?;
    Ok(key)
}

pub fn hmac_sha256_b256(mac_key: &[u8; 32], payload: &[u8]) -> Result<B256, PortError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(mac_key)
        .map_err(|e| PortError::Validation(format!("hmac init failed: {e}")))?;
    mac.update(payload);
    Ok(B256::from_slice(&mac.finalize().into_bytes()))
}

/// MAC over the canonical JSON of the exported records.
pub fn bundle_mac(secret: &str, delegations: &[StoredDelegation]) -> Result<B256, PortError> {
    let value = serde_json::to_value(delegations)
        .map_err(|e| PortError::Validation(format!("bundle serialization failed: {e}")))?;
    let key = derive_mac_key(secret.as_bytes(), BUNDLE_MAC_KEY_ID)?;
    hmac_sha256_b256(&key, &canonical_json_bytes(&value)?)
}

pub fn canonical_json_bytes(value: &serde_json::Value) -> Result<Vec<u8>, PortError> {
    serde_json::to_vec(&normalize_json(value))
        .map_err(|e| PortError::Validation(format!("canonical json serialization failed: {e}")))
}

fn normalize_json(value: &serde_json::Value) -> serde_json::Value {
    use serde_json::{Map, Value};
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            let mut out = Map::with_capacity(keys.len());
            for key in keys {
                out.insert(key.clone(), normalize_json(&map[key]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(normalize_json).collect()),
        _ => value.clone(),
    }
}
