//! Base64url share payloads for moving bundles between devices.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use safe_delegations_core::{DelegationBundle, MergeResult, PortError};

use crate::StoreAdapter;

pub fn encode_share_payload(bundle: &DelegationBundle) -> Result<String, PortError> {
    let json = serde_json::to_vec(bundle)
        .map_err(|e| PortError::Validation(format!("bundle serialization failed: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decodes a payload back into JSON text. Trailing `=` padding is tolerated.
pub fn decode_share_payload(payload: &str) -> Result<String, PortError> {
    let raw = URL_SAFE_NO_PAD
        .decode(payload.trim().trim_end_matches('='))
        .map_err(|e| PortError::Validation(format!("invalid share payload: {e}")))?;
    String::from_utf8(raw)
        .map_err(|e| PortError::Validation(format!("share payload is not utf-8: {e}")))
}

impl StoreAdapter {
    pub fn import_share_payload(&self, payload: &str) -> Result<MergeResult, PortError> {
        self.import_json(&decode_share_payload(payload)?)
    }
}
