use alloy::primitives::U256;

use safe_delegations_core::{ClockPort, PortError, SaltPort};

/// Wall clock; `web_time` falls through to `std::time` off the web.
#[derive(Debug, Clone, Default)]
pub struct SystemClockAdapter;

impl ClockPort for SystemClockAdapter {
    fn now_ms(&self) -> Result<u64, PortError> {
        let now = web_time::SystemTime::now()
            .duration_since(web_time::UNIX_EPOCH)
            .map_err(|e| PortError::Transport(format!("time error: {e}")))?;
        u64::try_from(now.as_millis())
            .map_err(|_| PortError::Transport("clock out of range".to_owned()))
    }
}

/// Draws delegation salts from the OS RNG.
#[derive(Debug, Clone, Default)]
pub struct OsSaltAdapter;

impl SaltPort for OsSaltAdapter {
    fn next_salt(&self) -> Result<U256, PortError> {
        random_salt()
    }
}

/// 32 bytes from the OS RNG as a big-endian salt.
pub fn random_salt() -> Result<U256, PortError> {
    let mut raw = [0u8; 32];
    getrandom::getrandom(&mut raw)
        .map_err(|e| PortError::Transport(format!("salt generation failed: {e}")))?;
    Ok(U256::from_be_bytes(raw))
}
