use alloy::primitives::{Address, Bytes, PrimitiveSignature, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use safe_delegations_core::{PortError, SignerPort};

/// Signs delegation digests with a local secp256k1 key.
///
/// Only fits delegators that are plain accounts, such as the intermediate
/// delegate of a swap chain. Safe delegators sign through their owners and
/// the result is attached with `AttachSignature`.
#[derive(Debug, Clone)]
pub struct LocalSignerAdapter {
    signer: PrivateKeySigner,
}

impl LocalSignerAdapter {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    pub fn from_hex(private_key: &str) -> Result<Self, PortError> {
        let signer = private_key
            .trim()
            .parse::<PrivateKeySigner>()
            .map_err(|e| PortError::Validation(format!("invalid private key: {e}")))?;
        Ok(Self::new(signer))
    }

    pub fn random() -> Self {
        Self::new(PrivateKeySigner::random())
    }
}

impl SignerPort for LocalSignerAdapter {
    fn address(&self) -> Result<Address, PortError> {
        Ok(self.signer.address())
    }

    fn sign_digest(&self, digest: B256) -> Result<Bytes, PortError> {
        let signature = self
            .signer
            .sign_hash_sync(&digest)
            .map_err(|e| PortError::Transport(format!("signing failed: {e}")))?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }
}

/// Signer for setups where every signature arrives from outside.
#[derive(Debug, Clone, Default)]
pub struct DisabledSigner;

impl SignerPort for DisabledSigner {
    fn address(&self) -> Result<Address, PortError> {
        Err(PortError::NotImplemented("signer.address"))
    }

    fn sign_digest(&self, _digest: B256) -> Result<Bytes, PortError> {
        Err(PortError::NotImplemented("signer.sign_digest"))
    }
}

/// Recovers the EOA behind a 65-byte signature over `digest`.
pub fn recover_signer(digest: B256, signature: &[u8]) -> Result<Address, PortError> {
    let signature = PrimitiveSignature::try_from(signature)
        .map_err(|e| PortError::Validation(format!("malformed signature: {e}")))?;
    signature
        .recover_address_from_prehash(&digest)
        .map_err(|e| PortError::Validation(format!("signature recovery failed: {e}")))
}
