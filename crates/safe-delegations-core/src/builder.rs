use alloy::primitives::{Address, Bytes, B256, U256};

use crate::domain::{Caveat, Delegation, ROOT_AUTHORITY};
use crate::ports::{PortError, SaltPort};

/// Assembles an unsigned delegation.
#[derive(Debug, Clone)]
pub struct DelegationBuilder {
    delegator: Address,
    delegate: Address,
    authority: B256,
    caveats: Vec<Caveat>,
    salt: Option<U256>,
}

impl DelegationBuilder {
    pub fn new(delegator: Address, delegate: Address) -> Self {
        Self {
            delegator,
            delegate,
            authority: ROOT_AUTHORITY,
            caveats: Vec::new(),
            salt: None,
        }
    }

    pub fn authority(mut self, authority: B256) -> Self {
        self.authority = authority;
        self
    }

    pub fn caveat(mut self, caveat: Caveat) -> Self {
        self.caveats.push(caveat);
        self
    }

    pub fn caveats(mut self, caveats: impl IntoIterator<Item = Caveat>) -> Self {
        self.caveats.extend(caveats);
        self
    }

    pub fn salt(mut self, salt: U256) -> Self {
        self.salt = Some(salt);
        self
    }

    /// Builds the delegation, drawing a salt from `salts` if none was set.
    pub fn build_with(self, salts: &impl SaltPort) -> Result<Delegation, PortError> {
        let salt = match self.salt {
            Some(salt) => salt,
            None => salts.next_salt()?,
        };
        self.salt(salt).build()
    }

    pub fn build(self) -> Result<Delegation, PortError> {
        if self.delegator == Address::ZERO {
            return Err(PortError::Validation("delegator must be non-zero".to_owned()));
        }
        if self.delegate == Address::ZERO {
            return Err(PortError::Validation(
                "delegate must be non-zero; use ANY_DELEGATE for open delegations".to_owned(),
            ));
        }
        if self.delegate == self.delegator {
            return Err(PortError::Validation(
                "delegate and delegator must differ".to_owned(),
            ));
        }
        let salt = self
            .salt
            .ok_or_else(|| PortError::Validation("missing salt".to_owned()))?;
        Ok(Delegation {
            delegate: self.delegate,
            delegator: self.delegator,
            authority: self.authority,
            caveats: self.caveats,
            salt,
            signature: Bytes::new(),
        })
    }
}
