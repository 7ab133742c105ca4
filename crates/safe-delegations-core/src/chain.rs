//! Redelegation chains.
//!
//! A chain is held leaf first: `links[0]` is the delegation whose delegate
//! redeems, the last link is the root granted by the original delegator.

use alloy::primitives::{Address, Bytes, B256, U256};
use thiserror::Error;

use crate::abi::{decode_delegations, encode_delegations};
use crate::builder::DelegationBuilder;
use crate::domain::{Caveat, Delegation};
use crate::hashing::delegation_hash;
use crate::ports::PortError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("delegation chain is empty")]
    Empty,
    #[error("link {index} authority {found} does not match parent hash {expected}")]
    AuthorityMismatch {
        index: usize,
        expected: B256,
        found: B256,
    },
    #[error("link {index} delegator {delegator} is not the parent's delegate {parent_delegate}")]
    DelegatorMismatch {
        index: usize,
        delegator: Address,
        parent_delegate: Address,
    },
    #[error("last link is not a root delegation")]
    MissingRoot,
    #[error("open delegations cannot be redelegated")]
    OpenParent,
}

impl From<ChainError> for PortError {
    fn from(e: ChainError) -> Self {
        PortError::Validation(e.to_string())
    }
}

/// Derives a child of `parent`: its delegate becomes the new delegator and
/// the child's authority is the parent's hash.
pub fn redelegate(
    parent: &Delegation,
    new_delegate: Address,
    caveats: Vec<Caveat>,
    salt: U256,
) -> Result<Delegation, PortError> {
    if parent.is_open() {
        return Err(ChainError::OpenParent.into());
    }
    DelegationBuilder::new(parent.delegate, new_delegate)
        .authority(delegation_hash(parent))
        .caveats(caveats)
        .salt(salt)
        .build()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationChain {
    links: Vec<Delegation>,
}

impl DelegationChain {
    /// Takes links in leaf-to-root order.
    pub fn new(links: Vec<Delegation>) -> Result<Self, ChainError> {
        let chain = Self { links };
        chain.validate()?;
        Ok(chain)
    }

    pub fn from_root(root: Delegation) -> Self {
        Self { links: vec![root] }
    }

    /// Puts `leaf` in front of the current leaf.
    pub fn extend(mut self, leaf: Delegation) -> Result<Self, ChainError> {
        self.links.insert(0, leaf);
        self.validate()?;
        Ok(self)
    }

    pub fn links(&self) -> &[Delegation] {
        &self.links
    }

    pub fn leaf(&self) -> Option<&Delegation> {
        self.links.first()
    }

    pub fn root(&self) -> Option<&Delegation> {
        self.links.last()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        let root = self.links.last().ok_or(ChainError::Empty)?;
        if !root.is_root() {
            return Err(ChainError::MissingRoot);
        }
        for (index, pair) in self.links.windows(2).enumerate() {
            let (child, parent) = (&pair[0], &pair[1]);
            let expected = delegation_hash(parent);
            if child.authority != expected {
                return Err(ChainError::AuthorityMismatch {
                    index,
                    expected,
                    found: child.authority,
                });
            }
            if !parent.is_open() && child.delegator != parent.delegate {
                return Err(ChainError::DelegatorMismatch {
                    index,
                    delegator: child.delegator,
                    parent_delegate: parent.delegate,
                });
            }
        }
        Ok(())
    }

    /// Permission context handed to `redeemDelegations`.
    pub fn permission_context(&self) -> Bytes {
        Bytes::from(encode_delegations(&self.links))
    }

    pub fn from_permission_context(data: &[u8]) -> Result<Self, PortError> {
        let links = decode_delegations(data)?;
        Ok(Self::new(links)?)
    }
}
