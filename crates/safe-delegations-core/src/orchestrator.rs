use alloy::primitives::{Address, Bytes, B256};

use crate::builder::DelegationBuilder;
use crate::caveats::CaveatTerms;
use crate::chain::{redelegate, DelegationChain};
use crate::domain::{
    DelegationBundle, DelegationStatus, Deployment, MergeResult, ScopeType, StoredDelegation,
    TimestampMs, STORE_SCHEMA_VERSION,
};
use crate::hashing::{delegation_hash, signing_digest, typed_data, TypedDataPayload};
use crate::ports::{
    ClockPort, DelegationStorePort, Execution, ManagerAbiPort, PortError, SaltPort, SignerPort,
};
use crate::scope::{executor_link_terms, PermissionScope};
use crate::state_machine::status_transition;

#[derive(Debug, Clone)]
pub enum DelegationCommand {
    Create {
        scope: PermissionScope,
        delegator: Address,
        delegate: Address,
        label: String,
    },
    Redelegate {
        parent_hash: B256,
        executor: Address,
        label: Option<String>,
    },
    AttachSignature {
        delegation_hash: B256,
        signature: Bytes,
    },
    Sign {
        delegation_hash: B256,
    },
    UpdateStatus {
        delegation_hash: B256,
        status: DelegationStatus,
    },
    SweepExpired,
    Remove {
        delegation_hash: B256,
    },
    Export {
        hashes: Vec<B256>,
    },
    Import {
        bundle: DelegationBundle,
    },
    RedeemCalldata {
        leaf_hash: B256,
        executions: Vec<Execution>,
    },
    DisableCalldata {
        delegation_hash: B256,
    },
}

#[derive(Debug, Clone, Default)]
pub struct CommandResult {
    pub record: Option<StoredDelegation>,
    pub typed_data: Option<TypedDataPayload>,
    pub merge: Option<MergeResult>,
    pub bundle: Option<DelegationBundle>,
    pub calldata: Option<Bytes>,
    pub changed: Vec<B256>,
}

impl CommandResult {
    fn empty() -> Self {
        Self::default()
    }

    fn record(record: StoredDelegation) -> Self {
        Self {
            record: Some(record),
            ..Self::default()
        }
    }
}

pub struct Orchestrator<St, C, Sa, Si, M>
where
    St: DelegationStorePort,
    C: ClockPort,
    Sa: SaltPort,
    Si: SignerPort,
    M: ManagerAbiPort,
{
    pub deployment: Deployment,
    pub store: St,
    pub clock: C,
    pub salts: Sa,
    pub signer: Si,
    pub manager: M,
}

impl<St, C, Sa, Si, M> Orchestrator<St, C, Sa, Si, M>
where
    St: DelegationStorePort,
    C: ClockPort,
    Sa: SaltPort,
    Si: SignerPort,
    M: ManagerAbiPort,
{
    pub fn new(
        deployment: Deployment,
        store: St,
        clock: C,
        salts: Sa,
        signer: Si,
        manager: M,
    ) -> Self {
        Self {
            deployment,
            store,
            clock,
            salts,
            signer,
            manager,
        }
    }

    pub fn handle(&self, command: DelegationCommand) -> Result<CommandResult, PortError> {
        match command {
            DelegationCommand::Create {
                scope,
                delegator,
                delegate,
                label,
            } => self.create_internal(scope, delegator, delegate, label),
            DelegationCommand::Redelegate {
                parent_hash,
                executor,
                label,
            } => self.redelegate_internal(parent_hash, executor, label),
            DelegationCommand::AttachSignature {
                delegation_hash,
                signature,
            } => self.attach_signature_internal(delegation_hash, signature),
            DelegationCommand::Sign { delegation_hash } => {
                let record = self.load(delegation_hash)?;
                let signer = self.signer.address()?;
                if signer != record.delegation.delegator {
                    return Err(PortError::Validation(format!(
                        "signer {signer} is not the delegator {}",
                        record.delegation.delegator
                    )));
                }
                let digest = self.digest_of(&record);
                let signature = self.signer.sign_digest(digest)?;
                self.attach_signature_internal(delegation_hash, signature)
            }
            DelegationCommand::UpdateStatus {
                delegation_hash,
                status,
            } => {
                let record = self.load(delegation_hash)?;
                status_transition(record.status, status)?;
                let now = self.clock.now_ms()?;
                let updated = self.store.update_status(delegation_hash, status, now)?;
                Ok(CommandResult::record(updated))
            }
            DelegationCommand::SweepExpired => self.sweep_expired_internal(),
            DelegationCommand::Remove { delegation_hash } => {
                if !self.store.remove(delegation_hash)? {
                    return Err(PortError::NotFound(format!(
                        "delegation not found: {delegation_hash}"
                    )));
                }
                Ok(CommandResult {
                    changed: vec![delegation_hash],
                    ..CommandResult::empty()
                })
            }
            DelegationCommand::Export { hashes } => {
                let now = self.clock.now_ms()?;
                let bundle = self.store.export_bundle(&hashes, now)?;
                Ok(CommandResult {
                    bundle: Some(bundle),
                    ..CommandResult::empty()
                })
            }
            DelegationCommand::Import { bundle } => {
                let merge = self.store.import_bundle(&bundle)?;
                Ok(CommandResult {
                    merge: Some(merge),
                    ..CommandResult::empty()
                })
            }
            DelegationCommand::RedeemCalldata {
                leaf_hash,
                executions,
            } => {
                let chain = self.chain_for(leaf_hash)?;
                let calldata = self
                    .manager
                    .redeem_calldata(&[chain.links().to_vec()], &[executions])?;
                Ok(CommandResult {
                    calldata: Some(calldata),
                    ..CommandResult::empty()
                })
            }
            DelegationCommand::DisableCalldata { delegation_hash } => {
                let record = self.load(delegation_hash)?;
                let calldata = self.manager.disable_calldata(&record.delegation)?;
                Ok(CommandResult {
                    calldata: Some(calldata),
                    ..CommandResult::empty()
                })
            }
        }
    }

    fn load(&self, delegation_hash: B256) -> Result<StoredDelegation, PortError> {
        self.store
            .get(delegation_hash)?
            .ok_or_else(|| PortError::NotFound(format!("delegation not found: {delegation_hash}")))
    }

    fn digest_of(&self, record: &StoredDelegation) -> B256 {
        signing_digest(
            &record.delegation,
            record.chain_id,
            self.deployment.delegation_manager,
        )
    }

    fn typed_data_of(&self, record: &StoredDelegation) -> TypedDataPayload {
        typed_data(
            &record.delegation,
            record.chain_id,
            self.deployment.delegation_manager,
        )
    }

    fn save_new(&self, record: StoredDelegation) -> Result<CommandResult, PortError> {
        if self.store.get(record.delegation_hash)?.is_some() {
            return Err(PortError::Conflict(format!(
                "delegation already stored: {}",
                record.delegation_hash
            )));
        }
        self.store.save(&record)?;
        let typed = self.typed_data_of(&record);
        Ok(CommandResult {
            record: Some(record),
            typed_data: Some(typed),
            ..CommandResult::empty()
        })
    }

    fn create_internal(
        &self,
        scope: PermissionScope,
        delegator: Address,
        delegate: Address,
        label: String,
    ) -> Result<CommandResult, PortError> {
        let now = TimestampMs(self.clock.now_ms()?);
        let caveats = scope.caveats(&self.deployment.enforcers, delegator, now.as_secs())?;
        let delegation = DelegationBuilder::new(delegator, delegate)
            .caveats(caveats)
            .build_with(&self.salts)?;
        let hash = delegation_hash(&delegation);
        let record = StoredDelegation {
            schema_version: STORE_SCHEMA_VERSION,
            id: hash.to_string(),
            label,
            scope_type: scope.scope_type(),
            chain_id: self.deployment.chain_id,
            status: DelegationStatus::Pending,
            delegation,
            delegation_hash: hash,
            parent_hash: None,
            amounts: scope.display_amounts()?,
            created_at_ms: now,
            updated_at_ms: now,
        };
        self.save_new(record)
    }

    fn redelegate_internal(
        &self,
        parent_hash: B256,
        executor: Address,
        label: Option<String>,
    ) -> Result<CommandResult, PortError> {
        let parent = self.load(parent_hash)?;
        if parent.status != DelegationStatus::Pending && parent.status != DelegationStatus::Signed
        {
            return Err(PortError::Validation(format!(
                "cannot redelegate a {:?} delegation",
                parent.status
            )));
        }
        if parent.scope_type != ScopeType::SwapIntent {
            return Err(PortError::Validation(format!(
                "only swap intents can be redelegated to an executor, not {}",
                parent.scope_type.as_str()
            )));
        }

        let book = &self.deployment.enforcers;
        let parent_terms: Vec<CaveatTerms> = parent
            .delegation
            .caveats
            .iter()
            .filter_map(|c| book.decode_caveat(c).ok())
            .collect();
        let caveats = executor_link_terms(executor, &parent_terms)
            .iter()
            .map(|t| book.caveat(t))
            .collect::<Result<Vec<_>, _>>()?;

        let child = redelegate(&parent.delegation, executor, caveats, self.salts.next_salt()?)?;
        let hash = delegation_hash(&child);
        let now = TimestampMs(self.clock.now_ms()?);
        let record = StoredDelegation {
            schema_version: STORE_SCHEMA_VERSION,
            id: hash.to_string(),
            label: label.unwrap_or_else(|| format!("{} (executor)", parent.label)),
            scope_type: ScopeType::SwapExecution,
            chain_id: parent.chain_id,
            status: DelegationStatus::Pending,
            delegation: child,
            delegation_hash: hash,
            parent_hash: Some(parent_hash),
            amounts: parent.amounts.clone(),
            created_at_ms: now,
            updated_at_ms: now,
        };
        self.save_new(record)
    }

    fn attach_signature_internal(
        &self,
        delegation_hash: B256,
        signature: Bytes,
    ) -> Result<CommandResult, PortError> {
        if signature.is_empty() {
            return Err(PortError::Validation("signature is empty".to_owned()));
        }
        let mut record = self.load(delegation_hash)?;
        if record.status == DelegationStatus::Signed && record.delegation.signature == signature {
            return Ok(CommandResult::record(record));
        }
        if let Some(parent_hash) = record.parent_hash {
            let parent = self.load(parent_hash)?;
            if parent.status != DelegationStatus::Signed {
                return Err(PortError::Validation(format!(
                    "parent delegation {parent_hash} is not signed"
                )));
            }
        }

        record.status = status_transition(record.status, DelegationStatus::Signed)?;
        record.delegation.signature = signature;
        record.updated_at_ms = TimestampMs(self.clock.now_ms()?);
        self.store.save(&record)?;
        Ok(CommandResult::record(record))
    }

    fn sweep_expired_internal(&self) -> Result<CommandResult, PortError> {
        let now_ms = self.clock.now_ms()?;
        let now_secs = TimestampMs(now_ms).as_secs();
        let book = &self.deployment.enforcers;
        let mut changed = Vec::new();
        for record in self.store.list()? {
            if record.status != DelegationStatus::Signed {
                continue;
            }
            let expired = record.delegation.caveats.iter().any(|c| {
                matches!(
                    book.decode_caveat(c),
                    Ok(CaveatTerms::Timestamp { before_threshold, .. })
                        if before_threshold != 0 && before_threshold <= u128::from(now_secs)
                )
            });
            if expired {
                self.store
                    .update_status(record.delegation_hash, DelegationStatus::Expired, now_ms)?;
                changed.push(record.delegation_hash);
            }
        }
        Ok(CommandResult {
            changed,
            ..CommandResult::empty()
        })
    }

    /// Walks `parent_hash` links from `leaf_hash` up to the root.
    pub fn chain_for(&self, leaf_hash: B256) -> Result<DelegationChain, PortError> {
        let mut links = Vec::new();
        let mut next = Some(leaf_hash);
        while let Some(hash) = next {
            if links.len() > 16 {
                return Err(PortError::Validation("delegation chain too deep".to_owned()));
            }
            let record = self.load(hash)?;
            if record.status != DelegationStatus::Signed {
                return Err(PortError::Validation(format!(
                    "delegation {hash} is {:?}, not signed",
                    record.status
                )));
            }
            next = record.parent_hash;
            links.push(record.delegation);
        }
        Ok(DelegationChain::new(links)?)
    }

    pub fn signing_request(&self, delegation_hash: B256) -> Result<TypedDataPayload, PortError> {
        let record = self.load(delegation_hash)?;
        Ok(self.typed_data_of(&record))
    }
}
