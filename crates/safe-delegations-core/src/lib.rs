pub mod abi;
pub mod builder;
pub mod caveats;
pub mod chain;
pub mod domain;
pub mod hashing;
pub mod orchestrator;
pub mod ports;
pub mod scope;
pub mod state_machine;

pub use builder::DelegationBuilder;
pub use caveats::{CaveatTerms, EnforcerAddressBook, EnforcerKind, TermsError};
pub use chain::{redelegate, ChainError, DelegationChain};
pub use domain::{
    Caveat, Delegation, DelegationBundle, DelegationStatus, Deployment, DisplayAmount,
    MergeResult, ScopeType, StoredDelegation, TimestampMs, ANY_DELEGATE, ROOT_AUTHORITY,
    STORE_SCHEMA_VERSION,
};
pub use hashing::{delegation_hash, domain_separator, signing_digest, typed_data, TypedDataPayload};
pub use orchestrator::{CommandResult, DelegationCommand, Orchestrator};
pub use ports::{
    ClockPort, DelegationStorePort, Execution, ManagerAbiPort, PortError, SaltPort, SignerPort,
};
pub use scope::{
    executor_link_terms, Erc20Token, PermissionScope, ScopeError, SpendingLimitConfig, SwapIntentConfig, TokenRef,
    TransferIntentConfig,
};
pub use state_machine::{
    status_transition, wizard_transition, StepTransition, Wizard, WizardAction, WizardStep,
};
