use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use safe_delegations_core::DelegationStatus;

#[derive(Parser)]
#[command(name = "safe-delegations")]
#[command(about = "Build, sign and redeem ERC-7710 delegations for Safe accounts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config JSON file (deployment, store path, import limits)
    #[arg(long, global = true, env = "SAFE_DELEGATIONS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Delegation store file, overrides the config
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a pending delegation from a permission scope JSON file
    Create(CreateArgs),

    /// Redelegate a stored delegation to an executor contract
    Redelegate(RedelegateArgs),

    /// Print the eth_signTypedData_v4 payload for a stored delegation
    TypedData(HashArg),

    /// Attach a signature produced elsewhere
    Attach(AttachArgs),

    /// Sign with a local private key (the delegator must be that key's account)
    Sign(SignArgs),

    /// Compute hash and signing digest of a delegation JSON file
    Hash(HashFileArgs),

    /// Decode the caveats of a stored delegation
    Decode(HashArg),

    /// List stored delegations
    List,

    /// Move a stored delegation to a new status
    Status(StatusArgs),

    /// Mark signed delegations whose timestamp window has closed as expired
    Sweep,

    /// Forget a stored delegation
    Remove(HashArg),

    /// Export delegations as a bundle
    Export(ExportArgs),

    /// Import an exported bundle or share payload
    Import(ImportArgs),

    /// Build redeemDelegations calldata for a signed chain
    Redeem(RedeemArgs),

    /// Build disableDelegation calldata
    Disable(HashArg),
}

#[derive(Parser, Clone)]
pub struct HashArg {
    /// Delegation hash
    #[arg(value_name = "HASH")]
    pub hash: String,
}

#[derive(Parser, Clone)]
pub struct CreateArgs {
    /// Permission scope JSON file
    #[arg(long)]
    pub scope: PathBuf,

    /// Safe granting the permission
    #[arg(long, env = "SAFE_ADDRESS")]
    pub delegator: String,

    /// Account receiving the permission
    #[arg(long)]
    pub delegate: String,

    #[arg(long, default_value = "")]
    pub label: String,
}

#[derive(Parser, Clone)]
pub struct RedelegateArgs {
    /// Parent delegation hash
    #[arg(value_name = "PARENT")]
    pub parent: String,

    /// Executor contract allowed to redeem
    #[arg(long)]
    pub executor: String,

    #[arg(long)]
    pub label: Option<String>,
}

#[derive(Parser, Clone)]
pub struct AttachArgs {
    #[arg(value_name = "HASH")]
    pub hash: String,

    /// Hex encoded signature
    #[arg(value_name = "SIGNATURE")]
    pub signature: String,
}

#[derive(Parser, Clone)]
pub struct SignArgs {
    #[arg(value_name = "HASH")]
    pub hash: String,

    /// Hex private key of the delegator
    #[arg(long, env = "SAFE_DELEGATIONS_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,
}

#[derive(Parser, Clone)]
pub struct HashFileArgs {
    /// Delegation JSON file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Parser, Clone)]
pub struct StatusArgs {
    #[arg(value_name = "HASH")]
    pub hash: String,

    #[arg(value_name = "STATUS", value_enum)]
    pub status: StatusArg,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Pending,
    Signed,
    Revoked,
    Expired,
}

impl From<StatusArg> for DelegationStatus {
    fn from(s: StatusArg) -> Self {
        match s {
            StatusArg::Pending => DelegationStatus::Pending,
            StatusArg::Signed => DelegationStatus::Signed,
            StatusArg::Revoked => DelegationStatus::Revoked,
            StatusArg::Expired => DelegationStatus::Expired,
        }
    }
}

#[derive(Parser, Clone)]
pub struct ExportArgs {
    /// Hashes to export; all delegations when empty
    #[arg(value_name = "HASH")]
    pub hashes: Vec<String>,

    /// Write the bundle to a file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Emit a base64url share payload
    #[arg(long)]
    pub share: bool,
}

#[derive(Parser, Clone)]
pub struct ImportArgs {
    /// Exported bundle file
    #[arg(value_name = "FILE", required_unless_present = "share")]
    pub file: Option<PathBuf>,

    /// Base64url share payload
    #[arg(long, conflicts_with = "file")]
    pub share: Option<String>,
}

#[derive(Parser, Clone)]
pub struct RedeemArgs {
    /// Leaf delegation hash
    #[arg(value_name = "LEAF")]
    pub leaf: String,

    /// Execution (format: "0xTarget[:value[:0xcalldata]]")
    #[arg(long = "call", value_name = "CALL", required = true)]
    pub calls: Vec<String>,
}
