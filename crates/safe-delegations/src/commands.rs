use std::path::PathBuf;

use alloy::primitives::{Address, Bytes, B256, U256};
use eyre::{bail, eyre, Result, WrapErr};

use safe_delegations_adapters::{
    encode_share_payload, DelegationConfig, DisabledSigner, LocalSignerAdapter, ManagerAbiAdapter,
    OsSaltAdapter, StoreAdapter, SystemClockAdapter,
};
use safe_delegations_core::{
    delegation_hash, domain_separator, signing_digest, Delegation, DelegationCommand,
    DelegationStorePort, Execution, Orchestrator, PermissionScope, SignerPort,
};

use crate::cli::{
    AttachArgs, CreateArgs, ExportArgs, HashArg, HashFileArgs, ImportArgs, RedeemArgs,
    RedelegateArgs, SignArgs, StatusArgs,
};
use crate::output::{self, DecodedCaveat, HashOutput};

const DEFAULT_STORE_FILE: &str = "delegations.json";

type CliOrchestrator<Si> =
    Orchestrator<StoreAdapter, SystemClockAdapter, OsSaltAdapter, Si, ManagerAbiAdapter>;

pub struct Context {
    pub config: DelegationConfig,
    pub json: bool,
}

impl Context {
    pub fn load(config: Option<PathBuf>, store: Option<PathBuf>, json: bool) -> Result<Self> {
        let mut cfg = match config {
            Some(path) => DelegationConfig::from_json_file(&path)?,
            None => DelegationConfig::from_env()?,
        };
        if let Some(store) = store {
            cfg.store_path = Some(store);
        }
        if cfg.store_path.is_none() {
            cfg.store_path = Some(PathBuf::from(DEFAULT_STORE_FILE));
        }
        tracing::debug!(
            chain_id = cfg.deployment.chain_id,
            store = ?cfg.store_path,
            "loaded config"
        );
        Ok(Self { config: cfg, json })
    }

    fn orchestrator<Si: SignerPort>(&self, signer: Si) -> Result<CliOrchestrator<Si>> {
        let store = StoreAdapter::from_config(&self.config)?;
        Ok(Orchestrator::new(
            self.config.deployment.clone(),
            store,
            SystemClockAdapter,
            OsSaltAdapter,
            signer,
            ManagerAbiAdapter,
        ))
    }

    fn unsigned(&self) -> Result<CliOrchestrator<DisabledSigner>> {
        self.orchestrator(DisabledSigner)
    }

    fn require_deployment(&self) -> Result<()> {
        if !self.config.is_deployment_configured() {
            bail!(
                "no deployment configured; pass --config or set {}",
                safe_delegations_adapters::config::ENV_DEPLOYMENT_FILE
            );
        }
        Ok(())
    }
}

fn parse_hash(raw: &str) -> Result<B256> {
    raw.trim()
        .parse()
        .wrap_err_with(|| format!("invalid delegation hash '{raw}'"))
}

fn parse_address(field: &str, raw: &str) -> Result<Address> {
    raw.trim()
        .parse()
        .wrap_err_with(|| format!("invalid {field} address '{raw}'"))
}

/// Parses `0xTarget[:value[:0xcalldata]]`; value is in wei.
fn parse_execution(raw: &str) -> Result<Execution> {
    let mut parts = raw.splitn(3, ':');
    let target = parse_address("target", parts.next().unwrap_or_default())?;
    let value = match parts.next() {
        Some(v) if !v.is_empty() => v
            .parse::<U256>()
            .wrap_err_with(|| format!("invalid value in '{raw}'"))?,
        _ => U256::ZERO,
    };
    let call_data = match parts.next() {
        Some(d) if !d.is_empty() => d
            .parse::<Bytes>()
            .wrap_err_with(|| format!("invalid calldata in '{raw}'"))?,
        _ => Bytes::new(),
    };
    Ok(Execution {
        target,
        value,
        call_data,
    })
}

pub fn create(ctx: &Context, args: CreateArgs) -> Result<()> {
    ctx.require_deployment()?;
    let raw = std::fs::read_to_string(&args.scope)
        .wrap_err_with(|| format!("reading {}", args.scope.display()))?;
    let scope: PermissionScope = serde_json::from_str(&raw).wrap_err("invalid scope JSON")?;
    let result = ctx.unsigned()?.handle(DelegationCommand::Create {
        scope,
        delegator: parse_address("delegator", &args.delegator)?,
        delegate: parse_address("delegate", &args.delegate)?,
        label: args.label,
    })?;
    let record = result.record.ok_or_else(|| eyre!("create returned no record"))?;
    tracing::info!(hash = %record.delegation_hash, "created delegation");
    if ctx.json {
        return output::print_json(&serde_json::json!({
            "record": record,
            "typedData": result.typed_data,
        }));
    }
    output::print_record(&record, false)
}

pub fn redelegate(ctx: &Context, args: RedelegateArgs) -> Result<()> {
    ctx.require_deployment()?;
    let result = ctx.unsigned()?.handle(DelegationCommand::Redelegate {
        parent_hash: parse_hash(&args.parent)?,
        executor: parse_address("executor", &args.executor)?,
        label: args.label,
    })?;
    let record = result
        .record
        .ok_or_else(|| eyre!("redelegate returned no record"))?;
    output::print_record(&record, ctx.json)
}

pub fn typed_data(ctx: &Context, args: HashArg) -> Result<()> {
    let payload = ctx.unsigned()?.signing_request(parse_hash(&args.hash)?)?;
    output::print_json(&payload)
}

pub fn attach(ctx: &Context, args: AttachArgs) -> Result<()> {
    let signature: Bytes = args
        .signature
        .trim()
        .parse()
        .wrap_err("signature must be hex")?;
    let result = ctx.unsigned()?.handle(DelegationCommand::AttachSignature {
        delegation_hash: parse_hash(&args.hash)?,
        signature,
    })?;
    let record = result.record.ok_or_else(|| eyre!("attach returned no record"))?;
    output::print_record(&record, ctx.json)
}

pub fn sign(ctx: &Context, args: SignArgs) -> Result<()> {
    let signer = LocalSignerAdapter::from_hex(&args.private_key)?;
    let result = ctx.orchestrator(signer)?.handle(DelegationCommand::Sign {
        delegation_hash: parse_hash(&args.hash)?,
    })?;
    let record = result.record.ok_or_else(|| eyre!("sign returned no record"))?;
    tracing::info!(hash = %record.delegation_hash, "signed delegation");
    output::print_record(&record, ctx.json)
}

pub fn hash(ctx: &Context, args: HashFileArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.file)
        .wrap_err_with(|| format!("reading {}", args.file.display()))?;
    let delegation: Delegation = serde_json::from_str(&raw).wrap_err("invalid delegation JSON")?;
    let deployment = &ctx.config.deployment;
    HashOutput {
        delegation_hash: delegation_hash(&delegation),
        signing_digest: signing_digest(
            &delegation,
            deployment.chain_id,
            deployment.delegation_manager,
        ),
        domain_separator: domain_separator(deployment.chain_id, deployment.delegation_manager),
    }
    .print(ctx.json)
}

pub fn decode(ctx: &Context, args: HashArg) -> Result<()> {
    let hash = parse_hash(&args.hash)?;
    let store = StoreAdapter::from_config(&ctx.config)?;
    let record = store
        .get(hash)?
        .ok_or_else(|| eyre!("delegation not found: {hash}"))?;
    let book = &ctx.config.deployment.enforcers;
    let decoded: Vec<DecodedCaveat> = record
        .delegation
        .caveats
        .iter()
        .map(|c| match book.decode_caveat(c) {
            Ok(terms) => DecodedCaveat {
                enforcer: c.enforcer,
                terms: Some(terms),
                error: None,
            },
            Err(e) => DecodedCaveat {
                enforcer: c.enforcer,
                terms: None,
                error: Some(e.to_string()),
            },
        })
        .collect();
    output::print_caveats(&decoded, ctx.json)
}

pub fn list(ctx: &Context) -> Result<()> {
    let store = StoreAdapter::from_config(&ctx.config)?;
    output::print_list(&store.list()?, ctx.json)
}

pub fn status(ctx: &Context, args: StatusArgs) -> Result<()> {
    let result = ctx.unsigned()?.handle(DelegationCommand::UpdateStatus {
        delegation_hash: parse_hash(&args.hash)?,
        status: args.status.into(),
    })?;
    let record = result.record.ok_or_else(|| eyre!("status returned no record"))?;
    output::print_record(&record, ctx.json)
}

pub fn sweep(ctx: &Context) -> Result<()> {
    let result = ctx.unsigned()?.handle(DelegationCommand::SweepExpired)?;
    if ctx.json {
        return output::print_json(&result.changed);
    }
    println!("Expired: {}", result.changed.len());
    for hash in result.changed {
        println!("  {hash}");
    }
    Ok(())
}

pub fn remove(ctx: &Context, args: HashArg) -> Result<()> {
    let hash = parse_hash(&args.hash)?;
    ctx.unsigned()?
        .handle(DelegationCommand::Remove {
            delegation_hash: hash,
        })?;
    tracing::info!(%hash, "removed delegation");
    Ok(())
}

pub fn export(ctx: &Context, args: ExportArgs) -> Result<()> {
    let hashes = args
        .hashes
        .iter()
        .map(|h| parse_hash(h))
        .collect::<Result<Vec<_>>>()?;
    let bundle = ctx
        .unsigned()?
        .handle(DelegationCommand::Export { hashes })?
        .bundle
        .ok_or_else(|| eyre!("export returned no bundle"))?;
    let text = if args.share {
        encode_share_payload(&bundle)?
    } else {
        serde_json::to_string_pretty(&bundle)?
    };
    match args.out {
        Some(path) => {
            std::fs::write(&path, text).wrap_err_with(|| format!("writing {}", path.display()))?;
            tracing::info!(
                count = bundle.delegations.len(),
                path = %path.display(),
                "exported delegations"
            );
        }
        None => println!("{text}"),
    }
    Ok(())
}

pub fn import(ctx: &Context, args: ImportArgs) -> Result<()> {
    let store = StoreAdapter::from_config(&ctx.config)?;
    let merge = match (args.share, args.file) {
        (Some(payload), _) => store.import_share_payload(&payload)?,
        (None, Some(path)) => {
            let raw = std::fs::read_to_string(&path)
                .wrap_err_with(|| format!("reading {}", path.display()))?;
            store.import_json(&raw)?
        }
        (None, None) => bail!("nothing to import"),
    };
    output::print_merge(&merge, ctx.json)
}

pub fn redeem(ctx: &Context, args: RedeemArgs) -> Result<()> {
    ctx.require_deployment()?;
    let executions = args
        .calls
        .iter()
        .map(|c| parse_execution(c))
        .collect::<Result<Vec<_>>>()?;
    let calldata = ctx
        .unsigned()?
        .handle(DelegationCommand::RedeemCalldata {
            leaf_hash: parse_hash(&args.leaf)?,
            executions,
        })?
        .calldata
        .ok_or_else(|| eyre!("redeem returned no calldata"))?;
    output::print_calldata(ctx.config.deployment.delegation_manager, &calldata, ctx.json)
}

pub fn disable(ctx: &Context, args: HashArg) -> Result<()> {
    ctx.require_deployment()?;
    let calldata = ctx
        .unsigned()?
        .handle(DelegationCommand::DisableCalldata {
            delegation_hash: parse_hash(&args.hash)?,
        })?
        .calldata
        .ok_or_else(|| eyre!("disable returned no calldata"))?;
    output::print_calldata(ctx.config.deployment.delegation_manager, &calldata, ctx.json)
}
