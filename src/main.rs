use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use cloudinv::azure::client::AzureClient;
use cloudinv::azure::resources as azure_resources;
use cloudinv::azure::subscriptions::SubscriptionSource;
use cloudinv::azure::AZURE_BACKOFF_CAP;
use cloudinv::config::{read_list_file, Config};
use cloudinv::engine::{BackoffConfig, Collection, Mode, ScopeSource};
use cloudinv::error::CollectError;
use cloudinv::gcp::auth::validate_project_id;
use cloudinv::gcp::client::GcpClient;
use cloudinv::gcp::regions::RegionSource;
use cloudinv::gcp::resources as gcp_resources;
use cloudinv::gcp::GCP_BACKOFF_CAP;
use cloudinv::inventory::build_ansible_inventory;
use cloudinv::resource::{get_resource, resource_keys, selected_keys, validate_filter, Provider};
use cloudinv::VERSION;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Default JSON dump file
const DEFAULT_DUMP_PATH: &str = "cloudinventory.json";

/// Cloud inventory collector
#[derive(Parser, Debug)]
#[command(name = "cloudinv", version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dump the inventory of a provider
    Dump(DumpArgs),
    /// Show or update saved defaults
    Config(ConfigArgs),
}

#[derive(ClapArgs, Debug)]
struct DumpArgs {
    #[command(subcommand)]
    provider: DumpProvider,

    /// Limit the dump to one resource kind (e.g. instances, vm)
    #[arg(short, long, default_value = "", global = true)]
    filter: String,

    /// File to write the JSON dump to
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Scopes fetched concurrently in the first batch; 0 or negative for all
    #[arg(short, long, global = true, allow_negative_numbers = true)]
    concurrency: Option<i64>,

    /// Record only the number of resources per scope
    #[arg(short, long, global = true)]
    stats: bool,

    /// Give up on a throttled call after sleeping this many seconds in total
    #[arg(long, global = true)]
    max_throttle_wait: Option<u64>,

    /// Abort a resource kind that takes longer than this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum DumpProvider {
    /// Dump GCP inventory (region scoped)
    Gcp(GcpArgs),
    /// Dump Azure inventory (subscription scoped)
    Azure(AzureArgs),
}

#[derive(ClapArgs, Debug)]
struct GcpArgs {
    /// GCP project to use
    #[arg(long)]
    project: Option<String>,

    /// File with whitespace-separated regions to query
    #[arg(short = 'i', long)]
    regions_file: Option<PathBuf>,

    /// Also build an Ansible inventory (instances only)
    #[arg(short, long)]
    ansible: bool,

    /// File to write the Ansible inventory to
    #[arg(long, default_value = "ansible.inv")]
    ansible_inv: PathBuf,

    /// Use private addresses instead of public ones in the Ansible inventory
    #[arg(long)]
    ansible_private: bool,
}

#[derive(ClapArgs, Debug)]
struct AzureArgs {
    /// File with whitespace-separated subscription IDs to query
    #[arg(short = 'i', long)]
    subscriptions_file: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct ConfigArgs {
    /// Default GCP project
    #[arg(long)]
    project: Option<String>,

    /// Default GCP regions, whitespace separated in a file
    #[arg(long)]
    regions_file: Option<PathBuf>,

    /// Default Azure subscription IDs, whitespace separated in a file
    #[arg(long)]
    subscriptions_file: Option<PathBuf>,

    /// Default concurrency ceiling
    #[arg(long, allow_negative_numbers = true)]
    concurrency: Option<i64>,

    /// Default dump path
    #[arg(long)]
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("cloudinv {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("cloudinv").join("cloudinv.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".cloudinv").join("cloudinv.log");
    }
    PathBuf::from("cloudinv.log")
}

/// Settings shared by every kind of one dump
struct RunSettings {
    limit: i64,
    mode: Mode,
    max_throttle_wait: Option<Duration>,
    timeout: Option<Duration>,
}

impl RunSettings {
    fn backoff(&self, cap: Duration) -> BackoffConfig {
        BackoffConfig::with_cap(cap).max_wait(self.max_throttle_wait)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;
    let config = Config::load();

    match args.command {
        Command::Dump(dump) => run_dump(dump, config).await,
        Command::Config(update) => update_config(update, config),
    }
}

async fn run_dump(args: DumpArgs, config: Config) -> Result<()> {
    let provider = match &args.provider {
        DumpProvider::Gcp(_) => Provider::Gcp,
        DumpProvider::Azure(_) => Provider::Azure,
    };

    if !validate_filter(provider, &args.filter) {
        anyhow::bail!(
            "Invalid filter selected, please select a supported {} kind: {}",
            provider,
            resource_keys(provider).join(", ")
        );
    }

    let kinds = selected_keys(provider, &args.filter);
    let settings = RunSettings {
        limit: config.effective_concurrency(args.concurrency),
        mode: if args.stats { Mode::Counts } else { Mode::Records },
        max_throttle_wait: args.max_throttle_wait.map(Duration::from_secs),
        timeout: args.timeout.map(Duration::from_secs),
    };
    let path = config
        .effective_output(args.path.as_deref())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DUMP_PATH));

    tracing::info!(
        "Dumping {} kinds {:?} with concurrency {}",
        provider,
        kinds,
        settings.limit
    );

    let (result, failed) = match args.provider {
        DumpProvider::Gcp(gcp) => dump_gcp(gcp, &config, &kinds, &settings).await?,
        DumpProvider::Azure(azure) => dump_azure(azure, &config, &kinds, &settings).await?,
    };

    println!("Dumping to {}", path.display());
    write_json(&path, &result)?;

    if failed > 0 {
        anyhow::bail!("{} of {} resource kinds could not be gathered", failed, kinds.len());
    }
    Ok(())
}

async fn dump_gcp(
    args: GcpArgs,
    config: &Config,
    kinds: &[&'static str],
    settings: &RunSettings,
) -> Result<(BTreeMap<String, Collection<Value>>, usize)> {
    let project = config
        .effective_project(args.project.as_deref())
        .context("No GCP project configured. Set GOOGLE_CLOUD_PROJECT or use --project flag")?;
    if !validate_project_id(&project) {
        anyhow::bail!("Invalid GCP project ID: {}", project);
    }
    tracing::info!("Using project: {}", project);

    let client = GcpClient::new(&project).await?;
    let regions = match &args.regions_file {
        Some(file) => read_list_file(file)?,
        None => config.regions.clone(),
    };
    let source = if regions.is_empty() {
        RegionSource::new(client)
    } else {
        RegionSource::with_regions(client, regions)
    };
    let scopes = source.enumerate().await?;

    let mut result = BTreeMap::new();
    let mut failed = 0;
    for kind in kinds {
        let run = gcp_resources::collect_kind(
            kind,
            scopes.clone(),
            settings.limit,
            settings.mode,
            settings.backoff(GCP_BACKOFF_CAP),
        );
        match gather(Provider::Gcp, kind, settings.timeout, run).await {
            Some(collection) => {
                result.insert(kind.to_string(), collection);
            }
            None => failed += 1,
        }
    }

    if args.ansible {
        write_ansible(&args, &result, settings.mode)?;
    }

    Ok((result, failed))
}

async fn dump_azure(
    args: AzureArgs,
    config: &Config,
    kinds: &[&'static str],
    settings: &RunSettings,
) -> Result<(BTreeMap<String, Collection<Value>>, usize)> {
    let client = AzureClient::from_env()?;
    let subscriptions = match &args.subscriptions_file {
        Some(file) => read_list_file(file)?,
        None => config.subscriptions.clone(),
    };
    let source = if subscriptions.is_empty() {
        SubscriptionSource::new(client)
    } else {
        SubscriptionSource::with_ids(client, subscriptions)
    };
    let scopes = source.enumerate().await?;

    let mut result = BTreeMap::new();
    let mut failed = 0;
    for kind in kinds {
        let run = azure_resources::collect_kind(
            kind,
            scopes.clone(),
            settings.limit,
            settings.mode,
            settings.backoff(AZURE_BACKOFF_CAP),
        );
        match gather(Provider::Azure, kind, settings.timeout, run).await {
            Some(collection) => {
                result.insert(kind.to_string(), collection);
            }
            None => failed += 1,
        }
    }

    Ok((result, failed))
}

/// Run one kind's collection and report how it went
async fn gather<F>(
    provider: Provider,
    kind: &str,
    timeout: Option<Duration>,
    run: F,
) -> Option<Collection<Value>>
where
    F: Future<Output = Result<Collection<Value>, CollectError>>,
{
    let display_name = get_resource(provider, kind).map_or(kind, |def| def.display_name.as_str());

    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, run).await {
            Ok(outcome) => outcome.map_err(anyhow::Error::from),
            Err(_) => Err(anyhow::anyhow!("timed out after {}s", limit.as_secs())),
        },
        None => run.await.map_err(anyhow::Error::from),
    };

    match outcome {
        Ok(collection) => {
            println!(
                "Gathered {} {} across {} {}",
                collection.total(),
                display_name,
                collection.len(),
                provider.scope_noun()
            );
            Some(collection)
        }
        Err(e) => {
            tracing::error!("Failed to gather {}: {:#}", kind, e);
            eprintln!("Failed to gather {} data: {:#}", display_name, e);
            let hint = e
                .downcast_ref::<CollectError>()
                .and_then(CollectError::api_error)
                .and_then(|api| api.hint());
            if let Some(hint) = hint {
                eprintln!("  {}", hint);
            }
            None
        }
    }
}

fn write_ansible(
    args: &GcpArgs,
    result: &BTreeMap<String, Collection<Value>>,
    mode: Mode,
) -> Result<()> {
    if mode == Mode::Counts {
        eprintln!("Skipping Ansible inventory: --stats keeps no instance records");
        return Ok(());
    }

    let inventory_kinds: Vec<_> = result
        .iter()
        .filter(|(kind, _)| get_resource(Provider::Gcp, kind).is_some_and(|def| def.inventory))
        .collect();
    if inventory_kinds.is_empty() {
        eprintln!("Skipping Ansible inventory: no instances were gathered");
        return Ok(());
    }

    println!("Building Inventory for Ansible at: {}", args.ansible_inv.display());
    let inventory: String = inventory_kinds
        .into_iter()
        .map(|(_, collection)| build_ansible_inventory(collection, args.ansible_private))
        .collect();

    std::fs::write(&args.ansible_inv, inventory)
        .with_context(|| format!("Error writing to Ansible inventory {:?}", args.ansible_inv))
}

/// Write JSON with 4-space indentation
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .context("Error marshalling JSON")?;

    std::fs::write(path, buf).with_context(|| format!("Error writing file {:?}", path))
}

fn update_config(args: ConfigArgs, mut config: Config) -> Result<()> {
    if let Some(project) = args.project {
        if !validate_project_id(&project) {
            anyhow::bail!("Invalid GCP project ID: {}", project);
        }
        config.project_id = Some(project);
    }
    if let Some(file) = args.regions_file {
        config.regions = read_list_file(&file)?;
    }
    if let Some(file) = args.subscriptions_file {
        config.subscriptions = read_list_file(&file)?;
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = Some(concurrency);
    }
    if let Some(path) = args.path {
        config.output_path = Some(path);
    }

    config.save()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    if let Some(path) = Config::config_path() {
        println!("Saved to {}", path.display());
    }
    Ok(())
}
