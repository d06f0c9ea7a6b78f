use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use catalog_filter::{select_matching, Predicate, PredicateNode};
use catalog_session::{
    CatalogConfig, ErrorKind, RecordSource, RepositoryId, ResourceId, SecureString, SessionClient,
    SessionError,
};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "catalog")]
#[command(about = "Bulk filtering against an archival catalog API")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Raise log verbosity on stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct ConnectionArgs {
    /// YAML file holding `base_url`, `username` and `request` settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    url: Option<String>,
    #[arg(long, global = true)]
    username: Option<String>,
    /// File whose first line is the password
    #[arg(long, global = true)]
    password_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Establish a session and report success
    Check,
    /// Fetch resources and print the ids accepted by a filter
    Select(SelectArgs),
    Filter {
        #[command(subcommand)]
        command: FilterCommand,
    },
}

#[derive(Debug, Args)]
struct SelectArgs {
    #[arg(long)]
    repo: RepositoryId,
    #[arg(long, value_delimiter = ',', required = true)]
    ids: Vec<ResourceId>,
    #[arg(long)]
    filter: PathBuf,
}

#[derive(Debug, Subcommand)]
enum FilterCommand {
    /// Validate a filter file and print its expression
    Show {
        #[arg(long)]
        filter: PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = if verbose > 0 {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn emit_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(args: &ConnectionArgs) -> Result<CatalogConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_yaml::from_str(&raw)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => CatalogConfig::default(),
    };
    if let Some(url) = &args.url {
        config.base_url.clone_from(url);
    }
    if let Some(username) = &args.username {
        config.username.clone_from(username);
    }
    Ok(config)
}

fn load_password(path: Option<&Path>) -> Result<SecureString> {
    let Some(path) = path else {
        return Ok(SecureString::default());
    };
    let raw = SecureString::new(
        fs::read_to_string(path)
            .with_context(|| format!("failed to read password file {}", path.display()))?,
    );
    Ok(SecureString::from(raw.as_str().lines().next().unwrap_or_default().trim()))
}

fn load_filter(path: &Path) -> Result<PredicateNode> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read filter {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let filter = if is_json {
        serde_json::from_str(&raw).with_context(|| format!("invalid filter {}", path.display()))?
    } else {
        serde_yaml::from_str(&raw).with_context(|| format!("invalid filter {}", path.display()))?
    };
    Ok(filter)
}

fn connect(args: &ConnectionArgs) -> Result<SessionClient> {
    let config = load_config(args)?;
    let password = load_password(args.password_file.as_deref())?;
    let mut client = SessionClient::from_config(&config, password);
    client.establish()?;
    Ok(client)
}

fn run_check(args: &ConnectionArgs) -> Result<ExitCode> {
    let client = connect(args)?;
    emit_json(&json!({
        "connected": client.is_validated(),
        "address": client.state().address(),
    }))?;
    Ok(ExitCode::SUCCESS)
}

/// Ids in first-seen order with repeats dropped
fn unique_ids(ids: &[ResourceId]) -> Vec<ResourceId> {
    let mut seen = BTreeSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn run_select(connection: &ConnectionArgs, args: &SelectArgs) -> Result<ExitCode> {
    let filter = load_filter(&args.filter)?;
    if !filter.validate() {
        anyhow::bail!("filter {} is not well formed: {filter}", args.filter.display());
    }
    let ids = unique_ids(&args.ids);
    let client = connect(connection)?;
    let records = client
        .fetch_many(args.repo, &ids)
        .with_context(|| format!("failed to fetch resources from repository {}", args.repo))?;
    debug!(fetched = records.len(), "evaluating filter");

    let ordered = ids
        .iter()
        .filter_map(|id| records.get(id).map(|record| (*id, record)));
    let matched = select_matching(&filter, ordered);
    emit_json(&json!({
        "repository": args.repo,
        "filter": filter.to_expression(),
        "matched": matched,
        "total": ids.len(),
    }))?;
    Ok(ExitCode::SUCCESS)
}

fn run_filter_show(path: &Path) -> Result<ExitCode> {
    let filter = load_filter(path)?;
    let valid = filter.validate();
    emit_json(&json!({
        "valid": valid,
        "serialized": filter.to_expression(),
    }))?;
    Ok(if valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Check => run_check(&cli.connection),
        Command::Select(args) => run_select(&cli.connection, &args),
        Command::Filter {
            command: FilterCommand::Show { filter },
        } => run_filter_show(&filter),
    }
}

fn hint(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Configuration => "check --url, --username and --password-file",
        ErrorKind::Authentication => "the catalog rejected the credentials or the request",
        ErrorKind::Network => "the catalog could not be reached; check the address and try again",
        ErrorKind::Server => "the catalog reported an internal error",
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            let session_error = err
                .chain()
                .find_map(|cause| cause.downcast_ref::<SessionError>());
            if let Some(session_error) = session_error {
                if let Some(kind) = session_error.kind() {
                    eprintln!("hint ({kind}): {}", hint(kind));
                }
                if session_error.is_retryable() {
                    eprintln!("hint: the failure looks transient; running the command again may succeed");
                }
            }
            ExitCode::FAILURE
        }
    }
}
