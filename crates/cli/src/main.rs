use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use uast_dev_cli::{print_stdout, HttpBackend, SessionOp, DEFAULT_SERVER};
use uast_dev_mappings::{CustomMappingStore, Language, MappingField, MappingRegistry};
use uast_dev_protocol::{pretty_json, wire_schemas};
use uast_dev_session::{SessionConfig, SessionController, SessionServices, SessionSnapshot};

#[derive(Parser)]
#[command(name = "uast-dev")]
#[command(about = "Edit UAST mappings and watch parse and query results", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Development server base URL
    #[arg(long, global = true, env = "UAST_DEV_SERVER", default_value = DEFAULT_SERVER)]
    server: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Parse debounce in milliseconds (overrides UAST_DEV_PARSE_DEBOUNCE_MS)
    #[arg(long, global = true)]
    parse_debounce_ms: Option<u64>,

    /// Query debounce in milliseconds (overrides UAST_DEV_QUERY_DEBOUNCE_MS)
    #[arg(long, global = true)]
    query_debounce_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// List languages with an embedded mapping
    Languages(LanguagesArgs),

    /// Print the embedded mapping of a language
    Mapping(MappingArgs),

    /// Parse code once, optionally query the tree, and print the results
    Parse(ParseArgs),

    /// Interactive session: JSON ops on stdin, one JSON snapshot per line on stdout
    Session,

    /// Print JSON Schemas of the server request and response bodies
    Schema,
}

#[derive(Args)]
struct LanguagesArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct MappingArgs {
    language: String,
}

#[derive(Args)]
struct ParseArgs {
    #[arg(short, long)]
    language: String,

    /// Read code from a file
    #[arg(short, long, conflicts_with = "code", required_unless_present = "code")]
    file: Option<PathBuf>,

    /// Inline code
    #[arg(short, long)]
    code: Option<String>,

    /// Query to run against the parsed tree
    #[arg(short, long)]
    query: Option<String>,

    /// Custom mapping DSL file to parse with instead of the embedded mapping
    #[arg(short, long)]
    mapping: Option<PathBuf>,

    /// Output the full session snapshot as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = SessionConfig::from_env();
    if let Some(ms) = cli.parse_debounce_ms {
        config = config.with_parse_debounce(Duration::from_millis(ms));
    }
    if let Some(ms) = cli.query_debounce_ms {
        config = config.with_query_debounce(Duration::from_millis(ms));
    }

    match cli.command {
        Commands::Languages(args) => run_languages(&cli.server, args).await?,
        Commands::Mapping(args) => run_mapping(&cli.server, args).await?,
        Commands::Parse(args) => run_parse(&cli.server, config, args).await?,
        Commands::Session => run_session(&cli.server, config).await?,
        Commands::Schema => print_stdout(&pretty_json(&wire_schemas()))?,
    }

    Ok(())
}

fn connect(server: &str) -> Result<Arc<HttpBackend>> {
    let backend = HttpBackend::new(server).context("Failed to set up HTTP backend")?;
    Ok(Arc::new(backend))
}

fn start_session(backend: Arc<HttpBackend>, config: SessionConfig) -> SessionController {
    let services = SessionServices {
        registry: Arc::new(MappingRegistry::new(backend.clone())),
        parser: backend.clone(),
        querier: backend,
    };
    SessionController::start(services, CustomMappingStore::new(), config)
}

async fn run_languages(server: &str, args: LanguagesArgs) -> Result<()> {
    let registry = MappingRegistry::new(connect(server)?);
    let catalog = registry
        .list_languages()
        .await
        .with_context(|| format!("Failed to load mappings from {server}"))?;
    let options = catalog.formatted_languages();

    if args.json {
        print_stdout(&serde_json::to_string_pretty(&options)?)?;
        return Ok(());
    }
    for option in options {
        print_stdout(&format!("{:<24} {}", option.label, option.value))?;
    }
    Ok(())
}

async fn run_mapping(server: &str, args: MappingArgs) -> Result<()> {
    let registry = MappingRegistry::new(connect(server)?);
    let language = Language::from(args.language);
    let Some(mapping) = registry
        .load_baseline(&language)
        .await
        .with_context(|| format!("Failed to load mapping for {language}"))?
    else {
        bail!("No embedded mapping for {language}");
    };
    info!("{} ({})", mapping.name, mapping.extensions.join(", "));
    print_stdout(&mapping.body)?;
    Ok(())
}

async fn run_parse(server: &str, config: SessionConfig, args: ParseArgs) -> Result<()> {
    let code = match (&args.file, args.code) {
        (Some(path), _) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, Some(code)) => code,
        (None, None) => bail!("Either --file or --code is required"),
    };

    let controller = start_session(connect(server)?, config);
    controller.set_language(args.language.as_str())?;
    if let Some(path) = &args.mapping {
        select_mapping_file(&controller, path).await?;
    }
    // Parse once, with the baseline or custom mapping already in place.
    controller.mapping_resolved().await?;
    controller.set_code(code)?;
    if let Some(query) = &args.query {
        controller.set_query(query.as_str())?;
    }
    controller.retry_parse()?;

    let snapshot = controller.settled().await?;
    if args.json {
        print_stdout(&serde_json::to_string_pretty(&snapshot)?)?;
    } else {
        print_stdout(&snapshot.tree.render())?;
        if args.query.is_some() {
            print_stdout(&snapshot.query_result.render())?;
        }
    }

    if let Some(err) = snapshot.tree.error() {
        bail!("Parse failed: {err}");
    }
    if let Some(err) = snapshot.query_result.error() {
        bail!("Query failed: {err}");
    }
    Ok(())
}

async fn select_mapping_file(controller: &SessionController, path: &Path) -> Result<()> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read mapping {}", path.display()))?;
    let entry = controller.create_custom(true).await?;
    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
        controller.update_custom(entry.id, MappingField::Name(stem.to_string()))?;
    }
    controller.update_custom(entry.id, MappingField::Body(body))?;
    Ok(())
}

async fn run_session(server: &str, config: SessionConfig) -> Result<()> {
    let controller = start_session(connect(server)?, config);
    print_snapshot(&controller.settled().await?)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let op = match SessionOp::parse_line(&line) {
            Ok(op) => op,
            Err(err) => {
                warn!("Ignoring invalid op: {err}");
                print_stdout(&serde_json::json!({ "error": err.to_string() }).to_string())?;
                continue;
            }
        };
        op.apply(&controller).await?;
        print_snapshot(&controller.settled().await?)?;
    }

    controller.shutdown()?;
    Ok(())
}

fn print_snapshot(snapshot: &SessionSnapshot) -> Result<()> {
    print_stdout(&serde_json::to_string(snapshot)?)?;
    Ok(())
}
