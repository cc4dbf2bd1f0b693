//! sfc-renderer: Service function chain path renderer
//!
//! This is the command-line entry point. It loads a configuration file,
//! renders every configured path request against the configured topology,
//! and prints the rendered paths with their first hops as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Render the paths of the default configuration file
//! ./sfc-renderer
//!
//! # Render with a custom configuration
//! ./sfc-renderer -c /path/to/config.json
//!
//! # Run with environment overrides
//! SFC_RENDERER_POLICY=shortest_path ./sfc-renderer -c config.json
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use sfc_renderer::chain::RenderedPathBuilder;
use sfc_renderer::config::{load_config_with_env, Config};
use sfc_renderer::model::{FirstHop, RenderedPaths};
use sfc_renderer::store::{MemoryDefinitions, MemoryStateStore};

/// Command-line arguments
struct Args {
    /// Configuration file path
    config_path: PathBuf,
    /// Generate default configuration
    generate_config: bool,
    /// Check configuration only
    check_config: bool,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config_path = PathBuf::from("/etc/sfc-renderer/config.json");
        let mut generate_config = false;
        let mut check_config = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" | "--config" => {
                    if let Some(path) = args.next() {
                        config_path = PathBuf::from(path);
                    }
                }
                "-g" | "--generate-config" => {
                    generate_config = true;
                }
                "--check" => {
                    check_config = true;
                }
                "-h" | "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "-v" | "--version" => {
                    println!("sfc-renderer v{}", sfc_renderer::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {arg}");
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        Self {
            config_path,
            generate_config,
            check_config,
        }
    }
}

fn print_help() {
    println!(
        r#"sfc-renderer v{}

Renders service function chains into service paths.

USAGE:
    sfc-renderer [OPTIONS]

OPTIONS:
    -c, --config <PATH>     Configuration file path [default: /etc/sfc-renderer/config.json]
    -g, --generate-config   Generate default configuration and exit
    --check                 Check configuration and exit
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT:
    SFC_RENDERER_LOG_LEVEL       Override log level (trace, debug, info, warn, error)
    SFC_RENDERER_POLICY          Override default scheduler (random, round_robin,
                                 load_balance, shortest_path, weighted_shortest_path,
                                 load_path_aware)
    SFC_RENDERER_ID_ALGORITHM    Override path id algorithm (random, sequential)
    SFC_RENDERER_STARTING_INDEX  Override starting service index (1-255)

EXAMPLE:
    # Write a sample configuration, then render it
    sfc-renderer -g -c ./sfc.json
    sfc-renderer -c ./sfc.json
"#,
        sfc_renderer::VERSION
    );
}

/// Initialize logging
///
/// Logs go to stderr so the JSON report on stdout stays machine-readable.
fn init_logging(config: &Config) {
    let level = match config.log.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.log.target)
        .with_writer(std::io::stderr);

    match (config.log.format == "json", config.log.timestamps) {
        (true, true) => subscriber.json().init(),
        (true, false) => subscriber.json().without_time().init(),
        (false, true) => subscriber.init(),
        (false, false) => subscriber.without_time().init(),
    }
}

/// One successfully rendered request
#[derive(Serialize)]
struct RenderedEntry {
    #[serde(flatten)]
    paths: RenderedPaths,
    first_hop: FirstHop,
}

/// One failed request
#[derive(Serialize)]
struct FailedEntry {
    name: String,
    error: String,
}

/// Report printed on stdout
#[derive(Serialize)]
struct Report {
    rendered: Vec<RenderedEntry>,
    failed: Vec<FailedEntry>,
}

/// Render every configured path request, in order
fn render_all(config: &Config) -> Report {
    let definitions = Arc::new(MemoryDefinitions::from_config(&config.topology));
    let store = Arc::new(MemoryStateStore::new());
    let builder = RenderedPathBuilder::from_config(config, definitions, store);

    let mut report = Report {
        rendered: Vec::with_capacity(config.paths.len()),
        failed: Vec::new(),
    };

    for request in &config.paths {
        let result = builder.render(request).and_then(|paths| {
            let first_hop = builder.read_first_hop(&paths.forward.name)?;
            Ok(RenderedEntry { paths, first_hop })
        });
        match result {
            Ok(entry) => report.rendered.push(entry),
            Err(e) => {
                error!(path = %request.name, chain = %request.chain, error = %e, "Failed to render path");
                report.failed.push(FailedEntry {
                    name: request.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    report
}

/// Main application entry point
fn main() -> Result<()> {
    let start_time = Instant::now();

    // Parse arguments
    let args = Args::parse();

    // Handle generate-config
    if args.generate_config {
        sfc_renderer::config::create_default_config(&args.config_path)?;
        println!("Generated default configuration at {:?}", args.config_path);
        return Ok(());
    }

    // Load configuration
    let config = load_config_with_env(&args.config_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration from {:?}: {}",
            args.config_path,
            e
        )
    })?;

    // Handle check-config
    if args.check_config {
        println!("Configuration is valid");
        return Ok(());
    }

    // Initialize logging
    init_logging(&config);

    info!("sfc-renderer v{}", sfc_renderer::VERSION);
    info!("Configuration loaded from {:?}", args.config_path);

    let report = render_all(&config);
    println!("{}", serde_json::to_string_pretty(&report)?);

    info!(
        rendered = report.rendered.len(),
        failed = report.failed.len(),
        elapsed_ms = start_time.elapsed().as_millis(),
        "Rendering complete"
    );

    if !report.failed.is_empty() {
        anyhow::bail!(
            "{} of {} path requests failed",
            report.failed.len(),
            config.paths.len()
        );
    }
    Ok(())
}
