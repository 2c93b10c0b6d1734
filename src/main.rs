use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "boxsync",
    version,
    about = "Flatten Box folders into a local, cacheable file list"
)]
struct Cli {
    /// Config file to use instead of the discovered ones
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured sources and their authorization state
    Sources {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Authorize a source against Box
    Auth {
        /// Source name
        source: String,

        /// Authorization code obtained out of band
        #[arg(long)]
        code: Option<String>,

        /// Print the authorize URL without opening a browser
        #[arg(long)]
        no_browser: bool,

        /// How long to wait for the browser redirect
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Print every file below a source's folder
    List {
        /// Source name
        source: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Download one file into the cache and print its local path
    Fetch {
        /// Source name
        source: String,

        /// File identifier as printed by `list`
        identifier: String,
    },

    /// Download every file of a source into the cache
    Sync {
        /// Source name
        source: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("BOXSYNC_LOG_LEVEL")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json_errors = matches!(
        cli.command,
        Commands::Sources { json: true } | Commands::List { json: true, .. }
    );

    if let Err(e) = run(cli).await {
        boxsync::cli::output::print_error(&e, json_errors);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), boxsync::BoxsyncError> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Sources { json } => boxsync::cli::sources::run_sources(config, json).await,
        Commands::Auth {
            source,
            code,
            no_browser,
            timeout_ms,
        } => {
            let timeout = std::time::Duration::from_millis(
                timeout_ms.unwrap_or(boxsync::cli::auth::DEFAULT_AUTH_TIMEOUT_MS),
            );
            boxsync::cli::auth::run_auth(config, &source, code.as_deref(), no_browser, timeout)
                .await
        }
        Commands::List { source, json } => {
            boxsync::cli::list::run_list(config, &source, json).await
        }
        Commands::Fetch { source, identifier } => {
            boxsync::cli::sync::run_fetch(config, &source, &identifier).await
        }
        Commands::Sync { source } => boxsync::cli::sync::run_sync(config, &source).await,
    }
}
