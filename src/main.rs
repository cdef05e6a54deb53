use anyhow::Context;
use clap::Parser;
use tower_lsp::{LspService, Server};
use tracing::info;

use glsl_language_server::logging::init_logger;
use glsl_language_server::lsp::backend::{GlslBackend, SERVER_NAME, SERVER_VERSION, Session};
use glsl_language_server::lsp::config::{
    DEFAULT_MAX_COMPLETIONS, DEFAULT_SCAN_CACHE_CAPACITY, DEFAULT_SCAN_TIMEOUT_MS, ServerConfig,
};

/// GLSL language server speaking LSP over stdio.
#[derive(Debug, Parser)]
#[command(name = "glsl-language-server", version, about)]
struct Cli {
    /// Log level filter for stderr, e.g. "debug" or "glsl_language_server=trace" (defaults to RUST_LOG, then "info")
    #[arg(long)]
    log_level: Option<String>,

    /// Disable ANSI colors in stderr output
    #[arg(long)]
    no_color: bool,

    /// Do not write a session log under the user cache directory
    #[arg(long)]
    no_file_logging: bool,

    /// Upper bound on the workspace scan run for one completion request
    #[arg(long, env = "GLSL_LSP_SCAN_TIMEOUT_MS", default_value_t = DEFAULT_SCAN_TIMEOUT_MS)]
    scan_timeout_ms: u64,

    /// Maximum number of completion items returned; 0 disables the cap
    #[arg(long, env = "GLSL_LSP_MAX_COMPLETIONS", default_value_t = DEFAULT_MAX_COMPLETIONS)]
    max_completions: usize,

    /// Source file extensions to scan, comma separated
    #[arg(long, value_delimiter = ',')]
    extensions: Option<Vec<String>>,

    /// Do not offer GLSL keywords and built-ins as candidates
    #[arg(long)]
    no_keywords: bool,

    /// Match the typed prefix regardless of case
    #[arg(long)]
    case_insensitive: bool,

    /// Number of files whose lexed names are cached between scans; 0 disables the cache
    #[arg(long, default_value_t = DEFAULT_SCAN_CACHE_CAPACITY)]
    scan_cache_capacity: usize,

    /// Maximum directory depth below the workspace root
    #[arg(long)]
    max_depth: Option<usize>,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig::default();
        if let Some(extensions) = &self.extensions {
            config.scanner.extensions = extensions
                .iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_string())
                .filter(|ext| !ext.is_empty())
                .collect();
        }
        config.scanner.max_depth = self.max_depth;
        config.scanner.cache_capacity = self.scan_cache_capacity;
        config.completion.scan_timeout_ms = self.scan_timeout_ms;
        config.completion.max_completions = self.max_completions;
        config.completion.include_keywords = !self.no_keywords;
        config.completion.case_sensitive = !self.case_insensitive;
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logger(cli.no_color, cli.log_level.as_deref(), !cli.no_file_logging)
        .context("failed to initialize logging")?;

    let config = cli.server_config();
    info!("Starting {} {} with {:?}", SERVER_NAME, SERVER_VERSION, config);

    let session = Session::new(&config);
    let (service, socket) = LspService::new(|client| GlslBackend::new(client, session.clone()));

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    Server::new(stdin, stdout, socket).serve(service).await;

    info!("Client disconnected, exiting");
    Ok(())
}
