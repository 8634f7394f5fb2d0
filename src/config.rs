use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";
const DEFAULT_TOKEN_FILE: &str = "token.json";
const DEFAULT_AUTH_TIMEOUT_MS: u64 = 300_000;
const DEFAULT_TOOL_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_MAX_RESPONSE_BYTES: u64 = 1_000_000;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// OAuth client secret downloaded from the Google Cloud console.
    pub credentials_file: PathBuf,
    /// Where the authorized-user token is cached between runs.
    pub token_file: PathBuf,
    pub api_key: Option<String>,
    /// Loopback port for the OAuth redirect; 0 picks an ephemeral port.
    pub callback_port: u16,
    pub auth_timeout_ms: Option<u64>,
    pub open_browser: bool,
    pub tool_timeout_ms: Option<u64>,
    pub max_response_bytes: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            credentials_file: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            api_key: None,
            callback_port: 0,
            auth_timeout_ms: Some(DEFAULT_AUTH_TIMEOUT_MS),
            open_browser: true,
            tool_timeout_ms: Some(DEFAULT_TOOL_TIMEOUT_MS),
            max_response_bytes: Some(DEFAULT_MAX_RESPONSE_BYTES),
        }
    }
}

impl ServerConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            credentials_file: cli_credentials_file,
            token_file: cli_token_file,
            api_key: cli_api_key,
            callback_port: cli_callback_port,
            auth_timeout_ms: cli_auth_timeout_ms,
            no_browser: cli_no_browser,
            tool_timeout_ms: cli_tool_timeout_ms,
            max_response_bytes: cli_max_response_bytes,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            credentials_file: file_credentials_file,
            token_file: file_token_file,
            api_key: file_api_key,
            callback_port: file_callback_port,
            auth_timeout_ms: file_auth_timeout_ms,
            open_browser: file_open_browser,
            tool_timeout_ms: file_tool_timeout_ms,
            max_response_bytes: file_max_response_bytes,
        } = file_config;

        let credentials_file = cli_credentials_file
            .or(file_credentials_file)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_FILE));

        let token_file = cli_token_file
            .or(file_token_file)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE));

        anyhow::ensure!(
            credentials_file != token_file,
            "credentials file and token file must be different paths (both {:?})",
            token_file
        );

        let api_key = cli_api_key
            .or(file_api_key)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        let callback_port = cli_callback_port.or(file_callback_port).unwrap_or(0);

        let auth_timeout_ms = disable_on_zero(
            cli_auth_timeout_ms
                .or(file_auth_timeout_ms)
                .unwrap_or(DEFAULT_AUTH_TIMEOUT_MS),
        );

        let open_browser = !cli_no_browser && file_open_browser.unwrap_or(true);

        let tool_timeout_ms = disable_on_zero(
            cli_tool_timeout_ms
                .or(file_tool_timeout_ms)
                .unwrap_or(DEFAULT_TOOL_TIMEOUT_MS),
        );

        let max_response_bytes = disable_on_zero(
            cli_max_response_bytes
                .or(file_max_response_bytes)
                .unwrap_or(DEFAULT_MAX_RESPONSE_BYTES),
        );

        Ok(Self {
            credentials_file,
            token_file,
            api_key,
            callback_port,
            auth_timeout_ms,
            open_browser,
            tool_timeout_ms,
            max_response_bytes,
        })
    }

    pub fn auth_timeout(&self) -> Option<Duration> {
        self.auth_timeout_ms.map(Duration::from_millis)
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_ms.map(Duration::from_millis)
    }

    pub fn max_response_bytes(&self) -> Option<usize> {
        self.max_response_bytes.map(|bytes| bytes as usize)
    }
}

fn disable_on_zero(value: u64) -> Option<u64> {
    if value == 0 { None } else { Some(value) }
}

#[derive(Parser, Debug, Default, Clone)]
#[command(name = "sheets-mcp", about = "Google Sheets MCP server", version)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "GOOGLE_SHEETS_CREDENTIALS_FILE",
        value_name = "FILE",
        help = "OAuth client secret file (default: credentials.json)"
    )]
    pub credentials_file: Option<PathBuf>,

    #[arg(
        long,
        env = "GOOGLE_SHEETS_TOKEN_FILE",
        value_name = "FILE",
        help = "Cached OAuth token file (default: token.json)"
    )]
    pub token_file: Option<PathBuf>,

    #[arg(
        long,
        env = "GOOGLE_SHEETS_API_KEY",
        value_name = "KEY",
        hide_env_values = true,
        help = "API key fallback; grants read access to public sheets only"
    )]
    pub api_key: Option<String>,

    #[arg(
        long,
        env = "SHEETS_MCP_CALLBACK_PORT",
        value_name = "PORT",
        help = "Loopback port for the OAuth redirect (default: 0, ephemeral)",
        value_parser = clap::value_parser!(u16)
    )]
    pub callback_port: Option<u16>,

    #[arg(
        long,
        env = "SHEETS_MCP_AUTH_TIMEOUT_MS",
        value_name = "MS",
        help = "How long to wait for browser consent (default: 300000; 0 disables)",
        value_parser = clap::value_parser!(u64)
    )]
    pub auth_timeout_ms: Option<u64>,

    #[arg(
        long,
        env = "SHEETS_MCP_NO_BROWSER",
        help = "Do not try to open a browser for OAuth consent; only print the URL"
    )]
    pub no_browser: bool,

    #[arg(
        long,
        env = "SHEETS_MCP_TOOL_TIMEOUT_MS",
        value_name = "MS",
        help = "Tool request timeout in milliseconds (default: 30000; 0 disables)",
        value_parser = clap::value_parser!(u64)
    )]
    pub tool_timeout_ms: Option<u64>,

    #[arg(
        long,
        env = "SHEETS_MCP_MAX_RESPONSE_BYTES",
        value_name = "BYTES",
        help = "Max response size in bytes (default: 1000000; 0 disables)",
        value_parser = clap::value_parser!(u64)
    )]
    pub max_response_bytes: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    credentials_file: Option<PathBuf>,
    token_file: Option<PathBuf>,
    api_key: Option<String>,
    callback_port: Option<u16>,
    auth_timeout_ms: Option<u64>,
    open_browser: Option<bool>,
    tool_timeout_ms: Option<u64>,
    max_response_bytes: Option<u64>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
