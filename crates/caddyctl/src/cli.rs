//! Clap derive structures for the `caddyctl` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.
//! Only clap and clap_complete may be used here: build.rs includes this
//! file to render man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// caddyctl -- declarative Caddy configuration with history and rollback
#[derive(Debug, Parser)]
#[command(
    name = "caddyctl",
    version,
    about = "Synthesize, apply and roll back Caddy configuration",
    long_about = "Keeps sites, routes, redirects and upstream pools in a local state file,\n\
        synthesizes the full Caddy JSON document from them, pushes it through the\n\
        admin API as a whole, and records every attempt so it can be rolled back.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct GlobalOpts {
    /// Profile to use
    #[arg(long, short = 'p', env = "CADDYCTL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Admin API URL (overrides profile)
    #[arg(long, short = 'a', env = "CADDYCTL_ADMIN_URL", global = true)]
    pub admin_url: Option<String>,

    /// State file holding entities and history (overrides profile)
    #[arg(long, env = "CADDYCTL_STATE", global = true)]
    pub state: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CADDYCTL_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format on stderr
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Record entity changes without pushing a new document
    #[arg(long, global = true)]
    pub no_sync: bool,

    /// Accept self-signed TLS certificates on the admin endpoint
    #[arg(long, short = 'k', env = "CADDYCTL_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "CADDYCTL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the synthesized document without applying it
    Render(RenderArgs),

    /// Synthesize and apply the current state
    Sync,

    /// Manage sites
    #[command(alias = "site")]
    Sites(SitesArgs),

    /// Manage routes of a site
    #[command(alias = "route")]
    Routes(RoutesArgs),

    /// Manage redirect rules of a site
    #[command(alias = "redirect")]
    Redirects(RedirectsArgs),

    /// Manage upstream backends
    #[command(alias = "upstream")]
    Upstreams(UpstreamsArgs),

    /// Manage load-balanced upstream groups
    #[command(alias = "group")]
    Groups(GroupsArgs),

    /// Per-site certificate automation
    Tls(TlsArgs),

    /// Manage DNS providers for ACME DNS challenges
    #[command(name = "dns-providers", alias = "dns")]
    DnsProviders(DnsProvidersArgs),

    /// Manage uploaded certificates
    #[command(alias = "certs")]
    Certificates(CertificatesArgs),

    /// View and change global settings
    Settings(SettingsArgs),

    /// Browse, compare and roll back recorded changes
    #[command(alias = "hist")]
    History(HistoryArgs),

    /// Raw admin API operations
    Remote(RemoteArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  RENDER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Only print the server block of this site (name or ID)
    #[arg(long)]
    pub site: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SITES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SitesArgs {
    #[command(subcommand)]
    pub command: SitesCommand,
}

#[derive(Debug, Subcommand)]
pub enum SitesCommand {
    /// List sites
    #[command(alias = "ls")]
    List,

    /// Create or replace a site
    Add {
        /// Site name; also names the server block
        name: String,

        /// Host to match (repeatable)
        #[arg(long = "host", required = true)]
        hosts: Vec<String>,

        /// Listen port
        #[arg(long, default_value = "443")]
        port: u16,

        /// Turn off automatic HTTPS for this site
        #[arg(long)]
        no_auto_https: bool,

        /// Store the site disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Delete a site with its routes, redirects and TLS config
    #[command(alias = "rm")]
    Remove {
        /// Site name or ID
        site: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ROUTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RoutesArgs {
    #[command(subcommand)]
    pub command: RoutesCommand,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum HandlerArg {
    StaticResponse,
    FileServer,
    ReverseProxy,
    Redirect,
}

#[derive(Debug, Subcommand)]
pub enum RoutesCommand {
    /// List routes of a site in render order
    #[command(alias = "ls")]
    List {
        /// Site name or ID
        site: String,
    },

    /// Add a route to a site
    Add {
        /// Site name or ID
        site: String,

        /// Handler kind
        #[arg(long)]
        handler: HandlerArg,

        /// Path matcher (e.g. /api/*)
        #[arg(long, default_value = "")]
        path: String,

        /// HTTP method to match (repeatable)
        #[arg(long = "method")]
        methods: Vec<String>,

        /// Handler config as a JSON object
        #[arg(long, default_value = "{}")]
        config: String,

        /// Render order; lower renders first
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        order: i32,

        /// Display name
        #[arg(long, default_value = "")]
        name: String,
    },

    /// Delete a route
    #[command(alias = "rm")]
    Remove {
        /// Route ID
        id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  REDIRECTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RedirectsArgs {
    #[command(subcommand)]
    pub command: RedirectsCommand,
}

#[derive(Debug, Subcommand)]
pub enum RedirectsCommand {
    /// List redirect rules of a site in render order
    #[command(alias = "ls")]
    List {
        /// Site name or ID
        site: String,
    },

    /// Add a redirect rule
    Add {
        /// Site name or ID
        site: String,

        /// Source path to match
        source: String,

        /// Location to redirect to
        destination: String,

        /// Status code
        #[arg(long, default_value = "302")]
        code: u16,

        /// Higher priority renders first
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        priority: i32,
    },

    /// Delete a redirect rule
    #[command(alias = "rm")]
    Remove {
        /// Redirect rule ID
        id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  UPSTREAMS & GROUPS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct UpstreamsArgs {
    #[command(subcommand)]
    pub command: UpstreamsCommand,
}

#[derive(Debug, Subcommand)]
pub enum UpstreamsCommand {
    /// List upstreams
    #[command(alias = "ls")]
    List,

    /// Add an upstream
    Add {
        /// Upstream name
        name: String,

        /// Dial address (host:port)
        address: String,

        /// Concurrent request cap (0 = unlimited)
        #[arg(long, default_value = "0")]
        max_requests: u32,
    },

    /// Delete an upstream and drop it from every group
    #[command(alias = "rm")]
    Remove {
        /// Upstream name or ID
        upstream: String,
    },
}

#[derive(Debug, Args)]
pub struct GroupsArgs {
    #[command(subcommand)]
    pub command: GroupsCommand,
}

#[derive(Debug, Subcommand)]
pub enum GroupsCommand {
    /// List upstream groups with their members
    #[command(alias = "ls")]
    List,

    /// Create or replace a group
    Add {
        /// Group name, referenced by reverse_proxy routes
        name: String,

        /// Selection policy (round_robin, least_conn, ...)
        #[arg(long, default_value = "")]
        policy: String,

        /// Member upstream name or ID (repeatable)
        #[arg(long = "member")]
        members: Vec<String>,
    },

    /// Delete a group
    #[command(alias = "rm")]
    Remove {
        /// Group name or ID
        group: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TLS, DNS PROVIDERS & CERTIFICATES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct TlsArgs {
    #[command(subcommand)]
    pub command: TlsCommand,
}

#[derive(Debug, Subcommand)]
pub enum TlsCommand {
    /// List TLS configs by site
    #[command(alias = "ls")]
    List,

    /// Create or replace the TLS config of a site
    Set {
        /// Site name or ID
        site: String,

        /// Request a wildcard certificate through a DNS challenge
        #[arg(long, requires = "dns_provider")]
        wildcard: bool,

        /// DNS provider name or ID that answers the challenge
        #[arg(long)]
        dns_provider: Option<String>,
    },

    /// Delete the TLS config of a site
    #[command(alias = "rm")]
    Remove {
        /// Site name or ID
        site: String,
    },
}

#[derive(Debug, Args)]
pub struct DnsProvidersArgs {
    #[command(subcommand)]
    pub command: DnsProvidersCommand,
}

#[derive(Debug, Subcommand)]
pub enum DnsProvidersCommand {
    /// List DNS providers (credential values are not shown)
    #[command(alias = "ls")]
    List,

    /// Create or replace a DNS provider
    Add {
        /// Provider name
        name: String,

        /// Provider module, e.g. cloudflare or route53
        #[arg(long)]
        provider: String,

        /// Credential fields as a JSON object
        #[arg(long, default_value = "{}")]
        credentials: String,
    },

    /// Delete a DNS provider
    #[command(alias = "rm")]
    Remove {
        /// Provider name or ID
        provider: String,
    },
}

#[derive(Debug, Args)]
pub struct CertificatesArgs {
    #[command(subcommand)]
    pub command: CertificatesCommand,
}

#[derive(Debug, Subcommand)]
pub enum CertificatesCommand {
    /// List certificates (key material is not shown)
    #[command(alias = "ls")]
    List,

    /// Upload a PEM certificate and private key
    Add {
        /// Certificate name, used as its load tag
        name: String,

        /// PEM certificate chain file
        #[arg(long)]
        cert: PathBuf,

        /// PEM private key file
        #[arg(long)]
        key: PathBuf,

        /// Domain the certificate covers (repeatable)
        #[arg(long = "domain")]
        domains: Vec<String>,
    },

    /// Delete a certificate
    #[command(alias = "rm")]
    Remove {
        /// Certificate name or ID
        certificate: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SETTINGS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show global settings
    Show,

    /// Change global settings; unspecified fields keep their value
    Set {
        /// HTTP port (0 clears)
        #[arg(long)]
        http_port: Option<u16>,

        /// HTTPS port (0 clears)
        #[arg(long)]
        https_port: Option<u16>,

        /// Graceful shutdown window in seconds (0 clears)
        #[arg(long)]
        grace_period: Option<u64>,

        /// Default log level
        #[arg(long)]
        log_level: Option<String>,

        /// Admin listener address
        #[arg(long)]
        admin_listen: Option<String>,
    },

    /// Reset settings to defaults
    Reset,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  HISTORY
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: HistoryCommand,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ResourceArg {
    Site,
    Route,
    Redirect,
    Upstream,
    UpstreamGroup,
    TlsConfig,
    DnsProvider,
    Certificate,
    Settings,
    Config,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ActionArg {
    Create,
    Update,
    Delete,
    Load,
    Sync,
    Rollback,
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// List history entries, newest first
    #[command(alias = "ls")]
    List {
        /// Only entries for this resource type
        #[arg(long = "type")]
        resource_type: Option<ResourceArg>,

        /// Only entries with this action
        #[arg(long)]
        action: Option<ActionArg>,

        /// Only entries for this resource ID
        #[arg(long)]
        resource_id: Option<String>,

        /// Max entries
        #[arg(long, short = 'l', default_value = "50")]
        limit: usize,

        /// Entries to skip
        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Show one entry with its states and snapshot
    Show {
        /// Entry ID
        id: String,
    },

    /// Compare the snapshots of two entries
    Diff {
        /// Older entry ID
        from: String,

        /// Newer entry ID
        to: String,
    },

    /// Undo an entry and re-apply
    Rollback {
        /// Entry ID
        id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  REMOTE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RemoteArgs {
    #[command(subcommand)]
    pub command: RemoteCommand,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AdapterArg {
    Caddyfile,
    Json5,
    Yaml,
    Nginx,
}

#[derive(Debug, Subcommand)]
pub enum RemoteCommand {
    /// Read the running config at a path
    Get {
        /// Config path (e.g. apps/http/servers)
        #[arg(default_value = "")]
        path: String,
    },

    /// Set or replace the value at a path (POST)
    Set {
        path: String,
        /// JSON value
        value: String,
    },

    /// Insert a new value at a path (PUT)
    Put {
        path: String,
        /// JSON value
        value: String,
    },

    /// Replace an existing value at a path (PATCH)
    Patch {
        path: String,
        /// JSON value
        value: String,
    },

    /// Delete the value at a path
    Delete { path: String },

    /// Replace the whole running config from a file and record it
    Load {
        /// Document file
        file: PathBuf,

        /// Adapt from this syntax through the server before loading
        #[arg(long)]
        adapter: Option<AdapterArg>,
    },

    /// Convert a config file to JSON without loading it
    Adapt {
        file: PathBuf,

        #[arg(long, default_value = "caddyfile")]
        adapter: AdapterArg,
    },

    /// Show live reverse-proxy upstream status
    Upstreams,

    /// Stop the server process
    Stop,

    /// Check that the admin API answers
    Health,

    /// Show a PKI certificate authority
    Pki {
        /// CA identifier
        #[arg(default_value = "local")]
        id: String,

        /// Show the CA's certificate chain instead
        #[arg(long)]
        certificates: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG & COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Display current resolved configuration
    Show,

    /// Create or update a profile
    SetProfile {
        /// Profile name
        name: String,

        /// Admin API URL
        #[arg(long)]
        admin_url: Option<String>,

        /// State file
        #[arg(long)]
        state_file: Option<PathBuf>,

        /// Make this the default profile
        #[arg(long)]
        default: bool,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
