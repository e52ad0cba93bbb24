use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "chartcert",
    version,
    about = "Certify Helm charts against a fixed set of checks"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run checks against a chart and print the certificate
    Certify(CertifyArgs),
    /// List registered checks
    Checks(ChecksArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct CertifyArgs {
    /// Chart identifier: http(s) URL, file:// URI, archive path or chart directory
    pub uri: String,

    /// Check to run (repeatable). Default: every implemented check
    #[arg(long = "check", short = 'c', value_name = "NAME")]
    pub checks: Vec<String>,

    #[arg(long, short = 'o', value_enum, default_value_t = CertificateFormat::Json)]
    pub output: CertificateFormat,

    /// Evaluate checks concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Report lint warnings as failures
    #[arg(long)]
    pub lint_strict: bool,

    /// Request timeout in seconds for remote charts
    #[arg(long, env = "CHARTCERT_HTTP_TIMEOUT")]
    pub timeout: Option<u64>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ChecksArgs {
    /// Include checks that are registered but not implemented
    #[arg(long)]
    pub all: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CertificateFormat {
    #[default]
    Json,
    Yaml,
    /// One line per check followed by the verdict
    Text,
}
