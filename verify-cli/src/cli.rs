use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "verify",
    about = "Email verification sessions - watch a real account or simulate one",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[arg(
        short,
        long,
        global = true,
        default_value = verify_core::modules::config::CONFIG_FILE,
        help = "Path to the verification policy JSON"
    )]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Poll the identity provider until the account's email is confirmed")]
    Watch {
        #[arg(short, long, help = "Account UID")]
        subject: String,

        #[arg(long, env = "FIREBASE_API_KEY", hide_env_values = true)]
        api_key: String,

        #[arg(long, env = "FIREBASE_ID_TOKEN", hide_env_values = true)]
        id_token: String,

        #[arg(long, env = "FIREBASE_PROJECT_ID")]
        project_id: String,
    },

    #[command(about = "Run a session against scripted in-memory backends")]
    Simulate {
        #[arg(long, default_value = "3", help = "Unconfirmed checks before the address confirms")]
        verify_after: u32,

        #[arg(long, default_value = "0", help = "Transient failures injected before the first check succeeds")]
        fail_transient: u32,

        #[arg(long, default_value = "500", help = "Poll interval override in milliseconds")]
        poll_interval_ms: u64,

        #[arg(long, help = "Attempt limit override")]
        max_attempts: Option<u32>,
    },

    #[command(about = "Show the effective verification policy")]
    Config {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Write the effective policy back to the config file")]
        write: bool,
    },
}
