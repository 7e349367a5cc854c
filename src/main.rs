use anyhow::Result;
use clap::Parser;
use log::info;
use sdlget::config::{Config, DEFAULT_LIB_DIR, DEFAULT_TIMEOUT_SECS, Settings};
use sdlget::package::DEFAULT_ARCH;
use sdlget::provision::{Outcome, provision};
use sdlget::release::DEFAULT_VERSION_PREFIX;
use std::path::PathBuf;
use std::time::Duration;

/// sdlget - fetch SDL2 mingw development libraries
///
/// Downloads the latest SDL2 and SDL2_image mingw devel packages from GitHub
/// releases and merges them into lib/bin, lib/include/SDL2 and lib/lib.
///
/// If the GITHUB_TOKEN environment variable is set, it will be used for authentication.
/// This avoids the anonymous API rate limit.
#[derive(Parser, Debug)]
#[command(author, version = env!("SDLGET_VERSION"), about)]
struct Cli {
    /// Directory to provision
    #[arg(long = "lib-dir", env = "SDLGET_LIB_DIR", value_name = "PATH", default_value = DEFAULT_LIB_DIR)]
    lib_dir: PathBuf,

    /// GitHub API URL (defaults to https://api.github.com)
    #[arg(long = "api-url", value_name = "URL")]
    api_url: Option<String>,

    /// Toolchain triple whose binaries are copied
    #[arg(
        long,
        value_name = "TRIPLE",
        default_value = DEFAULT_ARCH,
        value_parser = ["x86_64-w64-mingw32", "i686-w64-mingw32"]
    )]
    arch: String,

    /// Only consider releases whose version starts with this prefix
    #[arg(long, value_name = "PREFIX", default_value = DEFAULT_VERSION_PREFIX)]
    major: String,

    /// Provision again even if the lib directory looks complete
    #[arg(long)]
    force: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    #[arg(long, env = "GITHUB_TOKEN", hide = true, hide_env_values = true)]
    token: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let settings = Settings {
        lib_dir: cli.lib_dir,
        arch: cli.arch,
        version_prefix: cli.major,
        force: cli.force,
    };
    let config = Config::new(
        settings,
        cli.api_url,
        cli.token,
        Duration::from_secs(cli.timeout),
    )?;

    match provision(sdlget::runtime::RealRuntime, config).await? {
        Outcome::Provisioned(_) => info!("Provisioning complete"),
        Outcome::AlreadyProvisioned => info!("Nothing to do"),
    }
    Ok(())
}
