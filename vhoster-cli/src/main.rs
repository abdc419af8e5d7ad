//! vhoster: Apache virtual host manager for local development.
//!
//! # Usage
//!
//! ```text
//! vhoster setup [--tld test] [--hosts FILE] [--apache-bin BIN] [--apache-conf FILE] ...
//! vhoster park <domain> [path] [--root DIR] [--secure] [--tld TLD | --auto-tld]
//! vhoster forget [domain] [path] [--tld TLD]
//! vhoster list [--json]
//! vhoster show [domain] [path] [--tld TLD]
//! vhoster secure|unsecure [domain] [path] [--tld TLD]
//! vhoster link <domain> [path] [--tld TLD]
//! vhoster rename <old> <new> [--tld TLD] [--new-tld TLD | --auto-tld]
//! vhoster set-root <root> [domain] [--tld TLD]
//! vhoster refresh [domain] [--all]
//! vhoster share [domain] [--tld TLD]
//! vhoster restart
//! vhoster stop
//! ```
//!
//! `--path DIR` (default: working directory) selects the current site when no
//! domain is given.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;

use commands::{
    edit::{LinkArgs, RenameArgs, SetRootArgs},
    park::ParkArgs,
    refresh::RefreshArgs,
    setup::SetupArgs,
    show::ListArgs,
    Session, SiteArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "vhoster",
    version,
    about = "Apache virtual host manager",
    long_about = None,
)]
struct Cli {
    /// Directory of the current site (defaults to the working directory).
    #[arg(long = "path", value_name = "DIR", global = true)]
    dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` wins when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Do not restart Apache after changing sites.
    #[arg(long, global = true)]
    no_restart: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register the current (or given) directory under DOMAIN.
    #[command(visible_alias = "create")]
    Park(ParkArgs),

    /// Unregister the current (or given) site.
    #[command(visible_alias = "remove")]
    Forget(SiteArgs),

    /// List all registered sites.
    #[command(visible_alias = "all")]
    List(ListArgs),

    /// Show one site.
    #[command(visible_alias = "info")]
    Show(SiteArgs),

    /// Serve a site over HTTPS with a generated certificate.
    Secure(SiteArgs),

    /// Remove a site's certificate and serve it over HTTP only.
    Unsecure(SiteArgs),

    /// Point the site DOMAIN at another directory.
    Link(LinkArgs),

    /// Change a site's domain (and optionally its TLD).
    Rename(RenameArgs),

    /// Set the document root of the current (or given) site.
    SetRoot(SetRootArgs),

    /// Rewrite configuration, hosts entries and certificates.
    #[command(visible_alias = "rebuild")]
    Refresh(RefreshArgs),

    /// Expose a site through an ngrok tunnel (blocks until interrupted).
    Share(SiteArgs),

    /// Restart Apache.
    #[command(visible_alias = "start")]
    Restart,

    /// Stop Apache.
    Stop,

    /// Write the settings document.
    Setup(SetupArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let cwd = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine the working directory")?,
    };
    let session = Session::new(cwd, !cli.no_restart);

    match cli.command {
        Commands::Park(args) => args.run(&session),
        Commands::Forget(args) => commands::forget::run(&session, args),
        Commands::List(args) => commands::show::list(&session, args),
        Commands::Show(args) => commands::show::show(&session, args),
        Commands::Secure(args) => commands::secure::run(&session, args, true),
        Commands::Unsecure(args) => commands::secure::run(&session, args, false),
        Commands::Link(args) => args.run(&session),
        Commands::Rename(args) => args.run(&session),
        Commands::SetRoot(args) => args.run(&session),
        Commands::Refresh(args) => args.run(&session),
        Commands::Share(args) => commands::share::run(&session, args),
        Commands::Restart => commands::restart(&session),
        Commands::Stop => commands::stop(&session),
        Commands::Setup(args) => args.run(),
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
