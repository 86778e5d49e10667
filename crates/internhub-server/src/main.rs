use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, Command};
use internhub_server::config::Config;
use internhub_service::auth::hash_password;
use internhub_service::Settings;
use internhub_store::{Snapshot, Store};
use std::path::{Path, PathBuf};

fn cli() -> Command {
    Command::new("internhub")
        .version(env!("CARGO_PKG_VERSION"))
        .about("InternHub internship management server")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("serve")
                .about("Run the HTTP API")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .short('c')
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("TOML config file (default: config/internhub.toml if present)"),
                )
                .arg(
                    Arg::new("log-json")
                        .long("log-json")
                        .action(ArgAction::SetTrue)
                        .help("Emit logs as JSON lines"),
                ),
        )
        .subcommand(
            Command::new("hash-password")
                .about("Print a password hash for seeding accounts")
                .arg(Arg::new("password").required(true).help("Plain-text password"))
                .arg(
                    Arg::new("rounds")
                        .long("rounds")
                        .value_parser(clap::value_parser!(u32).range(1..))
                        .help("Hash rounds (default: server default)"),
                ),
        )
        .subcommand(
            Command::new("verify-snapshot")
                .about("Check a snapshot file and its audit chain")
                .arg(
                    Arg::new("path")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Snapshot JSON file"),
                ),
        )
}

fn verify_snapshot(path: &Path) -> Result<()> {
    let snapshot = Snapshot::read(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    let report = snapshot.verify_audit();

    println!("Snapshot: {}", path.display());
    println!("  Audit events: {}", report.events);
    println!(
        "Audit chain: {}",
        if report.valid { "VALID" } else { "INVALID" }
    );
    if let Some(index) = report.first_invalid {
        bail!("audit chain broken at event {index}");
    }

    let store = Store::from_snapshot(snapshot).context("Snapshot is inconsistent")?;
    let stats = store.stats();
    println!("  Users:        {}", stats.users);
    println!("  Universities: {}", stats.universities);
    println!("  Applications: {}", stats.applications);
    println!("  Students:     {}", stats.students);
    println!("  Interns:      {}", stats.interns);
    println!("  Submissions:  {}", stats.submissions);
    println!("  Documents:    {}", stats.documents);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("serve", args)) => {
            internhub_server::init_tracing(args.get_flag("log-json"));
            let config = Config::load(args.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
            internhub_server::serve(config).await
        }
        Some(("hash-password", args)) => {
            let password = args
                .get_one::<String>("password")
                .context("password is required")?;
            let rounds = args
                .get_one::<u32>("rounds")
                .copied()
                .unwrap_or(Settings::default().password_rounds);
            println!("{}", hash_password(password, rounds));
            Ok(())
        }
        Some(("verify-snapshot", args)) => {
            let path = args
                .get_one::<PathBuf>("path")
                .context("path is required")?;
            verify_snapshot(path)
        }
        _ => Ok(()),
    }
}
