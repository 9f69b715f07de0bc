use anyhow::{bail, Context};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use watchdog::logger::{self, DEFAULT_LOG_PATH};
use watchdog::{build_registry, shutdown, ConfigFile, ShutdownCoordinator, Watchdog};

const DEFAULT_CONFIG: &str = "watchdog.ini";
const USAGE: &str = "usage: watchdog [--config watch.ini] [--log-path watchdog.log]";

#[derive(Debug)]
struct Options {
    config: PathBuf,
    log_path: PathBuf,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Option<Options>> {
    let mut opts = Options {
        config: PathBuf::from(DEFAULT_CONFIG),
        log_path: PathBuf::from(DEFAULT_LOG_PATH),
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "-config" | "--config" => {
                opts.config = args.next().context("--config needs a path")?.into();
            }
            "-log_path" | "--log-path" => {
                opts.log_path = args.next().context("--log-path needs a path")?.into();
            }
            other => bail!("unknown argument {:?}\n{}", other, USAGE),
        }
    }
    Ok(Some(opts))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(opts) = parse_args(std::env::args().skip(1))? else {
        println!("{}", USAGE);
        return Ok(());
    };
    let _guard = logger::init(&opts.log_path)?;

    let cfg = ConfigFile::load(&opts.config)
        .inspect_err(|e| error!(config = %opts.config.display(), error = %e, "failed to read config"))?;
    let registry = build_registry(&cfg).inspect_err(|e| error!(error = %e, "invalid configuration"))?;
    let fido = Arc::new(Watchdog::new(registry).inspect_err(|e| error!(error = %e, "cannot plan startup"))?);
    info!(plan = ?fido.startup_plan(), "starting services");

    let coordinator = ShutdownCoordinator::new(fido.clone());
    let _signals = shutdown::install(coordinator.clone()).context("failed to install signal handlers")?;

    fido.walk().await;
    coordinator.wait().await;
    info!("watchdog exiting");
    Ok(())
}
