//! Demo entrypoint: drives the management-process engine against
//! `MockFtlDevice` over a real `CoreThread`, for manual exercising of the
//! startup/shutdown/trim/self-test/layout-upgrade processes.

use std::path::PathBuf;
use std::sync::{Arc, Once};

use anyhow::Result;
use clap::{Parser, Subcommand};
use mngt_collab::{DeviceConfig, MockFtlDevice};
use mngt_engine::{CoreThread, OneshotOrigin};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "mngtd", version, about = "FTL management-process engine demo")]
struct Args {
    /// Optional device configuration file (falls back to built-in defaults).
    #[arg(long = "config")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run Startup then Shutdown back to back.
    Cycle,
    /// Run the self-test consistency walk.
    SelfTest,
    /// Run the layout-upgrade driver.
    Upgrade,
    /// Run a single trim (unmap) call.
    Trim { lba: u64, num_blocks: u64 },
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = std::path::Path::new(".");
    let log_path = log_dir.join("mngtd.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, "mngtd.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    install_panic_hook();
    let _log_guard = configure_logging();

    let args = Args::parse();
    let config = match args.config.as_ref() {
        Some(path) => DeviceConfig::load(path),
        None => DeviceConfig::default(),
    };
    config.validate()?;

    let core = CoreThread::spawn("mngtd-core")?;
    let device = Arc::new(MockFtlDevice::new(config.clone()));

    match args.command {
        Command::Cycle => {
            run_startup(&core, device.clone(), config).await?;
            run_shutdown(&core, device).await?;
        }
        Command::SelfTest => run_self_test(&core, device).await?,
        Command::Upgrade => run_upgrade(&core, device).await?,
        Command::Trim { lba, num_blocks } => run_trim(&core, device, lba, num_blocks).await?,
    }

    Ok(())
}

async fn run_startup(core: &Arc<CoreThread>, device: Arc<MockFtlDevice>, config: DeviceConfig) -> Result<()> {
    let (origin, rx) = OneshotOrigin::pair();
    mngt_processes::startup(
        device,
        config,
        core.clone(),
        origin,
        Box::new(|_dev, status| tracing::info!(target: "mngtd", status, "startup finished")),
    )?;
    if let Ok(job) = rx.await {
        job();
    }
    Ok(())
}

async fn run_shutdown(core: &Arc<CoreThread>, device: Arc<MockFtlDevice>) -> Result<()> {
    let (origin, rx) = OneshotOrigin::pair();
    mngt_processes::shutdown(
        device,
        core.clone(),
        origin,
        Box::new(|_dev, status| tracing::info!(target: "mngtd", status, "shutdown finished")),
    )?;
    if let Ok(job) = rx.await {
        job();
    }
    Ok(())
}

async fn run_self_test(core: &Arc<CoreThread>, device: Arc<MockFtlDevice>) -> Result<()> {
    let (origin, rx) = OneshotOrigin::pair();
    mngt_processes::self_test(
        device,
        core.clone(),
        origin,
        Box::new(|_dev, status| tracing::info!(target: "mngtd", status, "self-test finished")),
    )?;
    if let Ok(job) = rx.await {
        job();
    }
    Ok(())
}

async fn run_upgrade(core: &Arc<CoreThread>, device: Arc<MockFtlDevice>) -> Result<()> {
    let (origin, rx) = OneshotOrigin::pair();
    mngt_processes::layout_upgrade(
        device,
        core.clone(),
        origin,
        Box::new(|_dev, status| tracing::info!(target: "mngtd", status, "layout upgrade finished")),
    )?;
    if let Ok(job) = rx.await {
        job();
    }
    Ok(())
}

async fn run_trim(core: &Arc<CoreThread>, device: Arc<MockFtlDevice>, lba: u64, num_blocks: u64) -> Result<()> {
    let (origin, rx) = OneshotOrigin::pair();
    mngt_processes::unmap(
        device,
        lba,
        num_blocks,
        core.clone(),
        origin,
        Box::new(|_dev, status| tracing::info!(target: "mngtd", status, "trim finished")),
    )?;
    if let Ok(job) = rx.await {
        job();
    }
    Ok(())
}
