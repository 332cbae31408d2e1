use anyhow::Result;
use clap::Parser;
use mail_watcher::core::cli::{Cli, Commands};
use mail_watcher::core::config::MonitorConfig;
use mail_watcher::infrastructure::imap::ImapClient;
use mail_watcher::infrastructure::logging::init_logging;
use mail_watcher::services::mailbox::scanner::pull_latest;
use mail_watcher::services::mailbox::{
    AttachmentWriter, CheckpointStore, MailboxMonitor, MailboxScanner, MailboxSession,
};
use tracing::{info, warn};

#[cfg(unix)]
use mail_watcher::infrastructure::daemon::{start_daemon, PidManager};

#[cfg(unix)]
const PID_FILE: &str = "mail-watcher.pid";

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Monitor {
            interval,
            daemon,
            stop,
            status,
        } => run_monitor(interval, daemon, stop, status),
        Commands::Pull => {
            init_logging("mail-watcher", false)?;
            runtime()?.block_on(run_pull())
        }
        Commands::Reset => {
            init_logging("mail-watcher", false)?;
            runtime()?.block_on(run_reset())
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

fn run_monitor(interval: Option<u64>, daemon: bool, stop: bool, status: bool) -> Result<()> {
    #[cfg(unix)]
    {
        let pid_manager = PidManager::new(PID_FILE);
        if status {
            return pid_manager.check_status();
        }
        if stop {
            return pid_manager.stop();
        }
        if daemon {
            // fork 必须发生在 tokio runtime 启动之前
            start_daemon(PID_FILE, "mail-watcher.out", "mail-watcher.err")?;
        }
    }
    #[cfg(not(unix))]
    {
        if daemon || stop || status {
            anyhow::bail!("Daemon control is only supported on unix");
        }
    }

    init_logging("mail-watcher", daemon)?;

    let mut config = MonitorConfig::from_env()?;
    if let Some(secs) = interval {
        if secs == 0 {
            anyhow::bail!("Poll interval must be greater than 0");
        }
        config.poll_interval = secs;
    }

    #[cfg(unix)]
    {
        if !daemon {
            PidManager::new(PID_FILE).write_pid()?;
        }
    }

    let result = runtime()?.block_on(async {
        let store = CheckpointStore::new(&config.db_path).await?;
        let writer = AttachmentWriter::new(&config.attachments_dir);
        let monitor = MailboxMonitor::new(config, store, writer);
        monitor.run().await
    });

    #[cfg(unix)]
    {
        PidManager::new(PID_FILE).remove_pid_file();
    }

    info!("Monitor shutdown complete");
    result
}

async fn run_pull() -> Result<()> {
    let config = MonitorConfig::from_env()?;
    let writer = AttachmentWriter::new(&config.attachments_dir);

    let mut client = ImapClient::new(&config);
    client.connect().await?;

    let result = pull_latest(&config.mailbox, &writer, &mut client).await;
    if let Err(e) = client.disconnect().await {
        warn!("Failed to disconnect IMAP session: {}", e);
    }

    match result? {
        Some(path) => info!("Saved newest attachment to {:?}", path),
        None => info!("No attachments found in any messages"),
    }
    Ok(())
}

async fn run_reset() -> Result<()> {
    let config = MonitorConfig::from_env()?;
    let store = CheckpointStore::new(&config.db_path).await?;
    let writer = AttachmentWriter::new(&config.attachments_dir);
    let scanner = MailboxScanner::new(&config, &store, &writer);

    let mut client = ImapClient::new(&config);
    client.connect().await?;

    let result = scanner.reset_to_latest(&mut client).await;
    if let Err(e) = client.disconnect().await {
        warn!("Failed to disconnect IMAP session: {}", e);
    }

    match result? {
        Some(cp) => info!("Checkpoint now at: {}", cp.subject),
        None => info!("Mailbox is empty, checkpoint unchanged"),
    }
    Ok(())
}
