use crate::core::config::MonitorConfig;
use crate::core::error::AppError;
use crate::infrastructure::imap::ImapClient;
use crate::services::mailbox::attachment::AttachmentWriter;
use crate::services::mailbox::checkpoint::CheckpointStore;
use crate::services::mailbox::scanner::{MailboxScanner, ScanOutcome};
use crate::services::mailbox::session::MailboxSession;
use anyhow::Result;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// 邮箱监控器：固定间隔反复执行扫描周期，直到外部中断
pub struct MailboxMonitor {
    config: MonitorConfig,
    store: CheckpointStore,
    writer: AttachmentWriter,
}

impl MailboxMonitor {
    pub fn new(config: MonitorConfig, store: CheckpointStore, writer: AttachmentWriter) -> Self {
        Self {
            config,
            store,
            writer,
        }
    }

    /// 启动监控循环
    pub async fn run(&self) -> Result<()> {
        info!("Starting mailbox monitoring...");
        info!(
            "IMAP Server: {}:{}",
            self.config.imap_server, self.config.imap_port
        );
        info!("Mailbox: {}", self.config.mailbox);
        info!("Poll interval: {} seconds", self.config.poll_interval);
        info!("Attachments directory: {:?}", self.writer.output_dir());

        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.poll_interval));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // 取消只在周期边界生效，进行中的周期会先完成当前网络往返
            tokio::select! {
                _ = interval.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Received interrupt, stopping monitor...");
                    break;
                }
            }

            match self.run_cycle().await {
                Ok(ScanOutcome::Advanced(cp)) => {
                    info!("Processed 1 new email: {}", cp.subject);
                }
                Ok(ScanOutcome::NoNewMail) => info!("No new emails found"),
                Ok(ScanOutcome::EmptyMailbox) => info!("No messages found in mailbox"),
                Err(e) => {
                    // 配置类错误不可重试；其余故障都按同一固定间隔重试
                    if e.downcast_ref::<AppError>().is_some_and(AppError::is_fatal) {
                        return Err(e);
                    }
                    error!("Scan cycle failed: {:#}", e);
                    info!("Retrying in {} seconds...", self.config.poll_interval);
                }
            }
        }

        Ok(())
    }

    /// 一个完整的扫描周期：开新会话、扫描、无论结果如何都干净断开
    async fn run_cycle(&self) -> Result<ScanOutcome> {
        let mut client = ImapClient::new(&self.config);
        client.connect().await?;

        let scanner = MailboxScanner::new(&self.config, &self.store, &self.writer);
        let outcome = scanner.run_cycle(&mut client).await;

        if let Err(e) = client.disconnect().await {
            warn!("Failed to disconnect IMAP session: {}", e);
        }

        outcome
    }
}
