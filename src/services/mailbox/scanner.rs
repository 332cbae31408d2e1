use crate::core::config::MonitorConfig;
use crate::services::mailbox::attachment::AttachmentWriter;
use crate::services::mailbox::checkpoint::{Checkpoint, CheckpointStore};
use crate::services::mailbox::extractor::{MessageExtractor, MessageMeta};
use crate::services::mailbox::session::MailboxSession;
use anyhow::Result;
use chrono::Local;
use mail_parser::MessageParser;
use std::path::PathBuf;
use tracing::{info, warn};

/// 一轮扫描的结果，区分"没有新邮件"和"出错"
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// 检查点推进到了一封新邮件
    Advanced(Checkpoint),
    /// 走到检查点或遍历完毕，没有新邮件
    NoNewMail,
    /// 邮箱里一封邮件也没有
    EmptyMailbox,
}

/// 邮箱扫描器：对照检查点做一次完整的新旧比对
pub struct MailboxScanner<'a> {
    config: &'a MonitorConfig,
    store: &'a CheckpointStore,
    writer: &'a AttachmentWriter,
}

impl<'a> MailboxScanner<'a> {
    pub fn new(
        config: &'a MonitorConfig,
        store: &'a CheckpointStore,
        writer: &'a AttachmentWriter,
    ) -> Self {
        Self {
            config,
            store,
            writer,
        }
    }

    /// 执行一轮扫描：从最新到最旧遍历，遇到检查点即停；
    /// 每轮最多处理一封新邮件（最新的那封）
    pub async fn run_cycle<S: MailboxSession>(&self, session: &mut S) -> Result<ScanOutcome> {
        session.select_mailbox(&self.config.mailbox).await?;
        let seqs = session.search_all().await?;

        if seqs.is_empty() {
            return Ok(ScanOutcome::EmptyMailbox);
        }

        let last = self.store.get_last().await?;
        let parser = MessageParser::default();
        let mut prev_epoch: Option<i64> = None;

        for &seq in seqs.iter().rev() {
            let Some(raw) = session.fetch_message(seq).await? else {
                warn!("Message {} returned no data, skipping", seq);
                continue;
            };

            // 单封邮件解析失败不终止本轮，跳到下一封
            let Some(parsed) = parser.parse(&raw) else {
                warn!("Message {} could not be parsed, skipping", seq);
                continue;
            };

            let meta = MessageExtractor::extract_metadata(&parsed);
            check_walk_order(seq, &meta, &mut prev_epoch);

            if let Some(cp) = &last {
                if cp.message_id == meta.message_id {
                    info!("Reached last processed message: {}", cp.subject);
                    return Ok(ScanOutcome::NoNewMail);
                }
            }

            info!("New message found: {}", meta.subject);
            info!("  From: {}", meta.from_address);
            info!("  Date: {}", meta.timestamp);

            // 附件保存失败按"没有保存附件"处理，检查点照常推进
            let saved_filename = MessageExtractor::extract_first_attachment(&parsed)
                .and_then(|att| match self.writer.write(&att.filename, &att.data) {
                    Ok(_) => Some(att.filename),
                    Err(e) => {
                        warn!("Failed to save attachment {}: {}", att.filename, e);
                        None
                    }
                });

            let checkpoint = Checkpoint {
                message_id: meta.message_id,
                subject: meta.subject,
                from_address: meta.from_address,
                message_timestamp: meta.timestamp,
                has_attachment: saved_filename.is_some(),
                attachment_filename: saved_filename,
                processed_at: Local::now().to_rfc3339(),
            };
            self.store.save(&checkpoint).await?;

            // 节流：每轮只推进一封，积压的旧邮件不批量补处理
            return Ok(ScanOutcome::Advanced(checkpoint));
        }

        // 遍历完也没遇到检查点（例如被记录的邮件已从邮箱删除）：
        // 本轮没有新邮件，过期的检查点原样保留
        Ok(ScanOutcome::NoNewMail)
    }

    /// 把检查点移到邮箱里最新的一封邮件上，不保存任何附件
    pub async fn reset_to_latest<S: MailboxSession>(
        &self,
        session: &mut S,
    ) -> Result<Option<Checkpoint>> {
        session.select_mailbox(&self.config.mailbox).await?;
        let seqs = session.search_all().await?;
        let parser = MessageParser::default();

        for &seq in seqs.iter().rev() {
            let Some(raw) = session.fetch_message(seq).await? else {
                continue;
            };
            let Some(parsed) = parser.parse(&raw) else {
                warn!("Message {} could not be parsed, skipping", seq);
                continue;
            };

            let meta = MessageExtractor::extract_metadata(&parsed);
            let attachment = MessageExtractor::extract_first_attachment(&parsed);

            let checkpoint = Checkpoint {
                message_id: meta.message_id,
                subject: meta.subject,
                from_address: meta.from_address,
                message_timestamp: meta.timestamp,
                has_attachment: attachment.is_some(),
                attachment_filename: attachment.map(|att| att.filename),
                processed_at: Local::now().to_rfc3339(),
            };
            self.store.save(&checkpoint).await?;

            info!("Reset checkpoint to latest message: {}", checkpoint.subject);
            return Ok(Some(checkpoint));
        }

        Ok(None)
    }
}

/// 一次性模式：无视检查点（既不读也不写），从最新往旧找第一封带附件的
/// 邮件并保存
pub async fn pull_latest<S: MailboxSession>(
    mailbox: &str,
    writer: &AttachmentWriter,
    session: &mut S,
) -> Result<Option<PathBuf>> {
    session.select_mailbox(mailbox).await?;
    let seqs = session.search_all().await?;
    let parser = MessageParser::default();

    for &seq in seqs.iter().rev() {
        let Some(raw) = session.fetch_message(seq).await? else {
            continue;
        };
        let Some(parsed) = parser.parse(&raw) else {
            warn!("Message {} could not be parsed, skipping", seq);
            continue;
        };

        if let Some(att) = MessageExtractor::extract_first_attachment(&parsed) {
            let path = writer.write(&att.filename, &att.data)?;
            return Ok(Some(path));
        }
    }

    Ok(None)
}

/// 设计假定服务器按分配顺序返回序号、倒序即最新优先；
/// 遍历时校验时间戳单调不增，发现乱序就明说
fn check_walk_order(seq: u32, meta: &MessageMeta, prev_epoch: &mut Option<i64>) {
    if let (Some(prev), Some(cur)) = (*prev_epoch, meta.date_epoch) {
        if cur > prev {
            warn!(
                "Message {} is dated after its predecessor in walk order; \
                 server sequence ordering may not match message dates",
                seq
            );
        }
    }
    if meta.date_epoch.is_some() {
        *prev_epoch = meta.date_epoch;
    }
}
