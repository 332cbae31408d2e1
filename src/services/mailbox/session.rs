use anyhow::Result;
use async_trait::async_trait;

/// 邮箱会话抽象，扫描逻辑只依赖这组只读操作
#[async_trait]
pub trait MailboxSession: Send {
    async fn connect(&mut self) -> Result<()>;
    async fn disconnect(&mut self) -> Result<()>;
    /// 选中邮箱，返回其中的邮件数量
    async fn select_mailbox(&mut self, mailbox: &str) -> Result<u32>;
    /// 列出全部邮件序号，升序
    async fn search_all(&mut self) -> Result<Vec<u32>>;
    /// 按序号取回完整原始报文
    async fn fetch_message(&mut self, seq: u32) -> Result<Option<Vec<u8>>>;
}
