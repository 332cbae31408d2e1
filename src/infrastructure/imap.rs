use crate::core::config::MonitorConfig;
use crate::services::mailbox::session::MailboxSession;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_native_tls::TlsConnector;
use tracing::info;

pub type ImapSession = async_imap::Session<tokio_native_tls::TlsStream<TcpStream>>;

pub struct ImapClient {
    server: String,
    port: u16,
    username: String,
    password: String,
    session: Option<ImapSession>,
}

impl ImapClient {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            server: config.imap_server.clone(),
            port: config.imap_port,
            username: config.username.clone(),
            password: config.password.clone(),
            session: None,
        }
    }
}

#[async_trait]
impl MailboxSession for ImapClient {
    async fn connect(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }

        info!("Connecting to IMAP server {}:{}", self.server, self.port);
        let tcp_stream = TcpStream::connect((self.server.as_str(), self.port))
            .await
            .context("Failed to connect to IMAP server (TCP)")?;

        let native_tls = native_tls::TlsConnector::builder()
            .build()
            .context("Failed to create TLS connector")?;
        let connector = TlsConnector::from(native_tls);

        let tls_stream = connector
            .connect(&self.server, tcp_stream)
            .await
            .context("Failed to establish TLS connection")?;

        let client = async_imap::Client::new(tls_stream);

        let session = client
            .login(&self.username, &self.password)
            .await
            .map_err(|e| e.0)
            .context("IMAP authentication failed")?;

        info!("Successfully logged in to IMAP server");
        self.session = Some(session);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        // LOGOUT 足以干净结束会话；本系统只读不删，无需 CLOSE 触发 expunge
        if let Some(mut session) = self.session.take() {
            session.logout().await.context("Failed to logout")?;
        }
        Ok(())
    }

    async fn select_mailbox(&mut self, mailbox: &str) -> Result<u32> {
        let session = self.session.as_mut().context("IMAP session not connected")?;
        let inbox = session
            .select(mailbox)
            .await
            .context("Failed to select mailbox")?;
        Ok(inbox.exists)
    }

    async fn search_all(&mut self) -> Result<Vec<u32>> {
        let session = self.session.as_mut().context("IMAP session not connected")?;
        let result = session
            .search("ALL")
            .await
            .context("Failed to search messages")?;

        // SEARCH 的返回顺序不可依赖，显式按序号升序排列
        let mut seqs: Vec<u32> = result.into_iter().collect();
        seqs.sort_unstable();
        Ok(seqs)
    }

    async fn fetch_message(&mut self, seq: u32) -> Result<Option<Vec<u8>>> {
        let session = self.session.as_mut().context("IMAP session not connected")?;
        // BODY.PEEK[] 取全文但不触发 \Seen，保持对邮箱完全只读
        let mut fetch_stream = session
            .fetch(seq.to_string(), "BODY.PEEK[]")
            .await
            .context("Failed to fetch message")?;

        if let Some(msg) = fetch_stream.next().await {
            let msg = msg.context("Failed to read fetch result")?;
            return Ok(msg.body().map(|b| b.to_vec()));
        }
        Ok(None)
    }
}
