use crate::core::error::{AppError, AppResult};
use std::path::PathBuf;
use tracing::warn;

/// 邮箱监控配置，进程启动时构建一次，之后按引用传递
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    pub imap_server: String,
    pub imap_port: u16,
    pub mailbox: String,
    pub username: String,
    pub password: String,
    pub poll_interval: u64,
    pub db_path: PathBuf,
    pub attachments_dir: PathBuf,
}

impl MonitorConfig {
    /// 从.env文件创建配置
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let config = Self {
            imap_server: Self::env_or("IMAP_SERVER", "imap.gmail.com"),
            imap_port: Self::env_parse("IMAP_PORT", 993)?,
            mailbox: Self::env_or("MAILBOX", "INBOX"),
            username: Self::env_required("EMAIL_USER")?,
            password: Self::env_required("EMAIL_PASS")?,
            poll_interval: Self::env_parse("POLL_INTERVAL", 30)?,
            db_path: Self::env_or("DB_PATH", "mail-watcher.db").into(),
            attachments_dir: Self::env_or("ATTACHMENTS_DIR", "attachments").into(),
        };

        config.validate()?;
        Ok(config)
    }

    /// 验证配置有效性
    fn validate(&self) -> AppResult<()> {
        if self.imap_port == 0 {
            return Err(AppError::Config(format!(
                "Invalid IMAP port: {}",
                self.imap_port
            )));
        }
        if self.imap_server.is_empty() {
            return Err(AppError::Config("IMAP server cannot be empty".to_string()));
        }
        if self.mailbox.is_empty() {
            return Err(AppError::Config("Mailbox name cannot be empty".to_string()));
        }

        if self.poll_interval == 0 {
            return Err(AppError::Config(
                "Poll interval must be greater than 0".to_string(),
            ));
        }
        if self.poll_interval > 3600 {
            warn!(
                "Poll interval {} is very long (>1 hour), is this intended?",
                self.poll_interval
            );
        }

        if self.db_path.to_str().is_none_or(|s| s.is_empty()) {
            return Err(AppError::Config("Database path is invalid".to_string()));
        }
        if self.attachments_dir.to_str().is_none_or(|s| s.is_empty()) {
            return Err(AppError::Config(
                "Attachments directory path is invalid".to_string(),
            ));
        }

        Ok(())
    }

    /// 读取环境变量或使用默认值
    fn env_or(key: &str, default: &str) -> String {
        std::env::var(key).unwrap_or_else(|_| default.to_string())
    }

    /// 读取并解析环境变量，未设置时使用默认值
    fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> AppResult<T>
    where
        T::Err: std::fmt::Display,
    {
        match std::env::var(key) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::Config(format!("Invalid {}: {}", key, e))),
            Err(_) => Ok(default),
        }
    }

    /// 读取必需的环境变量，缺失视为致命错误
    fn env_required(key: &str) -> AppResult<String> {
        std::env::var(key).map_err(|_| AppError::Config(format!("{} not set in .env file", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_config_from_env() {
        std::env::set_var("EMAIL_USER", "test@example.com");
        std::env::set_var("EMAIL_PASS", "password123");

        let config = MonitorConfig::from_env();
        assert!(config.is_ok());

        let config = config.unwrap();
        assert_eq!(config.username, "test@example.com");
        assert_eq!(config.password, "password123");
        assert_eq!(config.imap_port, 993);
        assert_eq!(config.mailbox, "INBOX");
        assert_eq!(config.poll_interval, 30);
    }

    #[test]
    fn test_missing_credentials_is_config_error() {
        std::env::remove_var("EMAIL_USER_MISSING_TEST");
        let err = MonitorConfig::env_required("EMAIL_USER_MISSING_TEST").unwrap_err();
        assert!(err.is_fatal());
    }
}
