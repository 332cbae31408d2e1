use crate::core::error::AppResult;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// 检查点：本系统处理过的最新一封邮件
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub message_id: String,
    pub subject: String,
    pub from_address: String,
    /// 邮件自带的 Date 头，不保证可解析为日历时间
    pub message_timestamp: String,
    pub has_attachment: bool,
    pub attachment_filename: Option<String>,
    /// 本系统记录该检查点的本地时间（ISO-8601）
    pub processed_at: String,
}

/// 检查点存储，单表 SQLite，读取始终取插入顺序最新的一行
pub struct CheckpointStore {
    pool: SqlitePool,
}

impl CheckpointStore {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> AppResult<Self> {
        let db_path = db_path.as_ref();
        info!("Initializing checkpoint store at: {}", db_path.display());

        let db_url = format!("sqlite:{}", db_path.display());
        let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> AppResult<()> {
        let migration_sql = include_str!("../../../migrations/001_create_checkpoints_table.sql");
        sqlx::query(migration_sql).execute(&self.pool).await?;
        Ok(())
    }

    /// 取最近记录的检查点，首次运行时为空
    pub async fn get_last(&self) -> AppResult<Option<Checkpoint>> {
        let row = sqlx::query(
            "SELECT message_id, subject, from_address, message_timestamp,
                    has_attachment, attachment_filename, processed_at
             FROM checkpoints ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Checkpoint {
            message_id: row.get("message_id"),
            subject: row.get("subject"),
            from_address: row.get("from_address"),
            message_timestamp: row.get("message_timestamp"),
            has_attachment: row.get("has_attachment"),
            attachment_filename: row.get("attachment_filename"),
            processed_at: row.get("processed_at"),
        }))
    }

    /// 记录检查点；同一 message_id 重复保存时覆盖原行而不是新增
    pub async fn save(&self, checkpoint: &Checkpoint) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO checkpoints
             (message_id, subject, from_address, message_timestamp,
              has_attachment, attachment_filename, processed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(message_id) DO UPDATE SET
             subject = excluded.subject,
             from_address = excluded.from_address,
             message_timestamp = excluded.message_timestamp,
             has_attachment = excluded.has_attachment,
             attachment_filename = excluded.attachment_filename,
             processed_at = excluded.processed_at",
        )
        .bind(&checkpoint.message_id)
        .bind(&checkpoint.subject)
        .bind(&checkpoint.from_address)
        .bind(&checkpoint.message_timestamp)
        .bind(checkpoint.has_attachment)
        .bind(&checkpoint.attachment_filename)
        .bind(&checkpoint.processed_at)
        .execute(&self.pool)
        .await?;

        info!("Saved checkpoint for message: {}", checkpoint.subject);
        Ok(())
    }

    #[cfg(test)]
    async fn count(&self) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM checkpoints")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn checkpoint(message_id: &str, subject: &str) -> Checkpoint {
        Checkpoint {
            message_id: message_id.to_string(),
            subject: subject.to_string(),
            from_address: "sender@example.com".to_string(),
            message_timestamp: "Thu, 7 Aug 2026 10:00:00 +0000".to_string(),
            has_attachment: false,
            attachment_filename: None,
            processed_at: "2026-08-07T10:00:05+00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn test_get_last_on_empty_store() {
        let temp_db = NamedTempFile::new().unwrap();
        let store = CheckpointStore::new(temp_db.path()).await.unwrap();

        assert!(store.get_last().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_get_last() {
        let temp_db = NamedTempFile::new().unwrap();
        let store = CheckpointStore::new(temp_db.path()).await.unwrap();

        let cp = Checkpoint {
            has_attachment: true,
            attachment_filename: Some("invoice.pdf".to_string()),
            ..checkpoint("<a@example.com>", "Invoice")
        };
        store.save(&cp).await.unwrap();

        let last = store.get_last().await.unwrap().unwrap();
        assert_eq!(last, cp);
    }

    #[tokio::test]
    async fn test_save_same_message_id_replaces_row() {
        let temp_db = NamedTempFile::new().unwrap();
        let store = CheckpointStore::new(temp_db.path()).await.unwrap();

        store
            .save(&checkpoint("<a@example.com>", "First"))
            .await
            .unwrap();
        store
            .save(&checkpoint("<a@example.com>", "First (retried)"))
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let last = store.get_last().await.unwrap().unwrap();
        assert_eq!(last.subject, "First (retried)");
    }

    #[tokio::test]
    async fn test_get_last_returns_newest_insertion() {
        let temp_db = NamedTempFile::new().unwrap();
        let store = CheckpointStore::new(temp_db.path()).await.unwrap();

        store
            .save(&checkpoint("<a@example.com>", "Older"))
            .await
            .unwrap();
        store
            .save(&checkpoint("<b@example.com>", "Newer"))
            .await
            .unwrap();

        let last = store.get_last().await.unwrap().unwrap();
        assert_eq!(last.message_id, "<b@example.com>");
        assert_eq!(store.count().await.unwrap(), 2);
    }
}
