use crate::core::error::AppResult;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// 附件落盘：目录按需创建，文件名带时间戳前缀避免覆盖
pub struct AttachmentWriter {
    output_dir: PathBuf,
}

impl AttachmentWriter {
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 写入附件，返回实际保存路径
    pub fn write(&self, original_filename: &str, data: &[u8]) -> AppResult<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        // 微秒级时间戳，同一次运行内重名附件也不会相互覆盖
        let timestamp = Local::now().format("%Y-%m-%dT%H-%M-%S-%6fZ").to_string();
        let safe_filename = format!(
            "attachment-{}-{}",
            timestamp,
            sanitize_filename(original_filename)
        );
        let file_path = self.output_dir.join(safe_filename);

        fs::write(&file_path, data)?;

        info!("Attachment saved to: {:?}", file_path);
        Ok(file_path)
    }
}

/// 清理文件名中对文件系统不安全的字符
fn sanitize_filename(filename: &str) -> String {
    let mut sanitized = String::with_capacity(filename.len());
    for c in filename.chars() {
        match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => sanitized.push('_'),
            c if c.is_whitespace() => sanitized.push('_'),
            c if c.is_control() => sanitized.push('_'),
            c => sanitized.push(c),
        }
    }

    // 连续下划线折叠成一个，再去掉首尾下划线
    let mut collapsed = String::with_capacity(sanitized.len());
    let mut prev_underscore = false;
    for c in sanitized.chars() {
        if c == '_' {
            if !prev_underscore {
                collapsed.push(c);
            }
            prev_underscore = true;
        } else {
            collapsed.push(c);
            prev_underscore = false;
        }
    }
    let trimmed = collapsed.trim_matches('_');

    if trimmed.is_empty() {
        "attachment.bin".to_string()
    } else {
        trimmed.to_string()
    }
}
