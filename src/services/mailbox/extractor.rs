use mail_parser::{Message, MimeHeaders, PartType};

/// 一封邮件的标准化元数据
#[derive(Debug, Clone)]
pub struct MessageMeta {
    pub message_id: String,
    pub subject: String,
    pub from_address: String,
    /// 邮件 Date 头的规范化文本，缺失或无法解析时为空
    pub timestamp: String,
    /// Date 头对应的 Unix 时间戳，用于遍历顺序校验
    pub date_epoch: Option<i64>,
}

/// 附件内容
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub data: Vec<u8>,
}

/// 邮件内容提取器
pub struct MessageExtractor;

impl MessageExtractor {
    /// 提取元数据；缺失的头部得到空字符串而不是错误
    pub fn extract_metadata(parsed: &Message) -> MessageMeta {
        MessageMeta {
            message_id: parsed.message_id().unwrap_or("").to_string(),
            subject: parsed.subject().unwrap_or("").to_string(),
            from_address: parsed
                .from()
                .and_then(|l| l.first())
                .and_then(|a| a.address.as_ref())
                .map(|s| s.to_string())
                .unwrap_or_default(),
            timestamp: parsed.date().map(|d| d.to_rfc3339()).unwrap_or_default(),
            date_epoch: parsed.date().map(|d| d.to_timestamp()),
        }
    }

    /// 按文档顺序遍历各部分，返回第一个带文件名的 attachment 部分
    pub fn extract_first_attachment(parsed: &Message) -> Option<Attachment> {
        for part in &parsed.parts {
            // multipart 容器本身不是附件
            if matches!(part.body, PartType::Multipart(_)) {
                continue;
            }

            // 只认 Content-Disposition: attachment，inline 部分不算
            let is_attachment = part
                .content_disposition()
                .is_some_and(|cd| cd.c_type.eq_ignore_ascii_case("attachment"));
            if !is_attachment {
                continue;
            }

            if let Some(filename) = part.attachment_name() {
                return Some(Attachment {
                    filename: filename.to_string(),
                    data: part.contents().to_vec(),
                });
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mail_parser::MessageParser;

    const PLAIN_MESSAGE: &[u8] = b"Message-ID: <plain@example.com>\r\n\
Subject: Weekly report\r\n\
From: Alice <alice@example.com>\r\n\
Date: Thu, 7 Aug 2026 10:00:00 +0000\r\n\
Content-Type: text/plain\r\n\
\r\n\
Nothing attached here.\r\n";

    const ATTACHMENT_MESSAGE: &[u8] = b"Message-ID: <invoice@example.com>\r\n\
Subject: =?utf-8?B?5rWL6K+V?=\r\n\
From: Bob <bob@example.com>\r\n\
Date: Thu, 7 Aug 2026 11:30:00 +0000\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: text/plain\r\n\
\r\n\
See attached.\r\n\
--b1\r\n\
Content-Type: application/pdf\r\n\
Content-Disposition: attachment; filename=\"invoice.pdf\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
SGVsbG8gUERG\r\n\
--b1--\r\n";

    const INLINE_MESSAGE: &[u8] = b"Message-ID: <inline@example.com>\r\n\
Subject: Logo\r\n\
From: Carol <carol@example.com>\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/related; boundary=\"b2\"\r\n\
\r\n\
--b2\r\n\
Content-Type: text/html\r\n\
\r\n\
<img src=\"cid:logo\">\r\n\
--b2\r\n\
Content-Type: image/png\r\n\
Content-Disposition: inline; filename=\"logo.png\"\r\n\
\r\n\
not-really-a-png\r\n\
--b2--\r\n";

    #[test]
    fn test_extract_metadata() {
        let parsed = MessageParser::default().parse(PLAIN_MESSAGE).unwrap();
        let meta = MessageExtractor::extract_metadata(&parsed);

        assert_eq!(meta.message_id, "plain@example.com");
        assert_eq!(meta.subject, "Weekly report");
        assert_eq!(meta.from_address, "alice@example.com");
        assert!(meta.timestamp.starts_with("2026-08-07"));
        assert!(meta.date_epoch.is_some());
    }

    #[test]
    fn test_extract_metadata_decodes_encoded_subject() {
        let parsed = MessageParser::default().parse(ATTACHMENT_MESSAGE).unwrap();
        let meta = MessageExtractor::extract_metadata(&parsed);

        assert_eq!(meta.subject, "测试");
        assert_eq!(meta.from_address, "bob@example.com");
    }

    #[test]
    fn test_extract_metadata_with_missing_headers() {
        let parsed = MessageParser::default()
            .parse(&b"Content-Type: text/plain\r\n\r\nbody only\r\n"[..])
            .unwrap();
        let meta = MessageExtractor::extract_metadata(&parsed);

        assert_eq!(meta.message_id, "");
        assert_eq!(meta.subject, "");
        assert_eq!(meta.from_address, "");
        assert_eq!(meta.timestamp, "");
        assert!(meta.date_epoch.is_none());
    }

    #[test]
    fn test_extract_first_attachment() {
        let parsed = MessageParser::default().parse(ATTACHMENT_MESSAGE).unwrap();
        let att = MessageExtractor::extract_first_attachment(&parsed).unwrap();

        assert_eq!(att.filename, "invoice.pdf");
        assert_eq!(att.data, b"Hello PDF");
    }

    #[test]
    fn test_no_attachment_in_plain_message() {
        let parsed = MessageParser::default().parse(PLAIN_MESSAGE).unwrap();
        assert!(MessageExtractor::extract_first_attachment(&parsed).is_none());
    }

    #[test]
    fn test_inline_part_is_not_an_attachment() {
        let parsed = MessageParser::default().parse(INLINE_MESSAGE).unwrap();
        assert!(MessageExtractor::extract_first_attachment(&parsed).is_none());
    }
}
