/// ログやエラーに載せる文字列の整形。
pub(crate) const MAX_ERROR_MESSAGE_LENGTH: usize = 500;

/// エラーメッセージを文字数で切り詰める。
#[must_use]
pub(crate) fn truncate_error_message(msg: &str) -> String {
    let char_count = msg.chars().count();
    if char_count <= MAX_ERROR_MESSAGE_LENGTH {
        return msg.to_string();
    }
    let truncated: String = msg.chars().take(MAX_ERROR_MESSAGE_LENGTH).collect();
    format!("{truncated}... (truncated, {char_count} chars)")
}

/// 資格情報をログに出すときは先頭 4 文字だけ残す。
#[must_use]
pub(crate) fn redact(input: &str) -> String {
    let prefix: String = input.chars().take(4).collect();
    if input.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{prefix}***")
    }
}
