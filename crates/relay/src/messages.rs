//! Texts sent back to the requesting chat.

use {
    drivelink_common::format_size,
    drivelink_delivery::DeliveryReport,
    drivelink_drive::Error as StoreError,
};

use crate::RelayError;

#[must_use]
pub fn downloading(name: &str, size_bytes: u64) -> String {
    format!("📥 Downloading {name} ({})...", format_size(size_bytes))
}

#[must_use]
pub fn splitting(name: &str, size_bytes: u64, limit_bytes: u64, parts: u64) -> String {
    format!(
        "✂️ {name} is {}, above the {} limit. It will be sent in {parts} parts.",
        format_size(size_bytes),
        format_size(limit_bytes),
    )
}

/// Reply for a request that was aborted before delivery.
#[must_use]
pub fn failure(error: &RelayError, trigger: &str) -> String {
    match error {
        RelayError::InvalidIdentifier { .. } => {
            format!("❌ Invalid Google Drive link!\nUsage: {trigger} <link>")
        },
        RelayError::Metadata(StoreError::NotDownloadable { reason, .. }) => {
            format!("❌ This file can't be downloaded: {reason}.")
        },
        RelayError::Metadata(StoreError::AccessDenied { .. }) => {
            "❌ Access denied. Make sure the file is shared with anyone who has the link."
                .to_string()
        },
        RelayError::Metadata(StoreError::Unauthorized { .. }) => {
            "❌ Google Drive rejected the bot's credentials. Ask the bot owner to check them."
                .to_string()
        },
        RelayError::Metadata(StoreError::NotFound { .. }) => {
            "❌ File not found. Check the link and the file's sharing settings.".to_string()
        },
        RelayError::Metadata(err) => format!("❌ Couldn't look up the file: {}.", err.brief()),
        RelayError::Transport(err) => format!(
            "❌ Couldn't fetch the file from Google Drive: {}. Please try again later.",
            err.brief()
        ),
        RelayError::Io { source, .. } => {
            format!("❌ Couldn't store the file locally ({source}). Please try again later.")
        },
        RelayError::ThresholdRejection {
            size_bytes,
            limit_bytes,
        } => format!(
            "⚠️ File too large to send ({}, limit {})",
            format_size(*size_bytes),
            format_size(*limit_bytes),
        ),
    }
}

/// Completion summary. For split deliveries it carries reassembly
/// instructions that list every part in ascending index order.
#[must_use]
pub fn completed(file_name: &str, report: &DeliveryReport) -> String {
    let total = report.total();
    let sent = report.sent_count();
    let mut text = if report.all_sent() {
        if total == 1 {
            format!("✅ Sent {file_name}.")
        } else {
            format!("✅ Sent {file_name} in {total} parts.")
        }
    } else {
        let failed = report
            .failed_indices()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        if total == 1 {
            format!("⚠️ Couldn't send {file_name}.")
        } else {
            format!("⚠️ Sent {sent} of {total} parts of {file_name}. Missing parts: {failed}.")
        }
    };

    if total > 1 {
        text.push_str("\n\n");
        text.push_str(&reassembly_instructions(file_name, total));
    }
    text
}

fn reassembly_instructions(file_name: &str, parts: usize) -> String {
    let unix_parts = (1..=parts)
        .map(|i| shell_quote(&format!("{file_name}.part{i}")))
        .collect::<Vec<_>>()
        .join(" ");
    let windows_parts = (1..=parts)
        .map(|i| cmd_quote(&format!("{file_name}.part{i}")))
        .collect::<Vec<_>>()
        .join("+");
    format!(
        "To rebuild the file, concatenate the parts in ascending order (part1, part2, ...):\n\
         • Linux/macOS: cat {unix_parts} > {}\n\
         • Windows: copy /b {windows_parts} {}",
        shell_quote(file_name),
        cmd_quote(file_name),
    )
}

fn needs_quoting(s: &str) -> bool {
    !s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+'))
}

fn shell_quote(s: &str) -> String {
    if needs_quoting(s) {
        format!("'{}'", s.replace('\'', r"'\''"))
    } else {
        s.to_string()
    }
}

fn cmd_quote(s: &str) -> String {
    if needs_quoting(s) {
        format!("\"{s}\"")
    } else {
        s.to_string()
    }
}
