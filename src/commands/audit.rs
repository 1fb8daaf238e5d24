use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use delog::audit::{AuditStore, StoredAuditRecord};
use delog::config;
use std::path::Path;

const BODY_PREVIEW_CHARS: usize = 40;

/// Execute the audit recent command
///
/// Prints the newest audit rows, most recent first.
pub async fn recent(config_path: &Path, limit: u32) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    let store = AuditStore::connect(&cfg.database).await?;

    let records = store
        .recent(limit)
        .await
        .context("Failed to read audit records")?;
    store.close().await;

    if records.is_empty() {
        println!("{}", "No audit records found".yellow());
        return Ok(());
    }

    println!("{}", render_table(&records));
    println!("{} record(s)", records.len());
    Ok(())
}

fn render_table(records: &[StoredAuditRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Time", "Remote", "Status", "Error", "Request"]);

    for record in records {
        table.add_row(vec![
            record.id.to_string(),
            record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            record.remote_addr.clone(),
            record.status_code.to_string(),
            record.error_msg.clone(),
            preview(&record.request_body),
        ]);
    }

    table
}

/// First line of a body, shortened for display
fn preview(body: &str) -> String {
    let first_line = body.lines().next().unwrap_or("");
    let mut preview: String = first_line.chars().take(BODY_PREVIEW_CHARS).collect();
    if first_line.chars().count() > BODY_PREVIEW_CHARS || body.lines().nth(1).is_some() {
        preview.push('…');
    }
    preview
}
