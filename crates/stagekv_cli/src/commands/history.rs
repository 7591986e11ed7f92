//! History command implementation.

use super::format_timestamp;
use stagekv_core::{CommitKind, CommitRecord, Config};
use std::fs;
use std::path::Path;

/// Runs the history command.
///
/// Reads the history file directly, so it works while another process
/// holds the store open.
pub fn run(path: &Path, limit: Option<usize>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let name = Config::default()
        .history_file
        .ok_or("history file is disabled")?;
    let history_path = path.join(name);

    if !history_path.exists() {
        return Err(format!("no commit history at {}", history_path.display()).into());
    }

    let records = read_records(&history_path)?;
    let skip = limit.map_or(0, |n| records.len().saturating_sub(n));
    let records = &records[skip..];

    match format {
        "json" => {
            for record in records {
                println!("{}", record.to_json_line()?);
            }
        }
        _ => {
            print_text_output(records);
        }
    }

    Ok(())
}

/// Parses every line of a history file.
pub fn read_records(path: &Path) -> Result<Vec<CommitRecord>, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    let mut records = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: CommitRecord = serde_json::from_str(line)
            .map_err(|e| format!("line {}: {e}", line_no + 1))?;
        records.push(record);
    }
    Ok(records)
}

fn print_text_output(records: &[CommitRecord]) {
    println!("Commits: {}", records.len());
    println!();

    for record in records {
        let kind = match record.kind {
            CommitKind::Transaction => "TXN ",
            CommitKind::Autocommit => "AUTO",
        };
        print!(
            "{} {:>8}  {}",
            format_timestamp(record.timestamp_ms),
            record.sequence.as_u64(),
            kind
        );
        if let Some(thread) = &record.thread {
            print!("  [{thread}]");
        }
        println!();

        for (key, value) in &record.writes {
            println!("    SET {key} = {value}");
        }
        for key in &record.deletes {
            println!("    DEL {key}");
        }
    }
}
