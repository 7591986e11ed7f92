//! Dump command implementation.

use super::open_engine;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Committed store contents for output.
#[derive(Debug, Serialize)]
pub struct DumpResult {
    /// Store directory.
    pub path: String,
    /// Sequence number of the latest durable apply.
    pub committed_seq: u64,
    /// Every committed key and value.
    pub data: BTreeMap<String, serde_json::Value>,
}

/// Runs the dump command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(path)?;
    let result = DumpResult {
        path: path.display().to_string(),
        committed_seq: engine.committed_seq().as_u64(),
        data: engine
            .dump_committed()?
            .into_iter()
            .map(|(key, value)| (key, value.into_json()))
            .collect(),
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &DumpResult) {
    println!("Store: {}", result.path);
    println!("Committed sequence: {}", result.committed_seq);
    println!("Keys: {}", result.data.len());
    println!();
    for (key, value) in &result.data {
        println!("{key} = {value}");
    }
}
