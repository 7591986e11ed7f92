//! Single-operation commands: get, put, delete.

use super::{open_engine, parse_value};
use std::path::Path;

/// Runs the get command.
pub fn get(path: &Path, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(path)?;
    let value = engine.get(None, key)?;
    println!("{value}");
    Ok(())
}

/// Runs the put command.
pub fn put(path: &Path, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(path)?;
    engine.put(None, key, parse_value(value))?;
    println!("OK");
    Ok(())
}

/// Runs the delete command.
pub fn delete(path: &Path, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(path)?;
    engine.delete(None, key)?;
    println!("OK");
    Ok(())
}
