//! Benchmark utilities.

use rand::Rng;
use serde_json::json;
use stagekv_core::Value;

/// Generates a JSON value carrying roughly `size` bytes of payload.
pub fn random_value(size: usize) -> Value {
    let mut rng = rand::thread_rng();
    let payload: String = (0..size)
        .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
        .collect();
    Value::new(json!({ "payload": payload, "n": rng.gen::<u32>() }))
}

/// Generates `count` distinct keys with the given prefix.
pub fn keys(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}:{i:06}")).collect()
}

/// Picks a random key from `keys`.
pub fn pick<'a>(keys: &'a [String]) -> &'a str {
    let i = rand::thread_rng().gen_range(0..keys.len());
    &keys[i]
}
