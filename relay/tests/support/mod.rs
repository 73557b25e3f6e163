//! Test support utilities for end-to-end tests of the relay process
#![allow(dead_code)] // Not every helper is used by every test binary

use std::path::Path;

/// A configuration with an in-memory store that writes `.eml` files into
/// `spool`
pub fn file_relay_config(spool: &Path, delivery: &str) -> String {
    format!(
        r#"Relay (
            store: Memory,
            transport: (
                backend: File(path: "{}"),
                default_from: Some("noreply@example.com"),
            ),
            delivery: {delivery},
        )"#,
        spool.display()
    )
}

/// Contents of every `.eml` file in `dir`, sorted by content
pub fn delivered(dir: &Path) -> Vec<String> {
    let mut messages: Vec<String> = std::fs::read_dir(dir)
        .expect("Failed to read spool directory")
        .map(|entry| entry.expect("Failed to read entry").path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "eml"))
        .map(|path| std::fs::read_to_string(path).expect("Failed to read message"))
        .collect();
    messages.sort();
    messages
}
