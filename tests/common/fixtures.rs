//! NDJSON payload fixtures

/// Records split mid-line across two deliveries, with a blank line and no
/// trailing newline
pub const SPLIT_PAYLOAD: [&str; 2] = [
    "{ \"test\": \"data\" }\n{ \"second\": \"t",
    "est\" }\n{ \"third\": 3 }\n\n{ \"fourth\": \"four\" }",
];

/// Three well-formed records, newline-terminated
pub const THREE_RECORDS: &str = "{\"id\":1}\n{\"id\":2}\n{\"id\":3}\n";

/// Build a newline-terminated payload of `count` numbered records
pub fn numbered_records(count: usize) -> String {
    (0..count)
        .map(|i| format!("{{\"id\":{i},\"label\":\"record {i}\"}}\n"))
        .collect()
}
