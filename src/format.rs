//! Display helpers for message payloads.

use serde_json::Value;

const BYTES_PER_LINE: usize = 16;
const HEX_COLUMN_WIDTH: usize = BYTES_PER_LINE * 3 - 1;

/// Whether `text` parses as JSON.
#[must_use]
pub fn is_json(text: &str) -> bool {
    serde_json::from_str::<Value>(text).is_ok()
}

/// `text` re-serialized with a two-space indent, keys in their original order. `None` when it is
/// not JSON.
#[must_use]
pub fn pretty_print_json(text: &str) -> Option<String> {
    let value: Value = serde_json::from_str(text).ok()?;
    serde_json::to_string_pretty(&value).ok()
}

/// Classic hex dump of the UTF-8 bytes of `text`.
///
/// ```
/// use socket_probe::format::hex_dump;
///
/// assert_eq!(
///     hex_dump("Hi!"),
///     "00000000  48 69 21                                         |Hi!|"
/// );
/// ```
#[must_use]
pub fn hex_dump(text: &str) -> String {
    let mut lines = Vec::new();

    for (index, chunk) in text.as_bytes().chunks(BYTES_PER_LINE).enumerate() {
        let hex = chunk
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect::<Vec<_>>()
            .join(" ");

        let ascii: String = chunk
            .iter()
            .map(|&byte| {
                if byte.is_ascii_graphic() || byte == b' ' {
                    char::from(byte)
                } else {
                    '.'
                }
            })
            .collect();

        lines.push(format!(
            "{:08x}  {hex:<HEX_COLUMN_WIDTH$}  |{ascii}|",
            index * BYTES_PER_LINE
        ));
    }

    lines.join("\n")
}
