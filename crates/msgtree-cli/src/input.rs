//! Message file loading.
//!
//! Accepts either a JSON array of messages or JSONL (one message per line).

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use msgtree_core::Message;

/// Reads messages from `path`, or from stdin when `path` is `-`.
pub fn read_messages(path: &Path) -> Result<Vec<Message>> {
    let contents = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("read messages from stdin")?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
    };
    parse_messages(&contents).with_context(|| format!("parse messages from {}", path.display()))
}

pub fn parse_messages(contents: &str) -> Result<Vec<Message>> {
    let trimmed = contents.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    let mut messages = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let message: Message =
            serde_json::from_str(line).with_context(|| format!("line {}", idx + 1))?;
        messages.push(message);
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_json_array() {
        let messages = parse_messages(r#"[{"id":"a"},{"id":"b","parent":{"id":"a"}}]"#).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].parent_id(), Some("a"));
    }

    #[test]
    fn test_parses_jsonl_skipping_blank_lines() {
        let input = "{\"id\":\"a\"}\n\n{\"id\":\"b\",\"sequence\":2}\n";
        let messages = parse_messages(input).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].sequence, Some(2));
    }

    #[test]
    fn test_empty_input_is_no_messages() {
        assert!(parse_messages("").unwrap().is_empty());
        assert!(parse_messages("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let err = parse_messages("{\"id\":\"a\"}\nnot json\n").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }
}
