//! Serializable store operations.
//!
//! A mutation log is a JSONL file where each line is one operation:
//!
//! ```jsonl
//! { "type": "build", "messages": [ { "id": "1" }, { "id": "2", "parent": { "id": "1" } } ] }
//! { "type": "add", "messages": [ { "id": "3", "parent": { "id": "2" } } ] }
//! { "type": "edit", "message": { "id": "2", "parent": { "id": "1" }, "text": "edited" } }
//! { "type": "remove", "ids": ["2"] }
//! { "type": "clear" }
//! ```

use std::io::BufRead;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::store::{BatchReport, RemoveReport};

/// One store operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeMutation {
    /// Replace the whole tree.
    Build { messages: Vec<Message> },
    /// Merge new messages; existing ids are skipped.
    Add { messages: Vec<Message> },
    /// Drop messages, promoting their children.
    Remove { ids: Vec<String> },
    /// Swap the payload of an existing message.
    Edit { message: Message },
    /// Drop everything.
    Clear,
}

/// What applying a [`TreeMutation`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MutationReport {
    Batch(BatchReport),
    Remove(RemoveReport),
    Edit { found: bool },
    Clear,
}

/// Reads a JSONL mutation log. Blank lines are ignored.
pub fn read_log(reader: impl BufRead) -> Result<Vec<TreeMutation>> {
    let mut mutations = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mutation: TreeMutation = serde_json::from_str(trimmed)
            .with_context(|| format!("parse mutation on line {}", idx + 1))?;
        mutations.push(mutation);
    }
    Ok(mutations)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_read_log_parses_every_kind() {
        let log = r#"
{"type":"build","messages":[{"id":"1"},{"id":"2","parent":{"id":"1"}}]}
{"type":"add","messages":[{"id":"3","parent":{"id":"2"}}]}

{"type":"edit","message":{"id":"2","text":"edited"}}
{"type":"remove","ids":["2"]}
{"type":"clear"}
"#;
        let mutations = read_log(Cursor::new(log)).unwrap();
        assert_eq!(mutations.len(), 5);
        assert!(matches!(&mutations[0], TreeMutation::Build { messages } if messages.len() == 2));
        assert!(matches!(&mutations[3], TreeMutation::Remove { ids } if ids == &["2"]));
        assert_eq!(mutations[4], TreeMutation::Clear);
    }

    #[test]
    fn test_read_log_reports_line_number() {
        let log = "{\"type\":\"clear\"}\n{\"type\":\"explode\"}\n";
        let err = read_log(Cursor::new(log)).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_mutation_serializes_with_tag() {
        let value = serde_json::to_value(TreeMutation::Remove {
            ids: vec!["a".into()],
        })
        .unwrap();
        assert_eq!(value["type"], "remove");
        assert_eq!(value["ids"][0], "a");
    }
}
