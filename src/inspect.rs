//! Record inspector: a readable digest of the first record of a log.
//!
//! Only the first line is read. Unlike the comparator's loader there is no
//! per-line recovery here; a first line that does not parse is an error.

use crate::config::InspectConfig;
use crate::loader;
use serde::Deserialize;
use serde_json::Value;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Markers that make an agent message worth previewing.
const ACTION_KEYWORDS: [&str; 3] = ["run", "read", "write"];
const CODE_FENCE: &str = "```";

/// The fields of a log record the inspector looks at.
#[derive(Debug, Deserialize)]
pub struct InspectedRecord {
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub history: Option<History>,
}

/// Conversation history. Anything other than a list is ignored.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum History {
    Events(Vec<Value>),
    Other(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Agent,
    Other,
}

/// One history event that is a JSON object.
#[derive(Debug, Clone, Copy)]
pub struct Turn<'a> {
    pub speaker: Speaker,
    pub message: &'a str,
}

impl<'a> Turn<'a> {
    /// `None` for history entries that are not objects.
    fn from_value(v: &'a Value) -> Option<Self> {
        let obj = v.as_object()?;
        let speaker = match obj.get("source").and_then(Value::as_str) {
            Some("user") => Speaker::User,
            Some("agent") => Speaker::Agent,
            _ => Speaker::Other,
        };
        let message = obj.get("message").and_then(Value::as_str).unwrap_or("");
        Some(Turn { speaker, message })
    }

    /// Heuristic for operational turns: code fences or run/read/write.
    pub fn looks_operational(&self) -> bool {
        if self.message.contains(CODE_FENCE) {
            return true;
        }
        let lower = self.message.to_lowercase();
        ACTION_KEYWORDS.iter().any(|k| lower.contains(k))
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Build the digest lines for one record.
pub fn digest(record: &InspectedRecord, cfg: &InspectConfig) -> Vec<String> {
    let mut out = Vec::new();
    let id = record
        .instance_id
        .as_deref()
        .unwrap_or(crate::record::UNKNOWN_INSTANCE);
    out.push(format!("Instance ID: {id}"));
    out.push("=".repeat(60));

    if let Some(instruction) = &record.instruction {
        out.push(String::new());
        out.push("Task instruction:".to_string());
        out.push(format!(
            "{}...",
            truncate_chars(instruction, cfg.preview_chars)
        ));
    }

    let Some(History::Events(events)) = &record.history else {
        return out;
    };

    out.push(String::new());
    out.push(format!("History entries: {}", events.len()));

    let turns: Vec<Turn<'_>> = events.iter().filter_map(Turn::from_value).collect();
    let user = turns.iter().filter(|t| t.speaker == Speaker::User).count();
    let agent: Vec<&Turn<'_>> = turns
        .iter()
        .filter(|t| t.speaker == Speaker::Agent)
        .collect();

    out.push(String::new());
    out.push(format!("User messages: {user}"));
    out.push(format!("Agent messages: {}", agent.len()));

    out.push(String::new());
    out.push(format!(
        "=== Agent operational messages (first {}) ===",
        cfg.max_agent_messages
    ));
    for (i, turn) in agent.iter().take(cfg.max_agent_messages).enumerate() {
        if turn.looks_operational() {
            let preview = truncate_chars(turn.message, cfg.preview_chars).replace('\n', " ");
            out.push(format!("{}. {preview}...", i + 1));
        }
    }

    out
}

/// Parse the first line of the log. `Ok(None)` for an empty file.
pub fn read_first(path: &Path) -> Result<Option<InspectedRecord>, InspectError> {
    let mut reader = loader::open_reader(path).map_err(|e| InspectError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut line = String::new();
    let n = reader.read_line(&mut line).map_err(|e| InspectError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    if n == 0 {
        return Ok(None);
    }

    let record = serde_json::from_str(line.trim_end()).map_err(|e| InspectError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(Some(record))
}

/// Handle the `inspect` subcommand.
pub fn handle_inspect(path: &Path, cfg: &InspectConfig) -> Result<(), String> {
    tracing::debug!(file = %path.display(), "inspecting first record");
    match read_first(path).map_err(|e| e.to_string())? {
        Some(record) => {
            for line in digest(&record, cfg) {
                println!("{line}");
            }
        }
        None => println!("No records found in {}", path.display()),
    }
    Ok(())
}

/// Errors from reading the inspected record.
#[derive(Debug)]
pub enum InspectError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl std::fmt::Display for InspectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InspectError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            InspectError::Parse { path, source } => {
                write!(
                    f,
                    "failed to parse first record of {}: {source}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for InspectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InspectError::Io { source, .. } => Some(source),
            InspectError::Parse { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn parse(line: &str) -> InspectedRecord {
        serde_json::from_str(line).unwrap()
    }

    #[test]
    fn digest_counts_user_and_agent_turns() {
        let r = parse(
            r#"{"instance_id":"astropy__astropy-12907","history":[
                {"source":"user","message":"Fix the bug"},
                {"source":"agent","message":"Let me read the file"},
                {"source":"environment","message":"ok"},
                {"source":"agent","message":"Thinking..."},
                "not an event"
            ]}"#,
        );
        let lines = digest(&r, &InspectConfig::default());
        assert_eq!(lines[0], "Instance ID: astropy__astropy-12907");
        assert!(lines.contains(&"History entries: 5".to_string()));
        assert!(lines.contains(&"User messages: 1".to_string()));
        assert!(lines.contains(&"Agent messages: 2".to_string()));
        assert!(lines.contains(&"1. Let me read the file...".to_string()));
        assert!(!lines.iter().any(|l| l.contains("Thinking")));
    }

    #[test]
    fn digest_numbers_by_agent_position() {
        let r = parse(
            r#"{"history":[
                {"source":"agent","message":"hmm"},
                {"source":"agent","message":"```bash\nls\n```"}
            ]}"#,
        );
        let lines = digest(&r, &InspectConfig::default());
        assert!(lines.contains(&"2. ```bash ls ```...".to_string()));
        assert!(lines[0].ends_with("unknown"));
    }

    #[test]
    fn digest_keyword_match_is_case_insensitive() {
        let turn = Turn {
            speaker: Speaker::Agent,
            message: "WRITE the patch",
        };
        assert!(turn.looks_operational());
        let turn = Turn {
            speaker: Speaker::Agent,
            message: "looks fine",
        };
        assert!(!turn.looks_operational());
    }

    #[test]
    fn digest_truncates_instruction_and_previews() {
        let long = "x".repeat(500);
        let r = parse(&format!(
            r#"{{"instruction":"{long}","history":[{{"source":"agent","message":"run {long}"}}]}}"#
        ));
        let lines = digest(&r, &InspectConfig::default());
        let instr = lines
            .iter()
            .find(|l| l.starts_with("xxx"))
            .expect("instruction line");
        assert_eq!(instr.chars().count(), 300 + 3);
        let preview = lines.iter().find(|l| l.starts_with("1. run")).unwrap();
        assert_eq!(preview.chars().count(), "1. ".len() + 300 + 3);
    }

    #[test]
    fn digest_caps_agent_messages() {
        let events: Vec<String> = (0..15)
            .map(|i| format!(r#"{{"source":"agent","message":"run step {i}"}}"#))
            .collect();
        let r = parse(&format!(r#"{{"history":[{}]}}"#, events.join(",")));
        let lines = digest(&r, &InspectConfig::default());
        assert!(lines.contains(&"Agent messages: 15".to_string()));
        assert!(lines.contains(&"10. run step 9...".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("11.")));
    }

    #[test]
    fn digest_skips_history_that_is_not_a_list() {
        let r = parse(r#"{"instance_id":"a","history":{"source":"user"}}"#);
        let lines = digest(&r, &InspectConfig::default());
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn digest_handles_multibyte_text() {
        let r = parse(r#"{"history":[{"source":"agent","message":"读取文件 read ✓"}]}"#);
        let cfg = InspectConfig {
            preview_chars: 4,
            ..Default::default()
        };
        let lines = digest(&r, &cfg);
        assert!(lines.contains(&"1. 读取文件...".to_string()));
    }

    #[test]
    fn read_first_only_reads_first_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.jsonl");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, r#"{{"instance_id":"first"}}"#).unwrap();
        writeln!(f, "{{broken second line").unwrap();
        drop(f);

        let record = read_first(&path).unwrap().unwrap();
        assert_eq!(record.instance_id.as_deref(), Some("first"));
    }

    #[test]
    fn read_first_malformed_line_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.jsonl");
        std::fs::write(&path, "{not valid json\n").unwrap();
        let err = read_first(&path).unwrap_err();
        assert!(matches!(err, InspectError::Parse { .. }));
        assert!(handle_inspect(&path, &InspectConfig::default()).is_err());
    }

    #[test]
    fn read_first_empty_file_is_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.jsonl");
        std::fs::write(&path, "").unwrap();
        assert!(read_first(&path).unwrap().is_none());
        handle_inspect(&path, &InspectConfig::default()).unwrap();
    }

    #[test]
    fn read_first_missing_file_is_io_error() {
        let err = read_first(Path::new("/nonexistent/output.jsonl")).unwrap_err();
        assert!(matches!(err, InspectError::Io { .. }));
    }
}
