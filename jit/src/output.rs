//! Text and JSON reporting for jit commands.
//!
//! Every command builds one report struct. With `--json` the struct is printed
//! as pretty JSON; otherwise the command's own summary text is printed.

use anyhow::Result;
use jit_core::{ObjectId, ObjectKind, WriteOutcome};
use serde::Serialize;
use std::io::{self, Write};

/// Prints command reports to stdout and failures to stderr.
pub struct OutputWriter {
    json: bool,
}

impl OutputWriter {
    /// `json` selects JSON reports instead of text summaries.
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Print a command report.
    ///
    /// `summary` is only evaluated for text output.
    pub fn write<T: Serialize>(&self, report: &T, summary: impl FnOnce() -> String) -> Result<()> {
        let rendered = self.render(report, summary)?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(rendered.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }

    /// Print a failure with its cause chain, tagged with the process exit code.
    pub fn write_error(&self, error: &anyhow::Error, result_code: u8) {
        let rendered = self.render_error(error, result_code);
        let _ = io::stderr().lock().write_all(rendered.as_bytes());
    }

    fn render<T: Serialize>(&self, report: &T, summary: impl FnOnce() -> String) -> Result<String> {
        if self.json {
            Ok(format!("{}\n", serde_json::to_string_pretty(report)?))
        } else {
            Ok(summary())
        }
    }

    fn render_error(&self, error: &anyhow::Error, result_code: u8) -> String {
        if !self.json {
            return format!("error: {:#}\n", error);
        }

        let report = ErrorOutput {
            success: false,
            result_code,
            error: format!("{:#}", error),
        };
        match serde_json::to_string_pretty(&report) {
            Ok(json) => format!("{}\n", json),
            Err(_) => format!("error: {:#}\n", error),
        }
    }
}

/// Report for a failed command.
#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub success: bool,
    pub result_code: u8,
    pub error: String,
}

/// `jit init`: where the repository lives.
#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub result_code: u8,
    pub root: String,
    pub git_dir: String,
}

/// `jit commit`: the snapshot tree and the commit HEAD now points at.
#[derive(Debug, Serialize)]
pub struct CommitOutput {
    pub success: bool,
    pub result_code: u8,
    pub tree: ObjectId,
    pub commit: ObjectId,
    pub files: usize,
}

/// `jit write-tree`: the snapshot tree alone.
#[derive(Debug, Serialize)]
pub struct WriteTreeOutput {
    pub success: bool,
    pub result_code: u8,
    pub tree: ObjectId,
    pub files: usize,
}

/// `jit hash-object`: the id, plus the write outcome with `-w`.
#[derive(Debug, Serialize)]
pub struct HashObjectOutput {
    pub success: bool,
    pub result_code: u8,
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<WriteOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_report() -> WriteTreeOutput {
        WriteTreeOutput {
            success: true,
            result_code: 0,
            tree: ObjectId::from_hex("4b825dc642cb6eb9a060e54bf8d69288fbee4904").unwrap(),
            files: 0,
        }
    }

    #[test]
    fn test_text_uses_summary() {
        let writer = OutputWriter::new(false);
        let rendered = writer.render(&tree_report(), || "summary\n".to_string()).unwrap();
        assert_eq!(rendered, "summary\n");
    }

    #[test]
    fn test_json_skips_summary() {
        let writer = OutputWriter::new(true);
        let rendered = writer
            .render(&tree_report(), || panic!("summary built in JSON mode"))
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["tree"], "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
        assert_eq!(value["files"], 0);
    }

    #[test]
    fn test_hash_object_omits_outcome_without_write() {
        let report = HashObjectOutput {
            success: true,
            result_code: 0,
            id: ObjectId::from_hex("b6fc4c620b67d95f953a5c1c1230aaab5db5a1b0").unwrap(),
            kind: ObjectKind::Blob,
            path: "hello.txt".to_string(),
            outcome: None,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["kind"], "blob");
        assert!(value.get("outcome").is_none());

        let stored = HashObjectOutput {
            outcome: Some(WriteOutcome::AlreadyExists),
            ..report
        };
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["outcome"], "already_exists");
    }

    #[test]
    fn test_error_rendering() {
        let error = anyhow::anyhow!("HEAD.lock exists").context("Failed to advance HEAD");

        let text = OutputWriter::new(false).render_error(&error, 2);
        assert_eq!(text, "error: Failed to advance HEAD: HEAD.lock exists\n");

        let json = OutputWriter::new(true).render_error(&error, 2);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["result_code"], 2);
        assert_eq!(value["error"], "Failed to advance HEAD: HEAD.lock exists");
    }
}
