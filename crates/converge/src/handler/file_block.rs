//! File block handler - marker-delimited managed region inside a file
//!
//! The identity is the file path. Everything between the BEGIN/END
//! marker lines belongs to the resource; content outside the markers is
//! preserved untouched. A file without markers gets the block appended.

use super::{mismatch, observed_file};
use crate::error::Result;
use crate::probe::sh_quote;
use crate::registry::Handler;
use crate::types::{ChangeSet, Desired, Observed, Op, ResourceKind};
use std::path::PathBuf;

const DEFAULT_MARKER: &str = "FORJA BLOCK";

pub struct FileBlockHandler;

impl FileBlockHandler {
    fn markers(marker: Option<&str>) -> (String, String) {
        let label = marker.unwrap_or(DEFAULT_MARKER);
        (format!("# BEGIN {label}"), format!("# END {label}"))
    }

    /// Splice the managed block into the existing content
    fn render(existing: Option<&str>, body: &str, begin: &str, end: &str) -> String {
        let mut block = String::new();
        block.push_str(begin);
        block.push('\n');
        let body = body.trim_matches('\n');
        if !body.is_empty() {
            block.push_str(body);
            block.push('\n');
        }
        block.push_str(end);
        block.push('\n');

        let Some(text) = existing else {
            return block;
        };

        let lines: Vec<&str> = text.lines().collect();
        let begin_at = lines.iter().position(|l| l.trim_end() == begin);
        let end_at = begin_at.and_then(|b| {
            lines[b + 1..]
                .iter()
                .position(|l| l.trim_end() == end)
                .map(|off| b + 1 + off)
        });

        match (begin_at, end_at) {
            (Some(b), Some(e)) => {
                let mut out = String::new();
                for line in &lines[..b] {
                    out.push_str(line);
                    out.push('\n');
                }
                out.push_str(&block);
                for line in &lines[e + 1..] {
                    out.push_str(line);
                    out.push('\n');
                }
                out
            }
            _ => {
                let mut out = text.to_string();
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&block);
                out
            }
        }
    }
}

impl Handler for FileBlockHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::FileBlock
    }

    fn describe(&self, id: &str) -> String {
        format!("Managed block in {id}")
    }

    fn diff(&self, id: &str, desired: &Desired, observed: &Observed) -> Result<ChangeSet> {
        let (content, marker, mode, owner) = match desired {
            Desired::FileBlock {
                content,
                marker,
                mode,
                owner,
            } => (content, marker.as_deref(), *mode, owner.as_deref()),
            other => return Err(mismatch(id, "file_block attributes", other)),
        };

        let (begin, end) = Self::markers(marker);
        let current = observed_file(id, observed)?;
        let rendered = Self::render(current.map(|(text, _)| text), content, &begin, &end);

        let content_converged = current.is_some_and(|(text, _)| text == rendered);
        let mode_converged = match (mode, current) {
            (Some(want), Some((_, have))) => want == have,
            (Some(_), None) => false,
            (None, _) => true,
        };
        if content_converged && mode_converged {
            return Ok(Vec::new());
        }

        let mut ops = vec![Op::WriteFile {
            path: PathBuf::from(id),
            content: rendered,
            mode,
        }];
        if let Some(owner) = owner {
            ops.push(Op::shell(format!(
                "chown {} {}",
                sh_quote(owner),
                sh_quote(id)
            )));
        }
        Ok(ops)
    }
}
