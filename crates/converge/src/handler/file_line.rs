//! File line handler - ensure or substitute a single line
//!
//! The identity is the file path. With `replace` set, every matching
//! line is substituted (the comment-toggle pattern); without it, the
//! line is appended when missing.

use super::{mismatch, observed_file};
use crate::error::{Error, Result};
use crate::registry::Handler;
use crate::types::{ChangeSet, Desired, Observed, Op, ResourceKind};
use regex::Regex;
use std::path::PathBuf;

pub struct FileLineHandler;

enum Matcher {
    Exact(String),
    Pattern(Regex),
}

impl Matcher {
    fn build(id: &str, line: &str, pattern: Option<&str>) -> Result<Self> {
        match pattern {
            Some(p) => {
                // Anchored so the pattern must cover the whole line
                let regex = Regex::new(&format!("^(?:{p})$"))
                    .map_err(|e| Error::invalid_spec(id, format!("bad line pattern: {e}")))?;
                Ok(Self::Pattern(regex))
            }
            None => Ok(Self::Exact(line.to_string())),
        }
    }

    fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Exact(line) => candidate == line,
            Self::Pattern(regex) => regex.is_match(candidate),
        }
    }
}

impl Handler for FileLineHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::FileLine
    }

    fn describe(&self, id: &str) -> String {
        format!("Line in {id}")
    }

    fn diff(&self, id: &str, desired: &Desired, observed: &Observed) -> Result<ChangeSet> {
        let (line, pattern, replace) = match desired {
            Desired::FileLine {
                line,
                pattern,
                replace,
            } => (line, pattern.as_deref(), replace.as_deref()),
            other => return Err(mismatch(id, "file_line attributes", other)),
        };
        let matcher = Matcher::build(id, line, pattern)?;

        let Some((content, _)) = observed_file(id, observed)? else {
            // Missing file: nothing to substitute; an ensured line
            // creates the file
            return Ok(match replace {
                Some(_) => Vec::new(),
                None => vec![Op::WriteFile {
                    path: PathBuf::from(id),
                    content: format!("{line}\n"),
                    mode: None,
                }],
            });
        };

        let matched = content.lines().any(|l| matcher.matches(l));
        let new_content = match replace {
            Some(substitute) => {
                if !matched {
                    return Ok(Vec::new());
                }
                let mut out = String::new();
                for l in content.lines() {
                    out.push_str(if matcher.matches(l) { substitute } else { l });
                    out.push('\n');
                }
                out
            }
            None => {
                if matched {
                    return Ok(Vec::new());
                }
                let mut out = content.to_string();
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(line);
                out.push('\n');
                out
            }
        };

        // A pattern can match its own replacement; rewriting identical
        // content is not a change
        if new_content == content {
            return Ok(Vec::new());
        }

        Ok(vec![Op::WriteFile {
            path: PathBuf::from(id),
            content: new_content,
            mode: None,
        }])
    }
}
