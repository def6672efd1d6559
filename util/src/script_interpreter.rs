//! # Manoeuvre script interpreter module
//!
//! A manoeuvre script is a plain text file in which each manoeuvre is written as a line of
//! whitespace separated words terminated by a `;`. Anything following a `#` on a line is a
//! comment. For example:
//!
//! ```text
//! # Drive out and come back
//! dist 100;
//! turn 180 --tol 0.5;
//! goto 0 0 --top 3;
//! ```
//!
//! The interpreter only splits the script into words, the executable is responsible for turning
//! each line into a manoeuvre.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::fs;
use regex::{Regex, RegexBuilder};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One line of a script
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLine {
    /// Line number in the script file, starting at 1
    pub line_num: usize,

    /// The words making up the line
    pub words: Vec<String>
}

/// A script interpreter.
///
/// After loading the script use `.next_line` to pull lines in order.
pub struct ScriptInterpreter {
    _script_path: Option<PathBuf>,
    lines: VecDeque<ScriptLine>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error("Line {0} is not terminated with a `;`")]
    MissingTerminator(usize),

    #[error("Could not build the line pattern: {0}")]
    PatternError(regex::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = PathBuf::from(script_path.as_ref());
        
        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        let script = fs::read_to_string(&path).map_err(ScriptError::ScriptLoadError)?;

        let mut si = Self::from_str(&script)?;
        si._script_path = Some(path);

        Ok(si)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_str(script: &str) -> Result<Self, ScriptError> {
        let comment_re = Regex::new(r"#.*$").map_err(ScriptError::PatternError)?;
        let line_re = RegexBuilder::new(r"^\s*([^;]*?)\s*;\s*$")
            .build()
            .map_err(ScriptError::PatternError)?;

        let mut lines = VecDeque::new();

        for (i, raw) in script.lines().enumerate() {
            let stripped = comment_re.replace(raw, "");

            if stripped.trim().is_empty() {
                continue;
            }

            let cap = match line_re.captures(&stripped) {
                Some(c) => c,
                None => return Err(ScriptError::MissingTerminator(i + 1))
            };

            let words: Vec<String> = cap[1]
                .split_whitespace()
                .map(String::from)
                .collect();

            if !words.is_empty() {
                lines.push_back(ScriptLine {
                    line_num: i + 1,
                    words
                });
            }
        }

        if lines.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(ScriptInterpreter {
            _script_path: None,
            lines
        })
    }

    /// Pop the next line of the script, or `None` at the end of the script.
    pub fn next_line(&mut self) -> Option<ScriptLine> {
        self.lines.pop_front()
    }

    /// Get the number of lines remaining in the script
    pub fn get_num_lines(&self) -> usize {
        self.lines.len()
    }
}
