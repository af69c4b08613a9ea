//! Script compilation seam
//!
//! Evaluating scripts is outside this crate. A `ScriptCompiler` turns source
//! text into whatever the host runtime executes; the resource layer only
//! needs it to reject unusable sources and to report the modules a script
//! asks for.

use crate::error::{HearthError, HearthResult};
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, LazyLock};

static REQUIRE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\brequire\s*\(\s*(?:"([^"]+)"|'([^']+)')\s*\)"#).expect("valid require pattern")
});

/// Output of a compiler, shared between the resources built from it
#[derive(Debug, Clone)]
pub struct CompiledScript {
    name: String,
    source: Arc<str>,
    requires: Vec<String>,
}

impl CompiledScript {
    pub fn new(name: impl Into<String>, source: impl Into<Arc<str>>, requires: Vec<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            requires,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Literal module identifiers passed to `require`, in source order
    pub fn requires(&self) -> &[String] {
        &self.requires
    }
}

/// Compiles script source for the host runtime
pub trait ScriptCompiler: Send + Sync {
    /// Compile `source`, read from `path`.
    ///
    /// Sources the runtime cannot use are `NotViable`.
    fn compile(&self, path: &Path, name: &str, source: &str) -> HearthResult<CompiledScript>;
}

/// Keeps the source as-is after a structural check
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceCompiler;

impl ScriptCompiler for SourceCompiler {
    fn compile(&self, path: &Path, name: &str, source: &str) -> HearthResult<CompiledScript> {
        check_balanced(source).map_err(|reason| HearthError::not_viable(path, reason))?;

        let mut requires = Vec::new();
        for caps in REQUIRE_CALL.captures_iter(source) {
            if let Some(identifier) = caps.get(1).or_else(|| caps.get(2)) {
                let identifier = identifier.as_str().to_string();
                if !requires.contains(&identifier) {
                    requires.push(identifier);
                }
            }
        }

        Ok(CompiledScript::new(name, source, requires))
    }
}

/// Brackets outside of string literals and comments must pair up
fn check_balanced(source: &str) -> Result<(), String> {
    let mut stack = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line = 1;

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            '"' | '\'' | '`' => {
                let quote = c;
                let mut escaped = false;
                loop {
                    match chars.next() {
                        None => return Err(format!("unterminated string starting on line {}", line)),
                        Some('\n') if quote != '`' => {
                            return Err(format!("unterminated string on line {}", line));
                        }
                        Some('\n') => line += 1,
                        Some('\\') if !escaped => {
                            escaped = true;
                            continue;
                        }
                        Some(q) if q == quote && !escaped => break,
                        Some(_) => {}
                    }
                    escaped = false;
                }
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        line += 1;
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = ' ';
                loop {
                    match chars.next() {
                        None => return Err("unterminated block comment".to_string()),
                        Some('/') if previous == '*' => break,
                        Some(next) => {
                            if next == '\n' {
                                line += 1;
                            }
                            previous = next;
                        }
                    }
                }
            }
            '(' | '[' | '{' => stack.push((c, line)),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, opened)) => {
                        return Err(format!(
                            "'{}' on line {} does not close '{}' from line {}",
                            c, line, open, opened
                        ));
                    }
                    None => return Err(format!("unexpected '{}' on line {}", c, line)),
                }
            }
            _ => {}
        }
    }

    match stack.pop() {
        Some((open, opened)) => Err(format!("'{}' opened on line {} is never closed", open, opened)),
        None => Ok(()),
    }
}
