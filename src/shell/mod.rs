//! Restricted shell-word resolver for tool command templates
//!
//! Supports literal words, `$NAME` / `${NAME}` expansion, single and double
//! quotes, backslash escapes and backtick (or `$(...)`) subcommands. There is
//! no support for pipelines, redirection or control flow.
pub mod error;

pub use error::ParseError;

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Values a command template may reference besides the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingContext {
    pub working_dir: PathBuf,
    pub project_name: String,
    pub check_type: String,
    pub check_ref: String,
}

impl BindingContext {
    pub fn new(working_dir: impl Into<PathBuf>, check_type: impl Into<String>, check_ref: impl Into<String>) -> Self {
        let working_dir = working_dir.into();
        let project_name = working_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            working_dir,
            project_name,
            check_type: check_type.into(),
            check_ref: check_ref.into(),
        }
    }
}

/// One link of the variable lookup chain.
#[derive(Debug, Clone)]
pub enum VarSource {
    Bindings(Vec<(&'static str, String)>),
    ProcessEnv,
}

impl VarSource {
    fn get(&self, name: &str) -> Option<String> {
        match self {
            VarSource::Bindings(pairs) => pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.clone()),
            VarSource::ProcessEnv => std::env::var(name).ok(),
        }
    }
}

/// Ordered variable lookup: the first source that knows a name wins and
/// names nobody knows resolve to the empty string.
#[derive(Debug, Clone)]
pub struct LookupChain {
    sources: Vec<VarSource>,
}

impl LookupChain {
    pub fn new(sources: Vec<VarSource>) -> Self {
        Self { sources }
    }

    /// Built-in bindings shadow the process environment.
    pub fn for_context(ctx: &BindingContext) -> Self {
        let builtins = vec![
            ("PWD", ctx.working_dir.to_string_lossy().into_owned()),
            ("PROJECT_NAME", ctx.project_name.clone()),
            ("CI_CHECK_TYPE", ctx.check_type.clone()),
            ("CI_CHECK_REF", ctx.check_ref.clone()),
        ];
        Self::new(vec![VarSource::Bindings(builtins), VarSource::ProcessEnv])
    }

    pub fn resolve(&self, name: &str) -> String {
        self.sources
            .iter()
            .find_map(|s| s.get(name))
            .unwrap_or_default()
    }
}

/// Turns a command template into an argument vector.
#[derive(Debug, Clone)]
pub struct CommandResolver {
    dir: PathBuf,
    vars: LookupChain,
}

impl CommandResolver {
    pub fn new(ctx: &BindingContext) -> Self {
        Self {
            dir: ctx.working_dir.clone(),
            vars: LookupChain::for_context(ctx),
        }
    }

    pub fn with_lookup(dir: impl Into<PathBuf>, vars: LookupChain) -> Self {
        Self { dir: dir.into(), vars }
    }

    pub fn working_dir(&self) -> &Path {
        &self.dir
    }

    /// Split `template` into words. Subcommands run once each, left to right.
    pub fn parse(&self, template: &str) -> Result<Vec<String>, ParseError> {
        let chars: Vec<char> = template.chars().collect();
        let mut words = Vec::new();
        let mut buf = String::new();
        // Set once a word has begun, so `""` still yields an empty argument.
        let mut in_word = false;
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                ' ' | '\t' | '\n' | '\r' => {
                    if in_word {
                        words.push(std::mem::take(&mut buf));
                        in_word = false;
                    }
                    i += 1;
                }
                '\\' => {
                    match chars.get(i + 1) {
                        Some(&next) => buf.push(next),
                        None => buf.push('\\'),
                    }
                    in_word = true;
                    i += 2;
                }
                '\'' => {
                    let end = find_char(&chars, i + 1, '\'').ok_or(ParseError::UnterminatedSingleQuote)?;
                    buf.extend(&chars[i + 1..end]);
                    in_word = true;
                    i = end + 1;
                }
                '"' => {
                    i = self.parse_double_quoted(&chars, i + 1, &mut buf)?;
                    in_word = true;
                }
                '`' => {
                    let end = find_char(&chars, i + 1, '`').ok_or(ParseError::UnterminatedBacktick)?;
                    let command: String = chars[i + 1..end].iter().collect();
                    let out = self.run_subcommand(&command)?;
                    in_word |= !out.is_empty();
                    buf.push_str(&out);
                    i = end + 1;
                }
                '$' => {
                    let (value, next) = self.expand_dollar(&chars, i)?;
                    match value {
                        Some(v) => {
                            in_word |= !v.is_empty();
                            buf.push_str(&v);
                        }
                        None => {
                            buf.push('$');
                            in_word = true;
                        }
                    }
                    i = next;
                }
                c => {
                    buf.push(c);
                    in_word = true;
                    i += 1;
                }
            }
        }

        if in_word {
            words.push(buf);
        }
        Ok(words)
    }

    /// Parses up to the closing `"` and returns the index after it.
    fn parse_double_quoted(&self, chars: &[char], mut i: usize, buf: &mut String) -> Result<usize, ParseError> {
        while i < chars.len() {
            match chars[i] {
                '"' => return Ok(i + 1),
                '\\' => {
                    match chars.get(i + 1) {
                        Some('\n') => {}
                        Some(&c) if matches!(c, '$' | '`' | '"' | '\\') => buf.push(c),
                        Some(&c) => {
                            buf.push('\\');
                            buf.push(c);
                        }
                        None => return Err(ParseError::UnterminatedDoubleQuote),
                    }
                    i += 2;
                }
                '`' => {
                    let end = find_char(chars, i + 1, '`').ok_or(ParseError::UnterminatedBacktick)?;
                    let command: String = chars[i + 1..end].iter().collect();
                    buf.push_str(&self.run_subcommand(&command)?);
                    i = end + 1;
                }
                '$' => {
                    let (value, next) = self.expand_dollar(chars, i)?;
                    buf.push_str(value.as_deref().unwrap_or("$"));
                    i = next;
                }
                c => {
                    buf.push(c);
                    i += 1;
                }
            }
        }
        Err(ParseError::UnterminatedDoubleQuote)
    }

    /// `chars[i]` is `$`. Returns `None` when the dollar sign is literal.
    fn expand_dollar(&self, chars: &[char], i: usize) -> Result<(Option<String>, usize), ParseError> {
        match chars.get(i + 1) {
            Some('{') => {
                let end = find_char(chars, i + 2, '}').ok_or(ParseError::UnterminatedBrace)?;
                let name: String = chars[i + 2..end].iter().collect();
                if !is_valid_name(&name) {
                    return Err(ParseError::InvalidVariable(name));
                }
                Ok((Some(self.vars.resolve(&name)), end + 1))
            }
            Some('(') => {
                let end = find_closing_paren(chars, i + 2).ok_or(ParseError::UnterminatedSubshell)?;
                let command: String = chars[i + 2..end].iter().collect();
                Ok((Some(self.run_subcommand(&command)?), end + 1))
            }
            Some(&c) if c == '_' || c.is_ascii_alphabetic() => {
                let mut end = i + 1;
                while end < chars.len() && (chars[end] == '_' || chars[end].is_ascii_alphanumeric()) {
                    end += 1;
                }
                let name: String = chars[i + 1..end].iter().collect();
                Ok((Some(self.vars.resolve(&name)), end))
            }
            _ => Ok((None, i + 1)),
        }
    }

    fn run_subcommand(&self, command: &str) -> Result<String, ParseError> {
        let shell = std::env::var("SHELL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "sh".to_string());
        tracing::debug!(%command, dir = %self.dir.display(), "running template subcommand");

        let output = Command::new(&shell)
            .arg("-c")
            .arg(command)
            .current_dir(&self.dir)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ParseError::SubcommandSpawn {
                command: command.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ParseError::SubcommandFailed {
                command: command.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

fn find_char(chars: &[char], from: usize, target: char) -> Option<usize> {
    chars
        .get(from..)?
        .iter()
        .position(|&c| c == target)
        .map(|p| p + from)
}

/// Matching `)` for a `$(` whose body starts at `from`. Parentheses inside
/// quotes or after a backslash do not count.
fn find_closing_paren(chars: &[char], from: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = from;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '\'' => i = find_char(chars, i + 1, '\'')?,
            '"' => {
                i += 1;
                while *chars.get(i)? != '"' {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            '(' => depth += 1,
            ')' if depth == 0 => return Some(i),
            ')' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    None
}

fn is_valid_name(name: &str) -> bool {
    let mut it = name.chars();
    matches!(it.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && it.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
