//! Unified diff reader producing [`ParsedDiff`] values
use super::error::DiffError;
use once_cell::sync::Lazy;
use regex::Regex;

static HUNK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@ ?(.*)$").expect("valid hunk header regex")
});

const EXTENDED_HEADERS: &[&str] = &[
    "index ",
    "new file mode ",
    "deleted file mode ",
    "old mode ",
    "new mode ",
    "similarity index ",
    "dissimilarity index ",
    "rename from ",
    "rename to ",
    "copy from ",
    "copy to ",
    "Binary files ",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDiff {
    pub files: Vec<FileEntry>,
}

/// One file section of a diff. Names keep their `a/` / `b/` prefixes and any
/// quoting exactly as they appeared in the diff text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileEntry {
    pub old_name: String,
    pub new_name: String,
    pub extended: Vec<String>,
    pub hunks: Vec<Hunk>,
}

impl FileEntry {
    pub fn is_deleted(&self) -> bool {
        self.new_name == "/dev/null" || self.extended.iter().any(|l| l.starts_with("deleted file mode "))
    }

    pub fn is_binary(&self) -> bool {
        self.extended.iter().any(|l| l.starts_with("Binary files "))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hunk {
    pub orig_start: u32,
    pub orig_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub section: String,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    /// New-file line numbers of the added lines in this hunk.
    pub fn added_line_numbers(&self) -> Vec<u32> {
        let mut out = Vec::new();
        let mut current = self.new_start;
        for line in &self.lines {
            match line {
                HunkLine::Added(_) => {
                    out.push(current);
                    current += 1;
                }
                HunkLine::Context(_) => current += 1,
                HunkLine::Removed(_) => {}
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLine {
    Context(String),
    Added(String),
    Removed(String),
}

/// Parse diff text containing any number of file sections.
pub fn parse_multi_file_diff(text: &str) -> Result<ParsedDiff, DiffError> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut files = Vec::new();
    let mut current: Option<FileEntry> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim_end_matches('\r');

        if let Some(rest) = line.strip_prefix("diff --git ") {
            files.extend(current.take());
            let (old_name, new_name) = split_git_names(rest);
            current = Some(FileEntry {
                old_name,
                new_name,
                ..Default::default()
            });
            i += 1;
            continue;
        }

        if line.starts_with("--- ") && lines.get(i + 1).is_some_and(|n| n.starts_with("+++ ")) {
            // A `---` header after hunks (or without `diff --git`) starts a new file.
            let starts_new = current.as_ref().map_or(true, |c| !c.hunks.is_empty());
            if starts_new {
                files.extend(current.take());
                current = Some(FileEntry::default());
            }
            if let Some(entry) = current.as_mut() {
                entry.old_name = header_name(&line[4..]);
                entry.new_name = header_name(&lines[i + 1].trim_end_matches('\r')[4..]);
            }
            i += 2;
            continue;
        }

        if line.starts_with("@@ ") {
            let entry = current.as_mut().ok_or(DiffError::HunkWithoutFile { line: i + 1 })?;
            let (hunk, next) = parse_hunk(&lines, i)?;
            entry.hunks.push(hunk);
            i = next;
            continue;
        }

        if let Some(entry) = current.as_mut() {
            if entry.hunks.is_empty() && EXTENDED_HEADERS.iter().any(|h| line.starts_with(h)) {
                entry.extended.push(line.to_string());
            }
        }
        i += 1;
    }

    files.extend(current);
    Ok(ParsedDiff { files })
}

/// Parse diff text expected to describe exactly one file.
pub fn parse_file_diff(text: &str) -> Result<Option<FileEntry>, DiffError> {
    Ok(parse_multi_file_diff(text)?.files.into_iter().next())
}

fn parse_hunk(lines: &[&str], start: usize) -> Result<(Hunk, usize), DiffError> {
    let header = lines[start].trim_end_matches('\r');
    let caps = HUNK_HEADER
        .captures(header)
        .ok_or_else(|| DiffError::MalformedHunkHeader {
            line: start + 1,
            header: header.to_string(),
        })?;
    let number = |idx: usize, default: u32| -> Result<u32, DiffError> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse().map_err(|_| DiffError::MalformedHunkHeader {
                line: start + 1,
                header: header.to_string(),
            }),
            None => Ok(default),
        }
    };

    let mut hunk = Hunk {
        orig_start: number(1, 0)?,
        orig_lines: number(2, 1)?,
        new_start: number(3, 0)?,
        new_lines: number(4, 1)?,
        section: caps.get(5).map(|m| m.as_str().to_string()).unwrap_or_default(),
        lines: Vec::new(),
    };

    let (mut orig_seen, mut new_seen) = (0u32, 0u32);
    let mut i = start + 1;
    while orig_seen < hunk.orig_lines || new_seen < hunk.new_lines {
        let Some(raw) = lines.get(i) else {
            return Err(DiffError::TruncatedHunk {
                line: i,
                expected_orig: hunk.orig_lines,
                expected_new: hunk.new_lines,
            });
        };
        let body = raw.strip_suffix('\r').unwrap_or(*raw);
        match body.chars().next() {
            Some(' ') => {
                hunk.lines.push(HunkLine::Context(body[1..].to_string()));
                orig_seen += 1;
                new_seen += 1;
            }
            // Some tools strip the single space of blank context lines.
            None => {
                hunk.lines.push(HunkLine::Context(String::new()));
                orig_seen += 1;
                new_seen += 1;
            }
            Some('-') => {
                hunk.lines.push(HunkLine::Removed(body[1..].to_string()));
                orig_seen += 1;
            }
            Some('+') => {
                hunk.lines.push(HunkLine::Added(body[1..].to_string()));
                new_seen += 1;
            }
            Some('\\') => {}
            Some(_) => {
                return Err(DiffError::UnexpectedHunkLine {
                    line: i + 1,
                    content: body.to_string(),
                })
            }
        }
        i += 1;
    }
    if lines.get(i).is_some_and(|l| l.starts_with('\\')) {
        i += 1;
    }
    Ok((hunk, i))
}

/// Names from `--- ` / `+++ ` headers, without a trailing timestamp.
fn header_name(raw: &str) -> String {
    if raw.starts_with('"') {
        if let Some(end) = closing_quote(raw) {
            return raw[..=end].to_string();
        }
    }
    raw.split('\t').next().unwrap_or(raw).trim_end().to_string()
}

fn split_git_names(rest: &str) -> (String, String) {
    if rest.starts_with('"') {
        if let Some(end) = closing_quote(rest) {
            return (rest[..=end].to_string(), rest[end + 1..].trim().to_string());
        }
    }
    if let Some(pos) = rest.find(" \"b/") {
        return (rest[..pos].to_string(), rest[pos + 1..].to_string());
    }
    match rest.find(" b/") {
        Some(pos) => (rest[..pos].to_string(), rest[pos + 1..].to_string()),
        None => match rest.split_once(' ') {
            Some((a, b)) => (a.to_string(), b.to_string()),
            None => (rest.to_string(), rest.to_string()),
        },
    }
}

/// Byte index of the quote closing the C-quoted string starting at 0.
fn closing_quote(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}
