//! Unified-diff helpers: parsing, file names, modes, bounded reads, globs
pub mod error;
pub mod glob;
pub mod parse;

pub use error::DiffError;
pub use glob::{match_any, PathMatcher};
pub use parse::{parse_file_diff, parse_multi_file_diff, FileEntry, Hunk, HunkLine, ParsedDiff};

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Prefix git puts on names from the post-change tree.
const NEW_NAME_PREFIX: &str = "b/";

/// New-side path of `entry` with the `b/` prefix removed and octal escapes
/// decoded. Returns the raw name and `false` when the prefix is absent
/// (deletions, or diffs produced without prefixes).
pub fn trimmed_new_name(entry: &FileEntry) -> (String, bool) {
    let decoded = decode_escaped_name(&entry.new_name);
    match decoded.strip_prefix(NEW_NAME_PREFIX) {
        Some(name) => (name.to_string(), true),
        None => (entry.new_name.clone(), false),
    }
}

/// Undo git's C-style quoting: surrounding quotes, `\NNN` octal bytes and the
/// usual single-character escapes. Decoded bytes are read back as UTF-8.
pub fn decode_escaped_name(name: &str) -> String {
    let inner = if name.len() >= 2 && name.starts_with('"') && name.ends_with('"') {
        &name[1..name.len() - 1]
    } else {
        name
    };
    if !inner.contains('\\') {
        return inner.to_string();
    }

    let src = inner.as_bytes();
    let mut out = Vec::with_capacity(src.len());
    let mut i = 0;
    while i < src.len() {
        if src[i] != b'\\' || i + 1 >= src.len() {
            out.push(src[i]);
            i += 1;
            continue;
        }
        let octal = src.get(i + 1..i + 4).filter(|d| d.iter().all(|b| (b'0'..=b'7').contains(b)));
        if let Some(digits) = octal {
            let value = digits.iter().fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
            // \400 and above do not fit a byte; keep the text as written.
            if let Ok(byte) = u8::try_from(value) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        let unescaped = match src[i + 1] {
            b'\\' => Some(b'\\'),
            b'"' => Some(b'"'),
            b't' => Some(b'\t'),
            b'n' => Some(b'\n'),
            b'r' => Some(b'\r'),
            b'a' => Some(0x07),
            b'b' => Some(0x08),
            b'f' => Some(0x0c),
            b'v' => Some(0x0b),
            _ => None,
        };
        match unescaped {
            Some(b) => {
                out.push(b);
                i += 2;
            }
            None => {
                out.push(b'\\');
                i += 1;
            }
        }
    }

    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Permission bits from extended header lines. `new file mode` takes
/// precedence over the mode trailing an `index` line.
pub fn parse_file_mode<S: AsRef<str>>(extended: &[S]) -> Result<u32, DiffError> {
    let mut index_mode: Option<&str> = None;
    for line in extended {
        let line = line.as_ref().trim();
        if let Some(mode) = line.strip_prefix("new file mode ") {
            return parse_octal_mode(mode.trim());
        }
        if let Some(rest) = line.strip_prefix("index ") {
            if index_mode.is_none() {
                index_mode = rest.split_whitespace().nth(1);
            }
        }
    }
    match index_mode {
        Some(mode) => parse_octal_mode(mode),
        None => Err(DiffError::MissingMode),
    }
}

fn parse_octal_mode(text: &str) -> Result<u32, DiffError> {
    u32::from_str_radix(text, 8)
        .map(|mode| mode & 0o7777)
        .map_err(|_| DiffError::InvalidMode(text.to_string()))
}

/// First `n` lines of `path`, reading no further than needed.
///
/// # Panics
///
/// Panics when `n` is zero: asking for no lines is a caller bug.
pub fn head_file(path: impl AsRef<Path>, n: usize) -> io::Result<Vec<String>> {
    assert!(n > 0, "head_file: line count must be positive, got {n}");

    let reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::with_capacity(n.min(64));
    for chunk in reader.split(b'\n').take(n) {
        let mut bytes = chunk?;
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        lines.push(String::from_utf8_lossy(&bytes).into_owned());
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(new_name: &str) -> FileEntry {
        FileEntry {
            new_name: new_name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn trims_prefix() {
        assert_eq!(trimmed_new_name(&entry("b/name")), ("name".to_string(), true));
        assert_eq!(trimmed_new_name(&entry("name")), ("name".to_string(), false));
        assert_eq!(trimmed_new_name(&entry("/dev/null")), ("/dev/null".to_string(), false));
    }

    #[test]
    fn decodes_octal_escapes() {
        let (name, ok) = trimmed_new_name(&entry("b/hello \\342\\230\\272.md"));
        assert!(ok);
        assert_eq!(name, "hello ☺.md");

        let (name, ok) = trimmed_new_name(&entry("\"b/dir/\\344\\275\\240\\345\\245\\275 \\\"q\\\".txt\""));
        assert!(ok);
        assert_eq!(name, "dir/你好 \"q\".txt");
    }

    #[test]
    fn escaped_round_trip_for_arbitrary_utf8() {
        for original in ["plain.txt", "naïve/café.rs", "emoji 🎉.md", "日本語/ファイル.go", "tab\there"] {
            let mut escaped = String::from("\"b/");
            for byte in original.bytes() {
                match byte {
                    b'\t' => escaped.push_str("\\t"),
                    b if b.is_ascii() => escaped.push(b as char),
                    b => escaped.push_str(&format!("\\{b:03o}")),
                }
            }
            escaped.push('"');
            let (name, ok) = trimmed_new_name(&entry(&escaped));
            assert!(ok, "{escaped}");
            assert_eq!(name, original);
        }
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        assert_eq!(decode_escaped_name("b/\\377x"), "b/\u{fffd}x");
    }

    #[test]
    fn mode_from_index_line() {
        assert_eq!(parse_file_mode(&["index 13fe0dc..2332010 100644"]), Ok(0o644));
    }

    #[test]
    fn new_file_mode_wins() {
        let lines = vec!["new file mode 100755".to_string(), "index 0000000..b54741c".to_string()];
        assert_eq!(parse_file_mode(&lines), Ok(0o755));

        let reversed = ["index 0000000..b54741c 100644", "new file mode 100755"];
        assert_eq!(parse_file_mode(&reversed), Ok(0o755));
    }

    #[test]
    fn mode_errors() {
        assert_eq!(parse_file_mode(&["index 0000000..b54741c"]), Err(DiffError::MissingMode));
        assert_eq!(parse_file_mode::<&str>(&[]), Err(DiffError::MissingMode));
        assert_eq!(
            parse_file_mode(&["new file mode 10078x"]),
            Err(DiffError::InvalidMode("10078x".to_string()))
        );
    }
}
