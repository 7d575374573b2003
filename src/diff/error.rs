use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiffError {
    #[error("no file mode found in extended header lines")]
    MissingMode,

    #[error("invalid file mode `{0}`")]
    InvalidMode(String),

    #[error("line {line}: malformed hunk header `{header}`")]
    MalformedHunkHeader { line: usize, header: String },

    #[error("line {line}: hunk body ended early (expected {expected_orig} original and {expected_new} new lines)")]
    TruncatedHunk {
        line: usize,
        expected_orig: u32,
        expected_new: u32,
    },

    #[error("line {line}: unexpected content `{content}` in hunk body")]
    UnexpectedHunkLine { line: usize, content: String },

    #[error("line {line}: hunk found before any file header")]
    HunkWithoutFile { line: usize },
}
