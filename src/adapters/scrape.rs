use crate::finding::{Finding, Severity};
use crate::process::ProcessOutput;
use once_cell::sync::Lazy;
use regex::Regex;

// code.cpp:138:  Missing spaces around =  [whitespace/operators] [4]
static CPPLINT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":(\d+):(.+)\[(.+?)\] \[\d\]\s*$").expect("cpplint pattern compiles"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Pulls findings out of free-form text one line at a time.
///
/// The pattern must capture the line number, the message and the rule, in
/// that order. Lines that do not match are progress noise and are skipped.
#[derive(Debug, Clone)]
pub struct LineScraper {
    pattern: &'static Lazy<Regex>,
    stream: Stream,
    severity: Severity,
}

impl LineScraper {
    /// cpplint writes its findings to stderr.
    pub fn cpplint() -> Self {
        Self {
            pattern: &CPPLINT_LINE,
            stream: Stream::Stderr,
            severity: Severity::Error,
        }
    }

    pub fn scrape(&self, output: &ProcessOutput) -> Vec<Finding> {
        let text = match self.stream {
            Stream::Stdout => output.stdout_lossy(),
            Stream::Stderr => output.stderr_lossy(),
        };
        self.scrape_text(&text)
    }

    pub fn scrape_text(&self, text: &str) -> Vec<Finding> {
        text.lines()
            .filter_map(|line| {
                let caps = self.pattern.captures(line)?;
                let line_no = caps[1].parse().unwrap_or(0);
                Some(Finding::new(&caps[3], self.severity, line_no, &caps[2]))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpplint_lines_are_scraped() {
        let text = "Done processing src/a.cc\n\
                    src/a.cc:138:  Missing spaces around =  [whitespace/operators] [4]\n\
                    src/a.cc:0:  No copyright message found.  [legal/copyright] [5]  \n\
                    Total errors found: 2\n";
        let findings = LineScraper::cpplint().scrape_text(text);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].rule_id, "whitespace/operators");
        assert_eq!(findings[0].line, 138);
        assert_eq!(findings[0].column, 0);
        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(findings[0].message, "  Missing spaces around =  ");
        assert_eq!(findings[1].rule_id, "legal/copyright");
    }

    #[test]
    fn noise_only_yields_nothing() {
        assert!(LineScraper::cpplint().scrape_text("Ignoring build/x.cc; not a valid file name\n").is_empty());
        assert!(LineScraper::cpplint().scrape_text("").is_empty());
    }

    #[test]
    fn reads_stderr() {
        let output = ProcessOutput {
            program: "cpplint".into(),
            code: Some(1),
            stdout: b"a.cc:1:  ignored on stdout  [x/y] [1]\n".to_vec(),
            stderr: b"a.cc:2:  Tab found  [whitespace/tab] [1]\n".to_vec(),
        };
        let findings = LineScraper::cpplint().scrape(&output);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 2);
    }
}
