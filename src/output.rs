use std::io::{self, Write};

/// Where user-facing messages go.
///
/// Notices are informational and go to stdout (the user asked for output in
/// files, so stdout is free); problems go to stderr.
pub trait Reporter {
    fn notice(&self, message: &str);
    fn problem(&self, message: &str);
}

pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn notice(&self, message: &str) {
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{message}");
    }

    fn problem(&self, message: &str) {
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{message}");
    }
}
