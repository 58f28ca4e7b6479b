use std::io::{self, BufRead, Write};

use enrich_core::{ProgressState, ResumeDecision};
use enrich_engine::ResumePolicy;

/// Asks on the terminal whether to resume a previous run.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinResumePrompt;

impl ResumePolicy for StdinResumePrompt {
    fn decide(&self, previous: &ProgressState) -> ResumeDecision {
        let stdin = io::stdin();
        let stdout = io::stdout();
        ask(&mut stdin.lock(), &mut stdout.lock(), previous)
    }
}

/// Empty input or y/yes resumes, n/no starts fresh, anything else asks again.
/// End of input or a broken terminal resumes.
fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    previous: &ProgressState,
) -> ResumeDecision {
    loop {
        let _ = write!(
            output,
            "Resume previous run ({} completed, {} failed)? [Y/n] ",
            previous.completed().len(),
            previous.failed().len()
        );
        let _ = output.flush();

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => return ResumeDecision::Resume,
            Ok(_) => {}
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "" | "y" | "yes" => return ResumeDecision::Resume,
            "n" | "no" => return ResumeDecision::StartFresh,
            _ => {
                let _ = writeln!(output, "Please answer y or n.");
            }
        }
    }
}
