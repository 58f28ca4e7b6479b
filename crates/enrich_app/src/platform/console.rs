//! Terminal progress output.

use enrich_core::{ItemOutcome, RunPhase};
use enrich_engine::{BatchEvent, EventSink};

/// Prints batch events as plain lines on stdout.
pub struct ConsoleSink {
    retry_command: String,
}

impl ConsoleSink {
    pub fn new(retry_command: impl Into<String>) -> Self {
        Self {
            retry_command: retry_command.into(),
        }
    }

    fn render(&self, event: &BatchEvent) -> Vec<String> {
        match event {
            BatchEvent::PhaseChanged(_) | BatchEvent::ItemStage { .. } => Vec::new(),
            BatchEvent::PreviousProgress { completed, failed } => vec![format!(
                "Found previous progress: {completed} completed, {failed} failed"
            )],
            BatchEvent::Planned {
                total,
                to_process,
                skipped_completed,
                skipped_failed,
            } => {
                let mut lines = vec![format!("Work source: {total} items")];
                if *skipped_completed > 0 {
                    lines.push(format!("Already completed: {skipped_completed}"));
                }
                if *skipped_failed > 0 {
                    lines.push(format!("Skipping previously failed: {skipped_failed}"));
                }
                lines.push(if *to_process == 0 {
                    "Nothing left to process.".to_string()
                } else {
                    format!("To process: {to_process}")
                });
                lines
            }
            BatchEvent::SkippedFailed { name } => {
                vec![format!("  skipping {name} (failed in an earlier run)")]
            }
            BatchEvent::ItemStarted {
                position,
                of,
                source_index,
                name,
            } => vec![format!(
                "Processing {position}/{of} (#{} in source): {name}",
                source_index + 1
            )],
            BatchEvent::ItemFinished { outcome, .. } => match outcome {
                ItemOutcome::Completed { name, .. } => vec![format!("  ok: {name}")],
                ItemOutcome::Failed { failure, .. } => vec![format!("  FAILED: {failure}")],
            },
            BatchEvent::Checkpoint {
                processed,
                cooldown,
            } => vec![format!(
                "Checkpoint after {processed} items, pausing {}s",
                cooldown.as_secs_f64()
            )],
            BatchEvent::Interrupted { processed } => vec![
                format!("Interrupted after {processed} items."),
                "Progress saved. Run the same command again to resume.".to_string(),
            ],
            BatchEvent::Exported { path, count } => {
                if *count == 0 {
                    Vec::new()
                } else {
                    vec![format!("Failed items written to {}", path.display())]
                }
            }
            BatchEvent::ExportFailed { message } => {
                vec![format!("Could not write the failure export: {message}")]
            }
            BatchEvent::Finished(summary) => {
                let mut lines = vec![
                    String::new(),
                    "Batch summary".to_string(),
                    format!("  total:     {}", summary.total),
                    format!("  completed: {}", summary.completed),
                    format!("  failed:    {}", summary.failed),
                    format!(
                        "  this run:  {} attempted, {} ok, {} failed",
                        summary.attempted, summary.succeeded, summary.failed_this_run
                    ),
                    format!("  success rate: {:.1}%", summary.success_rate()),
                ];
                if summary.failed > 0 && !summary.interrupted {
                    lines.push(format!(
                        "Run `{}` to retry the failed items.",
                        self.retry_command
                    ));
                }
                lines
            }
        }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: BatchEvent) {
        if let BatchEvent::PhaseChanged(RunPhase::Running) = event {
            println!();
        }
        for line in self.render(&event) {
            println!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use enrich_core::RunSummary;

    use super::*;

    fn sink() -> ConsoleSink {
        ConsoleSink::new("batch-enrich retry --progress-file p.json --failed-file f.csv")
    }

    #[test]
    fn item_lines_are_one_based() {
        let lines = sink().render(&BatchEvent::ItemStarted {
            position: 2,
            of: 5,
            source_index: 6,
            name: "Y".to_string(),
        });
        assert_eq!(lines, vec!["Processing 2/5 (#7 in source): Y".to_string()]);
    }

    #[test]
    fn failures_show_the_cause() {
        let lines = sink().render(&BatchEvent::ItemFinished {
            position: 1,
            of: 1,
            outcome: ItemOutcome::enrichment_failed(0, "Y", "http status 429: slow down"),
        });
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("FAILED"));
        assert!(lines[0].contains("429"));
    }

    #[test]
    fn summary_offers_retry_only_when_something_failed() {
        let mut summary = RunSummary {
            total: 4,
            completed: 3,
            failed: 1,
            ..RunSummary::default()
        };
        let lines = sink().render(&BatchEvent::Finished(summary.clone()));
        assert!(lines.iter().any(|l| l.contains("75.0%")));
        assert!(lines
            .iter()
            .any(|l| l.contains("batch-enrich retry --progress-file p.json --failed-file f.csv")));

        summary.failed = 0;
        let lines = sink().render(&BatchEvent::Finished(summary));
        assert!(!lines.iter().any(|l| l.contains("batch-enrich retry")));
    }
}
