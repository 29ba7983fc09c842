// src/cli/progress.rs — Terminal progress renderer for a controller run

use crate::core::types::ProgressEvent;

/// One progress line per event.
pub fn format_event(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::SeedsReady { candidates, spent } => {
            format!("[seed] {} candidate(s), {} tokens spent", candidates, spent)
        }
        ProgressEvent::Refined {
            round,
            top_score,
            spent,
        } => format!(
            "[refine {}] top score={:.2} spent={}",
            round, top_score, spent
        ),
        ProgressEvent::EarlyStop { phase, calls } => {
            format!("[stop] early stop during {} after {} call(s)", phase, calls)
        }
        ProgressEvent::Complete {
            calls,
            spent,
            prediction,
        } => format!(
            "[done] prediction={} calls={} tokens={}",
            prediction.as_deref().unwrap_or("-"),
            calls,
            spent
        ),
    }
}

/// Build a progress callback that writes to stderr, keeping stdout for the result.
/// Returns a closure suitable for `Controller::with_progress()`.
pub fn terminal_progress() -> impl Fn(ProgressEvent) + Send + Sync + 'static {
    move |event| eprintln!("{}", format_event(&event))
}
