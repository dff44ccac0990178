// crates/core/src/events.rs
//! Event extraction from the game client's log.
//!
//! Two line shapes matter; everything else in the log is ignored:
//!
//! ```text
//! 2024/07/26 19:01:12 8253906 1186a0e2 [DEBUG Client 2580] Generating level 13 area "1_2_town" with seed 1
//! 2024/07/26 19:01:14 8255468 403248f7 [INFO Client 2580] [SCENE] Set Source [The Forest Encampment]
//! ```
//!
//! The area code is `<prefix>_<act>_<zone>`, so the second number is the act.
//! Scene sources of `(null)` and `(unknown)` are loading-screen noise and
//! produce no event at all.

use memchr::memmem;
use regex_lite::Regex;

/// A domain event extracted from the log, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// A level was generated for act `n` (always positive).
    StageTransition(u32),
    /// The player entered a location.
    LocationEntered(String),
}

impl LogEvent {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            LogEvent::StageTransition(_) => "stage",
            LogEvent::LocationEntered(_) => "location",
        }
    }
}

/// Scene sources that are not locations.
const EMPTY_SOURCES: [&str; 2] = ["(null)", "(unknown)"];

/// Pre-compiled matchers. Build once per session and reuse across polls.
///
/// A SIMD substring search rejects chunks without any marker before the
/// regexes run, which keeps idle polls over chatty logs cheap.
pub struct EventExtractor {
    stage_marker: memmem::Finder<'static>,
    scene_marker: memmem::Finder<'static>,
    stage_re: Regex,
    scene_re: Regex,
}

impl EventExtractor {
    pub fn new() -> Self {
        Self {
            stage_marker: memmem::Finder::new(b"Generating level "),
            scene_marker: memmem::Finder::new(b"[SCENE] Set Source ["),
            // Patterns are constants; compilation cannot fail.
            stage_re: Regex::new(r#"Generating level \d+ area "\d+_(\d+)_"#)
                .expect("stage marker pattern is valid"),
            scene_re: Regex::new(r"\[SCENE\] Set Source \[([^\]\r\n]+)\]")
                .expect("scene marker pattern is valid"),
        }
    }

    /// Extract every event in `text`, ordered by position.
    pub fn extract(&self, text: &str) -> Vec<LogEvent> {
        let bytes = text.as_bytes();
        let mut found: Vec<(usize, LogEvent)> = Vec::new();

        if self.stage_marker.find(bytes).is_some() {
            for caps in self.stage_re.captures_iter(text) {
                let (Some(whole), Some(act)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                // Overflowing or zero act numbers are not stage markers.
                match act.as_str().parse::<u32>() {
                    Ok(n) if n > 0 => found.push((whole.start(), LogEvent::StageTransition(n))),
                    _ => tracing::trace!(area = act.as_str(), "Ignoring non-act area code"),
                }
            }
        }

        if self.scene_marker.find(bytes).is_some() {
            for caps in self.scene_re.captures_iter(text) {
                let (Some(whole), Some(source)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let source = source.as_str();
                if EMPTY_SOURCES.contains(&source) {
                    continue;
                }
                found.push((whole.start(), LogEvent::LocationEntered(source.to_string())));
            }
        }

        // Matches of the two patterns never start at the same byte.
        found.sort_by_key(|(pos, _)| *pos);
        found.into_iter().map(|(_, event)| event).collect()
    }
}

impl Default for EventExtractor {
    fn default() -> Self {
        Self::new()
    }
}
