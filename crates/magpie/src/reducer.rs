use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::extract::{display_text, gather_text, is_truthy};
use crate::models::activity::{ActivityEvent, ActivityKind};
use crate::stream::StreamEvent;

/// Node that emits the completed report in the research graph.
pub const FINAL_REPORT_NODE: &str = "final_report_generation";

/// Reserved graph bookkeeping node, never surfaced in logs.
const START_NODE: &str = "__start__";

/// Shown when streaming, recovery, and the error fallback all produced
/// nothing usable.
pub const MISSING_RESPONSE_PLACEHOLDER: &str = "The response could not be retrieved.";

/// What one folded event changed, for the caller to publish live.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// Streamed text grew; carries the full live content so far.
    LiveText(String),
    /// New process-log lines were appended by this event.
    Logged(Vec<String>),
    /// The event carried nothing the accumulators consume.
    Nothing,
}

/// Result of folding a whole stream, ready to be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Recorded text per the completion rule, or `None` when recovery must
    /// run: the last `final_report` wins over streamed text, streamed text
    /// over nothing.
    pub text: Option<String>,
    pub logs: Vec<String>,
    pub activity: Vec<ActivityEvent>,
}

/// Per-run accumulator set, folding a heterogeneous event stream into the
/// final response text, the live streamed text, and the process log.
///
/// Created empty at send time, fed every decoded event in emission order,
/// and discarded after [`RunAccumulator::finish`]. No event is required to
/// appear; zero, one, or many occurrences of each tag are all tolerated.
#[derive(Debug, Clone, Default)]
pub struct RunAccumulator {
    full_response: Option<String>,
    streamed: String,
    logs: Vec<String>,
    activity: Vec<ActivityEvent>,
}

impl RunAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn streamed(&self) -> &str {
        &self.streamed
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    /// Fold one stream event into the accumulators.
    pub fn apply(&mut self, event: &StreamEvent) -> Applied {
        match event {
            StreamEvent::Values(data) => self.apply_values(data),
            StreamEvent::Messages(data) => self.apply_messages(data),
            StreamEvent::Updates(nodes) => self.apply_updates(nodes),
        }
    }

    // A later snapshot always supersedes an earlier one, and any
    // messages-derived text. Streamed text keeps updating the visible
    // content afterwards regardless; that tie-break is intentional.
    fn apply_values(&mut self, data: &Value) -> Applied {
        if let Some(report) = data.get("final_report") {
            if is_truthy(report) {
                self.full_response = Some(display_text(report));
            }
        }
        Applied::Nothing
    }

    fn apply_messages(&mut self, data: &Value) -> Applied {
        let delta = gather_text(data);
        if delta.is_empty() {
            return Applied::Nothing;
        }
        self.streamed.push_str(&delta);
        Applied::LiveText(self.streamed.clone())
    }

    fn apply_updates(&mut self, nodes: &Map<String, Value>) -> Applied {
        let mut appended = Vec::new();

        for (node, output) in nodes {
            if node.as_str() == START_NODE {
                continue;
            }

            let timestamp = Utc::now();
            appended.push(self.push_log(
                format!("[{}] {} executed", timestamp.format("%H:%M:%S"), node),
                timestamp,
            ));

            if let Some(report) = output.get("final_report") {
                if is_truthy(report) {
                    let report = display_text(report);
                    if node.as_str() == FINAL_REPORT_NODE {
                        appended.push(self.push_log(
                            format!("  final report: {} chars", report.chars().count()),
                            Utc::now(),
                        ));
                    }
                    self.full_response = Some(report);
                }
            }
        }

        if appended.is_empty() {
            Applied::Nothing
        } else {
            Applied::Logged(appended)
        }
    }

    fn push_log(&mut self, line: String, timestamp: DateTime<Utc>) -> String {
        self.activity.push(ActivityEvent {
            kind: ActivityKind::Log,
            content: line.clone(),
            timestamp,
        });
        self.logs.push(line.clone());
        line
    }

    /// Apply the completion rule and hand the folded state back for the
    /// single commit into thread and timeline.
    pub fn finish(self) -> RunOutcome {
        let RunAccumulator {
            full_response,
            streamed,
            logs,
            activity,
        } = self;

        let text = match full_response {
            Some(report) if !report.is_empty() => Some(report),
            _ if !streamed.is_empty() => Some(streamed),
            _ => None,
        };

        RunOutcome {
            text,
            logs,
            activity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn updates(pairs: &[(&str, Value)]) -> StreamEvent {
        let mut map = Map::new();
        for (node, output) in pairs {
            map.insert(node.to_string(), output.clone());
        }
        StreamEvent::Updates(map)
    }

    #[test]
    fn test_last_final_report_wins_over_streamed_text() {
        let mut acc = RunAccumulator::new();
        acc.apply(&StreamEvent::Values(json!({"final_report": "first"})));
        acc.apply(&StreamEvent::Messages(json!({"content": "partial "})));
        acc.apply(&StreamEvent::Values(json!({"final_report": "second"})));
        acc.apply(&StreamEvent::Messages(json!({"content": "text"})));

        let outcome = acc.finish();
        assert_eq!(outcome.text.as_deref(), Some("second"));
    }

    #[test]
    fn test_updates_final_report_supersedes_values() {
        let mut acc = RunAccumulator::new();
        acc.apply(&StreamEvent::Values(json!({"final_report": "early"})));
        acc.apply(&updates(&[(
            FINAL_REPORT_NODE,
            json!({"final_report": "late report"}),
        )]));

        assert_eq!(acc.finish().text.as_deref(), Some("late report"));
    }

    #[test]
    fn test_messages_publish_concatenated_live_text() {
        let mut acc = RunAccumulator::new();

        let first = acc.apply(&StreamEvent::Messages(json!({"content": {"text": "A"}})));
        assert_eq!(first, Applied::LiveText("A".to_string()));

        let second = acc.apply(&StreamEvent::Messages(json!({"content": {"text": "B"}})));
        assert_eq!(second, Applied::LiveText("AB".to_string()));

        assert_eq!(acc.streamed(), "AB");
        assert_eq!(acc.finish().text.as_deref(), Some("AB"));
    }

    #[test]
    fn test_empty_delta_publishes_nothing() {
        let mut acc = RunAccumulator::new();
        let applied = acc.apply(&StreamEvent::Messages(json!({"content": ""})));
        assert_eq!(applied, Applied::Nothing);
        assert_eq!(acc.streamed(), "");
    }

    #[test]
    fn test_start_node_never_logged() {
        let mut acc = RunAccumulator::new();
        let applied = acc.apply(&updates(&[("__start__", json!({"messages": []}))]));
        assert_eq!(applied, Applied::Nothing);
        assert!(acc.logs().is_empty());

        acc.apply(&updates(&[
            ("__start__", json!({})),
            ("write_queries", json!({"queries": 4})),
        ]));
        assert_eq!(acc.logs().len(), 1);
        assert!(acc.logs()[0].contains("write_queries"));
    }

    #[test]
    fn test_node_log_carries_name_and_activity_entry() {
        let mut acc = RunAccumulator::new();
        match acc.apply(&updates(&[("search_web", json!({"hits": 12}))])) {
            Applied::Logged(lines) => {
                assert_eq!(lines.len(), 1);
                assert!(lines[0].contains("search_web"));
            }
            other => panic!("expected log lines, got {other:?}"),
        }

        let outcome = acc.finish();
        assert_eq!(outcome.activity.len(), 1);
        assert_eq!(outcome.activity[0].content, outcome.logs[0]);
    }

    #[test]
    fn test_terminal_node_logs_report_length() {
        let mut acc = RunAccumulator::new();
        acc.apply(&updates(&[(
            FINAL_REPORT_NODE,
            json!({"final_report": "12345"}),
        )]));

        assert_eq!(acc.logs().len(), 2);
        assert!(acc.logs()[1].contains("5 chars"));

        // A non-terminal node with a report sets the text but skips the
        // length line.
        let mut acc = RunAccumulator::new();
        acc.apply(&updates(&[("synthesize", json!({"final_report": "abc"}))]));
        assert_eq!(acc.logs().len(), 1);
        assert_eq!(acc.finish().text.as_deref(), Some("abc"));
    }

    #[test]
    fn test_falsy_final_report_ignored() {
        let mut acc = RunAccumulator::new();
        acc.apply(&StreamEvent::Values(json!({"final_report": ""})));
        acc.apply(&StreamEvent::Values(json!({"final_report": null})));
        acc.apply(&updates(&[("node", json!({"final_report": false}))]));

        assert_eq!(acc.finish().text, None);
    }

    #[test]
    fn test_empty_stream_yields_no_text() {
        let acc = RunAccumulator::new();
        let outcome = acc.finish();
        assert_eq!(outcome.text, None);
        assert!(outcome.logs.is_empty());
        assert!(outcome.activity.is_empty());
    }
}
