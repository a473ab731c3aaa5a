//! Diagnostic Rendering
//!
//! Pure formatting of decoded rebalance structures into operator-facing text
//! blocks. A block is a coloured header line naming the message and its
//! direction (`=>` request, `<=` response) followed by one indented
//! `label => value` line per field; nested structures indent further using
//! the same convention. Rendering performs no I/O: blocks go to an injected
//! [`DiagnosticSink`], and a slow or stalled sink drops blocks rather than
//! ever stalling the message path.

use crate::connect::{display_protocol_name, Assignment, WorkerState};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::debug;

/// ANSI colours used for block headers, one per message kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colour {
    Red,
    Green,
    Yellow,
    Purple,
    Cyan,
}

impl Colour {
    fn code(self) -> &'static str {
        match self {
            Colour::Red => "31",
            Colour::Green => "32",
            Colour::Yellow => "33",
            Colour::Purple => "35",
            Colour::Cyan => "36",
        }
    }
}

/// Stateless formatter for diagnostic blocks
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    colour: bool,
}

impl Renderer {
    pub fn new(colour: bool) -> Self {
        Self { colour }
    }

    /// Wrap `text` in an ANSI colour when colour output is enabled
    pub fn paint(&self, colour: Colour, text: &str) -> String {
        if self.colour {
            format!("\x1b[{}m{}\x1b[0m", colour.code(), text)
        } else {
            text.to_string()
        }
    }

    /// A plain `label => value` line
    pub fn field(&self, label: &str, value: impl std::fmt::Display) -> String {
        format!("{} => {}", label, value)
    }

    /// A `label => value` line with the value emphasised
    pub fn highlight(&self, label: &str, value: impl std::fmt::Display) -> String {
        if self.colour {
            format!("{} => \x1b[1m{}\x1b[0m", label, value)
        } else {
            self.field(label, value)
        }
    }

    /// One full diagnostic block: coloured header, then one indented line
    /// per field. Fields may span multiple lines; continuation lines carry
    /// their own deeper indentation.
    pub fn api_call(&self, colour: Colour, name: &str, fields: &[String]) -> String {
        let mut block = self.paint(colour, name);
        block.push('\n');
        for field in fields {
            block.push_str("       ");
            block.push_str(field);
            block.push('\n');
        }
        block
    }

    /// `protocol_name => ...` with the wire name `default` shown as `eager`
    pub fn protocol_name_field(&self, name: Option<&str>) -> String {
        match name {
            Some(name) => self.field("protocol_name", display_protocol_name(name)),
            None => self.field("protocol_name", ""),
        }
    }

    /// `assignment => connectors=[..],tasks=[..]`, with the revocation and
    /// delay section appended only when the assignment carries one
    pub fn assignment(&self, assignment: &Assignment) -> String {
        let connectors = assignment.connectors.join(",");
        let tasks = join_display(&assignment.tasks);
        let mut value = format!("connectors=[{}],tasks=[{}]", connectors, tasks);
        if let Some(revocations) = &assignment.revocations {
            value.push_str(&format!(
                "\n                   revokedConnectors=[{}],revokedTasks=[{}],delay={}",
                revocations.connectors.join(","),
                join_display(&revocations.tasks),
                revocations.delay_ms
            ));
        }
        self.field("assignment", value)
    }

    /// Worker metadata: the embedded assignment when one is present, the
    /// advertised URL otherwise
    pub fn worker_state(&self, state: &WorkerState) -> String {
        match &state.assignment {
            Some(assignment) => self.assignment(assignment),
            None => self.field("url", &state.url),
        }
    }

    /// Stand-in field emitted when an embedded payload cannot be decoded
    pub fn decode_failure(&self, label: &str, error: impl std::fmt::Display) -> String {
        self.field(label, format!("<undecodable: {}>", error))
    }

    /// Stand-in field for a sub-protocol name outside the Connect set
    pub fn unrecognized_protocol(&self, label: &str, name: &str, len: usize) -> String {
        self.field(
            label,
            format!("<unrecognized protocol '{}', {} bytes not decoded>", name, len),
        )
    }
}

fn join_display<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Fire-and-forget destination for rendered diagnostic blocks.
///
/// `emit` must never block: implementations buffer or drop. Write failures
/// stay inside the sink; the interception path never sees them.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, block: String);
}

/// Sink that writes blocks to stdout through a bounded channel.
///
/// A spawned task owns the actual writes. When the channel is full the
/// block is dropped, so a stalled terminal can never back up into message
/// forwarding.
pub struct StdoutSink {
    tx: mpsc::Sender<String>,
}

impl StdoutSink {
    /// Spawn the writer task on the current tokio runtime
    pub fn spawn(capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<String>(capacity);
        tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(block) = rx.recv().await {
                if stdout.write_all(block.as_bytes()).await.is_err() {
                    break;
                }
                let _ = stdout.write_all(b"\n").await;
                let _ = stdout.flush().await;
            }
        });
        Self { tx }
    }
}

impl DiagnosticSink for StdoutSink {
    fn emit(&self, block: String) {
        if self.tx.try_send(block).is_err() {
            debug!("diagnostic sink full, dropping block");
        }
    }
}

/// Sink that captures blocks in memory, for tests and demos
#[derive(Default)]
pub struct MemorySink {
    blocks: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks captured so far, in emission order
    pub fn blocks(&self) -> Vec<String> {
        self.blocks.lock().expect("sink lock poisoned").clone()
    }

    /// Drain and return all captured blocks
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.blocks.lock().expect("sink lock poisoned"))
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, block: String) {
        self.blocks.lock().expect("sink lock poisoned").push(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect::{ConnectorTaskId, Revocations};

    fn plain() -> Renderer {
        Renderer::new(false)
    }

    fn eager_assignment() -> Assignment {
        Assignment {
            error: 0,
            leader: Some("worker-1".to_string()),
            leader_url: "http://worker-1:8083".to_string(),
            config_offset: 9,
            connectors: vec!["c1".to_string()],
            tasks: vec![ConnectorTaskId::new("c1", 0), ConnectorTaskId::new("c1", 1)],
            revocations: None,
        }
    }

    #[test]
    fn test_eager_assignment_rendering() {
        let text = plain().assignment(&eager_assignment());
        assert!(text.contains("connectors=[c1]"));
        assert!(text.contains("tasks=[c1-T0,c1-T1]"));
        assert!(!text.contains("revoked"));
        assert!(!text.contains("delay"));
    }

    #[test]
    fn test_cooperative_assignment_rendering() {
        let assignment = Assignment {
            revocations: Some(Revocations {
                connectors: vec!["c2".to_string()],
                tasks: vec![ConnectorTaskId::new("c2", 3)],
                delay_ms: 5000,
            }),
            ..eager_assignment()
        };
        let text = plain().assignment(&assignment);
        assert!(text.contains("connectors=[c1]"));
        assert!(text.contains("tasks=[c1-T0,c1-T1]"));
        assert!(text.contains("revokedConnectors=[c2]"));
        assert!(text.contains("revokedTasks=[c2-T3]"));
        assert!(text.contains("delay=5000"));
    }

    #[test]
    fn test_worker_state_rendering() {
        let renderer = plain();
        let eager = WorkerState {
            url: "http://worker-1:8083".to_string(),
            assignment: None,
        };
        assert_eq!(renderer.worker_state(&eager), "url => http://worker-1:8083");

        let cooperative = WorkerState {
            url: "http://worker-1:8083".to_string(),
            assignment: Some(eager_assignment()),
        };
        assert!(renderer.worker_state(&cooperative).starts_with("assignment => "));
    }

    #[test]
    fn test_protocol_name_substitution() {
        let renderer = plain();
        assert_eq!(
            renderer.protocol_name_field(Some("default")),
            "protocol_name => eager"
        );
        assert_eq!(
            renderer.protocol_name_field(Some("sessioned")),
            "protocol_name => sessioned"
        );
        assert_eq!(renderer.protocol_name_field(None), "protocol_name => ");
    }

    #[test]
    fn test_api_call_block_shape() {
        let renderer = plain();
        let block = renderer.api_call(
            Colour::Yellow,
            "=> JoinGroup",
            &[
                renderer.field("group_id", "connect-cluster"),
                renderer.field("member_id", "worker-a"),
            ],
        );
        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(lines[0], "=> JoinGroup");
        assert_eq!(lines[1], "       group_id => connect-cluster");
        assert_eq!(lines[2], "       member_id => worker-a");
    }

    #[test]
    fn test_colour_painting() {
        let coloured = Renderer::new(true);
        assert_eq!(coloured.paint(Colour::Red, "x"), "\x1b[31mx\x1b[0m");
        assert_eq!(plain().paint(Colour::Red, "x"), "x");
        assert_eq!(plain().highlight("k", "v"), "k => v");
        assert!(coloured.highlight("k", "v").contains("\x1b[1m"));
    }

    #[tokio::test]
    async fn test_stdout_sink_drops_blocks_when_buffer_full() {
        // Hold the receiver ourselves so nothing drains: the first block
        // fills the capacity-1 buffer and everything after it is dropped
        let (tx, mut rx) = mpsc::channel::<String>(1);
        let sink = StdoutSink { tx };
        sink.emit("first".to_string());
        sink.emit("second".to_string());
        sink.emit("third".to_string());
        assert_eq!(rx.recv().await.as_deref(), Some("first"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_emit_survives_dead_writer() {
        // Writer gone (as after a write error ends the drain task): emit
        // must still return without blocking or panicking
        let (tx, rx) = mpsc::channel::<String>(1);
        drop(rx);
        let sink = StdoutSink { tx };
        sink.emit("orphan".to_string());
    }

    #[test]
    fn test_memory_sink_captures_in_order() {
        let sink = MemorySink::new();
        sink.emit("first".to_string());
        sink.emit("second".to_string());
        assert_eq!(sink.blocks(), vec!["first", "second"]);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.blocks().is_empty());
    }
}
