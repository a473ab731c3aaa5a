//! Connect Rebalance Payload Codec
//!
//! Binary schema of the metadata and assignment payloads Connect workers
//! embed in group-coordination messages:
//! - all integers are network byte order (big-endian)
//! - strings are length-prefixed with an int16 length, -1 meaning null
//! - arrays are length-prefixed with an int32 element count
//!
//! Both payload kinds open with an int16 schema version tied to the protocol
//! variant: 0 for eager, 1 for compatible, 2 for sessioned. The eager schema
//! ends after the common fields; the cooperative schemas continue with the
//! revocation arrays and the scheduled rebalance delay. A payload may be a
//! sub-slice of a larger message, so bytes remaining after the schema are
//! ignored rather than rejected.
//!
//! Decoding is pure: every call builds fresh values owned by the caller, and
//! nothing here holds state between calls.

use super::ProtocolVariant;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectCodecError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("unsupported schema version {found} for {variant:?} (expected {expected})")]
    UnsupportedVersion {
        found: i16,
        expected: i16,
        variant: ProtocolVariant,
    },
}

pub type Result<T> = std::result::Result<T, ConnectCodecError>;

/// One unit of Connect work: a task of a named connector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorTaskId {
    pub connector: String,
    pub task: i32,
}

impl ConnectorTaskId {
    pub fn new(connector: impl Into<String>, task: i32) -> Self {
        Self {
            connector: connector.into(),
            task,
        }
    }
}

impl std::fmt::Display for ConnectorTaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-T{}", self.connector, self.task)
    }
}

/// Work being revoked in an incremental cooperative rebalance round.
///
/// Present only on cooperative-variant assignments; an eager assignment has
/// no revocation section at all, not an empty one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Revocations {
    pub connectors: Vec<String>,
    pub tasks: Vec<ConnectorTaskId>,
    /// Scheduled rebalance delay in milliseconds
    pub delay_ms: i32,
}

/// One member's view of the cluster work distribution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Assignment status, 0 meaning no error
    pub error: i16,
    /// Member id of the elected leader, if one exists
    pub leader: Option<String>,
    /// Advertised URL of the leader
    pub leader_url: String,
    /// Configuration snapshot this assignment was computed against
    pub config_offset: i64,
    pub connectors: Vec<String>,
    pub tasks: Vec<ConnectorTaskId>,
    /// Cooperative variants only
    pub revocations: Option<Revocations>,
}

/// One member's advertised metadata.
///
/// The eager protocol carries assignment data only in the SyncGroup
/// exchange, so its JoinGroup metadata is just the worker URL; cooperative
/// metadata embeds the member's current assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerState {
    pub url: String,
    pub assignment: Option<Assignment>,
}

fn schema_version(variant: ProtocolVariant) -> i16 {
    match variant {
        ProtocolVariant::Eager => 0,
        ProtocolVariant::Compatible => 1,
        ProtocolVariant::Sessioned => 2,
    }
}

/// Decode an assignment payload against the schema implied by `variant`.
///
/// Trailing bytes beyond the schema are not an error; truncated buffers,
/// bad string lengths, and array counts exceeding the buffer are.
pub fn decode_assignment(payload: &[u8], variant: ProtocolVariant) -> Result<Assignment> {
    let mut cursor = Cursor::new(payload);
    read_version(&mut cursor, variant)?;
    read_assignment_body(&mut cursor, variant)
}

/// Decode a worker metadata payload against the schema implied by `variant`
pub fn decode_worker_state(payload: &[u8], variant: ProtocolVariant) -> Result<WorkerState> {
    let mut cursor = Cursor::new(payload);
    read_version(&mut cursor, variant)?;
    let url = read_string(&mut cursor)?;

    let assignment = if variant.is_cooperative() {
        // The embedded assignment carries its own version header
        read_version(&mut cursor, variant)?;
        Some(read_assignment_body(&mut cursor, variant)?)
    } else {
        None
    };

    Ok(WorkerState { url, assignment })
}

/// Structural inverse of [`decode_assignment`], for symmetry and testing;
/// the interception path never re-encodes.
pub fn encode_assignment(assignment: &Assignment, variant: ProtocolVariant) -> Bytes {
    let mut buf = BytesMut::new();
    put_assignment(&mut buf, assignment, variant);
    buf.freeze()
}

/// Structural inverse of [`decode_worker_state`]
pub fn encode_worker_state(state: &WorkerState, variant: ProtocolVariant) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_i16(schema_version(variant));
    put_string(&mut buf, &state.url);
    if variant.is_cooperative() {
        // Cooperative metadata always embeds an assignment; a worker that has
        // none yet advertises an empty one
        let fallback = Assignment {
            error: 0,
            leader: None,
            leader_url: String::new(),
            config_offset: -1,
            connectors: Vec::new(),
            tasks: Vec::new(),
            revocations: Some(Revocations::default()),
        };
        put_assignment(&mut buf, state.assignment.as_ref().unwrap_or(&fallback), variant);
    }
    buf.freeze()
}

fn put_assignment(buf: &mut BytesMut, assignment: &Assignment, variant: ProtocolVariant) {
    buf.put_i16(schema_version(variant));
    buf.put_i16(assignment.error);
    put_nullable_string(buf, assignment.leader.as_deref());
    put_string(buf, &assignment.leader_url);
    buf.put_i64(assignment.config_offset);
    put_string_array(buf, &assignment.connectors);
    put_task_array(buf, &assignment.tasks);
    if variant.is_cooperative() {
        let revocations = assignment.revocations.clone().unwrap_or_default();
        put_string_array(buf, &revocations.connectors);
        put_task_array(buf, &revocations.tasks);
        buf.put_i32(revocations.delay_ms);
    }
}

fn read_assignment_body(cursor: &mut Cursor<&[u8]>, variant: ProtocolVariant) -> Result<Assignment> {
    let error = read_i16(cursor)?;
    let leader = read_nullable_string(cursor)?;
    let leader_url = read_string(cursor)?;
    let config_offset = read_i64(cursor)?;
    let connectors = read_string_array(cursor)?;
    let tasks = read_task_array(cursor)?;

    let revocations = if variant.is_cooperative() {
        let revoked_connectors = read_string_array(cursor)?;
        let revoked_tasks = read_task_array(cursor)?;
        let delay_ms = read_i32(cursor)?;
        Some(Revocations {
            connectors: revoked_connectors,
            tasks: revoked_tasks,
            delay_ms,
        })
    } else {
        None
    };

    Ok(Assignment {
        error,
        leader,
        leader_url,
        config_offset,
        connectors,
        tasks,
        revocations,
    })
}

fn read_version(cursor: &mut Cursor<&[u8]>, variant: ProtocolVariant) -> Result<()> {
    let expected = schema_version(variant);
    let found = read_i16(cursor)?;
    if found != expected {
        return Err(ConnectCodecError::UnsupportedVersion {
            found,
            expected,
            variant,
        });
    }
    Ok(())
}

// ============================================================================
// PRIMITIVE READERS
//
// bytes::Buf panics on underrun, so every read checks remaining first and
// reports truncation as MalformedPayload instead.
// ============================================================================

fn ensure_remaining(cursor: &Cursor<&[u8]>, needed: usize, what: &str) -> Result<()> {
    let remaining = cursor.get_ref().len() - cursor.position() as usize;
    if remaining < needed {
        return Err(ConnectCodecError::MalformedPayload(format!(
            "truncated buffer reading {}: needed {} bytes, {} available",
            what, needed, remaining
        )));
    }
    Ok(())
}

fn read_i16(cursor: &mut Cursor<&[u8]>) -> Result<i16> {
    ensure_remaining(cursor, 2, "int16")?;
    Ok(cursor.get_i16())
}

fn read_i32(cursor: &mut Cursor<&[u8]>) -> Result<i32> {
    ensure_remaining(cursor, 4, "int32")?;
    Ok(cursor.get_i32())
}

fn read_i64(cursor: &mut Cursor<&[u8]>) -> Result<i64> {
    ensure_remaining(cursor, 8, "int64")?;
    Ok(cursor.get_i64())
}

fn read_string(cursor: &mut Cursor<&[u8]>) -> Result<String> {
    match read_nullable_string(cursor)? {
        Some(s) => Ok(s),
        None => Err(ConnectCodecError::MalformedPayload(
            "expected non-null string".to_string(),
        )),
    }
}

fn read_nullable_string(cursor: &mut Cursor<&[u8]>) -> Result<Option<String>> {
    let len = read_i16(cursor)?;
    if len == -1 {
        return Ok(None);
    }
    if len < 0 {
        return Err(ConnectCodecError::MalformedPayload(format!(
            "invalid string length {}",
            len
        )));
    }
    ensure_remaining(cursor, len as usize, "string body")?;
    let mut raw = vec![0u8; len as usize];
    cursor.copy_to_slice(&mut raw);
    let s = String::from_utf8(raw)
        .map_err(|e| ConnectCodecError::MalformedPayload(format!("invalid UTF-8: {}", e)))?;
    Ok(Some(s))
}

fn read_array_len(cursor: &mut Cursor<&[u8]>, min_entry_size: usize) -> Result<usize> {
    let count = read_i32(cursor)?;
    if count < 0 {
        return Err(ConnectCodecError::MalformedPayload(format!(
            "invalid array length {}",
            count
        )));
    }
    let remaining = cursor.get_ref().len() - cursor.position() as usize;
    if (count as usize).saturating_mul(min_entry_size) > remaining {
        return Err(ConnectCodecError::MalformedPayload(format!(
            "array length {} exceeds remaining buffer size {}",
            count, remaining
        )));
    }
    Ok(count as usize)
}

fn read_string_array(cursor: &mut Cursor<&[u8]>) -> Result<Vec<String>> {
    // Each entry is at least the 2-byte length prefix
    let count = read_array_len(cursor, 2)?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        entries.push(read_string(cursor)?);
    }
    Ok(entries)
}

fn read_task_array(cursor: &mut Cursor<&[u8]>) -> Result<Vec<ConnectorTaskId>> {
    // Each entry is at least a 2-byte string prefix plus a 4-byte task number
    let count = read_array_len(cursor, 6)?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let connector = read_string(cursor)?;
        let task = read_i32(cursor)?;
        entries.push(ConnectorTaskId { connector, task });
    }
    Ok(entries)
}

// ============================================================================
// PRIMITIVE WRITERS
// ============================================================================

fn put_string(buf: &mut BytesMut, s: &str) {
    debug_assert!(
        s.len() <= i16::MAX as usize,
        "string length {} exceeds the int16 length prefix",
        s.len()
    );
    buf.put_i16(s.len() as i16);
    buf.put_slice(s.as_bytes());
}

fn put_nullable_string(buf: &mut BytesMut, s: Option<&str>) {
    match s {
        Some(s) => put_string(buf, s),
        None => buf.put_i16(-1),
    }
}

fn put_array_len(buf: &mut BytesMut, len: usize) {
    debug_assert!(
        len <= i32::MAX as usize,
        "array length {} exceeds the int32 count prefix",
        len
    );
    buf.put_i32(len as i32);
}

fn put_string_array(buf: &mut BytesMut, entries: &[String]) {
    put_array_len(buf, entries.len());
    for entry in entries {
        put_string(buf, entry);
    }
}

fn put_task_array(buf: &mut BytesMut, entries: &[ConnectorTaskId]) {
    put_array_len(buf, entries.len());
    for entry in entries {
        put_string(buf, &entry.connector);
        buf.put_i32(entry.task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eager_assignment() -> Assignment {
        Assignment {
            error: 0,
            leader: Some("worker-1".to_string()),
            leader_url: "http://worker-1:8083".to_string(),
            config_offset: 42,
            connectors: vec!["c1".to_string()],
            tasks: vec![ConnectorTaskId::new("c1", 0), ConnectorTaskId::new("c1", 1)],
            revocations: None,
        }
    }

    fn sessioned_assignment() -> Assignment {
        Assignment {
            revocations: Some(Revocations {
                connectors: vec!["c2".to_string()],
                tasks: vec![ConnectorTaskId::new("c2", 3)],
                delay_ms: 5000,
            }),
            ..eager_assignment()
        }
    }

    #[test]
    fn test_assignment_round_trip_eager() {
        let assignment = eager_assignment();
        let bytes = encode_assignment(&assignment, ProtocolVariant::Eager);
        let decoded = decode_assignment(&bytes, ProtocolVariant::Eager).unwrap();
        assert_eq!(decoded, assignment);
        // And back to the exact same bytes
        assert_eq!(encode_assignment(&decoded, ProtocolVariant::Eager), bytes);
    }

    #[test]
    fn test_assignment_round_trip_cooperative() {
        for variant in [ProtocolVariant::Compatible, ProtocolVariant::Sessioned] {
            let assignment = sessioned_assignment();
            let bytes = encode_assignment(&assignment, variant);
            let decoded = decode_assignment(&bytes, variant).unwrap();
            assert_eq!(decoded, assignment);
            assert_eq!(encode_assignment(&decoded, variant), bytes);
        }
    }

    #[test]
    #[should_panic(expected = "exceeds the int16 length prefix")]
    fn test_oversized_string_rejected_by_encoder() {
        let assignment = Assignment {
            leader_url: "x".repeat(i16::MAX as usize + 1),
            ..eager_assignment()
        };
        encode_assignment(&assignment, ProtocolVariant::Eager);
    }

    #[test]
    fn test_worker_state_round_trip() {
        let eager = WorkerState {
            url: "http://worker-1:8083".to_string(),
            assignment: None,
        };
        let bytes = encode_worker_state(&eager, ProtocolVariant::Eager);
        assert_eq!(
            decode_worker_state(&bytes, ProtocolVariant::Eager).unwrap(),
            eager
        );
        assert_eq!(
            encode_worker_state(
                &decode_worker_state(&bytes, ProtocolVariant::Eager).unwrap(),
                ProtocolVariant::Eager
            ),
            bytes
        );

        let sessioned = WorkerState {
            url: "http://worker-2:8083".to_string(),
            assignment: Some(sessioned_assignment()),
        };
        let bytes = encode_worker_state(&sessioned, ProtocolVariant::Sessioned);
        assert_eq!(
            decode_worker_state(&bytes, ProtocolVariant::Sessioned).unwrap(),
            sessioned
        );
    }

    #[test]
    fn test_truncated_buffer_is_malformed() {
        for variant in [ProtocolVariant::Sessioned, ProtocolVariant::Compatible] {
            let state = WorkerState {
                url: "http://worker-2:8083".to_string(),
                assignment: Some(sessioned_assignment()),
            };
            let bytes = encode_worker_state(&state, variant);
            // Dropping the final byte must fail, at every truncation point
            let truncated = &bytes[..bytes.len() - 1];
            assert!(matches!(
                decode_worker_state(truncated, variant),
                Err(ConnectCodecError::MalformedPayload(_))
            ));
        }
    }

    #[test]
    fn test_every_truncation_point_fails() {
        let bytes = encode_assignment(&sessioned_assignment(), ProtocolVariant::Sessioned);
        for len in 0..bytes.len() {
            assert!(
                decode_assignment(&bytes[..len], ProtocolVariant::Sessioned).is_err(),
                "decode succeeded on {}-byte prefix",
                len
            );
        }
    }

    #[test]
    fn test_eager_ignores_trailing_bytes() {
        let assignment = eager_assignment();
        let mut bytes = encode_assignment(&assignment, ProtocolVariant::Eager).to_vec();
        // The payload may be a sub-slice of a larger message
        bytes.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        let decoded = decode_assignment(&bytes, ProtocolVariant::Eager).unwrap();
        assert_eq!(decoded, assignment);
        assert!(decoded.revocations.is_none());
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let bytes = encode_assignment(&eager_assignment(), ProtocolVariant::Eager);
        assert!(matches!(
            decode_assignment(&bytes, ProtocolVariant::Sessioned),
            Err(ConnectCodecError::UnsupportedVersion {
                found: 0,
                expected: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_empty_buffer_is_malformed() {
        assert!(matches!(
            decode_worker_state(&[], ProtocolVariant::Eager),
            Err(ConnectCodecError::MalformedPayload(_))
        ));
        assert!(matches!(
            decode_assignment(&[], ProtocolVariant::Eager),
            Err(ConnectCodecError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_bad_array_count_is_malformed() {
        let mut buf = BytesMut::new();
        buf.put_i16(0); // version
        buf.put_i16(0); // error
        put_nullable_string(&mut buf, Some("worker-1"));
        put_string(&mut buf, "http://worker-1:8083");
        buf.put_i64(42);
        buf.put_i32(-2); // negative connector count
        assert!(matches!(
            decode_assignment(&buf, ProtocolVariant::Eager),
            Err(ConnectCodecError::MalformedPayload(_))
        ));

        let mut buf = BytesMut::new();
        buf.put_i16(0);
        buf.put_i16(0);
        put_nullable_string(&mut buf, Some("worker-1"));
        put_string(&mut buf, "http://worker-1:8083");
        buf.put_i64(42);
        buf.put_i32(1_000_000); // count far beyond the buffer
        assert!(matches!(
            decode_assignment(&buf, ProtocolVariant::Eager),
            Err(ConnectCodecError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_nullable_leader() {
        let assignment = Assignment {
            leader: None,
            ..eager_assignment()
        };
        let bytes = encode_assignment(&assignment, ProtocolVariant::Eager);
        let decoded = decode_assignment(&bytes, ProtocolVariant::Eager).unwrap();
        assert_eq!(decoded.leader, None);
    }

    #[test]
    fn test_task_id_display() {
        assert_eq!(ConnectorTaskId::new("c1", 0).to_string(), "c1-T0");
        assert_eq!(ConnectorTaskId::new("my-sink", 12).to_string(), "my-sink-T12");
    }
}
