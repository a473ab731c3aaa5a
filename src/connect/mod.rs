//! Connect Rebalance Protocol
//!
//! Kafka Connect workers negotiate one of three sub-protocols during group
//! membership, and the negotiated name decides the binary schema of every
//! metadata and assignment payload exchanged afterwards:
//!
//! - `default` - the eager protocol: all work is revoked and reassigned on
//!   every rebalance, so payloads carry assignments only
//! - `compatible` / `sessioned` - incremental cooperative protocols: payloads
//!   additionally carry the work being revoked this round and a scheduled
//!   rebalance delay
//!
//! [`classify`] maps a wire protocol name to the closed [`ProtocolVariant`]
//! enum exactly once, at the interception boundary; the codec in [`codec`]
//! is driven by the enum and never re-inspects strings. Any name outside the
//! known set means the message belongs to some unrelated user of the group
//! mechanism and its payloads must not be decoded at all.

pub mod codec;

pub use codec::{
    decode_assignment, decode_worker_state, encode_assignment, encode_worker_state, Assignment,
    ConnectorTaskId, Revocations, WorkerState,
};

/// Wire name of the eager protocol
pub const PROTOCOL_NAME_EAGER: &str = "default";
/// Wire name of the cooperative protocol without session support
pub const PROTOCOL_NAME_COMPATIBLE: &str = "compatible";
/// Wire name of the cooperative protocol with session support
pub const PROTOCOL_NAME_SESSIONED: &str = "sessioned";

/// The Connect sub-protocol variants this crate understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVariant {
    Eager,
    Compatible,
    Sessioned,
}

impl ProtocolVariant {
    /// True for the incremental cooperative variants, whose payloads carry
    /// revocation data and a scheduled rebalance delay
    pub fn is_cooperative(self) -> bool {
        matches!(self, ProtocolVariant::Compatible | ProtocolVariant::Sessioned)
    }

    /// Name shown to operators. The wire name `default` reads as `eager`,
    /// matching how the protocol behaves rather than how it is spelled.
    pub fn display_name(self) -> &'static str {
        match self {
            ProtocolVariant::Eager => "eager",
            ProtocolVariant::Compatible => PROTOCOL_NAME_COMPATIBLE,
            ProtocolVariant::Sessioned => PROTOCOL_NAME_SESSIONED,
        }
    }
}

/// Classify a wire protocol name.
///
/// Returns `None` for any name outside the Connect set, including the empty
/// string; such traffic belongs to an unrelated application and is forwarded
/// without inspection.
pub fn classify(protocol_name: &str) -> Option<ProtocolVariant> {
    match protocol_name {
        PROTOCOL_NAME_EAGER => Some(ProtocolVariant::Eager),
        PROTOCOL_NAME_COMPATIBLE => Some(ProtocolVariant::Compatible),
        PROTOCOL_NAME_SESSIONED => Some(ProtocolVariant::Sessioned),
        _ => None,
    }
}

/// Operator-facing spelling of a wire protocol name: `default` reads as
/// `eager`, every other name passes through unchanged.
pub fn display_protocol_name(protocol_name: &str) -> &str {
    match classify(protocol_name) {
        Some(variant) => variant.display_name(),
        None => protocol_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_names() {
        assert_eq!(classify("default"), Some(ProtocolVariant::Eager));
        assert_eq!(classify("sessioned"), Some(ProtocolVariant::Sessioned));
        assert_eq!(classify("compatible"), Some(ProtocolVariant::Compatible));
    }

    #[test]
    fn test_classify_unknown_names() {
        assert_eq!(classify(""), None);
        assert_eq!(classify("mqtt"), None);
        assert_eq!(classify("consumer"), None);
        // Only the exact literal maps to eager
        assert_eq!(classify("Default"), None);
        assert_eq!(classify("eager"), None);
    }

    #[test]
    fn test_cooperative_split() {
        assert!(!ProtocolVariant::Eager.is_cooperative());
        assert!(ProtocolVariant::Compatible.is_cooperative());
        assert!(ProtocolVariant::Sessioned.is_cooperative());
    }

    #[test]
    fn test_display_name_substitution() {
        assert_eq!(display_protocol_name("default"), "eager");
        assert_eq!(display_protocol_name("sessioned"), "sessioned");
        assert_eq!(display_protocol_name("compatible"), "compatible");
        assert_eq!(display_protocol_name("mqtt"), "mqtt");
    }
}
