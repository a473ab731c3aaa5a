//! Group-Coordination Protocol Surface
//!
//! The generic Kafka group-membership mechanism is shared by every
//! application that coordinates through a broker: consumers, Connect
//! workers, schema registries, stream processors. This module defines the
//! slice of that surface connectscope inspects - four message kinds, both
//! directions - together with the two keys that distinguish Connect traffic
//! from everything else:
//!
//! - the protocol-type literal `connect` on JoinGroup/SyncGroup messages
//! - the coordinator key `connect-cluster` on FindCoordinator messages,
//!   which carry no protocol-type field
//!
//! The outer wire encoding of these messages belongs to the hosting proxy;
//! connectscope receives them already decoded into the shapes in
//! [`messages`] and only ever decodes the opaque byte payloads embedded in
//! them.

pub mod errors;
pub mod messages;

pub use errors::ErrorCode;
pub use messages::*;

/// Group-coordination API keys, matching the Kafka wire protocol
pub const API_KEY_FIND_COORDINATOR: i16 = 10;
pub const API_KEY_JOIN_GROUP: i16 = 11;
pub const API_KEY_HEARTBEAT: i16 = 12;
pub const API_KEY_SYNC_GROUP: i16 = 14;

/// Protocol-type advertised by Connect workers in JoinGroup/SyncGroup
pub const CONNECT_PROTOCOL_TYPE: &str = "connect";

/// Coordinator key used by Connect workers during coordinator discovery
pub const CONNECT_GROUP_KEY: &str = "connect-cluster";

/// True when a coordination message's protocol-type marks it as Connect
/// worker traffic. Absent protocol-type (older message versions) is treated
/// as not-Connect: there is nothing safe to decode without it.
pub fn is_connect_protocol_type(protocol_type: Option<&str>) -> bool {
    protocol_type == Some(CONNECT_PROTOCOL_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_protocol_type_detection() {
        assert!(is_connect_protocol_type(Some("connect")));
        assert!(!is_connect_protocol_type(Some("consumer")));
        assert!(!is_connect_protocol_type(Some("")));
        assert!(!is_connect_protocol_type(None));
    }
}
