//! Group-Coordination Message Structures
//!
//! These structures mirror the Kafka group-coordination message fields the
//! filter inspects. The hosting proxy owns the outer wire codec and hands
//! each message to the filter in this already-decoded form; the `metadata`
//! and `assignment` fields remain opaque bytes until the Connect codec is
//! applied to them.
//!
//! Nullable wire fields (protocol names negotiated only in newer message
//! versions, leader ids not yet elected) are modeled as `Option` rather than
//! sentinel strings; how an absent value is displayed is the renderer's
//! decision alone.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Request header fields shared by all coordination requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestHeader {
    pub api_key: i16,
    pub api_version: i16,
    pub correlation_id: i32,
    pub client_id: Option<String>,
}

/// Response header shared by all coordination responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseHeader {
    pub correlation_id: i32,
}

// ============================================================================
// HEARTBEAT API (ApiKey = 12)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub error_code: i16,
}

// ============================================================================
// FIND COORDINATOR API (ApiKey = 10)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindCoordinatorRequest {
    /// 0 = group coordinator, 1 = transaction coordinator
    pub key_type: i8,
    /// Coordinator keys being resolved; group ids for key_type 0
    pub coordinator_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindCoordinatorResponse {
    pub coordinators: Vec<Coordinator>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coordinator {
    pub key: String,
    pub node_id: i32,
    pub host: String,
    pub port: i32,
    pub error_code: i16,
}

// ============================================================================
// JOIN GROUP API (ApiKey = 11)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinGroupRequest {
    pub group_id: String,
    pub member_id: String,
    pub protocol_type: Option<String>,
    /// Sub-protocols offered by this member, in preference order
    pub protocols: Vec<JoinGroupProtocol>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinGroupProtocol {
    pub name: String,
    pub metadata: Bytes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinGroupResponse {
    pub error_code: i16,
    pub generation_id: i32,
    pub protocol_type: Option<String>,
    pub protocol_name: Option<String>,
    pub leader: String,
    pub member_id: String,
    /// Populated only in the response sent to the group leader
    pub members: Vec<JoinGroupMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinGroupMember {
    pub member_id: String,
    pub metadata: Bytes,
}

// ============================================================================
// SYNC GROUP API (ApiKey = 14)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncGroupRequest {
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
    pub protocol_type: Option<String>,
    pub protocol_name: Option<String>,
    /// Per-member assignments, present only in the leader's request
    pub assignments: Vec<SyncGroupAssignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncGroupAssignment {
    pub member_id: String,
    pub assignment: Bytes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncGroupResponse {
    pub error_code: i16,
    pub protocol_type: Option<String>,
    pub protocol_name: Option<String>,
    pub assignment: Bytes,
}

// ============================================================================
// TAGGED DISPATCH ENUMS
// ============================================================================

/// Coordination requests the filter can intercept, tagged by message kind
#[derive(Debug, Clone)]
pub enum GroupRequest {
    Heartbeat(HeartbeatRequest),
    FindCoordinator(FindCoordinatorRequest),
    JoinGroup(JoinGroupRequest),
    SyncGroup(SyncGroupRequest),
}

/// Coordination responses the filter can intercept, tagged by message kind
#[derive(Debug, Clone)]
pub enum GroupResponse {
    Heartbeat(HeartbeatResponse),
    FindCoordinator(FindCoordinatorResponse),
    JoinGroup(JoinGroupResponse),
    SyncGroup(SyncGroupResponse),
}

impl GroupRequest {
    pub fn api_key(&self) -> i16 {
        match self {
            GroupRequest::Heartbeat(_) => super::API_KEY_HEARTBEAT,
            GroupRequest::FindCoordinator(_) => super::API_KEY_FIND_COORDINATOR,
            GroupRequest::JoinGroup(_) => super::API_KEY_JOIN_GROUP,
            GroupRequest::SyncGroup(_) => super::API_KEY_SYNC_GROUP,
        }
    }
}

impl GroupResponse {
    pub fn api_key(&self) -> i16 {
        match self {
            GroupResponse::Heartbeat(_) => super::API_KEY_HEARTBEAT,
            GroupResponse::FindCoordinator(_) => super::API_KEY_FIND_COORDINATOR,
            GroupResponse::JoinGroup(_) => super::API_KEY_JOIN_GROUP,
            GroupResponse::SyncGroup(_) => super::API_KEY_SYNC_GROUP,
        }
    }
}
