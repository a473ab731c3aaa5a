//! Rebalance Interception
//!
//! One stateless handler per (message kind, direction) pair, eight in all,
//! mirroring the group-coordination surface a Connect worker touches during
//! a rebalance. Each handler decides whether the message is Connect traffic,
//! renders a diagnostic block when it is, and forwards the original message
//! unchanged through the host [`FilterContext`] - emission is a side effect
//! with zero influence on the traffic itself.
//!
//! Decoding and rendering happen synchronously before the forward call, so a
//! decode failure can never race with forwarding; the handler's only await
//! is the host's own forwarding future. A payload that fails to decode
//! degrades to a decode-failure line inside the block, and the message is
//! forwarded regardless.
//!
//! Handlers hold no mutable state and may be invoked concurrently across
//! connections.

use crate::config::FilterConfig;
use crate::connect::{classify, decode_assignment, decode_worker_state};
use crate::protocol::messages::*;
use crate::protocol::{ErrorCode, CONNECT_GROUP_KEY};
use crate::render::{Colour, DiagnosticSink, Renderer};
use crate::Result;
use std::sync::Arc;
use tracing::warn;

/// Forwarding capability supplied by the hosting proxy.
///
/// The context owns the outer wire protocol; the filter only ever hands the
/// original message back. Forwarding may be asynchronous on the host side,
/// which is why these methods are async - the filter returns the host's
/// future without adding suspension of its own.
pub trait FilterContext {
    fn forward_request(
        &mut self,
        header: RequestHeader,
        request: GroupRequest,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn forward_response(
        &mut self,
        header: ResponseHeader,
        response: GroupResponse,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// The rebalance observer.
///
/// Construct once per proxy with an injected sink and route every
/// intercepted group-coordination message through [`on_request`] /
/// [`on_response`], or call the named per-message handlers directly.
///
/// [`on_request`]: RebalanceFilter::on_request
/// [`on_response`]: RebalanceFilter::on_response
pub struct RebalanceFilter {
    enabled: bool,
    renderer: Renderer,
    sink: Arc<dyn DiagnosticSink>,
}

impl RebalanceFilter {
    pub fn new(config: FilterConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            enabled: config.enabled,
            renderer: Renderer::new(config.colour),
            sink,
        }
    }

    /// Dispatch a request to its per-message-kind handler
    pub async fn on_request<C: FilterContext>(
        &self,
        header: RequestHeader,
        request: GroupRequest,
        ctx: &mut C,
    ) -> Result<()> {
        match request {
            GroupRequest::Heartbeat(request) => {
                self.on_heartbeat_request(header, request, ctx).await
            }
            GroupRequest::FindCoordinator(request) => {
                self.on_find_coordinator_request(header, request, ctx).await
            }
            GroupRequest::JoinGroup(request) => {
                self.on_join_group_request(header, request, ctx).await
            }
            GroupRequest::SyncGroup(request) => {
                self.on_sync_group_request(header, request, ctx).await
            }
        }
    }

    /// Dispatch a response to its per-message-kind handler
    pub async fn on_response<C: FilterContext>(
        &self,
        header: ResponseHeader,
        response: GroupResponse,
        ctx: &mut C,
    ) -> Result<()> {
        match response {
            GroupResponse::Heartbeat(response) => {
                self.on_heartbeat_response(header, response, ctx).await
            }
            GroupResponse::FindCoordinator(response) => {
                self.on_find_coordinator_response(header, response, ctx).await
            }
            GroupResponse::JoinGroup(response) => {
                self.on_join_group_response(header, response, ctx).await
            }
            GroupResponse::SyncGroup(response) => {
                self.on_sync_group_response(header, response, ctx).await
            }
        }
    }

    //////////////////////////////////////////////////
    // Heartbeat
    //////////////////////////////////////////////////

    /// Heartbeats carry no Connect payload; the request side is a pure
    /// pass-through kept for surface completeness
    pub async fn on_heartbeat_request<C: FilterContext>(
        &self,
        header: RequestHeader,
        request: HeartbeatRequest,
        ctx: &mut C,
    ) -> Result<()> {
        ctx.forward_request(header, GroupRequest::Heartbeat(request))
            .await
    }

    /// Emits only when the coordinator signalled a liveness problem
    pub async fn on_heartbeat_response<C: FilterContext>(
        &self,
        header: ResponseHeader,
        response: HeartbeatResponse,
        ctx: &mut C,
    ) -> Result<()> {
        if self.enabled && response.error_code != 0 {
            let name = ErrorCode::from_code(response.error_code).name();
            self.emit(
                Colour::Red,
                "<= Heartbeat",
                vec![self.renderer.highlight("error_code", name)],
            );
        }
        ctx.forward_response(header, GroupResponse::Heartbeat(response))
            .await
    }

    //////////////////////////////////////////////////
    // FindCoordinator
    //////////////////////////////////////////////////

    /// Emits when the worker is asking for the Connect cluster coordinator
    pub async fn on_find_coordinator_request<C: FilterContext>(
        &self,
        header: RequestHeader,
        request: FindCoordinatorRequest,
        ctx: &mut C,
    ) -> Result<()> {
        if self.enabled
            && request
                .coordinator_keys
                .iter()
                .any(|key| key == CONNECT_GROUP_KEY)
        {
            self.emit(
                Colour::Purple,
                "=> FindCoordinator",
                vec![
                    self.renderer.field("key_type", request.key_type),
                    self.renderer
                        .field("coordinator_keys", request.coordinator_keys.join(", ")),
                ],
            );
        }
        ctx.forward_request(header, GroupRequest::FindCoordinator(request))
            .await
    }

    /// Emits for the Connect cluster coordinator, if the response names one
    pub async fn on_find_coordinator_response<C: FilterContext>(
        &self,
        header: ResponseHeader,
        response: FindCoordinatorResponse,
        ctx: &mut C,
    ) -> Result<()> {
        if self.enabled {
            if let Some(coordinator) = response
                .coordinators
                .iter()
                .find(|coordinator| coordinator.key == CONNECT_GROUP_KEY)
            {
                self.emit(
                    Colour::Purple,
                    "<= FindCoordinator",
                    vec![
                        self.renderer.field("key", &coordinator.key),
                        self.renderer.field("node_id", coordinator.node_id),
                        self.renderer.highlight("host", &coordinator.host),
                        self.renderer.highlight("port", coordinator.port),
                    ],
                );
            }
        }
        ctx.forward_response(header, GroupResponse::FindCoordinator(response))
            .await
    }

    //////////////////////////////////////////////////
    // JoinGroup
    //////////////////////////////////////////////////

    /// Emits the sub-protocols this member offers, with decoded metadata
    pub async fn on_join_group_request<C: FilterContext>(
        &self,
        header: RequestHeader,
        request: JoinGroupRequest,
        ctx: &mut C,
    ) -> Result<()> {
        if self.enabled && crate::protocol::is_connect_protocol_type(request.protocol_type.as_deref())
        {
            let protocols = request
                .protocols
                .iter()
                .map(|protocol| {
                    nested_entry(
                        crate::connect::display_protocol_name(&protocol.name),
                        &self.metadata_field(Some(&protocol.name), &protocol.metadata),
                    )
                })
                .collect::<Vec<_>>()
                .join(",");
            self.emit(
                Colour::Yellow,
                "=> JoinGroup",
                vec![
                    self.renderer.field("group_id", &request.group_id),
                    self.renderer.highlight("member_id", &request.member_id),
                    self.renderer.field("protocols", format!("[{}]", protocols)),
                ],
            );
        }
        ctx.forward_request(header, GroupRequest::JoinGroup(request))
            .await
    }

    /// Emits the negotiated protocol and every returned member's metadata.
    /// Triggered by protocol-type equality; member-id prefixes are not
    /// trusted to identify worker traffic.
    pub async fn on_join_group_response<C: FilterContext>(
        &self,
        header: ResponseHeader,
        response: JoinGroupResponse,
        ctx: &mut C,
    ) -> Result<()> {
        if self.enabled
            && crate::protocol::is_connect_protocol_type(response.protocol_type.as_deref())
        {
            let members = response
                .members
                .iter()
                .map(|member| {
                    nested_entry(
                        &member.member_id,
                        &self.metadata_field(response.protocol_name.as_deref(), &member.metadata),
                    )
                })
                .collect::<String>();
            self.emit(
                Colour::Yellow,
                "<= JoinGroup",
                vec![
                    self.renderer
                        .highlight("generation_id", response.generation_id),
                    self.renderer
                        .protocol_name_field(response.protocol_name.as_deref()),
                    self.renderer.highlight("leader", &response.leader),
                    self.renderer.highlight("member_id", &response.member_id),
                    self.renderer.field("members", format!("[{}]", members)),
                ],
            );
        }
        ctx.forward_response(header, GroupResponse::JoinGroup(response))
            .await
    }

    //////////////////////////////////////////////////
    // SyncGroup
    //////////////////////////////////////////////////

    /// Emits the leader's proposed per-member assignments
    pub async fn on_sync_group_request<C: FilterContext>(
        &self,
        header: RequestHeader,
        request: SyncGroupRequest,
        ctx: &mut C,
    ) -> Result<()> {
        if self.enabled && crate::protocol::is_connect_protocol_type(request.protocol_type.as_deref())
        {
            let assignments = request
                .assignments
                .iter()
                .map(|assignment| {
                    nested_entry(
                        &assignment.member_id,
                        &self.assignment_field(
                            request.protocol_name.as_deref(),
                            &assignment.assignment,
                        ),
                    )
                })
                .collect::<String>();
            self.emit(
                Colour::Cyan,
                "=> SyncGroup",
                vec![
                    self.renderer.field("group_id", &request.group_id),
                    self.renderer
                        .highlight("generation_id", request.generation_id),
                    self.renderer.field("member_id", &request.member_id),
                    self.renderer
                        .protocol_name_field(request.protocol_name.as_deref()),
                    self.renderer
                        .field("assignments", format!("[{}]", assignments)),
                ],
            );
        }
        ctx.forward_request(header, GroupRequest::SyncGroup(request))
            .await
    }

    /// Emits this member's own decoded assignment
    pub async fn on_sync_group_response<C: FilterContext>(
        &self,
        header: ResponseHeader,
        response: SyncGroupResponse,
        ctx: &mut C,
    ) -> Result<()> {
        if self.enabled
            && crate::protocol::is_connect_protocol_type(response.protocol_type.as_deref())
        {
            let assignment =
                self.assignment_field(response.protocol_name.as_deref(), &response.assignment);
            self.emit(
                Colour::Cyan,
                "<= SyncGroup",
                vec![
                    self.renderer.field("error_code", response.error_code),
                    self.renderer
                        .protocol_name_field(response.protocol_name.as_deref()),
                    self.renderer.paint(Colour::Green, &assignment),
                ],
            );
        }
        ctx.forward_response(header, GroupResponse::SyncGroup(response))
            .await
    }

    //////////////////////////////////////////////////
    // Payload helpers
    //////////////////////////////////////////////////

    /// Render an embedded worker metadata payload. Failures degrade to a
    /// decode-failure line; nothing here can abort forwarding.
    fn metadata_field(&self, protocol_name: Option<&str>, metadata: &[u8]) -> String {
        let Some(name) = protocol_name else {
            return self
                .renderer
                .field("metadata", format!("[{} bytes]", metadata.len()));
        };
        match classify(name) {
            Some(variant) => match decode_worker_state(metadata, variant) {
                Ok(state) => self.renderer.worker_state(&state),
                Err(error) => {
                    warn!(protocol = name, %error, "failed to decode worker metadata");
                    self.renderer.decode_failure("metadata", error)
                }
            },
            None => self
                .renderer
                .unrecognized_protocol("metadata", name, metadata.len()),
        }
    }

    /// Render an embedded assignment payload, same degradation rules
    fn assignment_field(&self, protocol_name: Option<&str>, assignment: &[u8]) -> String {
        if assignment.is_empty() {
            // Followers and errored syncs legitimately carry no assignment
            return self.renderer.field("assignment", "<none>");
        }
        let Some(name) = protocol_name else {
            return self
                .renderer
                .field("assignment", format!("[{} bytes]", assignment.len()));
        };
        match classify(name) {
            Some(variant) => match decode_assignment(assignment, variant) {
                Ok(assignment) => self.renderer.assignment(&assignment),
                Err(error) => {
                    warn!(protocol = name, %error, "failed to decode assignment");
                    self.renderer.decode_failure("assignment", error)
                }
            },
            None => self
                .renderer
                .unrecognized_protocol("assignment", name, assignment.len()),
        }
    }

    fn emit(&self, colour: Colour, name: &str, fields: Vec<String>) {
        self.sink.emit(self.renderer.api_call(colour, name, &fields));
    }
}

/// One indented sub-block entry: a title line (member id or protocol name)
/// with its decoded body beneath it
fn nested_entry(title: &str, body: &str) -> String {
    format!("\n           {}\n               {}", title, body)
}
