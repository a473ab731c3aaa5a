//! Walks a synthetic Connect rebalance round through the filter and prints
//! the diagnostic blocks an operator would see at the proxy.
//!
//! Run with: cargo run --example observe_rebalance

use connectscope::config::FilterConfig;
use connectscope::connect::{
    encode_assignment, encode_worker_state, Assignment, ConnectorTaskId, ProtocolVariant,
    Revocations, WorkerState,
};
use connectscope::filter::{FilterContext, RebalanceFilter};
use connectscope::protocol::messages::*;
use connectscope::render::StdoutSink;
use connectscope::Result;
use std::sync::Arc;
use tracing::info;

/// Stand-in for the proxy's forwarding machinery: counts messages and lets
/// them go
#[derive(Default)]
struct LoggingContext {
    forwarded: usize,
}

impl FilterContext for LoggingContext {
    async fn forward_request(&mut self, _header: RequestHeader, _request: GroupRequest) -> Result<()> {
        self.forwarded += 1;
        Ok(())
    }

    async fn forward_response(
        &mut self,
        _header: ResponseHeader,
        _response: GroupResponse,
    ) -> Result<()> {
        self.forwarded += 1;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = FilterConfig::default();
    let sink = Arc::new(StdoutSink::spawn(config.sink_capacity));
    let filter = RebalanceFilter::new(config, sink);
    let mut ctx = LoggingContext::default();

    let assignment = Assignment {
        error: 0,
        leader: Some("worker-1".to_string()),
        leader_url: "http://worker-1:8083".to_string(),
        config_offset: 42,
        connectors: vec!["orders-sink".to_string()],
        tasks: vec![
            ConnectorTaskId::new("orders-sink", 0),
            ConnectorTaskId::new("orders-sink", 1),
        ],
        revocations: Some(Revocations {
            connectors: vec![],
            tasks: vec![ConnectorTaskId::new("orders-sink", 2)],
            delay_ms: 0,
        }),
    };
    let metadata = encode_worker_state(
        &WorkerState {
            url: "http://worker-1:8083".to_string(),
            assignment: Some(assignment.clone()),
        },
        ProtocolVariant::Sessioned,
    );
    let assignment_bytes = encode_assignment(&assignment, ProtocolVariant::Sessioned);

    let request_header = |api_key, correlation_id| RequestHeader {
        api_key,
        api_version: 5,
        correlation_id,
        client_id: Some("worker-1-client".to_string()),
    };

    filter
        .on_request(
            request_header(10, 1),
            GroupRequest::FindCoordinator(FindCoordinatorRequest {
                key_type: 0,
                coordinator_keys: vec!["connect-cluster".to_string()],
            }),
            &mut ctx,
        )
        .await?;
    filter
        .on_response(
            ResponseHeader { correlation_id: 1 },
            GroupResponse::FindCoordinator(FindCoordinatorResponse {
                coordinators: vec![Coordinator {
                    key: "connect-cluster".to_string(),
                    node_id: 0,
                    host: "broker-0".to_string(),
                    port: 9092,
                    error_code: 0,
                }],
            }),
            &mut ctx,
        )
        .await?;
    filter
        .on_request(
            request_header(11, 2),
            GroupRequest::JoinGroup(JoinGroupRequest {
                group_id: "connect-cluster".to_string(),
                member_id: "worker-1".to_string(),
                protocol_type: Some("connect".to_string()),
                protocols: vec![JoinGroupProtocol {
                    name: "sessioned".to_string(),
                    metadata: metadata.clone(),
                }],
            }),
            &mut ctx,
        )
        .await?;
    filter
        .on_response(
            ResponseHeader { correlation_id: 2 },
            GroupResponse::JoinGroup(JoinGroupResponse {
                error_code: 0,
                generation_id: 9,
                protocol_type: Some("connect".to_string()),
                protocol_name: Some("sessioned".to_string()),
                leader: "worker-1".to_string(),
                member_id: "worker-1".to_string(),
                members: vec![JoinGroupMember {
                    member_id: "worker-1".to_string(),
                    metadata,
                }],
            }),
            &mut ctx,
        )
        .await?;
    filter
        .on_request(
            request_header(14, 3),
            GroupRequest::SyncGroup(SyncGroupRequest {
                group_id: "connect-cluster".to_string(),
                generation_id: 9,
                member_id: "worker-1".to_string(),
                protocol_type: Some("connect".to_string()),
                protocol_name: Some("sessioned".to_string()),
                assignments: vec![SyncGroupAssignment {
                    member_id: "worker-1".to_string(),
                    assignment: assignment_bytes.clone(),
                }],
            }),
            &mut ctx,
        )
        .await?;
    filter
        .on_response(
            ResponseHeader { correlation_id: 3 },
            GroupResponse::SyncGroup(SyncGroupResponse {
                error_code: 0,
                protocol_type: Some("connect".to_string()),
                protocol_name: Some("sessioned".to_string()),
                assignment: assignment_bytes,
            }),
            &mut ctx,
        )
        .await?;

    // Give the stdout sink task a moment to drain
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    info!(forwarded = ctx.forwarded, "rebalance round forwarded");
    Ok(())
}
