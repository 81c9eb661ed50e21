//! Tests for HandshakeController

use super::*;
use crate::adapters::{
    content_hash, InMemoryResourceStore, LoopbackChannel, SharedContent, StaticTransferPolicy,
};
use crate::domain::{HandshakeErrorKind, LocalResult, RemoteResult};
use std::time::Duration;
use tempfile::TempDir;

type Controller = HandshakeController<InMemoryResourceStore, LoopbackChannel, StaticTransferPolicy>;

const LABEL: &str = "nonce";

/// One side of a session, with every collaborator exposed for inspection.
struct Node {
    controller: Controller,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    store: Arc<InMemoryResourceStore>,
    session: Arc<LoopbackChannel>,
    policy: Arc<StaticTransferPolicy>,
    registry: Arc<HandshakeRegistry>,
    _dir: TempDir,
}

impl Node {
    /// Node whose controller talks to `peer`.
    fn new(peer: &str, config: HandshakeConfig) -> Self {
        Self::build(peer, config, None)
    }

    /// Node sharing the resource network of `other`.
    fn facing(peer: &str, config: HandshakeConfig, other: &Node) -> Self {
        Self::build(peer, config, Some(other.store.content()))
    }

    fn build(peer: &str, config: HandshakeConfig, content: Option<SharedContent>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(match content {
            Some(content) => InMemoryResourceStore::with_content(dir.path(), content),
            None => InMemoryResourceStore::new(dir.path()),
        });
        let session = Arc::new(LoopbackChannel::recording());
        let policy = Arc::new(StaticTransferPolicy::new());
        let registry = Arc::new(HandshakeRegistry::new());

        let (controller, events) = HandshakeController::new(
            PeerId::new(peer),
            config,
            Arc::clone(&registry),
            Arc::clone(&store),
            Arc::clone(&session),
            Arc::clone(&policy),
        );

        Self {
            controller,
            events,
            store,
            session,
            policy,
            registry,
            _dir: dir,
        }
    }

    /// Apply the next completion from a spawned task.
    async fn pump(&mut self) {
        let event = tokio::time::timeout(Duration::from_secs(10), self.events.recv())
            .await
            .expect("no completion arrived")
            .expect("event channel closed");
        self.controller.on_event(event);
    }

    async fn pump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.pump().await;
        }
    }

    fn record(&self) -> Option<ResourceHandshake> {
        self.registry.get(self.controller.peer())
    }

    fn blocked(&self) -> bool {
        self.registry.is_blocked(self.controller.peer())
    }

    fn unusable_kinds(&self) -> Vec<HandshakeErrorKind> {
        self.policy
            .unusable_sessions()
            .into_iter()
            .map(|(_, kind)| kind)
            .collect()
    }
}

/// Hand everything `from` has sent to `to`.
fn deliver(from: &Node, to: &mut Node) -> Vec<MessageOutcome> {
    from.session
        .take_sent()
        .into_iter()
        .map(|message| to.controller.handle_message(message))
        .collect()
}

fn request(task_id: &str) -> TaskRequest {
    TaskRequest {
        node_name: "requester".to_string(),
        task_id: task_id.to_string(),
        perf_index: 1200.0,
        price: 10,
        max_resource_size: 1 << 30,
        max_memory_size: 1 << 31,
        num_cores: 4,
    }
}

fn count_task_requests(messages: &[HandshakeMessage]) -> usize {
    messages
        .iter()
        .filter(|message| matches!(message, HandshakeMessage::WantToComputeTask(_)))
        .count()
}

/// Run a complete exchange where `a` requests task `t-1` from `b`.
async fn handshaken_pair(config: HandshakeConfig) -> (Node, Node) {
    let mut a = Node::new("node-b", config.clone());
    let mut b = Node::facing("node-a", config, &a);

    assert_eq!(
        a.controller.request_task(request("t-1")),
        Ok(RequestOutcome::Deferred)
    );
    exchange(&mut a, &mut b).await;

    (a, b)
}

/// Drive both handshakes to completion once `a` has started its own.
async fn exchange(a: &mut Node, b: &mut Node) {
    // A's nonce uploaded, Start sent
    a.pump().await;
    // B starts its own handshake and fetches A's nonce
    deliver(a, b);
    b.pump_n(2).await;
    // A answers B's echo and fetches B's nonce
    deliver(b, a);
    a.pump().await;
    // B receives A's verdict and A's echo
    deliver(a, b);
    // A receives B's verdict
    deliver(b, a);
}

// =============================================================================
// REQUEST TASK
// =============================================================================

#[tokio::test]
async fn test_request_to_unknown_peer_defers_and_starts() {
    let mut a = Node::new("node-b", HandshakeConfig::for_testing());

    let outcome = a.controller.request_task(request("t-1")).unwrap();
    assert_eq!(outcome, RequestOutcome::Deferred);
    assert_eq!(a.controller.stage(), HandshakeStage::Started);
    assert!(a.controller.timer_armed());
    assert!(a.session.sent().is_empty());

    let record = a.record().unwrap();
    assert!(record.started());
    assert_eq!(record.pending_requests().to_vec(), vec![request("t-1")]);
    let nonce = record.nonce().clone();

    a.pump().await;

    assert_eq!(
        a.session.sent(),
        vec![HandshakeMessage::ResourceHandshakeStart {
            content_hash: content_hash(nonce.as_str().as_bytes()),
        }]
    );
    assert_eq!(a.controller.stage(), HandshakeStage::AwaitingPeerNonce);
    // Temp file is gone once uploaded
    assert!(a.record().unwrap().temp_file().is_none());
    assert!(a.store.scratch_files(LABEL).is_empty());
}

#[tokio::test]
async fn test_existing_record_fast_paths_request() {
    let mut a = Node::new("node-b", HandshakeConfig::for_testing());
    a.controller.request_task(request("t-1")).unwrap();

    // Handshake still pending, but a record exists
    let outcome = a.controller.request_task(request("t-2")).unwrap();
    assert_eq!(outcome, RequestOutcome::Sent);
    assert_eq!(
        a.session.sent(),
        vec![HandshakeMessage::WantToComputeTask(request("t-2"))]
    );
    assert_eq!(a.registry.len(), 1);
}

#[tokio::test]
async fn test_strict_fast_path_defers_until_success() {
    let config = HandshakeConfig {
        require_success_for_fast_path: true,
        ..HandshakeConfig::for_testing()
    };
    let mut a = Node::new("node-b", config);
    a.controller.request_task(request("t-1")).unwrap();

    let outcome = a.controller.request_task(request("t-2")).unwrap();
    assert_eq!(outcome, RequestOutcome::Deferred);
    assert!(a.session.sent().is_empty());
    assert_eq!(
        a.record().unwrap().pending_requests().to_vec(),
        vec![request("t-1"), request("t-2")]
    );
}

#[tokio::test]
async fn test_strict_fast_path_releases_every_deferred_request() {
    let config = HandshakeConfig {
        require_success_for_fast_path: true,
        ..HandshakeConfig::for_testing()
    };
    let mut a = Node::new("node-b", config.clone());
    let mut b = Node::facing("node-a", config, &a);

    a.controller.request_task(request("t-1")).unwrap();
    a.controller.request_task(request("t-2")).unwrap();
    exchange(&mut a, &mut b).await;

    assert_eq!(a.controller.stage(), HandshakeStage::Succeeded);
    assert_eq!(
        a.session.sent(),
        vec![
            HandshakeMessage::WantToComputeTask(request("t-1")),
            HandshakeMessage::WantToComputeTask(request("t-2")),
        ]
    );
    assert!(a.record().unwrap().pending_requests().is_empty());
}

#[tokio::test]
async fn test_blocked_peer_request_fails_without_sending() {
    let mut a = Node::new("node-b", HandshakeConfig::for_testing());
    a.registry.block_peer(&PeerId::new("node-b"));

    let result = a.controller.request_task(request("t-1"));
    assert_eq!(result, Err(HandshakeError::PeerBlocked));
    assert!(a.session.sent().is_empty());
    assert!(a.registry.is_empty());
    assert_eq!(
        a.session.disconnects(),
        vec![DisconnectReason::ResourceHandshakeTimeout]
    );
    assert_eq!(a.unusable_kinds(), vec![HandshakeErrorKind::PeerBlocked]);
}

#[tokio::test]
async fn test_empty_peer_identifier_rejected() {
    let mut a = Node::new("", HandshakeConfig::for_testing());

    let result = a.controller.request_task(request("t-1"));
    assert_eq!(result, Err(HandshakeError::EmptyPeerIdentifier));
    assert!(a.registry.is_empty());
    assert!(a.controller.is_closed());
}

// =============================================================================
// FULL EXCHANGE
// =============================================================================

#[tokio::test]
async fn test_full_exchange_releases_deferred_request_once() {
    let (mut a, mut b) = handshaken_pair(HandshakeConfig::for_testing()).await;

    assert_eq!(a.controller.stage(), HandshakeStage::Succeeded);
    assert_eq!(b.controller.stage(), HandshakeStage::Succeeded);
    assert_eq!(
        a.session.sent(),
        vec![HandshakeMessage::WantToComputeTask(request("t-1"))]
    );

    // A duplicate verdict finalizes again but has nothing left to release
    let nonce = b.record().unwrap().nonce().clone();
    a.controller
        .handle_message(HandshakeMessage::ResourceHandshakeVerdict {
            nonce,
            accepted: true,
        });
    assert_eq!(count_task_requests(&a.session.sent()), 1);

    let outcomes = deliver(&a, &mut b);
    assert_eq!(outcomes, vec![MessageOutcome::TaskRequest(request("t-1"))]);
}

#[tokio::test]
async fn test_deferred_request_waits_for_both_directions() {
    let mut a = Node::new("node-b", HandshakeConfig::for_testing());
    let mut b = Node::facing("node-a", HandshakeConfig::for_testing(), &a);

    a.controller.request_task(request("t-1")).unwrap();
    a.pump().await;
    deliver(&a, &mut b);
    b.pump_n(2).await;

    // A accepts B's echo of its nonce and answers B's Start
    deliver(&b, &mut a);
    a.pump().await;

    let record = a.record().unwrap();
    assert_eq!(record.local_result(), LocalResult::Matched);
    assert_eq!(record.remote_result(), RemoteResult::Unknown);
    assert!(!record.finished());
    assert!(a
        .session
        .sent()
        .iter()
        .any(|message| matches!(
            message,
            HandshakeMessage::ResourceHandshakeVerdict { accepted: true, .. }
        )));
    assert_eq!(count_task_requests(&a.session.sent()), 0);

    // B finishes first but has nothing deferred
    deliver(&a, &mut b);
    assert_eq!(b.controller.stage(), HandshakeStage::Succeeded);
    assert_eq!(count_task_requests(&b.session.sent()), 0);

    // B's verdict completes A's direction and releases the request
    deliver(&b, &mut a);
    assert_eq!(a.controller.stage(), HandshakeStage::Succeeded);
    assert_eq!(
        a.session.sent(),
        vec![HandshakeMessage::WantToComputeTask(request("t-1"))]
    );
}

#[tokio::test]
async fn test_success_cancels_timer_and_ignores_late_fire() {
    let (mut a, b) = handshaken_pair(HandshakeConfig::for_testing()).await;
    assert!(!a.controller.timer_armed());
    assert!(!b.controller.timer_armed());

    let nonce = a.record().unwrap().nonce().clone();
    a.controller.on_event(SessionEvent::TimerFired { nonce });

    assert!(!a.blocked());
    assert!(!a.controller.is_closed());
}

#[tokio::test]
async fn test_exchange_cleans_up_all_files() {
    let (a, b) = handshaken_pair(HandshakeConfig::for_testing()).await;

    for node in [&a, &b] {
        assert!(node.store.scratch_files(LABEL).is_empty());
        assert!(node.store.downloaded_files(LABEL).is_empty());
    }
}

#[tokio::test]
async fn test_request_after_success_is_sent_directly() {
    let config = HandshakeConfig {
        require_success_for_fast_path: true,
        ..HandshakeConfig::for_testing()
    };
    let (mut a, _b) = handshaken_pair(config).await;
    a.session.take_sent();

    let outcome = a.controller.request_task(request("t-2")).unwrap();
    assert_eq!(outcome, RequestOutcome::Sent);
    assert_eq!(
        a.session.sent(),
        vec![HandshakeMessage::WantToComputeTask(request("t-2"))]
    );
}

#[tokio::test]
async fn test_start_after_success_resends_own_hash() {
    let (mut a, _b) = handshaken_pair(HandshakeConfig::for_testing()).await;
    a.session.take_sent();
    let own_hash = a.record().unwrap().content_hash().cloned().unwrap();

    // Peer restarted and begins again
    let fresh = a.store.insert("fresh-nonce");
    a.controller
        .handle_message(HandshakeMessage::ResourceHandshakeStart { content_hash: fresh });
    a.pump().await;

    assert_eq!(
        a.session.sent(),
        vec![
            HandshakeMessage::ResourceHandshakeStart {
                content_hash: own_hash,
            },
            HandshakeMessage::ResourceHandshakeNonce {
                nonce: Nonce::new("fresh-nonce"),
            },
        ]
    );
    assert_eq!(a.store.download_count(), 2);
}

// =============================================================================
// INCOMING MESSAGES
// =============================================================================

#[tokio::test]
async fn test_start_from_unknown_peer_starts_symmetrically() {
    let mut b = Node::new("node-a", HandshakeConfig::for_testing());
    let hash = b.store.insert("peer-nonce\n");

    let outcome = b
        .controller
        .handle_message(HandshakeMessage::ResourceHandshakeStart { content_hash: hash });
    assert_eq!(outcome, MessageOutcome::Handled);

    let record = b.record().unwrap();
    assert!(record.pending_requests().is_empty());
    assert!(b.controller.timer_armed());

    b.pump_n(2).await;

    let sent = b.session.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.contains(&HandshakeMessage::ResourceHandshakeNonce {
        nonce: Nonce::new("peer-nonce"),
    }));
    assert!(sent
        .iter()
        .any(|message| matches!(message, HandshakeMessage::ResourceHandshakeStart { .. })));
    assert!(b.store.downloaded_files(LABEL).is_empty());
}

#[tokio::test]
async fn test_start_from_blocked_peer_errors() {
    let mut b = Node::new("node-a", HandshakeConfig::for_testing());
    b.registry.block_peer(&PeerId::new("node-a"));

    let outcome = b
        .controller
        .handle_message(HandshakeMessage::ResourceHandshakeStart {
            content_hash: ContentHash::new("h"),
        });

    assert_eq!(outcome, MessageOutcome::Closed);
    assert_eq!(b.store.download_count(), 0);
    assert_eq!(b.unusable_kinds(), vec![HandshakeErrorKind::PeerBlocked]);
}

#[tokio::test]
async fn test_nonce_mismatch_blocks_peer() {
    let mut a = Node::new("node-b", HandshakeConfig::for_testing());
    a.controller.request_task(request("t-1")).unwrap();
    a.pump().await;
    a.session.take_sent();

    let outcome = a
        .controller
        .handle_message(HandshakeMessage::ResourceHandshakeNonce {
            nonce: Nonce::new("forged"),
        });

    assert_eq!(outcome, MessageOutcome::Closed);
    assert_eq!(
        a.session.sent(),
        vec![HandshakeMessage::ResourceHandshakeVerdict {
            nonce: Nonce::new("forged"),
            accepted: false,
        }]
    );
    assert!(a.blocked());
    assert!(a.record().is_none());
    assert!(a.registry.invariant_violations().is_empty());
    assert_eq!(a.unusable_kinds(), vec![HandshakeErrorKind::NonceMismatch]);
    assert_eq!(
        a.session.disconnects(),
        vec![DisconnectReason::ResourceHandshakeTimeout]
    );
}

#[tokio::test]
async fn test_nonce_without_record_is_mismatch() {
    let mut a = Node::new("node-b", HandshakeConfig::for_testing());

    a.controller
        .handle_message(HandshakeMessage::ResourceHandshakeNonce {
            nonce: Nonce::new("n"),
        });

    assert_eq!(
        a.session.sent(),
        vec![HandshakeMessage::ResourceHandshakeVerdict {
            nonce: Nonce::new("n"),
            accepted: false,
        }]
    );
    assert!(a.blocked());
}

#[tokio::test]
async fn test_unsolicited_verdict_disconnects() {
    let mut a = Node::new("node-b", HandshakeConfig::for_testing());

    let outcome = a
        .controller
        .handle_message(HandshakeMessage::ResourceHandshakeVerdict {
            nonce: Nonce::new("n"),
            accepted: true,
        });

    assert_eq!(outcome, MessageOutcome::Closed);
    assert!(a.blocked());
    assert_eq!(a.unusable_kinds(), vec![HandshakeErrorKind::UnsolicitedVerdict]);
    assert_eq!(
        a.session.disconnects(),
        vec![DisconnectReason::ResourceHandshakeTimeout]
    );
}

#[tokio::test]
async fn test_rejecting_verdict_finishes_without_success() {
    let mut a = Node::new("node-b", HandshakeConfig::for_testing());
    a.controller.request_task(request("t-1")).unwrap();
    let nonce = a.record().unwrap().nonce().clone();

    a.controller
        .handle_message(HandshakeMessage::ResourceHandshakeNonce { nonce });
    a.controller
        .handle_message(HandshakeMessage::ResourceHandshakeVerdict {
            nonce: Nonce::new("theirs"),
            accepted: false,
        });

    assert_eq!(a.controller.stage(), HandshakeStage::Failed);
    assert_eq!(count_task_requests(&a.session.sent()), 0);
    // Pending request stays parked; the timer settles the peer
    assert!(a.controller.timer_armed());
}

#[tokio::test]
async fn test_inbound_task_request_gated_on_success() {
    let mut b = Node::new("node-a", HandshakeConfig::for_testing());
    let outcome = b
        .controller
        .handle_message(HandshakeMessage::WantToComputeTask(request("t-1")));
    assert_eq!(outcome, MessageOutcome::Dropped);

    let open = HandshakeConfig {
        gate_inbound_requests: false,
        ..HandshakeConfig::for_testing()
    };
    let mut b = Node::new("node-a", open);
    let outcome = b
        .controller
        .handle_message(HandshakeMessage::WantToComputeTask(request("t-1")));
    assert_eq!(outcome, MessageOutcome::TaskRequest(request("t-1")));
}

#[tokio::test]
async fn test_disconnect_message_closes_without_blocking() {
    let mut a = Node::new("node-b", HandshakeConfig::for_testing());
    a.controller.request_task(request("t-1")).unwrap();

    let outcome = a
        .controller
        .handle_message(HandshakeMessage::Disconnect {
            reason: DisconnectReason::Shutdown,
        });

    assert_eq!(outcome, MessageOutcome::Closed);
    assert!(a.controller.is_closed());
    assert!(!a.controller.timer_armed());
    assert!(!a.blocked());

    // Later messages are ignored
    let outcome = a
        .controller
        .handle_message(HandshakeMessage::ResourceHandshakeVerdict {
            nonce: Nonce::new("n"),
            accepted: true,
        });
    assert_eq!(outcome, MessageOutcome::Closed);
    assert!(!a.blocked());
}

#[tokio::test]
async fn test_local_close_sends_shutdown() {
    let mut a = Node::new("node-b", HandshakeConfig::for_testing());
    a.controller.close();
    a.controller.close();

    assert!(a.controller.is_closed());
    assert_eq!(a.session.disconnects(), vec![DisconnectReason::Shutdown]);
}

// =============================================================================
// TIMEOUT
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_timeout_blocks_peer() {
    let mut a = Node::new("node-b", HandshakeConfig::for_testing());
    a.controller.request_task(request("t-1")).unwrap();

    while !a.controller.is_closed() {
        a.pump().await;
    }

    assert!(a.blocked());
    assert!(a.record().is_none());
    assert_eq!(a.unusable_kinds(), vec![HandshakeErrorKind::Timeout]);
    assert_eq!(count_task_requests(&a.session.sent()), 0);
}

#[tokio::test]
async fn test_stale_timer_is_ignored() {
    let mut a = Node::new("node-b", HandshakeConfig::for_testing());
    a.controller.request_task(request("t-1")).unwrap();

    a.controller.on_event(SessionEvent::TimerFired {
        nonce: Nonce::new("previous-record"),
    });

    assert!(!a.blocked());
    assert!(a.record().is_some());
}

// =============================================================================
// RESOURCE FAILURES AND STALE COMPLETIONS
// =============================================================================

#[tokio::test]
async fn test_upload_failure_blocks_peer_and_removes_temp_file() {
    let mut a = Node::new("node-b", HandshakeConfig::for_testing());
    a.store.set_fail_uploads(true);
    a.controller.request_task(request("t-1")).unwrap();

    a.pump().await;

    assert!(a.blocked());
    assert!(a.session.sent().is_empty());
    assert_eq!(a.unusable_kinds(), vec![HandshakeErrorKind::UploadFailure]);
    assert!(a.store.scratch_files(LABEL).is_empty());
}

#[tokio::test]
async fn test_download_failure_blocks_peer() {
    let mut b = Node::new("node-a", HandshakeConfig::for_testing());

    b.controller
        .handle_message(HandshakeMessage::ResourceHandshakeStart {
            content_hash: ContentHash::new("unknown"),
        });

    while !b.controller.is_closed() {
        b.pump().await;
    }

    assert!(b.blocked());
    assert_eq!(b.unusable_kinds(), vec![HandshakeErrorKind::DownloadFailure]);
    assert!(!b
        .session
        .sent()
        .iter()
        .any(|message| matches!(message, HandshakeMessage::ResourceHandshakeNonce { .. })));
}

#[tokio::test]
async fn test_scratch_dir_failure_is_start_failure() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the scratch directory should be
    let root = dir.path().join("not-a-dir");
    std::fs::write(&root, "x").unwrap();

    let registry = Arc::new(HandshakeRegistry::new());
    let session = Arc::new(LoopbackChannel::recording());
    let policy = Arc::new(StaticTransferPolicy::new());
    let (mut controller, _events) = HandshakeController::new(
        PeerId::new("node-b"),
        HandshakeConfig::for_testing(),
        Arc::clone(&registry),
        Arc::new(InMemoryResourceStore::new(root)),
        Arc::clone(&session),
        Arc::clone(&policy),
    );

    let result = controller.request_task(request("t-1"));
    assert_eq!(
        result.map_err(|err| err.kind()),
        Err(HandshakeErrorKind::HandshakeStartIoFailure)
    );
    assert!(registry.is_blocked(&PeerId::new("node-b")));
    assert!(!controller.timer_armed());
}

#[tokio::test]
async fn test_stale_upload_completion_is_ignored() {
    let mut a = Node::new("node-b", HandshakeConfig::for_testing());
    a.controller.request_task(request("t-1")).unwrap();

    let scratch = a.store.scratch_dir(LABEL).unwrap();
    let leftover = scratch.join("previous-record");
    std::fs::write(&leftover, "previous-record").unwrap();

    a.controller.on_event(SessionEvent::NonceShared {
        nonce: Nonce::new("previous-record"),
        file: leftover.clone(),
        result: Ok(ContentHash::new("h")),
    });
    assert!(!leftover.exists());

    a.controller.on_event(SessionEvent::NonceShared {
        nonce: Nonce::new("previous-record"),
        file: leftover,
        result: Err(ResourceError::Rejected("late".to_string())),
    });

    assert!(a.session.sent().is_empty());
    assert!(!a.blocked());
    assert!(a.record().unwrap().content_hash().is_none());
}

#[tokio::test]
async fn test_upload_finishing_after_session_drop_removes_nonce_file() {
    let mut a = Node::new("node-b", HandshakeConfig::for_testing());
    a.controller.request_task(request("t-1")).unwrap();
    assert_eq!(a.store.scratch_files(LABEL).len(), 1);

    let Node {
        controller,
        events,
        store,
        _dir,
        ..
    } = a;
    drop(controller);
    drop(events);

    tokio::time::timeout(Duration::from_secs(10), async {
        while !store.scratch_files(LABEL).is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("nonce file was not removed");
    assert_eq!(store.upload_count(), 1);
}

#[tokio::test]
async fn test_stale_download_completion_is_ignored() {
    let mut a = Node::new("node-b", HandshakeConfig::for_testing());
    a.controller.request_task(request("t-1")).unwrap();

    a.controller.on_event(SessionEvent::NonceDownloaded {
        nonce: Nonce::new("previous-record"),
        result: Ok(Nonce::new("x")),
    });

    assert!(a.session.sent().is_empty());
}

// =============================================================================
// QUERIES
// =============================================================================

#[tokio::test]
async fn test_handshake_in_progress() {
    let mut a = Node::new("node-b", HandshakeConfig::for_testing());
    assert_eq!(a.controller.handshake_in_progress(), Ok(false));

    a.controller.request_task(request("t-1")).unwrap();
    assert_eq!(a.controller.handshake_in_progress(), Ok(true));

    let mut anonymous = Node::new("", HandshakeConfig::for_testing());
    assert_eq!(
        anonymous.controller.handshake_in_progress(),
        Err(HandshakeError::EmptyPeerIdentifier)
    );
}

#[tokio::test]
async fn test_handshake_not_in_progress_after_success() {
    let (mut a, _b) = handshaken_pair(HandshakeConfig::for_testing()).await;
    assert_eq!(a.controller.handshake_in_progress(), Ok(false));
}
