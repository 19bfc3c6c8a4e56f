#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use keep_relay::{RelayPlan, RelayPlanRequest, RelayPlanner, StaticRelaySettings};
use keep_supervisor::{
    ConnectionSupervisor, HealOutcome, HealReason, NodeCredentials, NodeEvent, NodeFactory,
    NodeHandle, NodeReplacement, RepairStep, SigningNode, SupervisorConfig, SupervisorError,
    SupervisorEvent, SupervisorHooks,
};
use parking_lot::Mutex;
use tokio::sync::broadcast;

type CallLog = Arc<Mutex<Vec<String>>>;

#[derive(Clone, Copy)]
enum Ping {
    Answer(bool),
    Error,
    Hang,
}

struct MockNode {
    id: String,
    log: CallLog,
    ping: Mutex<Ping>,
    resubscribe_ok: AtomicBool,
    reconnect_ok: AtomicBool,
    reconnect_hangs: AtomicBool,
    events: broadcast::Sender<NodeEvent>,
}

impl MockNode {
    fn new(id: &str, log: CallLog) -> Arc<Self> {
        let (events, _) = broadcast::channel(32);
        Arc::new(Self {
            id: id.to_string(),
            log,
            ping: Mutex::new(Ping::Answer(true)),
            resubscribe_ok: AtomicBool::new(true),
            reconnect_ok: AtomicBool::new(true),
            reconnect_hangs: AtomicBool::new(false),
            events,
        })
    }

    fn failing(id: &str, log: CallLog) -> Arc<Self> {
        let node = Self::new(id, log);
        node.set_ping(Ping::Answer(false));
        node.resubscribe_ok.store(false, Ordering::SeqCst);
        node.reconnect_ok.store(false, Ordering::SeqCst);
        node
    }

    fn set_ping(&self, ping: Ping) {
        *self.ping.lock() = ping;
    }

    fn record(&self, call: &str) {
        self.log.lock().push(format!("{}:{call}", self.id));
    }
}

#[async_trait]
impl SigningNode for MockNode {
    fn participant_id(&self) -> String {
        self.id.clone()
    }

    async fn ping(&self, _participant: &str) -> keep_supervisor::Result<bool> {
        self.record("ping");
        let ping = *self.ping.lock();
        match ping {
            Ping::Answer(ok) => Ok(ok),
            Ping::Error => Err(SupervisorError::Probe("no pong".into())),
            Ping::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(true)
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: NodeEvent) {
        let _ = self.events.send(event);
    }

    async fn resubscribe(&self) -> keep_supervisor::Result<()> {
        self.record("resubscribe");
        if self.resubscribe_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SupervisorError::Transport("subscription rejected".into()))
        }
    }

    async fn reconnect(&self) -> keep_supervisor::Result<()> {
        self.record("reconnect");
        if self.reconnect_hangs.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(1_000_000)).await;
        }
        if self.reconnect_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SupervisorError::Transport("relays unreachable".into()))
        }
    }
}

struct MockFactory {
    log: CallLog,
    fail: AtomicBool,
    created: Mutex<Vec<Arc<MockNode>>>,
    last_relays: Mutex<Vec<String>>,
    counter: AtomicUsize,
}

impl MockFactory {
    fn new(log: CallLog) -> Arc<Self> {
        Arc::new(Self {
            log,
            fail: AtomicBool::new(false),
            created: Mutex::new(Vec::new()),
            last_relays: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(1),
        })
    }

    fn created(&self, index: usize) -> Arc<MockNode> {
        self.created.lock()[index].clone()
    }
}

#[async_trait]
impl NodeFactory for MockFactory {
    async fn create(
        &self,
        credentials: &NodeCredentials,
        relays: &[String],
    ) -> keep_supervisor::Result<NodeHandle> {
        assert_eq!(credentials.group, "kgroup1test");
        self.log.lock().push("factory:create".into());
        *self.last_relays.lock() = relays.to_vec();
        if self.fail.load(Ordering::SeqCst) {
            return Err(SupervisorError::NodeCreation("share rejected".into()));
        }
        let id = format!("node-{}", self.counter.fetch_add(1, Ordering::SeqCst));
        let node = MockNode::new(&id, self.log.clone());
        self.created.lock().push(node.clone());
        Ok(node)
    }
}

#[derive(Default)]
struct RecordingHooks {
    replacements: Mutex<Vec<(String, String)>>,
    started: Mutex<Vec<HealReason>>,
    finished: Mutex<Vec<HealOutcome>>,
}

impl SupervisorHooks for RecordingHooks {
    fn node_replaced(&self, replacement: &NodeReplacement) {
        self.replacements.lock().push((
            replacement.previous.participant_id(),
            replacement.next.participant_id(),
        ));
    }

    fn heal_started(&self, reason: HealReason) {
        self.started.lock().push(reason);
    }

    fn heal_finished(&self, outcome: HealOutcome) {
        self.finished.lock().push(outcome);
    }
}

struct Harness {
    log: CallLog,
    node: Arc<MockNode>,
    factory: Arc<MockFactory>,
    hooks: Arc<RecordingHooks>,
    plan: RelayPlan,
    supervisor: ConnectionSupervisor,
}

impl Harness {
    fn new(config: SupervisorConfig, failing: bool) -> Self {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let node = if failing {
            MockNode::failing("node-0", log.clone())
        } else {
            MockNode::new("node-0", log.clone())
        };
        let factory = MockFactory::new(log.clone());
        let hooks = Arc::new(RecordingHooks::default());
        let plan = RelayPlanner::new(Arc::new(StaticRelaySettings::new()))
            .compute(
                &RelayPlanRequest::new()
                    .explicit_relays(vec!["wss://relay.example.com".into()])
                    .base_relays(vec!["wss://nos.lol".into()]),
            )
            .unwrap();
        let supervisor = ConnectionSupervisor::builder(
            factory.clone(),
            NodeCredentials::new("kgroup1test", "kshare1test"),
            &plan,
        )
        .config(config)
        .hooks(hooks.clone())
        .build()
        .unwrap();
        Self {
            log,
            node,
            factory,
            hooks,
            plan,
            supervisor,
        }
    }

    fn start(&self) {
        self.supervisor.start(self.node.clone()).unwrap();
    }

    fn calls(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    fn count(&self, call: &str) -> usize {
        self.log.lock().iter().filter(|c| c.ends_with(call)).count()
    }
}

fn drain<T: Clone>(rx: &mut broadcast::Receiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

async fn advance(secs: f64) {
    tokio::time::sleep(Duration::from_secs_f64(secs)).await;
}

#[tokio::test(start_paused = true)]
async fn test_first_heartbeat_runs_immediately() {
    let h = Harness::new(SupervisorConfig::default(), false);
    h.start();
    advance(0.001).await;
    assert_eq!(h.calls(), vec!["node-0:ping"]);
    assert!(h.supervisor.is_running());
    h.supervisor.stop();
}

#[tokio::test(start_paused = true)]
async fn test_heal_ladder_escalates_in_order() {
    let h = Harness::new(SupervisorConfig::default(), true);
    let mut events = h.supervisor.subscribe();
    h.start();

    advance(31.0).await;
    assert_eq!(
        h.calls(),
        vec![
            "node-0:ping",
            "node-0:ping",
            "node-0:resubscribe",
            "node-0:reconnect",
            "factory:create",
        ]
    );
    assert_eq!(
        *h.hooks.replacements.lock(),
        vec![("node-0".to_string(), "node-1".to_string())]
    );
    assert_eq!(
        h.supervisor.current_node().unwrap().participant_id(),
        "node-1"
    );
    assert_eq!(*h.factory.last_relays.lock(), h.plan.relays);
    assert_eq!(h.supervisor.consecutive_failures(), 0);
    assert_eq!(
        *h.hooks.started.lock(),
        vec![HealReason::HeartbeatFailures]
    );
    assert_eq!(
        *h.hooks.finished.lock(),
        vec![HealOutcome::Repaired(RepairStep::Recreate)]
    );
    assert_eq!(
        drain(&mut events),
        vec![
            SupervisorEvent::HealStarted {
                reason: HealReason::HeartbeatFailures
            },
            SupervisorEvent::NodeReplaced,
            SupervisorEvent::Repaired {
                step: RepairStep::Recreate
            },
        ]
    );
    h.supervisor.stop();
}

#[tokio::test(start_paused = true)]
async fn test_resubscribe_success_ends_heal() {
    let h = Harness::new(SupervisorConfig::default(), true);
    h.node.resubscribe_ok.store(true, Ordering::SeqCst);
    h.start();

    advance(31.0).await;
    assert_eq!(
        h.calls(),
        vec!["node-0:ping", "node-0:ping", "node-0:resubscribe"]
    );
    assert_eq!(h.supervisor.consecutive_failures(), 0);
    assert!(h.hooks.replacements.lock().is_empty());
    h.supervisor.stop();
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_success_skips_recreate() {
    let h = Harness::new(SupervisorConfig::default(), true);
    h.node.reconnect_ok.store(true, Ordering::SeqCst);
    h.start();

    advance(31.0).await;
    assert_eq!(h.count("reconnect"), 1);
    assert_eq!(h.count("create"), 0);
    assert_eq!(
        *h.hooks.finished.lock(),
        vec![HealOutcome::Repaired(RepairStep::Reconnect)]
    );
    h.supervisor.stop();
}

#[tokio::test(start_paused = true)]
async fn test_single_failure_does_not_heal() {
    let h = Harness::new(SupervisorConfig::default(), false);
    h.node.set_ping(Ping::Error);
    h.start();

    advance(1.0).await;
    assert_eq!(h.supervisor.consecutive_failures(), 1);
    h.node.set_ping(Ping::Answer(true));

    advance(30.0).await;
    assert_eq!(h.supervisor.consecutive_failures(), 0);
    assert_eq!(h.count("resubscribe"), 0);
    h.supervisor.stop();
}

#[tokio::test(start_paused = true)]
async fn test_stale_connection_heals_despite_successful_probes() {
    let config = SupervisorConfig::default()
        .with_heartbeat_interval(Duration::from_secs(30))
        .with_stale_after(Duration::from_secs(20));
    let h = Harness::new(config, false);
    let mut events = h.supervisor.subscribe();
    h.start();

    advance(31.0).await;
    assert_eq!(
        h.calls(),
        vec!["node-0:ping", "node-0:ping", "node-0:resubscribe"]
    );
    assert_eq!(*h.hooks.started.lock(), vec![HealReason::Inactivity]);
    assert_eq!(
        drain(&mut events)[0],
        SupervisorEvent::HealStarted {
            reason: HealReason::Inactivity
        }
    );
    h.supervisor.stop();
}

#[tokio::test(start_paused = true)]
async fn test_message_activity_prevents_stale_heal() {
    let config = SupervisorConfig::default()
        .with_heartbeat_interval(Duration::from_secs(30))
        .with_stale_after(Duration::from_secs(20));
    let h = Harness::new(config, false);
    h.start();

    advance(25.0).await;
    h.node.emit(NodeEvent::Message);

    advance(6.0).await;
    assert_eq!(h.count("ping"), 2);
    assert_eq!(h.count("resubscribe"), 0);
    assert!(h.hooks.started.lock().is_empty());
    h.supervisor.stop();
}

#[tokio::test(start_paused = true)]
async fn test_probe_timeout_counts_as_failure() {
    let h = Harness::new(SupervisorConfig::default(), false);
    h.node.set_ping(Ping::Hang);
    h.start();

    advance(9.0).await;
    assert_eq!(h.supervisor.consecutive_failures(), 0);

    advance(2.0).await;
    assert_eq!(h.supervisor.consecutive_failures(), 1);

    // second probe starts at 40s and times out at 50s
    advance(40.0).await;
    assert_eq!(h.count("resubscribe"), 1);
    assert_eq!(h.supervisor.consecutive_failures(), 0);
    h.supervisor.stop();
}

#[tokio::test(start_paused = true)]
async fn test_transport_close_bridged_exactly_once() {
    let h = Harness::new(SupervisorConfig::default(), false);
    h.start();
    let mut node_events = h.node.subscribe();

    h.node.emit(NodeEvent::TransportClosed {
        reason: Some("relay went away".into()),
    });
    advance(0.001).await;

    let events = drain(&mut node_events);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, NodeEvent::Closed))
            .count(),
        1
    );
    assert_eq!(events.last(), Some(&NodeEvent::Closed));
    h.supervisor.stop();
}

#[tokio::test(start_paused = true)]
async fn test_close_bridging_moves_to_replacement_node() {
    let h = Harness::new(SupervisorConfig::default(), true);
    h.start();
    advance(31.0).await;

    let next = h.factory.created(0);
    let mut old_events = h.node.subscribe();
    let mut new_events = next.subscribe();

    h.node.emit(NodeEvent::TransportClosed { reason: None });
    next.emit(NodeEvent::TransportClosed { reason: None });
    advance(0.001).await;

    assert_eq!(
        drain(&mut old_events),
        vec![NodeEvent::TransportClosed { reason: None }]
    );
    assert_eq!(
        drain(&mut new_events),
        vec![NodeEvent::TransportClosed { reason: None }, NodeEvent::Closed]
    );
    h.supervisor.stop();
}

#[tokio::test(start_paused = true)]
async fn test_activity_tracking_moves_to_replacement_node() {
    let config = SupervisorConfig::default()
        .with_heartbeat_interval(Duration::from_secs(30))
        .with_stale_after(Duration::from_secs(20));
    let h = Harness::new(config, true);
    h.start();

    // inactivity heal at 30s replaces node-0 with node-1
    advance(31.0).await;
    assert_eq!(*h.hooks.started.lock(), vec![HealReason::Inactivity]);
    let next = h.factory.created(0);

    advance(24.0).await;
    next.emit(NodeEvent::Message);

    // tick at 60s sees 5s of silence, not 30s
    advance(6.0).await;
    assert_eq!(h.count("node-1:ping"), 1);
    assert_eq!(h.count("node-1:resubscribe"), 0);
    assert_eq!(h.hooks.started.lock().len(), 1);
    h.supervisor.stop();
}

#[tokio::test(start_paused = true)]
async fn test_old_node_activity_ignored_after_replacement() {
    let config = SupervisorConfig::default()
        .with_heartbeat_interval(Duration::from_secs(30))
        .with_stale_after(Duration::from_secs(20));
    let h = Harness::new(config, true);
    h.start();

    advance(55.0).await;
    h.node.emit(NodeEvent::Message);

    advance(6.0).await;
    assert_eq!(h.count("node-1:resubscribe"), 1);
    assert_eq!(
        *h.hooks.started.lock(),
        vec![HealReason::Inactivity, HealReason::Inactivity]
    );
    h.supervisor.stop();
}

#[tokio::test(start_paused = true)]
async fn test_hung_reconnect_falls_through_to_recreate() {
    let config = SupervisorConfig::default().with_repair_timeout(Duration::from_secs(5));
    let h = Harness::new(config, true);
    h.node.reconnect_hangs.store(true, Ordering::SeqCst);
    h.start();

    // heal at 30s: reconnect gives up at 35s, recreate follows
    advance(34.0).await;
    assert_eq!(h.count("create"), 0);

    advance(2.0).await;
    assert_eq!(h.count("node-0:reconnect"), 1);
    assert_eq!(h.count("create"), 1);
    assert_eq!(
        h.supervisor.current_node().unwrap().participant_id(),
        "node-1"
    );

    // heartbeats keep running on the replacement
    advance(3600.0).await;
    assert!(h.count("node-1:ping") >= 100);
    h.supervisor.stop();
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_ladder_retries_on_next_heartbeat() {
    let h = Harness::new(SupervisorConfig::default(), true);
    h.factory.fail.store(true, Ordering::SeqCst);
    let mut events = h.supervisor.subscribe();
    h.start();

    // heal starts at 30s and sleeps 0 + 1 + 2 + 5 + 10 seconds
    advance(47.5).await;
    assert_eq!(h.count("create"), 4);

    advance(1.0).await;
    assert_eq!(h.count("resubscribe"), 5);
    assert_eq!(h.count("reconnect"), 5);
    assert_eq!(h.count("create"), 5);
    assert!(drain(&mut events).contains(&SupervisorEvent::HealExhausted {
        reason: HealReason::HeartbeatFailures
    }));
    assert_eq!(*h.hooks.finished.lock(), vec![HealOutcome::Exhausted]);
    assert!(h.supervisor.is_running());

    // next tick at 78s restarts the ladder at the zero-delay step
    advance(30.0).await;
    assert_eq!(h.count("create"), 6);
    assert_eq!(h.count("ping"), 3);
    h.supervisor.stop();
}

#[tokio::test(start_paused = true)]
async fn test_backoff_capped_at_max() {
    let config = SupervisorConfig::default().with_max_backoff(Duration::from_secs(1));
    let h = Harness::new(config, true);
    h.factory.fail.store(true, Ordering::SeqCst);
    h.start();

    advance(33.5).await;
    assert_eq!(h.count("create"), 4);

    advance(1.0).await;
    assert_eq!(h.count("create"), 5);
    assert_eq!(*h.hooks.finished.lock(), vec![HealOutcome::Exhausted]);
    h.supervisor.stop();
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_terminal_and_idempotent() {
    let h = Harness::new(SupervisorConfig::default(), false);
    let mut events = h.supervisor.subscribe();
    h.start();
    advance(0.001).await;

    h.supervisor.stop();
    h.supervisor.stop();
    let calls = h.calls();

    advance(600.0).await;
    assert_eq!(h.calls(), calls);
    assert!(!h.supervisor.is_running());
    assert!(h.supervisor.current_node().is_none());
    assert_eq!(drain(&mut events), vec![SupervisorEvent::Stopped]);
    assert!(matches!(
        h.supervisor.start(h.node.clone()),
        Err(SupervisorError::Stopped)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_stop_detaches_close_bridging() {
    let h = Harness::new(SupervisorConfig::default(), false);
    h.start();
    advance(0.001).await;
    h.supervisor.stop();

    let mut node_events = h.node.subscribe();
    h.node.emit(NodeEvent::TransportClosed { reason: None });
    advance(0.001).await;
    assert_eq!(
        drain(&mut node_events),
        vec![NodeEvent::TransportClosed { reason: None }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_mid_heal_halts_escalation() {
    let h = Harness::new(SupervisorConfig::default(), true);
    h.factory.fail.store(true, Ordering::SeqCst);
    h.start();

    // first rung at 30s, second at 31s, third would run at 33s
    advance(31.5).await;
    assert_eq!(h.count("create"), 2);
    h.supervisor.stop();

    advance(3600.0).await;
    assert_eq!(h.count("create"), 2);
    assert_eq!(h.count("ping"), 2);
}

#[tokio::test]
async fn test_stop_before_start() {
    let h = Harness::new(SupervisorConfig::default(), false);
    h.supervisor.stop();
    h.supervisor.stop();
    assert!(matches!(
        h.supervisor.start(h.node.clone()),
        Err(SupervisorError::Stopped)
    ));
    assert!(h.calls().is_empty());
}

#[tokio::test]
async fn test_start_twice_rejected() {
    let h = Harness::new(SupervisorConfig::default(), false);
    h.start();
    assert!(matches!(
        h.supervisor.start(h.node.clone()),
        Err(SupervisorError::AlreadyStarted)
    ));
    h.supervisor.stop();
}

#[test]
fn test_invalid_config_rejected() {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let result = ConnectionSupervisor::builder(
        MockFactory::new(log),
        NodeCredentials::new("kgroup1test", "kshare1test"),
        &RelayPlan::default(),
    )
    .config(SupervisorConfig::default().with_heartbeat_timeout(Duration::ZERO))
    .build();
    assert!(matches!(result, Err(SupervisorError::Config(_))));
}
