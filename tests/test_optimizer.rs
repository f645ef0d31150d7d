use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use backhaul_placement::domain::config::MonitorSettings;
use backhaul_placement::domain::group::group::GroupKeyMode;
use backhaul_placement::domain::monitor::congestion_monitor::CongestionMonitor;
use backhaul_placement::domain::network::addressing::AddressPlan;
use backhaul_placement::domain::network::node::NodeKind;
use backhaul_placement::domain::network::topology::TopologyGraph;
use backhaul_placement::domain::optimizer::backend::{ProcessSolver, SolverBackend};
use backhaul_placement::domain::optimizer::protocol::{Assignment, RosterEntry, SolverRequest, SolverResponse};
use backhaul_placement::domain::optimizer::worker::OptimizerWorker;
use backhaul_placement::domain::placement::controller::{CongestionResponse, PlacementController};
use backhaul_placement::domain::placement::servers::ServerPool;
use backhaul_placement::domain::placement::strategy::ResolutionStrategy;
use backhaul_placement::domain::utils::id::{ContentId, GroupId, NodeId, UserId};
use backhaul_placement::error::Result;

fn node(id: usize) -> NodeId {
    NodeId::new(id)
}

/// Answers every request with the same assignments and remembers what it
/// was asked.
#[derive(Debug)]
struct FixedSolver {
    assignments: Vec<Assignment>,
    requests: Mutex<Vec<SolverRequest>>,
}

#[async_trait]
impl SolverBackend for FixedSolver {
    async fn solve(&self, request: &SolverRequest) -> Result<Vec<Assignment>> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.assignments.clone())
    }
}

/// Line 0-1-2-3 with the origin at 0 and the AP at 3. Node 1 can host
/// nothing, node 2 exactly one content.
fn create_optimizer_controller(strategy: ResolutionStrategy) -> PlacementController {
    let mut graph = TopologyGraph::new(4_300_000.0);
    graph.add_node(node(0), NodeKind::CacheServer);
    graph.add_node(node(1), NodeKind::CacheServer);
    graph.add_node(node(2), NodeKind::CacheServer);
    graph.add_node(node(3), NodeKind::AccessPoint);
    for i in 0..3 {
        graph.add_link(node(i), node(i + 1), 10_000_000.0, 0.002, 0.0, 100);
    }
    graph.build_adjacency(4).unwrap();

    let mut addresses = AddressPlan::from_topology(&graph).unwrap();
    addresses.attach_clients_per_ap(3).unwrap();

    let mut servers = ServerPool::new(10);
    servers.register_origin(node(0), addresses.node_address(node(0)).unwrap());
    servers.register(node(1), addresses.node_address(node(1)).unwrap(), 0, []);
    servers.register(node(2), addresses.node_address(node(2)).unwrap(), 1, []);

    PlacementController::new(graph, addresses, servers, GroupKeyMode::ContentAware, strategy)
}

#[tokio::test]
async fn test_escalation_applies_hosted_assignable_and_skips_the_rest() {
    let solver = Arc::new(FixedSolver {
        assignments: vec![
            Assignment { group_index: 0, server_id: 2 },
            Assignment { group_index: 1, server_id: 1 },
            Assignment { group_index: 1, server_id: 0 },
            Assignment { group_index: 7, server_id: 2 },
            Assignment { group_index: 0, server_id: 99 },
        ],
        requests: Mutex::new(Vec::new()),
    });
    let (client, mut completions) = OptimizerWorker::spawn(solver.clone(), None);
    let mut controller = create_optimizer_controller(ResolutionStrategy::Optimizer(client));

    controller.on_new_request(node(3), node(0), ContentId::new(1), UserId::new(0)).unwrap();
    controller.on_new_request(node(3), node(0), ContentId::new(1), UserId::new(1)).unwrap();
    controller.on_new_request(node(3), node(0), ContentId::new(2), UserId::new(2)).unwrap();

    let response = controller.handle_congestion(node(0), node(1)).unwrap();
    let CongestionResponse::Escalated(request_id) = response else {
        panic!("Optimizer strategy must escalate, got {:?}", response);
    };
    assert_eq!(controller.pending_escalations(), 1);

    let answer = completions.recv().await.unwrap();
    assert_eq!(answer.request_id, request_id);

    let outcome = controller.complete_escalation(answer);
    assert_eq!(controller.pending_escalations(), 0);

    // Group 0 takes node 2's only slot; group 1 cannot use node 1 and stays
    // on the origin, which hosts everything.
    assert_eq!(outcome.applied.len(), 2);
    assert_eq!(outcome.skipped, 3);
    assert_eq!(outcome.applied[0].group, GroupId::new(0));
    assert_eq!(outcome.applied[0].to, node(2));
    assert!(controller.servers().has_content(node(2), ContentId::new(1)));

    let node_two_ip = controller.addresses().node_address(node(2)).unwrap();
    assert_eq!(controller.lookup_server(UserId::new(1), ContentId::new(1)), Some(node_two_ip.as_str()));
    assert_eq!(controller.registry().groups()[0].route.hops(), &[node(2), node(3)]);

    let requests = solver.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].congested, (0, 1));
    assert_eq!(
        requests[0].roster,
        vec![
            RosterEntry { ap: 3, synthetic_id: 4, index: 0, user_count: 2 },
            RosterEntry { ap: 3, synthetic_id: 5, index: 1, user_count: 1 },
        ]
    );
}

#[tokio::test]
async fn test_unknown_response_is_ignored() {
    let (client, _completions) = OptimizerWorker::spawn(Arc::new(FixedSolver { assignments: Vec::new(), requests: Mutex::new(Vec::new()) }), None);
    let mut controller = create_optimizer_controller(ResolutionStrategy::Optimizer(client));
    controller.on_new_request(node(3), node(0), ContentId::new(1), UserId::new(0)).unwrap();

    let stray = SolverResponse::completed(uuid::Uuid::new_v4(), vec![Assignment { group_index: 0, server_id: 2 }]);
    let outcome = controller.complete_escalation(stray);

    assert!(outcome.applied.is_empty());
    assert_eq!(controller.registry().groups()[0].serving_node, node(0));
    assert_eq!(controller.stats().escalations_completed, 0);
}

#[test]
fn test_failed_escalations_do_not_abort_the_monitor_tick() {
    // A worker whose runtime is gone refuses every submission.
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let backend = Arc::new(FixedSolver { assignments: Vec::new(), requests: Mutex::new(Vec::new()) });
    let (client, _completions) = runtime.block_on(async { OptimizerWorker::spawn(backend, None) });
    drop(runtime);

    let mut controller = create_optimizer_controller(ResolutionStrategy::Optimizer(client));
    controller.on_new_request(node(3), node(0), ContentId::new(1), UserId::new(0)).unwrap();

    let mut monitor = CongestionMonitor::new(&MonitorSettings::default());
    monitor.register_topology(controller.graph(), controller.addresses());
    // 5 MB in 2s is 20 Mbit/s, over every 10 Mbit/s link.
    for i in 0..3 {
        assert!(monitor.record_link_bytes(controller.addresses(), node(i), node(i + 1), 5_000_000));
    }

    let responses = monitor.tick(&mut controller);

    assert!(responses.is_empty(), "No escalation can be submitted: {:?}", responses);
    assert_eq!(controller.pending_escalations(), 0);
    assert_eq!(controller.stats().escalations_submitted, 0);
    assert!(monitor.sample().is_empty(), "Every counter of the interval was consumed");
}

#[cfg(unix)]
#[tokio::test]
async fn test_process_solver_passes_roster_and_parses_stdout() {
    let dir = std::env::temp_dir().join(format!("solver-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let script = dir.join("solver.sh");
    let args_file = dir.join("args.txt");
    std::fs::write(&script, format!("echo \"$@\" > '{}'\necho '0 2'\necho 'objective 12.5'\necho '1 0'\nexit 3\n", args_file.display())).unwrap();

    let solver = ProcessSolver::new("sh", script.to_string_lossy());
    let request = SolverRequest::new(
        (1, 2),
        vec![RosterEntry { ap: 3, synthetic_id: 4, index: 0, user_count: 2 }, RosterEntry { ap: 5, synthetic_id: 5, index: 1, user_count: 1 }],
    );

    let assignments = solver.solve(&request).await.unwrap();

    assert_eq!(assignments, vec![Assignment { group_index: 0, server_id: 2 }, Assignment { group_index: 1, server_id: 0 }], "A failing exit status must not discard the answer");
    let args = std::fs::read_to_string(&args_file).unwrap();
    assert_eq!(args.trim(), "2 1 2 3 4 0 2 5 5 1 1");

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_missing_interpreter_reports_failure() {
    let (client, mut completions) = OptimizerWorker::spawn(Arc::new(ProcessSolver::new("/nonexistent/interpreter", "solver.py")), None);

    let request = SolverRequest::new((0, 1), Vec::new());
    client.submit(request).unwrap();

    let response = completions.recv().await.unwrap();
    assert!(response.assignments.is_empty());
    assert!(response.error.is_some());
}
