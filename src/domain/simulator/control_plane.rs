use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::domain::config::{ControlPlaneConfig, ResolutionSettings, TrafficModel};
use crate::domain::monitor::congestion_monitor::CongestionMonitor;
use crate::domain::network::addressing::AddressPlan;
use crate::domain::optimizer::backend::ProcessSolver;
use crate::domain::optimizer::protocol::SolverResponse;
use crate::domain::optimizer::worker::OptimizerWorker;
use crate::domain::placement::controller::{AdmissionOutcome, ControllerStats, CongestionResponse, PlacementController};
use crate::domain::placement::servers::ServerPool;
use crate::domain::placement::strategy::ResolutionStrategy;
use crate::domain::simulator::scenario::{ScenarioGenerator, events_from_trace};
use crate::domain::simulator::timeline::{ControlEvent, EventTimeline, TimedEvent};
use crate::domain::utils::id::NodeId;
use crate::error::{Error, Result};
use crate::loader::parser::parse_json_file;
use crate::loader::topology_reader::read_topology;

/// Knobs of the event loop itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSettings {
    pub origin_server: NodeId,
    pub stop_time_s: f64,
    pub provision_on_admission_failure: bool,
    pub traffic: TrafficModel,
    /// Wait for every solver answer before handling the next event.
    pub blocking_optimizer: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub events_processed: usize,
    pub simulated_time_s: f64,
    pub groups: usize,
    pub users: usize,
    pub redirections: usize,
    pub servers: usize,
    pub controller: ControllerStats,
}

/// Single threaded event loop around the placement controller.
///
/// Viewer arrivals, link traffic and monitor ticks are handled strictly in
/// simulated time order; each handler runs to completion before the next
/// event. Optimizer answers arrive over a channel and are applied between
/// events.
#[derive(Debug)]
pub struct ControlPlane {
    controller: PlacementController,
    monitor: CongestionMonitor,
    timeline: EventTimeline,
    completions: Option<mpsc::UnboundedReceiver<SolverResponse>>,
    settings: RuntimeSettings,
    events_processed: usize,
}

impl ControlPlane {
    pub fn new(
        controller: PlacementController,
        monitor: CongestionMonitor,
        completions: Option<mpsc::UnboundedReceiver<SolverResponse>>,
        settings: RuntimeSettings,
    ) -> Self {
        let mut timeline = EventTimeline::new();
        timeline.schedule_at(monitor.interval_s(), ControlEvent::MonitorTick);

        ControlPlane { controller, monitor, timeline, completions, settings, events_processed: 0 }
    }

    /// Builds the whole control plane from a configuration.
    ///
    /// With the optimizer strategy this spawns the solver worker, so it
    /// must be called from inside a tokio runtime.
    pub fn from_config(config: &ControlPlaneConfig) -> Result<Self> {
        let graph = read_topology(&config.nodes_file, &config.links_file, config.per_stream_unit)?;
        if !graph.contains(config.origin_server) {
            return Err(Error::ConfigError(format!("origin server {} is not part of the topology", config.origin_server)));
        }

        let mut addresses = AddressPlan::from_topology(&graph)?;
        addresses.attach_clients_per_ap(config.clients_per_ap)?;
        log::info!("{} viewers attached to {} access points.", addresses.clients().len(), addresses.access_points().count());

        let mut servers = ServerPool::new(config.default_server_capacity);
        servers.register_origin(config.origin_server, addresses.node_address(config.origin_server)?);
        for server in &config.servers {
            let address = addresses.node_address(server.node)?;
            let capacity = server.capacity.unwrap_or(config.default_server_capacity);
            servers.register(server.node, address, capacity, server.contents.iter().copied());
        }

        let (strategy, completions, blocking_optimizer) = match &config.resolution {
            ResolutionSettings::Greedy => (ResolutionStrategy::Greedy, None, false),
            ResolutionSettings::Optimizer { interpreter, script, blocking, timeout } => {
                let backend = Arc::new(ProcessSolver::new(interpreter.clone(), script.clone()));
                let (client, completions) = OptimizerWorker::spawn(backend, *timeout);
                (ResolutionStrategy::Optimizer(client), Some(completions), *blocking)
            }
        };

        let mut monitor = CongestionMonitor::new(&config.monitor);
        monitor.register_topology(&graph, &addresses);

        let controller = PlacementController::new(graph, addresses, servers, config.key_mode, strategy);
        let settings = RuntimeSettings {
            origin_server: config.origin_server,
            stop_time_s: config.stop_time_s,
            provision_on_admission_failure: config.provision_on_admission_failure,
            traffic: config.monitor.traffic,
            blocking_optimizer,
        };

        let mut plane = ControlPlane::new(controller, monitor, completions, settings);
        plane.schedule_workload(config)?;
        Ok(plane)
    }

    /// Schedules the configured trace, or a generated scenario when no
    /// trace is given.
    fn schedule_workload(&mut self, config: &ControlPlaneConfig) -> Result<()> {
        if let Some(trace_file) = &config.trace_file {
            let events = events_from_trace(parse_json_file(trace_file)?);
            log::info!("Replaying {} events from '{}'.", events.len(), trace_file.display());
            self.schedule_all(events);
        } else if let Some(scenario) = &config.scenario {
            let events = ScenarioGenerator::new(scenario.clone()).generate(self.controller.addresses().clients());
            self.schedule_all(events);
        } else {
            log::warn!("NoWorkload: Neither a trace nor a scenario is configured, only the monitor will run.");
        }
        Ok(())
    }

    pub fn schedule(&mut self, event: TimedEvent) {
        self.timeline.schedule_at(event.at_s, event.event);
    }

    pub fn schedule_all(&mut self, events: impl IntoIterator<Item = TimedEvent>) {
        for event in events {
            self.schedule(event);
        }
    }

    /// Processes events up to the stop time and waits for outstanding
    /// solver answers.
    pub async fn run(&mut self) -> Result<RunSummary> {
        while let Some(at_s) = self.timeline.peek_time_s() {
            if at_s > self.settings.stop_time_s {
                break;
            }
            let Some(timed) = self.timeline.pop() else {
                break;
            };

            self.dispatch(timed.event)?;
            self.events_processed += 1;
            self.collect_completions(self.settings.blocking_optimizer).await;
        }

        self.collect_completions(true).await;

        let summary = self.summary();
        log::info!(
            "Run finished at {:.1}s: {} events, {} groups, {} users, {} relocations.",
            summary.simulated_time_s,
            summary.events_processed,
            summary.groups,
            summary.users,
            summary.controller.relocations
        );
        Ok(summary)
    }

    fn dispatch(&mut self, event: ControlEvent) -> Result<()> {
        match event {
            ControlEvent::ViewerArrival { user, content, server } => {
                let from = self.controller.addresses().client(user).ok_or(Error::UnknownClient(user))?.ap;
                let to = server.unwrap_or(self.settings.origin_server);

                let outcome = self.controller.on_new_request(from, to, content, user)?;
                match outcome {
                    AdmissionOutcome::CapacityExceeded { edge: (u, v), .. } if self.settings.provision_on_admission_failure => {
                        self.controller.handle_congestion(u, v)?;
                        self.controller.activate_warmed_servers();
                    }
                    _ => {}
                }
            }
            ControlEvent::LinkTraffic { src, dst, bytes } => {
                self.monitor.record_link_bytes(self.controller.addresses(), src, dst, bytes);
            }
            ControlEvent::MonitorTick => {
                if self.settings.traffic == TrafficModel::Estimated {
                    self.feed_estimated_traffic();
                }

                let responses = self.monitor.tick(&mut self.controller);
                if responses.iter().any(|response| matches!(response, CongestionResponse::Reallocated(_))) {
                    self.controller.activate_warmed_servers();
                }

                let interval_s = self.monitor.interval_s();
                if self.timeline.now_s() + interval_s <= self.settings.stop_time_s {
                    self.timeline.schedule_in(interval_s, ControlEvent::MonitorTick);
                }
            }
            ControlEvent::ActivateServers => {
                self.controller.activate_warmed_servers();
            }
        }
        Ok(())
    }

    /// Converts the current group demand into per-link byte counts for one
    /// monitor interval.
    fn feed_estimated_traffic(&mut self) {
        let interval_s = self.monitor.interval_s();
        let links: Vec<(NodeId, NodeId)> = self.controller.graph().links().iter().map(|link| (link.src, link.dst)).collect();

        for (src, dst) in links {
            let load_bps = self.controller.estimated_link_load(src, dst);
            if load_bps > 0.0 {
                let bytes = (load_bps * interval_s / 8.0) as u64;
                self.monitor.record_link_bytes(self.controller.addresses(), src, dst, bytes);
            }
        }
    }

    /// Applies solver answers. With `wait` set, blocks until no escalation
    /// is pending; otherwise only answers that already arrived are applied.
    async fn collect_completions(&mut self, wait: bool) {
        let Some(completions) = self.completions.as_mut() else {
            return;
        };

        loop {
            let response = if wait && self.controller.pending_escalations() > 0 {
                completions.recv().await
            } else {
                completions.try_recv().ok()
            };

            let Some(response) = response else {
                break;
            };
            let outcome = self.controller.complete_escalation(response);
            if !outcome.applied.is_empty() {
                self.controller.activate_warmed_servers();
            }
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            events_processed: self.events_processed,
            simulated_time_s: self.timeline.now_s(),
            groups: self.controller.registry().len(),
            users: self.controller.registry().total_users(),
            redirections: self.controller.redirections().len(),
            servers: self.controller.servers().len(),
            controller: self.controller.stats().clone(),
        }
    }

    pub fn controller(&self) -> &PlacementController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PlacementController {
        &mut self.controller
    }

    pub fn monitor(&self) -> &CongestionMonitor {
        &self.monitor
    }
}
