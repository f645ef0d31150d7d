use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::api::control_plane_dto::trace_dto::{SessionTraceDto, TraceEventDto};
use crate::domain::config::ScenarioSettings;
use crate::domain::network::addressing::ClientAttachment;
use crate::domain::simulator::timeline::{ControlEvent, TimedEvent};
use crate::domain::utils::id::{ContentId, NodeId, UserId};

/// Seeded viewer workload: every attached client starts one session at a
/// uniform time inside the start window, watching a Zipf-ranked content.
#[derive(Debug, Clone)]
pub struct ScenarioGenerator {
    settings: ScenarioSettings,
}

impl ScenarioGenerator {
    pub fn new(settings: ScenarioSettings) -> Self {
        ScenarioGenerator { settings }
    }

    pub fn generate(&self, clients: &[ClientAttachment]) -> Vec<TimedEvent> {
        let mut rng = StdRng::seed_from_u64(self.settings.seed);
        let weights = zipf_cumulative(self.settings.contents, self.settings.zipf_exponent);

        let mut events: Vec<TimedEvent> = clients
            .iter()
            .map(|client| {
                let at_s = if self.settings.start_window_s > 0.0 { rng.random_range(0.0..self.settings.start_window_s) } else { 0.0 };
                let content = pick_rank(&weights, rng.random::<f64>());
                TimedEvent::new(at_s, ControlEvent::ViewerArrival { user: client.user, content: ContentId::new(content), server: None })
            })
            .collect();

        events.sort_by(|a, b| a.at_s.total_cmp(&b.at_s));
        log::info!("Generated {} viewer arrivals over {}s (seed {}).", events.len(), self.settings.start_window_s, self.settings.seed);
        events
    }
}

/// Cumulative, normalised weights of ranks `1..=n` for `P(k) ~ 1 / k^s`.
fn zipf_cumulative(n: usize, exponent: f64) -> Vec<f64> {
    let raw: Vec<f64> = (1..=n.max(1)).map(|k| 1.0 / (k as f64).powf(exponent)).collect();
    let total: f64 = raw.iter().sum();

    let mut acc = 0.0;
    raw.iter()
        .map(|weight| {
            acc += weight / total;
            acc
        })
        .collect()
}

/// Rank (1-based) whose cumulative weight first reaches `draw`.
fn pick_rank(cumulative: &[f64], draw: f64) -> usize {
    cumulative.iter().position(|&bound| draw <= bound).unwrap_or(cumulative.len().saturating_sub(1)) + 1
}

/// Converts a replay trace into timeline events.
pub fn events_from_trace(trace: SessionTraceDto) -> Vec<TimedEvent> {
    trace
        .events
        .into_iter()
        .map(|event| match event {
            TraceEventDto::ViewerArrival { at_s, user, content, server } => TimedEvent::new(
                at_s,
                ControlEvent::ViewerArrival { user: UserId::new(user), content: ContentId::new(content), server: server.map(NodeId::new) },
            ),
            TraceEventDto::LinkTraffic { at_s, src, dst, bytes } => {
                TimedEvent::new(at_s, ControlEvent::LinkTraffic { src: NodeId::new(src), dst: NodeId::new(dst), bytes })
            }
            TraceEventDto::ActivateServers { at_s } => TimedEvent::new(at_s, ControlEvent::ActivateServers),
        })
        .collect()
}
