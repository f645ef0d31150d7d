use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::domain::optimizer::backend::SolverBackend;
use crate::domain::optimizer::protocol::{SolverRequest, SolverResponse};
use crate::error::{Error, Result};

/// Submit side of the optimizer worker. Cheap to clone.
#[derive(Debug, Clone)]
pub struct OptimizerClient {
    tx: mpsc::UnboundedSender<SolverRequest>,
}

impl OptimizerClient {
    pub fn submit(&self, request: SolverRequest) -> Result<()> {
        self.tx.send(request).map_err(|_| Error::OptimizerChannelClosed)
    }
}

/// Background task that runs solver requests one at a time and reports
/// each result on the completion channel.
pub struct OptimizerWorker;

impl OptimizerWorker {
    /// Spawns the worker on the current tokio runtime.
    ///
    /// The worker stops once every `OptimizerClient` is dropped or the
    /// completion receiver is closed.
    pub fn spawn(backend: Arc<dyn SolverBackend>, timeout: Option<Duration>) -> (OptimizerClient, mpsc::UnboundedReceiver<SolverResponse>) {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<SolverRequest>();
        let (response_tx, response_rx) = mpsc::unbounded_channel::<SolverResponse>();

        tokio::spawn(async move {
            while let Some(request) = request_rx.recv().await {
                let response = Self::run_request(backend.as_ref(), &request, timeout).await;
                if response_tx.send(response).is_err() {
                    log::debug!("Optimizer completion receiver dropped, stopping worker.");
                    break;
                }
            }
            log::debug!("Optimizer worker finished.");
        });

        (OptimizerClient { tx: request_tx }, response_rx)
    }

    async fn run_request(backend: &dyn SolverBackend, request: &SolverRequest, timeout: Option<Duration>) -> SolverResponse {
        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, backend.solve(request)).await {
                Ok(result) => result,
                Err(_) => Err(Error::OptimizerTimeout(limit.as_secs_f64())),
            },
            None => backend.solve(request).await,
        };

        match result {
            Ok(assignments) => {
                log::info!("Solver request {} returned {} assignments.", request.id, assignments.len());
                SolverResponse::completed(request.id, assignments)
            }
            Err(e) => {
                log::error!("SolverFailed: Request {} produced no placement: {}", request.id, e);
                SolverResponse::failed(request.id, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::optimizer::protocol::Assignment;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct SlowSolver;

    #[async_trait]
    impl SolverBackend for SlowSolver {
        async fn solve(&self, _request: &SolverRequest) -> Result<Vec<Assignment>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![Assignment { group_index: 0, server_id: 0 }])
        }
    }

    #[tokio::test]
    async fn test_timeout_yields_failed_response() {
        let (client, mut completions) = OptimizerWorker::spawn(Arc::new(SlowSolver), Some(Duration::from_millis(20)));
        let request = SolverRequest::new((0, 1), Vec::new());
        let id = request.id;

        client.submit(request).unwrap();
        let response = completions.recv().await.unwrap();

        assert_eq!(response.request_id, id);
        assert!(response.assignments.is_empty());
        assert!(response.error.is_some(), "A timed out request must carry an error");
    }
}
