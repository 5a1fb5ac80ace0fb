use async_trait::async_trait;

use crate::domain::node::filter::Filter;
use crate::domain::node::node::Node;
use crate::domain::utils::id::{DiskCid, NodeId};
use crate::error::{Error, Result};

/// The three remote steps a reservation attempt is made of.
#[async_trait]
pub trait ReservationSteps: Send + Sync {
    async fn select(&self, hint: Option<&DiskCid>, filter: &Filter) -> Result<Node>;

    /// Claims the node. May leave a claim tag behind on failure.
    async fn reserve(&self, node: &Node) -> Result<()>;

    /// Undoes whatever a failed `reserve` of this node left behind.
    async fn rollback(&self, node: &Node) -> Result<()>;
}

/// Selects and claims a node, retrying up to `max_attempts` times.
///
/// There is no lock across CPI processes: two invocations may select the same node. A claim that fails
/// (usually because the reserve workflow notices the double claim) is rolled back before the next attempt.
pub async fn try_reserve(steps: &dyn ReservationSteps, hint: Option<&DiskCid>, filter: &Filter, max_attempts: u32) -> Result<NodeId> {
    let max_attempts = max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        let node = steps.select(hint, filter).await.map_err(|e| {
            log::error!("NodeSelectionFailed: Attempt {}/{}: {}", attempt, max_attempts, e);
            Error::ReservationError(Box::new(e))
        })?;

        tracing::info!(target: "cpi::reservation", attempt, max_attempts, node_id = %node.id, "Reserving node");

        match steps.reserve(&node).await {
            Ok(()) => {
                tracing::info!(target: "cpi::reservation", attempt, node_id = %node.id, "Node reserved");
                return Ok(node.id);
            }
            Err(e) => {
                tracing::warn!(target: "cpi::reservation", attempt, node_id = %node.id, error = %e, "Reservation attempt failed");

                steps.rollback(&node).await.map_err(|rollback_error| {
                    log::error!("ReservationRollbackFailed: Node {} may stay reserved: {}", node.id, rollback_error);
                    Error::ReservationError(Box::new(rollback_error))
                })?;

                last_error = Some(e);
            }
        }
    }

    let cause = last_error.unwrap_or_else(|| Error::NotFoundError("no reservation attempt was made".to_string()));
    log::error!("ReservationExhausted: Gave up after {} attempts: {}", max_attempts, cause);

    Err(Error::ReservationError(Box::new(cause)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fleet_dto::PersistentDiskSettings;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Step {
        Select,
        Reserve(String),
        Rollback(String),
    }

    /// Hands out `n1`, `n2`, ... and fails the first `failures` claims.
    struct ScriptedSteps {
        failures: usize,
        select_error: bool,
        rollback_error: bool,
        log: Mutex<Vec<Step>>,
    }

    impl ScriptedSteps {
        fn new(failures: usize) -> Self {
            ScriptedSteps { failures, select_error: false, rollback_error: false, log: Mutex::new(Vec::new()) }
        }

        fn log(&self) -> Vec<Step> {
            self.log.lock().unwrap().clone()
        }

        fn count(&self, predicate: impl Fn(&Step) -> bool) -> usize {
            self.log().iter().filter(|step| predicate(step)).count()
        }
    }

    #[async_trait]
    impl ReservationSteps for ScriptedSteps {
        async fn select(&self, _hint: Option<&DiskCid>, _filter: &Filter) -> Result<Node> {
            let mut log = self.log.lock().unwrap();
            log.push(Step::Select);
            if self.select_error {
                return Err(Error::NotFoundError("all nodes have been reserved".to_string()));
            }

            let index = log.iter().filter(|step| **step == Step::Select).count();
            Ok(Node { id: NodeId::new(format!("n{}", index)), obms: Vec::new(), status: String::new(), tags: Vec::new(), persistent_disk: PersistentDiskSettings::default() })
        }

        async fn reserve(&self, node: &Node) -> Result<()> {
            let mut log = self.log.lock().unwrap();
            log.push(Step::Reserve(node.id.to_string()));

            let attempts = log.iter().filter(|step| matches!(step, Step::Reserve(_))).count();
            if attempts <= self.failures {
                return Err(Error::WorkflowFailed { workflow: "Graph.BOSH.ReserveNode.r1".to_string(), node_id: node.id.to_string() });
            }
            Ok(())
        }

        async fn rollback(&self, node: &Node) -> Result<()> {
            self.log.lock().unwrap().push(Step::Rollback(node.id.to_string()));
            if self.rollback_error {
                return Err(Error::ApiError { method: "DELETE".to_string(), url: "/nodes/n1/tags/reserved".to_string(), status: 500, body: String::new() });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn first_success_wins() {
        let steps = ScriptedSteps::new(0);

        let node_id = try_reserve(&steps, None, &Filter::AllowAny, 5).await.unwrap();

        assert_eq!(node_id, NodeId::new("n1"));
        assert_eq!(steps.log(), vec![Step::Select, Step::Reserve("n1".to_string())]);
    }

    #[tokio::test]
    async fn failed_claim_is_rolled_back_before_next_attempt() {
        let steps = ScriptedSteps::new(2);

        let node_id = try_reserve(&steps, None, &Filter::AllowAny, 5).await.unwrap();

        assert_eq!(node_id, NodeId::new("n3"));
        assert_eq!(
            steps.log(),
            vec![
                Step::Select,
                Step::Reserve("n1".to_string()),
                Step::Rollback("n1".to_string()),
                Step::Select,
                Step::Reserve("n2".to_string()),
                Step::Rollback("n2".to_string()),
                Step::Select,
                Step::Reserve("n3".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts_with_last_cause() {
        let steps = ScriptedSteps::new(usize::MAX);

        let err = try_reserve(&steps, None, &Filter::AllowAny, 3).await.unwrap_err();

        assert_eq!(steps.count(|step| matches!(step, Step::Reserve(_))), 3);
        assert_eq!(steps.count(|step| matches!(step, Step::Rollback(_))), 3);
        assert_eq!(err.to_string(), "unable to reserve node: workflow Graph.BOSH.ReserveNode.r1 failed on node n3");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn selection_error_aborts_without_retry() {
        let mut steps = ScriptedSteps::new(0);
        steps.select_error = true;

        let err = try_reserve(&steps, None, &Filter::AllowAny, 5).await.unwrap_err();

        assert_eq!(steps.log(), vec![Step::Select]);
        assert_eq!(err.to_string(), "unable to reserve node: all nodes have been reserved");
    }

    #[tokio::test]
    async fn rollback_failure_stops_retrying() {
        let mut steps = ScriptedSteps::new(1);
        steps.rollback_error = true;

        assert!(matches!(try_reserve(&steps, None, &Filter::AllowAny, 5).await, Err(Error::ReservationError(_))));
        assert_eq!(steps.count(|step| matches!(step, Step::Reserve(_))), 1);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let steps = ScriptedSteps::new(0);
        assert!(try_reserve(&steps, None, &Filter::AllowAny, 0).await.is_ok());
    }
}
