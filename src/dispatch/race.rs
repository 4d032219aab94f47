use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;

use super::Dispatcher;
use crate::availability::AvailabilityWriter;
use crate::error::DispatchError;
use crate::model::AcceptOutcome;

/// What happened when every candidate of a fresh group tried to accept at once.
#[derive(Debug, Clone, Serialize)]
pub struct RaceReport {
    pub offer_group: String,
    /// `(surveyor_id, job_id)` of the winner, if anyone won.
    pub winner: Option<(i64, i64)>,
    pub losers: Vec<i64>,
}

/// Issue offers to `candidates` and have all of them accept concurrently.
///
/// Each attempt runs on tokio's blocking pool with its own database
/// connection, so they genuinely contend in SQLite. `on_settled` is called
/// as each attempt finishes, in completion order. Repeated candidate ids
/// get a single attempt, matching the single offer they were issued.
pub async fn race_offer<A, F>(
    dispatcher: Arc<Dispatcher<A>>,
    fnol_id: &str,
    candidates: &[i64],
    ttl_seconds: i64,
    mut on_settled: F,
) -> Result<RaceReport, DispatchError>
where
    A: AvailabilityWriter + 'static,
    F: FnMut(i64, &AcceptOutcome),
{
    let batch = {
        let dispatcher = Arc::clone(&dispatcher);
        let fnol_id = fnol_id.to_string();
        let candidates = candidates.to_vec();
        tokio::task::spawn_blocking(move || {
            dispatcher.create_offers(&fnol_id, &candidates, ttl_seconds)
        })
        .await
        .map_err(join_error)??
    };

    let contenders: BTreeSet<i64> = candidates.iter().copied().collect();
    let mut attempts = JoinSet::new();
    for surveyor_id in contenders {
        let dispatcher = Arc::clone(&dispatcher);
        let group = batch.offer_group.clone();
        attempts.spawn_blocking(move || {
            dispatcher
                .accept_offer(&group, surveyor_id)
                .map(|outcome| (surveyor_id, outcome))
        });
    }

    let mut winner = None;
    let mut losers = Vec::new();
    while let Some(joined) = attempts.join_next().await {
        let (surveyor_id, outcome) = joined.map_err(join_error)??;
        on_settled(surveyor_id, &outcome);
        match outcome.job_id {
            Some(job_id) if outcome.ok => winner = Some((surveyor_id, job_id)),
            _ => losers.push(surveyor_id),
        }
    }
    losers.sort_unstable();

    Ok(RaceReport {
        offer_group: batch.offer_group,
        winner,
        losers,
    })
}

fn join_error(err: tokio::task::JoinError) -> DispatchError {
    DispatchError::Task(err.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::dispatch::testing::sqlite_dispatcher;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn race_has_exactly_one_winner() {
        let (_dir, dispatcher) = sqlite_dispatcher();
        let dispatcher = Arc::new(dispatcher);
        let candidates: Vec<i64> = (1..=8).collect();

        let mut settled = 0;
        let report = race_offer(Arc::clone(&dispatcher), "FNOL-DEMO", &candidates, 300, |_, _| {
            settled += 1
        })
        .await
        .unwrap();

        assert_eq!(settled, 8);
        let (winner, job_id) = report.winner.unwrap();
        assert_eq!(report.losers.len(), 7);
        assert!(!report.losers.contains(&winner));

        let job = dispatcher.find_assignment(job_id).unwrap().unwrap();
        assert_eq!(job.surveyor_id, winner);
        assert_eq!(job.offer_group, report.offer_group);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn repeated_candidates_race_once() {
        let (_dir, dispatcher) = sqlite_dispatcher();
        let mut settled = Vec::new();
        let report = race_offer(Arc::new(dispatcher), "FNOL-DUP", &[1, 1, 1, 2], 300, |id, _| {
            settled.push(id)
        })
        .await
        .unwrap();

        settled.sort_unstable();
        assert_eq!(settled, vec![1, 2]);
        let (winner, _) = report.winner.unwrap();
        assert_eq!(report.losers.len(), 1);
        assert!(!report.losers.contains(&winner));
    }

    #[tokio::test]
    async fn panicked_attempt_is_a_task_failure() {
        let err = tokio::task::spawn_blocking(|| -> i64 { panic!("attempt died") })
            .await
            .map_err(join_error)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Task(_)));
        assert_eq!(err.kind(), crate::error::FailureKind::System);
    }

    #[tokio::test]
    async fn race_rejects_empty_candidates() {
        let (_dir, dispatcher) = sqlite_dispatcher();
        let err = race_offer(Arc::new(dispatcher), "FNOL-DEMO", &[], 300, |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
    }
}
