use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::Dispatcher;
use crate::availability::AvailabilityWriter;
use crate::error::DispatchError;
use crate::store::assignments;

impl<A: AvailabilityWriter> Dispatcher<A> {
    /// Mark an ASSIGNED job COMPLETED.
    ///
    /// Returns `false` (not an error) when the job is missing or no longer
    /// ASSIGNED, so repeated calls are harmless.
    pub fn complete_job(&self, job_id: i64) -> Result<bool, DispatchError> {
        self.complete_job_at(job_id, Utc::now())
    }

    pub fn complete_job_at(&self, job_id: i64, now: DateTime<Utc>) -> Result<bool, DispatchError> {
        let conn = self.store.connect()?;
        let completed = assignments::complete(&conn, job_id, now)? == 1;
        if completed {
            info!(job_id, "job completed");
        } else {
            debug!(job_id, "completion ignored");
        }
        Ok(completed)
    }

    /// Why `complete_job` would refuse `job_id`, if it would.
    pub fn completion_refusal(&self, job_id: i64) -> Result<Option<DispatchError>, DispatchError> {
        let Some(job) = self.find_assignment(job_id)? else {
            return Ok(Some(DispatchError::AssignmentNotFound(job_id)));
        };
        if job.status.is_terminal() {
            return Ok(Some(DispatchError::AssignmentTerminal {
                job_id,
                status: job.status.to_string(),
            }));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use crate::dispatch::testing::sqlite_dispatcher;
    use crate::error::DispatchError;
    use crate::model::AssignmentStatus;

    #[test]
    fn completes_once() {
        let (_dir, dispatcher) = sqlite_dispatcher();
        let batch = dispatcher.create_offers("FNOL-C1", &[1], 300).unwrap();
        let job_id = dispatcher.accept_offer(&batch.offer_group, 1).unwrap().job_id.unwrap();

        assert!(dispatcher.completion_refusal(job_id).unwrap().is_none());
        assert!(dispatcher.complete_job(job_id).unwrap());
        assert!(!dispatcher.complete_job(job_id).unwrap());

        let job = dispatcher.find_assignment(job_id).unwrap().unwrap();
        assert_eq!(job.status, AssignmentStatus::Completed);
        assert!(job.completed_at.is_some());
        assert!(matches!(
            dispatcher.completion_refusal(job_id).unwrap(),
            Some(DispatchError::AssignmentTerminal { .. })
        ));
    }

    #[test]
    fn missing_job_is_not_an_error() {
        let (_dir, dispatcher) = sqlite_dispatcher();
        assert!(!dispatcher.complete_job(404).unwrap());
        assert!(matches!(
            dispatcher.completion_refusal(404).unwrap(),
            Some(DispatchError::AssignmentNotFound(404))
        ));
    }

    #[test]
    fn cancelled_job_cannot_complete() {
        let (_dir, dispatcher) = sqlite_dispatcher();
        let batch = dispatcher.create_offers("FNOL-C2", &[1], 300).unwrap();
        let job_id = dispatcher.accept_offer(&batch.offer_group, 1).unwrap().job_id.unwrap();

        let conn = dispatcher.store().connect().unwrap();
        conn.execute(
            "UPDATE job_assignment SET status = 'CANCELLED' WHERE id = ?1",
            [job_id],
        )
        .unwrap();

        assert!(!dispatcher.complete_job(job_id).unwrap());
        let job = dispatcher.find_assignment(job_id).unwrap().unwrap();
        assert_eq!(job.status, AssignmentStatus::Cancelled);
        assert!(job.completed_at.is_none());
    }
}
