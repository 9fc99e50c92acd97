//! The event reducer.

use jobwatch_common::{
    Job, JobState, JobTable, MinionInfo, MinionResult, MinionTable, ReducerConfig,
};
use jobwatch_events::{EventKind, JobReturnData, SaltEvent};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ReduceError;
use crate::sink::SnapshotSink;

/// A full table as pushed to observers: `{"jobs": {...}}` or
/// `{"minions": {...}}`.
#[derive(Debug, Clone, Copy, Serialize)]
pub enum Snapshot<'a> {
    #[serde(rename = "jobs")]
    Jobs(&'a JobTable),
    #[serde(rename = "minions")]
    Minions(&'a MinionTable),
}

/// Folds job events into an in-memory projection and publishes the whole
/// affected table after every change.
///
/// Classify → reduce → publish. Events are applied one at a time; the
/// reducer is not shared between tasks.
pub struct EventReducer<K> {
    config: ReducerConfig,
    jobs: JobTable,
    minions: MinionTable,
    sink: K,
}

impl<K> EventReducer<K>
where
    K: SnapshotSink,
{
    pub fn new(config: ReducerConfig, sink: K) -> Self {
        Self {
            config,
            jobs: JobTable::new(),
            minions: MinionTable::new(),
            sink,
        }
    }

    /// Apply one event.
    ///
    /// Tags that are not job `new`/`ret` events are ignored without
    /// publishing. Every applied event publishes exactly the tables it
    /// touched.
    pub fn process(&mut self, event: &SaltEvent) -> Result<(), ReduceError> {
        match event.kind()? {
            EventKind::NewJob => self.new_job(event),
            EventKind::JobReturn { jid, mid } => {
                let data = event
                    .job_return_data()
                    .map_err(|source| ReduceError::MissingField {
                        tag: event.tag.clone(),
                        source,
                    })?;
                self.job_return(jid, mid, &data)?;
                if self.config.track_grains && data.is_grains() {
                    self.update_minion(mid, data.ret)?;
                }
                Ok(())
            }
            EventKind::Ignored => {
                debug!(tag = event.tag.as_str(), "Ignoring event");
                Ok(())
            }
        }
    }

    /// Serialize one table and hand it to the sink.
    pub fn publish(&self, snapshot: Snapshot<'_>) -> Result<(), ReduceError> {
        let payload = serde_json::to_string(&snapshot).map_err(ReduceError::Serialize)?;
        self.sink.send(payload)?;
        Ok(())
    }

    /// Publish the current jobs table, and the minions table when grains are
    /// tracked. Used to prime an observer that attaches mid-stream.
    pub fn publish_all(&self) -> Result<(), ReduceError> {
        self.publish(Snapshot::Jobs(&self.jobs))?;
        if self.config.track_grains {
            self.publish(Snapshot::Minions(&self.minions))?;
        }
        Ok(())
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    pub fn job(&self, jid: &str) -> Option<&Job> {
        self.jobs.get(jid)
    }

    pub fn minions(&self) -> &MinionTable {
        &self.minions
    }

    pub fn config(&self) -> &ReducerConfig {
        &self.config
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    fn new_job(&mut self, event: &SaltEvent) -> Result<(), ReduceError> {
        let data = event
            .new_job_data()
            .map_err(|source| ReduceError::MissingField {
                tag: event.tag.clone(),
                source,
            })?;

        let prefill = self.config.track_completion;
        let minions = data
            .minions
            .into_iter()
            .map(|mid| (mid, MinionResult::pending(prefill)))
            .collect();

        let jid = data.jid;
        let job = Job {
            jid: jid.clone(),
            start_time: data.stamp,
            minions,
            fun: data.fun,
            tgt: data.tgt,
            tgt_type: data.tgt_type,
            state: JobState::Running,
        };

        debug!(
            jid = jid.as_str(),
            fun = job.fun.as_str(),
            minions = job.minions.len(),
            "New job"
        );
        if self.jobs.insert(jid.clone(), job).is_some() {
            debug!(jid = jid.as_str(), "Replaced existing job");
        }
        self.evict_overflow(&jid);

        self.publish(Snapshot::Jobs(&self.jobs))
    }

    fn job_return(&mut self, jid: &str, mid: &str, data: &JobReturnData) -> Result<(), ReduceError> {
        let track_completion = self.config.track_completion;

        let job = self.jobs.get_mut(jid).ok_or_else(|| ReduceError::UnknownJob {
            jid: jid.to_string(),
            mid: mid.to_string(),
        })?;
        let minion = job
            .minions
            .get_mut(mid)
            .ok_or_else(|| ReduceError::UnknownMinion {
                jid: jid.to_string(),
                mid: mid.to_string(),
            })?;

        minion.ret = Some(data.ret.clone());
        minion.retcode = Some(data.retcode);
        minion.success = Some(data.success);

        debug!(
            jid,
            mid,
            retcode = data.retcode,
            success = data.success,
            pending = job.minions.values().filter(|m| !m.has_returned()).count(),
            "Job return"
        );

        if track_completion && job.state == JobState::Running && job.all_succeeded() {
            job.state = JobState::Complete;
            info!(jid, fun = job.fun.as_str(), "Job complete");
        }

        self.publish(Snapshot::Jobs(&self.jobs))
    }

    fn update_minion(&mut self, mid: &str, grains: Value) -> Result<(), ReduceError> {
        let info = self
            .minions
            .entry(mid.to_string())
            .or_insert_with(|| MinionInfo { grains: Value::Null });
        info.grains = grains;

        debug!(mid, "Updated grains");
        self.publish(Snapshot::Minions(&self.minions))
    }

    /// Drop the oldest jobs (smallest jids) beyond the configured bound.
    /// `keep` is the job just inserted and is never evicted.
    fn evict_overflow(&mut self, keep: &str) {
        let Some(max) = self.config.max_jobs else {
            return;
        };
        while self.jobs.len() > max {
            let Some(jid) = self.jobs.keys().find(|jid| jid.as_str() != keep).cloned() else {
                break;
            };
            self.jobs.remove(&jid);
            debug!(jid = jid.as_str(), max, "Evicted job");
        }
    }
}
