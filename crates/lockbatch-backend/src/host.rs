//! Host-threaded backend.
//!
//! Each step the batch is split into contiguous world ranges, one per
//! worker, and every worker runs all tick phases for its worlds. Workers
//! are scoped threads that join before `advance` returns, so the state is
//! never shared outside the call and no locking is needed.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use lockbatch_core::error::BackendFault;
use lockbatch_core::id::WorldIdx;
use lockbatch_world::tick::{advance_world, initialize_world};
use lockbatch_world::{AdvanceReport, BatchState, Simulation, WorldContext, WorldMut};

use crate::partition::{partition, shards_mut};

/// Fork/join pool over host threads.
pub struct HostThreadedBackend {
    sim: Arc<dyn Simulation>,
    workers: usize,
    auto_reset: bool,
}

/// Which per-world routine a launch runs.
#[derive(Clone, Copy)]
enum Job {
    Initialize,
    Advance { auto_reset: bool },
}

impl HostThreadedBackend {
    /// Create a backend that splits work across `workers` threads.
    pub fn new(sim: Arc<dyn Simulation>, workers: usize, auto_reset: bool) -> Self {
        let workers = workers.max(1);
        tracing::debug!(sim = sim.name(), workers, auto_reset, "host backend ready");
        Self {
            sim,
            workers,
            auto_reset,
        }
    }

    /// Number of worker threads used per step.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Reset every world into its initial state.
    pub fn initialize(&self, state: &mut BatchState, ctx: &WorldContext) -> Result<(), BackendFault> {
        self.run(state, ctx, Job::Initialize).map(|_| ())
    }

    /// Advance every world by one step.
    pub fn advance(&self, state: &mut BatchState, ctx: &WorldContext) -> Result<AdvanceReport, BackendFault> {
        self.run(
            state,
            ctx,
            Job::Advance {
                auto_reset: self.auto_reset,
            },
        )
    }

    fn run(&self, state: &mut BatchState, ctx: &WorldContext, job: Job) -> Result<AdvanceReport, BackendFault> {
        let sim: &dyn Simulation = &*self.sim;
        let mut worlds = state.worlds_mut();
        let ranges = partition(worlds.len(), self.workers);

        if ranges.len() <= 1 {
            return panic::catch_unwind(AssertUnwindSafe(|| run_shard(sim, ctx, &mut worlds, job)))
                .unwrap_or_else(|payload| Err(worker_panicked(0, payload.as_ref())));
        }

        let shards = shards_mut(&mut worlds, &ranges);
        let results: Vec<Result<AdvanceReport, BackendFault>> = thread::scope(|s| {
            let handles: Vec<_> = shards
                .into_iter()
                .enumerate()
                .map(|(worker, shard)| {
                    thread::Builder::new()
                        .name(format!("lockbatch-host-{worker}"))
                        .spawn_scoped(s, move || run_shard(sim, ctx, shard, job))
                })
                .collect();

            handles
                .into_iter()
                .enumerate()
                .map(|(worker, handle)| match handle {
                    Ok(h) => h
                        .join()
                        .unwrap_or_else(|payload| Err(worker_panicked(worker, payload.as_ref()))),
                    Err(e) => Err(BackendFault::WorkerSpawn {
                        reason: format!("worker {worker}: {e}"),
                    }),
                })
                .collect()
        });

        merge_results(results)
    }
}

fn worker_panicked(worker: usize, payload: &(dyn Any + Send)) -> BackendFault {
    let message = panic_message(payload);
    tracing::warn!(worker, %message, "host worker panicked");
    BackendFault::WorkerPanicked { worker, message }
}

/// Run `job` for each world of a shard, stopping at the first failure.
fn run_shard(
    sim: &dyn Simulation,
    ctx: &WorldContext,
    shard: &mut [WorldMut<'_>],
    job: Job,
) -> Result<AdvanceReport, BackendFault> {
    let mut report = AdvanceReport::default();
    for world in shard.iter_mut() {
        match job {
            Job::Initialize => initialize_world(sim, ctx, world)?,
            Job::Advance { auto_reset } => report.record(advance_world(sim, ctx, world, auto_reset)?),
        }
    }
    Ok(report)
}

/// Combine per-worker results into one.
///
/// Simulation faults win over other faults, and among them the lowest
/// world index is reported.
pub(crate) fn merge_results(
    results: impl IntoIterator<Item = Result<AdvanceReport, BackendFault>>,
) -> Result<AdvanceReport, BackendFault> {
    let mut total = AdvanceReport::default();
    let mut first: Option<BackendFault> = None;
    for result in results {
        match result {
            Ok(report) => total.merge(&report),
            Err(fault) => {
                first = Some(match first {
                    None => fault,
                    Some(prev) => lower_fault(prev, fault),
                });
            }
        }
    }
    match first {
        Some(fault) => Err(fault),
        None => Ok(total),
    }
}

fn lower_fault(a: BackendFault, b: BackendFault) -> BackendFault {
    match (failing_world(&a), failing_world(&b)) {
        (Some(wa), Some(wb)) if wb < wa => b,
        (Some(_), _) => a,
        (None, Some(_)) => b,
        (None, None) => a,
    }
}

fn failing_world(fault: &BackendFault) -> Option<WorldIdx> {
    match fault {
        BackendFault::Simulation { world, .. } => Some(*world),
        _ => None,
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockbatch_core::error::SimError;
    use lockbatch_core::id::TickId;
    use lockbatch_test_utils::CounterSim;

    fn sim_fault(world: u32) -> BackendFault {
        BackendFault::Simulation {
            world: WorldIdx(world),
            error: SimError::ExecutionFailed {
                reason: "x".into(),
            },
        }
    }

    #[test]
    fn merge_sums_reports() {
        let a = AdvanceReport {
            stepped: 3,
            ..AdvanceReport::default()
        };
        let b = AdvanceReport {
            stepped: 2,
            terminal: 1,
            ..AdvanceReport::default()
        };
        let total = merge_results([Ok(a), Ok(b)]).unwrap();
        assert_eq!(total.stepped, 5);
        assert_eq!(total.terminal, 1);
    }

    #[test]
    fn merge_reports_lowest_failing_world() {
        let merged = merge_results([Err(sim_fault(9)), Ok(AdvanceReport::default()), Err(sim_fault(4))]);
        assert_eq!(merged, Err(sim_fault(4)));
    }

    #[test]
    fn merge_prefers_simulation_fault_over_panic() {
        let panic = BackendFault::WorkerPanicked {
            worker: 0,
            message: "p".into(),
        };
        assert_eq!(merge_results([Err(panic), Err(sim_fault(6))]), Err(sim_fault(6)));
    }

    #[test]
    fn panic_message_reads_strings() {
        let p: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(p.as_ref()), "static");
        let p: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(p.as_ref()), "owned");
        let p: Box<dyn Any + Send> = Box::new(17u8);
        assert_eq!(panic_message(p.as_ref()), "non-string panic payload");
    }

    #[test]
    fn zero_workers_clamped() {
        let sim: Arc<dyn Simulation> = Arc::new(CounterSim::default());
        let backend = HostThreadedBackend::new(sim, 0, true);
        assert_eq!(backend.workers(), 1);
        let mut state = BatchState::new(backend.sim.layout(), 3).unwrap();
        let ctx = WorldContext {
            seed: 0,
            tick: TickId(1),
        };
        let report = backend.advance(&mut state, &ctx).unwrap();
        assert_eq!(report.stepped, 3);
    }
}
