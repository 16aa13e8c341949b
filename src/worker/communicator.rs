//! The transport abstraction the distributed worker runs over (spec
//! §4.4, §9 "RNG stream partitioning"/"mutable shared state"). MPI
//! binding mechanics are explicitly out of scope (spec §1, same
//! footing as GSL/BLAS/CUDA), and no MPI crate appears anywhere in the
//! retrieval pack to ground a real binding choice on; `LocalCommunicator`
//! is an in-process stand-in that reproduces the blocking
//! broadcast/gather/all-reduce contract over simulated ranks so the
//! rank-seed formula and collect/partition semantics are fully
//! testable. A native-MPI `Communicator` could be dropped in later
//! without touching `DistributedWorker`.

use crate::cooling_step::CoolingStep;
use crate::sampler::Tallies;
use nalgebra::DMatrix;
use std::sync::{Arc, Barrier, Mutex};

/// Collective operations a distributed worker needs: broadcast of
/// scalar/matrix state from the manager (rank 0), gather of every
/// rank's slice to the manager, and a sum all-reduce of tallies.
pub trait Communicator: Send + Sync {
    fn rank(&self) -> usize;
    fn ranks(&self) -> usize;

    fn is_manager(&self) -> bool {
        self.rank() == 0
    }

    /// Blocking broadcast of a scalar from the manager to every rank.
    fn broadcast_f64(&self, value: f64) -> f64;

    /// Blocking broadcast of a matrix from the manager to every rank.
    fn broadcast_matrix(&self, value: &DMatrix<f64>) -> DMatrix<f64>;

    /// Blocking gather of every rank's local step into one assembled
    /// step, concatenated in rank order. Only the manager's return
    /// value is meaningful; every rank still calls this (it is a
    /// collective operation).
    fn gather(&self, local: &CoolingStep) -> CoolingStep;

    /// Blocking scatter: the manager splits `global` (if `Some`, only
    /// on the manager) into `local_samples`-sized row slices in rank
    /// order and every rank receives its own.
    fn scatter(&self, global: Option<&CoolingStep>, local_samples: usize) -> CoolingStep;

    /// Blocking sum all-reduce of per-rank tallies.
    fn all_reduce_sum(&self, local: Tallies) -> Tallies;
}

struct SharedState {
    barrier: Barrier,
    scalar: Mutex<Option<f64>>,
    matrix: Mutex<Option<DMatrix<f64>>>,
    gather_slots: Mutex<Vec<Option<CoolingStep>>>,
    scatter_slots: Mutex<Vec<Option<CoolingStep>>>,
    tally_slots: Mutex<Vec<Option<Tallies>>>,
}

/// An in-process `Communicator` over `ranks` simulated participants
/// sharing one barrier-synchronized collective-operation buffer.
/// `new_group` hands back one handle per rank; each must be driven
/// from its own concurrent task (see `DistributedWorker`) since every
/// collective blocks until all ranks have called it.
pub struct LocalCommunicator {
    rank: usize,
    ranks: usize,
    shared: Arc<SharedState>,
}

impl LocalCommunicator {
    pub fn new_group(ranks: usize) -> Vec<LocalCommunicator> {
        assert!(ranks >= 1, "a communicator group needs at least one rank");
        let shared = Arc::new(SharedState {
            barrier: Barrier::new(ranks),
            scalar: Mutex::new(None),
            matrix: Mutex::new(None),
            gather_slots: Mutex::new((0..ranks).map(|_| None).collect()),
            scatter_slots: Mutex::new((0..ranks).map(|_| None).collect()),
            tally_slots: Mutex::new((0..ranks).map(|_| None).collect()),
        });
        (0..ranks)
            .map(|rank| LocalCommunicator {
                rank,
                ranks,
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn ranks(&self) -> usize {
        self.ranks
    }

    fn broadcast_f64(&self, value: f64) -> f64 {
        if self.is_manager() {
            *self.shared.scalar.lock().unwrap() = Some(value);
        }
        self.shared.barrier.wait();
        let v = self
            .shared
            .scalar
            .lock()
            .unwrap()
            .expect("manager sets the broadcast scalar before any rank reads it");
        self.shared.barrier.wait();
        v
    }

    fn broadcast_matrix(&self, value: &DMatrix<f64>) -> DMatrix<f64> {
        if self.is_manager() {
            *self.shared.matrix.lock().unwrap() = Some(value.clone());
        }
        self.shared.barrier.wait();
        let v = self
            .shared
            .matrix
            .lock()
            .unwrap()
            .clone()
            .expect("manager sets the broadcast matrix before any rank reads it");
        self.shared.barrier.wait();
        v
    }

    fn gather(&self, local: &CoolingStep) -> CoolingStep {
        {
            let mut slots = self.shared.gather_slots.lock().unwrap();
            slots[self.rank] = Some(local.clone());
        }
        self.shared.barrier.wait();
        let assembled = {
            let mut slots = self.shared.gather_slots.lock().unwrap();
            let parts: Vec<CoolingStep> = slots.iter_mut().map(|s| s.take().unwrap()).collect();
            concatenate(&parts)
        };
        self.shared.barrier.wait();
        assembled
    }

    fn scatter(&self, global: Option<&CoolingStep>, local_samples: usize) -> CoolingStep {
        let _ = local_samples;
        if self.is_manager() {
            let global = global.expect("the manager must supply the global step to scatter");
            let counts = crate::worker::partition_counts(global.samples(), self.ranks);
            let mut slots = self.shared.scatter_slots.lock().unwrap();
            let mut offset = 0;
            for (rank, count) in counts.into_iter().enumerate() {
                slots[rank] = Some(slice_rows(global, offset, count));
                offset += count;
            }
        }
        self.shared.barrier.wait();
        let mine = {
            let mut slots = self.shared.scatter_slots.lock().unwrap();
            slots[self.rank]
                .take()
                .expect("manager scatters a slice for every rank")
        };
        self.shared.barrier.wait();
        mine
    }

    fn all_reduce_sum(&self, local: Tallies) -> Tallies {
        {
            let mut slots = self.shared.tally_slots.lock().unwrap();
            slots[self.rank] = Some(local);
        }
        self.shared.barrier.wait();
        let total = {
            let slots = self.shared.tally_slots.lock().unwrap();
            slots
                .iter()
                .fold(Tallies::default(), |acc, t| acc.combine(t.as_ref().unwrap()))
        };
        self.shared.barrier.wait();
        total
    }
}

fn slice_rows(step: &CoolingStep, start: usize, count: usize) -> CoolingStep {
    let parameters = step.parameters();
    let mut out = CoolingStep::zeros(count, parameters);
    out.beta = step.beta;
    out.sigma = step.sigma.clone();
    out.iteration = step.iteration;
    for i in 0..count {
        for j in 0..parameters {
            out.theta[(i, j)] = step.theta[(start + i, j)];
        }
        out.prior[i] = step.prior[start + i];
        out.data[i] = step.data[start + i];
        out.posterior[i] = step.posterior[start + i];
    }
    out
}

fn concatenate(parts: &[CoolingStep]) -> CoolingStep {
    let parameters = parts[0].parameters();
    let total_samples: usize = parts.iter().map(|p| p.samples()).sum();
    let mut out = CoolingStep::zeros(total_samples, parameters);
    out.beta = parts[0].beta;
    out.sigma = parts[0].sigma.clone();
    out.iteration = parts[0].iteration;
    let mut offset = 0;
    for part in parts {
        for i in 0..part.samples() {
            for j in 0..parameters {
                out.theta[(offset + i, j)] = part.theta[(i, j)];
            }
            out.prior[offset + i] = part.prior[i];
            out.data[offset + i] = part.data[i];
            out.posterior[offset + i] = part.posterior[i];
        }
        offset += part.samples();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn broadcast_reaches_every_rank() {
        let group = LocalCommunicator::new_group(4);
        let handles: Vec<_> = group
            .into_iter()
            .map(|comm| thread::spawn(move || comm.broadcast_f64(2.5)))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 2.5);
        }
    }

    #[test]
    fn gather_concatenates_in_rank_order() {
        let group = LocalCommunicator::new_group(3);
        let handles: Vec<_> = group
            .into_iter()
            .enumerate()
            .map(|(rank, comm)| {
                thread::spawn(move || {
                    let mut local = CoolingStep::zeros(2, 1);
                    local.theta[(0, 0)] = rank as f64;
                    local.theta[(1, 0)] = rank as f64 + 0.5;
                    comm.gather(&local)
                })
            })
            .collect();
        let results: Vec<CoolingStep> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for assembled in &results {
            assert_eq!(assembled.samples(), 6);
            assert_eq!(assembled.theta[(0, 0)], 0.0);
            assert_eq!(assembled.theta[(2, 0)], 1.0);
            assert_eq!(assembled.theta[(5, 0)], 2.5);
        }
    }

    #[test]
    fn all_reduce_sum_combines_every_rank() {
        let group = LocalCommunicator::new_group(3);
        let handles: Vec<_> = group
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    comm.all_reduce_sum(Tallies {
                        accepted: 1,
                        rejected: 2,
                        unlikely: 3,
                    })
                })
            })
            .collect();
        for h in handles {
            let total = h.join().unwrap();
            assert_eq!(total.accepted, 3);
            assert_eq!(total.rejected, 6);
            assert_eq!(total.unlikely, 9);
        }
    }
}
