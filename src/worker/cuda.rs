//! The CUDA worker (spec §4.4): a leaf variant, contract-identical to
//! the sequential worker. CUDA kernels are explicitly out of scope
//! (spec §1); this records a `device_id` and otherwise performs the
//! same CPU numerics as `SequentialWorker`, matching "contract-
//! identical to sequential" per spec §4.4 exactly.

use crate::cooling_step::CoolingStep;
use crate::error::Result;
use crate::model::Model;
use crate::sampler::{Sampler, SamplerOps, Tallies};
use crate::worker::{SequentialWorker, Worker};
use rand::RngCore;

pub struct CudaWorker {
    device_id: usize,
    inner: SequentialWorker,
}

impl CudaWorker {
    /// `device_id = rank mod gpus_per_task` (spec §4.4); computed by
    /// [`crate::worker::build_worker`] via
    /// [`crate::worker::device_id_for_rank`] and passed in directly.
    pub fn new(samples: usize, parameters: usize, device_id: usize) -> Self {
        CudaWorker {
            device_id,
            inner: SequentialWorker::new(samples, parameters),
        }
    }

    pub fn device_id(&self) -> usize {
        self.device_id
    }
}

impl Worker for CudaWorker {
    fn start(&mut self, model: &dyn Model, rng: &mut dyn RngCore) {
        self.inner.start(model, rng);
    }

    fn walk(
        &mut self,
        model: &dyn Model,
        sampler: &Sampler,
        rng: &mut dyn RngCore,
    ) -> Result<Tallies> {
        self.inner.walk(model, sampler, rng)
    }

    fn step(&self) -> &CoolingStep {
        self.inner.step()
    }

    fn step_mut(&mut self) -> &mut CoolingStep {
        self.inner.step_mut()
    }

    fn workers(&self) -> usize {
        self.inner.workers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NullModel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn records_device_id_and_behaves_like_sequential() {
        let model = NullModel::new(-1.0, 1.0);
        let mut worker = CudaWorker::new(8, 1, 2);
        let mut rng = StdRng::seed_from_u64(0);
        worker.start(&model, &mut rng);
        assert_eq!(worker.device_id(), 2);
        assert_eq!(worker.workers(), 1);
        assert_eq!(worker.step().samples(), 8);
    }
}
