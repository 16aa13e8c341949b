//! The closed event set fired by the [`Annealer`](crate::annealer::Annealer)
//! cooling loop (spec §4.6). Every event name in spec §4.6 is a variant
//! here; nothing else is added or removed.

/// One point in the cooling loop's lifecycle. `Start`/`Finish` pairs
/// bracket the operation they name; a [`crate::monitor::ProfilerMonitor`]
/// times the interval between a pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    SimulationStart,
    SamplePosteriorStart,
    PrepareSamplingPdfStart,
    PrepareSamplingPdfFinish,
    BetaStart,
    WalkChainsStart,
    ChainAdvanceStart,
    ChainAdvanceFinish,
    VerifyStart,
    VerifyFinish,
    PriorStart,
    PriorFinish,
    DataStart,
    DataFinish,
    PosteriorStart,
    PosteriorFinish,
    AcceptStart,
    AcceptFinish,
    WalkChainsFinish,
    ResampleStart,
    ResampleFinish,
    BetaFinish,
    SamplePosteriorFinish,
    SimulationFinish,
}

impl Event {
    /// Every event in the closed set, in the order spec §4.6 lists them.
    pub const ALL: [Event; 24] = [
        Event::SimulationStart,
        Event::SamplePosteriorStart,
        Event::PrepareSamplingPdfStart,
        Event::PrepareSamplingPdfFinish,
        Event::BetaStart,
        Event::WalkChainsStart,
        Event::ChainAdvanceStart,
        Event::ChainAdvanceFinish,
        Event::VerifyStart,
        Event::VerifyFinish,
        Event::PriorStart,
        Event::PriorFinish,
        Event::DataStart,
        Event::DataFinish,
        Event::PosteriorStart,
        Event::PosteriorFinish,
        Event::AcceptStart,
        Event::AcceptFinish,
        Event::WalkChainsFinish,
        Event::ResampleStart,
        Event::ResampleFinish,
        Event::BetaFinish,
        Event::SamplePosteriorFinish,
        Event::SimulationFinish,
    ];

    /// Short name shared by a Start/Finish pair, used by the profiler to
    /// key its timing table (e.g. `WalkChainsStart`/`WalkChainsFinish`
    /// both report `"walkChains"`).
    pub fn base_name(&self) -> &'static str {
        match self {
            Event::SimulationStart | Event::SimulationFinish => "simulation",
            Event::SamplePosteriorStart | Event::SamplePosteriorFinish => "samplePosterior",
            Event::PrepareSamplingPdfStart | Event::PrepareSamplingPdfFinish => {
                "prepareSamplingPDF"
            }
            Event::BetaStart | Event::BetaFinish => "beta",
            Event::WalkChainsStart | Event::WalkChainsFinish => "walkChains",
            Event::ChainAdvanceStart | Event::ChainAdvanceFinish => "chainAdvance",
            Event::VerifyStart | Event::VerifyFinish => "verify",
            Event::PriorStart | Event::PriorFinish => "prior",
            Event::DataStart | Event::DataFinish => "data",
            Event::PosteriorStart | Event::PosteriorFinish => "posterior",
            Event::AcceptStart | Event::AcceptFinish => "accept",
            Event::ResampleStart | Event::ResampleFinish => "resample",
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(
            self,
            Event::SimulationStart
                | Event::SamplePosteriorStart
                | Event::PrepareSamplingPdfStart
                | Event::BetaStart
                | Event::WalkChainsStart
                | Event::ChainAdvanceStart
                | Event::VerifyStart
                | Event::PriorStart
                | Event::DataStart
                | Event::PosteriorStart
                | Event::AcceptStart
                | Event::ResampleStart
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pair_shares_a_base_name() {
        assert_eq!(Event::WalkChainsStart.base_name(), Event::WalkChainsFinish.base_name());
        assert_eq!(Event::BetaStart.base_name(), Event::BetaFinish.base_name());
    }

    #[test]
    fn all_contains_every_variant_once() {
        assert_eq!(Event::ALL.len(), 24);
        assert!(Event::ALL.iter().any(|e| *e == Event::SimulationStart));
        assert!(Event::ALL.iter().any(|e| *e == Event::SimulationFinish));
    }
}
