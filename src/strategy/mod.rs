pub mod allow_list;
pub mod balance_poller;
pub mod correlator;
pub mod dedup;
pub mod exit_controller;
pub mod filter_pipeline;
pub mod manual_override;
pub mod orchestrator;
pub mod position;
pub mod position_gate;
pub mod price_oracle;
pub mod retry;
pub mod safety_checks;

#[cfg(test)]
pub(crate) mod test_support;

pub use allow_list::AllowList;
pub use balance_poller::BalancePoller;
pub use correlator::{MatchedPool, PoolCorrelator};
pub use dedup::{DedupRegistry, SettledMintMarker};
pub use exit_controller::{ExitController, ExitOutcome, ExitSettings, ExitTrigger, PositionDisposer};
pub use filter_pipeline::{
    CandidateContext, FilterPipeline, FilterVerdict, PipelineDecision, PipelineSettings, PoolFilter,
    SafetyChecks,
};
pub use manual_override::ManualOverride;
pub use orchestrator::{
    LifecycleOrchestrator, OrchestratorParts, OrchestratorSettings, ProcessOutcome, SwapDisposer,
};
pub use position::{AcquisitionStatus, LifecycleError, LifecycleState, TrackedPosition, TradeRecord};
pub use position_gate::{GatePermit, PositionGate};
pub use price_oracle::{PoolPriceOracle, PriceOracle, constant_product_out};
pub use retry::{Attempt, RetryOutcome, RetryPolicy};
pub use safety_checks::{
    CheckOutcome, ImmutableMetadataCheck, LpBurnedCheck, MintRenouncedCheck, SafetyCheck,
    SocialPresenceCheck,
};
