//! A thin trait seam for alternative consignment-arrival policies.
//!
//! The orchestrator in `border_bench` only needs "give me the next
//! consignment"; everything else (parameter synthesis, CSV translation) is
//! pure `border_world` logic with no state of its own. This seam exists so a
//! future arrival policy — say, consignments replayed from a fixed schedule
//! interleaved with synthetic ones — can be swapped in without touching the
//! orchestrator, mirroring the `CommandSource` split the teacher used to
//! separate autopilot behavior from scripted replay.

use border_core::{Consignment, ConfigError};
use border_world::{generate_from_parameters, GeneratorParams};

pub trait ArrivalSource {
    /// Produces the next consignment, `Ok(None)` once the source is
    /// exhausted, or `Err` if the source's configuration is invalid. A
    /// configuration error is never conflated with exhaustion — the caller
    /// must treat it as fatal, not as "no more consignments" (spec §7).
    fn next_consignment(&mut self, rng: &mut dyn rand::RngCore) -> Result<Option<Consignment>, ConfigError>;
}

/// Synthesizes consignments from parameters indefinitely (spec §2 item 3,
/// from-parameters branch).
pub struct GeneratorArrivalSource {
    params: GeneratorParams,
}

impl GeneratorArrivalSource {
    #[must_use]
    pub fn new(params: GeneratorParams) -> Self {
        Self { params }
    }
}

impl ArrivalSource for GeneratorArrivalSource {
    fn next_consignment(&mut self, rng: &mut dyn rand::RngCore) -> Result<Option<Consignment>, ConfigError> {
        generate_from_parameters(&self.params, rng).map(Some)
    }
}

/// Replays a fixed, pre-translated list of consignments (spec §2 item 3,
/// from-input-record branch: F280/AQIM rows already read via
/// `border_world::csv_input`). Exhausted once every consignment has been
/// handed out once.
pub struct ScriptedArrivalSource {
    remaining: std::collections::VecDeque<Consignment>,
}

impl ScriptedArrivalSource {
    #[must_use]
    pub fn new(consignments: Vec<Consignment>) -> Self {
        Self { remaining: consignments.into() }
    }
}

impl ArrivalSource for ScriptedArrivalSource {
    fn next_consignment(&mut self, _rng: &mut dyn rand::RngCore) -> Result<Option<Consignment>, ConfigError> {
        Ok(self.remaining.pop_front())
    }
}
