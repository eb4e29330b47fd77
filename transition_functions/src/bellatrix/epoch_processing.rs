use anyhow::Result;
use types::{bellatrix::beacon_state::BeaconState, config::Config, preset::Preset};

use crate::altair::epoch_processing::{self, PenaltyParams};

/// Identical to Altair epoch processing except for the penalty parameters.
pub fn process_epoch<P: Preset>(config: &Config, state: &mut BeaconState<P>) -> Result<()> {
    epoch_processing::process_epoch(config, state, PenaltyParams::bellatrix::<P>())
}

#[cfg(test)]
mod tests {
    use types::nonstandard::Phase;

    use crate::fixtures;

    use super::*;

    #[test]
    fn no_rewards_or_penalties_are_applied_at_the_genesis_epoch() {
        let config = fixtures::config_for(Phase::Bellatrix);
        let mut state = fixtures::bellatrix_state_at(&config, 7);
        let balances_before = fixtures::balances(&state);

        process_epoch(&config, &mut state).expect("the genesis epoch can be processed");

        assert_eq!(fixtures::balances(&state), balances_before);
    }

    #[test]
    fn missing_participation_is_penalized_after_the_genesis_epoch() {
        let config = fixtures::config_for(Phase::Bellatrix);
        let mut state = fixtures::bellatrix_state_at(&config, 15);
        let balances_before = fixtures::balances(&state);

        process_epoch(&config, &mut state).expect("the epoch can be processed");

        for (after, before) in fixtures::balances(&state).iter().zip(balances_before) {
            assert!(*after < before);
        }
    }
}
