use std::sync::Arc;

use anyhow::Result;
use ssz::{ContiguousList, Hc};
use types::{
    altair::beacon_state::BeaconState as AltairBeaconState,
    bellatrix::{
        beacon_state::BeaconState as BellatrixBeaconState,
        containers::ExecutionPayloadHeader,
    },
    config::Config,
    nonstandard::Phase,
    phase0::{beacon_state::BeaconState as Phase0BeaconState, containers::Fork},
    preset::Preset,
};

use crate::accessors;

/// [`upgrade_to_altair`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/altair/fork.md#upgrade_to_altair)
///
/// Validator identities, balances and history carry over unchanged.
/// Participation starts out empty and both sync committees are seeded
/// from the upgraded state.
pub fn upgrade_to_altair<P: Preset>(
    config: &Config,
    pre: Phase0BeaconState<P>,
) -> Result<AltairBeaconState<P>> {
    let epoch = accessors::get_current_epoch(&pre);

    let Phase0BeaconState {
        genesis_time,
        genesis_validators_root,
        slot,
        fork,
        latest_block_header,
        block_roots,
        state_roots,
        historical_roots,
        eth1_data,
        eth1_data_votes,
        eth1_deposit_index,
        validators,
        balances,
        randao_mixes,
        slashings,
        previous_epoch_attestations: _,
        current_epoch_attestations: _,
        justification_bits,
        previous_justified_checkpoint,
        current_justified_checkpoint,
        finalized_checkpoint,
        cache,
    } = pre;

    let fork = Fork {
        previous_version: fork.current_version,
        current_version: config.altair_fork_version,
        epoch,
    };

    let zero_participation = std::iter::repeat(0)
        .take(validators.len())
        .collect::<Vec<_>>();

    let inactivity_scores = std::iter::repeat(0_u64)
        .take(validators.len())
        .collect::<Vec<_>>();

    let mut post = AltairBeaconState {
        genesis_time,
        genesis_validators_root,
        slot,
        fork,
        latest_block_header,
        block_roots,
        state_roots,
        historical_roots,
        eth1_data,
        eth1_data_votes,
        eth1_deposit_index,
        validators,
        balances,
        randao_mixes,
        slashings,
        previous_epoch_participation: ContiguousList::try_from(zero_participation.clone())?.into(),
        current_epoch_participation: ContiguousList::try_from(zero_participation)?.into(),
        justification_bits,
        previous_justified_checkpoint,
        current_justified_checkpoint,
        finalized_checkpoint,
        inactivity_scores: ContiguousList::try_from(inactivity_scores)?.into(),
        current_sync_committee: Arc::default(),
        next_sync_committee: Arc::default(),
        cache,
    };

    // > Fill in sync committees
    // > Note: A duplicate committee is assigned for the current and next committee at the fork
    // > boundary
    let sync_committee = Arc::new(Hc::from(accessors::get_next_sync_committee(&post)?));

    post.current_sync_committee = sync_committee.clone();
    post.next_sync_committee = sync_committee;

    Ok(post)
}

/// [`upgrade_to_bellatrix`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/bellatrix/fork.md#upgrade_to_bellatrix)
#[must_use]
pub fn upgrade_to_bellatrix<P: Preset>(
    config: &Config,
    pre: AltairBeaconState<P>,
) -> BellatrixBeaconState<P> {
    let epoch = accessors::get_current_epoch(&pre);

    let AltairBeaconState {
        genesis_time,
        genesis_validators_root,
        slot,
        fork,
        latest_block_header,
        block_roots,
        state_roots,
        historical_roots,
        eth1_data,
        eth1_data_votes,
        eth1_deposit_index,
        validators,
        balances,
        randao_mixes,
        slashings,
        previous_epoch_participation,
        current_epoch_participation,
        justification_bits,
        previous_justified_checkpoint,
        current_justified_checkpoint,
        finalized_checkpoint,
        inactivity_scores,
        current_sync_committee,
        next_sync_committee,
        cache,
    } = pre;

    let fork = Fork {
        previous_version: fork.current_version,
        current_version: config.version(Phase::Bellatrix),
        epoch,
    };

    BellatrixBeaconState {
        genesis_time,
        genesis_validators_root,
        slot,
        fork,
        latest_block_header,
        block_roots,
        state_roots,
        historical_roots,
        eth1_data,
        eth1_data_votes,
        eth1_deposit_index,
        validators,
        balances,
        randao_mixes,
        slashings,
        previous_epoch_participation,
        current_epoch_participation,
        justification_bits,
        previous_justified_checkpoint,
        current_justified_checkpoint,
        finalized_checkpoint,
        inactivity_scores,
        current_sync_committee,
        next_sync_committee,
        latest_execution_payload_header: ExecutionPayloadHeader::default(),
        cache,
    }
}
