use types::{
    combined::SignedBeaconBlock,
    phase0::{containers::AttestationData, primitives::{Slot, ValidatorIndex}},
    preset::Preset,
};

/// Callbacks into the validator duty tracking system.
///
/// The actual implementation lives outside this crate; the consensus core
/// only reports what landed on chain.
pub trait ValidatorMonitor<P: Preset> {
    fn register_beacon_block(&self, block: &SignedBeaconBlock<P>);

    fn register_attestation_in_block(
        &self,
        data: AttestationData,
        attesting_indices: &[ValidatorIndex],
    );

    fn register_sync_aggregate_in_block(&self, slot: Slot, participant_count: usize);
}

#[derive(Clone, Copy, Default)]
pub struct NullValidatorMonitor;

impl<P: Preset> ValidatorMonitor<P> for NullValidatorMonitor {
    fn register_beacon_block(&self, _block: &SignedBeaconBlock<P>) {}

    fn register_attestation_in_block(
        &self,
        _data: AttestationData,
        _attesting_indices: &[ValidatorIndex],
    ) {
    }

    fn register_sync_aggregate_in_block(&self, _slot: Slot, _participant_count: usize) {}
}
