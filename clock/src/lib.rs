//! Wall-clock to slot mapping and an [`Interval`]-backed slot timer.
//!
//! [`Interval`]s may produce items late, but the delays do not accumulate.
//! It is unclear how [`Interval`]s behave around leap seconds.
//!
//! [`Interval`]: tokio::time::Interval

use core::time::Duration;
use std::time::{SystemTime, SystemTimeError};

use anyhow::Result;
use futures::stream::{Stream, StreamExt as _};
use helper_functions::misc;
use thiserror::Error;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use types::{
    config::Config,
    phase0::{
        consts::GENESIS_SLOT,
        primitives::{Epoch, Slot, UnixSeconds},
    },
    preset::Preset,
};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Tick {
    pub slot: Slot,
}

impl Tick {
    #[must_use]
    pub const fn start_of_slot(slot: Slot) -> Self {
        Self { slot }
    }

    #[must_use]
    pub fn epoch<P: Preset>(self) -> Epoch {
        misc::compute_epoch_at_slot::<P>(self.slot)
    }

    #[must_use]
    pub fn is_start_of_epoch<P: Preset>(self) -> bool {
        misc::is_epoch_start::<P>(self.slot)
    }
}

/// Maps wall-clock time to slots for one chain.
#[derive(Clone, Copy, Debug)]
pub struct BeaconClock {
    genesis_time: UnixSeconds,
    seconds_per_slot: core::num::NonZeroU64,
}

impl BeaconClock {
    #[must_use]
    pub fn new(config: &Config, genesis_time: UnixSeconds) -> Self {
        Self {
            genesis_time,
            seconds_per_slot: config.seconds_per_slot,
        }
    }

    pub fn now(&self) -> Result<UnixSeconds, Error> {
        let duration = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_err(Error::TimeBeforeUnixEpoch)?;

        Ok(duration.as_secs())
    }

    /// Converts a timestamp to a slot.
    ///
    /// The boolean is false before genesis, in which case the slot is
    /// [`GENESIS_SLOT`].
    #[must_use]
    pub fn slot_at(&self, time: UnixSeconds) -> (bool, Slot) {
        match time.checked_sub(self.genesis_time) {
            Some(since_genesis) => {
                (true, GENESIS_SLOT + since_genesis / self.seconds_per_slot)
            }
            None => (false, GENESIS_SLOT),
        }
    }

    pub fn current_slot(&self) -> Result<(bool, Slot), Error> {
        Ok(self.slot_at(self.now()?))
    }

    #[must_use]
    pub fn start_of(&self, slot: Slot) -> UnixSeconds {
        self.genesis_time + (slot - GENESIS_SLOT) * self.seconds_per_slot.get()
    }

    pub fn duration_until_next_slot(&self) -> Result<Duration, Error> {
        let now = self.now()?;
        let (_, slot) = self.slot_at(now);
        let next_start = self.start_of(slot + 1);

        Ok(Duration::from_secs(next_start.saturating_sub(now)))
    }
}

/// A stream of [`Tick`]s at slot starts, beginning with the next slot.
pub fn ticks(clock: BeaconClock) -> Result<impl Stream<Item = Tick>, Error> {
    let (_, current_slot) = clock.current_slot()?;
    let until_next_slot = clock.duration_until_next_slot()?;
    let slot_duration = Duration::from_secs(clock.seconds_per_slot.get());

    let mut interval = interval_at(Instant::now() + until_next_slot, slot_duration);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let first_slot = current_slot + 1;

    Ok(IntervalStream::new(interval)
        .zip(futures::stream::iter(first_slot..))
        .map(|(_, slot)| Tick::start_of_slot(slot)))
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("system time is before the Unix epoch")]
    TimeBeforeUnixEpoch(#[source] SystemTimeError),
}

#[cfg(test)]
mod tests {
    use test_case::test_case;
    use types::preset::Minimal;

    use super::*;

    fn clock() -> BeaconClock {
        BeaconClock::new(&Config::minimal(), 1_000)
    }

    #[test_case(999, false, 0)]
    #[test_case(1_000, true, 0)]
    #[test_case(1_005, true, 0)]
    #[test_case(1_006, true, 1)]
    #[test_case(1_060, true, 10)]
    fn timestamps_map_to_slots(time: UnixSeconds, after_genesis: bool, slot: Slot) {
        assert_eq!(clock().slot_at(time), (after_genesis, slot));
    }

    #[test]
    fn slot_starts_invert_slot_at() {
        let clock = clock();

        for slot in [0, 1, 17, 1_000_000] {
            assert_eq!(clock.slot_at(clock.start_of(slot)), (true, slot));
        }
    }

    #[test]
    fn ticks_know_their_epochs() {
        let tick = Tick::start_of_slot(17);

        assert_eq!(tick.epoch::<Minimal>(), 2);
        assert!(!tick.is_start_of_epoch::<Minimal>());
        assert!(Tick::start_of_slot(16).is_start_of_epoch::<Minimal>());
    }
}
