use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use log::debug;
use types::{
    combined::SignedBeaconBlock,
    phase0::primitives::{Slot, H256},
    preset::Preset,
};

#[derive(Clone, Copy, Debug)]
pub struct QuarantineConfig {
    /// The maximum number of orphans kept. The least recently added orphan
    /// is evicted when the limit is reached.
    pub max_orphans: usize,
}

impl Default for QuarantineConfig {
    fn default() -> Self {
        Self { max_orphans: 256 }
    }
}

/// Holds blocks that cannot be processed yet and remembers branches that
/// never will be.
///
/// - `missing`: roots advertised by peers but not yet received.
/// - `orphans`: blocks whose parent is unknown, waiting for it to arrive.
/// - `unviable`: roots descending from branches that can never be canonical.
pub struct Quarantine<P: Preset> {
    config: QuarantineConfig,
    missing: HashMap<H256, MissingBlock>,
    orphans: HashMap<H256, Arc<SignedBeaconBlock<P>>>,
    orphan_order: VecDeque<H256>,
    unviable: HashSet<H256>,
}

#[derive(Clone, Copy, Default, Debug)]
struct MissingBlock {
    pub tries: usize,
}

impl<P: Preset> Default for Quarantine<P> {
    fn default() -> Self {
        Self::new(QuarantineConfig::default())
    }
}

impl<P: Preset> Quarantine<P> {
    #[must_use]
    pub fn new(config: QuarantineConfig) -> Self {
        Self {
            config,
            missing: HashMap::new(),
            orphans: HashMap::new(),
            orphan_order: VecDeque::new(),
            unviable: HashSet::new(),
        }
    }

    /// Records that a peer advertised a block this node does not have.
    pub fn add_missing(&mut self, root: H256) {
        if self.orphans.contains_key(&root) || self.unviable.contains(&root) {
            return;
        }

        self.missing.entry(root).or_default().tries += 1;
    }

    pub fn remove_missing(&mut self, root: H256) {
        self.missing.remove(&root);
    }

    /// Roots worth requesting from peers, most attempted first.
    #[must_use]
    pub fn missing_roots(&self) -> Vec<H256> {
        let mut roots = self.missing.iter().collect::<Vec<_>>();
        roots.sort_by_key(|(_, missing)| core::cmp::Reverse(missing.tries));
        roots.into_iter().map(|(root, _)| *root).collect()
    }

    /// Holds a block until its parent arrives.
    ///
    /// Returns false when the block was dropped instead: blocks at or below
    /// the finalized slot can never be applied, descendants of unviable
    /// branches are recorded as unviable themselves, and when the orphan
    /// store is full the oldest entry makes room.
    pub fn add_orphan(
        &mut self,
        finalized_slot: Slot,
        block: Arc<SignedBeaconBlock<P>>,
    ) -> bool {
        let root = block.block_root();
        let parent_root = block.parent_root();

        if block.message_slot() <= finalized_slot {
            return false;
        }

        if self.unviable.contains(&parent_root) {
            self.mark_unviable(root);
            return false;
        }

        if self.orphans.contains_key(&root) {
            return true;
        }

        while self.orphans.len() >= self.config.max_orphans {
            let Some(oldest) = self.orphan_order.pop_front() else {
                break;
            };

            if self.orphans.remove(&oldest).is_some() {
                debug!("orphan store is full; dropped oldest orphan {oldest}");
            }
        }

        self.missing.remove(&root);
        self.add_missing(parent_root);
        self.orphans.insert(root, block);
        self.orphan_order.push_back(root);

        true
    }

    /// Removes and returns all orphans waiting for `parent_root`.
    #[must_use]
    pub fn pop_children(&mut self, parent_root: H256) -> Vec<Arc<SignedBeaconBlock<P>>> {
        let children = self
            .orphans
            .iter()
            .filter(|(_, block)| block.parent_root() == parent_root)
            .map(|(root, _)| *root)
            .collect::<Vec<_>>();

        children
            .into_iter()
            .filter_map(|root| {
                self.orphan_order.retain(|ordered| *ordered != root);
                self.orphans.remove(&root)
            })
            .collect()
    }

    pub fn remove_orphan(&mut self, root: H256) {
        if self.orphans.remove(&root).is_some() {
            self.orphan_order.retain(|ordered| *ordered != root);
        }
    }

    /// Records a root as unviable and propagates unviability to every orphan
    /// that descends from it.
    pub fn mark_unviable(&mut self, root: H256) {
        if !self.unviable.insert(root) {
            return;
        }

        self.missing.remove(&root);

        // Unviability is transitive over stored orphans.
        let descendants = self
            .orphans
            .iter()
            .filter(|(_, block)| block.parent_root() == root)
            .map(|(orphan_root, _)| *orphan_root)
            .collect::<Vec<_>>();

        for descendant in descendants {
            self.remove_orphan(descendant);
            self.mark_unviable(descendant);
        }
    }

    #[must_use]
    pub fn is_unviable(&self, root: H256) -> bool {
        self.unviable.contains(&root)
    }

    #[must_use]
    pub fn orphan_count(&self) -> usize {
        self.orphans.len()
    }

    #[must_use]
    pub fn contains_orphan(&self, root: H256) -> bool {
        self.orphans.contains_key(&root)
    }
}

#[cfg(test)]
mod tests {
    use types::{
        combined::SignedBeaconBlock,
        phase0::containers::SignedBeaconBlock as Phase0SignedBeaconBlock,
        preset::Minimal,
    };

    use super::*;

    fn block(slot: Slot, parent_root: H256) -> Arc<SignedBeaconBlock<Minimal>> {
        let mut block = Phase0SignedBeaconBlock::<Minimal>::default();
        block.message.slot = slot;
        block.message.parent_root = parent_root;
        Arc::new(SignedBeaconBlock::Phase0(block))
    }

    #[test]
    fn popping_a_parent_returns_exactly_its_children() {
        let mut quarantine = Quarantine::<Minimal>::default();

        let parent = H256::repeat_byte(1);
        let other_parent = H256::repeat_byte(2);

        let child_a = block(5, parent);
        let child_b = block(6, parent);
        let unrelated = block(7, other_parent);

        assert!(quarantine.add_orphan(0, child_a.clone()));
        assert!(quarantine.add_orphan(0, child_b.clone()));
        assert!(quarantine.add_orphan(0, unrelated.clone()));

        let mut popped = quarantine
            .pop_children(parent)
            .into_iter()
            .map(|block| block.block_root())
            .collect::<Vec<_>>();

        popped.sort_unstable();

        let mut expected = vec![child_a.block_root(), child_b.block_root()];
        expected.sort_unstable();

        assert_eq!(popped, expected);
        assert_eq!(quarantine.orphan_count(), 1);
        assert!(quarantine.contains_orphan(unrelated.block_root()));
        assert!(quarantine.pop_children(parent).is_empty());
    }

    #[test]
    fn orphans_below_the_finalized_slot_are_dropped() {
        let mut quarantine = Quarantine::<Minimal>::default();

        assert!(!quarantine.add_orphan(10, block(10, H256::repeat_byte(1))));
        assert!(quarantine.add_orphan(10, block(11, H256::repeat_byte(1))));
    }

    #[test]
    fn the_oldest_orphan_is_evicted_when_full() {
        let mut quarantine = Quarantine::<Minimal>::new(QuarantineConfig { max_orphans: 2 });

        let first = block(1, H256::repeat_byte(1));
        let second = block(2, H256::repeat_byte(2));
        let third = block(3, H256::repeat_byte(3));

        assert!(quarantine.add_orphan(0, first.clone()));
        assert!(quarantine.add_orphan(0, second.clone()));
        assert!(quarantine.add_orphan(0, third.clone()));

        assert_eq!(quarantine.orphan_count(), 2);
        assert!(!quarantine.contains_orphan(first.block_root()));
        assert!(quarantine.contains_orphan(second.block_root()));
        assert!(quarantine.contains_orphan(third.block_root()));
    }

    #[test]
    fn unviability_is_transitive_over_stored_orphans() {
        let mut quarantine = Quarantine::<Minimal>::default();

        let root = H256::repeat_byte(9);
        let child = block(5, root);
        let grandchild = block(6, child.block_root());

        assert!(quarantine.add_orphan(0, child.clone()));
        assert!(quarantine.add_orphan(0, grandchild.clone()));

        quarantine.mark_unviable(root);

        assert!(quarantine.is_unviable(root));
        assert!(quarantine.is_unviable(child.block_root()));
        assert!(quarantine.is_unviable(grandchild.block_root()));
        assert_eq!(quarantine.orphan_count(), 0);
    }

    #[test]
    fn children_of_unviable_parents_never_become_orphans() {
        let mut quarantine = Quarantine::<Minimal>::default();

        let root = H256::repeat_byte(9);
        quarantine.mark_unviable(root);

        let child = block(5, root);

        assert!(!quarantine.add_orphan(0, child.clone()));
        assert!(quarantine.is_unviable(child.block_root()));
        assert!(!quarantine.contains_orphan(child.block_root()));
    }

    #[test]
    fn missing_roots_are_tracked_until_the_block_arrives() {
        let mut quarantine = Quarantine::<Minimal>::default();

        let root = H256::repeat_byte(4);

        quarantine.add_missing(root);
        quarantine.add_missing(root);

        assert_eq!(quarantine.missing_roots(), vec![root]);

        quarantine.remove_missing(root);

        assert!(quarantine.missing_roots().is_empty());
    }
}
