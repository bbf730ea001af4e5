//! Causal-order traversal of a bug's operations.

use crate::bug::Bug;
use crate::operation::Operation;

/// Iterates every operation of a bug: committed packs oldest first, then
/// the staging pack.
///
/// The iterator borrows the bug and is cheap to create; call
/// [`Bug::operations`] again (or clone the iterator) to restart.
#[derive(Clone, Debug)]
pub struct OperationIter<'a> {
    bug: &'a Bug,
    pack_index: usize,
    op_index: usize,
}

impl<'a> OperationIter<'a> {
    pub(crate) const fn new(bug: &'a Bug) -> Self {
        Self {
            bug,
            pack_index: 0,
            op_index: 0,
        }
    }

    /// The operations of the pack at `index`, where the index one past the
    /// committed packs is the staging pack.
    fn pack_ops(&self, index: usize) -> Option<&'a [Operation]> {
        let packs = self.bug.packs();
        if index < packs.len() {
            Some(packs[index].operations())
        } else if index == packs.len() {
            Some(self.bug.staging().operations())
        } else {
            None
        }
    }
}

impl<'a> Iterator for OperationIter<'a> {
    type Item = &'a Operation;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let ops = self.pack_ops(self.pack_index)?;
            if let Some(op) = ops.get(self.op_index) {
                self.op_index += 1;
                return Some(op);
            }
            self.pack_index += 1;
            self.op_index = 0;
        }
    }
}
