//! Block streaming primitives
//!
//! All generators and filters produce audio one fixed-size block at a time.

use super::EnvelopeStage;

/// Number of samples in one block. Every stream in the pipeline uses this size.
pub const BLOCK_SIZE: usize = 512;

/// One block of mono samples.
pub type Block = [f64; BLOCK_SIZE];

/// A silent block.
pub fn silent_block() -> Block {
    [0.0; BLOCK_SIZE]
}

/// Contract for block-producing stream nodes.
///
/// A node is an infinite, non-restartable source: each `next_block` call
/// advances phase accumulators, filter memory, and envelope progress exactly
/// once. There is no seek or reset.
pub trait SignalNode: Send {
    /// Fill `out` with the next block of samples.
    fn next_block(&mut self, out: &mut Block);

    /// Envelope stage of the most downstream source feeding this node.
    ///
    /// A composite node reports `Idle` only when every source is idle; the
    /// voice mixer uses this to prune voices that have gone silent.
    fn stage(&self) -> EnvelopeStage;

    /// Move every envelope beneath this node into its release phase.
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_block_is_all_zeros() {
        let block = silent_block();
        assert_eq!(block.len(), BLOCK_SIZE);
        assert!(block.iter().all(|&s| s == 0.0));
    }
}
