//! Static analyses over instruction streams.

mod stack_depth;

#[cfg(test)]
mod stack_depth_test;

pub use stack_depth::{StackDepths, analyze, max_stack_depth};
