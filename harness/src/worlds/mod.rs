//! World implementations for the harness runner.

pub mod chains;
pub mod merges;
pub mod wide_fan;

use crate::contract::DecodeWorldV1;

/// Every built-in world, in a fixed order.
#[must_use]
pub fn all_worlds() -> Vec<Box<dyn DecodeWorldV1>> {
    vec![
        Box::new(chains::LinearChain),
        Box::new(chains::ViterbiFork),
        Box::new(chains::ContextChain),
        Box::new(merges::FanIn),
        Box::new(merges::CombineMerge),
        Box::new(wide_fan::WideFan),
    ]
}
