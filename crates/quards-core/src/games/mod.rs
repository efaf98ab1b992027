//! # Rule Sets
//!
//! Concrete [`crate::evaluator::Evaluator`] implementations shipped with the
//! engine. Each one is constructed once with its lookup tables and handed to
//! the explorer as a value.

pub mod lorcana;
