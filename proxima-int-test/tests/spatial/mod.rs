//! Spatial integration test module.
//!
//! These tests drive the R*-tree and DeLiClu trees through the full
//! database stack.

mod deliclu_test;
mod spatial_index_test;
