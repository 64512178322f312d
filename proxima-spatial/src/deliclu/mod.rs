//! The DeLiClu augmentation: an R*-tree whose entries track handled and
//! unhandled objects for the DeLiClu clustering traversal.

mod deliclu_tree;

pub use deliclu_tree::*;
