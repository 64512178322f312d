//! Every accelerating index must answer exactly like the linear scan.

mod index_equivalence_test;
mod materialize_knn_test;
