use crate::common::{Logger, TypeInformation};
use crate::errors::ProximaResult;
use crate::index::IndexRegistration;
use crate::relation::RelationRef;

/// Creates indexes for relations as a database creates them.
pub trait IndexFactory<O>: Send + Sync {
    fn name(&self) -> String;

    /// Whether relations described by `type_information` can be indexed.
    fn accepts(&self, type_information: &TypeInformation) -> bool;

    /// Builds an empty index over `relation`; the database initializes it.
    fn instantiate(
        &self,
        relation: RelationRef<O>,
        logger: &Logger,
    ) -> ProximaResult<IndexRegistration<O>>;
}
