use std::any::TypeId;
use std::fmt::{Display, Formatter};

/// Type descriptor of a relation's values.
///
/// A descriptor names a Rust type and, for vector-valued relations, the
/// dimensionality of its vectors. Relation lookup matches a requested
/// restriction against the descriptors of the stored relations with
/// [`TypeInformation::is_assignable_from`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeInformation {
    type_id: TypeId,
    type_name: &'static str,
    dimensionality: Option<usize>,
}

impl TypeInformation {
    /// Descriptor of `T` without a dimensionality constraint.
    pub fn of<T: 'static>() -> Self {
        TypeInformation {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            dimensionality: None,
        }
    }

    /// Restricts the descriptor to values of the given dimensionality.
    pub fn with_dimensionality(mut self, dimensionality: usize) -> Self {
        self.dimensionality = Some(dimensionality);
        self
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn dimensionality(&self) -> Option<usize> {
        self.dimensionality
    }

    pub fn is_type<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Whether a relation described by `other` satisfies this restriction.
    ///
    /// The types must be identical; a dimensionality on the restriction must
    /// be matched exactly, while a restriction without one accepts any.
    pub fn is_assignable_from(&self, other: &TypeInformation) -> bool {
        if self.type_id != other.type_id {
            return false;
        }
        match self.dimensionality {
            None => true,
            Some(dim) => other.dimensionality == Some(dim),
        }
    }

    fn short_name(&self) -> &'static str {
        let base = self.type_name.split('<').next().unwrap_or(self.type_name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl Display for TypeInformation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.dimensionality {
            Some(dim) => write!(f, "{}(dim={})", self.short_name(), dim),
            None => write!(f, "{}", self.short_name()),
        }
    }
}
