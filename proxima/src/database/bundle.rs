use std::any::Any;
use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::ops::Range;
use std::sync::Arc;

use crate::common::TypeInformation;
use crate::data::RelationValue;
use crate::database::{AnyColumn, Column};
use crate::errors::{ErrorKind, ProximaError, ProximaResult};
use crate::id::ObjectId;

/// Typed values of one bundle column, with the hooks a database needs to
/// build a relation of the right type from them.
pub(crate) trait ColumnValues: Send + Sync {
    fn len(&self) -> usize;

    fn as_any(&self) -> &dyn Any;

    /// Checks every value against `type_information`.
    fn validate(&self, type_information: &TypeInformation) -> ProximaResult<()>;

    fn clone_box(&self) -> Box<dyn ColumnValues>;

    fn new_materialized_column(
        &self,
        name: &str,
        type_information: TypeInformation,
    ) -> Arc<dyn AnyColumn>;

    fn new_array_column(
        &self,
        name: &str,
        type_information: TypeInformation,
        ids: Range<u64>,
    ) -> ProximaResult<Arc<dyn AnyColumn>>;
}

impl<T: RelationValue> ColumnValues for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn validate(&self, type_information: &TypeInformation) -> ProximaResult<()> {
        if !type_information.is_type::<T>() {
            return Err(ProximaError::new(
                &format!(
                    "Values of {} cannot be stored as {}",
                    std::any::type_name::<T>(),
                    type_information
                ),
                ErrorKind::ValidationError,
            ));
        }
        let Some(expected) = type_information.dimensionality() else {
            return Ok(());
        };
        for (row, value) in self.iter().enumerate() {
            if let Some(actual) = value.dimensionality() {
                if actual != expected {
                    return Err(ProximaError::new(
                        &format!(
                            "Row {} has dimensionality {}, expected {}",
                            row, actual, expected
                        ),
                        ErrorKind::DimensionalityMismatch,
                    ));
                }
            }
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn ColumnValues> {
        Box::new(self.clone())
    }

    fn new_materialized_column(
        &self,
        name: &str,
        type_information: TypeInformation,
    ) -> Arc<dyn AnyColumn> {
        Arc::new(Column::<T>::materialized(name, type_information))
    }

    fn new_array_column(
        &self,
        name: &str,
        type_information: TypeInformation,
        ids: Range<u64>,
    ) -> ProximaResult<Arc<dyn AnyColumn>> {
        Ok(Arc::new(Column::<T>::array(
            name,
            type_information,
            ids,
            self.clone(),
        )?))
    }
}

/// One typed column of a [`MultipleObjectsBundle`].
pub struct BundleColumn {
    type_information: TypeInformation,
    values: Box<dyn ColumnValues>,
}

impl BundleColumn {
    /// Column of `values`; vector values fix the dimensionality from the
    /// first value.
    pub fn new<T: RelationValue>(values: Vec<T>) -> Self {
        let mut type_information = TypeInformation::of::<T>();
        if let Some(dimensionality) = values.first().and_then(|v| v.dimensionality()) {
            type_information = type_information.with_dimensionality(dimensionality);
        }
        BundleColumn {
            type_information,
            values: Box::new(values),
        }
    }

    pub fn with_type_information<T: RelationValue>(
        type_information: TypeInformation,
        values: Vec<T>,
    ) -> Self {
        BundleColumn {
            type_information,
            values: Box::new(values),
        }
    }

    pub fn type_information(&self) -> &TypeInformation {
        &self.type_information
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.len() == 0
    }

    /// The values, when they are of type `T`.
    pub fn values<T: RelationValue>(&self) -> Option<&[T]> {
        self.values
            .as_any()
            .downcast_ref::<Vec<T>>()
            .map(|v| v.as_slice())
    }

    pub fn get<T: RelationValue>(&self, row: usize) -> Option<T> {
        self.values::<T>().and_then(|v| v.get(row).cloned())
    }

    pub(crate) fn column_values(&self) -> &dyn ColumnValues {
        self.values.as_ref()
    }
}

impl Clone for BundleColumn {
    fn clone(&self) -> Self {
        BundleColumn {
            type_information: self.type_information.clone(),
            values: self.values.clone_box(),
        }
    }
}

impl Debug for BundleColumn {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleColumn")
            .field("type", &self.type_information.to_string())
            .field("len", &self.len())
            .finish()
    }
}

/// Objects to insert, column by column.
///
/// # Examples
///
/// ```rust
/// use proxima::data::DoubleVector;
/// use proxima::database::MultipleObjectsBundle;
///
/// let bundle = MultipleObjectsBundle::new()
///     .with_column(vec![DoubleVector::from([0.0, 0.0]), DoubleVector::from([1.0, 0.0])])
///     .with_column(vec!["a".to_string(), "b".to_string()]);
/// assert_eq!(bundle.validate().unwrap(), 2);
/// assert_eq!(bundle.get::<String>(1, 1), Some("b".to_string()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MultipleObjectsBundle {
    columns: Vec<BundleColumn>,
    ids: Option<Vec<ObjectId>>,
}

impl MultipleObjectsBundle {
    pub fn new() -> Self {
        MultipleObjectsBundle::default()
    }

    pub fn with_column<T: RelationValue>(mut self, values: Vec<T>) -> Self {
        self.columns.push(BundleColumn::new(values));
        self
    }

    pub fn add_column(&mut self, column: BundleColumn) {
        self.columns.push(column);
    }

    /// Requests explicit ids instead of allocated ones.
    pub fn with_ids(mut self, ids: Vec<ObjectId>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn columns(&self) -> &[BundleColumn] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&BundleColumn> {
        self.columns.get(index)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn ids(&self) -> Option<&[ObjectId]> {
        self.ids.as_deref()
    }

    /// Number of objects, taken from the first column.
    pub fn data_length(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn get<T: RelationValue>(&self, row: usize, column: usize) -> Option<T> {
        self.columns.get(column).and_then(|c| c.get(row))
    }

    /// Checks the shape of the bundle and returns the number of objects.
    pub fn validate(&self) -> ProximaResult<usize> {
        let Some(first) = self.columns.first() else {
            return Err(ProximaError::new(
                "Bundle has no columns",
                ErrorKind::ValidationError,
            ));
        };
        let length = first.len();
        for (index, column) in self.columns.iter().enumerate() {
            if column.len() != length {
                return Err(ProximaError::new(
                    &format!(
                        "Column {} holds {} values, column 0 holds {}",
                        index,
                        column.len(),
                        length
                    ),
                    ErrorKind::ValidationError,
                ));
            }
            column.values.validate(&column.type_information)?;
        }
        if let Some(ids) = &self.ids {
            if ids.len() != length {
                return Err(ProximaError::new(
                    &format!("{} ids given for {} objects", ids.len(), length),
                    ErrorKind::ValidationError,
                ));
            }
            let mut seen = HashSet::with_capacity(ids.len());
            for id in ids {
                if !seen.insert(*id) {
                    return Err(ProximaError::new(
                        &format!("Id {} appears twice in the bundle", id),
                        ErrorKind::DuplicateId,
                    ));
                }
            }
        }
        Ok(length)
    }
}

/// The values of one object, one entry per relation holding it.
#[derive(Default)]
pub struct SingleObjectBundle {
    id: Option<ObjectId>,
    values: Vec<(TypeInformation, Box<dyn Any + Send + Sync>)>,
}

impl SingleObjectBundle {
    pub fn new() -> Self {
        SingleObjectBundle::default()
    }

    pub fn with_id(mut self, id: ObjectId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn push<T: RelationValue>(&mut self, type_information: TypeInformation, value: T) {
        self.values.push((type_information, Box::new(value)));
    }

    pub(crate) fn push_boxed(
        &mut self,
        type_information: TypeInformation,
        value: Box<dyn Any + Send + Sync>,
    ) {
        self.values.push((type_information, value));
    }

    pub fn id(&self) -> Option<ObjectId> {
        self.id
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn type_information(&self, column: usize) -> Option<&TypeInformation> {
        self.values.get(column).map(|(t, _)| t)
    }

    pub fn get<T: 'static>(&self, column: usize) -> Option<&T> {
        self.values.get(column).and_then(|(_, v)| v.downcast_ref::<T>())
    }

    /// First value of type `T`.
    pub fn find<T: 'static>(&self) -> Option<&T> {
        self.values.iter().find_map(|(_, v)| v.downcast_ref::<T>())
    }
}

impl Debug for SingleObjectBundle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let types: Vec<String> = self.values.iter().map(|(t, _)| t.to_string()).collect();
        f.debug_struct("SingleObjectBundle")
            .field("id", &self.id)
            .field("types", &types)
            .finish()
    }
}
