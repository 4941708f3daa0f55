use std::fmt::{Display, Formatter};

use serde_json::Value;

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::DocumentData;
use crate::firestore::value::{field_path_segments, value_at_path};

/// The field a query constraint applies to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldRef {
    /// A (possibly dotted) field path inside the document data.
    Field(String),
    /// The document identifier itself.
    DocumentId,
}

/// Sentinel referring to the document id in a query constraint.
pub fn document_id() -> FieldRef {
    FieldRef::DocumentId
}

impl From<&str> for FieldRef {
    fn from(value: &str) -> Self {
        FieldRef::Field(value.to_string())
    }
}

impl From<String> for FieldRef {
    fn from(value: String) -> Self {
        FieldRef::Field(value)
    }
}

impl Display for FieldRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldRef::Field(path) => f.write_str(path),
            FieldRef::DocumentId => f.write_str("__name__"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOperator {
    Equal,
    ArrayContains,
    In,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equal => "==",
            FilterOperator::ArrayContains => "array-contains",
            FilterOperator::In => "in",
        }
    }
}

/// A single `where` clause.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryConstraint {
    field: FieldRef,
    operator: FilterOperator,
    value: Value,
}

impl QueryConstraint {
    pub fn new(field: impl Into<FieldRef>, operator: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    pub fn field(&self) -> &FieldRef {
        &self.field
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Number of values carried by an `in` constraint; `None` for other operators.
    pub fn membership_len(&self) -> Option<usize> {
        match (self.operator, &self.value) {
            (FilterOperator::In, Value::Array(values)) => Some(values.len()),
            _ => None,
        }
    }

    /// Checks the constraint is well formed for a store that accepts at most
    /// `membership_limit` values per `in` clause.
    pub fn validate(&self, membership_limit: usize) -> FirestoreResult<()> {
        if let FieldRef::Field(path) = &self.field {
            field_path_segments(path)?;
        }
        if self.operator != FilterOperator::In {
            return Ok(());
        }
        let values = self.value.as_array().ok_or_else(|| {
            invalid_argument("Invalid Query. A non-empty array is required for 'in' filters.")
        })?;
        if values.is_empty() {
            return Err(invalid_argument(
                "Invalid Query. A non-empty array is required for 'in' filters.",
            ));
        }
        if values.len() > membership_limit {
            return Err(invalid_argument(format!(
                "Invalid Query. 'in' filters support a maximum of {membership_limit} elements in the value array, got {}.",
                values.len()
            )));
        }
        if self.field == FieldRef::DocumentId && values.iter().any(|value| !value.is_string()) {
            return Err(invalid_argument(
                "Invalid Query. Document ID filters require string values.",
            ));
        }
        Ok(())
    }

    /// Evaluates the constraint against a stored document.
    pub fn matches(&self, id: &str, data: &DocumentData) -> bool {
        let id_value;
        let field_value = match &self.field {
            FieldRef::DocumentId => {
                id_value = Value::String(id.to_string());
                Some(&id_value)
            }
            FieldRef::Field(path) => value_at_path(data, path),
        };
        let Some(field_value) = field_value else {
            return false;
        };

        match self.operator {
            FilterOperator::Equal => field_value == &self.value,
            FilterOperator::ArrayContains => field_value
                .as_array()
                .map(|items| items.contains(&self.value))
                .unwrap_or(false),
            FilterOperator::In => self
                .value
                .as_array()
                .map(|candidates| candidates.contains(field_value))
                .unwrap_or(false),
        }
    }
}

impl Display for QueryConstraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator.as_str(), self.value)
    }
}

/// `field == value`
pub fn where_equals(field: impl Into<FieldRef>, value: impl Into<Value>) -> QueryConstraint {
    QueryConstraint::new(field, FilterOperator::Equal, value.into())
}

/// `field array-contains value`
pub fn where_contains(field: impl Into<FieldRef>, value: impl Into<Value>) -> QueryConstraint {
    QueryConstraint::new(field, FilterOperator::ArrayContains, value.into())
}

/// `field in [values]`. The store caps the number of values (10 by default).
pub fn where_in<I, V>(field: impl Into<FieldRef>, values: I) -> QueryConstraint
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let values = values.into_iter().map(Into::into).collect();
    QueryConstraint::new(field, FilterOperator::In, Value::Array(values))
}
