//! Attribute/operator filter specifications.
//!
//! A [`FilterSet`] is a flat list of per-column predicates combined with
//! AND or OR. The operator set is fixed: comparison, set membership, and
//! SQL LIKE pattern match. The infrastructure layer translates a set into
//! a WHERE clause.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One predicate operator, carrying its comparison value(s).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterOp {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Ge(Value),
    Lt(Value),
    Le(Value),
    /// Set membership. An empty list matches nothing.
    In(Vec<Value>),
    /// SQL LIKE pattern match (`%` and `_` wildcards).
    Like(String),
}

/// A single column predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
}

/// How the predicates of a [`FilterSet`] combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Combine {
    #[default]
    And,
    Or,
}

/// A conjunctive or disjunctive combination of predicates.
///
/// An empty set matches everything.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterSet {
    filters: Vec<Filter>,
    combine: Combine,
}

impl FilterSet {
    /// An empty conjunctive (AND) set.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty disjunctive (OR) set.
    pub fn any() -> Self {
        Self {
            filters: Vec::new(),
            combine: Combine::Or,
        }
    }

    /// Append a predicate with an explicit operator.
    pub fn with(mut self, column: impl Into<String>, op: FilterOp) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            op,
        });
        self
    }

    /// Equality; the "bare literal" form of a filter specification.
    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(column, FilterOp::Eq(value.into()))
    }

    pub fn ne(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(column, FilterOp::Ne(value.into()))
    }

    pub fn gt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(column, FilterOp::Gt(value.into()))
    }

    pub fn ge(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(column, FilterOp::Ge(value.into()))
    }

    pub fn lt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(column, FilterOp::Lt(value.into()))
    }

    pub fn le(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(column, FilterOp::Le(value.into()))
    }

    pub fn is_in<V>(self, column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self
    where
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.with(column, FilterOp::In(values))
    }

    pub fn like(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.with(column, FilterOp::Like(pattern.into()))
    }

    pub fn combine(&self) -> Combine {
        self.combine
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_combine_is_and() {
        let set = FilterSet::new().eq("a", 1i64).gt("b", 2i64);
        assert_eq!(set.combine(), Combine::And);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_any_combines_with_or() {
        let set = FilterSet::any().eq("a", 1i64).eq("a", 2i64);
        assert_eq!(set.combine(), Combine::Or);
    }

    #[test]
    fn test_builder_preserves_order_and_values() {
        let set = FilterSet::new()
            .ne("name", "Bob")
            .is_in("age", [30i64, 40i64])
            .like("email", "%@email.com");

        let filters = set.filters();
        assert_eq!(filters[0].column, "name");
        assert_eq!(filters[0].op, FilterOp::Ne(Value::Text("Bob".into())));
        assert_eq!(
            filters[1].op,
            FilterOp::In(vec![Value::Integer(30), Value::Integer(40)])
        );
        assert_eq!(filters[2].op, FilterOp::Like("%@email.com".into()));
    }

    #[test]
    fn test_empty_set() {
        assert!(FilterSet::new().is_empty());
        assert_eq!(FilterSet::new().len(), 0);
    }
}
