//! Filter predicates for list calls.
//!
//! A filter expression is compiled once per list call against the schema of
//! fields the resource type declares, then evaluated against each candidate
//! record's bindings. References to undeclared fields fail compilation, so an
//! expression can never probe fields the resource does not expose.
//!
//! ## Syntax
//!
//! ```text
//! project_id == "demo" && !(style != 'openapi/v3')
//! style in ["openapi/v2", "openapi/v3"] || filename.endsWith(".yaml")
//! NOT deprecated AND display_name.contains("Pet")
//! ```
//!
//! An empty expression matches everything.
//! Nesting of `!` and parentheses is limited to 64 levels and an expression
//! may hold at most 1024 boolean operators; deeper or longer expressions are
//! syntax errors.

mod lexer;
mod parser;

use std::collections::HashMap;
use std::fmt;

use parser::Expr;

/// Declared type of a filterable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Bool,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => write!(f, "string"),
            FieldType::Bool => write!(f, "bool"),
        }
    }
}

/// A bound field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    String(String),
    Bool(bool),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::String(_) => FieldType::String,
            FieldValue::Bool(_) => FieldType::Bool,
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Field name to value, extracted from one record.
pub type Bindings = HashMap<String, FieldValue>;

/// The fields a resource type allows filters to reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSchema {
    fields: Vec<(String, FieldType)>,
}

impl FilterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field. Redeclaring a name replaces its type.
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = field_type,
            None => self.fields.push((name, field_type)),
        }
        self
    }

    pub fn lookup(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, field_type)| *field_type)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Types whose records can be filtered. Usually derived with
/// `#[derive(Filterable)]`.
pub trait Filterable {
    /// The fields filters may reference.
    fn filter_schema() -> FilterSchema;

    /// This record's value for every declared field.
    fn filter_bindings(&self) -> Bindings;
}

/// Errors from compiling or evaluating a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    Syntax { offset: usize, message: String },
    UnknownField(String),
    TypeMismatch {
        field: String,
        expected: FieldType,
        found: FieldType,
    },
    /// A non-bool field used where a condition is expected.
    NotACondition(String),
    /// A record supplied no value for a field the filter reads.
    MissingBinding(String),
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::Syntax { offset, message } => {
                write!(f, "filter syntax error at offset {}: {}", offset, message)
            }
            FilterError::UnknownField(field) => write!(f, "unknown filter field {:?}", field),
            FilterError::TypeMismatch {
                field,
                expected,
                found,
            } => write!(
                f,
                "filter field {:?} is {} but was used as {}",
                field, expected, found
            ),
            FilterError::NotACondition(field) => {
                write!(f, "filter field {:?} is not a condition on its own", field)
            }
            FilterError::MissingBinding(field) => {
                write!(f, "no value bound for filter field {:?}", field)
            }
        }
    }
}

impl std::error::Error for FilterError {}

/// A compiled filter.
#[derive(Debug, Clone)]
pub struct FilterPredicate {
    expr: Option<Expr>,
    /// Fields the expression reads, with their declared types.
    reads: Vec<(String, FieldType)>,
}

impl FilterPredicate {
    /// A predicate that accepts every record.
    pub fn always() -> Self {
        Self {
            expr: None,
            reads: Vec::new(),
        }
    }

    /// Compile `expression` against `schema`.
    pub fn compile(expression: &str, schema: &FilterSchema) -> Result<Self, FilterError> {
        if expression.trim().is_empty() {
            return Ok(Self::always());
        }

        let expr = parser::parse(expression, schema)?;
        let mut fields = Vec::new();
        expr.fields(&mut fields);
        let reads = fields
            .into_iter()
            .filter_map(|field| schema.lookup(&field).map(|field_type| (field, field_type)))
            .collect();

        Ok(Self {
            expr: Some(expr),
            reads,
        })
    }

    pub fn is_always_true(&self) -> bool {
        self.expr.is_none()
    }

    /// Evaluate against one record.
    ///
    /// Every field the expression reads must be bound with its declared type,
    /// whether or not short-circuiting would reach it.
    pub fn eval(&self, bindings: &Bindings) -> Result<bool, FilterError> {
        let Some(expr) = &self.expr else {
            return Ok(true);
        };

        for (field, expected) in &self.reads {
            let value = bindings
                .get(field)
                .ok_or_else(|| FilterError::MissingBinding(field.clone()))?;
            if value.field_type() != *expected {
                return Err(FilterError::TypeMismatch {
                    field: field.clone(),
                    expected: *expected,
                    found: value.field_type(),
                });
            }
        }

        Ok(evaluate(expr, bindings))
    }

    /// Evaluate against a record's own bindings.
    pub fn matches<T: Filterable>(&self, record: &T) -> Result<bool, FilterError> {
        if self.is_always_true() {
            return Ok(true);
        }
        self.eval(&record.filter_bindings())
    }
}

/// Bindings were checked up front, so lookups here cannot miss.
fn evaluate(expr: &Expr, bindings: &Bindings) -> bool {
    match expr {
        Expr::Const(value) => *value,
        Expr::Field(field) => matches!(bindings.get(field), Some(FieldValue::Bool(true))),
        Expr::Equals {
            field,
            value,
            negated,
        } => (bindings.get(field) == Some(value)) != *negated,
        Expr::In { field, values } => bindings
            .get(field)
            .map(|bound| values.contains(bound))
            .unwrap_or(false),
        Expr::Method { field, method, arg } => match bindings.get(field) {
            Some(FieldValue::String(bound)) => method.apply(bound, arg),
            _ => false,
        },
        Expr::Not(inner) => !evaluate(inner, bindings),
        Expr::And(lhs, rhs) => evaluate(lhs, bindings) && evaluate(rhs, bindings),
        Expr::Or(lhs, rhs) => evaluate(lhs, bindings) || evaluate(rhs, bindings),
    }
}
