//! Verification queries carried by a document, with their options and
//! expected results.

use serde::Serialize;

/// The kind of value a query expectation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExpectationType {
    /// Symbolic yes/no result.
    Symbolic,
    /// A probability estimate.
    Probability,
    /// A numeric value (cost, bound, count).
    NumericValue,
    /// The query is expected to be rejected.
    ErrorValue,
}

/// The expected or computed status of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueryStatus {
    /// The property holds.
    True,
    /// The property does not hold.
    False,
    /// The property holds within the statistical confidence.
    MaybeTrue,
    /// The property fails within the statistical confidence.
    MaybeFalse,
    /// No verdict.
    Unknown,
}

/// A named engine option attached to a query or to the whole model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelOption {
    /// Option name.
    pub name: String,
    /// Option value, unparsed.
    pub value: String,
}

impl ModelOption {
    /// Creates an option.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        ModelOption {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A resource bound attached to an expectation (time, memory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    /// Resource name.
    pub name: String,
    /// Resource value, unparsed.
    pub value: String,
    /// Optional unit.
    pub unit: Option<String>,
}

/// Results reported for a query by some engine run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryResults {
    /// Options the run used.
    pub options: Vec<ModelOption>,
    /// Free-form result message.
    pub message: String,
    /// Result value, unparsed.
    pub value: String,
}

/// The expected outcome of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expectation {
    /// Kind of the expected value.
    pub value_type: ExpectationType,
    /// Expected status.
    pub status: QueryStatus,
    /// Expected value, unparsed.
    pub value: String,
    /// Resource bounds for the run.
    pub resources: Vec<Resource>,
}

/// A verification query enclosed in the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    /// The query formula, unparsed.
    pub formula: String,
    /// Accompanying comment.
    pub comment: String,
    /// Engine options for this query.
    pub options: Vec<ModelOption>,
    /// Expected outcome, when the input declares one.
    pub expectation: Option<Expectation>,
    /// Source location of the query in the input.
    pub location: String,
}

impl Query {
    /// Creates a query with no options and no expectation.
    pub fn new(formula: impl Into<String>, comment: impl Into<String>) -> Self {
        Query {
            formula: formula.into(),
            comment: comment.into(),
            options: Vec::new(),
            expectation: None,
            location: String::new(),
        }
    }
}
