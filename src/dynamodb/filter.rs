use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::value::AttrValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==")]
    Equals,
    #[serde(rename = "!=")]
    NotEquals,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "startswith")]
    StartsWith,
    #[serde(rename = "endswith")]
    EndsWith,
}

impl Operator {
    pub const ALL: [Operator; 5] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::Contains,
        Operator::StartsWith,
        Operator::EndsWith,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equals => "==",
            Operator::NotEquals => "!=",
            Operator::Contains => "contains",
            Operator::StartsWith => "startswith",
            Operator::EndsWith => "endswith",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperator(pub String);

impl fmt::Display for UnknownOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown operator '{}' (use ==, !=, contains, startswith, endswith)",
            self.0
        )
    }
}

impl std::error::Error for UnknownOperator {}

impl FromStr for Operator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "==" | "=" | "eq" | "equals" => Ok(Operator::Equals),
            "!=" | "<>" | "ne" | "notequals" => Ok(Operator::NotEquals),
            "contains" => Ok(Operator::Contains),
            "startswith" | "starts_with" | "begins_with" => Ok(Operator::StartsWith),
            "endswith" | "ends_with" => Ok(Operator::EndsWith),
            _ => Err(UnknownOperator(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub column: String,
    pub operator: Operator,
    pub value: String,
}

impl FilterCondition {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }
}

impl fmt::Display for FilterCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.operator, self.value)
    }
}

/// Server-side filter for a scan. Column names and values only ever appear
/// behind `#attrN` / `:valN` placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanFilter {
    filter_expression: String,
    expression_attribute_names: BTreeMap<String, String>,
    expression_attribute_values: BTreeMap<String, AttrValue>,
}

impl ScanFilter {
    /// Returns `None` for an empty condition list: an unfiltered scan.
    pub fn from_conditions(conditions: &[FilterCondition]) -> Option<Self> {
        if conditions.is_empty() {
            return None;
        }
        let mut filter = Self::default();
        let clauses: Vec<String> = conditions
            .iter()
            .enumerate()
            .map(|(idx, condition)| filter.push_clause(idx, condition))
            .collect();
        filter.filter_expression = clauses.join(" AND ");
        Some(filter)
    }

    fn push_clause(&mut self, idx: usize, condition: &FilterCondition) -> String {
        let name = format!("#attr{idx}");
        let value = format!(":val{idx}");
        self.expression_attribute_names
            .insert(name.clone(), condition.column.clone());
        self.expression_attribute_values
            .insert(value.clone(), AttrValue::S(condition.value.clone()));
        match condition.operator {
            Operator::Equals => format!("{name} = {value}"),
            Operator::NotEquals => format!("{name} <> {value}"),
            Operator::Contains => format!("contains({name}, {value})"),
            Operator::StartsWith => format!("begins_with({name}, {value})"),
            // No suffix primitive exists in the expression language; this
            // matches anywhere in the value, not only at the end.
            Operator::EndsWith => format!("contains({name}, {value})"),
        }
    }

    pub fn filter_expression(&self) -> &str {
        &self.filter_expression
    }

    pub fn expression_attribute_names(&self) -> &BTreeMap<String, String> {
        &self.expression_attribute_names
    }

    pub fn expression_attribute_values(&self) -> &BTreeMap<String, AttrValue> {
        &self.expression_attribute_values
    }
}
