//! Filter operations for PostgrestClient

/// Operator for filter expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to
    Eq,

    /// Not equal to
    Neq,

    /// Greater than
    Gt,

    /// Greater than or equal to
    Gte,

    /// Less than
    Lt,

    /// Less than or equal to
    Lte,

    /// Is (null, true, false)
    Is,

    /// In a list of values
    In,
}

impl FilterOperator {
    /// Convert the operator to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Is => "is",
            FilterOperator::In => "in",
        }
    }
}

/// A single `column=op.value` filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub operator: FilterOperator,
    pub value: String,
    pub negated: bool,
}

impl Filter {
    pub fn new(column: &str, operator: FilterOperator, value: impl ToString) -> Self {
        Self {
            column: column.to_string(),
            operator,
            value: value.to_string(),
            negated: false,
        }
    }

    /// `column=in.(a,b,c)`; values containing reserved characters are quoted
    pub fn in_list<T: ToString>(column: &str, values: &[T]) -> Self {
        let values: Vec<String> = values.iter().map(|v| quote(&v.to_string())).collect();
        Self::new(column, FilterOperator::In, format!("({})", values.join(",")))
    }

    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// The query-string pair for this filter
    pub fn to_param(&self) -> (String, String) {
        let prefix = if self.negated { "not." } else { "" };
        (
            self.column.clone(),
            format!("{}{}.{}", prefix, self.operator.as_str(), self.value),
        )
    }
}

fn quote(value: &str) -> String {
    if value.contains([',', '(', ')', '"', ' ']) {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}
