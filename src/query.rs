//! Filter contract for downstream readers of the aggregated tables.
//!
//! The query service and dashboard filter every view the same way: an
//! inclusive year range plus optional categorical predicates (agency,
//! crime category, city, priority). The builder owns all value quoting,
//! so callers never splice escaped literals into SQL themselves.

/// Builds a deterministic `WHERE` fragment from bound filter values.
#[derive(Debug, Default, Clone)]
pub struct PredicateBuilder {
    conditions: Vec<String>,
}

impl PredicateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inclusive year range on the given column.
    pub fn year_range(mut self, column: &str, min: Option<i32>, max: Option<i32>) -> Self {
        if let Some(min) = min {
            self.conditions.push(format!("{column} >= {min}"));
        }
        if let Some(max) = max {
            self.conditions.push(format!("{column} <= {max}"));
        }
        self
    }

    /// Categorical equality. The value is quoted here, embedded single
    /// quotes doubled.
    pub fn equals(mut self, column: &str, value: &str) -> Self {
        self.conditions.push(format!("{column} = {}", quote(value)));
        self
    }

    pub fn equals_int(mut self, column: &str, value: i64) -> Self {
        self.conditions.push(format!("{column} = {value}"));
        self
    }

    /// Membership in a set of categorical values, rendered as an
    /// OR-joined group so it composes with other conditions.
    pub fn one_of(mut self, column: &str, values: &[&str]) -> Self {
        if values.is_empty() {
            return self;
        }
        let alts: Vec<String> = values
            .iter()
            .map(|v| format!("{column}={}", quote(v)))
            .collect();
        self.conditions.push(format!("({})", alts.join(" OR ")));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// The bare condition expression, without a `WHERE` keyword. Used for
    /// SODA `$where` parameters.
    pub fn condition(&self) -> String {
        self.conditions.join(" AND ")
    }

    /// Full `WHERE` clause, or an empty string when nothing is bound.
    pub fn build(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.condition())
        }
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_builder_renders_nothing() {
        let p = PredicateBuilder::new();
        assert!(p.is_empty());
        assert_eq!(p.build(), "");
        assert_eq!(p.condition(), "");
    }

    #[test]
    fn year_range_and_equality() {
        let p = PredicateBuilder::new()
            .year_range("year", Some(2021), Some(2024))
            .equals("agency_short", "SDPD");
        assert_eq!(
            p.build(),
            "WHERE year >= 2021 AND year <= 2024 AND agency_short = 'SDPD'"
        );
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let p = PredicateBuilder::new().equals("city", "O'Neill");
        assert_eq!(p.build(), "WHERE city = 'O''Neill'");
    }

    #[test]
    fn one_of_renders_or_group() {
        let p = PredicateBuilder::new().one_of("offense_code", &["90D", "90C"]);
        assert_eq!(p.condition(), "(offense_code='90D' OR offense_code='90C')");
    }

    #[test]
    fn open_ended_year_range() {
        let p = PredicateBuilder::new().year_range("year", Some(2022), None);
        assert_eq!(p.build(), "WHERE year >= 2022");
    }
}
