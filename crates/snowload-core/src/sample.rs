//! Synthetic customers dataset for demos and tests

use chrono::{Duration, NaiveDate};

use crate::dataset::{Dataset, Value};
use crate::schema::TableSchema;

pub const REGIONS: [&str; 4] = ["North America", "Europe", "Asia", "Australia"];

/// Build `count` customer rows matching [`TableSchema::customers`]
///
/// Rows are deterministic: regions cycle and signup dates fall within the year
/// before `today`.
pub fn sample_customers(count: usize, today: NaiveDate) -> Dataset {
    let mut dataset = Dataset::for_schema(&TableSchema::customers());

    for i in 0..count {
        let id = i as i64 + 1;
        let days_back = (i as i64 * 37) % 366;
        let row = vec![
            Value::Int(id),
            Value::Text(format!("Customer_{}", id)),
            Value::Text(format!("customer{}@example.com", id)),
            Value::from(REGIONS[i % REGIONS.len()]),
            Value::Date(today - Duration::days(days_back)),
        ];
        dataset.rows_mut().push(row);
    }

    dataset
}
