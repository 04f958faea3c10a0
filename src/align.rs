//! Reconciles arbitrary input tables with the model's feature schema.

use crate::schema::FeatureSchema;
use crate::table::{Cell, Table};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// What to put in a schema column, or a blank schema cell, the input did not provide.
///
/// Only zero-fill exists today. Missing columns and blank cells are filled,
/// never rejected, so partial uploads still produce a best-effort score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillPolicy {
    #[default]
    Zero,
}

impl FillPolicy {
    fn fill_value(self) -> Cell {
        match self {
            FillPolicy::Zero => Cell::Int(0),
        }
    }
}

/// A table whose leading columns are exactly the schema fields, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTable {
    table: Table,
    feature_count: usize,
    filled: Vec<String>,
    blanks: Vec<String>,
}

impl AlignedTable {
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    /// Number of leading schema columns.
    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    /// Schema fields that were absent from the input and filled.
    pub fn filled_fields(&self) -> &[String] {
        &self.filled
    }

    /// Schema fields that were present but had blank (NaN) cells filled.
    pub fn blank_fields(&self) -> &[String] {
        &self.blanks
    }
}

pub fn align_features(table: &Table, schema: &FeatureSchema) -> AlignedTable {
    align_features_with(table, schema, FillPolicy::default())
}

/// Project `table` onto `schema`, filling absent fields per `policy`.
///
/// Extra input columns trail the schema columns in their original order.
pub fn align_features_with(table: &Table, schema: &FeatureSchema, policy: FillPolicy) -> AlignedTable {
    let mut working = table.clone();
    let mut filled = Vec::new();

    for name in schema.names() {
        if working.column_index(name).is_none() {
            let cells = vec![policy.fill_value(); working.n_rows()];
            // Cannot collide: the name was just checked to be absent.
            if working.push_column(name, cells).is_ok() {
                filled.push(name.to_string());
            }
        }
    }

    if !filled.is_empty() {
        log_warn!(
            "{} schema field(s) missing from input, filled with {:?}: {}",
            filled.len(),
            policy,
            filled.join(", ")
        );
    }

    let mut order: Vec<usize> = schema
        .names()
        .filter_map(|name| working.column_index(name))
        .collect();
    order.extend((0..working.n_cols()).filter(|idx| !schema.contains(&working.columns()[*idx])));

    log_debug!(
        "aligned {} rows onto {} schema fields ({} passthrough)",
        working.n_rows(),
        schema.len(),
        working.n_cols() - schema.len()
    );

    // Schema columns now lead, so blank cells are patched by position.
    let mut aligned = working.reorder(&order);
    let fill = policy.fill_value();
    let mut blanks = Vec::new();
    let mut blank_report = Vec::new();
    for idx in 0..schema.len() {
        let replaced = aligned.replace_nan(idx, &fill);
        if replaced > 0 {
            let name = aligned.columns()[idx].clone();
            blank_report.push(format!("{name} ({replaced})"));
            blanks.push(name);
        }
    }
    if !blanks.is_empty() {
        log_warn!(
            "blank cells in {} schema field(s), filled with {:?}: {}",
            blanks.len(),
            policy,
            blank_report.join(", ")
        );
    }

    AlignedTable {
        table: aligned,
        feature_count: schema.len(),
        filled,
        blanks,
    }
}
