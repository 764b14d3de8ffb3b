//! Turns fetched records into display rows for the current viewer.
//!
//! Rows are rebuilt on every render from the records and the capabilities passed in;
//! nothing here is cached or mutated in place.

use serde::Serialize;

use crate::identity::Capabilities;
use crate::records::{GenderField, PatientRecord};

use super::table::render_table;

pub const NAME_MASK: &str = "***";
pub const NO_RECORDS_TEXT: &str = "No records found.";
pub const COLUMNS: [&str; 8] = ["ID", "First Name", "Last Name", "Gender", "Age", "Weight", "Height", "Health History"];

/// A record as it may be shown to the current viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub age: i64,
    pub weight_kg: f64,
    pub height_cm: Option<f64>,
    pub history: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Rendered {
    /// Empty result; shown as [`NO_RECORDS_TEXT`] rather than an empty table.
    NoRecords,
    Rows(Vec<DisplayRow>),
}

impl Rendered {
    pub fn rows(&self) -> &[DisplayRow] {
        match self {
            Rendered::NoRecords => &[],
            Rendered::Rows(rows) => rows,
        }
    }
}

pub fn render(records: &[PatientRecord], capabilities: &Capabilities) -> Rendered {
    if records.is_empty() {
        return Rendered::NoRecords;
    }
    Rendered::Rows(records.iter().map(|r| display_row(r, capabilities)).collect())
}

fn display_row(record: &PatientRecord, capabilities: &Capabilities) -> DisplayRow {
    let (first_name, last_name) = if capabilities.redact_names {
        (NAME_MASK.to_string(), NAME_MASK.to_string())
    } else {
        (
            record.first_name.clone().unwrap_or_default(),
            record.last_name.clone().unwrap_or_default(),
        )
    };
    DisplayRow {
        id: record.id,
        first_name,
        last_name,
        gender: gender_label(&record.gender),
        age: record.age,
        weight_kg: record.weight_kg,
        height_cm: record.height_cm,
        history: record.history.clone().unwrap_or_default(),
    }
}

/// "Male"/"Female" for boolean and string-boolean values; anything else is shown as is.
pub fn gender_label(gender: &GenderField) -> String {
    match gender {
        GenderField::Flag(true) => "Male".to_string(),
        GenderField::Flag(false) => "Female".to_string(),
        GenderField::Text(s) if s == "true" => "Male".to_string(),
        GenderField::Text(s) if s == "false" => "Female".to_string(),
        GenderField::Text(s) => s.clone(),
        GenderField::Other(serde_json::Value::Null) => String::new(),
        GenderField::Other(v) => v.to_string(),
    }
}

fn cells(row: &DisplayRow) -> Vec<String> {
    vec![
        row.id.to_string(),
        row.first_name.clone(),
        row.last_name.clone(),
        row.gender.clone(),
        row.age.to_string(),
        row.weight_kg.to_string(),
        row.height_cm.map(|h| h.to_string()).unwrap_or_default(),
        row.history.clone(),
    ]
}

/// Text form of a render for terminal output.
pub fn format_rendered(rendered: &Rendered, max_width: usize, color_header: bool) -> String {
    match rendered {
        Rendered::NoRecords => NO_RECORDS_TEXT.to_string(),
        Rendered::Rows(rows) => {
            let body: Vec<Vec<String>> = rows.iter().map(cells).collect();
            render_table(&COLUMNS, &body, max_width, color_header)
        }
    }
}
