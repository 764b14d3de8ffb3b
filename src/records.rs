//! Patient record shapes exchanged with the records service, plus the client-side parsing
//! of raw form input into typed requests.
//!
//! Records are owned by the service. The client only ever holds transient copies for
//! display and never writes them anywhere.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Gender as the service sends it: normally a JSON boolean, sometimes a string boolean.
/// Anything else is kept so presentation can pass it through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenderField {
    Flag(bool),
    Text(String),
    Other(serde_json::Value),
}

impl Default for GenderField {
    fn default() -> Self { GenderField::Other(serde_json::Value::Null) }
}

/// One row from `/query_all` or `/query_by_weight`.
///
/// The service drops `first_name`/`last_name` for researchers and may send a null
/// height or history, so those are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(rename = "patient_id")]
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub gender: GenderField,
    pub age: i64,
    #[serde(rename = "weight")]
    pub weight_kg: f64,
    #[serde(rename = "height", default)]
    pub height_cm: Option<f64>,
    #[serde(rename = "health_history", default)]
    pub history: Option<String>,
}

/// Body of `POST /add_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub gender: bool,
    pub age: i64,
    #[serde(rename = "weight")]
    pub weight_kg: f64,
    #[serde(rename = "height")]
    pub height_cm: f64,
    #[serde(rename = "health_history")]
    pub history: String,
}

/// Raw add-patient form values exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientForm {
    pub first_name: String,
    pub last_name: String,
    /// "true" for male, "false" for female (the form's select values).
    pub gender: String,
    pub age: String,
    pub weight: String,
    pub height: String,
    pub history: String,
}

impl PatientForm {
    /// Build a form from `key=value` pairs. Unknown keys are rejected so a typo does not
    /// silently submit an empty field.
    pub fn from_pairs<'a, I>(pairs: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut form = PatientForm::default();
        for (k, v) in pairs {
            let slot = match k.to_ascii_lowercase().as_str() {
                "first" | "first_name" => &mut form.first_name,
                "last" | "last_name" => &mut form.last_name,
                "gender" => &mut form.gender,
                "age" => &mut form.age,
                "weight" => &mut form.weight,
                "height" => &mut form.height,
                "history" | "health_history" => &mut form.history,
                other => return Err(AppError::invalid_record(format!("unknown patient field '{}'", other))),
            };
            *slot = v.to_string();
        }
        Ok(form)
    }

    pub fn parse(&self) -> AppResult<NewPatient> {
        let first_name = required_text("first name", &self.first_name)?;
        let last_name = required_text("last name", &self.last_name)?;
        let gender = match self.gender.trim().to_ascii_lowercase().as_str() {
            "true" | "male" | "m" => true,
            "false" | "female" | "f" => false,
            other => return Err(AppError::invalid_record(format!("gender must be true/false (male/female), got '{}'", other))),
        };
        let age = self
            .age
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|a| *a >= 0)
            .ok_or_else(|| AppError::invalid_record(format!("age must be a non-negative whole number, got '{}'", self.age.trim())))?;
        let weight_kg = finite_number("weight", &self.weight)?;
        let height_cm = finite_number("height", &self.height)?;
        Ok(NewPatient {
            first_name,
            last_name,
            gender,
            age,
            weight_kg,
            height_cm,
            history: self.history.trim().to_string(),
        })
    }
}

fn required_text(label: &str, raw: &str) -> AppResult<String> {
    let t = raw.trim();
    if t.is_empty() {
        return Err(AppError::invalid_record(format!("{} is required", label)));
    }
    Ok(t.to_string())
}

fn finite_number(label: &str, raw: &str) -> AppResult<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::invalid_record(format!("{} must be a number, got '{}'", label, raw.trim())))
}

/// Inclusive weight bounds for `/query_by_weight`. Only constructible with both bounds
/// present and numeric, so an incomplete search can never reach the gateway.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightRange {
    min: f64,
    max: f64,
}

impl WeightRange {
    pub fn parse(min: &str, max: &str) -> AppResult<Self> {
        let (min, max) = (min.trim(), max.trim());
        if min.is_empty() || max.is_empty() {
            return Err(AppError::invalid_search_range("Please enter both Min and Max weight"));
        }
        let parse = |label: &str, raw: &str| {
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| AppError::invalid_search_range(format!("{} weight must be a number, got '{}'", label, raw)))
        };
        Ok(WeightRange { min: parse("Min", min)?, max: parse("Max", max)? })
    }

    pub fn min(&self) -> f64 { self.min }
    pub fn max(&self) -> f64 { self.max }
}
