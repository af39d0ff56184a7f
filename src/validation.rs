use std::convert::Infallible;

use tracing::debug;

use crate::models::{NewTaxRecord, RecordForm, TaxFigures};
use crate::uploads::StoredFile;

/// Outcome of coercing one numeric form field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coerced {
    pub value: f64,
    /// True when the input was missing, empty or unparseable and `value` is
    /// the 0.0 fallback rather than something the user typed.
    pub defaulted: bool,
}

impl Coerced {
    const DEFAULT: Coerced = Coerced {
        value: 0.0,
        defaulted: true,
    };
}

/// Parses free-text money input: surrounding whitespace and thousands
/// separators are dropped, anything that still isn't a finite number becomes
/// 0.0.
pub fn coerce_amount(raw: Option<&str>) -> Coerced {
    let Some(raw) = raw else {
        return Coerced::DEFAULT;
    };

    match raw.replace(',', "").trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Coerced {
            value,
            defaulted: false,
        },
        _ => Coerced::DEFAULT,
    }
}

/// A submission after boundary validation: text fields as typed, figures
/// coerced.
#[derive(Debug, Clone)]
pub struct RecordSubmission {
    pub firm_name: Option<String>,
    pub date_period: Option<String>,
    pub figures: TaxFigures,
    /// Columns whose value fell back to 0.0.
    pub defaulted: Vec<&'static str>,
}

impl RecordSubmission {
    pub fn from_form(form: &RecordForm<'_>) -> Self {
        let mut defaulted = Vec::new();

        let figures = TaxFigures::try_from_columns::<Infallible>(|column| {
            let coerced = coerce_amount(form.raw_figure(column));
            if coerced.defaulted {
                defaulted.push(column);
            }
            Ok(coerced.value)
        })
        .unwrap_or_else(|never| match never {});

        if !defaulted.is_empty() {
            debug!(fields = ?defaulted, "Numeric fields defaulted to 0.0");
        }

        Self {
            firm_name: form.firm_name.map(str::to_string),
            date_period: form.date_period.map(str::to_string),
            figures,
            defaulted,
        }
    }

    pub fn into_new_record(self, user_id: i64, attachment: Option<StoredFile>) -> NewTaxRecord {
        let (file, file_name) = match attachment {
            Some(stored) => (Some(stored.key), Some(stored.original_name)),
            None => (None, None),
        };

        NewTaxRecord {
            firm_name: self.firm_name,
            date_period: self.date_period,
            figures: self.figures,
            file,
            file_name,
            user_id,
        }
    }
}
