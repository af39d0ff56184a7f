use rocket::FromForm;
use rocket::fs::TempFile;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// Declares the numeric figures of a tax computation once and derives from
/// that list the typed figures, the submission form and the column metadata
/// shared by storage, rendering and export.
macro_rules! tax_figures {
    ($($field:ident => $column:tt),+ $(,)?) => {
        #[derive(Debug, Clone, Default, PartialEq, Serialize)]
        pub struct TaxFigures {
            $(
                #[serde(rename = $column)]
                pub $field: f64,
            )+
        }

        /// The submission form exactly as the browser posted it.
        #[derive(Debug, FromForm)]
        pub struct RecordForm<'r> {
            #[field(name = "FirmName")]
            pub firm_name: Option<&'r str>,
            #[field(name = "Date_Period")]
            pub date_period: Option<&'r str>,
            pub file: Option<TempFile<'r>>,
            $(
                #[field(name = $column)]
                pub $field: Option<&'r str>,
            )+
        }

        impl TaxFigures {
            pub const COLUMNS: &'static [&'static str] = &[$($column),+];

            pub fn values(&self) -> Vec<f64> {
                vec![$(self.$field),+]
            }

            /// Builds figures by looking each column up with `lookup`.
            pub fn try_from_columns<E>(
                mut lookup: impl FnMut(&'static str) -> Result<f64, E>,
            ) -> Result<Self, E> {
                Ok(Self {
                    $($field: lookup($column)?,)+
                })
            }
        }

        impl<'r> RecordForm<'r> {
            /// Raw text posted for the figure stored under `column`.
            pub fn raw_figure(&self, column: &str) -> Option<&'r str> {
                match column {
                    $($column => self.$field,)+
                    _ => None,
                }
            }
        }
    };
}

tax_figures! {
    net_profit => "net_profit",
    net_profit2 => "net_profit2",
    depreciation => "Depreciation",
    bribes => "Bribes",
    penalties => "Penalties",
    gifts_and_offers => "GiftsAndOffers",
    donations => "Donations",
    others => "Others",
    total_non_allowable_deductions => "TotalNonAllowableDeductions",
    adjusted_net_profit_before_tax => "AdjustedNetProfitBeforeTax",
    total_wear_and_tear2 => "TotalWearAndTear2",
    startup_costs => "StartupCosts",
    industrial_building_deduction => "IndustrialBuildingDeduction",
    initial_building_allowance => "InitialBuildingAllowance",
    horticultural_exp => "HorticulturalExp",
    others_nad => "OthersNAD",
    total_allowable_deductions => "TotalAllowableDeductions",
    chargeable_income => "ChargeableIncome",
    loss_bf => "LossBf",
    adjusted_chargeable_income => "AdjustedChargeableIncome",
    cooperation_tax => "CooperationTax",
    wht_paid => "WHTPaid",
    tax_credit => "TaxCredit",
    provisional_tax_paid => "ProvisionalTaxPaid",
    tax_payable_recoverable => "TaxPayableRecoverable",
    computers_data_software => "ComputersDataSoftware",
    plant_machinery => "PlantMachinery",
    automobiles => "Automobiles",
    others_not_in_class => "OthersNotInClass",
}

/// Full listing/export column order: identity, text fields, figures, file,
/// owner.
pub fn record_columns() -> Vec<&'static str> {
    let mut columns = vec!["id", "FirmName", "Date_Period"];
    columns.extend_from_slice(TaxFigures::COLUMNS);
    columns.extend_from_slice(&["file", "user_id"]);
    columns
}

/// Renders a stored figure the same way in HTML and CSV.
pub fn format_amount(value: f64) -> String {
    format!("{:?}", value)
}

#[derive(Debug, Clone, Serialize)]
pub struct TaxRecord {
    pub id: i64,
    pub firm_name: Option<String>,
    pub date_period: Option<String>,
    pub figures: TaxFigures,
    /// Storage key of the supporting document in the upload directory.
    pub file: Option<String>,
    /// Name the client uploaded the document under.
    pub file_name: Option<String>,
    pub user_id: i64,
}

impl TaxRecord {
    /// Name the document is listed and exported under.
    pub fn document_name(&self) -> Option<&str> {
        self.file_name.as_deref().or(self.file.as_deref())
    }

    /// Cell values in `record_columns()` order.
    pub fn cells(&self) -> Vec<String> {
        let mut cells = vec![
            self.id.to_string(),
            self.firm_name.clone().unwrap_or_default(),
            self.date_period.clone().unwrap_or_default(),
        ];
        cells.extend(self.figures.values().into_iter().map(format_amount));
        cells.push(self.document_name().unwrap_or_default().to_string());
        cells.push(self.user_id.to_string());
        cells
    }
}

impl<'r> FromRow<'r, SqliteRow> for TaxRecord {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let figures = TaxFigures::try_from_columns(|column| {
            row.try_get::<Option<f64>, _>(column)
                .map(Option::unwrap_or_default)
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            firm_name: row.try_get("FirmName")?,
            date_period: row.try_get("Date_Period")?,
            figures,
            file: row.try_get("file")?,
            file_name: row.try_get("file_name")?,
            user_id: row.try_get("user_id")?,
        })
    }
}

/// A record ready to be persisted; the store assigns the id.
#[derive(Debug, Clone, Default)]
pub struct NewTaxRecord {
    pub firm_name: Option<String>,
    pub date_period: Option<String>,
    pub figures: TaxFigures,
    pub file: Option<String>,
    pub file_name: Option<String>,
    pub user_id: i64,
}

impl NewTaxRecord {
    pub fn into_record(self, id: i64) -> TaxRecord {
        TaxRecord {
            id,
            firm_name: self.firm_name,
            date_period: self.date_period,
            figures: self.figures,
            file: self.file,
            file_name: self.file_name,
            user_id: self.user_id,
        }
    }
}
