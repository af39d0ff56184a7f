use rocket::Responder;
use rocket::http::Header;
use serde::Serialize;

use crate::error::AppError;
use crate::models::{TaxRecord, record_columns};
use crate::uploads::extension_of;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Pdf,
    Link,
}

impl AttachmentKind {
    pub fn for_name(name: &str) -> Self {
        match extension_of(name).as_deref() {
            Some("png" | "jpg" | "jpeg" | "gif") => AttachmentKind::Image,
            Some("pdf") => AttachmentKind::Pdf,
            _ => AttachmentKind::Link,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttachmentView {
    pub kind: AttachmentKind,
    pub url: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct FieldView {
    pub label: &'static str,
    pub value: String,
    pub attachment: Option<AttachmentView>,
}

/// One collapsible panel of a records page.
#[derive(Debug, Serialize)]
pub struct RecordPanel {
    pub number: usize,
    pub dom_id: String,
    pub fields: Vec<FieldView>,
}

pub fn upload_url(key: &str) -> String {
    format!("/uploads/{}", key)
}

fn attachment_view(record: &TaxRecord) -> Option<AttachmentView> {
    let key = record.file.as_deref()?;
    let name = record.document_name().unwrap_or(key).to_string();

    Some(AttachmentView {
        kind: AttachmentKind::for_name(&name),
        url: upload_url(key),
        name,
    })
}

pub fn record_panels(records: &[TaxRecord]) -> Vec<RecordPanel> {
    let columns = record_columns();

    records
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            let fields = columns
                .iter()
                .zip(record.cells())
                .filter_map(|(&label, value)| {
                    if label != "file" {
                        return Some(FieldView {
                            label,
                            value,
                            attachment: None,
                        });
                    }

                    // Rows without a document render nothing for the column.
                    attachment_view(record).map(|attachment| FieldView {
                        label,
                        value,
                        attachment: Some(attachment),
                    })
                })
                .collect();

            RecordPanel {
                number: idx + 1,
                dom_id: format!("record{}", idx),
                fields,
            }
        })
        .collect()
}

/// Serializes `records` as CSV with the full column list as header.
pub fn export_csv(records: &[TaxRecord]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(record_columns())?;
    for record in records {
        writer.write_record(record.cells())?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to flush CSV export: {}", e)))?;

    String::from_utf8(bytes)
        .map_err(|e| AppError::Internal(format!("CSV export is not valid UTF-8: {}", e)))
}

#[derive(Responder)]
#[response(content_type = "text/csv")]
pub struct CsvAttachment {
    body: String,
    disposition: Header<'static>,
}

impl CsvAttachment {
    pub fn new(filename: &str, body: String) -> Self {
        Self {
            body,
            disposition: Header::new(
                "Content-Disposition",
                format!("attachment;filename={}", filename),
            ),
        }
    }
}
