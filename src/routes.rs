use std::path::{Path, PathBuf};

use rocket::State;
use rocket::form::Form;
use rocket::fs::NamedFile;
use rocket::request::FlashMessage;
use rocket_dyn_templates::{Template, context};
use tracing::info;

use crate::auth::{AdminUser, Notice, Permission, SessionUser};
use crate::error::AppError;
use crate::models::{RecordForm, TaxFigures};
use crate::presentation::{CsvAttachment, export_csv, record_panels};
use crate::repository::DynRepository;
use crate::uploads::FileStore;
use crate::validation::RecordSubmission;

#[get("/")]
pub fn index(user: Option<SessionUser>, flash: Option<FlashMessage<'_>>) -> Template {
    Template::render(
        "index",
        context! {
            title: "Tax Computation",
            current_user: user,
            notice: flash.map(Notice::from),
            figure_columns: TaxFigures::COLUMNS,
        },
    )
}

#[post("/compute", data = "<form>")]
pub async fn compute(
    user: SessionUser,
    mut form: Form<RecordForm<'_>>,
    repository: &State<DynRepository>,
    store: &State<FileStore>,
) -> Result<Template, AppError> {
    user.require_permission(Permission::SubmitRecords)?;

    // The document is written before the row; a failed insert leaves it behind.
    let attachment = match form.file.as_mut() {
        Some(upload) => store.save(upload).await?,
        None => None,
    };

    let submission = RecordSubmission::from_form(&form);
    let record = submission.into_new_record(user.id, attachment);
    let record_id = repository.insert_record(record).await?;

    info!(record_id, username = %user.username, "Record saved");

    Ok(Template::render(
        "saved",
        context! {
            title: "Record saved",
            current_user: user,
            record_id: record_id,
        },
    ))
}

#[get("/my_records")]
pub async fn my_records(
    user: SessionUser,
    repository: &State<DynRepository>,
) -> Result<Template, AppError> {
    user.require_permission(Permission::ViewOwnRecords)?;

    let records = repository.list_records_for_user(user.id).await?;

    Ok(Template::render(
        "records",
        context! {
            title: "My Tax Records",
            csv_url: uri!(download_my_csv).to_string(),
            records: record_panels(&records),
            current_user: user,
        },
    ))
}

#[get("/download_my_csv")]
pub async fn download_my_csv(
    user: SessionUser,
    repository: &State<DynRepository>,
) -> Result<CsvAttachment, AppError> {
    user.require_permission(Permission::ExportOwnRecords)?;

    let records = repository.list_records_for_user(user.id).await?;
    info!(count = records.len(), username = %user.username, "Exporting own records");

    Ok(CsvAttachment::new("my_tax_records.csv", export_csv(&records)?))
}

#[get("/records")]
pub async fn all_records(
    admin: AdminUser,
    repository: &State<DynRepository>,
) -> Result<Template, AppError> {
    let records = repository.list_all_records().await?;

    Ok(Template::render(
        "records",
        context! {
            title: "All Tax Records",
            csv_url: uri!(download_csv).to_string(),
            records: record_panels(&records),
            current_user: admin.0,
        },
    ))
}

#[get("/download_csv")]
pub async fn download_csv(
    admin: AdminUser,
    repository: &State<DynRepository>,
) -> Result<CsvAttachment, AppError> {
    let records = repository.list_all_records().await?;
    info!(count = records.len(), username = %admin.0.username, "Exporting all records");

    Ok(CsvAttachment::new("tax_records.csv", export_csv(&records)?))
}

/// Serves a document by storage key or, failing that, by the name it was
/// uploaded under (newest upload wins).
#[get("/uploads/<name..>")]
pub async fn uploaded_file(
    name: PathBuf,
    store: &State<FileStore>,
    repository: &State<DynRepository>,
) -> Result<Option<NamedFile>, AppError> {
    if let Some(file) = store.open(&name).await {
        return Ok(Some(file));
    }

    let Some(file_name) = name.to_str() else {
        return Ok(None);
    };

    match repository.latest_file_key(file_name).await? {
        Some(key) => Ok(store.open(Path::new(&key)).await),
        None => Ok(None),
    }
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}
