use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info};
use serde::Serialize;
use shared::{
    CorrectionUpdate, DetectSingleRequest, DetectSingleResponse, Label, ModelListResponse,
    NewsRecord, SaveResponse, SelectModelRequest,
};

use crate::classifier::registry::ModelRegistry;
use crate::classifier::{ClassifierError, Predictor};
use crate::correction::{CorrectedRow, jakarta_timestamp};
use crate::eval;
use crate::ingest::{self, IngestError};
use crate::session::{DashboardSession, SessionError, SessionState};
use crate::storage::blob_store::StorageError;
use crate::storage::correction_log::CorrectionLog;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("no active session; upload a file first")]
    NoSession,
    #[error(transparent)]
    Upload(#[from] IngestError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Model(#[from] ClassifierError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Upload(_) | ApiError::Session(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NoSession => StatusCode::CONFLICT,
            ApiError::Model(ClassifierError::UnknownModel(_)) => StatusCode::BAD_REQUEST,
            ApiError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Storage(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, frontend_dir: String) {
    cfg.service(web::resource("/api/models").route(web::get().to(list_models)))
        .service(web::resource("/api/models/select").route(web::post().to(select_model)))
        .service(web::resource("/api/upload").route(web::post().to(upload)))
        .service(web::resource("/api/session").route(web::get().to(get_session)))
        .service(web::resource("/api/detect").route(web::post().to(detect)))
        .service(web::resource("/api/detect/single").route(web::post().to(detect_single)))
        .service(web::resource("/api/corrections").route(web::post().to(set_corrections)))
        .service(web::resource("/api/evaluation").route(web::get().to(evaluation)))
        .service(web::resource("/api/save").route(web::post().to(save)))
        .service(Files::new("/static", frontend_dir).show_files_listing());
}

async fn list_models(
    registry: web::Data<ModelRegistry>,
    state: web::Data<SessionState>,
) -> HttpResponse {
    let selected = state.selected_model.lock().unwrap().clone();
    HttpResponse::Ok().json(ModelListResponse {
        models: registry.models(),
        selected: Some(selected),
    })
}

async fn select_model(
    registry: web::Data<ModelRegistry>,
    state: web::Data<SessionState>,
    request: web::Json<SelectModelRequest>,
) -> Result<HttpResponse, ApiError> {
    let model = request.into_inner().model;
    registry.load(&model)?;
    info!("model selected: {model}");
    *state.selected_model.lock().unwrap() = model.clone();
    Ok(HttpResponse::Ok().json(ModelListResponse {
        models: registry.models(),
        selected: Some(model),
    }))
}

async fn upload(
    state: web::Data<SessionState>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let mut file_data = Vec::new();
    // A truncated or malformed body is the uploader's problem to hear about,
    // not something to quietly treat as end-of-stream.
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::BadRequest(format!("upload failed: {e}")))?
    {
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| ApiError::BadRequest(format!("upload failed: {e}")))?;
            file_data.extend_from_slice(&data);
        }
    }

    let records = ingest::parse_upload(&file_data)?;
    info!("upload accepted: {} rows", records.len());

    let model = state.selected_model.lock().unwrap().clone();
    let session = DashboardSession::new(records);
    let view = session.view(&model);
    // A new upload replaces whatever session came before it.
    *state.session.lock().unwrap() = Some(session);

    Ok(HttpResponse::Ok().json(view))
}

async fn get_session(state: web::Data<SessionState>) -> Result<HttpResponse, ApiError> {
    let model = state.selected_model.lock().unwrap().clone();
    let guard = state.session.lock().unwrap();
    let session = guard.as_ref().ok_or(ApiError::NoSession)?;
    Ok(HttpResponse::Ok().json(session.view(&model)))
}

/// One predictor call per row. A failing row records its error message and
/// the rest of the batch proceeds.
pub(crate) fn run_detection(
    predictor: &dyn Predictor,
    records: &[NewsRecord],
) -> Vec<Result<Label, String>> {
    records
        .iter()
        .map(|record| {
            predictor
                .predict(&record.title, &record.content)
                .map_err(|e| {
                    error!("detection failed for \"{}\": {e}", record.title);
                    e.to_string()
                })
        })
        .collect()
}

async fn detect(
    registry: web::Data<ModelRegistry>,
    state: web::Data<SessionState>,
) -> Result<HttpResponse, ApiError> {
    // Detection always runs the reviewer's current selection, even when the
    // model was switched after the upload.
    let model = state.selected_model.lock().unwrap().clone();
    let records = {
        let guard = state.session.lock().unwrap();
        let session = guard.as_ref().ok_or(ApiError::NoSession)?;
        session.records()
    };

    let classifier = registry.load(&model)?;
    let outcomes = run_detection(classifier.as_ref(), &records);
    let failed = outcomes.iter().filter(|o| o.is_err()).count();
    if failed > 0 {
        error!(
            "detection finished with {failed} failed rows of {}",
            records.len()
        );
    }

    let mut guard = state.session.lock().unwrap();
    let session = guard.as_mut().ok_or(ApiError::NoSession)?;
    session.apply_detections(outcomes);
    Ok(HttpResponse::Ok().json(session.view(&model)))
}

async fn detect_single(
    registry: web::Data<ModelRegistry>,
    state: web::Data<SessionState>,
    request: web::Json<DetectSingleRequest>,
) -> Result<HttpResponse, ApiError> {
    let model = state.selected_model.lock().unwrap().clone();
    let classifier = registry.load(&model)?;
    let request = request.into_inner();
    let label = classifier.predict(&request.title, &request.content)?;
    Ok(HttpResponse::Ok().json(DetectSingleResponse { model, label }))
}

async fn set_corrections(
    state: web::Data<SessionState>,
    updates: web::Json<Vec<CorrectionUpdate>>,
) -> Result<HttpResponse, ApiError> {
    let model = state.selected_model.lock().unwrap().clone();
    let mut guard = state.session.lock().unwrap();
    let session = guard.as_mut().ok_or(ApiError::NoSession)?;
    session.set_corrections(&updates)?;
    Ok(HttpResponse::Ok().json(session.view(&model)))
}

async fn evaluation(state: web::Data<SessionState>) -> Result<HttpResponse, ApiError> {
    let pairs = {
        let guard = state.session.lock().unwrap();
        let session = guard.as_ref().ok_or(ApiError::NoSession)?;
        session.evaluation_pairs()
    };
    Ok(HttpResponse::Ok().json(eval::report(eval::tally(pairs))))
}

async fn save(
    state: web::Data<SessionState>,
    corrections: web::Data<CorrectionLog>,
) -> Result<HttpResponse, ApiError> {
    // Snapshot the flagged rows before awaiting the store; a failed save
    // must leave the session untouched.
    let rows: Vec<CorrectedRow> = {
        let guard = state.session.lock().unwrap();
        let session = guard.as_ref().ok_or(ApiError::NoSession)?;
        let timestamp = jakarta_timestamp();
        session
            .flagged_rows()
            .into_iter()
            .map(|(record, detection)| CorrectedRow::new(record, detection, true, timestamp.clone()))
            .collect()
    };

    let appended = corrections.append(&rows).await?;
    if appended == 0 {
        info!("save requested with no flagged rows");
    }
    Ok(HttpResponse::Ok().json(SaveResponse {
        appended,
        object: corrections.object().to_string(),
    }))
}
