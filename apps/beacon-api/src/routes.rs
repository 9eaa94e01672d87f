use axum::{
	Json, Router,
	extract::{
		Path, Request, State,
		rejection::{JsonRejection, PathRejection},
	},
	http::{HeaderMap, StatusCode, header::AUTHORIZATION},
	middleware::{self, Next},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use crate::state::AppState;
use beacon_domain::{preferences::PreferencesPatch, source::Source};
use beacon_service::{
	DateRange, EstimateRequest, EstimateResponse, ImportFilters, ImportJobStatus, ImportRequest,
	ImportResponse, PreferencesResponse,
};

pub const HEADER_USER_ID: &str = "x-beacon-user-id";
pub const HEADER_COMPANY_ID: &str = "x-beacon-company-id";
pub const HEADER_SOURCE_TOKEN: &str = "x-beacon-source-token";

#[derive(Debug, Deserialize)]
struct ImportBody {
	#[serde(with = "beacon_service::time_serde::date")]
	start_date: Date,
	#[serde(default, with = "beacon_service::time_serde::date::option")]
	end_date: Option<Date>,
	#[serde(default)]
	max_items: Option<u32>,
	/// Gmail spelling of `max_items`.
	#[serde(default)]
	max_emails: Option<u32>,
	#[serde(default)]
	query: Option<String>,
	#[serde(default)]
	calendar_id: Option<String>,
	#[serde(default)]
	folder_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

impl From<beacon_service::Error> for ApiError {
	fn from(err: beacon_service::Error) -> Self {
		use beacon_service::Error;

		match err {
			Error::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None),
			Error::InvalidField { field, message } =>
				json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, Some(vec![field])),
			Error::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message, None),
			Error::SourceAuthFailed { message } =>
				json_error(StatusCode::UNAUTHORIZED, "SOURCE_AUTH_FAILED", message, None),
			Error::SourceUnavailable { message } =>
				json_error(StatusCode::BAD_GATEWAY, "SOURCE_UNAVAILABLE", message, None),
			Error::Model { message } =>
				json_error(StatusCode::BAD_GATEWAY, "MODEL_ERROR", message, None),
			Error::Storage { message } => {
				tracing::error!(error = %message, "Storage error.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"STORAGE_ERROR",
					"Storage is unavailable.",
					None,
				)
			},
		}
	}
}

impl From<JsonRejection> for ApiError {
	fn from(err: JsonRejection) -> Self {
		json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", err.body_text(), None)
	}
}

impl From<PathRejection> for ApiError {
	fn from(err: PathRejection) -> Self {
		json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", err.body_text(), None)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/v1/imports/{source}", post(import))
		.route("/v1/imports/jobs/{job_id}", get(job_status))
		.route("/v1/preferences", get(get_preferences).put(update_preferences))
		.route("/v1/estimates", post(estimate))
		.route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
		.route("/health", get(health))
		.with_state(state)
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn import(
	State(state): State<AppState>,
	headers: HeaderMap,
	source: Result<Path<String>, PathRejection>,
	payload: Result<Json<ImportBody>, JsonRejection>,
) -> Result<Json<ImportResponse>, ApiError> {
	let Path(raw_source) = source?;
	let source = raw_source.parse::<Source>().map_err(|err| {
		json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", err.to_string(), Some(vec![
			"source".to_string(),
		]))
	})?;
	let Json(body) = payload?;
	let user_id = required_header(&headers, HEADER_USER_ID)?;
	let company_id = required_header(&headers, HEADER_COMPANY_ID)?;
	let token = required_header(&headers, HEADER_SOURCE_TOKEN)?;
	let req = ImportRequest {
		user_id,
		company_id,
		source,
		date_range: DateRange { start: body.start_date, end: body.end_date },
		filters: ImportFilters {
			query: body.query,
			calendar_id: body.calendar_id,
			folder_id: body.folder_id,
		},
		max_items: body.max_items.or(body.max_emails),
	};
	let response = state.service.import(req, &token).await?;

	Ok(Json(response))
}

async fn job_status(
	State(state): State<AppState>,
	headers: HeaderMap,
	job_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ImportJobStatus>, ApiError> {
	let Path(job_id) = job_id?;
	let user_id = required_header(&headers, HEADER_USER_ID)?;
	let status = state.service.job_status(&user_id, job_id).await?;

	Ok(Json(status))
}

async fn get_preferences(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<PreferencesResponse>, ApiError> {
	let user_id = required_header(&headers, HEADER_USER_ID)?;
	let response = state.service.get_preferences(&user_id).await?;

	Ok(Json(response))
}

async fn update_preferences(
	State(state): State<AppState>,
	headers: HeaderMap,
	payload: Result<Json<PreferencesPatch>, JsonRejection>,
) -> Result<Json<PreferencesResponse>, ApiError> {
	let user_id = required_header(&headers, HEADER_USER_ID)?;
	let Json(patch) = payload?;
	let response = state.service.update_preferences(&user_id, patch).await?;

	Ok(Json(response))
}

async fn estimate(
	State(state): State<AppState>,
	headers: HeaderMap,
	payload: Result<Json<EstimateRequest>, JsonRejection>,
) -> Result<Json<EstimateResponse>, ApiError> {
	required_header(&headers, HEADER_USER_ID)?;

	let Json(mut req) = payload?;

	if req.company_id.is_none() {
		req.company_id = optional_header(&headers, HEADER_COMPANY_ID);
	}

	let response = state.service.estimate(req).await?;

	Ok(Json(response))
}

async fn auth_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
	if let Some(expected) = state.service.cfg.security.api_auth_token.as_deref()
		&& read_bearer_token(req.headers()) != Some(expected)
	{
		return json_error(
			StatusCode::UNAUTHORIZED,
			"UNAUTHORIZED",
			"A valid Bearer token is required.",
			None,
		)
		.into_response();
	}

	next.run(req).await
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let raw = headers.get(AUTHORIZATION)?;
	let value = raw.to_str().ok()?.trim();
	let token = value.strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
}

fn optional_header(headers: &HeaderMap, name: &str) -> Option<String> {
	headers
		.get(name)
		.and_then(|value| value.to_str().ok())
		.map(str::trim)
		.filter(|value| !value.is_empty())
		.map(str::to_string)
}

fn required_header(headers: &HeaderMap, name: &str) -> Result<String, ApiError> {
	optional_header(headers, name).ok_or_else(|| {
		json_error(
			StatusCode::BAD_REQUEST,
			"INVALID_REQUEST",
			format!("{name} header is required."),
			Some(vec![name.to_string()]),
		)
	})
}
