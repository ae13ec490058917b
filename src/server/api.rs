//! REST API handlers

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::state::AppState;
use crate::core::{ConversionOptions, ConvertError, UploadedImage};
use crate::utils::sanitize_filename;

/// Successful conversion
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversionResponse {
    pub filename: String,
    pub original_size: u64,
    pub converted_size: u64,
    pub conversion_time: f64,
    pub download_url: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub custom_filename: Option<String>,
}

pub async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": state.settings.project_name }))
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Local::now(),
    })
}

/// Convert an uploaded HEIC/HEIF image to JPEG
pub async fn convert_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ConversionResponse>, ApiError> {
    let form = read_convert_form(&mut multipart, state.settings.max_file_size, state.settings.jpeg_quality).await?;
    let filename = format!("{}.jpg", form.upload.stem());

    let converter = state.converter.clone();
    let conversion = tokio::task::spawn_blocking(move || converter.convert(&form.upload, &form.options))
        .await
        .map_err(|e| {
            log::error!("Conversion task failed: {}", e);
            ApiError::internal("Error during conversion")
        })??;

    let response = ConversionResponse {
        filename,
        original_size: conversion.result.original_size,
        converted_size: conversion.result.converted_size,
        conversion_time: conversion.result.conversion_time.as_secs_f64(),
        download_url: state.settings.download_url(&conversion.result.output_name),
    };

    state.store().schedule_delete(&conversion.input_name);

    Ok(Json(response))
}

/// Download a converted image
pub async fn download_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Query(params): Query<DownloadParams>,
) -> Result<Response, ApiError> {
    let path = state.store().locate(&filename)?;

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            // reaped between locate and read
            ConvertError::NotFound
        } else {
            ConvertError::StorageError(e)
        }
    })?;

    let download_name = params
        .custom_filename
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(sanitize_filename)
        .unwrap_or(filename);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/jpeg")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download_name),
        )
        .body(Body::from(bytes))
        .map_err(|e| {
            log::error!("Failed to build download response: {}", e);
            ApiError::internal("Failed to prepare download")
        })
}

struct ConvertForm {
    upload: UploadedImage,
    options: ConversionOptions,
}

/// Reads the multipart form. The file is consumed chunk by chunk and abandoned once it
/// exceeds `max_size`, so an oversized upload is never held in memory whole.
async fn read_convert_form(
    multipart: &mut Multipart,
    max_size: u64,
    default_quality: u8,
) -> Result<ConvertForm, ConvertError> {
    let transport = |e: MultipartError| multipart_error(e, max_size);

    let mut options = ConversionOptions {
        quality: default_quality,
        ..Default::default()
    };
    let mut upload = None;

    while let Some(mut field) = multipart.next_field().await.map_err(transport)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let mut bytes = Vec::new();

            while let Some(chunk) = field.chunk().await.map_err(transport)? {
                let size = (bytes.len() + chunk.len()) as u64;
                if size > max_size {
                    return Err(ConvertError::TooLarge { size, max: max_size });
                }
                bytes.extend_from_slice(&chunk);
            }

            upload = Some(UploadedImage::new(bytes, filename));
            continue;
        }

        let value = field.text().await.map_err(transport)?;
        let value = value.trim();
        match name.as_str() {
            "quality" => {
                if let Some(quality) = parse_int(&name, value)? {
                    options.quality = u8::try_from(quality)
                        .ok()
                        .filter(|q| (1..=100).contains(q))
                        .ok_or_else(|| {
                            ConvertError::InvalidParameter("Quality must be between 1 and 100".to_string())
                        })?;
                }
            }
            "resize" => {
                if let Some(resize) = parse_bool(&name, value)? {
                    options.resize = resize;
                }
            }
            "maintain_aspect_ratio" => {
                if let Some(keep) = parse_bool(&name, value)? {
                    options.maintain_aspect_ratio = keep;
                }
            }
            "width" => options.width = parse_dimension(&name, value)?,
            "height" => options.height = parse_dimension(&name, value)?,
            "rotate" => {
                options.rotate = parse_int(&name, value)?
                    .map(|degrees| i32::try_from(degrees).unwrap_or(0));
            }
            other => log::debug!("Ignoring unknown form field '{}'", other),
        }
    }

    let upload = upload.ok_or_else(|| ConvertError::InvalidParameter("Field 'file' is required".to_string()))?;

    Ok(ConvertForm { upload, options })
}

fn multipart_error(err: MultipartError, max_size: u64) -> ConvertError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ConvertError::TooLarge {
            size: max_size.saturating_add(1),
            max: max_size,
        };
    }

    ConvertError::InvalidParameter(format!("Malformed multipart body: {}", err.body_text()))
}

/// Empty values mean "not provided".
fn parse_int(name: &str, value: &str) -> Result<Option<i64>, ConvertError> {
    if value.is_empty() {
        return Ok(None);
    }

    value
        .parse::<i64>()
        .map(Some)
        .map_err(|_| ConvertError::InvalidParameter(format!("Field '{}' must be an integer", name)))
}

fn parse_dimension(name: &str, value: &str) -> Result<Option<u32>, ConvertError> {
    match parse_int(name, value)? {
        None => Ok(None),
        Some(n) if n >= 1 && n <= u32::MAX as i64 => Ok(Some(n as u32)),
        Some(_) => Err(ConvertError::InvalidParameter(format!(
            "Field '{}' must be a positive integer",
            name
        ))),
    }
}

fn parse_bool(name: &str, value: &str) -> Result<Option<bool>, ConvertError> {
    match value.to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "true" | "1" | "yes" | "on" | "t" | "y" => Ok(Some(true)),
        "false" | "0" | "no" | "off" | "f" | "n" => Ok(Some(false)),
        _ => Err(ConvertError::InvalidParameter(format!(
            "Field '{}' must be a boolean",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans_accept_form_spellings() {
        assert_eq!(parse_bool("resize", "True").unwrap(), Some(true));
        assert_eq!(parse_bool("resize", "on").unwrap(), Some(true));
        assert_eq!(parse_bool("resize", "0").unwrap(), Some(false));
        assert_eq!(parse_bool("resize", "").unwrap(), None);
        assert!(parse_bool("resize", "maybe").is_err());
    }

    #[test]
    fn dimensions_must_be_positive() {
        assert_eq!(parse_dimension("width", "600").unwrap(), Some(600));
        assert_eq!(parse_dimension("width", "").unwrap(), None);
        assert!(parse_dimension("width", "0").is_err());
        assert!(parse_dimension("width", "-5").is_err());
        assert!(parse_dimension("width", "wide").is_err());
    }

    #[test]
    fn integers_parse_with_sign() {
        assert_eq!(parse_int("rotate", "-90").unwrap(), Some(-90));
        assert!(parse_int("rotate", "ninety").is_err());
    }
}
