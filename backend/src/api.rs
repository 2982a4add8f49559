use std::io;
use std::sync::{Arc, Mutex};

use actix_cors::Cors;
use actix_files::NamedFile;
use actix_multipart::Multipart;
use actix_web::{
    get,
    http::header,
    post,
    web::{self, Data},
    App, HttpResponse, HttpServer, Responder,
};
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use log::error;

use common::reading::{Reading, UploadMetadata};

use crate::config::Config;
use crate::db::Db;
use crate::ingest;
use crate::query::HistoryFilter;
use crate::utils;

#[get("/")]
async fn hello(_db: web::Data<Arc<Mutex<Db>>>) -> impl Responder {
    HttpResponse::Ok().body("pollen backend")
}

#[get("/api/devices")]
async fn api_devices(db: web::Data<Arc<Mutex<Db>>>) -> io::Result<impl Responder> {
    if let Ok(mut db) = db.lock() {
        if let Ok(res) = db.all_snapshots() {
            return Ok(web::Json(res));
        }
    }
    Err(io::Error::new(io::ErrorKind::BrokenPipe, "".to_string()))
}

#[derive(serde::Deserialize, Debug)]
struct HistoryQuery {
    device: Option<String>,
    from: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
}

#[get("/api/history")]
async fn api_history(
    query: web::Query<HistoryQuery>,
    db: web::Data<Arc<Mutex<Db>>>,
) -> io::Result<impl Responder> {
    let query = query.into_inner();
    let filter = HistoryFilter::new(query.device, query.from, query.until);
    if let Ok(mut db) = db.lock() {
        if let Ok(res) = db.query_history(&filter) {
            return Ok(web::Json(res));
        }
    }
    Err(io::Error::new(io::ErrorKind::BrokenPipe, "".to_string()))
}

async fn read_field(field: &mut actix_multipart::Field) -> actix_web::Result<Vec<u8>> {
    let mut data = Vec::new();
    while let Some(chunk) = field.try_next().await? {
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

/// Multipart upload from a camera unit: an `image` file part whose client
/// filename is the device name, and a `data` part with the metadata JSON.
/// Runs through the same reconcile path as streamed readings.
#[post("/api/upload")]
async fn api_upload(
    mut payload: Multipart,
    db: web::Data<Arc<Mutex<Db>>>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let mut device: Option<String> = None;
    let mut image_data: Option<Vec<u8>> = None;
    let mut metadata_raw: Option<Vec<u8>> = None;

    while let Some(mut field) = payload.try_next().await? {
        let field_name = field.name().to_owned();
        match field_name.as_str() {
            "image" => {
                device = field
                    .content_disposition()
                    .get_filename()
                    .map(str::to_owned);
                image_data = Some(read_field(&mut field).await?);
            }
            "data" => {
                metadata_raw = Some(read_field(&mut field).await?);
            }
            _ => {}
        }
    }

    let (Some(image_data), Some(metadata_raw)) = (image_data, metadata_raw) else {
        return Ok(HttpResponse::BadRequest().finish());
    };
    let Ok(metadata) = serde_json::from_slice::<UploadMetadata>(&metadata_raw) else {
        return Ok(HttpResponse::BadRequest().finish());
    };

    let device = device.unwrap_or_else(|| "unknown".to_owned());
    let timestamp = utils::upload_timestamp(metadata.timestamp.as_deref(), Utc::now());
    let filename = utils::image_filename(&device, timestamp);

    if let Err(err) = std::fs::write(config.uploads_path.join(&filename), &image_data) {
        error!("failed to store image {filename}: {err}");
        return Ok(HttpResponse::InternalServerError().finish());
    }

    let reading = Reading::from_upload(metadata, filename);

    if let Ok(mut db) = db.lock() {
        if let Err(err) = ingest::apply_reading(&mut db, &device, reading, timestamp) {
            error!("failed to store upload from {device}: {err:#}");
            return Ok(HttpResponse::InternalServerError().finish());
        }
        return Ok(HttpResponse::Ok().finish());
    }
    Ok(HttpResponse::InternalServerError().finish())
}

#[get("/images/{filename}")]
async fn api_image(
    path: web::Path<String>,
    config: web::Data<Config>,
) -> actix_web::Result<NamedFile> {
    let filename = path.into_inner();
    // stored filenames never contain separators
    if filename.chars().any(|c| c == '/' || c == '\\') || filename.contains("..") {
        return Err(actix_web::error::ErrorNotFound("no such image"));
    }
    NamedFile::open(config.uploads_path.join(filename))
        .map_err(|_| actix_web::error::ErrorNotFound("no such image"))
}

pub async fn new_http_server(db: Arc<Mutex<Db>>, config: Config) -> std::io::Result<()> {
    let bind = config.http_bind.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(Data::new(db.clone()))
            .app_data(Data::new(config.clone()))
            .service(hello)
            .service(api_devices)
            .service(api_history)
            .service(api_upload)
            .service(api_image)
            .wrap(
                Cors::default()
                    .allowed_origin(&config.allowed_origin)
                    .allowed_methods(vec!["GET", "POST"])
                    .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT])
                    .allowed_header(header::CONTENT_TYPE)
                    .supports_credentials()
                    .max_age(3600),
            )
    })
    .bind(bind)?
    .run()
    .await
}
