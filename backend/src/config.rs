use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub http_bind: String,
    pub ingest_bind: String,
    /// Device name attributed to readings arriving on the ingest socket.
    /// The socket is one logical channel, so all of its readings belong to
    /// one device.
    pub ingest_device: String,
    pub uploads_path: PathBuf,
    pub allowed_origin: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            http_bind: env::var("HTTP_BIND").unwrap_or_else(|_| "127.0.0.1:8081".into()),
            ingest_bind: env::var("INGEST_BIND").unwrap_or_else(|_| "0.0.0.0:8989".into()),
            ingest_device: env::var("INGEST_DEVICE").unwrap_or_else(|_| "Test box".into()),
            uploads_path: env::var("UPLOADS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            allowed_origin: env::var("ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://127.0.0.1:8080".into()),
        })
    }
}
