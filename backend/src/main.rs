use std::sync::{Arc, Mutex};

use actix_web::rt::net::UdpSocket;
use anyhow::Result;
use chrono::Utc;
use log::{error, info, warn};
use tokio::signal;

use common::reading::Reading;

mod api;
mod config;
mod db;
mod ingest;
mod query;
mod reconcile;
mod schema;
mod utils;

#[actix_web::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = config::Config::from_env()?;
    std::fs::create_dir_all(&config.uploads_path)?;

    let sock = UdpSocket::bind(config.ingest_bind.as_str()).await?;

    let db = Arc::new(Mutex::new(db::Db::connect(&config.database_url)?));
    let web_db = db.clone();

    let device = config.ingest_device.clone();
    info!("listening for readings on {}", config.ingest_bind);

    let task = actix_web::rt::spawn(async move {
        let mut buf = [0; 4096];
        loop {
            tokio::select! {
                Ok((len, _addr)) = sock.recv_from(&mut buf) => {
                    match serde_json::from_slice::<Reading>(&buf[0..len]) {
                        Ok(reading) => {
                            if let Ok(mut db) = db.lock() {
                                if let Err(err) = ingest::apply_reading(&mut db, &device, reading, Utc::now()) {
                                    error!("failed to store reading: {err:#}");
                                }
                            }
                        }
                        Err(err) => warn!("dropping undecodable reading: {err}"),
                    }
                }
                Ok(()) = signal::ctrl_c() => { break; }
            }
        }
    });

    let _ = tokio::join!(api::new_http_server(web_db, config), task);
    Ok(())
}
