mod config;
mod consultation;
mod dashboard;
mod db;
mod detran;
mod error;
mod extraction;
mod form;
mod gemini;
mod repl;
mod state;
mod types;

use config::Config;
use consultation::Orchestrator;
use db::HistoryStore;
use detran::DetranClient;
use env_logger::Env;
use gemini::GeminiOracle;
use log::{error, info};
use std::process;

#[macro_use]
extern crate failure;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    info!("Starting plate-debts");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };
    let conn = match db::open(&config.history_db) {
        Ok(conn) => conn,
        Err(e) => {
            error!("Unable to open {:?}: {}", config.history_db, e);
            process::exit(1);
        }
    };
    let app = Orchestrator::new(
        DetranClient::new(),
        GeminiOracle::new(&config.gemini_url, &config.gemini_model, &config.api_key),
        HistoryStore::new(conn),
        config.detran_url.clone(),
    );
    if let Err(e) = repl::run(repl::Session::new(app)).await {
        error!("Session failed: {}", e);
    }
    info!("Exiting main");
}
