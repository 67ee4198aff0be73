use std::process::ExitCode;

use brltracker::{DbConfig, app};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match DbConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("Invalid database configuration: {:#}", err);
            return ExitCode::FAILURE;
        }
    };

    app::run(&config, app::shutdown_signal()).await
}
