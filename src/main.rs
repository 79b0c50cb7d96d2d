use apextrace::app::run::run_apextrace;
use apextrace::config::AppConfig;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = AppConfig::from_env();
    log::info!("data root: {}", config.data_root.display());
    run_apextrace(config)
}
