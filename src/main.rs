use timetable_engine::config::Config;
use timetable_engine::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_filter.as_str())).init();

    let directory = config.load_directory()?;
    log::info!(
        "Directory loaded: {} faculty, {} subject(s)",
        directory.faculty.len(),
        directory.subjects.len()
    );

    server::run_server(&config, directory).await?;
    Ok(())
}
