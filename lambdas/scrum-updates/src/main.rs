mod parameters;

use gateway::config::Config;
use gateway::Gateway;
use lambda_http::{run, service_fn, Error, Request};

/// JSON lines for CloudWatch, without timestamps (CloudWatch adds its own) or targets.
fn init_logging() {
    tracing_subscriber::fmt()
        .json()
        .with_max_level(tracing::Level::INFO)
        .with_current_span(false)
        .with_target(false)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging();

    let vars = parameters::load_environment().await?;
    let config = Config::from_lookup(|name| vars.get(name).cloned())?;
    tracing::info!(
        credentials = config.credentials.kind(),
        accounts = %config.urls.accounts,
        api = %config.urls.api,
        module = %config.module,
        "Loaded configuration"
    );

    let client = zoho::Client::new(config.urls.clone(), config.module.clone(), config.timeout)?;
    let gateway_ref = &Gateway::new(client, config);

    run(service_fn(move |event: Request| async move {
        Ok::<_, Error>(gateway_ref.handle(event).await)
    }))
    .await?;
    Ok(())
}
