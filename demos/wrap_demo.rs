use jetty_wrapper::{JettyWrapper, LaunchParams};
use std::env;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber
    // `with_env_filter` reads the RUST_LOG environment variable to set the log level.
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .init();

    tracing::info!("Starting wrap_demo");

    // Usage: wrap_demo [JETTY_HOME]; otherwise `$APP_ROOT/jetty` is used
    let params = LaunchParams {
        environment: Some("test".to_string()),
        jetty_home: env::args().nth(1).map(Into::into),
        ..LaunchParams::default()
    };

    let mut jetty = JettyWrapper::new();
    let status = jetty
        .wrap(params, |spec| async move {
            println!("Jetty should be reachable at {}", spec.url());
            println!("Solr home: {}", spec.solr_home().display());
            // A real caller would run its test suite here.
            tokio::time::sleep(std::time::Duration::from_secs(2)).await;
            Ok::<_, anyhow::Error>("work finished")
        })
        .await?;

    println!("{}", status);
    for record in jetty.events(None) {
        println!("{:?} {}", record.event, record.details.unwrap_or_default());
    }
    Ok(())
}
