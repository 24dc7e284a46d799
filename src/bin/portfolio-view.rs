//! Renders every public portfolio section from a running API.
use chrono::Utc;
use clap::Parser;
use portfolio_api::client::PortfolioClient;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "portfolio-view",
    version,
    about = "Render the public portfolio sections of a running API"
)]
struct Args {
    /// API base URL
    #[arg(default_value = "http://127.0.0.1:3001")]
    base_url: String,

    /// Record a page view for this path while loading
    #[arg(long, value_name = "PATH")]
    record: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let client = match PortfolioClient::new(&args.base_url) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let page_view = args.record.map(|path| client.record_page_view(&path));
    let portfolio = client.load_portfolio().await;
    println!("{}", portfolio.render(Utc::now()));

    if let Some(handle) = page_view {
        let _ = handle.await;
    }
}
