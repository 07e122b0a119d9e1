use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Operator CLI for the league gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3001")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway health
    Health,
    /// List buffered security events (development builds only)
    Events {
        /// Only events of this type, e.g. AUTH_FAILURE
        #[arg(short = 't', long = "type")]
        event_type: Option<String>,
        /// Newest N events
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Drop every buffered security event (development builds only)
    ClearEvents,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
        Commands::Events { event_type, limit } => {
            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(t) = event_type {
                query.push(("type", t));
            }
            if let Some(n) = limit {
                query.push(("limit", n.to_string()));
            }
            client
                .get(format!("{}/api/dev/security-events", base))
                .query(&query)
                .send()
                .await?
        }
        Commands::ClearEvents => {
            client
                .delete(format!("{}/api/dev/security-events", base))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        if status == reqwest::StatusCode::NOT_FOUND {
            eprintln!("Is the gateway running with NODE_ENV=development?");
        }
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Err(format!("gateway returned status {}", status).into());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
