use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the tailnet gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "GATEWAY_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway health
    Health,
    /// List active links
    Links,
    /// Add or replace a link
    Put {
        actor_id: String,
        link_name: String,
        /// Link values as key=value (port, hostname, ts_authkey, funnel, tls_cert, tls_private_key)
        #[arg(short = 'v', long = "value", value_parser = parse_key_value)]
        values: Vec<(String, String)>,
    },
    /// Remove a link
    Delete { actor_id: String, link_name: String },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Health => {
            let res = client
                .get(format!("{}/admin/health", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Links => {
            let res = client
                .get(format!("{}/admin/links", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Put {
            actor_id,
            link_name,
            values,
        } => {
            let values: HashMap<String, String> = values.into_iter().collect();
            let res = client
                .put(format!("{}/admin/links/{}/{}", cli.url, actor_id, link_name))
                .headers(headers)
                .json(&values)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Delete {
            actor_id,
            link_name,
        } => {
            let res = client
                .delete(format!("{}/admin/links/{}/{}", cli.url, actor_id, link_name))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) if text.is_empty() => println!("OK ({})", status),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
