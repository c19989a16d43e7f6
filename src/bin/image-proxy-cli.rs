use std::sync::Arc;

use clap::{Parser, Subcommand};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

use image_proxy::config::loader::split_list;
use image_proxy::token::{
    codec, Clock, HostPolicy, ManualClock, SystemClock, Token, TokenSigner, Verifier,
};

#[derive(Parser)]
#[command(name = "image-proxy-cli")]
#[command(about = "Management CLI for the signed image proxy", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Request a token from a running proxy
    Issue {
        /// Locator to authorize (absolute URL or root-relative path)
        locator: String,

        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,

        #[arg(short, long, env = "IMAGE_PROXY_API_KEY")]
        key: String,

        /// Requested lifetime in seconds
        #[arg(short, long)]
        ttl: Option<u64>,
    },
    /// Mint a token offline with the signing secret
    Sign {
        /// Locator to authorize, signed exactly as given
        locator: String,

        #[arg(short, long, env = "IMAGE_PROXY_SECRET", hide_env_values = true)]
        secret: String,

        #[arg(short, long, default_value_t = 300)]
        ttl: u64,
    },
    /// Decode a token and, given the secret, verify it
    Inspect {
        token: String,

        #[arg(short, long, env = "IMAGE_PROXY_SECRET", hide_env_values = true)]
        secret: Option<String>,

        /// Comma-separated allow-list to check the locator against
        #[arg(long, env = "IMAGE_PROXY_ALLOWED_HOSTS", default_value = "")]
        allowed_hosts: String,

        /// Verify as of this Unix timestamp instead of now
        #[arg(long)]
        at: Option<u64>,
    },
    /// Print a random 32-byte secret, hex encoded
    GenSecret,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Issue { locator, url, key, ttl } => {
            let client = reqwest::Client::new();

            let mut headers = HeaderMap::new();
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key))?,
            );

            let mut body = json!({ "url": locator });
            if let Some(ttl) = ttl {
                body["ttlSeconds"] = json!(ttl);
            }

            let res = client
                .post(format!("{}/api/image-proxy/token", url.trim_end_matches('/')))
                .headers(headers)
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Sign { locator, secret, ttl } => {
            let signer = TokenSigner::new(&secret)?;
            let issued = signer.issue_token(&locator, ttl);
            print_json(&json!({ "token": issued.token, "expiresAt": issued.expires_at }))?;
        }
        Commands::Inspect { token, secret, allowed_hosts, at } => {
            let Some(parts) = Token::parse(&token) else {
                eprintln!("Error: token does not have three segments");
                std::process::exit(1);
            };

            let mut report = json!({
                "locator": codec::decode(&parts.encoded_locator).ok(),
                "expiresAt": parts.expires_at.parse::<u64>().ok(),
            });

            if let Some(secret) = secret {
                let clock: Arc<dyn Clock> = match at {
                    Some(at) => Arc::new(ManualClock::new(at)),
                    None => Arc::new(SystemClock),
                };
                let signer = Arc::new(TokenSigner::with_clock(&secret, clock)?);
                let policy = HostPolicy::new(split_list(&allowed_hosts));
                let verifier = Verifier::new(signer, Arc::new(policy));
                let result = verifier.verify(&token);
                report["valid"] = json!(result.is_ok());
                if let Err(e) = result {
                    report["reason"] = json!(e.reason());
                }
            }
            print_json(&report)?;
        }
        Commands::GenSecret => {
            let secret: [u8; 32] = rand::thread_rng().gen();
            println!("{}", hex::encode(secret));
        }
    }

    Ok(())
}

fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    print_json(&json)
}
