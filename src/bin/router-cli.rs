use clap::{Args, Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "router-cli")]
#[command(about = "Control-plane CLI for the edge router", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "ROUTER_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show router namespace, mode and route count
    Status,
    /// List the route table
    Routes,
    /// Register (or re-register) a component's route
    Register(RegisterArgs),
    /// Remove a component's route
    Remove {
        component: String,
    },
    /// Show which route a request would match
    Match {
        host: String,
        #[arg(default_value = "/")]
        uri: String,
    },
}

#[derive(Args)]
struct RegisterArgs {
    /// Owning component name
    component: String,

    /// Route pattern, e.g. "dev.example.com/api" or "/docs"
    pattern: String,

    /// URL destination
    #[arg(long, conflicts_with = "bucket", required_unless_present = "bucket")]
    url: Option<String>,

    /// Bucket destination domain
    #[arg(long)]
    bucket: Option<String>,

    /// Key prefix for a bucket destination
    #[arg(long, requires = "bucket")]
    dir: Option<String>,

    /// Rewrite regex applied to the URI before dispatch
    #[arg(long, requires = "rewrite_to")]
    rewrite_regex: Option<String>,

    /// Replacement for the rewrite regex
    #[arg(long, requires = "rewrite_regex")]
    rewrite_to: Option<String>,

    /// Origin connection attempts
    #[arg(long)]
    attempts: Option<u32>,
}

impl RegisterArgs {
    fn into_body(self) -> Value {
        let destination = match (self.url, self.bucket) {
            (Some(url), _) => json!({ "type": "url", "url": url }),
            (None, Some(domain)) => json!({ "type": "bucket", "domain": domain, "dir": self.dir }),
            (None, None) => Value::Null,
        };
        let mut body = json!({
            "component": self.component,
            "pattern": self.pattern,
            "destination": destination,
        });
        if let (Some(regex), Some(to)) = (self.rewrite_regex, self.rewrite_to) {
            body["rewrite"] = json!({ "regex": regex, "to": to });
        }
        if let Some(attempts) = self.attempts {
            body["origin"] = json!({ "connectionAttempts": attempts });
        }
        body
    }
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

    let base = cli.url.trim_end_matches('/');
    let request = match cli.command {
        Commands::Status => client.get(format!("{base}/admin/status")),
        Commands::Routes => client.get(format!("{base}/admin/routes")),
        Commands::Register(args) => client.put(format!("{base}/admin/routes")).json(&args.into_body()),
        Commands::Remove { component } => client.delete(format!("{base}/admin/routes/{component}")),
        Commands::Match { host, uri } => client
            .get(format!("{base}/admin/match"))
            .query(&[("host", host), ("uri", uri)]),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            if !text.is_empty() {
                eprintln!("Response: {}", text);
            }
        }
        std::process::exit(1);
    }

    let text = res.text().await?;
    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }
    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
