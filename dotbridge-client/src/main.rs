use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dotbridge_core::{PathStyle, PathTranslator, ToolCall, ToolchainConfig, TOOLS};
use dotbridge_runner::ToolExecutor;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dotbridge")]
#[command(about = "Client for the dotbridge .NET toolchain server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Server URL
    #[arg(long, default_value = "http://localhost:5000")]
    server: String,

    /// Run the tool in this process instead of on the server
    #[arg(long)]
    local: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health
    Health,

    /// List the available tools
    Tools,

    /// Invoke any tool by name
    Call {
        /// Tool name (e.g., build_project)
        tool: String,

        /// Arguments as key=value pairs (e.g., projectPath=/mnt/c/App/App.csproj)
        args: Vec<String>,

        /// Arguments as a JSON object; key=value pairs override its fields
        #[arg(long)]
        json: Option<String>,
    },

    /// Build a project
    Build {
        /// Path to the .csproj or .sln file
        project: String,

        #[arg(short, long)]
        configuration: Option<String>,

        /// Only report errors
        #[arg(long)]
        quiet: bool,
    },

    /// Run the tests of a project
    Test {
        /// Path to the test project or solution
        project: String,

        #[arg(short, long)]
        configuration: Option<String>,

        /// Test filter expression
        #[arg(short, long)]
        filter: Option<String>,

        /// Collect code coverage
        #[arg(long)]
        coverage: bool,
    },

    /// Clean build outputs
    Clean {
        /// Path to the .csproj or .sln file
        project: String,

        #[arg(short, long)]
        configuration: Option<String>,
    },

    /// Show project metadata
    Info {
        /// Path to the .csproj file
        project: String,
    },

    /// Preview how a path is translated for the toolchain
    Translate {
        path: String,

        /// Target convention: auto, windows or posix
        #[arg(long, default_value = "auto")]
        style: PathStyle,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = Client::new();
    let server = cli.server.trim_end_matches('/');

    let (tool, arguments) = match cli.command {
        Commands::Health => {
            if check_health(&client, server).await {
                println!("Server is healthy");
                process::exit(0);
            } else {
                eprintln!("Server is unhealthy");
                process::exit(1);
            }
        }
        Commands::Tools => {
            let tools: Vec<Value> = if cli.local {
                TOOLS.iter().map(|t| t.to_json()).collect()
            } else {
                fetch_tools(&client, server).await?
            };
            print_tools(&tools);
            return Ok(());
        }
        Commands::Translate { path, style } => {
            println!("{}", PathTranslator::from_style(style).translate(&path));
            return Ok(());
        }
        Commands::Call { tool, args, json } => {
            (tool, build_arguments(json.as_deref(), &args)?)
        }
        Commands::Build {
            project,
            configuration,
            quiet,
        } => (
            "build_project".to_string(),
            json!({
                "projectPath": project,
                "configuration": configuration,
                "suppressWarnings": quiet,
            }),
        ),
        Commands::Test {
            project,
            configuration,
            filter,
            coverage,
        } => (
            "run_tests".to_string(),
            json!({
                "projectPath": project,
                "configuration": configuration,
                "filter": filter,
                "collectCoverage": coverage,
            }),
        ),
        Commands::Clean {
            project,
            configuration,
        } => (
            "clean_project".to_string(),
            json!({ "projectPath": project, "configuration": configuration }),
        ),
        Commands::Info { project } => (
            "get_project_info".to_string(),
            json!({ "projectPath": project }),
        ),
    };

    let report = if cli.local {
        call_local(&tool, arguments).await?
    } else {
        call_remote(&client, server, &tool, &arguments).await?
    };
    println!("{}", report);

    Ok(())
}

async fn check_health(client: &Client, server: &str) -> bool {
    match client.get(format!("{}/health", server)).send().await {
        Ok(response) => response.status().is_success(),
        Err(e) => {
            tracing::debug!(error = %e, "Health request failed");
            false
        }
    }
}

async fn fetch_tools(client: &Client, server: &str) -> anyhow::Result<Vec<Value>> {
    let response = client
        .get(format!("{}/api/v1/tools", server))
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", server))?;
    if !response.status().is_success() {
        bail!("Failed to list tools: {}", response.status());
    }

    let body: Value = response.json().await?;
    Ok(body["tools"].as_array().cloned().unwrap_or_default())
}

fn print_tools(tools: &[Value]) {
    println!("Found {} tool(s):\n", tools.len());
    for tool in tools {
        let name = tool["name"].as_str().unwrap_or("?");
        let description = tool["description"].as_str().unwrap_or("");
        println!("  {:<26} {}", name, description);
    }
}

async fn call_remote(
    client: &Client,
    server: &str,
    tool: &str,
    arguments: &Value,
) -> anyhow::Result<String> {
    let response = client
        .post(format!("{}/api/v1/tools/{}", server, tool))
        .json(arguments)
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", server))?;

    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        bail!("Server rejected {}: {} {}", tool, status, text);
    }
    Ok(text)
}

async fn call_local(tool: &str, arguments: Value) -> anyhow::Result<String> {
    let call = ToolCall::from_name(tool, arguments)?;
    let executor = ToolExecutor::from_config(&ToolchainConfig::default());
    Ok(executor.execute(call).await)
}

/// Merge an optional JSON object with `key=value` pairs. `true` and `false`
/// become booleans; every other value is a string.
fn build_arguments(json: Option<&str>, pairs: &[String]) -> anyhow::Result<Value> {
    let mut arguments = match json {
        Some(text) => match serde_json::from_str(text).context("Invalid --json value")? {
            Value::Object(map) => map,
            _ => bail!("--json must be a JSON object"),
        },
        None => Map::new(),
    };

    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Expected key=value, got '{}'", pair);
        };
        if key.is_empty() {
            bail!("Missing key in '{}'", pair);
        }
        let value = match value {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            other => Value::String(other.to_string()),
        };
        arguments.insert(key.to_string(), value);
    }

    Ok(Value::Object(arguments))
}
