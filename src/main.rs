use salesimport::{read_sales_file, template, Importer, MemoryStore};

use anyhow::{bail, Context};
use std::env;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

enum Command {
    Template,
    Validate { sales: String, users: String },
    Import { sales: String, users: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match parse_args() {
        Command::Template => {
            print!("{}", template());
            Ok(())
        }
        Command::Validate { sales, users } => run(&sales, &users, false).await,
        Command::Import { sales, users } => run(&sales, &users, true).await,
    }
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <command>", program);
    eprintln!("  template                          Print an example import file");
    eprintln!("  validate <sales.csv> <users.csv>  Check a file without importing");
    eprintln!("  import   <sales.csv> <users.csv>  Validate and import a file");
    eprintln!("  users.csv columns: email,first_name,last_name[,active]");
    std::process::exit(1);
}

fn parse_args() -> Command {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("salesimport");

    match args.get(1).map(String::as_str) {
        Some("template") if args.len() == 2 => Command::Template,
        Some("validate") if args.len() == 4 => Command::Validate {
            sales: args[2].clone(),
            users: args[3].clone(),
        },
        Some("import") if args.len() == 4 => Command::Import {
            sales: args[2].clone(),
            users: args[3].clone(),
        },
        _ => usage(program),
    }
}

fn check_csv_file(path: &str) -> anyhow::Result<()> {
    if !Path::new(path).exists() {
        bail!("File '{}' does not exist", path);
    }

    if !path.to_lowercase().ends_with(".csv") {
        bail!("File '{}' is not a CSV file", path);
    }

    Ok(())
}

async fn run(sales_path: &str, users_path: &str, commit: bool) -> anyhow::Result<()> {
    check_csv_file(sales_path)?;
    check_csv_file(users_path)?;

    let organization_id = Uuid::new_v4();
    let location_id = Uuid::new_v4();

    let store = Arc::new(MemoryStore::new());
    let users = tokio::fs::read_to_string(users_path)
        .await
        .with_context(|| format!("Failed to read '{}'", users_path))?;
    let loaded = store.load_users_csv(organization_id, &users).await?;
    tracing::info!(users = loaded, "Loaded salespeople");

    let text = read_sales_file(sales_path)
        .with_context(|| format!("Failed to read '{}'", sales_path))?;
    let importer = Importer::new(store);

    let output = if commit {
        serde_json::to_string_pretty(&importer.import(&text, organization_id, location_id).await?)?
    } else {
        serde_json::to_string_pretty(&importer.validate(&text, organization_id).await?)?
    };
    println!("{}", output);

    Ok(())
}
