use afforms_core::{create_form_table, format_form, Database, FormsQuery, Result};
use afforms_scrapers::{ChromeEngine, EPubsScraper, ScrapeConfig, DEFAULT_LISTING_URLS};
use clap::{Parser, Subcommand};
use csv::Writer;
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the e-publishing form index into the local database
    Scrape(ScrapeCommand),

    /// Keyword search over stored forms
    Search(SearchCommand),

    /// Look up one form by its exact form number
    Get(GetCommand),

    /// Export all stored forms to CSV
    Export(ExportCommand),
}

#[derive(Parser)]
#[command(about = "Scrape the form index")]
#[command(
    long_about = "Walk each listing URL page by page, extract form metadata and insert anything not already stored. Already-stored form numbers are left untouched."
)]
struct ScrapeCommand {
    /// Listing URLs to walk; defaults to the e-publishing product index views
    urls: Vec<String>,

    /// Maximum number of pages to walk per URL (-c, --max-pages)
    #[arg(short = 'c', long)]
    max_pages: Option<u32>,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "af_forms.db")]
    database: PathBuf,
}

#[derive(Parser)]
#[command(about = "Search stored forms by keyword")]
struct SearchCommand {
    /// Matched case-insensitively against title, description and form number
    keyword: String,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "af_forms.db")]
    database: PathBuf,
}

#[derive(Parser)]
#[command(about = "Look up a form by exact number")]
struct GetCommand {
    form_number: String,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "af_forms.db")]
    database: PathBuf,
}

#[derive(Parser)]
#[command(about = "Export stored forms to CSV")]
struct ExportCommand {
    /// Output file path (-o, --output)
    #[arg(short = 'o', long, default_value = "forms.csv")]
    output: PathBuf,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "af_forms.db")]
    database: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scrape(cmd) => {
            let urls: Vec<String> = if cmd.urls.is_empty() {
                DEFAULT_LISTING_URLS.iter().map(|u| u.to_string()).collect()
            } else {
                cmd.urls
            };

            // Store open and session setup are the two fatal failure
            // classes; everything past this point logs and continues. The
            // store opens first so a failure there never strands a browser
            // session that only `run` would have released.
            let db = Database::new(&cmd.database).await?;
            let engine = ChromeEngine::launch().await?;

            let config = ScrapeConfig {
                max_pages: cmd.max_pages,
                ..ScrapeConfig::default()
            };
            let scraper = EPubsScraper::with_config(Box::new(engine), config);
            scraper.run(&db, &urls).await?;

            let total = db.list_forms().await?.len();
            info!(total, "scrape finished");
        }
        Commands::Search(cmd) => {
            let db = Database::new(&cmd.database).await?;
            let query = FormsQuery::new(db);

            let results = query.search(&cmd.keyword).await?;
            if results.is_empty() {
                println!("No forms matched \"{}\"", cmd.keyword);
            } else {
                println!("{}", create_form_table(&results));
            }
        }
        Commands::Get(cmd) => {
            let db = Database::new(&cmd.database).await?;
            let query = FormsQuery::new(db);

            match query.get_by_number(&cmd.form_number).await? {
                Some(record) => print!("{}", format_form(&record)),
                None => println!("Form \"{}\" not found", cmd.form_number),
            }
        }
        Commands::Export(cmd) => {
            let db = Database::new(&cmd.database).await?;
            let forms = db.list_forms().await?;

            let mut writer = Writer::from_path(&cmd.output)?;
            writer.write_record(["Form Number", "Title", "Description", "Category", "PDF URL"])?;
            for form in &forms {
                writer.write_record([
                    form.form_number.as_str(),
                    form.title.as_str(),
                    form.description.as_str(),
                    form.category.as_str(),
                    form.pdf_url.as_str(),
                ])?;
            }
            writer.flush()?;
            info!(count = forms.len(), output = %cmd.output.display(), "exported forms");
        }
    }

    Ok(())
}
