use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wikigal::config::{self, Config};
use wikigal::imaging::{NormalizeParams, RawImage, normalize};
use wikigal::pipeline::Publisher;
use wikigal::sources::HttpImageSource;
use wikigal::wiki::{Credentials, MediaWikiClient};
use wikigal::workbook::{JsonWorkbook, RowStore};
use wikigal::{markup, output};

#[derive(Parser)]
#[command(name = "wikigal")]
#[command(about = "Publish workbook images to MediaWiki galleries")]
#[command(long_about = "\
Publish workbook images to MediaWiki galleries

Each pending row of the workbook's upload sheet is fetched, normalized to a
PNG of at most 1024px and 1 MiB, uploaded as <Type><Number>.png, and added to
the <gallery> under the ==<Type>== heading of the row's page.

Workbook layout (JSON, keys are the sheet's column headers):

  {
    \"upload\":  [{\"Image\": \"https://…\", \"Page\": \"Outfit Gallery\", \"Type\": \"Outfits\",
                 \"Asset Designer\": \"Ana\", \"Layers\": \"\", \"Process\": \"\"}],
    \"content\": [{\"Type\": \"Outfits\", \"Number\": 12}]
  }

Process column:
  (empty)      pending
  Failed       pending; re-uploaded with warnings ignored
  Successful   done
  Skip, Hold   left alone

Run 'wikigal gen-config' to generate a documented wikigal.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = "wikigal.toml", global = true)]
    config: PathBuf,

    /// Workbook file (overrides the config's `workbook`)
    #[arg(long, global = true)]
    workbook: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Wiki login for commands that edit the wiki.
#[derive(clap::Args, Clone)]
struct LoginArgs {
    /// Bot-password user name (`User@Bot`)
    #[arg(long, env = "WIKI_USERNAME")]
    username: Option<String>,

    /// Bot password
    #[arg(long, env = "WIKI_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

impl LoginArgs {
    fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Publish every pending workbook row to the wiki
    Run(LoginArgs),
    /// List workbook rows and the next number per type
    Status,
    /// Normalize a local image file to a size-bounded PNG
    Normalize {
        input: PathBuf,
        output: PathBuf,
    },
    /// Append a line to a section's gallery in a local wikitext file
    Insert {
        page: PathBuf,
        /// Section heading label, e.g. `Outfits`
        #[arg(long)]
        section: String,
        /// Gallery line, e.g. `File:Outfits12.png|Made by Ana`
        #[arg(long)]
        line: String,
        /// Rewrite the file instead of printing the patched page
        #[arg(long)]
        in_place: bool,
    },
    /// Print a stock wikigal.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wikigal=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(login) => {
            let config = config::load_config(&cli.config)?;
            let workbook_path = workbook_path(&cli.workbook, &config);
            let mut store = JsonWorkbook::open(&workbook_path)?;

            let images = HttpImageSource::new(&config.fetch, &config.wiki.user_agent)?;
            let mut wiki = MediaWikiClient::new(&config.wiki)?;
            let credentials = login.credentials();
            if credentials.is_none() {
                tracing::warn!("WIKI_USERNAME/WIKI_PASSWORD not set, editing anonymously");
            }
            wiki.connect(credentials.as_ref())?;

            println!("==> Publishing {}", workbook_path.display());
            let publisher = Publisher::new(
                &images,
                &wiki,
                &wiki,
                NormalizeParams::from_config(&config.images),
            )
            .with_edit_pause(Duration::from_secs(config.wiki.edit_pause_secs));

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_row_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = publisher.run(&mut store, Some(tx));
            printer.join().ok();
            output::print_summary(&result?);
        }
        Command::Status => {
            let config = config::load_config(&cli.config)?;
            let store = JsonWorkbook::open(&workbook_path(&cli.workbook, &config))?;
            output::print_status(&store.read_rows()?, &store.read_counters()?);
        }
        Command::Normalize { input, output: out } => {
            let config = config::load_config(&cli.config)?;
            let params = NormalizeParams::from_config(&config.images);
            let raw = RawImage::new(std::fs::read(&input)?);
            let image = normalize(&raw, &params)?;
            std::fs::write(&out, &image.bytes)?;
            output::print_normalized(&out.display().to_string(), &image, params.max_bytes);
        }
        Command::Insert {
            page,
            section,
            line,
            in_place,
        } => {
            let text = std::fs::read_to_string(&page)?;
            let patched = markup::insert_gallery_entry(&text, &section, &line)?;
            if in_place {
                std::fs::write(&page, patched)?;
            } else {
                print!("{}", patched);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// The `--workbook` flag wins over the config file's `workbook` key.
fn workbook_path(flag: &Option<PathBuf>, config: &Config) -> PathBuf {
    flag.clone().unwrap_or_else(|| PathBuf::from(&config.workbook))
}
