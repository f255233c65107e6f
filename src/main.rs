use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wikidump::config::{self, SiteConfig};
use wikidump::generate::{self, GenerateOptions};
use wikidump::output;
use wikidump::types::OutputFormat;

#[derive(Parser)]
#[command(name = "wikidump")]
#[command(about = "Convert MediaWiki XML dumps into static HTML or Markdown")]
#[command(long_about = "\
Convert MediaWiki XML dumps into static HTML or Markdown

Every page of the dump becomes one document named after its slug, every
category gets a listing document, and index.html (or index.md) links them all.

Output structure:

  out/
  ├── index.html                   # All pages and categories
  ├── main-page.html               # One document per page
  ├── category-birds.html          # One listing per category
  ├── manifest.json                # Summary (--manifest)
  └── main-page/
      └── 41.html                  # Older revisions (--dump-old-revisions)

Images are not part of a dump: [[File:…]] embeds become sized placeholder
images. Templates are removed.

Log verbosity follows RUST_LOG (default: info).
Run 'wikidump gen-config' to generate a documented wikidump.toml.")]
#[command(version)]
struct Cli {
    /// Directory containing wikidump.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for commands that read a dump.
#[derive(clap::Args, Clone)]
struct DumpArgs {
    /// MediaWiki XML export
    #[arg(long)]
    dump: PathBuf,

    /// Only read the first N pages
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Html,
    Markdown,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Html => OutputFormat::Html,
            FormatArg::Markdown => OutputFormat::Markdown,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Convert a dump into a folder of documents
    Convert {
        #[command(flatten)]
        input: DumpArgs,

        /// Output directory
        #[arg(long)]
        out: PathBuf,

        /// Output format (overrides output.format in wikidump.toml)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        /// Also write every older revision under <slug>/<revision>.<ext>
        #[arg(long)]
        dump_old_revisions: bool,

        /// Write manifest.json next to the documents
        #[arg(long)]
        manifest: bool,
    },
    /// Read and convert a dump without writing anything
    Check {
        #[command(flatten)]
        input: DumpArgs,
    },
    /// Print a stock wikidump.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if matches!(cli.command, Command::GenConfig) {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let site_config = config::load_config(&cli.config_dir)?;
    init_thread_pool(&site_config);

    match cli.command {
        Command::Convert {
            input,
            out,
            format,
            dump_old_revisions,
            manifest,
        } => {
            let options = GenerateOptions {
                format: format.map(Into::into).unwrap_or(site_config.output.format),
                limit: input.limit,
                dump_old_revisions,
                write_manifest: manifest,
            };
            println!("==> Converting {} → {}", input.dump.display(), out.display());
            let (site, summary) = generate::generate(&input.dump, &out, &site_config, &options)?;
            output::print_generate_output(&site, &summary);
        }
        Command::Check { input } => {
            println!("==> Checking {}", input.dump.display());
            let pages = generate::load_pages(&input.dump, input.limit, false)?;
            let site = generate::build_site(pages, &site_config, site_config.output.format, false);
            output::print_check_output(&site);
            println!("==> Dump is readable");
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; users can constrain down, not up.
fn init_thread_pool(config: &SiteConfig) {
    let threads = config::effective_threads(&config.processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
