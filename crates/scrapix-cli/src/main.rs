use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use scrapix_cli::commands;

#[derive(Parser)]
#[command(name = "scrapix")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Scrape image urls from Google image search",
    long_about = "Scrapix drives a real Chrome instance through Google's image search, \
                  resolves each thumbnail to its full-resolution source url, and saves \
                  the collected urls (and optionally the images) to disk."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search Google Images and collect result urls
    Scrape(commands::scrape::ScrapeArgs),

    /// Generate shell completion scripts
    #[command(after_help = "SUPPORTED SHELLS:\n  \
                            bash, zsh, fish, elvish, powershell\n\n\
                            INSTALLATION:\n  \
                            # bash (add to ~/.bashrc)\n  \
                            source <(scrapix completion --shell bash)\n\n  \
                            # zsh (add to ~/.zshrc)\n  \
                            source <(scrapix completion --shell zsh)")]
    Completion {
        /// Shell to generate completions for
        #[arg(long, value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Execute the command
    match cli.command {
        Commands::Scrape(args) => commands::scrape::execute(args),
        Commands::Completion { shell } => {
            commands::completion::execute(shell, &mut Cli::command())
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("scrapix=debug,scrapix_core=debug,scrapix_browser=debug,scrapix_download=debug")
    } else {
        EnvFilter::new("scrapix=info,scrapix_browser=info,scrapix_download=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}
