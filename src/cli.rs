use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub(crate) struct Cli {
    /// Fetch every widget once, print the dashboard and exit
    #[arg(long)]
    pub(crate) once: bool,
    /// Override the configured backend URL
    #[arg(long)]
    pub(crate) base_url: Option<String>,
    /// Print the tooltip of every day that has data
    #[arg(long)]
    pub(crate) verbose: bool,
    #[arg(long)]
    pub(crate) no_color: bool,
}
