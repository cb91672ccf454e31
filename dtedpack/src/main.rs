mod options;
mod pack;
mod progress;
mod show;
mod validate;

use anyhow::Result;
use clap::Parser;
use options::Cli;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli {
        Cli::Pack(pack) => pack.run(),
        Cli::Validate(validate) => validate.run(),
        Cli::Show(show) => show.run(),
    }
}
