mod cli;
mod paths;
mod run;
mod script;

use anyhow::Result;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::run(cli)
}
