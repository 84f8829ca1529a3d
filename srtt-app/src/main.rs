mod app;
mod cli;
mod logging;
mod persist;
mod terminal;

use app::App;
use clap::Parser;
use cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(&cli.output);

    let app = App::new(cli)?;
    app.run()?;

    Ok(())
}
