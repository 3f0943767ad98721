use clap::Parser;
use presentation::cli::{Cli, CliApp};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    shared::logging::init_tracing(cli.verbose);

    let mut app = CliApp::new(&cli)?;
    app.run(cli).await?;
    Ok(())
}
