use clap::Parser;
use fixtures::{run_server, spotify, FixtureArgs};

/// Spotify accounts + web API fixture server
#[derive(Parser, Debug)]
#[clap(name = "spotify-fixture")]
struct Cli {
    #[clap(flatten)]
    common: FixtureArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    run_server(args.common, spotify::router()).await
}
