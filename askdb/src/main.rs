use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod cmd;
mod server;

use clap::Parser;
use common::tracing::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cmd::Cli::parse();

    // held until exit so buffered spans are flushed
    let _guard = init_tracing("askdb")?;

    cli.execute().await
}
