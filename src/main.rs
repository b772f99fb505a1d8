//! storefront-runtime - replay host input against a page
//!
//! Loads a page tree and a script of host inputs, registers the built-in
//! sections, replays the script and prints what the page emitted.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use storefront_runtime::fixture::PageFixture;
use storefront_runtime::script::Script;
use storefront_runtime::sections::{password_header, PasswordHeader};
use storefront_runtime::{Page, RuntimeConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "storefront-runtime")]
#[command(about = "Replay storefront editor and user input against a page", long_about = None)]
struct Cli {
    /// Page tree (YAML)
    #[arg(short, long)]
    page: PathBuf,

    /// Steps to replay (YAML)
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Runtime config (JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = RuntimeConfig::load_or_default(cli.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let doc = PageFixture::load(&cli.page)?.build();
    let mut page = Page::new(doc, config);
    let created = page.register(
        password_header::SECTION_TYPE,
        PasswordHeader::constructor(),
        None,
    );
    info!(created, "registered {}", password_header::SECTION_TYPE);

    if let Some(path) = &cli.script {
        Script::load(path)?.run(&mut page)?;
    }

    for notification in page.notifications() {
        println!("{}  {}", notification.formatted_time(), notification.name);
    }

    println!();
    println!("{} live section(s)", page.instances().len());
    for instance in page.instances() {
        println!("  {:<24} {}", instance.id(), instance.section_type());
    }

    Ok(())
}
