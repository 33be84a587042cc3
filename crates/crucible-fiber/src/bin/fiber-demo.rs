use anyhow::{Context, Result};
use clap::Parser;
use crucible_fiber::{
    driver, make_node, Child, Description, Engine, EngineConfig, ExpiredDeadline, ManualIdle,
    MemoryHost, Props,
};
use std::path::PathBuf;
use tracing::info;

/// Render a list into an in-memory host tree and show what each commit did.
#[derive(Parser, Debug)]
#[command(name = "fiber-demo", version, about)]
struct Cli {
    /// Items in the first render
    #[arg(long, default_value_t = 3)]
    items: usize,

    /// Append this many items in a second render
    #[arg(long, default_value_t = 0)]
    grow: usize,

    /// Drop this many trailing items in a third render
    #[arg(long, default_value_t = 0)]
    shrink: usize,

    /// Engine configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Grant slices that expire immediately (one unit per slice)
    #[arg(long)]
    one_unit_slices: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn list(count: usize) -> Description {
    let items = (1..=count).map(|n| {
        Child::from(make_node(
            "li",
            Some(Props::new().with("class", if n % 2 == 0 { "even" } else { "odd" })),
            [format!("item {}", n)],
        ))
    });
    make_node("ul", Some(Props::new().with("id", "list")), items)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(format!(
            "crucible_fiber={}",
            log_level
        )))
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let mut engine = Engine::with_config(MemoryHost::new(), ManualIdle::new(), config);
    let container = engine.host().container();

    let mut sizes = vec![cli.items];
    if cli.grow > 0 {
        sizes.push(cli.items + cli.grow);
    }
    if cli.shrink > 0 {
        let last = sizes.last().copied().unwrap_or(cli.items);
        sizes.push(last.saturating_sub(cli.shrink));
    }

    for size in sizes {
        engine.render(list(size), container)?;
        let report = if cli.one_unit_slices {
            driver::run_with(&mut engine, || ExpiredDeadline)?
        } else {
            driver::run_to_completion(&mut engine)?
        };
        let ops = engine.host_mut().drain_log();

        info!("render of {} items took {} slices", size, report.slices);
        for summary in &report.commits {
            println!(
                "commit: {} placed, {} updated, {} deleted, {} property writes, {} host ops",
                summary.placed,
                summary.updated,
                summary.deleted,
                summary.property_writes,
                ops.len()
            );
        }
        println!("{}\n", engine.host().render_tree(container));
    }

    Ok(())
}
