//! Sweep command - delete leftover acceptance test objects

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use smallstep_provider::{ProviderConfig, SmallstepProvider, SweepConfig, SweepKind, Sweeper};

use crate::error::Result;

pub async fn run(prefix: Option<String>, age: Option<String>, include_undated: bool) -> Result<()> {
    let config = SweepConfig::resolve(prefix, age, |key| std::env::var(key).ok())?
        .with_undated(include_undated);
    let provider = SmallstepProvider::configure(&ProviderConfig::default())?;
    let sweeper = Sweeper::new(provider.client().clone(), config);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    println!(
        "Sweeping objects named {}* older than {}",
        style(&sweeper.config().prefix).cyan(),
        style(humantime::format_duration(sweeper.config().age)).cyan()
    );

    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        spinner.set_style(template);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));

    let mut total = 0;
    for kind in SweepKind::ALL {
        spinner.set_message(format!("{}s", kind));
        let swept = match sweeper.sweep_kind(&cancel, kind).await {
            Ok(swept) => swept,
            Err(e) => {
                spinner.finish_and_clear();
                return Err(e.into());
            }
        };
        for id in &swept {
            spinner.println(format!("  {} {} {}", style("-").red(), kind, id));
        }
        total += swept.len();
    }
    spinner.finish_and_clear();

    println!("{} Deleted {} object(s)", style("✓").green().bold(), total);
    Ok(())
}
