mod cli;

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use tabkeep_core::{render_snapshot, Config, Database, Snapshot, SnapshotStore};
use tabkeep_tabs::{estimate_memory_mb, memory_summary};

fn main() -> Result<()> {
    tabkeep_core::init_logging();

    let args = Cli::parse();
    let config = Config::default();
    let path = args.db.unwrap_or(config.database_path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let db = Database::open(&path).with_context(|| format!("opening {}", path.display()))?;
    // The CLI never talks to the sync area
    let store = SnapshotStore::new(&db, false, config.remote_chunk_size);

    match args.command {
        Command::Show => print!("{}", show(&store)?),
        Command::Render { out } => {
            let snapshot = stored(&store)?;
            std::fs::write(&out, render_snapshot(&snapshot, None))
                .with_context(|| format!("writing {}", out.display()))?;
            println!("Wrote {}", out.display());
        }
        Command::Export { out } => {
            let json = serde_json::to_string_pretty(&stored(&store)?)?;
            match out {
                Some(out) => std::fs::write(&out, json)
                    .with_context(|| format!("writing {}", out.display()))?,
                None => println!("{}", json),
            }
        }
        Command::Import { file } => {
            let revision = import(&store, &file)?;
            println!("Imported {} (revision {})", file.display(), revision);
        }
        Command::DeleteTab { url } => match delete_tab(&store, &url)? {
            Some(remaining) => println!("Removed {} ({} tabs left)", url, remaining),
            None => println!("{} is not in the snapshot", url),
        },
    }

    Ok(())
}

fn stored(store: &SnapshotStore) -> Result<Snapshot> {
    match store.load()? {
        Some(snapshot) => Ok(snapshot),
        None => bail!("no snapshot saved yet"),
    }
}

fn show(store: &SnapshotStore) -> Result<String> {
    let snapshot = stored(store)?;
    let partition = snapshot.partition();

    let mut out = format!(
        "Saved {}\n{} windows, {} groups, {}\n",
        snapshot.timestamp.to_rfc3339(),
        snapshot.windows.len(),
        partition.groups.len(),
        memory_summary(snapshot.tab_count(), estimate_memory_mb(snapshot.tabs())),
    );
    for bucket in &partition.groups {
        let title = bucket.meta.map_or("Unnamed group", |m| m.title_or("Unnamed group"));
        out.push_str(&format!("  [{}] {} ({} tabs)\n", bucket.id, title, bucket.tabs.len()));
    }
    if !partition.ungrouped.is_empty() {
        out.push_str(&format!("  [ungrouped] ({} tabs)\n", partition.ungrouped.len()));
    }
    Ok(out)
}

fn import(store: &SnapshotStore, file: &Path) -> Result<u64> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let snapshot = Snapshot::from_json(&raw).context("not a snapshot document")?;

    let repository = store.repository();
    let revision = repository.put(&snapshot)?;
    repository.put_page(&render_snapshot(&snapshot, None))?;
    tracing::info!(tabs = snapshot.tab_count(), revision, "Imported snapshot");
    Ok(revision)
}

/// Remaining tab count, or `None` when nothing matched
fn delete_tab(store: &SnapshotStore, url: &str) -> Result<Option<usize>> {
    let repository = store.repository();
    match repository.delete_tab(url)? {
        Some(updated) => {
            repository.put_page(&render_snapshot(&updated, None))?;
            Ok(Some(updated.tab_count()))
        }
        None => Ok(None),
    }
}
