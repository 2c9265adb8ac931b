//! `duesync init`

use anyhow::{Context, Result};
use clap::Args;

use duesync_core::{paths, FileRecordStore, RecordStore, Settings};

/// Scaffold `settings.yaml` and a header-only sheet per tracked source.
#[derive(Args, Debug)]
pub struct InitArgs {}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;

        let created = Settings::scaffold_at(&home).context("failed to write settings")?;
        let settings_path = paths::settings_path(&home);
        if created {
            println!("✓ Wrote {}", settings_path.display());
        } else {
            println!("· Kept existing {}", settings_path.display());
        }

        let settings = Settings::load_at(&home)
            .with_context(|| format!("failed to read {}", settings_path.display()))?;
        let mut store = FileRecordStore::at(&home);
        for sheet in &settings.sheets {
            let made = store
                .ensure_sheet(sheet)
                .with_context(|| format!("failed to create sheet '{sheet}'"))?;
            if made {
                println!("✓ Created sheet '{sheet}'");
            }
        }

        println!("  Next: run `duesync tasklist` to pick the task list.");
        Ok(())
    }
}
