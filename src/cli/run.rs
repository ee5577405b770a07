//! `coach run`: wire a surface to the overlay core and drive it.

use std::{path::PathBuf, sync::mpsc};

use tracing::info;

use crate::{
    config::Config,
    overlay::Overlay,
    storage::today,
    surface::{ProcessSurface, StdioSurface},
};

use super::log::prune;

pub(super) fn cmd_run(
    config: &Config,
    ui: Option<PathBuf>,
    ui_args: Vec<String>,
) -> Result<(), String> {
    let removed = prune(config)?;
    if removed > 0 {
        info!(removed, "pruned old logs");
    }

    let (tx, rx) = mpsc::channel();
    let date = today();

    match ui {
        Some(program) => {
            let surface = ProcessSurface::launch(&program, ui_args, tx, config.reload_timeout())
                .map_err(|e| format!("failed to launch {}: {e}", program.display()))?;
            Overlay::new(surface, config, date).run(&rx, config.poll_interval());
        }
        None => {
            let surface = StdioSurface::attach(tx);
            Overlay::new(surface, config, date).run(&rx, config.poll_interval());
        }
    }

    Ok(())
}
