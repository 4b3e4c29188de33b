use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{error, info};

use super::bootstrap::AppWiring;
use super::gameplay::{GameError, GameRoot, LoadOutcome};

/// What a scripted session did, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// `None` when no save existed and a new game was started.
    pub load: Option<LoadOutcome>,
    pub enemies_defeated: u32,
    pub final_score: u32,
    pub save_path: PathBuf,
}

pub fn run(app: AppWiring) -> ExitCode {
    let mut root = match app.into_game_root() {
        Ok(root) => root,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    match play_scripted_session(&mut root) {
        Ok(report) => {
            info!(
                enemies_defeated = report.enemies_defeated,
                final_score = report.final_score,
                save_path = %report.save_path.display(),
                "session_finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "session_failed");
            ExitCode::FAILURE
        }
    }
}

/// Headless stand-in for a player: continue or start a game, defeat the
/// first enemy, save, then end the game.
pub fn play_scripted_session(root: &mut GameRoot) -> Result<SessionReport, GameError> {
    let load = if root.has_saved_game() {
        Some(root.load_saved_game()?)
    } else {
        root.start_new_game()?;
        None
    };

    let mut enemies_defeated = 0;
    if let Some(target) = root.context().enemies().ids().first().copied() {
        let health = root
            .context()
            .world()
            .find_entity(target)
            .map(|entity| entity.health)
            .ok_or(GameError::UnknownEntity(target))?;
        if root.damage_enemy(target, health.max(1))? {
            enemies_defeated += 1;
        }
    }

    let save_path = root.save()?;
    let final_score = root.context().score();
    root.end_game()?;

    Ok(SessionReport {
        load,
        enemies_defeated,
        final_score,
        save_path,
    })
}
