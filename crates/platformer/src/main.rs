use std::process::ExitCode;

use platformer::app::{bootstrap, session};
use tracing::error;

fn main() -> ExitCode {
    match bootstrap::build_app() {
        Ok(app) => session::run(app),
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
