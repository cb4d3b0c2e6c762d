use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use crate::AppState;
use crate::error::AppError;
use crate::exec::{ExecError, ExecOutput, ExecRequest};

/// POST /api/exec
///
/// Runs one shell command. Answers 403 unless `exec.enabled` is set.
pub async fn exec_command(
    State(state): State<AppState>,
    payload: Result<Json<ExecRequest>, JsonRejection>,
) -> Result<Json<ExecOutput>, AppError> {
    let Some(runner) = state.exec.as_ref() else {
        return Err(ExecError::Disabled.into());
    };
    let Json(request) = payload?;

    tracing::info!(cwd = ?request.cwd, "Exec request");
    let output = runner.run(&request).await?;
    Ok(Json(output))
}
