//! Runtime configuration of the service's log sinks.

use axum::{Json, extract::State};
use std::sync::Arc;

use super::AppState;
use crate::{
    ApiError,
    logging::{LogLevels, LogRegistry},
    viewset::{Action, ViewSet},
};

pub fn viewset() -> ViewSet<AppState> {
    ViewSet::new("LoggerViewSet")
        .action(
            Action::get("get_config", "", get_config)
                .description("Current level of every log sink")
                .response::<LogLevels>(),
        )
        .action(
            Action::post("set_config", "", set_config)
                .description("Change sink levels; unset entries are left alone")
                .request::<LogLevels>()
                .response::<LogLevels>(),
        )
}

async fn get_config(State(logs): State<Arc<LogRegistry>>) -> Json<LogLevels> {
    Json(logs.levels())
}

async fn set_config(
    State(logs): State<Arc<LogRegistry>>,
    Json(changes): Json<LogLevels>,
) -> Result<Json<LogLevels>, ApiError> {
    let levels = logs
        .apply(&changes)
        .map_err(|err| ApiError::internal("Failed to reconfigure loggers", Some(err.to_string())))?;
    Ok(Json(levels))
}
