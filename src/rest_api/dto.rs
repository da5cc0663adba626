//! Response bodies of the REST API

use serde::Serialize;

use crate::options::DrainDirectives;
use crate::state::StateSnapshot;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateResponse {
    #[serde(flatten)]
    pub state: StateSnapshot,
    pub drain: DrainDirectives,
}
