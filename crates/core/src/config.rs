// SPDX-License-Identifier: MIT

//! Store-backed singleton config values.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at_secs: i64,
}
