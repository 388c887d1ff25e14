//! Capabilities an engine may advertise.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Set of features supported by a place manager's engine.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ManagerFeatures: u16 {
        const IMPORT = 1 << 0;
        const EXPORT = 1 << 1;
        const CHECK_IN = 1 << 2;
        const POST_RATING = 1 << 3;
        const SUGGESTION = 1 << 4;
        const REPORT_PLACE = 1 << 5;
        const AUTHENTICATION = 1 << 6;
        const CREATE_PLACE = 1 << 7;
        const UPDATE_PLACE = 1 << 8;
        /// Added/updated/removed notifications for places and categories.
        const NOTIFICATIONS = 1 << 9;
    }
}

impl Default for ManagerFeatures {
    fn default() -> Self {
        Self::empty()
    }
}

impl ManagerFeatures {
    /// Feature names, for logs and diagnostics output.
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}
