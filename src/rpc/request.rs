//! Configuration payload handed to the routing backend

use serde::{Deserialize, Serialize};

/// Everything the routing setup procedure needs for one run.
///
/// Field names are the wire names the backend expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingRequest {
    pub bee_id: u32,
    pub bee_pwd: String,
    pub dist_suffix: String,
    /// Offset in days of the delivery date
    pub plusdays: i32,
    /// Equalise vehicle capacities
    pub equalise: bool,
    /// Unite areas into a single one
    pub merge_areas: bool,
    /// Reset assignments before routing
    pub reset: bool,
    pub cvrp: bool,
    pub update_counters: bool,
    pub email_leftovers: bool,
    pub email_manifest: bool,
    /// SMS customers once routed
    pub notify_customers: bool,
    pub no_lock_drivers: bool,
    /// Comma separated area names; all areas when unset
    pub areas: Option<String>,
    /// Comma separated email recipients
    pub email_list: Option<String>,
}

impl Default for RoutingRequest {
    fn default() -> Self {
        Self {
            bee_id: 2,
            bee_pwd: String::new(),
            dist_suffix: ".SP.".to_string(),
            plusdays: 0,
            equalise: true,
            merge_areas: false,
            reset: true,
            cvrp: true,
            update_counters: true,
            email_leftovers: true,
            email_manifest: true,
            notify_customers: true,
            no_lock_drivers: false,
            areas: None,
            email_list: None,
        }
    }
}

impl RoutingRequest {
    /// Copy safe to write to logs
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.bee_pwd.is_empty() {
            copy.bee_pwd = "***".to_string();
        }
        copy
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
