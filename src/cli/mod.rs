//! Command line surface
//!
//! Flags are the last configuration layer: anything given here overrides the
//! config file and the environment.

pub mod args;

pub use args::Cli;

use chrono::{Local, NaiveDate};

use crate::config::AppConfig;

impl Cli {
    /// Overlay the flags that were given onto `config`
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(router) = &self.router {
            config.router.url = router.clone();
        }
        if let Some(realm) = &self.realm {
            config.router.realm = realm.clone();
        }
        if self.log_file.is_some() {
            config.log_file = self.log_file.clone();
        }

        let request = &mut config.request;
        if let Some(bee_id) = self.bee_id {
            request.bee_id = bee_id;
        }
        if let Some(bee_pwd) = &self.bee_pwd {
            request.bee_pwd = bee_pwd.clone();
        }
        if let Some(suffix) = &self.dist_suffix {
            request.dist_suffix = suffix.clone();
        }
        if let Some(plusdays) = self.plusdays {
            request.plusdays = plusdays;
        }
        if self.areas.is_some() {
            request.areas = self.areas.clone();
        }
        if self.email_list.is_some() {
            request.email_list = self.email_list.clone();
        }
        if self.merge_areas {
            request.merge_areas = true;
        }
        if self.no_merge_areas {
            request.merge_areas = false;
        }

        // negative switches only ever turn a feature off
        request.equalise &= !self.no_equalise;
        request.notify_customers &= !self.no_notify;
        request.reset &= !self.no_reset;
        request.cvrp &= !self.no_cvrp;
        request.update_counters &= !self.no_update_counters;
        request.email_leftovers &= !self.no_email_leftovers;
        request.email_manifest &= !self.no_email_manifest;
        request.no_lock_drivers |= self.no_lock_drivers;
    }

    /// Business date of this run
    pub fn run_date(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}
