//! CLI argument structures

use chrono::NaiveDate;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Admit, partition and dispatch the daily distribution routing run
#[derive(Parser, Debug, Default)]
#[command(name = "distrib-exec")]
#[command(about = "distrib-exec - Gate and dispatch the daily distribution routing run", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file (TOML)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Append log output to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// WAMP router to use
    #[arg(short = 'R', long, value_name = "URL")]
    pub router: Option<String>,

    /// WAMP realm to use
    #[arg(short = 'M', long)]
    pub realm: Option<String>,

    /// Bee ID to login
    #[arg(short = 'B', long, alias = "bee_id")]
    pub bee_id: Option<u32>,

    /// Bee password to login
    #[arg(short = 'P', long, alias = "bee_pwd")]
    pub bee_pwd: Option<String>,

    /// Distributor retailer suffix
    #[arg(short = 'S', long, alias = "dist_suffix")]
    pub dist_suffix: Option<String>,

    /// Delivery date offset in days
    #[arg(short = 'D', long, value_name = "DAYS", allow_negative_numbers = true)]
    pub plusdays: Option<i32>,

    /// Route only these areas (comma separated)
    #[arg(short = 'A', long, value_name = "AREAS")]
    pub areas: Option<String>,

    /// Unite areas into a single one
    #[arg(long, overrides_with = "no_merge_areas")]
    pub merge_areas: bool,

    /// Keep areas separate (the default)
    #[arg(long, overrides_with = "merge_areas")]
    pub no_merge_areas: bool,

    /// Don't equalise vehicle capacities
    #[arg(long)]
    pub no_equalise: bool,

    /// Don't notify (SMS) customers
    #[arg(short = 'N', long)]
    pub no_notify: bool,

    /// Don't reset before CVRP
    #[arg(long)]
    pub no_reset: bool,

    /// Don't run CVRP
    #[arg(long)]
    pub no_cvrp: bool,

    /// Don't update counters after CVRP
    #[arg(long)]
    pub no_update_counters: bool,

    /// Email recipients (comma separated)
    #[arg(short = 'L', long, alias = "email_list", value_name = "EMAIL ADDRESSES")]
    pub email_list: Option<String>,

    /// Don't send the leftovers email
    #[arg(long)]
    pub no_email_leftovers: bool,

    /// Don't lock drivers after CVRP
    #[arg(long)]
    pub no_lock_drivers: bool,

    /// Don't send the manifest email
    #[arg(long)]
    pub no_email_manifest: bool,

    /// Show the data that would be passed to the routing backend and exit
    #[arg(long)]
    pub show_data: bool,

    /// The run was started by an operator rather than the scheduler
    #[arg(long)]
    pub manual_run: bool,

    /// Business date of the run (defaults to the local date)
    #[arg(long, hide = true, value_name = "YYYY-MM-DD")]
    pub today: Option<NaiveDate>,
}
