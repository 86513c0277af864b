//! Run-admission gate
//!
//! Decides once per invocation whether the routing run may proceed today.
//! Manual runs always pass and stamp the run flag with today's date. Scheduled
//! runs are blocked on the day of a manual run, and on the Friday after a
//! Thursday manual run; that carry-over block consumes the flag.
//!
//! The run flag is reached only through this module.

use chrono::{Datelike, NaiveDate, Weekday};
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{DistribError, Result};
use crate::storage::{Store, StoreTxn, MANUAL_RUN_FIELD};

const FLAG_DATE_FORMAT: &str = "%Y-%m-%d";

/// Facts about the current invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub is_manual: bool,
    pub today: NaiveDate,
    pub distributor_suffix: String,
}

impl RunContext {
    pub fn manual(today: NaiveDate, distributor_suffix: impl Into<String>) -> Self {
        Self {
            is_manual: true,
            today,
            distributor_suffix: distributor_suffix.into(),
        }
    }

    pub fn scheduled(today: NaiveDate, distributor_suffix: impl Into<String>) -> Self {
        Self {
            is_manual: false,
            today,
            distributor_suffix: distributor_suffix.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitReason {
    Manual,
    NoManualRunRecorded,
    /// The recorded manual run neither is today nor carries over to today
    ManualRunOnOtherDay(NaiveDate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    SameDayManualRun(NaiveDate),
    /// Thursday manual run covering the following Friday
    ThursdayCarryOver(NaiveDate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit(AdmitReason),
    Block(BlockReason),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admit(_))
    }
}

impl fmt::Display for Admission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admit(AdmitReason::Manual) => write!(f, "admitted: manual run"),
            Self::Admit(AdmitReason::NoManualRunRecorded) => {
                write!(f, "admitted: no manual run recorded")
            }
            Self::Admit(AdmitReason::ManualRunOnOtherDay(day)) => {
                write!(f, "admitted: last manual run on {day}")
            }
            Self::Block(BlockReason::SameDayManualRun(day)) => {
                write!(f, "blocked: manual run already done on {day}")
            }
            Self::Block(BlockReason::ThursdayCarryOver(day)) => {
                write!(f, "blocked: Thursday manual run on {day} covers today")
            }
        }
    }
}

/// Change to apply to the run flag alongside a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagWrite {
    Keep,
    Set(NaiveDate),
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub admission: Admission,
    pub flag_write: FlagWrite,
}

/// Decide a scheduled run given the last recorded manual run
pub fn evaluate_scheduled(last_manual: Option<NaiveDate>, today: NaiveDate) -> Decision {
    let Some(day) = last_manual else {
        return Decision {
            admission: Admission::Admit(AdmitReason::NoManualRunRecorded),
            flag_write: FlagWrite::Keep,
        };
    };

    let same_day = day == today;
    let carry = day.weekday() == Weekday::Thu && today.weekday() == Weekday::Fri;

    if same_day {
        Decision {
            admission: Admission::Block(BlockReason::SameDayManualRun(day)),
            flag_write: FlagWrite::Keep,
        }
    } else if carry {
        Decision {
            admission: Admission::Block(BlockReason::ThursdayCarryOver(day)),
            flag_write: FlagWrite::Clear,
        }
    } else {
        Decision {
            admission: Admission::Admit(AdmitReason::ManualRunOnOtherDay(day)),
            flag_write: FlagWrite::Keep,
        }
    }
}

/// Decide a run of either kind
pub fn evaluate(is_manual: bool, last_manual: Option<NaiveDate>, today: NaiveDate) -> Decision {
    if is_manual {
        Decision {
            admission: Admission::Admit(AdmitReason::Manual),
            flag_write: FlagWrite::Set(today),
        }
    } else {
        evaluate_scheduled(last_manual, today)
    }
}

/// Interpret the stored run flag. Absent and blank both mean "no manual run".
pub fn parse_run_flag(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, FLAG_DATE_FORMAT)
            .map(Some)
            .map_err(|_| DistribError::corrupt_run_flag(MANUAL_RUN_FIELD, value)),
    }
}

/// Applies the admission rule against the persisted run flag
pub struct RunAdmissionGate<'a> {
    store: &'a dyn Store,
}

impl<'a> RunAdmissionGate<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Decide whether this invocation may run, updating the run flag as the
    /// rule requires. Read and write share one transaction.
    pub async fn decide(&self, ctx: &RunContext) -> Result<Admission> {
        let mut txn = self
            .store
            .start_transaction()
            .await
            .map_err(|e| DistribError::store_unavailable("opening admission transaction", e))?;

        let decision = match decide_in(txn.as_mut(), ctx).await {
            Ok(decision) => decision,
            Err(e) => {
                if let Err(abort_err) = txn.abort().await {
                    warn!("Failed to abort admission transaction: {}", abort_err);
                }
                return Err(e);
            }
        };

        if decision.flag_write == FlagWrite::Keep {
            if let Err(e) = txn.abort().await {
                warn!("Failed to release read-only admission transaction: {}", e);
            }
        } else {
            txn.commit()
                .await
                .map_err(|e| DistribError::store_unavailable("committing run flag", e))?;
        }

        info!("Run {}", decision.admission);
        Ok(decision.admission)
    }
}

async fn decide_in(txn: &mut dyn StoreTxn, ctx: &RunContext) -> Result<Decision> {
    let last_manual = if ctx.is_manual {
        None
    } else {
        let raw = txn
            .config()
            .get(MANUAL_RUN_FIELD)
            .await
            .map_err(|e| DistribError::store_unavailable("reading run flag", e))?;
        if raw.is_none() {
            debug!("Run flag row {} is absent", MANUAL_RUN_FIELD);
        }
        parse_run_flag(raw.as_deref())?
    };

    let decision = evaluate(ctx.is_manual, last_manual, ctx.today);

    let value = match decision.flag_write {
        FlagWrite::Keep => return Ok(decision),
        FlagWrite::Set(day) => day.format(FLAG_DATE_FORMAT).to_string(),
        FlagWrite::Clear => String::new(),
    };
    debug!("Setting {} to '{}'", MANUAL_RUN_FIELD, value);
    txn.config()
        .set(MANUAL_RUN_FIELD, &value)
        .await
        .map_err(|e| DistribError::store_unavailable("writing run flag", e))?;

    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::storage::{MemoryBackend, StorageError};
    use crate::testing::fixtures::{date, fixture_today};
    use crate::testing::StoreBuilder;
    use proptest::prelude::*;

    const THURSDAY: (i32, u32, u32) = (2026, 10, 15);

    fn thursday() -> NaiveDate {
        date(THURSDAY.0, THURSDAY.1, THURSDAY.2)
    }

    async fn run(store: &MemoryBackend, ctx: RunContext) -> Result<Admission> {
        RunAdmissionGate::new(store).decide(&ctx).await
    }

    async fn flag(store: &MemoryBackend) -> String {
        store.config_value(MANUAL_RUN_FIELD).await.unwrap_or_default()
    }

    #[tokio::test]
    async fn test_manual_run_admits_and_stamps_today() {
        let store = StoreBuilder::new().build();
        let today = fixture_today();

        let admission = run(&store, RunContext::manual(today, ".SP.")).await.unwrap();
        assert_eq!(admission, Admission::Admit(AdmitReason::Manual));
        assert_eq!(flag(&store).await, "2026-10-16");
        assert_eq!(store.stats().commits, 1);
    }

    #[tokio::test]
    async fn test_manual_run_ignores_corrupt_flag() {
        let store = StoreBuilder::new().with_run_flag("garbage").build();
        let admission = run(&store, RunContext::manual(fixture_today(), ".SP."))
            .await
            .unwrap();
        assert!(admission.is_admitted());
        assert_eq!(flag(&store).await, "2026-10-16");
    }

    #[tokio::test]
    async fn test_scheduled_after_manual_same_day_is_blocked() {
        let store = StoreBuilder::new().build();
        let today = fixture_today();

        run(&store, RunContext::manual(today, ".SP.")).await.unwrap();
        let admission = run(&store, RunContext::scheduled(today, ".SP.")).await.unwrap();

        assert_eq!(admission, Admission::Block(BlockReason::SameDayManualRun(today)));
        assert_eq!(flag(&store).await, "2026-10-16");
    }

    #[tokio::test]
    async fn test_thursday_manual_blocks_friday_and_clears_flag() {
        let store = StoreBuilder::new().build();
        run(&store, RunContext::manual(thursday(), ".SP.")).await.unwrap();
        assert_eq!(flag(&store).await, "2026-10-15");

        let friday = date(2026, 10, 16);
        let admission = run(&store, RunContext::scheduled(friday, ".SP.")).await.unwrap();
        assert_eq!(
            admission,
            Admission::Block(BlockReason::ThursdayCarryOver(thursday()))
        );
        assert_eq!(flag(&store).await, "");

        // flag consumed, so a second Friday invocation goes through
        let admission = run(&store, RunContext::scheduled(friday, ".SP.")).await.unwrap();
        assert_eq!(admission, Admission::Admit(AdmitReason::NoManualRunRecorded));
    }

    #[tokio::test]
    async fn test_saturday_after_thursday_manual_is_admitted() {
        let store = StoreBuilder::new().with_run_flag("2026-10-15").build();
        let saturday = date(2026, 10, 17);

        let admission = run(&store, RunContext::scheduled(saturday, ".SP."))
            .await
            .unwrap();
        assert_eq!(
            admission,
            Admission::Admit(AdmitReason::ManualRunOnOtherDay(thursday()))
        );
        assert_eq!(flag(&store).await, "2026-10-15");
    }

    #[tokio::test]
    async fn test_read_only_decisions_abort() {
        let store = StoreBuilder::new().build();
        run(&store, RunContext::scheduled(fixture_today(), ".SP."))
            .await
            .unwrap();

        let stats = store.stats();
        assert_eq!(stats.commits, 0);
        assert_eq!(stats.aborts, 1);
        assert_eq!(stats.config_writes, 0);
    }

    #[tokio::test]
    async fn test_corrupt_flag_fails_scheduled_run() {
        let store = StoreBuilder::new().with_run_flag("16/10/2026").build();
        let err = run(&store, RunContext::scheduled(fixture_today(), ".SP."))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::ADMISSION_CORRUPT_RUN_FLAG);
        assert_eq!(store.stats().aborts, 1);
        assert_eq!(flag(&store).await, "16/10/2026");
    }

    #[tokio::test]
    async fn test_unavailable_store_is_fatal() {
        let store = StoreBuilder::new().build();
        store.set_unavailable(true);

        let err = run(&store, RunContext::manual(fixture_today(), ".SP."))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DistribError::StoreUnavailable {
                source: Some(StorageError::Unavailable(_)),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_failed_commit_is_fatal() {
        let store = StoreBuilder::new().build();
        store.fail_commit(true);

        let err = run(&store, RunContext::manual(fixture_today(), ".SP."))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 4);
        assert_eq!(flag(&store).await, "");
    }

    #[tokio::test]
    async fn test_manual_run_without_flag_row_is_fatal() {
        let store = MemoryBackend::from_snapshot(Default::default());
        let err = run(&store, RunContext::manual(fixture_today(), ".SP."))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::STORAGE_UNAVAILABLE);
    }

    #[test]
    fn test_parse_run_flag() {
        assert_eq!(parse_run_flag(None).unwrap(), None);
        assert_eq!(parse_run_flag(Some("  ")).unwrap(), None);
        assert_eq!(parse_run_flag(Some("2026-10-15")).unwrap(), Some(thursday()));
        assert!(parse_run_flag(Some("2026-13-01")).is_err());
    }

    #[test]
    fn test_display_names_rule() {
        let text = Admission::Block(BlockReason::ThursdayCarryOver(thursday())).to_string();
        assert!(text.contains("Thursday"));
        assert!(text.contains("2026-10-15"));
    }

    fn any_date() -> impl Strategy<Value = NaiveDate> {
        (0i64..20_000).prop_map(|offset| date(2000, 1, 1) + chrono::Duration::days(offset))
    }

    proptest! {
        #[test]
        fn prop_manual_always_admits_and_sets_today(
            today in any_date(),
            last in proptest::option::of(any_date()),
        ) {
            let decision = evaluate(true, last, today);
            prop_assert_eq!(decision.admission, Admission::Admit(AdmitReason::Manual));
            prop_assert_eq!(decision.flag_write, FlagWrite::Set(today));
        }

        #[test]
        fn prop_scheduled_after_same_day_manual_blocks(today in any_date()) {
            let decision = evaluate_scheduled(Some(today), today);
            prop_assert!(!decision.admission.is_admitted());
            prop_assert_eq!(decision.flag_write, FlagWrite::Keep);
        }

        #[test]
        fn prop_only_carry_over_clears(last in any_date(), today in any_date()) {
            let decision = evaluate_scheduled(Some(last), today);
            let carry = last != today
                && last.weekday() == Weekday::Thu
                && today.weekday() == Weekday::Fri;
            prop_assert_eq!(decision.flag_write == FlagWrite::Clear, carry);
            prop_assert_eq!(
                decision.admission.is_admitted(),
                last != today && !carry
            );
        }
    }

    #[test]
    fn test_manual_then_scheduled_for_many_days() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            for offset in 0..14 {
                let today = thursday() + chrono::Duration::days(offset);
                let store = StoreBuilder::new().build();

                let manual = run(&store, RunContext::manual(today, ".SP.")).await.unwrap();
                assert!(manual.is_admitted());
                assert_eq!(flag(&store).await, today.format("%Y-%m-%d").to_string());

                let scheduled = run(&store, RunContext::scheduled(today, ".SP.")).await.unwrap();
                assert!(!scheduled.is_admitted());
                assert_eq!(flag(&store).await, today.format("%Y-%m-%d").to_string());
            }
        });
    }
}
