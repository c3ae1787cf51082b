use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::Args;
use xnscore::error::AppError;
use xnscore::scoring::domain::{ComponentScores, ScoreRecord, UserId};
use xnscore::scoring::{
    month_key, InMemoryScorePublisher, InMemoryScoreStore, ScorePolicy, ScoreService, ScoreStore,
    TriggerKind,
};

use crate::infra::{midday_utc, MemoryScoreService};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference date for the walkthrough (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct SweepArgs {
    /// Calendar day to sweep (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct TenureArgs {
    /// Calendar month to accrue (YYYY-MM, defaults to the current month)
    #[arg(long, value_parser = crate::infra::parse_month)]
    pub(crate) month: Option<String>,
    /// Reference date for the accrual run (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) date: Option<NaiveDate>,
}

fn reference_instant(date: Option<NaiveDate>) -> DateTime<Utc> {
    match date {
        Some(date) => midday_utc(date),
        None => Utc::now(),
    }
}

fn build_stack() -> (Arc<MemoryScoreService>, Arc<InMemoryScoreStore>) {
    let store = Arc::new(InMemoryScoreStore::default());
    let publisher = Arc::new(InMemoryScorePublisher::default());
    let service = Arc::new(ScoreService::new(
        store.clone(),
        publisher,
        ScorePolicy::default(),
    ));
    (service, store)
}

struct SeedProfile {
    id: &'static str,
    components: ComponentScores,
    age_days: i64,
    inactive_days: i64,
}

fn population() -> Vec<SeedProfile> {
    vec![
        SeedProfile {
            id: "amina",
            components: scores(35, 20, 12, 5, 0, 0),
            age_days: 400,
            inactive_days: 2,
        },
        SeedProfile {
            id: "bakary",
            components: scores(25, 15, 10, 5, 0, 0),
            age_days: 150,
            inactive_days: 10,
        },
        SeedProfile {
            id: "chiku",
            components: scores(35, 25, 15, 8, 3, 2),
            age_days: 700,
            inactive_days: 1,
        },
        SeedProfile {
            id: "efrem",
            components: scores(30, 20, 15, 5, 0, 0),
            age_days: 365,
            inactive_days: 95,
        },
    ]
}

fn scores(
    payment: u8,
    completion: u8,
    time: u8,
    deposit: u8,
    diversity: u8,
    engagement: u8,
) -> ComponentScores {
    ComponentScores {
        payment_history: payment,
        completion,
        time_reliability: time,
        deposit,
        diversity_social: diversity,
        engagement,
    }
}

/// Seed an established community directly through the store so the
/// walkthrough starts from members of every age and activity profile.
fn seed_population(store: &InMemoryScoreStore, now: DateTime<Utc>) -> Result<(), AppError> {
    let policy = ScorePolicy::default();
    for profile in population() {
        let total = profile.components.total() as u8;
        let created_at = now - Duration::days(profile.age_days);
        store.create(ScoreRecord {
            user_id: UserId(profile.id.to_string()),
            components: profile.components,
            total_score: total,
            tier: policy.tier_for(total),
            created_at,
            account_age_days: profile.age_days.max(0) as u32,
            max_allowed_score: policy.age_cap.cap_for(profile.age_days.max(0) as u32),
            age_cap_applied: false,
            points_gained_this_week: 0,
            week_window_start: now,
            tenure_bonus: 0,
            tenure_months_earned: 0,
            last_financial_activity_at: now - Duration::days(profile.inactive_days),
            financial_inactive_days: profile.inactive_days.max(0) as u32,
            total_inactivity_penalty: 0,
            decay_floor_reached: false,
        })?;
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let now = reference_instant(args.date);
    let (service, store) = build_stack();
    seed_population(&store, now)?;

    println!("Community trust scoring demo ({})", now.date_naive());

    // A newcomer joins with a modest seed and a tight first-month ceiling.
    let dawit = UserId("dawit".to_string());
    let enrolled = service
        .adjustments()
        .enroll(dawit.clone(), scores(15, 5, 5, 0, 0, 0), now)?;
    println!(
        "\nEnrolled {}: score {} ({}), ceiling {} for the first month",
        dawit,
        enrolled.total_score,
        enrolled.tier.label(),
        enrolled.max_allowed_score
    );

    // A burst of wins runs into the weekly growth allowance.
    println!("\nAmina's week: two circle payments, then a completed circle");
    let amina = UserId("amina".to_string());
    for trigger_id in ["demo-pay-1", "demo-pay-2"] {
        let outcome =
            service
                .adjustments()
                .apply_predefined(&amina, TriggerKind::CirclePayment, trigger_id, now)?;
        println!(
            "- circle payment: +{} -> {}",
            outcome.applied, outcome.total_score
        );
    }
    let outcome = service.adjustments().apply_predefined(
        &amina,
        TriggerKind::CircleCompletion,
        "demo-circle-1",
        now,
    )?;
    println!(
        "- circle completion: requested +{}, applied +{} (velocity capped: {}) -> {}",
        outcome.requested, outcome.applied, outcome.velocity_capped, outcome.total_score
    );

    // An Excellent-tier member stakes points on the newcomer.
    let chiku = UserId("chiku".to_string());
    let vouch = service
        .vouching()
        .create_vouch(&chiku, &dawit, "savings circle cofounder", None, now)?;
    let vouchee = service.get_score(&dawit)?;
    println!(
        "\n{} vouched for {} with {} points; {} now scores {}",
        chiku, dawit, vouch.vouch_points, dawit, vouchee.total_score
    );

    // A default knocks a member down and opens a recovery window.
    let bakary = UserId("bakary".to_string());
    let outcome = service.adjustments().apply_predefined(
        &bakary,
        TriggerKind::PaymentDefault,
        "demo-loan-1",
        now,
    )?;
    println!(
        "\n{} defaulted on a loan: {} -> {} ({})",
        bakary,
        outcome.requested,
        outcome.total_score,
        outcome.tier.label()
    );
    let period = service
        .recovery()
        .start_recovery(&bakary, "payment_default", now)?;
    println!(
        "- recovery window open until {} at {}x regain",
        period.ends_at.date_naive(),
        period.multiplier
    );
    let outcome = service.adjustments().apply_predefined(
        &bakary,
        TriggerKind::CourseCompleted,
        "demo-course-1",
        now,
    )?;
    println!(
        "- completed a financial course: +{} requested, +{} applied under the recovery boost -> {}",
        outcome.requested, outcome.applied, outcome.total_score
    );

    // Scheduled maintenance: inactivity decay and monthly tenure.
    let cancel = AtomicBool::new(false);
    let decay = service.decay().sweep_inactive(now, &cancel)?;
    println!(
        "\nDecay sweep: {} processed, {} penalized, {} skipped",
        decay.processed, decay.applied, decay.skipped
    );
    let month = month_key(now);
    let tenure = service.tenure().accrue_monthly(&month, now, &cancel)?;
    println!(
        "Tenure accrual for {month}: {} processed, {} granted, {} skipped",
        tenure.processed, tenure.applied, tenure.skipped
    );

    render_leaderboard(&service)?;
    render_tier_distribution(&service)?;
    render_at_risk(&service, now)?;

    Ok(())
}

pub(crate) fn run_decay_sweep(args: SweepArgs) -> Result<(), AppError> {
    let now = reference_instant(args.date);
    let (service, store) = build_stack();
    seed_population(&store, now)?;

    println!("Inactivity decay rehearsal for {}", now.date_naive());
    let cancel = AtomicBool::new(false);
    let result = service.decay().sweep_inactive(now, &cancel)?;
    println!(
        "- processed {}, penalized {}, skipped {}, failed {}",
        result.processed, result.applied, result.skipped, result.failed
    );
    for (user, reason) in &result.failures {
        println!("- {user}: {reason}");
    }

    render_at_risk(&service, now)?;
    Ok(())
}

pub(crate) fn run_tenure_accrual(args: TenureArgs) -> Result<(), AppError> {
    let now = reference_instant(args.date);
    let month = args.month.unwrap_or_else(|| month_key(now));
    let (service, store) = build_stack();
    seed_population(&store, now)?;

    println!("Tenure accrual rehearsal for {month}");
    let cancel = AtomicBool::new(false);
    let result = service.tenure().accrue_monthly(&month, now, &cancel)?;
    println!(
        "- processed {}, granted {}, skipped {}, failed {}",
        result.processed, result.applied, result.skipped, result.failed
    );

    render_leaderboard(&service)?;
    Ok(())
}

fn render_leaderboard(service: &MemoryScoreService) -> Result<(), AppError> {
    println!("\nLeaderboard");
    for (position, entry) in service.analytics().leaderboard(10)?.iter().enumerate() {
        println!(
            "{:>2}. {:<10} {:>3} ({})",
            position + 1,
            entry.user_id.0,
            entry.total_score,
            entry.tier.label()
        );
    }
    Ok(())
}

fn render_tier_distribution(service: &MemoryScoreService) -> Result<(), AppError> {
    println!("\nTier distribution");
    for (tier, count) in service.analytics().tier_distribution()? {
        println!("- {:<12} {}", tier.label(), count);
    }
    Ok(())
}

fn render_at_risk(service: &MemoryScoreService, now: DateTime<Utc>) -> Result<(), AppError> {
    let at_risk = service.analytics().decay_at_risk_users(now)?;
    if at_risk.is_empty() {
        println!("\nNo members at decay risk");
        return Ok(());
    }
    println!("\nMembers at decay risk");
    for entry in at_risk {
        println!(
            "- {:<10} {:>3} days inactive ({:?})",
            entry.user_id.0, entry.inactive_days, entry.band
        );
    }
    Ok(())
}
