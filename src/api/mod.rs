pub mod deals;
pub mod disputes;
pub mod health;
pub mod locks;
pub mod payouts;
pub mod policies;
pub mod snapshots;
pub mod summary;

use crate::config::Config;
use crate::db::Repository;
use crate::settlement::{
    ApprovalWorkflow, DisputeManager, PayoutProcessor, PeriodLockGuard, PolicyStore,
    ReversalProcessor, SnapshotComputer,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub policies: PolicyStore,
    pub computer: SnapshotComputer,
    pub approvals: ApprovalWorkflow,
    pub payouts: PayoutProcessor,
    pub reversals: ReversalProcessor,
    pub disputes: DisputeManager,
    pub locks: PeriodLockGuard,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, config: Config) -> Self {
        Self {
            policies: PolicyStore::new(repo.clone()),
            computer: SnapshotComputer::new(repo.clone()),
            approvals: ApprovalWorkflow::new(repo.clone()),
            payouts: PayoutProcessor::new(repo.clone()),
            reversals: ReversalProcessor::new(repo.clone()),
            disputes: DisputeManager::new(repo.clone(), &config),
            locks: PeriodLockGuard::new(repo.clone()),
            repo,
            config,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/policies",
            post(policies::upsert_policy).get(policies::list_policies),
        )
        .route(
            "/v1/deals/:deal_id/snapshots",
            post(snapshots::compute_snapshot),
        )
        .route("/v1/approvals/pending", get(snapshots::get_pending_approvals))
        .route("/v1/snapshots/:id/approve", post(snapshots::approve_snapshot))
        .route("/v1/snapshots/:id/reject", post(snapshots::reject_snapshot))
        .route("/v1/snapshots/:id/reverse", post(snapshots::reverse_snapshot))
        .route("/v1/deals/:deal_id/commission", get(deals::get_deal_commission))
        .route("/v1/payouts", post(payouts::record_payout))
        .route("/v1/disputes", post(disputes::open_dispute))
        .route(
            "/v1/disputes/escalate-overdue",
            post(disputes::escalate_overdue),
        )
        .route("/v1/disputes/:id/status", post(disputes::set_dispute_status))
        .route(
            "/v1/period-locks",
            post(locks::create_lock).get(locks::list_locks),
        )
        .route("/v1/period-locks/:id/release", post(locks::release_lock))
        .route(
            "/v1/users/:user_id/commission-summary",
            get(summary::get_commission_summary),
        )
        .layer(cors)
        .with_state(state)
}
