use crate::error::ApiError;
use crate::metrics;
use crate::models::commit::{
    CommitFailure, CommitFailureKind, CommitOutcome, CommitReceipt, CommitRequest, CommitStep,
    LevelUpEvent,
};
use crate::models::{BadgeId, UserId};
use crate::services::profile_store::ProfileStore;
use crate::services::progress_client::RemoteProgressClient;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

/// Turns a finished session into one durable progress update.
///
/// Steps run strictly in order: coins, XP, fetch progress, best-score merge,
/// write-back, badge unlocks. The first failure stops the commit; nothing is
/// rolled back. Commits for the same user never overlap, since every one of
/// them rewrites that user's whole progress document.
pub struct ProgressCommitter {
    client: Arc<dyn RemoteProgressClient>,
    profile: ProfileStore,
    user_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

/// A detached commit's result, handed back together with its request so the
/// caller can retry without re-granting rewards.
#[derive(Debug)]
pub struct CommitDelivery {
    pub request: CommitRequest,
    pub outcome: CommitOutcome,
}

/// Handle to a commit running in the background.
///
/// `cancel` only suppresses delivery: server-side work already started runs
/// to completion.
pub struct CommitHandle {
    rx: oneshot::Receiver<CommitDelivery>,
    cancelled: Arc<AtomicBool>,
}

impl CommitHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Waits for the commit. `None` once cancelled.
    pub async fn outcome(self) -> Option<CommitDelivery> {
        if self.is_cancelled() {
            return None;
        }
        match self.rx.await {
            Ok(delivery) if !self.cancelled.load(Ordering::SeqCst) => Some(delivery),
            _ => None,
        }
    }
}

impl ProgressCommitter {
    pub fn new(client: Arc<dyn RemoteProgressClient>, profile: ProfileStore) -> Self {
        Self {
            client,
            profile,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn profile(&self) -> &ProfileStore {
        &self.profile
    }

    async fn user_lock(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        locks
            .entry(user_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the map entry once no other commit holds or waits on it.
    /// Clones are only taken under the map lock, so the count is stable here.
    async fn release_user_lock(&self, user_id: &UserId, lock: Arc<Mutex<()>>) {
        let mut locks = self.user_locks.lock().await;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(user_id);
        }
    }

    /// Runs (or resumes) the commit described by `request`. Pass the same
    /// request again to retry after a failure: settled reward halves are
    /// skipped and only the remaining steps run.
    pub async fn commit(&self, request: &mut CommitRequest) -> CommitOutcome {
        let user_id = request.user_id.clone();
        let lock = self.user_lock(&user_id).await;
        let guard = lock.lock().await;
        let outcome = self.run(request).await;
        drop(guard);
        self.release_user_lock(&user_id, lock).await;

        match &outcome {
            CommitOutcome::Committed(_) => metrics::record_commit("committed"),
            CommitOutcome::Failed(failure) => match failure.kind {
                CommitFailureKind::NetworkFailure => metrics::record_commit("network_failure"),
                CommitFailureKind::PartialCommit => metrics::record_commit("partial_commit"),
            },
        }
        outcome
    }

    /// Spawns the commit on the runtime and returns at once.
    pub fn commit_detached(self: &Arc<Self>, request: CommitRequest) -> CommitHandle {
        let (tx, rx) = oneshot::channel();
        let cancelled = Arc::new(AtomicBool::new(false));

        let committer = Arc::clone(self);
        let flag = Arc::clone(&cancelled);
        tokio::spawn(async move {
            let mut request = request;
            let outcome = committer.commit(&mut request).await;
            if flag.load(Ordering::SeqCst) {
                tracing::debug!(
                    "Commit for {} finished after cancellation; outcome not delivered",
                    request.module_id
                );
                return;
            }
            let _ = tx.send(CommitDelivery { request, outcome });
        });

        CommitHandle { rx, cancelled }
    }

    fn owns_profile(&self, user_id: &UserId) -> bool {
        self.profile
            .current()
            .is_some_and(|profile| profile.id == *user_id)
    }

    fn fail(&self, request: &CommitRequest, step: CommitStep, error: ApiError) -> CommitOutcome {
        let kind = if request.applied_steps().is_empty() {
            CommitFailureKind::NetworkFailure
        } else {
            CommitFailureKind::PartialCommit
        };
        tracing::warn!(
            "Commit {} of {} for {} failed at {} ({:?}): {}",
            request.id,
            request.module_id,
            request.user_id,
            step,
            kind,
            error
        );
        CommitOutcome::Failed(CommitFailure { step, kind, error })
    }

    async fn run(&self, request: &mut CommitRequest) -> CommitOutcome {
        let user_id = request.user_id.clone();
        let module_id = request.module_id.clone();
        let owns_profile = self.owns_profile(&user_id);
        if !owns_profile {
            tracing::debug!("Committing for {} without a cached profile", user_id);
        }

        tracing::info!(
            "Commit {}: {} for {} at {}% ({}/{})",
            request.id,
            module_id,
            user_id,
            request.score.percentage,
            request.score.correct,
            request.score.total
        );

        // 1. coins
        if !request.coins_settled() {
            if request.reward.coins == 0 {
                request.settle_coins(false);
            } else {
                match self.client.add_coins(&user_id, request.reward.coins).await {
                    Ok(total) => {
                        if owns_profile {
                            self.profile.set_coins(total);
                        }
                        request.settle_coins(true);
                    }
                    Err(e) => return self.fail(request, CommitStep::AddCoins, e),
                }
            }
        } else {
            tracing::debug!("Coins for {} already granted, skipping", module_id);
        }

        // 2. xp
        if !request.xp_settled() {
            if request.reward.xp == 0 {
                request.settle_xp(false, None);
            } else {
                match self.client.add_xp(&user_id, request.reward.xp).await {
                    Ok(grant) => {
                        if owns_profile {
                            self.profile
                                .apply_xp_grant(grant.new_xp, grant.new_level, grant.total_coins);
                        }
                        let level_up = grant.leveled_up.then_some(LevelUpEvent {
                            new_level: grant.new_level,
                            bonus_coins: grant.bonus_coins,
                        });
                        if let Some(event) = level_up {
                            tracing::info!(
                                "{} reached level {} (+{} coins)",
                                user_id,
                                event.new_level,
                                event.bonus_coins
                            );
                        }
                        request.settle_xp(true, level_up);
                    }
                    Err(e) => return self.fail(request, CommitStep::AddXp, e),
                }
            }
        } else {
            tracing::debug!("XP for {} already granted, skipping", module_id);
        }

        // 3. fetch
        let mut snapshot = match self.client.get_progress(&user_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => return self.fail(request, CommitStep::FetchProgress, e),
        };
        let repaired = snapshot.reconcile();
        if repaired {
            tracing::warn!("Progress for {} was inconsistent and has been repaired", user_id);
        }

        // 4. merge
        let merge = snapshot.merge_score(&module_id, request.score.percentage);
        request.record_merge(merge, snapshot.completed_modules.len());

        // 5. write back
        if merge.changed() || repaired {
            if let Err(e) = self.client.update_progress(&snapshot).await {
                return self.fail(request, CommitStep::UpdateProgress, e);
            }
            request.record_progress_update();
        } else {
            tracing::info!(
                "Stored score for {} is already {:?}; progress left unchanged",
                module_id,
                snapshot.best_score(&module_id)
            );
        }

        // 6. badges
        let mut unlocked: Vec<BadgeId> = Vec::new();
        if request.newly_completed() {
            for badge in request.pending_badges().to_vec() {
                if owns_profile && self.profile.has_badge(&badge) {
                    request.settle_badge(&badge, false);
                    continue;
                }
                // a refused unlock is an error and leaves the badge pending
                match self.client.unlock_badge(&user_id, &badge).await {
                    Ok(result) => {
                        if owns_profile {
                            self.profile.add_badge(badge.clone());
                        }
                        tracing::info!(
                            "Badge {} unlocked for {} (new: {})",
                            badge,
                            user_id,
                            result.is_new
                        );
                        request.settle_badge(&badge, true);
                        unlocked.push(badge);
                    }
                    Err(e) => return self.fail(request, CommitStep::UnlockBadge, e),
                }
            }
        }

        CommitOutcome::Committed(CommitReceipt {
            module_id,
            score: request.score,
            merge,
            snapshot,
            profile: if owns_profile { self.profile.current() } else { None },
            level_up: request.level_up(),
            unlocked_badges: unlocked,
        })
    }
}
