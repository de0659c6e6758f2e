use crate::error::EngineError;
use crate::games::MiniGame;
use crate::metrics;
use crate::models::game::{Advance, AdvanceTicket, AnswerFeedback, GamePhase, SessionView, Verdict};
use crate::models::ScoreResult;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// Round-by-round state of one played session.
///
/// Pure and synchronous: it never sleeps and never spawns. Every accepted
/// answer locks input and hands out an [`AdvanceTicket`]; only that ticket
/// can move the session to the next round, and only once.
///
/// The correct-answer counter is credited when the answered round is retired
/// by `advance`, which keeps `correct <= index` true at every observation.
#[derive(Debug, Clone)]
pub struct GameSession<R> {
    epoch: u64,
    rounds: Vec<R>,
    index: usize,
    correct: u32,
    locked: bool,
    outstanding: Option<(AdvanceTicket, bool)>,
    score: Option<ScoreResult>,
}

impl<R> GameSession<R> {
    pub fn new(epoch: u64, rounds: Vec<R>, expected_len: usize) -> Result<Self, EngineError> {
        if expected_len == 0 {
            return Err(EngineError::InvalidConfiguration(
                "session length must be greater than zero".to_string(),
            ));
        }
        if rounds.len() != expected_len {
            return Err(EngineError::InvalidConfiguration(format!(
                "expected {} rounds, content bank produced {}",
                expected_len,
                rounds.len()
            )));
        }
        Ok(Self {
            epoch,
            rounds,
            index: 0,
            correct: 0,
            locked: false,
            outstanding: None,
            score: None,
        })
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn correct(&self) -> u32 {
        self.correct
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.index == self.rounds.len()
    }

    pub fn current_round(&self) -> Option<&R> {
        self.rounds.get(self.index)
    }

    pub fn score(&self) -> Option<ScoreResult> {
        self.score
    }

    pub fn outstanding_ticket(&self) -> Option<AdvanceTicket> {
        self.outstanding.map(|(ticket, _)| ticket)
    }

    /// Judges the current round unless input is locked or the session is over.
    /// `None` means the submission was ignored and nothing changed.
    pub fn submit_with<F>(&mut self, judge: F) -> Option<(Verdict, AdvanceTicket)>
    where
        F: FnOnce(&R) -> Verdict,
    {
        if self.locked || self.is_finished() {
            return None;
        }
        let round = self.rounds.get(self.index)?;
        let verdict = judge(round);
        let ticket = AdvanceTicket {
            epoch: self.epoch,
            round_index: self.index,
        };
        self.locked = true;
        self.outstanding = Some((ticket, verdict.correct));
        Some((verdict, ticket))
    }

    /// Retires the answered round. Tickets from another epoch, duplicates and
    /// tickets that were never issued return `None` without touching state.
    pub fn advance(&mut self, ticket: AdvanceTicket) -> Option<Advance> {
        match self.outstanding {
            Some((issued, was_correct)) if issued == ticket && ticket.epoch == self.epoch => {
                self.outstanding = None;
                if was_correct {
                    self.correct += 1;
                }
                self.index += 1;
                self.locked = false;

                if self.is_finished() {
                    let score = ScoreResult::from_counts(self.correct, self.rounds.len() as u32);
                    self.score = Some(score);
                    Some(Advance::Finished(score))
                } else {
                    Some(Advance::NextRound { index: self.index })
                }
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Overrides the game's own feedback delay
    pub feedback_delay: Option<Duration>,
    /// Fixed seed for reproducible dealing
    pub seed: Option<u64>,
}

struct EngineState<R> {
    phase: GamePhase,
    epoch: u64,
    session: Option<GameSession<R>>,
    pending: Option<JoinHandle<()>>,
    last_feedback: Option<AnswerFeedback>,
    rng: StdRng,
}

impl<R> EngineState<R> {
    fn abort_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

struct EngineInner<G: MiniGame> {
    game: G,
    feedback_delay: Duration,
    state: Mutex<EngineState<G::Round>>,
    view: watch::Sender<SessionView<G::Round>>,
}

impl<G: MiniGame> EngineInner<G> {
    fn module(&self) -> &str {
        self.game.definition().module_id.as_str()
    }

    fn publish(&self, state: &EngineState<G::Round>) -> SessionView<G::Round> {
        let view = match &state.session {
            Some(session) => SessionView {
                phase: state.phase,
                epoch: state.epoch,
                index: session.index(),
                length: session.len(),
                correct: session.correct(),
                locked: session.locked(),
                round: session.current_round().cloned(),
                last_feedback: state.last_feedback.clone(),
                score: session.score(),
            },
            None => SessionView::intro(state.epoch, self.game.definition().rounds),
        };
        self.view.send_replace(view.clone());
        view
    }

    async fn advance(&self, ticket: AdvanceTicket) -> Option<Advance> {
        let mut state = self.state.lock().await;
        if ticket.epoch != state.epoch || state.phase != GamePhase::Playing {
            tracing::debug!(
                "Dropping stale advance for {} (ticket epoch {}, current epoch {})",
                self.module(),
                ticket.epoch,
                state.epoch
            );
            return None;
        }

        let Some(advance) = state.session.as_mut().and_then(|s| s.advance(ticket)) else {
            tracing::debug!(
                "Dropping duplicate advance for {} round {}",
                self.module(),
                ticket.round_index
            );
            return None;
        };

        state.pending = None;
        state.last_feedback = None;
        if let Advance::Finished(score) = advance {
            state.phase = GamePhase::Summary;
            metrics::record_session(self.module(), "finished");
            tracing::info!(
                "Session finished for {}: {}/{} ({}%)",
                self.module(),
                score.correct,
                score.total,
                score.percentage
            );
        }
        self.publish(&state);
        Some(advance)
    }

    fn reset(&self, state: &mut EngineState<G::Round>, reason: &str) {
        state.abort_pending();
        if state.phase == GamePhase::Playing {
            metrics::record_session(self.module(), "cancelled");
        }
        if state.session.is_some() {
            tracing::info!("Session {} for {}: {}", state.epoch, self.module(), reason);
        }
        state.epoch += 1;
        state.session = None;
        state.last_feedback = None;
        state.phase = GamePhase::Intro;
        self.publish(state);
    }
}

/// Drives one mini-game: deals rounds, judges answers, and schedules the
/// delayed advance that follows each answer's feedback.
///
/// Cancellation bumps the session epoch and aborts the pending timer, so an
/// advance from a discarded session can never land.
pub struct RoundEngine<G: MiniGame> {
    inner: Arc<EngineInner<G>>,
}

impl<G: MiniGame> RoundEngine<G> {
    pub fn new(game: G) -> Self {
        Self::with_options(game, EngineOptions::default())
    }

    pub fn with_options(game: G, options: EngineOptions) -> Self {
        let feedback_delay = options
            .feedback_delay
            .unwrap_or(game.definition().feedback_delay);
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let (view, _rx) = watch::channel(SessionView::intro(0, game.definition().rounds));

        Self {
            inner: Arc::new(EngineInner {
                game,
                feedback_delay,
                state: Mutex::new(EngineState {
                    phase: GamePhase::Intro,
                    epoch: 0,
                    session: None,
                    pending: None,
                    last_feedback: None,
                    rng,
                }),
                view,
            }),
        }
    }

    pub fn game(&self) -> &G {
        &self.inner.game
    }

    pub fn feedback_delay(&self) -> Duration {
        self.inner.feedback_delay
    }

    /// Deals a fresh session and enters `Playing`. Any previous session and its
    /// pending timer are discarded first.
    pub async fn start(&self) -> Result<SessionView<G::Round>, EngineError> {
        let inner = &self.inner;
        let mut state = inner.state.lock().await;
        inner.reset(&mut state, "replaced by a new session");

        let definition = inner.game.definition();
        let rounds = inner.game.deal(&mut state.rng);
        let session = match GameSession::new(state.epoch, rounds, definition.rounds) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Cannot start {}: {}", definition.module_id, e);
                return Err(e);
            }
        };

        state.session = Some(session);
        state.phase = GamePhase::Playing;
        metrics::record_session(inner.module(), "started");
        tracing::info!(
            "Session {} started for {} ({} rounds)",
            state.epoch,
            definition.module_id,
            definition.rounds
        );
        Ok(inner.publish(&state))
    }

    /// Judges `choice` against the current round and schedules the advance.
    /// Returns `None` (and changes nothing) while input is locked, outside
    /// `Playing`, or after the session was cancelled.
    pub async fn submit_answer(&self, choice: G::Choice) -> Option<AnswerFeedback> {
        let inner = &self.inner;
        let mut state = inner.state.lock().await;
        if state.phase != GamePhase::Playing {
            tracing::debug!("Ignoring answer for {}: not playing", inner.module());
            return None;
        }

        let game = &inner.game;
        let (verdict, ticket) = state
            .session
            .as_mut()?
            .submit_with(|round| game.judge(round, &choice))?;

        metrics::record_answer(inner.module(), verdict.correct);
        let feedback = AnswerFeedback {
            round_index: ticket.round_index,
            correct: verdict.correct,
            explanation: verdict.explanation,
        };
        state.last_feedback = Some(feedback.clone());

        let timer_inner = Arc::clone(inner);
        let delay = inner.feedback_delay;
        state.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            timer_inner.advance(ticket).await;
        }));

        inner.publish(&state);
        Some(feedback)
    }

    /// Applies a ticket by hand. Normally the feedback timer does this; a
    /// stale or already used ticket is dropped.
    pub async fn advance(&self, ticket: AdvanceTicket) -> Option<Advance> {
        self.inner.advance(ticket).await
    }

    /// Discards the session and its pending timer. Valid in any state.
    pub async fn cancel(&self) {
        let mut state = self.inner.state.lock().await;
        self.inner.reset(&mut state, "cancelled");
    }

    /// Leaves `Summary` (or an unfinished session) and goes back to `Intro`.
    pub async fn restart(&self) {
        let mut state = self.inner.state.lock().await;
        self.inner.reset(&mut state, "restarted");
    }

    /// Ticket of the answer whose advance is still pending, if any
    pub async fn pending_ticket(&self) -> Option<AdvanceTicket> {
        let state = self.inner.state.lock().await;
        state.session.as_ref().and_then(|s| s.outstanding_ticket())
    }

    pub fn view(&self) -> SessionView<G::Round> {
        self.inner.view.borrow().clone()
    }

    pub fn score(&self) -> Option<ScoreResult> {
        self.inner.view.borrow().score
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView<G::Round>> {
        self.inner.view.subscribe()
    }
}

impl<G: MiniGame> Drop for RoundEngine<G> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.inner.state.try_lock() {
            state.abort_pending();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(len: usize) -> GameSession<u32> {
        GameSession::new(1, (0..len as u32).collect(), len).unwrap()
    }

    fn answer(session: &mut GameSession<u32>, correct: bool) -> AdvanceTicket {
        session
            .submit_with(|_| Verdict::from_match(correct))
            .map(|(_, ticket)| ticket)
            .unwrap()
    }

    #[test]
    fn zero_length_is_invalid_configuration() {
        let err = GameSession::<u32>::new(1, Vec::new(), 0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration(_)));
    }

    #[test]
    fn short_deal_is_invalid_configuration() {
        let err = GameSession::new(1, vec![1u32, 2], 3).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration(_)));
    }

    #[test]
    fn scenario_three_of_four() {
        let mut s = session(4);
        let mut finished = 0;
        for correct in [true, false, true, true] {
            let ticket = answer(&mut s, correct);
            if let Some(Advance::Finished(score)) = s.advance(ticket) {
                finished += 1;
                assert_eq!(
                    score,
                    ScoreResult {
                        correct: 3,
                        total: 4,
                        percentage: 75
                    }
                );
            }
        }
        assert_eq!(finished, 1);
        assert_eq!(s.index(), 4);
        assert!(s.is_finished());
    }

    #[test]
    fn locked_session_ignores_submissions() {
        let mut s = session(3);
        let ticket = answer(&mut s, true);
        let before = (s.index(), s.correct(), s.locked());

        assert!(s.submit_with(|_| Verdict::right()).is_none());
        assert_eq!((s.index(), s.correct(), s.locked()), before);

        s.advance(ticket);
        assert!(!s.locked());
        assert_eq!(s.correct(), 1);
    }

    #[test]
    fn duplicate_and_foreign_tickets_are_dropped() {
        let mut s = session(3);
        let ticket = answer(&mut s, true);
        assert!(s.advance(ticket).is_some());
        assert!(s.advance(ticket).is_none());
        assert_eq!(s.index(), 1);

        let foreign = AdvanceTicket {
            epoch: 99,
            round_index: 1,
        };
        answer(&mut s, false);
        assert!(s.advance(foreign).is_none());
        assert_eq!(s.index(), 1);
        assert!(s.locked());
    }

    #[test]
    fn correct_never_exceeds_index() {
        let mut s = session(5);
        for _ in 0..5 {
            let ticket = answer(&mut s, true);
            assert!(s.correct() as usize <= s.index());
            s.advance(ticket);
            assert!(s.correct() as usize <= s.index());
        }
        assert_eq!(s.score().map(|sc| sc.percentage), Some(100));
        assert!(s.submit_with(|_| Verdict::right()).is_none());
    }
}
