//! Live drop sessions: a flow plus the delayed work it owns.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info};
use tokio::task::JoinHandle;

use crate::flow::quiz::AnswerOutcome;
use crate::flow::sequencer::BackOutcome;
use crate::flow::{DropFlow, FlowView, QUIZ_FEEDBACK_DELAY, REWARD_CLOSE_DELAY};

/// Collaborators a session reports back to. Called with the session locked,
/// so implementations must not call back into the same session.
pub trait SessionHooks: Send + Sync {
    /// The feedback delay passed and the quiz moved on.
    fn question_ready(&self, view: FlowView);
    /// Reward modal closed; the drop is done.
    fn completed(&self, view: FlowView);
    /// The learner walked out of the drop before finishing it.
    fn exited(&self, view: FlowView);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delays {
    pub quiz_feedback: Duration,
    pub reward_close: Duration,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            quiz_feedback: QUIZ_FEEDBACK_DELAY,
            reward_close: REWARD_CLOSE_DELAY,
        }
    }
}

/// Delayed tasks owned by one session. Everything still pending is aborted
/// when the owner goes away.
#[derive(Debug, Default)]
pub struct ScheduledTasks {
    handles: Vec<JoinHandle<()>>,
}

impl ScheduledTasks {
    pub fn schedule<F>(&mut self, delay: Duration, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }

    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handles.retain(|h| !h.is_finished());
        self.handles.push(tokio::spawn(future));
    }

    pub fn pending(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    pub fn cancel_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for ScheduledTasks {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

struct DropSession {
    flow: DropFlow,
    timers: ScheduledTasks,
    hooks: Arc<dyn SessionHooks>,
    delays: Delays,
    closed: bool,
}

impl DropSession {
    fn close(&mut self) {
        self.closed = true;
        self.timers.cancel_all();
    }
}

#[derive(Clone)]
pub struct SessionHandle(Arc<Mutex<DropSession>>);

fn lock(session: &Mutex<DropSession>) -> MutexGuard<'_, DropSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionHandle {
    pub fn open(flow: DropFlow, hooks: Arc<dyn SessionHooks>, delays: Delays) -> Self {
        Self(Arc::new(Mutex::new(DropSession {
            flow,
            timers: ScheduledTasks::default(),
            hooks,
            delays,
            closed: false,
        })))
    }

    pub fn view(&self) -> FlowView {
        lock(&self.0).flow.view()
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.0).closed
    }

    pub fn pending_timers(&self) -> usize {
        lock(&self.0).timers.pending()
    }

    pub fn start(&self) -> bool {
        self.with_open(|s| s.flow.start()).unwrap_or(false)
    }

    pub fn complete_watch(&self) -> bool {
        self.with_open(|s| s.flow.complete_watch()).unwrap_or(false)
    }

    pub fn complete_show(&self) -> bool {
        self.with_open(|s| s.flow.complete_show()).unwrap_or(false)
    }

    pub fn forward(&self) -> bool {
        self.with_open(|s| s.flow.forward()).unwrap_or(false)
    }

    pub fn go_back(&self) -> Option<BackOutcome> {
        self.with_open(|s| {
            let outcome = s.flow.go_back()?;
            if outcome == BackOutcome::Exited {
                s.close();
                s.hooks.exited(s.flow.view());
            }
            Some(outcome)
        })
        .flatten()
    }

    /// Leaves the drop for the drop list. Not possible once claimed.
    pub fn exit(&self) -> bool {
        self.with_open(|s| {
            if !s.flow.can_exit() {
                return false;
            }
            s.close();
            s.hooks.exited(s.flow.view());
            true
        })
        .unwrap_or(false)
    }

    pub fn submit_answer(&self, question: usize, option: usize) -> Option<AnswerOutcome> {
        self.answer_with(|flow| flow.submit_answer(question, option))
    }

    pub fn submit_option_text(&self, text: &str) -> Option<AnswerOutcome> {
        self.answer_with(|flow| flow.submit_option_text(text))
    }

    pub fn review_missed(&self) -> Option<u32> {
        self.with_open(|s| s.flow.review_missed()).flatten()
    }

    pub fn claim_reward(&self) -> bool {
        self.with_open(|s| s.flow.claim_reward()).unwrap_or(false)
    }

    pub fn share(&self) -> Option<u32> {
        self.with_open(|s| s.flow.share()).flatten()
    }

    /// Hides the reward and runs the completion hook after the close delay.
    pub fn close_reward_modal(&self) -> bool {
        let weak = Arc::downgrade(&self.0);
        self.with_open(|s| {
            if !s.flow.close_reward_modal() {
                return false;
            }
            let delay = s.delays.reward_close;
            s.timers.schedule(delay, move || {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                let mut session = lock(&shared);
                if session.closed || !session.flow.finish() {
                    return;
                }
                session.closed = true;
                info!("Drop '{}' completed", session.flow.drop_info().id);
                session.hooks.completed(session.flow.view());
            });
            true
        })
        .unwrap_or(false)
    }

    /// Cancels everything pending. Later operations are ignored.
    pub fn teardown(&self) {
        lock(&self.0).close();
    }

    fn answer_with(
        &self,
        submit: impl FnOnce(&mut DropFlow) -> Option<AnswerOutcome>,
    ) -> Option<AnswerOutcome> {
        let weak = Arc::downgrade(&self.0);
        self.with_open(|s| {
            let outcome = submit(&mut s.flow)?;
            let delay = s.delays.quiz_feedback;
            s.timers.schedule(delay, move || {
                // A torn-down session drops the update on the floor
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                let mut session = lock(&shared);
                if session.closed || session.flow.advance_quiz().is_none() {
                    return;
                }
                session.hooks.question_ready(session.flow.view());
            });
            Some(outcome)
        })
        .flatten()
    }

    fn with_open<T>(&self, f: impl FnOnce(&mut DropSession) -> T) -> Option<T> {
        let mut session = lock(&self.0);
        if session.closed {
            debug!("Ignoring action on a closed session");
            return None;
        }
        Some(f(&mut session))
    }
}

/// Live sessions keyed by chat id. At most one per chat.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<i64, SessionHandle>>>,
}

impl SessionRegistry {
    fn sessions(&self) -> MutexGuard<'_, HashMap<i64, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new session, tearing down whatever the chat had before.
    pub fn open(&self, chat: i64, session: SessionHandle) {
        let previous = self.sessions().insert(chat, session);
        if let Some(previous) = previous {
            info!("Replacing the open drop session of chat {chat}");
            previous.teardown();
        }
    }

    pub fn get(&self, chat: i64) -> Option<SessionHandle> {
        self.sessions().get(&chat).cloned()
    }

    /// Forgets the session without touching it. Safe to call from hooks.
    pub fn remove(&self, chat: i64) -> Option<SessionHandle> {
        self.sessions().remove(&chat)
    }

    /// Forgets the chat's session only if it has already closed itself, so a
    /// newer session opened in the meantime survives.
    pub fn remove_closed(&self, chat: i64) -> bool {
        let mut sessions = self.sessions();
        match sessions.get(&chat) {
            Some(session) if session.is_closed() => {
                sessions.remove(&chat);
                true
            }
            _ => false,
        }
    }

    pub fn close(&self, chat: i64) {
        if let Some(session) = self.remove(chat) {
            session.teardown();
        }
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
