//! The drop completion flow: Watch → Show → Quiz → Reward for one drop.
//!
//! Everything in here is synchronous and free of I/O. Delays between
//! states are the caller's business (see `session`), the flow only exposes
//! the transitions that run when those delays elapse.

pub mod quiz;
pub mod reward;
pub mod sequencer;

use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::catalog::{DropInfo, QuizQuestion, RewardOffer};
use quiz::{AnswerOutcome, QuizAdvance, QuizEngine, QuizPhase, QuizScore};
use reward::{RewardModal, RewardResolver};
use sequencer::{BackOutcome, Stage, Step, StepSequencer};

pub const WATCH_TOKENS: u32 = 25;
pub const SHOW_TOKENS: u32 = 30;
pub const TOKENS_PER_CORRECT_ANSWER: u32 = 10;
pub const REMEDIATION_BONUS: u32 = 20;
pub const REWARD_COMPLETION_BONUS: u32 = 100;
pub const SHARE_BONUS: u32 = 50;

pub const QUIZ_FEEDBACK_DELAY: Duration = Duration::from_secs(2);
pub const REWARD_CLOSE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Sink for short-lived feedback messages. Must return immediately.
pub trait Notifier: Send {
    fn notify(&self, kind: NoticeKind, message: &str);
}

/// Owned snapshot of a flow, handed to renderers.
#[derive(Debug, Clone)]
pub struct FlowView {
    pub drop_info: Arc<DropInfo>,
    pub stage: Stage,
    pub completed: Vec<Step>,
    pub tokens: u32,
    pub quiz: QuizView,
    pub offer: RewardOffer,
    pub modal: RewardModal,
}

#[derive(Debug, Clone)]
pub struct QuizView {
    pub index: usize,
    pub total: usize,
    pub question: Option<QuizQuestion>,
    pub phase: QuizPhase,
    /// Feedback recorded for the question at `index`.
    pub feedback: Option<bool>,
    pub correct: usize,
    pub missed: Vec<usize>,
}

impl QuizView {
    pub fn score(&self) -> Option<QuizScore> {
        match self.phase {
            QuizPhase::Finished(score) => Some(score),
            _ => None,
        }
    }
}

pub struct DropFlow {
    drop_info: Arc<DropInfo>,
    sequencer: StepSequencer,
    quiz: QuizEngine,
    reward: RewardResolver,
    notifier: Box<dyn Notifier>,
}

impl DropFlow {
    pub fn new(drop_info: Arc<DropInfo>, offer: RewardOffer, notifier: Box<dyn Notifier>) -> Self {
        let quiz = QuizEngine::new(drop_info.questions.clone().into());
        Self {
            drop_info,
            sequencer: StepSequencer::new(),
            quiz,
            reward: RewardResolver::new(offer),
            notifier,
        }
    }

    pub fn drop_info(&self) -> &DropInfo {
        &self.drop_info
    }

    pub fn stage(&self) -> Stage {
        self.sequencer.stage()
    }

    pub fn tokens(&self) -> u32 {
        self.sequencer.tokens()
    }

    pub fn is_completed(&self, step: Step) -> bool {
        self.sequencer.is_completed(step)
    }

    pub fn quiz(&self) -> &QuizEngine {
        &self.quiz
    }

    pub fn reward(&self) -> &RewardResolver {
        &self.reward
    }

    pub fn start(&mut self) -> bool {
        self.sequencer.start()
    }

    /// Completes one of the first three steps. The reward step is completed
    /// only by [`DropFlow::claim_reward`].
    pub fn complete_step(&mut self, step: Step, award: u32) -> bool {
        if step == Step::Reward {
            debug!("Reward step can only be completed by claiming");
            return false;
        }
        self.complete(step, award)
    }

    pub fn complete_watch(&mut self) -> bool {
        self.complete_step(Step::Watch, WATCH_TOKENS)
    }

    pub fn complete_show(&mut self) -> bool {
        self.complete_step(Step::Show, SHOW_TOKENS)
    }

    pub fn go_back(&mut self) -> Option<BackOutcome> {
        self.sequencer.go_back()
    }

    pub fn forward(&mut self) -> bool {
        let moved = self.sequencer.forward();
        if moved {
            self.settle_quiz();
        }
        moved
    }

    pub fn submit_answer(&mut self, question: usize, option: usize) -> Option<AnswerOutcome> {
        if self.stage() != Stage::Active(Step::Quiz) {
            return None;
        }
        let outcome = self.quiz.submit_answer(question, option)?;

        if outcome.correct {
            self.sequencer.award(outcome.tokens_awarded);
            self.notifier.notify(
                NoticeKind::Success,
                &format!("Correct! +{} tokens", outcome.tokens_awarded),
            );
        } else {
            let answer = self.quiz.questions()[question]
                .correct_answer()
                .unwrap_or_default()
                .to_string();
            self.notifier.notify(
                NoticeKind::Error,
                &format!("Not quite. The answer was: {answer}"),
            );
        }
        Some(outcome)
    }

    /// Answers whatever question is on screen, choosing by option text.
    pub fn submit_option_text(&mut self, text: &str) -> Option<AnswerOutcome> {
        let index = self.quiz.current_index();
        let option = self
            .quiz
            .current_question()?
            .options
            .iter()
            .position(|o| o == text)?;
        self.submit_answer(index, option)
    }

    /// Runs once the feedback delay has passed.
    pub fn advance_quiz(&mut self) -> Option<QuizAdvance> {
        let advance = self.quiz.advance()?;
        if let QuizAdvance::Finished(score) = advance {
            debug!(
                "Quiz finished: {}/{} ({}%)",
                score.correct, score.total, score.percentage
            );
            self.settle_quiz();
        }
        Some(advance)
    }

    /// Remediation for missed questions. Awards the bonus every time it is
    /// invoked while at least one question was missed.
    pub fn review_missed(&mut self) -> Option<u32> {
        if self.quiz.missed().is_empty() {
            return None;
        }
        self.sequencer.award(REMEDIATION_BONUS);
        self.notifier.notify(
            NoticeKind::Success,
            &format!("Thanks for reviewing! +{REMEDIATION_BONUS} tokens"),
        );
        Some(REMEDIATION_BONUS)
    }

    pub fn claim_reward(&mut self) -> bool {
        if self.stage() != Stage::Active(Step::Reward) || !self.reward.claim() {
            return false;
        }
        self.complete(Step::Reward, REWARD_COMPLETION_BONUS)
    }

    pub fn close_reward_modal(&mut self) -> bool {
        self.reward.close_modal()
    }

    /// Share bonus. Repeatable from the reward step onward.
    pub fn share(&mut self) -> Option<u32> {
        match self.stage() {
            Stage::Active(Step::Reward) | Stage::Claimed => {
                self.sequencer.award(SHARE_BONUS);
                self.notifier.notify(
                    NoticeKind::Success,
                    &format!("Thanks for sharing! +{SHARE_BONUS} tokens"),
                );
                Some(SHARE_BONUS)
            }
            _ => None,
        }
    }

    /// `true` exactly once, when the completion callback is due.
    pub fn finish(&mut self) -> bool {
        self.reward.finish()
    }

    /// A learner may walk away at any point before the reward is claimed.
    pub fn can_exit(&self) -> bool {
        self.stage() != Stage::Claimed
    }

    pub fn view(&self) -> FlowView {
        let index = self.quiz.current_index();
        FlowView {
            drop_info: self.drop_info.clone(),
            stage: self.stage(),
            completed: self.sequencer.completed().iter().copied().collect(),
            tokens: self.tokens(),
            quiz: QuizView {
                index,
                total: self.quiz.questions().len(),
                question: self.quiz.current_question().cloned(),
                phase: self.quiz.phase(),
                feedback: self.quiz.feedback(index),
                correct: self.quiz.correct_count(),
                missed: self.quiz.missed().to_vec(),
            },
            offer: self.reward.offer().clone(),
            modal: self.reward.modal(),
        }
    }

    fn complete(&mut self, step: Step, award: u32) -> bool {
        if !self.sequencer.complete(step, award) {
            return false;
        }
        if award > 0 {
            self.notifier.notify(
                NoticeKind::Success,
                &format!("{step} step complete! +{award} tokens"),
            );
        }
        true
    }

    // The quiz may finish while the learner has stepped back; the bonus is
    // credited once they are on the quiz step again.
    fn settle_quiz(&mut self) {
        if let Some(score) = self.quiz.score() {
            if self.stage() == Stage::Active(Step::Quiz) {
                self.complete(Step::Quiz, score.bonus_tokens);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct RecordingNotifier(Arc<Mutex<Vec<(NoticeKind, String)>>>);

    impl Notifier for RecordingNotifier {
        fn notify(&self, kind: NoticeKind, message: &str) {
            self.0.lock().unwrap().push((kind, message.to_string()));
        }
    }

    impl RecordingNotifier {
        fn kinds(&self) -> Vec<NoticeKind> {
            self.0.lock().unwrap().iter().map(|(k, _)| *k).collect()
        }
    }

    fn flow() -> (DropFlow, RecordingNotifier) {
        let catalog = Catalog::builtin();
        let offer = catalog.draw_reward(&mut StdRng::seed_from_u64(1)).unwrap();
        let notifier = RecordingNotifier::default();
        let flow = DropFlow::new(
            Arc::new(catalog.drops[0].clone()),
            offer,
            Box::new(notifier.clone()),
        );
        (flow, notifier)
    }

    fn to_quiz(flow: &mut DropFlow) {
        flow.start();
        assert!(flow.complete_watch());
        assert!(flow.complete_show());
    }

    fn answer(flow: &mut DropFlow, index: usize, correct: bool) {
        let question = &flow.quiz().questions()[index];
        let option = if correct {
            question.correct_option
        } else {
            (question.correct_option + 1) % question.options.len()
        };
        flow.submit_answer(index, option).unwrap();
        flow.advance_quiz().unwrap();
    }

    fn answer_all(flow: &mut DropFlow, correct: usize) {
        for i in 0..flow.quiz().questions().len() {
            answer(flow, i, i < correct);
        }
    }

    #[test]
    fn happy_path_totals_245() {
        let (mut flow, _) = flow();
        to_quiz(&mut flow);
        assert_eq!(flow.tokens(), 55);

        answer_all(&mut flow, 6);
        assert_eq!(flow.quiz().score().unwrap().bonus_tokens, 30);
        assert_eq!(flow.stage(), Stage::Active(Step::Reward));
        assert_eq!(flow.tokens(), 145);

        assert!(flow.claim_reward());
        assert_eq!(flow.stage(), Stage::Claimed);
        assert_eq!(flow.tokens(), 245);
    }

    #[test]
    fn tokens_never_decrease() {
        let (mut flow, _) = flow();
        let mut last = flow.tokens();
        let mut check = |flow: &DropFlow| {
            assert!(flow.tokens() >= last);
            last = flow.tokens();
        };

        flow.start();
        check(&flow);
        flow.complete_watch();
        check(&flow);
        flow.go_back();
        check(&flow);
        flow.forward();
        flow.complete_show();
        check(&flow);
        for i in 0..10 {
            answer(&mut flow, i, i % 3 == 0);
            check(&flow);
        }
        flow.review_missed();
        check(&flow);
        flow.go_back();
        check(&flow);
        flow.forward();
        flow.claim_reward();
        check(&flow);
        flow.share();
        check(&flow);
    }

    #[test]
    fn step_completion_is_idempotent() {
        let (mut flow, notifier) = flow();
        flow.start();
        assert!(flow.complete_step(Step::Watch, 25));
        assert!(!flow.complete_step(Step::Watch, 25));
        assert_eq!(flow.tokens(), 25);
        assert_eq!(flow.stage(), Stage::Active(Step::Show));
        assert_eq!(notifier.kinds(), vec![NoticeKind::Success]);
    }

    #[test]
    fn zero_award_does_not_notify() {
        let (mut flow, notifier) = flow();
        flow.start();
        assert!(flow.complete_step(Step::Watch, 0));
        assert!(notifier.kinds().is_empty());
    }

    #[test]
    fn reward_step_requires_a_claim() {
        let (mut flow, _) = flow();
        to_quiz(&mut flow);
        answer_all(&mut flow, 10);
        assert!(!flow.complete_step(Step::Reward, 100));
        assert_eq!(flow.stage(), Stage::Active(Step::Reward));
    }

    #[test]
    fn answers_outside_the_quiz_step_are_ignored() {
        let (mut flow, _) = flow();
        flow.start();
        assert_eq!(flow.submit_answer(0, 0), None);
        assert_eq!(flow.quiz().feedback(0), None);
    }

    #[test]
    fn resubmitting_an_answer_changes_nothing() {
        let (mut flow, notifier) = flow();
        to_quiz(&mut flow);
        let right = flow.quiz().questions()[0].correct_option;
        flow.submit_answer(0, (right + 1) % 4).unwrap();

        let tokens = flow.tokens();
        let notices = notifier.kinds().len();
        assert_eq!(flow.submit_answer(0, right), None);
        assert_eq!(flow.tokens(), tokens);
        assert_eq!(notifier.kinds().len(), notices);
        assert_eq!(flow.quiz().missed(), &[0]);
    }

    #[test]
    fn answers_by_option_text() {
        let (mut flow, notifier) = flow();
        to_quiz(&mut flow);
        let question = flow.quiz().questions()[0].clone();
        let text = question.correct_answer().unwrap();

        assert_eq!(flow.submit_option_text("definitely not an option"), None);
        let outcome = flow.submit_option_text(text).unwrap();
        assert!(outcome.correct);
        assert_eq!(flow.tokens(), 65);
        assert_eq!(notifier.kinds().last(), Some(&NoticeKind::Success));
    }

    #[test]
    fn claim_twice_completes_once() {
        let (mut flow, _) = flow();
        to_quiz(&mut flow);
        answer_all(&mut flow, 7);
        let before = flow.tokens();

        assert!(flow.claim_reward());
        assert!(!flow.claim_reward());
        assert!(!flow.claim_reward());
        assert_eq!(flow.tokens(), before + REWARD_COMPLETION_BONUS);
        assert!(flow.reward().is_claimed());
        assert!(flow.is_completed(Step::Reward));
    }

    #[test]
    fn cannot_claim_before_the_reward_step() {
        let (mut flow, _) = flow();
        to_quiz(&mut flow);
        assert!(!flow.claim_reward());
        assert!(!flow.reward().is_claimed());
    }

    #[test]
    fn remediation_bonus_is_repeatable() {
        let (mut flow, _) = flow();
        to_quiz(&mut flow);
        answer_all(&mut flow, 7);
        assert_eq!(flow.quiz().missed().len(), 3);

        let before = flow.tokens();
        assert_eq!(flow.review_missed(), Some(REMEDIATION_BONUS));
        assert_eq!(flow.tokens(), before + 20);
        // Not guarded: a second review pays again
        assert_eq!(flow.review_missed(), Some(REMEDIATION_BONUS));
        assert_eq!(flow.tokens(), before + 40);
    }

    #[test]
    fn remediation_needs_missed_questions() {
        let (mut flow, _) = flow();
        to_quiz(&mut flow);
        answer_all(&mut flow, 10);
        assert_eq!(flow.review_missed(), None);
    }

    #[test]
    fn share_bonus_is_repeatable() {
        let (mut flow, _) = flow();
        to_quiz(&mut flow);
        assert_eq!(flow.share(), None);

        answer_all(&mut flow, 5);
        let before = flow.tokens();
        assert_eq!(flow.share(), Some(SHARE_BONUS));
        flow.claim_reward();
        assert_eq!(flow.share(), Some(SHARE_BONUS));
        assert_eq!(flow.tokens(), before + 2 * SHARE_BONUS + REWARD_COMPLETION_BONUS);
    }

    #[test]
    fn back_from_quiz_keeps_progress() {
        let (mut flow, _) = flow();
        to_quiz(&mut flow);
        let tokens = flow.tokens();

        assert_eq!(flow.go_back(), Some(BackOutcome::Moved(Step::Show)));
        assert_eq!(flow.stage(), Stage::Active(Step::Show));
        assert_eq!(flow.tokens(), tokens);
        assert!(flow.is_completed(Step::Watch));
        assert!(flow.is_completed(Step::Show));
        assert!(!flow.is_completed(Step::Quiz));
    }

    #[test]
    fn quiz_finished_while_away_pays_on_return() {
        let (mut flow, _) = flow();
        to_quiz(&mut flow);
        for i in 0..9 {
            answer(&mut flow, i, true);
        }
        let right = flow.quiz().questions()[9].correct_option;
        flow.submit_answer(9, right).unwrap();
        flow.go_back();

        // Feedback delay elapses while the learner is on the Show step
        assert!(matches!(flow.advance_quiz(), Some(QuizAdvance::Finished(_))));
        assert!(!flow.is_completed(Step::Quiz));
        assert_eq!(flow.stage(), Stage::Active(Step::Show));

        assert!(flow.forward());
        assert!(flow.is_completed(Step::Quiz));
        assert_eq!(flow.stage(), Stage::Active(Step::Reward));
        assert_eq!(flow.tokens(), 55 + 100 + 50);
    }

    #[test]
    fn finished_quiz_is_not_reentered() {
        let (mut flow, _) = flow();
        to_quiz(&mut flow);
        answer_all(&mut flow, 4);
        flow.go_back();
        assert_eq!(flow.stage(), Stage::Active(Step::Quiz));
        assert_eq!(flow.submit_answer(9, 0), None);
        assert_eq!(flow.advance_quiz(), None);
        assert!(flow.forward());
        assert_eq!(flow.stage(), Stage::Active(Step::Reward));
    }

    #[test]
    fn finish_fires_once_after_modal_closes() {
        let (mut flow, _) = flow();
        to_quiz(&mut flow);
        answer_all(&mut flow, 3);
        assert!(!flow.close_reward_modal());

        flow.claim_reward();
        assert!(!flow.finish());
        assert!(flow.close_reward_modal());
        assert!(flow.finish());
        assert!(!flow.finish());
        assert!(!flow.can_exit());
    }

    #[test]
    fn view_reflects_quiz_progress() {
        let (mut flow, _) = flow();
        to_quiz(&mut flow);
        let right = flow.quiz().questions()[0].correct_option;
        flow.submit_answer(0, right).unwrap();

        let view = flow.view();
        assert_eq!(view.stage, Stage::Active(Step::Quiz));
        assert_eq!(view.completed, vec![Step::Watch, Step::Show]);
        assert_eq!(view.quiz.index, 0);
        assert_eq!(view.quiz.total, 10);
        assert_eq!(view.quiz.feedback, Some(true));
        assert_eq!(view.quiz.phase, QuizPhase::ShowingFeedback);
        assert_eq!(view.quiz.score(), None);
    }
}
