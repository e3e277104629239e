use std::sync::Arc;

use log::debug;

use crate::catalog::QuizQuestion;

use super::TOKENS_PER_CORRECT_ANSWER;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
    pub percentage: u32,
    pub bonus_tokens: u32,
}

impl QuizScore {
    /// Percentage is floored to a whole number, the bonus is 5 tokens for
    /// every full 10%.
    pub fn compute(correct: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            (correct.min(total) * 100 / total) as u32
        };
        Self {
            correct,
            total,
            percentage,
            bonus_tokens: (percentage / 10) * 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    Answering,
    /// Feedback for the current question is recorded and on screen.
    ShowingFeedback,
    Finished(QuizScore),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub question: usize,
    pub correct: bool,
    pub tokens_awarded: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizAdvance {
    NextQuestion(usize),
    Finished(QuizScore),
}

#[derive(Debug, Clone)]
pub struct QuizEngine {
    questions: Arc<[QuizQuestion]>,
    current: usize,
    selected: Vec<Option<usize>>,
    feedback: Vec<Option<bool>>,
    correct: usize,
    missed: Vec<usize>,
    phase: QuizPhase,
}

impl QuizEngine {
    pub fn new(questions: Arc<[QuizQuestion]>) -> Self {
        let len = questions.len();
        Self {
            questions,
            current: 0,
            selected: vec![None; len],
            feedback: vec![None; len],
            correct: 0,
            missed: Vec::new(),
            phase: QuizPhase::Answering,
        }
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        match self.phase {
            QuizPhase::Finished(_) => None,
            _ => self.questions.get(self.current),
        }
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn correct_count(&self) -> usize {
        self.correct
    }

    pub fn missed(&self) -> &[usize] {
        &self.missed
    }

    pub fn selected(&self, question: usize) -> Option<usize> {
        self.selected.get(question).copied().flatten()
    }

    pub fn feedback(&self, question: usize) -> Option<bool> {
        self.feedback.get(question).copied().flatten()
    }

    pub fn score(&self) -> Option<QuizScore> {
        match self.phase {
            QuizPhase::Finished(score) => Some(score),
            _ => None,
        }
    }

    /// Records the learner's choice for the current question. Each question
    /// takes exactly one answer; anything else is ignored.
    pub fn submit_answer(&mut self, question: usize, option: usize) -> Option<AnswerOutcome> {
        if self.phase != QuizPhase::Answering || question != self.current {
            debug!("Answer for question {question} ignored, current is {}", self.current);
            return None;
        }
        if self.feedback.get(question).copied().flatten().is_some() {
            return None;
        }
        let asked = self.questions.get(question)?;
        if option >= asked.options.len() {
            debug!("Option {option} out of range for question {question}");
            return None;
        }

        let correct = option == asked.correct_option;
        self.selected[question] = Some(option);
        self.feedback[question] = Some(correct);
        self.phase = QuizPhase::ShowingFeedback;

        let tokens_awarded = if correct {
            self.correct += 1;
            TOKENS_PER_CORRECT_ANSWER
        } else {
            self.missed.push(question);
            0
        };

        Some(AnswerOutcome {
            question,
            correct,
            tokens_awarded,
        })
    }

    /// Leaves the feedback screen: next question, or the final score after
    /// the last one.
    pub fn advance(&mut self) -> Option<QuizAdvance> {
        if self.phase != QuizPhase::ShowingFeedback {
            return None;
        }

        if self.current + 1 < self.questions.len() {
            self.current += 1;
            self.phase = QuizPhase::Answering;
            Some(QuizAdvance::NextQuestion(self.current))
        } else {
            let score = QuizScore::compute(self.correct, self.questions.len());
            self.phase = QuizPhase::Finished(score);
            Some(QuizAdvance::Finished(score))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn engine() -> QuizEngine {
        let catalog = Catalog::builtin();
        QuizEngine::new(catalog.drops[0].questions.clone().into())
    }

    fn answer_all(engine: &mut QuizEngine, correct: usize) {
        for i in 0..engine.questions().len() {
            let question = &engine.questions()[i];
            let option = if i < correct {
                question.correct_option
            } else {
                (question.correct_option + 1) % question.options.len()
            };
            engine.submit_answer(i, option).unwrap();
            engine.advance().unwrap();
        }
    }

    #[test]
    fn score_is_five_tokens_per_ten_percent() {
        for correct in 0..=10 {
            let score = QuizScore::compute(correct, 10);
            assert_eq!(score.percentage, correct as u32 * 10);
            assert_eq!(score.bonus_tokens, correct as u32 * 5);
        }
        assert_eq!(QuizScore::compute(7, 10).bonus_tokens, 35);
    }

    #[test]
    fn score_floors_to_ten_percent_buckets() {
        // 2 of 3 is 66%, which earns the 60% tier
        let score = QuizScore::compute(2, 3);
        assert_eq!(score.percentage, 66);
        assert_eq!(score.bonus_tokens, 30);
        assert_eq!(QuizScore::compute(0, 0).percentage, 0);
    }

    #[test]
    fn correct_answer_awards_tokens() {
        let mut engine = engine();
        let right = engine.questions()[0].correct_option;
        let outcome = engine.submit_answer(0, right).unwrap();
        assert!(outcome.correct);
        assert_eq!(outcome.tokens_awarded, TOKENS_PER_CORRECT_ANSWER);
        assert_eq!(engine.correct_count(), 1);
        assert_eq!(engine.feedback(0), Some(true));
        assert_eq!(engine.phase(), QuizPhase::ShowingFeedback);
    }

    #[test]
    fn wrong_answer_is_recorded_as_missed() {
        let mut engine = engine();
        let wrong = (engine.questions()[0].correct_option + 1) % 4;
        let outcome = engine.submit_answer(0, wrong).unwrap();
        assert!(!outcome.correct);
        assert_eq!(outcome.tokens_awarded, 0);
        assert_eq!(engine.missed(), &[0]);
        assert_eq!(engine.selected(0), Some(wrong));
    }

    #[test]
    fn answered_question_is_locked() {
        let mut engine = engine();
        let right = engine.questions()[0].correct_option;
        engine.submit_answer(0, (right + 1) % 4).unwrap();

        let before = (engine.correct_count(), engine.missed().to_vec(), engine.selected(0));
        assert_eq!(engine.submit_answer(0, right), None);
        assert_eq!((engine.correct_count(), engine.missed().to_vec(), engine.selected(0)), before);

        // Still locked once the quiz moved on
        engine.advance().unwrap();
        assert_eq!(engine.submit_answer(0, right), None);
        assert_eq!(engine.feedback(0), Some(false));
    }

    #[test]
    fn rejects_answers_for_other_questions_and_bad_options() {
        let mut engine = engine();
        assert_eq!(engine.submit_answer(3, 0), None);
        assert_eq!(engine.submit_answer(0, 4), None);
        assert_eq!(engine.submit_answer(42, 0), None);
        assert_eq!(engine.feedback(0), None);
        assert_eq!(engine.advance(), None);
    }

    #[test]
    fn finishing_reports_score() {
        let mut engine = engine();
        answer_all(&mut engine, 6);

        let score = engine.score().unwrap();
        assert_eq!(score.correct, 6);
        assert_eq!(score.percentage, 60);
        assert_eq!(score.bonus_tokens, 30);
        assert_eq!(engine.missed(), &[6, 7, 8, 9]);
        assert_eq!(engine.current_question(), None);
        assert_eq!(engine.advance(), None);
    }
}
