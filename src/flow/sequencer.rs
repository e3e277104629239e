use std::collections::BTreeSet;
use std::fmt;

use log::debug;

/// The four stages of a drop, in the order a learner walks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    Watch = 1,
    Show = 2,
    Quiz = 3,
    Reward = 4,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::Watch, Step::Show, Step::Quiz, Step::Reward];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(number: u8) -> Option<Step> {
        Self::ALL.into_iter().find(|s| s.number() == number)
    }

    pub fn next(self) -> Option<Step> {
        Self::from_number(self.number() + 1)
    }

    pub fn previous(self) -> Option<Step> {
        self.number().checked_sub(1).and_then(Self::from_number)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Watch => "Watch",
            Step::Show => "Show",
            Step::Quiz => "Quiz",
            Step::Reward => "Reward",
        };
        write!(f, "{name}")
    }
}

/// Where the learner is in a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    NotStarted,
    Active(Step),
    /// Terminal: the reward was claimed.
    Claimed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    Completed(Step),
    Forward,
    Back,
}

impl Stage {
    /// The whole transition table. Pairs that are not listed are invalid.
    pub fn next(self, transition: Transition) -> Option<Stage> {
        use Stage::*;
        use Transition::*;

        match (self, transition) {
            (NotStarted, Start) => Some(Active(Step::Watch)),
            (Active(Step::Reward), Completed(Step::Reward)) => Some(Claimed),
            (Active(current), Completed(step)) if current == step => step.next().map(Active),
            (Active(current), Forward) => current.next().map(Active),
            (Active(Step::Watch), Back) => Some(NotStarted),
            (Active(current), Back) => current.previous().map(Active),
            _ => None,
        }
    }

    pub fn step(self) -> Option<Step> {
        match self {
            Stage::Active(step) => Some(step),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    /// Moved to the previous step.
    Moved(Step),
    /// Backed out of the first step, the learner leaves the drop.
    Exited,
}

/// Stage, completed steps and the token ledger of one drop session.
#[derive(Debug, Clone)]
pub struct StepSequencer {
    stage: Stage,
    completed: BTreeSet<Step>,
    tokens: u32,
}

impl Default for StepSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl StepSequencer {
    pub fn new() -> Self {
        Self {
            stage: Stage::NotStarted,
            completed: BTreeSet::new(),
            tokens: 0,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn tokens(&self) -> u32 {
        self.tokens
    }

    pub fn completed(&self) -> &BTreeSet<Step> {
        &self.completed
    }

    pub fn is_completed(&self, step: Step) -> bool {
        self.completed.contains(&step)
    }

    pub fn is_started(&self) -> bool {
        self.stage != Stage::NotStarted
    }

    pub fn start(&mut self) -> bool {
        self.apply(Transition::Start)
    }

    /// Marks `step` complete and credits `award`. Returns `false` when the
    /// step was already completed or is not the step being shown.
    pub fn complete(&mut self, step: Step, award: u32) -> bool {
        if self.completed.contains(&step) {
            debug!("Step {step} already completed, ignoring");
            return false;
        }
        let Some(next) = self.stage.next(Transition::Completed(step)) else {
            debug!("Step {step} cannot be completed from {:?}", self.stage);
            return false;
        };

        self.completed.insert(step);
        self.award(award);
        self.stage = next;
        debug!("Step {step} completed (+{award}), now at {:?}", self.stage);
        true
    }

    /// Moves forward past a step that was already completed.
    pub fn forward(&mut self) -> bool {
        match self.stage.step() {
            Some(step) if self.completed.contains(&step) => self.apply(Transition::Forward),
            _ => false,
        }
    }

    pub fn go_back(&mut self) -> Option<BackOutcome> {
        let next = self.stage.next(Transition::Back)?;
        self.stage = next;
        match next {
            Stage::Active(step) => Some(BackOutcome::Moved(step)),
            _ => Some(BackOutcome::Exited),
        }
    }

    /// Credits tokens. The ledger only ever grows.
    pub fn award(&mut self, tokens: u32) -> u32 {
        self.tokens = self.tokens.saturating_add(tokens);
        self.tokens
    }

    fn apply(&mut self, transition: Transition) -> bool {
        match self.stage.next(transition) {
            Some(next) => {
                self.stage = next;
                true
            }
            None => false,
        }
    }
}
