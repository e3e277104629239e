pub mod builtin;

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to open catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed catalog: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Catalog has no drops")]
    NoDrops,

    #[error("Catalog has no rewards")]
    NoRewards,

    #[error("Drop id '{0}' is used more than once")]
    DuplicateDrop(String),

    #[error("Drop '{0}' has no quiz questions")]
    NoQuestions(String),

    #[error("Question {question} of drop '{drop_id}' has no options")]
    NoOptions { drop_id: String, question: usize },

    #[error("Question {question} of drop '{drop_id}' marks option {correct} as correct, but has only {options} options")]
    CorrectOptionOutOfRange {
        drop_id: String,
        question: usize,
        correct: usize,
        options: usize,
    },
}

/// One multiple-choice question of a drop's quiz.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuizQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: usize,
}

impl QuizQuestion {
    pub fn new(prompt: &str, options: [&str; 4], correct_option: usize) -> Self {
        Self {
            prompt: prompt.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_option,
        }
    }

    pub fn correct_answer(&self) -> Option<&str> {
        self.options.get(self.correct_option).map(String::as_str)
    }
}

/// A single learning challenge: watch a clip, show what you did, pass a quiz.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DropInfo {
    pub id: String,
    pub title: String,
    pub subject: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub video_url: String,
    pub show_prompt: String,
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    GiftCard,
    Event,
    TokenBonus,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RewardTemplate {
    pub kind: RewardKind,
    pub title: String,
    pub image: String,
    pub message: String,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
}

/// The reward a session will hand out. Drawn once, never re-rolled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardOffer {
    pub kind: RewardKind,
    pub title: String,
    pub image: String,
    pub message: String,
    pub contact: Option<String>,
    pub amount: Option<String>,
}

impl From<&RewardTemplate> for RewardOffer {
    fn from(template: &RewardTemplate) -> Self {
        Self {
            kind: template.kind,
            title: template.title.clone(),
            image: template.image.clone(),
            message: template.message.clone(),
            contact: template.contact.clone(),
            amount: template.amount.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Catalog {
    pub drops: Vec<DropInfo>,
    pub rewards: Vec<RewardTemplate>,
}

impl Catalog {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_reader(reader)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        Self::from_reader(File::open(path)?)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.drops.is_empty() {
            return Err(CatalogError::NoDrops);
        }
        if self.rewards.is_empty() {
            return Err(CatalogError::NoRewards);
        }

        let mut seen = HashSet::new();
        for drop_info in &self.drops {
            if !seen.insert(drop_info.id.as_str()) {
                return Err(CatalogError::DuplicateDrop(drop_info.id.clone()));
            }
            if drop_info.questions.is_empty() {
                return Err(CatalogError::NoQuestions(drop_info.id.clone()));
            }
            for (i, question) in drop_info.questions.iter().enumerate() {
                if question.options.is_empty() {
                    return Err(CatalogError::NoOptions {
                        drop_id: drop_info.id.clone(),
                        question: i + 1,
                    });
                }
                if question.correct_option >= question.options.len() {
                    return Err(CatalogError::CorrectOptionOutOfRange {
                        drop_id: drop_info.id.clone(),
                        question: i + 1,
                        correct: question.correct_option,
                        options: question.options.len(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn find(&self, id: &str) -> Option<&DropInfo> {
        self.drops.iter().find(|d| d.id == id)
    }

    pub fn find_by_title(&self, title: &str) -> Option<&DropInfo> {
        self.drops.iter().find(|d| d.title == title)
    }

    pub fn draw_reward<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<RewardOffer> {
        self.rewards.choose(rng).map(RewardOffer::from)
    }
}
