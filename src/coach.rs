use chatgpt::prelude::*;
use chatgpt::types::CompletionResponse;
use log::{debug, warn};

use crate::catalog::QuizQuestion;

/// Explains missed quiz questions, with ChatGPT when a key is configured.
pub struct Coach {
    personality: Personality,
    chat_gpt: Option<ChatGPT>,
}

impl Coach {
    pub fn new(chat_gpt: Option<ChatGPT>, personality: Personality) -> Self {
        Self {
            personality,
            chat_gpt,
        }
    }

    pub fn offline() -> Self {
        Self::new(None, Personality::default())
    }

    pub async fn explain_missed(&self, drop_title: &str, missed: &[QuizQuestion]) -> String {
        if missed.is_empty() {
            return "You got everything right, nothing to review!".to_string();
        }
        let Some(chat_gpt) = &self.chat_gpt else {
            return plain_review(missed);
        };

        // If the AI fails to generate a reply, we'll just list the correct answers
        match self.ask(chat_gpt, drop_title, missed).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!("Coach could not reach ChatGPT: {err}");
                plain_review(missed)
            }
        }
    }

    async fn ask(
        &self,
        chat_gpt: &ChatGPT,
        drop_title: &str,
        missed: &[QuizQuestion],
    ) -> Result<String> {
        let questions = missed
            .iter()
            .map(|q| {
                format!(
                    "- {} (correct answer: {})",
                    q.prompt,
                    q.correct_answer().unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!("You are a learning coach for K-12 students on the G3MS platform.
        The student just finished the \"{}\" challenge and missed these questions:
        {}
        Explain each correct answer in one or two simple sentences a student would enjoy reading.
        Speak like {}. Keep the whole reply under 120 words.", drop_title, questions, self.personality.get_personality());

        debug!("Asking the coach about {} missed questions", missed.len());
        let response: CompletionResponse = chat_gpt.send_message(&prompt).await?;
        let content = response.message().clone().content;

        Ok(content)
    }
}

fn plain_review(missed: &[QuizQuestion]) -> String {
    let lines = missed
        .iter()
        .map(|q| format!("• {}\n  ✅ {}", q.prompt, q.correct_answer().unwrap_or_default()))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Here's what to remember:\n{lines}")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Personality {
    #[default]
    Mentor,
    Hype,
    Scientist,
}

impl Personality {
    pub fn get_personality(&self) -> String {
        match self {
            Personality::Mentor => "a patient, encouraging teacher",
            Personality::Hype => "an upbeat esports commentator",
            Personality::Scientist => "a curious scientist who loves fun facts",
        }
        .to_string()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "mentor" => Some(Personality::Mentor),
            "hype" => Some(Personality::Hype),
            "scientist" => Some(Personality::Scientist),
            _ => None,
        }
    }
}
