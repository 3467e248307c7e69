//! System prompt construction from the CV.
//!
//! Both variants are pure functions of the `CvRecord`. The condensed variant
//! exists because Gemini answers more reliably from a short context.

use crate::chat::models::ModelSelector;
use crate::llm_client::prompts::{
    with_subject, CONDENSED_GUIDELINES_TEMPLATE, FULL_INSTRUCTIONS_TEMPLATE,
    TONE_AND_GUARDRAILS_TEMPLATE,
};
use crate::models::cv::{CvRecord, SkillCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptVariant {
    /// Profile, full work history, skills by category.
    Full,
    /// Current role plus a compact employment list.
    Condensed,
}

impl PromptVariant {
    pub fn for_model(model: ModelSelector) -> Self {
        match model {
            ModelSelector::Gemini => PromptVariant::Condensed,
            ModelSelector::OpenAi | ModelSelector::Claude => PromptVariant::Full,
        }
    }
}

pub fn build_system_prompt(cv: &CvRecord, variant: PromptVariant) -> String {
    match variant {
        PromptVariant::Full => build_full_prompt(cv),
        PromptVariant::Condensed => build_condensed_prompt(cv),
    }
}

/// First name used in the tone rules, e.g. "Paul" for "Paul Anthony Dawson".
fn subject(cv: &CvRecord) -> &str {
    cv.personal_info
        .name
        .split_whitespace()
        .next()
        .unwrap_or("the candidate")
}

fn build_full_prompt(cv: &CvRecord) -> String {
    let subject = subject(cv);

    let work_history = cv
        .work_experience
        .iter()
        .map(|exp| {
            let mut entry = format!(
                "{} - {}: {} at {}\n{}\nKey Responsibilities:",
                exp.start_date, exp.end_date, exp.role, exp.company, exp.description
            );
            for responsibility in &exp.responsibilities {
                entry.push_str("\n- ");
                entry.push_str(responsibility);
            }
            entry
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let skills = skills_by_category(cv)
        .into_iter()
        .map(|(category, skills)| {
            format!("{}:\n{}", category.as_str().to_uppercase(), skills.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are an AI assistant with complete knowledge of {name}'s CV. You have access to the entire work history, skills, and professional background. You must answer questions accurately based on this data.

PROFILE SUMMARY:
{summary}

COMPLETE WORK HISTORY:
{work_history}

SKILLS BY CATEGORY:
{skills}

{instructions}

{guardrails}

Remember: You have full access to this CV data. Use it to provide accurate, detailed responses about {subject}'s career history.",
        name = cv.personal_info.name,
        summary = cv.profile_summary,
        instructions = with_subject(FULL_INSTRUCTIONS_TEMPLATE, subject),
        guardrails = with_subject(TONE_AND_GUARDRAILS_TEMPLATE, subject),
    )
}

fn build_condensed_prompt(cv: &CvRecord) -> String {
    let subject = subject(cv);

    let current_role = cv
        .current_role()
        .map(|exp| {
            format!(
                "{} at {} ({} - {})",
                exp.role, exp.company, exp.start_date, exp.end_date
            )
        })
        .unwrap_or_else(|| "Not currently employed".to_string());

    let history = cv
        .work_experience
        .iter()
        .map(|exp| {
            format!(
                "• {} - {}\n  Company: {}\n  Role: {}",
                exp.start_date, exp.end_date, exp.company, exp.role
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are an AI assistant representing {name}'s professional CV.

You have access to the following verified data from {subject}'s CV:

CURRENT ROLE:
{current_role}

EMPLOYMENT HISTORY:
{history}

{guidelines}

{guardrails}

Please keep answers factual and based on the CV information while being helpful and engaging.",
        name = cv.personal_info.name,
        guidelines = with_subject(CONDENSED_GUIDELINES_TEMPLATE, subject),
        guardrails = with_subject(TONE_AND_GUARDRAILS_TEMPLATE, subject),
    )
}

/// Skills grouped by category, categories in order of first appearance.
fn skills_by_category(cv: &CvRecord) -> Vec<(SkillCategory, Vec<String>)> {
    let mut groups: Vec<(SkillCategory, Vec<String>)> = Vec::new();
    for skill in &cv.skills {
        let label = format!("{} (Level {})", skill.name, skill.level);
        match groups.iter_mut().find(|(category, _)| *category == skill.category) {
            Some((_, skills)) => skills.push(label),
            None => groups.push((skill.category, vec![label])),
        }
    }
    groups
}
