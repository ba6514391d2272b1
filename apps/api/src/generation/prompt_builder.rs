//! Prompt assembly. Every profile value placed in a prompt is copied verbatim
//! from the snapshot; the only derived text is date formatting.

use chrono::NaiveDate;

use crate::generation::prompts::{GENERIC_PROMPT_TEMPLATE, PROFILE_PROMPT_TEMPLATE};
use crate::llm_client::prompts::{FORMAT_INSTRUCTION, GROUNDING_INSTRUCTION, WRITER_ROLE};
use crate::models::profile::{Education, ProfileSnapshot, WorkExperience};

const DATE_FORMAT: &str = "%b %Y";
const PRESENT: &str = "Present";

/// Builds the backend prompt. With a profile, the full grounded template is
/// used; without one, a reduced template with only the job text and skills.
pub fn build_prompt(profile: Option<&ProfileSnapshot>, job_text: &str, skills: &[String]) -> String {
    let skills = render_skills(skills);
    match profile {
        Some(profile) => {
            let personal_info = render_personal_info(profile);
            let experience = render_experience(&profile.work_history);
            let education = render_education(&profile.education);
            fill_template(
                PROFILE_PROMPT_TEMPLATE,
                &[
                    ("role", WRITER_ROLE),
                    ("grounding_instruction", GROUNDING_INSTRUCTION),
                    ("format_instruction", FORMAT_INSTRUCTION),
                    ("personal_info", personal_info.as_str()),
                    ("job_description", job_text),
                    ("experience", experience.as_str()),
                    ("skills", skills.as_str()),
                    ("education", education.as_str()),
                ],
            )
        }
        None => fill_template(
            GENERIC_PROMPT_TEMPLATE,
            &[
                ("role", WRITER_ROLE),
                ("format_instruction", FORMAT_INSTRUCTION),
                ("job_description", job_text),
                ("skills", skills.as_str()),
            ],
        ),
    }
}

/// Substitutes `{key}` placeholders in one left-to-right pass. Inserted values
/// are never rescanned, so braces inside user text survive untouched.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn render_personal_info(profile: &ProfileSnapshot) -> String {
    let user = &profile.user;
    format!(
        "Name: {}\nEmail: {}\nPhone: {}\nLocation: {}\nTitle: {}\nSummary: {}",
        user.full_name, user.email, user.phone, user.location, user.title, user.summary
    )
}

fn render_experience(entries: &[WorkExperience]) -> String {
    entries
        .iter()
        .map(|exp| {
            format!(
                "- {} at {} ({})\n  Location: {}\n  Description: {}\n",
                exp.title,
                exp.company,
                date_range(exp.start_date, exp.end_date, exp.is_current),
                exp.location,
                exp.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_education(entries: &[Education]) -> String {
    entries
        .iter()
        .map(|edu| {
            format!(
                "- {} in {} from {} ({})\n  Location: {}\n  Description: {}\n",
                edu.degree,
                edu.field,
                edu.school,
                date_range(edu.start_date, edu.end_date, edu.is_current),
                edu.location,
                edu.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_skills(skills: &[String]) -> String {
    skills
        .iter()
        .map(|skill| format!("- {skill}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `Jan 2020 - Mar 2023`. A current entry ends at "Present" whatever its stored
/// end date; so does an entry with no end date.
pub fn date_range(start: NaiveDate, end: Option<NaiveDate>, is_current: bool) -> String {
    let end = match end {
        Some(end) if !is_current => end.format(DATE_FORMAT).to_string(),
        _ => PRESENT.to_string(),
    };
    format!("{} - {}", start.format(DATE_FORMAT), end)
}
