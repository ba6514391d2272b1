// All prompt templates for the Generation module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Prompt for a candidate with a stored profile.
/// Placeholders: {role}, {grounding_instruction}, {format_instruction},
///               {personal_info}, {job_description}, {experience}, {skills}, {education}
pub const PROFILE_PROMPT_TEMPLATE: &str = r#"{role} Your task is to create an ATS-optimized resume in markdown format using ONLY the information provided below.

{grounding_instruction}

{format_instruction}

Personal Information:
{personal_info}

Job Description:
{job_description}

Experience:
{experience}

Skills:
{skills}

Education:
{education}

Generate a professional resume that highlights the candidate's experience and skills in relation to the job description. Use only the information provided above."#;

/// Reduced prompt used when no profile is supplied.
/// Placeholders: {role}, {format_instruction}, {job_description}, {skills}
pub const GENERIC_PROMPT_TEMPLATE: &str = r#"{role} Your task is to create a generic, ATS-optimized resume template in markdown format for the job description below.

No candidate information is available. Do not invent names, employers, schools, or dates; use clearly marked placeholders such as [Your Name] and [Company] instead.

{format_instruction}

Job Description:
{job_description}

Key Skills:
{skills}

Emphasize the key skills above wherever they fit the role."#;
