// Shared prompt fragments used by every generation template.
// Templates themselves live next to the module that fills them (generation/prompts.rs).

/// Opening role statement for all resume prompts.
pub const WRITER_ROLE: &str = "You are a professional resume writer.";

/// Grounding rule appended to every prompt built from profile data.
pub const GROUNDING_INSTRUCTION: &str = "\
IMPORTANT: Use ONLY the information provided below. Do not make up or add any \
information that is not explicitly provided. Use the exact name, contact details, \
dates, and descriptions given; do not modify or embellish them. If a detail is \
missing, omit it rather than inventing it.";

/// Output format rule: markdown with one heading per section, in this order.
pub const FORMAT_INSTRUCTION: &str = "\
Use markdown syntax for formatting (# for headings, * for emphasis). Structure the \
document with these headings, in this order: Summary, Skills, Experience, Education.";
