// Resume generation: keyword-driven prompt assembly and the streaming relay
// from the generation backend. All backend calls go through llm_client.

pub mod handlers;
pub mod pipeline;
pub mod prompt_builder;
pub mod prompts;
