//! OpenAI-compatible inference engine (Groq and similar hosted APIs)

mod client;

pub use client::OpenAiCompatibleEngine;
