// Shared prompt fragments. Each service that makes reasoning calls defines its
// own prompts.rs alongside it; cross-cutting fragments live here.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction forbidding invented facts about the candidate.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Every statement about the candidate must be supported by the resume \
    document provided. Do NOT infer, interpolate, or invent experience, skills, \
    dates, or contact details. When a field is absent from the resume, say so \
    (for example \"not specified\") instead of guessing.";
