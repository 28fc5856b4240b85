// All LLM prompt constants for the Analysis module.

/// System prompt for resume/JD analysis — enforces JSON-only output.
pub const ANALYSIS_SYSTEM: &str =
    "You are an expert technical recruiter and resume analyst. \
    Compare a candidate's resume against a job description. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Analysis prompt template. Replace `{resume_text}`, `{jd_text}` and
/// `{sections}` before sending.
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Compare the resume below against the job description and produce a structured compatibility report.

Return a JSON object with this EXACT schema (no extra fields):
{
  "match_summary": "One-paragraph plain-language assessment of overall fit.",
  "match_score": "72/100",
  "job_keywords_detected": [
    {"keyword": "Rust", "status": "Present"},
    {"keyword": "Kubernetes", "status": "Missing"}
  ],
  "gaps_and_suggestions": [
    "Concrete, actionable improvement suggestion."
  ],
  "sections": {
    "<section name>": {
      "score": 7,
      "summary": "One-paragraph section assessment.",
      "issues": ["Specific problem found."],
      "suggestions": ["Specific fix."]
    }
  }
}

Rules:
- "match_score" is an integer from 0 to 100 followed by "/100".
- Every keyword materially present in the job description must appear in
  "job_keywords_detected" with status "Present" if the resume covers it and
  "Missing" otherwise. There is no partial status.
- Section scores are integers from 0 to 10.
- Produce a "sections" entry for each of the following requested sections,
  and ONLY these: {sections}
- If no sections are requested, return "sections" as an empty object.

RESUME:
{resume_text}

JOB DESCRIPTION:
{jd_text}"#;
