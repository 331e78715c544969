// Prompt constants for qualitative candidate evaluation.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for the fit evaluation. JSON-only output is appended at call time.
pub const EVALUATION_SYSTEM: &str = "You are an expert technical recruiter specialised in \
    evaluating candidates for IT positions. Your task is to analyse how well a candidate's \
    resume fits a job offer and produce a structured assessment that highlights the \
    candidate's strengths and gaps.";

/// Evaluation prompt template.
/// Replace: {grounding_instruction}, {job_title}, {job_description}, {primary_skill},
///          {job_type}, {resume_json}
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"{grounding_instruction}

JOB OFFER:
Title: {job_title}
Description: {job_description}
Key skill: {primary_skill}
Job type: {job_type}

CANDIDATE RESUME (structured):
"""
{resume_json}
"""

Evaluate the fit between this candidate and this "{job_type}" position by following
this 4-step analysis framework, in order:

Step 1: Job requirements
- Identify the required years of experience
- List the specific technical skills requested
- Note the sector/domain expertise needed
- Identify the soft skills required

Step 2: Candidate profile
- Compute the total relevant professional experience
- Catalogue the candidate's technical skills
- Note any sector/domain expertise
- Review education and certifications

Step 3: Gap analysis
- Compare required vs actual experience
- Compare required vs actual technical skills
- Assess domain knowledge fit
- Assess soft skill alignment

Step 4: Final assessment
- skills_score (0-100): start from 100 and reduce it for every key skill that is missing
  (for example -10 per missing skill).
- experience_score (0-100): start from 100 and reduce it when experience is insufficient
  (for example -10 per missing year).
- other_score (0-100): location, certifications and other criteria; reduce it for a
  location mismatch or any other significant gap.
- Summarise the main strengths and weaknesses and give a final recommendation.
- The scores MUST reflect the gaps identified in step 3. A candidate missing several key
  skills or years of experience must score significantly lower. Do not grade the scores
  independently of the gap analysis."#;

/// JSON shape of the evaluation answer. Scores may be numbers or numeric strings.
pub const EVALUATION_SCHEMA_HINT: &str = r#"{
  "job_analysis": {
    "required_experience": "X years",
    "key_technical_skills": ["Skill 1", "Skill 2"],
    "domain_expertise": ["Domain 1"],
    "soft_skills": ["Soft skill 1"]
  },
  "candidate_profile": {
    "total_relevant_experience": "X years",
    "technical_skills": ["Skill 1", "Skill 2"],
    "domain_expertise": ["Domain 1"],
    "education_certifications": ["Degree or certification"]
  },
  "gap_analysis": {
    "experience_comparison": {
      "required": "X years",
      "actual": "Y years",
      "matching_experience": ["Experience 1"],
      "experience_gaps": ["Gap 1"]
    },
    "technical_skills": {
      "matching_skills": ["Skill 1"],
      "missing_skills": ["Skill 2"]
    },
    "domain_knowledge": {
      "fit_assessment": "Assessment",
      "strengths": ["Strength 1"],
      "gaps": ["Gap 1"]
    },
    "soft_skills": {
      "alignment": "Assessment",
      "strengths": ["Strength 1"],
      "areas_for_development": ["Area 1"]
    }
  },
  "final_assessment": {
    "skills_score": 0,
    "experience_score": 0,
    "other_score": 0,
    "key_strengths": ["Strength 1"],
    "significant_gaps": ["Gap 1"],
    "fit_recommendation": "Recommendation",
    "candidate_name": "Full name",
    "years_of_experience": "X years",
    "location": "City, Country",
    "email": "Email",
    "phone": "Phone"
  }
}"#;
