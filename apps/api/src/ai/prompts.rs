// Prompt templates for the AI features. Placeholders in `{braces}` are replaced
// with `str::replace` before sending; JSON examples use literal braces.

pub const QUESTIONS_PERSONA: &str = "You are an expert HR professional and interview designer. \
    Generate thoughtful, relevant interview questions that help assess candidate suitability.";

/// Replace `{num_questions}`, `{job_title}`, `{job_description}`.
pub const QUESTIONS_PROMPT_TEMPLATE: &str = r#"Generate {num_questions} professional interview questions for the following job position:

Job Title: {job_title}
Job Description: {job_description}

Create questions that assess:
1. Technical skills relevant to the role
2. Problem-solving abilities
3. Communication skills
4. Cultural fit
5. Experience and achievements

Return a JSON object with this format:
{
  "questions": [
    {
      "text": "Question text here",
      "type": "text",
      "category": "technical|behavioral|situational",
      "expected_keywords": ["keyword1", "keyword2", "keyword3"]
    }
  ]
}"#;

pub const SCORING_PERSONA: &str = "You are an expert HR professional with extensive experience \
    in candidate evaluation. Provide fair, objective, and constructive assessments.";

/// Replace `{job_description}`, `{answers}`.
pub const SCORING_PROMPT_TEMPLATE: &str = r#"Analyze the following interview responses for a position with this job description:

Job Description: {job_description}

Interview Responses:
{answers}

Evaluate the candidate based on:
1. Relevance of experience to the role (25%)
2. Communication clarity and professionalism (20%)
3. Problem-solving and analytical thinking (20%)
4. Technical knowledge and skills (20%)
5. Cultural fit and motivation (15%)

Return JSON:
{
  "overall_score": 0,
  "category_scores": {
    "experience": 0,
    "communication": 0,
    "problem_solving": 0,
    "technical_skills": 0,
    "cultural_fit": 0
  },
  "feedback": "Detailed feedback text",
  "strengths": ["strength1", "strength2"],
  "improvements": ["area1", "area2"],
  "recommendation": "hire|maybe|no_hire"
}"#;

pub const RESUME_PERSONA: &str = "You are an expert resume parser. Extract structured \
    information from resume text accurately. Use null for anything not present.";

/// Replace `{resume_text}`.
pub const RESUME_PROMPT_TEMPLATE: &str = r#"Extract structured information from this resume.

RESUME TEXT:
{resume_text}

Return JSON with this EXACT schema:
{
  "personal_info": {
    "first_name": null, "last_name": null, "email": null, "phone": null,
    "location": null, "linkedin_url": null, "portfolio_url": null
  },
  "professional_summary": {
    "current_job_title": null, "bio": null, "experience_years": null
  },
  "skills": ["skill"],
  "work_experience": [
    {"title": "", "company": "", "duration": null, "description": null,
     "start_date": null, "end_date": null, "current": false}
  ],
  "education": [
    {"degree": "", "institution": "", "year": null, "field": null, "grade": null}
  ],
  "certifications": [
    {"name": "", "issuer": null, "year": null}
  ]
}"#;

pub const COVER_LETTER_PERSONA: &str = "You are an expert career counselor and professional \
    writer specializing in compelling cover letters. Generate personalized, engaging letters \
    that highlight relevant experience and genuine interest in the role and company.";

/// Replace `{name}`, `{skills}`, `{experience}`, `{education}`, `{company}`, `{position}`,
/// `{requirements}`, `{description}`, `{guidance}`, `{tone}`.
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"Generate a compelling cover letter with the following information:

CANDIDATE INFORMATION:
- Name: {name}
- Skills: {skills}
- Experience: {experience}
- Education: {education}

JOB INFORMATION:
- Company: {company}
- Position: {position}
- Requirements: {requirements}
- Job Description: {description}

{guidance}

TONE: {tone}

REQUIREMENTS:
1. Create a personalized, engaging cover letter that demonstrates genuine interest
2. Highlight relevant experience and skills that match the job requirements
3. Show knowledge of the company and role
4. Keep it concise (3-4 paragraphs)
5. Include specific examples when possible
6. Use the specified tone throughout

Return JSON:
{
  "cover_letter": "The complete cover letter text",
  "title": "Suggested title for the cover letter",
  "key_points": ["key strengths highlighted"],
  "suggestions": ["suggestions for improvement"]
}"#;

pub const COVER_LETTER_REVIEW_PERSONA: &str = "You are an expert career counselor and hiring \
    manager. Analyze cover letters professionally and provide constructive feedback.";

/// Replace `{cover_letter}`, `{requirements}`.
pub const COVER_LETTER_REVIEW_TEMPLATE: &str = r#"Analyze the following cover letter and provide detailed feedback.

COVER LETTER:
{cover_letter}

JOB REQUIREMENTS (if provided):
{requirements}

Assess effectiveness, structure, tone, specific examples and alignment with the requirements.

Return JSON:
{
  "overall_score": 85,
  "strengths": ["identified strengths"],
  "weaknesses": ["areas for improvement"],
  "suggestions": ["specific improvement suggestions"],
  "alignment_score": 80,
  "missing_elements": ["elements that could be added"],
  "tone_assessment": "Professional and engaging",
  "structure_feedback": "Well-organized with clear flow"
}"#;

pub const CV_PERSONA: &str = "You are an expert CV/Resume analyzer. Provide detailed, actionable \
    feedback with specific scores and recommendations.";

/// Replace `{candidate_name}`, `{cv_text}`.
pub const CV_PROMPT_TEMPLATE: &str = r#"Analyze this CV for {candidate_name} and provide detailed scoring and feedback.

CV TEXT:
{cv_text}

Score each dimension from 0 to 100:
1. FORMAT & STRUCTURE: readability, consistent layout, headings, professional appearance
2. CONTENT QUALITY: relevance, quantified achievements, impact statements, completeness
3. SECTIONS & ORGANIZATION: essential sections, logical flow, contact details, summary
4. PROFESSIONAL STYLE: language, grammar, consistency, terminology
5. KEYWORD OPTIMIZATION: industry keywords, technical skills, ATS compatibility

Return JSON:
{
  "format_score": 85,
  "content_score": 78,
  "sections_score": 82,
  "style_score": 90,
  "keywords_score": 75,
  "strengths": ["3-5 key strengths"],
  "weaknesses": ["3-5 areas for improvement"],
  "missing_sections": ["missing critical sections"],
  "format_issues": ["formatting problems"],
  "content_suggestions": ["content improvement suggestions"],
  "keyword_gaps": ["important missing keywords"],
  "detailed_feedback": {
    "format": "...",
    "content": "...",
    "sections": "...",
    "style": "...",
    "keywords": "..."
  }
}"#;

pub const SENTIMENT_PERSONA: &str = "You are a sentiment analysis expert. Analyze the sentiment \
    of the text and provide a rating from 1 to 5 stars and a confidence score between 0 and 1. \
    Respond with JSON in this format: {\"rating\": number, \"confidence\": number}";

pub const VIDEO_PERSONA: &str = "You are an expert in behavioral analysis and interview \
    assessment. Provide professional insights based on video interview analysis.";

/// Replace `{context}`.
pub const VIDEO_PROMPT_TEMPLATE: &str = r#"Analyze this interview video recording for communication and behavioral insights.

Interview Context: {context}

Provide insights on:
1. Communication confidence and clarity
2. Professional presentation and demeanor
3. Engagement and enthusiasm level
4. Overall interview performance indicators

Return JSON:
{
  "confidence": 0,
  "communication_style": "string description",
  "insights": "detailed behavioral analysis",
  "engagement_score": 0,
  "professionalism_score": 0
}"#;
