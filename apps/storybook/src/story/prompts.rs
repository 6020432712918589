// Prompt constants for concept generation and the quality gate.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::story::models::Level;

/// Concept prompt template. Replace `{level}`, `{constraints}`, `{page_count}`,
/// `{last_page}`, `{history}` and `{json_only}` before sending.
pub const STORY_PROMPT_TEMPLATE: &str = r#"You are a Finnish language learning content creator. Your goal is to generate an engaging story for {level} level learners.

{constraints}
7.  **Setting:** A REAL, specific location in a Finnish city (e.g., Helsinki, Tampere, Turku, Oulu).
8.  **Length:** Exactly {page_count} pages.
9.  **Format:** {json_only}

{history}
**CRITICAL INSTRUCTION: VISUAL CONSISTENCY**
- **Randomly decide** to have 1, 2, or 3 main characters for the story.
- You MUST define ALL main characters in the `characters` list.
- **IMPORTANT**: In every `image_description`, you MUST repeat the **FULL VISUAL DESCRIPTION** of ALL characters present in the scene. Do NOT just use their names.
    - BAD: "Sofia is smiling."
    - GOOD: "Sofia, a young girl with curly blonde hair wearing a blue dress, is smiling."

**PAGE RULES:**
- Page 1 has "type": "cover" and carries the story title.
- Pages 2 to {last_page_minus_one} have "type": "story".
- Page {last_page} has "type": "cta" and asks the reader a simple question.
- `page_number` starts at 1 and increases by one on every page.

**JSON Structure:**
{
  "title_fi": "Finnish Title",
  "title_en": "English Title",
  "characters": [
    {
      "name": "Name",
      "description": "Detailed visual description (hair, skin, clothes, accessories)."
    }
  ],
  "pages": [
    {
      "page_number": 1,
      "type": "cover",
      "text_fi": "Title of the story",
      "text_en": "Title of the story",
      "image_description": "Visual description for the cover image. INCLUDE FULL CHARACTER DETAILS."
    },
    {
      "page_number": 2,
      "type": "story",
      "text_fi": "Finnish text...",
      "text_en": "English translation...",
      "image_description": "Visual description... REMEMBER TO DESCRIBE CHARACTERS FULLY."
    },
    {
      "page_number": {last_page},
      "type": "cta",
      "text_fi": "Simple question?",
      "text_en": "Simple question?",
      "image_description": "Visual description for the CTA..."
    }
  ]
}
"#;

const BEGINNER_CONSTRAINTS: &str = "\
**Constraints:**
1.  **Level:** Beginner (A1-A2).
2.  **Sentence Structure:** Simple Subject-Verb-Object (SVO). Avoid complex inversions.
3.  **Verb Forms:** Present (minä asun) and simple past (hän käveli). Minimize perfect tenses/passive.
4.  **Cases:** Nominative, Partitive, Illative, Inessive. Avoid complex cases.
5.  **Vocabulary:** Common, everyday words (max 500 most common Finnish words).
6.  **Sentence Length:** 5-10 words per sentence maximum.";

const INTERMEDIATE_CONSTRAINTS: &str = "\
**Constraints:**
1.  **Level:** Intermediate (B1-B2).
2.  **Sentence Structure:** Mix of simple and compound sentences. Some subordinate clauses allowed.
3.  **Verb Forms:** Present, past, perfect tenses. Conditional mood. Some passive voice.
4.  **Cases:** All basic cases including Elative, Adessive, Ablative, Allative. Introduce Essive.
5.  **Vocabulary:** Broader vocabulary including abstract concepts and less common words.
6.  **Sentence Length:** 8-15 words per sentence.";

const ADVANCED_CONSTRAINTS: &str = "\
**Constraints:**
1.  **Level:** Advanced (C1-C2).
2.  **Sentence Structure:** Complex sentences with multiple clauses, inversions, and varied structures.
3.  **Verb Forms:** All tenses and moods including potential, imperative. Passive voice frequently.
4.  **Cases:** All 15 cases used naturally, including rare ones (Comitative, Instructive).
5.  **Vocabulary:** Rich, nuanced vocabulary. Idioms, colloquialisms, and literary expressions.
6.  **Sentence Length:** 10-20 words per sentence. Varied for rhythm.";

pub fn level_constraints(level: Level) -> &'static str {
    match level {
        Level::Beginner => BEGINNER_CONSTRAINTS,
        Level::Intermediate => INTERMEDIATE_CONSTRAINTS,
        Level::Advanced => ADVANCED_CONSTRAINTS,
    }
}

/// Quality gate prompt. Replace `{story_text}` and `{json_only}`.
/// Vocabulary difficulty is deliberately out of the reviewer's remit.
pub const QUALITY_PROMPT_TEMPLATE: &str = r#"You are a strict Finnish grammar checker. Review the following story text ONLY for:
1. Grammatical errors (case endings, verb conjugations, agreement)
2. Meaning errors (words used incorrectly, nonsensical sentences)

DO NOT judge vocabulary complexity or suggest simpler words. The vocabulary level is intentional.

Story Text:
{story_text}

If the text is grammatically correct and makes sense, respond with exactly:
{"valid": true, "feedback": "Grammar and meaning are correct"}

If there are grammatical or meaning errors, respond with:
{"valid": false, "feedback": "Specific details about the grammar or meaning errors"}

{json_only}
"#;
