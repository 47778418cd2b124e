use crate::requests::{FarmingRequest, Language};

pub const HINDI_DIRECTIVE: &str = "Answer ONLY in very simple Hindi, using everyday farmer language. \
Even if the user types in English, always reply only in Hindi for this query.";

pub const ENGLISH_DIRECTIVE: &str = "Answer ONLY in very simple English. \
Even if the user mixes Hindi or other languages, always reply only in English for this query.";

/// Separator between the instruction template and the farmer's data.
const USER_QUERY_MARKER: &str = "USER QUERY:";

/// Reply-language directive.  Only `Language::Hindi` gets the Hindi one.
pub fn language_directive(language: &Language) -> &'static str {
    match language {
        Language::Hindi => HINDI_DIRECTIVE,
        Language::English | Language::Other(_) => ENGLISH_DIRECTIVE,
    }
}

/// Instructions prepended to every advice request.
pub fn instruction_template(language: &Language) -> String {
    let directive = language_directive(language);
    format!(
        r#"You are "Raghu", a friendly AI assistant that helps Indian farmers with crop and soil problems. 🧑‍🌾🤖

{directive}

STYLE RULES (MUST FOLLOW STRICTLY):
- Be very polite, supportive and encouraging. Use a few relevant emojis (but not too many).
- First give a SHORT, clear paragraph answer.
- Then give the rest of the answer in:
  1) A bullet list of main points / steps
  2) A bullet list of pros/benefits (prefix items with "✅")
  3) A bullet list of cautions/risks (prefix items with "⚠️")
- Always keep the language simple, easy to understand by a normal farmer.
- Use only information related to the user's query (crop, soil type, issue, location). Do NOT change the topic.
- If the user later asks about something completely different, gently bring them back to the original crop/problem.

CONTEXT:
You will get data that was saved from a form: farmer name, location, soil type, crop, issue type, problem description.
Use that information to give practical advice (what to check, what to do now, any sprays/fertilizers/irrigation tips, when to contact a local expert etc.)."#
    )
}

/// The farmer's saved form data as the user turn.
pub fn user_turn(request: &FarmingRequest) -> String {
    format!(
        "Farmer name: {}\n\
         Phone: {}\n\
         Location: {}\n\
         Soil type: {}\n\
         Crop: {}\n\
         Issue type: {}\n\
         Problem description: {}\n\
         \n\
         Now give your advice following ALL the style rules.",
        request.name,
        request.phone,
        request.location,
        request.soil_type,
        request.crop,
        request.issue_type,
        request.description,
    )
}

/// Full single-turn prompt: instructions, then the farmer's data.
pub fn build_prompt(request: &FarmingRequest) -> String {
    format!(
        "{}\n\n{USER_QUERY_MARKER}\n{}",
        instruction_template(&request.language),
        user_turn(request)
    )
}
