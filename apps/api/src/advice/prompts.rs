// All LLM prompt constants for the advice pipeline.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Role half of the classification system prompt; the JSON-only fragment
/// from `llm_client::prompts` is appended at call time.
pub const CLASSIFY_SYSTEM: &str = "You are an insurance advisory analyst. \
    You map a client intake narrative onto a fixed catalog of advisory categories.";

/// Classification prompt. Replace `{catalog}` and `{narrative}` before sending.
pub const CLASSIFY_PROMPT_TEMPLATE: &str = r#"Below is the catalog of advisory categories and, per category, the subcategories that exist in the database.

CATALOG:
{catalog}

For EVERY category in the catalog, decide which subcategory fits the client narrative, if any.

Return a JSON object with this EXACT schema (no extra fields):
{
  "classifications": [
    {"category": "exact_category_name_from_catalog", "sub_category": "exact_sub_category_name_from_catalog"},
    {"category": "another_category", "sub_category": null}
  ]
}

Rules:
- Output one entry per catalog category, in catalog order.
- Use the names exactly as they appear in the catalog.
- NEVER use a subcategory that is not listed for that category.
- Use null when the narrative gives no clear signal for that category.

CLIENT NARRATIVE:
{narrative}"#;

/// System prompt for all free-text generation calls.
pub const GENERATE_SYSTEM: &str = "You are a careful assistant to a Dutch insurance advisor. \
    Follow the instructions exactly. \
    Answer in plain text without markdown, introductions or explanations.";

/// Research prompt. Replace `{placeholders}`, `{choices}` and `{no_invention}`
/// before sending.
/// The narrative is sent as context.
pub const RESEARCH_PROMPT_TEMPLATE: &str = r#"Lees het klantverhaal hieronder en noteer per regel de feiten die nodig zijn om adviessjablonen in te vullen.

Invulvelden in de sjablonen:
{placeholders}

Keuzes in de sjablonen (schrijf de gekozen optie letterlijk over als 'keuze: <optie>'):
{choices}

Gebruik altijd deze sleutels wanneer het klantverhaal er iets over zegt:
- volgt_advies_op: ja | nee
- reden_niet_opvolgen: <reden, geformuleerd zodat de zin 'omdat u ...' klopt>
- eigen_risico: <bedrag in euro>
- basis_verzekerd_bedrag: <bedrag in euro of waardebasis>
- maximum_eigen_risico: <bedrag in euro>
- verzekering_soort: <soort dekking>

Schrijf 'onbekend' als het klantverhaal iets niet vermeldt.
{no_invention}"#;

/// Topic screening prompt. The user input is sent as context.
pub const SCREENING_PROMPT: &str = "Is the following input about insurance, financial advisory, \
    or business risk management? Answer with only \"YES\" or \"NO\".";

