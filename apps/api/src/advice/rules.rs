//! Placeholder rule table: maps a placeholder identifier to the strategy
//! used to resolve it. Unknown identifiers fall back to `PlaceholderRule::Generic`.

use std::collections::HashMap;

/// Fixed clause substituted when the client accepts the advice.
pub const ACCEPTED_CLAUSE: &str = "mijn advies op.";

/// Fixed clause substituted when the client declines the advice.
/// `[reden_niet_opvolgen]` is resolved in the same pass as its parent.
pub const DECLINED_CLAUSE: &str = "mijn advies niet op, omdat u [reden_niet_opvolgen]. \
Wij willen u erop wijzen dat het accepteren van dit risico mogelijke gevolgen kan hebben \
voor uw financiële reserves. In het ergste geval zou uw bedrijfscontinuïteit in gevaar \
kunnen komen. U bent zich hiervan bewust en accepteert deze risico's.";

/// Identifier of the reason sub-placeholder inside [`DECLINED_CLAUSE`].
pub const DECLINE_REASON_PLACEHOLDER: &str = "reden_niet_opvolgen";

/// Which monetary slot an amount placeholder stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmountSlot {
    Deductible,
    InsuredAmount,
    RiskCeiling,
}

impl AmountSlot {
    /// Lowercase phrases that tie a sentence to this slot.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            AmountSlot::Deductible => &["eigen risico", "eigenrisico", "deductible"],
            AmountSlot::InsuredAmount => &[
                "verzekerd bedrag",
                "verzekerde bedrag",
                "verzekerde som",
                "verzekerde waarde",
                "dagwaarde",
                "nieuwwaarde",
                "cataloguswaarde",
                "insured",
            ],
            AmountSlot::RiskCeiling => &[
                "dragen",
                "risicobereidheid",
                "maximaal",
                "maximum",
                "tot een bedrag van",
            ],
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AmountSlot::Deductible => "bedrag eigen risico",
            AmountSlot::InsuredAmount => "basis verzekerd bedrag",
            AmountSlot::RiskCeiling => "maximaal te dragen risico",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderRule {
    /// Accept/decline flag; substitutes one of the fixed clauses.
    AdviceAcceptance,
    /// Any currency amount tied to the slot; all matches are reported.
    Amount(AmountSlot),
    /// A recognised coverage or liability term.
    CoverageType,
    /// Why the client declines the advice; read from the `omdat ...` clause.
    DeclineReason,
    /// Client identity; falls back to a professional phrase instead of missing.
    ClientIdentity { default: &'static str },
    /// Only an explicit, unambiguous fact resolves it.
    Generic,
}

impl PlaceholderRule {
    /// Description carried by the missing-item marker for `identifier`.
    pub fn missing_description(&self, identifier: &str) -> String {
        match self {
            PlaceholderRule::AdviceAcceptance => "keuze wel/niet advies opvolgen".to_string(),
            PlaceholderRule::Amount(slot) => slot.description().to_string(),
            PlaceholderRule::CoverageType => "soort verzekering".to_string(),
            PlaceholderRule::DeclineReason => "reden om het advies niet op te volgen".to_string(),
            PlaceholderRule::ClientIdentity { .. } | PlaceholderRule::Generic => {
                generic_description(identifier)
            }
        }
    }
}

fn generic_description(identifier: &str) -> String {
    match identifier {
        "beleid_klant" => "verzekeringsbeleid van de klant".to_string(),
        "afwijkend_beleid" => "afwijkende risicobereidheid".to_string(),
        other => other.replace('_', " "),
    }
}

/// Identifier → rule lookup. Extend with [`RuleTable::with_rule`]; the scan and
/// fill logic never needs to know about individual identifiers.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: HashMap<String, PlaceholderRule>,
}

impl RuleTable {
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// The rules for the identifiers used by the stored advisory templates.
    pub fn standard() -> Self {
        Self::empty()
            .with_rule("volgt_advies_op", PlaceholderRule::AdviceAcceptance)
            .with_rule("volg_advies_op", PlaceholderRule::AdviceAcceptance)
            .with_rule(DECLINE_REASON_PLACEHOLDER, PlaceholderRule::DeclineReason)
            .with_rule("eigen_risico", PlaceholderRule::Amount(AmountSlot::Deductible))
            .with_rule(
                "basis_verzekerd_bedrag",
                PlaceholderRule::Amount(AmountSlot::InsuredAmount),
            )
            .with_rule(
                "verzekerd_bedrag",
                PlaceholderRule::Amount(AmountSlot::InsuredAmount),
            )
            .with_rule(
                "maximum_eigen_risico",
                PlaceholderRule::Amount(AmountSlot::RiskCeiling),
            )
            .with_rule("verzekering_soort", PlaceholderRule::CoverageType)
            .with_rule(
                "klant",
                PlaceholderRule::ClientIdentity { default: "de klant" },
            )
            .with_rule(
                "klant_naam",
                PlaceholderRule::ClientIdentity { default: "de klant" },
            )
            .with_rule(
                "naam_klant",
                PlaceholderRule::ClientIdentity { default: "de klant" },
            )
            .with_rule(
                "bedrijfsnaam",
                PlaceholderRule::ClientIdentity {
                    default: "uw onderneming",
                },
            )
    }

    pub fn with_rule(mut self, identifier: &str, rule: PlaceholderRule) -> Self {
        self.rules.insert(identifier.to_lowercase(), rule);
        self
    }

    pub fn rule_for(&self, identifier: &str) -> PlaceholderRule {
        self.rules
            .get(identifier)
            .copied()
            .unwrap_or(PlaceholderRule::Generic)
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::standard()
    }
}
