//! Interaction consents
//!
//! Business-rule checks never fail with an error: they return a [`Consent`]
//! that either allows the interaction or vetoes it with a reason that can
//! be shown to an end user.
//!
//! An [`InteractionResult`] gathers the advice of every facet consulted for
//! one check; an [`InteractionResultSet`] gathers several checks and, when
//! turned into a single consent, reports the first veto.

use std::fmt;

use crate::identifier::Identifier;

/// Reason reported when a veto carries no text of its own
pub const DEFAULT_VETO_REASON: &str = "Not allowed";

/// Which check an interaction result belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionType {
    /// Is the member visible to the caller
    MemberVisibility,
    /// Can the member be used (is it enabled)
    MemberUsability,
    /// Is a single action argument valid
    ActionParameterValidity,
    /// Is the whole argument set of an action valid
    ActionArgumentSetValidity,
    /// Is a proposed property value valid
    PropertyModify,
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InteractionType::MemberVisibility => "visibility",
            InteractionType::MemberUsability => "usability",
            InteractionType::ActionParameterValidity => "parameter validity",
            InteractionType::ActionArgumentSetValidity => "argument set validity",
            InteractionType::PropertyModify => "property modification",
        };
        f.write_str(name)
    }
}

/// A veto, optionally explained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Veto {
    reason: Option<String>,
}

impl Veto {
    /// Veto with a reason
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }

    /// Veto without a reason
    pub fn unexplained() -> Self {
        Self { reason: None }
    }

    /// The reason, if one was given
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// The reason, or [`DEFAULT_VETO_REASON`]
    pub fn reason_or_default(&self) -> &str {
        self.reason.as_deref().unwrap_or(DEFAULT_VETO_REASON)
    }
}

/// Allow or veto-with-reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Consent {
    /// The interaction may proceed
    Allow,
    /// The interaction is refused
    Veto(Veto),
}

impl Consent {
    /// Allow
    pub fn allow() -> Self {
        Consent::Allow
    }

    /// Veto with a reason
    pub fn veto(reason: impl Into<String>) -> Self {
        Consent::Veto(Veto::new(reason))
    }

    /// Veto from an optional reason (`None` still vetoes)
    pub fn veto_optional(reason: Option<String>) -> Self {
        Consent::Veto(Veto { reason })
    }

    /// Whether the interaction may proceed
    pub fn is_allowed(&self) -> bool {
        matches!(self, Consent::Allow)
    }

    /// Whether the interaction is refused
    pub fn is_vetoed(&self) -> bool {
        !self.is_allowed()
    }

    /// Reason for a veto (`None` when allowed or unexplained)
    pub fn reason(&self) -> Option<&str> {
        match self {
            Consent::Allow => None,
            Consent::Veto(veto) => veto.reason(),
        }
    }

    /// Reason for a veto, degrading to [`DEFAULT_VETO_REASON`]
    pub fn reason_or_default(&self) -> Option<&str> {
        match self {
            Consent::Allow => None,
            Consent::Veto(veto) => Some(veto.reason_or_default()),
        }
    }
}

/// Advice collected from every facet consulted for one check
#[derive(Debug, Clone)]
pub struct InteractionResult {
    interaction_type: InteractionType,
    identifier: Identifier,
    vetoed: bool,
    reasons: Vec<String>,
}

impl InteractionResult {
    /// Empty (allowing) result
    pub fn new(interaction_type: InteractionType, identifier: Identifier) -> Self {
        Self {
            interaction_type,
            identifier,
            vetoed: false,
            reasons: Vec::new(),
        }
    }

    /// Record a veto. A `None` reason still vetoes.
    pub fn advise(&mut self, reason: Option<String>) {
        self.vetoed = true;
        if let Some(reason) = reason.filter(|r| !r.is_empty()) {
            self.reasons.push(reason);
        }
    }

    /// Record the outcome of a consent
    pub fn advise_consent(&mut self, consent: &Consent) {
        if let Consent::Veto(veto) = consent {
            self.advise(veto.reason().map(str::to_string));
        }
    }

    /// The check this result belongs to
    pub fn interaction_type(&self) -> InteractionType {
        self.interaction_type
    }

    /// The member that was checked
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Whether any consulted facet vetoed
    pub fn is_vetoing(&self) -> bool {
        self.vetoed
    }

    /// All veto reasons joined by `"; "`
    pub fn reason(&self) -> Option<String> {
        if self.reasons.is_empty() {
            None
        } else {
            Some(self.reasons.join("; "))
        }
    }

    /// Collapse to a consent
    pub fn create_consent(&self) -> Consent {
        if self.vetoed {
            Consent::veto_optional(self.reason())
        } else {
            Consent::Allow
        }
    }
}

/// Several interaction results, consumed as one consent
#[derive(Debug, Clone, Default)]
pub struct InteractionResultSet {
    results: Vec<InteractionResult>,
}

impl InteractionResultSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result
    pub fn add(&mut self, result: InteractionResult) {
        self.results.push(result);
    }

    /// Whether any contained result vetoes
    pub fn is_vetoing(&self) -> bool {
        self.results.iter().any(InteractionResult::is_vetoing)
    }

    /// First vetoing result, if any
    pub fn first_vetoing(&self) -> Option<&InteractionResult> {
        self.results.iter().find(|r| r.is_vetoing())
    }

    /// Consent of the first vetoing result, or allow
    pub fn create_consent(&self) -> Consent {
        self.first_vetoing()
            .map(InteractionResult::create_consent)
            .unwrap_or(Consent::Allow)
    }

    /// Contained results in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &InteractionResult> {
        self.results.iter()
    }

    /// Number of contained results
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether no results were added
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
