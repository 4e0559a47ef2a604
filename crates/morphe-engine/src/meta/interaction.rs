//! Interaction pipeline
//!
//! Every interaction with a member passes through up to three checks, each
//! of which consults the member's facets and collects their advice into an
//! [`InteractionResult`]:
//!
//! 1. visibility (`Facet::hides`)
//! 2. usability (`Facet::disables`)
//! 3. validity (`Facet::invalidates`), per parameter and then per action
//!
//! Framework-initiated interactions skip the first two checks.
//!
//! Successful executions are reported to a [`CommandRecorder`] unless the
//! caller asks for a pass-through.

use parking_lot::Mutex;

use morphe_types::{Identifier, InteractionResult, InteractionType, ManagedObject, Value};

use super::facet::FacetHolder;

/// Who initiated an interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionInitiatedBy {
    /// An end user; every rule applies
    #[default]
    User,
    /// The framework itself; visibility and usability are not checked
    Framework,
}

impl InteractionInitiatedBy {
    /// Check if the framework initiated the interaction
    pub fn is_framework(self) -> bool {
        self == InteractionInitiatedBy::Framework
    }
}

/// Rendering location an interaction happens in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Where {
    /// Any location
    Anywhere,
    /// Form of a single object
    ObjectForms,
    /// Table nested in a parent object
    ParentedTables,
    /// Standalone result table
    StandaloneTables,
    /// Both kinds of table
    AllTables,
    /// Location unknown
    #[default]
    NotSpecified,
}

impl Where {
    /// Whether a rule scoped to `self` applies at `location`
    pub fn includes(self, location: Where) -> bool {
        match self {
            Where::Anywhere => true,
            Where::AllTables => matches!(
                location,
                Where::ParentedTables | Where::StandaloneTables | Where::AllTables
            ),
            scope => scope == location,
        }
    }

    /// Parse a scope name from metadata
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "anywhere" | "everywhere" => Some(Where::Anywhere),
            "object_forms" => Some(Where::ObjectForms),
            "parented_tables" => Some(Where::ParentedTables),
            "standalone_tables" => Some(Where::StandaloneTables),
            "all_tables" => Some(Where::AllTables),
            _ => None,
        }
    }
}

/// The objects an interaction acts on
#[derive(Debug, Clone)]
pub struct InteractionHead {
    owner: ManagedObject,
    target: ManagedObject,
}

impl InteractionHead {
    /// Owner and target are the same object
    pub fn regular(owner: ManagedObject) -> Self {
        Self {
            target: owner.clone(),
            owner,
        }
    }

    /// Target is a mixin constructed around the owner
    pub fn mixin(owner: ManagedObject, mixin: ManagedObject) -> Self {
        Self {
            owner,
            target: mixin,
        }
    }

    /// Object the member is presented on
    pub fn owner(&self) -> &ManagedObject {
        &self.owner
    }

    /// Object the methods are invoked on
    pub fn target(&self) -> &ManagedObject {
        &self.target
    }
}

/// What a facet sees when asked for advice
#[derive(Debug, Clone, Copy)]
pub struct InteractionContext<'a> {
    /// Check being performed
    pub interaction_type: InteractionType,
    /// Member being checked
    pub identifier: &'a Identifier,
    /// Owner and target
    pub head: &'a InteractionHead,
    /// Who initiated the interaction
    pub initiated_by: InteractionInitiatedBy,
    /// Rendering location
    pub where_: Where,
    /// Proposed arguments, or the proposed property value
    pub arguments: &'a [Value],
    /// Parameter being checked, for per-parameter validity
    pub parameter_index: Option<usize>,
}

impl<'a> InteractionContext<'a> {
    /// Context for a check that takes no arguments
    pub fn new(
        interaction_type: InteractionType,
        identifier: &'a Identifier,
        head: &'a InteractionHead,
        initiated_by: InteractionInitiatedBy,
        where_: Where,
    ) -> Self {
        Self {
            interaction_type,
            identifier,
            head,
            initiated_by,
            where_,
            arguments: &[],
            parameter_index: None,
        }
    }

    /// Attach proposed arguments
    pub fn with_arguments(mut self, arguments: &'a [Value]) -> Self {
        self.arguments = arguments;
        self
    }

    /// Focus on one parameter
    pub fn with_parameter_index(mut self, index: usize) -> Self {
        self.parameter_index = Some(index);
        self
    }

    /// Value under test: the focused argument, or the first one
    pub fn proposed_value(&self) -> Option<&'a Value> {
        self.arguments.get(self.parameter_index.unwrap_or(0))
    }
}

// ============================================================================
// Advice collection
// ============================================================================

/// Ask every facet of a holder whether it hides the member
pub fn visibility_result(holder: &FacetHolder, ctx: &InteractionContext<'_>) -> InteractionResult {
    let mut result = InteractionResult::new(ctx.interaction_type, ctx.identifier.clone());
    for facet in holder.facets() {
        if let Some(veto) = facet.hides(ctx) {
            result.advise(veto.reason().map(str::to_string));
        }
    }
    result
}

/// Ask every facet of a holder whether it disables the member
pub fn usability_result(holder: &FacetHolder, ctx: &InteractionContext<'_>) -> InteractionResult {
    let mut result = InteractionResult::new(ctx.interaction_type, ctx.identifier.clone());
    for facet in holder.facets() {
        if let Some(veto) = facet.disables(ctx) {
            result.advise(veto.reason().map(str::to_string));
        }
    }
    result
}

/// Ask every facet of a holder whether it invalidates the proposal
pub fn validity_result(holder: &FacetHolder, ctx: &InteractionContext<'_>) -> InteractionResult {
    let mut result = InteractionResult::new(ctx.interaction_type, ctx.identifier.clone());
    for facet in holder.facets() {
        if let Some(veto) = facet.invalidates(ctx) {
            result.advise(veto.reason().map(str::to_string));
        }
    }
    result
}

// ============================================================================
// Execution
// ============================================================================

/// A record of one executed action or property modification
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRecord {
    /// Member that was executed
    pub identifier: Identifier,
    /// Class of the owner the member was executed on
    pub owner_class: String,
    /// Arguments (or the new property value)
    pub arguments: Vec<Value>,
    /// Who initiated it
    pub initiated_by: InteractionInitiatedBy,
}

/// Receives command records
pub trait CommandRecorder: Send + Sync {
    /// Record one execution
    fn record(&self, record: CommandRecord);
}

/// In-memory command recorder
#[derive(Debug, Default)]
pub struct CommandLog {
    records: Mutex<Vec<CommandRecord>>,
}

impl CommandLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all records, oldest first
    pub fn records(&self) -> Vec<CommandRecord> {
        self.records.lock().clone()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Check if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl CommandRecorder for CommandLog {
    fn record(&self, record: CommandRecord) {
        self.records.lock().push(record);
    }
}

/// Options for executing an action or modifying a property
#[derive(Clone, Copy, Default)]
pub struct ExecutionContext<'a> {
    /// Who initiated the execution
    pub initiated_by: InteractionInitiatedBy,
    /// Rendering location
    pub where_: Where,
    /// Skip command recording
    pub pass_through: bool,
    /// Where command records go
    pub recorder: Option<&'a dyn CommandRecorder>,
}

impl<'a> ExecutionContext<'a> {
    /// User-initiated execution
    pub fn user() -> Self {
        Self::default()
    }

    /// Framework-initiated execution
    pub fn framework() -> Self {
        Self {
            initiated_by: InteractionInitiatedBy::Framework,
            ..Self::default()
        }
    }

    /// Set the rendering location
    pub fn at(mut self, where_: Where) -> Self {
        self.where_ = where_;
        self
    }

    /// Send command records to a recorder
    pub fn with_recorder(mut self, recorder: &'a dyn CommandRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Do not record commands
    pub fn pass_through(mut self) -> Self {
        self.pass_through = true;
        self
    }

    pub(crate) fn record(&self, record: impl FnOnce() -> CommandRecord) {
        if self.pass_through {
            return;
        }
        if let Some(recorder) = self.recorder {
            recorder.record(record());
        }
    }
}

impl std::fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("initiated_by", &self.initiated_by)
            .field("where_", &self.where_)
            .field("pass_through", &self.pass_through)
            .field("recording", &self.recorder.is_some())
            .finish()
    }
}
