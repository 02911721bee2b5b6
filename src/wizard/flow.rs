//! Wizard steps and the two flow configurations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One wizard screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Address search.
    Address,
    /// Roof segment selection and restricted areas.
    Roof,
    /// Panel and inverter choice.
    Equipment,
    /// Household consumption.
    Consumption,
    /// Financial estimate.
    Estimate,
    /// Customer contact details.
    PersonalInfo,
    /// Terms, privacy and contract acknowledgments.
    Consents,
    /// One-time-code signature.
    Signature,
    /// Contract signed.
    Confirmation,
    /// Report ready for download.
    Results,
}

impl Step {
    /// Service work triggered when the step is entered.
    #[must_use]
    pub const fn entry_effect(self) -> Option<EntryEffect> {
        match self {
            Self::Roof => Some(EntryEffect::LoadBuilding),
            Self::Equipment => Some(EntryEffect::LoadCatalog),
            Self::Signature => Some(EntryEffect::StartSignature),
            Self::Results => Some(EntryEffect::GenerateReport),
            _ => None,
        }
    }

    /// Short machine name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Roof => "roof",
            Self::Equipment => "equipment",
            Self::Consumption => "consumption",
            Self::Estimate => "estimate",
            Self::PersonalInfo => "personal_info",
            Self::Consents => "consents",
            Self::Signature => "signature",
            Self::Confirmation => "confirmation",
            Self::Results => "results",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Asynchronous work attached to entering a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryEffect {
    /// Fetch the building and its roof segments.
    LoadBuilding,
    /// Fetch the panel and inverter catalog.
    LoadCatalog,
    /// Create the contract if needed and send the signature code.
    StartSignature,
    /// Render the report.
    GenerateReport,
}

/// Which journey the wizard runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    /// Quote ending in a signed contract.
    #[default]
    Contract,
    /// Quote ending in a downloadable report.
    Report,
}

const CONTRACT_STEPS: &[Step] = &[
    Step::Address,
    Step::Roof,
    Step::Equipment,
    Step::Consumption,
    Step::Estimate,
    Step::PersonalInfo,
    Step::Consents,
    Step::Signature,
    Step::Confirmation,
];

const REPORT_STEPS: &[Step] = &[
    Step::Address,
    Step::Roof,
    Step::Equipment,
    Step::Consumption,
    Step::Estimate,
    Step::PersonalInfo,
    Step::Results,
];

/// Ordered steps of one flow; the last step is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowConfig {
    kind: FlowKind,
    steps: &'static [Step],
}

impl FlowConfig {
    /// Returns the configuration for `kind`.
    #[must_use]
    pub const fn for_kind(kind: FlowKind) -> Self {
        let steps = match kind {
            FlowKind::Contract => CONTRACT_STEPS,
            FlowKind::Report => REPORT_STEPS,
        };
        Self { kind, steps }
    }

    /// Flow kind.
    #[must_use]
    pub const fn kind(&self) -> FlowKind {
        self.kind
    }

    /// Steps in order.
    #[must_use]
    pub const fn steps(&self) -> &'static [Step] {
        self.steps
    }

    /// Number of steps.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always `false`; every flow has steps.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step at `index`.
    #[must_use]
    pub fn step(&self, index: usize) -> Option<Step> {
        self.steps.get(index).copied()
    }

    /// Index of `step`, if the flow contains it.
    #[must_use]
    pub fn index_of(&self, step: Step) -> Option<usize> {
        self.steps.iter().position(|&s| s == step)
    }

    /// Index of the terminal step.
    #[must_use]
    pub const fn terminal_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flows_share_the_front_and_differ_at_the_end() {
        let contract = FlowConfig::for_kind(FlowKind::Contract);
        let report = FlowConfig::for_kind(FlowKind::Report);
        assert_eq!(contract.steps()[..6], report.steps()[..6]);
        assert_eq!(contract.step(contract.terminal_index()), Some(Step::Confirmation));
        assert_eq!(report.step(report.terminal_index()), Some(Step::Results));
        assert_eq!(report.index_of(Step::Signature), None);
    }

    #[test]
    fn entry_effects() {
        assert_eq!(Step::Roof.entry_effect(), Some(EntryEffect::LoadBuilding));
        assert_eq!(Step::Equipment.entry_effect(), Some(EntryEffect::LoadCatalog));
        assert_eq!(
            Step::Signature.entry_effect(),
            Some(EntryEffect::StartSignature)
        );
        assert_eq!(Step::Estimate.entry_effect(), None);
    }

    #[test]
    fn step_display() {
        assert_eq!(Step::PersonalInfo.to_string(), "personal_info");
    }
}
