//! Required-locus typing validator
//!
//! Deep structural validation of HLA typing belongs to the external typing
//! service; this default implementation covers the one structural rule the
//! importer cannot do without: a searchable donor must carry complete
//! typings at the required loci. Anything the validator refuses is written
//! to the failure log and excluded from ordering.

use crate::core::traits::{TypingOutcome, TypingValidator};
use crate::types::{ChangeType, DonorUpdateCommand, Locus};

/// Validates that the required loci carry complete typings
///
/// Deletes pass unconditionally: they carry no payload on the wire and the
/// ordering engine never reads one.
#[derive(Debug, Clone)]
pub struct RequiredTypingValidator {
    required: Vec<Locus>,
}

impl RequiredTypingValidator {
    /// Validator requiring the given loci
    pub fn new(required: Vec<Locus>) -> Self {
        RequiredTypingValidator { required }
    }
}

impl Default for RequiredTypingValidator {
    /// Requires A, B, and DRB1, the minimum searchable typing
    fn default() -> Self {
        RequiredTypingValidator::new(vec![Locus::A, Locus::B, Locus::Drb1])
    }
}

impl TypingValidator for RequiredTypingValidator {
    fn validate(&self, command: &DonorUpdateCommand) -> TypingOutcome {
        if command.change_type == ChangeType::Delete {
            return TypingOutcome::Valid;
        }
        for locus in &self.required {
            if !command.hla.has_complete_typing(*locus) {
                return TypingOutcome::Invalid {
                    reason: format!("missing or incomplete {locus} typing"),
                };
            }
        }
        TypingOutcome::Valid
    }
}
