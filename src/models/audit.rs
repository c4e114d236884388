//! Audit trail models.
//!
//! Every pricing and voucher rule records what it was given, what it produced
//! and a one-line explanation, so a billing clerk can see exactly why a total
//! came out the way it did.

use serde::{Deserialize, Serialize};

/// A single step in the audit trace recording a calculation decision.
///
/// # Example
///
/// ```
/// use clinic_billing::models::AuditStep;
///
/// let step = AuditStep {
///     step_number: 1,
///     rule_id: "line_discount".to_string(),
///     rule_name: "Line Item Discount".to_string(),
///     input: serde_json::json!({ "unit_price": "200000" }),
///     output: serde_json::json!({ "discount_amount": "20000" }),
///     reasoning: "10% of 200000 = 20000".to_string(),
/// };
/// assert_eq!(step.rule_id, "line_discount");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// The ordered audit trace for a calculation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrace {
    /// The sequence of calculation steps.
    pub steps: Vec<AuditStep>,
}

impl AuditTrace {
    /// Appends a step to the trace.
    pub fn push(&mut self, step: AuditStep) {
        self.steps.push(step);
    }

    /// The step number the next appended step should carry.
    pub fn next_step_number(&self) -> u32 {
        self.steps.len() as u32 + 1
    }

    /// Returns the first step produced by the given rule, if any.
    pub fn find(&self, rule_id: &str) -> Option<&AuditStep> {
        self.steps.iter().find(|s| s.rule_id == rule_id)
    }
}
