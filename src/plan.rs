//! Attribute-level planning.
//!
//! [`diff`] compares a resource's prior state with the proposed state
//! attribute by attribute, in name order. A computed attribute the proposal
//! leaves unset keeps its prior value; a changed force-new attribute makes the
//! plan a replacement.

use serde_json::Value;

use crate::schema::Schema;
use crate::types::{AttributeChange, PlanResult};

/// Plan the transition from `prior` to `proposed`.
///
/// `prior` is `None` when the resource does not exist yet. A `null`
/// `proposed` plans a destroy.
pub fn diff(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    if proposed.is_null() {
        return destroy(schema, prior);
    }

    let mut planned = proposed.as_object().cloned().unwrap_or_default();
    let mut changes = Vec::new();
    let mut requires_replace = false;

    for (name, attr) in &schema.attributes {
        let before = present(prior.and_then(|p| p.get(name)));
        let after = match present(planned.get(name)) {
            Some(value) => Some(value.clone()),
            None if attr.flags.computed => before.cloned(),
            None => None,
        };
        planned.insert(name.clone(), after.clone().unwrap_or(Value::Null));

        if before == after.as_ref() {
            continue;
        }
        if attr.force_new && before.is_some() {
            requires_replace = true;
        }
        changes.push(
            AttributeChange::new(name.as_str(), before.cloned(), after)
                .with_sensitive(attr.flags.sensitive),
        );
    }

    PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
}

fn destroy(schema: &Schema, prior: Option<&Value>) -> PlanResult {
    let changes = schema
        .attributes
        .iter()
        .filter_map(|(name, attr)| {
            present(prior.and_then(|p| p.get(name))).map(|value| {
                AttributeChange::removed(name.as_str(), value.clone())
                    .with_sensitive(attr.flags.sensitive)
            })
        })
        .collect();
    PlanResult::with_changes(Value::Null, changes, false)
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}
