use std::collections::HashSet;

use weld_model::Document;
use weld_plugin::Registry;

use crate::cycle::find_cycle;
use crate::error::ValidationError;
use crate::field_path::FieldPath;
use crate::rules;

/// Run every structural, dependency, and plugin-contract check over a
/// document and return every problem found, rather than stopping at the
/// first one.
///
/// Checks run in a fixed order, each over the *whole* document before the
/// next begins: document-level bounds (`version`, `name`, `settings`),
/// then per-step id shape and empty/duplicate ids, then dependency
/// references (unknown and self), then one cycle scan, and only once the
/// graph is known acyclic does it ask the registry whether a plugin
/// exists for each step's kind and whether the step's payload satisfies
/// it. A document with a duplicate id and an also-invalid payload is
/// reported for the duplicate id; the payload check is skipped for that
/// step since its identity is already ambiguous.
pub fn validate(doc: &Document, registry: &Registry) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let steps_path = FieldPath::steps();

    if !rules::is_valid_version(&doc.version) {
        errors.push(ValidationError::InvalidVersion {
            path: FieldPath::root().field("version"),
            version: doc.version.clone(),
        });
    }
    if !rules::is_valid_name_length(&doc.name) {
        errors.push(ValidationError::InvalidName {
            path: FieldPath::root().field("name"),
            len: doc.name.chars().count(),
        });
    }
    if !rules::is_valid_parallel(doc.settings.parallel) {
        errors.push(ValidationError::InvalidParallel {
            path: FieldPath::root().field("settings").field("parallel"),
            value: doc.settings.parallel,
        });
    }
    if !rules::is_valid_timeout_seconds(doc.settings.timeout_seconds) {
        errors.push(ValidationError::InvalidTimeoutSeconds {
            path: FieldPath::root().field("settings").field("timeout_seconds"),
            value: doc.settings.timeout_seconds,
        });
    }

    let mut seen_ids: HashSet<&str> = HashSet::new();
    let mut duplicate_ids: HashSet<&str> = HashSet::new();
    for (i, step) in doc.steps.iter().enumerate() {
        let path = steps_path.index(i);
        if step.id.is_empty() {
            errors.push(ValidationError::EmptyId { path: path.clone() });
            continue;
        }
        if !rules::is_valid_id(&step.id) {
            errors.push(ValidationError::InvalidId {
                path: path.clone(),
                id: step.id.clone(),
            });
        }
        if !seen_ids.insert(step.id.as_str()) {
            duplicate_ids.insert(step.id.as_str());
            errors.push(ValidationError::DuplicateId {
                path: path.clone(),
                id: step.id.clone(),
            });
        }
        if let Some(verify_timeout) = step.verify_timeout_seconds {
            if !rules::is_valid_verify_timeout_seconds(verify_timeout) {
                errors.push(ValidationError::InvalidVerifyTimeoutSeconds {
                    path: path.field("verify_timeout_seconds"),
                    value: verify_timeout,
                });
            }
        }
    }

    let known_ids: HashSet<&str> = doc.steps.iter().map(|s| s.id.as_str()).collect();
    for (i, step) in doc.steps.iter().enumerate() {
        let path = steps_path.index(i).field("depends_on");
        for (j, dep) in step.depends_on.iter().enumerate() {
            if dep == &step.id {
                errors.push(ValidationError::SelfDependency {
                    path: path.index(j),
                    step: step.id.clone(),
                });
            } else if !known_ids.contains(dep.as_str()) {
                errors.push(ValidationError::UnknownDependency {
                    path: path.index(j),
                    step: step.id.clone(),
                    dep: dep.clone(),
                });
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let enabled: Vec<_> = doc.enabled_steps().collect();
    if let Some(cycle) = find_cycle(&enabled) {
        return Err(vec![ValidationError::Cycle { cycle }]);
    }

    for (i, step) in doc.steps.iter().enumerate() {
        if duplicate_ids.contains(step.id.as_str()) || !step.enabled {
            continue;
        }
        let path = steps_path.index(i);

        if !registry.contains(step.kind) {
            errors.push(ValidationError::PluginNotFound {
                path,
                step: step.id.clone(),
                kind: step.kind,
            });
            continue;
        }

        let plugin = registry.get(step.kind).expect("checked contains above");
        if let Err(e) = plugin.validate_payload(step) {
            errors.push(ValidationError::InvalidPayload {
                path,
                step: step.id.clone(),
                message: e.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
