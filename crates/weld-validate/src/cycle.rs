use std::collections::HashMap;

use weld_model::Step;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Detect a dependency cycle among enabled steps and return one offending
/// path if found, as a list of step ids from the cycle's entry point back
/// to itself.
///
/// Walks depends_on edges with an explicit stack rather than recursion, so
/// a document with a very long dependency chain can't blow the call stack.
pub fn find_cycle(steps: &[&Step]) -> Option<Vec<String>> {
    let mut color: HashMap<&str, Color> = steps.iter().map(|s| (s.id.as_str(), Color::White)).collect();
    let by_id: HashMap<&str, &Step> = steps.iter().map(|s| (s.id.as_str(), *s)).collect();

    for step in steps {
        if color.get(step.id.as_str()) == Some(&Color::White) {
            if let Some(cycle) = dfs(&step.id, &by_id, &mut color) {
                return Some(cycle);
            }
        }
    }
    None
}

fn dfs<'a>(
    start: &'a str,
    by_id: &HashMap<&'a str, &'a Step>,
    color: &mut HashMap<&'a str, Color>,
) -> Option<Vec<String>> {
    // (node, next dependency index to visit)
    let mut stack: Vec<(&str, usize)> = vec![(start, 0)];
    color.insert(start, Color::Gray);

    while let Some(&mut (node, ref mut idx)) = stack.last_mut() {
        let Some(step) = by_id.get(node) else {
            color.insert(node, Color::Black);
            stack.pop();
            continue;
        };

        if *idx < step.depends_on.len() {
            let dep = step.depends_on[*idx].as_str();
            *idx += 1;

            match color.get(dep).copied() {
                Some(Color::White) => {
                    color.insert(dep, Color::Gray);
                    stack.push((dep, 0));
                }
                Some(Color::Gray) => {
                    // Back edge: unwind the stack to build the cycle path.
                    let mut cycle: Vec<String> = stack.iter().map(|(n, _)| n.to_string()).collect();
                    if let Some(pos) = cycle.iter().position(|n| n == dep) {
                        cycle = cycle.split_off(pos);
                    }
                    cycle.push(dep.to_string());
                    return Some(cycle);
                }
                Some(Color::Black) | None => {}
            }
        } else {
            color.insert(node, Color::Black);
            stack.pop();
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use weld_model::StepKind;

    fn step(id: &str, deps: &[&str]) -> Step {
        Step {
            id: id.to_string(),
            kind: StepKind::Command,
            name: None,
            depends_on: deps.iter().map(|s| s.to_string()).collect(),
            enabled: true,
            verify_timeout_seconds: None,
            payload: json!({}),
        }
    }

    #[test]
    fn no_cycle_in_linear_chain() {
        let a = step("a", &[]);
        let b = step("b", &["a"]);
        let c = step("c", &["b"]);
        let steps = vec![&a, &b, &c];
        assert!(find_cycle(&steps).is_none());
    }

    #[test]
    fn detects_direct_cycle() {
        let a = step("a", &["b"]);
        let b = step("b", &["a"]);
        let steps = vec![&a, &b];
        assert!(find_cycle(&steps).is_some());
    }

    #[test]
    fn detects_self_dependency_as_cycle() {
        let a = step("a", &["a"]);
        let steps = vec![&a];
        assert!(find_cycle(&steps).is_some());
    }

    #[test]
    fn detects_longer_cycle() {
        let a = step("a", &["c"]);
        let b = step("b", &["a"]);
        let c = step("c", &["b"]);
        let steps = vec![&a, &b, &c];
        assert!(find_cycle(&steps).is_some());
    }

    #[test]
    fn diamond_shape_has_no_cycle() {
        let a = step("a", &[]);
        let b = step("b", &["a"]);
        let c = step("c", &["a"]);
        let d = step("d", &["b", "c"]);
        let steps = vec![&a, &b, &c, &d];
        assert!(find_cycle(&steps).is_none());
    }
}
