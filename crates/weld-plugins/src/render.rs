use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Replaces `{{var}}` with `vars["var"]`. Deliberately tiny so template
/// behavior stays predictable and auditable from the document alone.
///
/// When `allow_missing` is true, a placeholder with no matching var is left
/// in the output verbatim instead of failing the render.
pub fn render_template(input: &str, vars: &BTreeMap<String, String>, allow_missing: bool) -> Result<String, String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| Regex::new(r"\{\{\s*([a-zA-Z0-9_\-\.]+)\s*\}\}").unwrap());

    let mut out = String::with_capacity(input.len());
    let mut last = 0usize;
    for cap in re.captures_iter(input) {
        let m = cap.get(0).unwrap();
        let key = cap.get(1).unwrap().as_str();
        out.push_str(&input[last..m.start()]);
        match vars.get(key) {
            Some(v) => out.push_str(v),
            None if allow_missing => out.push_str(m.as_str()),
            None => return Err(format!("missing template var: `{key}`")),
        }
        last = m.end();
    }
    out.push_str(&input[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_vars() {
        let mut vars = BTreeMap::new();
        vars.insert("name".into(), "Mike".into());
        assert_eq!(render_template("hi {{name}}", &vars, false).unwrap(), "hi Mike");
    }

    #[test]
    fn missing_var_errors() {
        let vars = BTreeMap::new();
        let err = render_template("hi {{who}}", &vars, false).unwrap_err();
        assert!(err.contains("missing template var"));
    }

    #[test]
    fn missing_var_left_verbatim_when_allowed() {
        let vars = BTreeMap::new();
        assert_eq!(render_template("hi {{who}}", &vars, true).unwrap(), "hi {{who}}");
    }
}
