//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Strip a markdown ```json ... ``` wrapper that models sometimes put around JSON mode output.
pub fn strip_json_fence(text: &str) -> &str {
  let t = text.trim();
  let Some(rest) = t.strip_prefix("```") else { return t };
  let rest = rest.strip_prefix("json").unwrap_or(rest);
  rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Log-safe truncation for large strings (char-boundary safe).
pub fn trunc_for_log(s: &str, max_chars: usize) -> String {
  let count = s.chars().count();
  if count <= max_chars {
    s.to_string()
  } else {
    format!("{}… ({} chars total)", s.chars().take(max_chars).collect::<String>(), count)
  }
}
