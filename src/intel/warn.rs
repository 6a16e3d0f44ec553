pub struct WarnEvent<'a> {
    pub code: &'a str,
    pub stage: &'a str,
    pub action: &'a str,
    pub version: Option<u64>,
    pub path: &'a str,
    pub retry: &'a str,
    pub reason: &'a str,
    pub err: &'a str,
}

fn sanitize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_ascii_whitespace() {
            if !out.is_empty() && !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else if ch.is_ascii_graphic() {
            out.push(ch);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn format_line(event: &WarnEvent<'_>) -> String {
    let version = event
        .version
        .map(|v| v.to_string())
        .unwrap_or_else(|| "na".to_string());
    format!(
        "INTEL_WARN code={} stage={} action={} version={} path={} retry={} reason={} err={}",
        sanitize_value(event.code),
        sanitize_value(event.stage),
        sanitize_value(event.action),
        version,
        sanitize_value(event.path),
        sanitize_value(event.retry),
        sanitize_value(event.reason),
        sanitize_value(event.err),
    )
}

pub fn emit(event: WarnEvent<'_>) {
    eprintln!("{}", format_line(&event));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_value_rewrites_whitespace() {
        assert_eq!(sanitize_value("a b\tc"), "a_b_c");
    }

    #[test]
    fn sanitize_value_falls_back_for_empty() {
        assert_eq!(sanitize_value("   "), "na");
    }

    #[test]
    fn format_line_keeps_one_token_per_field() {
        let line = format_line(&WarnEvent {
            code: "E007_METRIC_MALFORMED",
            stage: "trends",
            action: "extract-metrics",
            version: Some(3),
            path: "/tmp/intelligence_report_v3.txt",
            retry: "none",
            reason: "metric-line-malformed",
            err: "invalid float literal",
        });
        assert!(line.starts_with("INTEL_WARN code=E007_METRIC_MALFORMED "));
        assert!(line.contains(" version=3 "));
        assert!(line.ends_with("err=invalid_float_literal"));
    }
}
