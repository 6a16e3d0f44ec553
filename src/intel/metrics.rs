use crate::error::{MetricField, MetricParseError};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSample {
    pub computational_time_secs: f64,
    pub best_objective: i64,
    pub total_solutions: u64,
}

#[derive(Default)]
struct Partial {
    time: Option<f64>,
    objective: Option<i64>,
    solutions: Option<u64>,
}

fn field_for(line: &str) -> Option<MetricField> {
    if line.contains(MetricField::ComputationalTime.label()) {
        Some(MetricField::ComputationalTime)
    } else if line.contains(MetricField::BestObjective.label()) {
        Some(MetricField::BestObjective)
    } else if line.contains(MetricField::TotalSolutions.label()) {
        Some(MetricField::TotalSolutions)
    } else {
        None
    }
}

/// Scan report lines for the three solver metrics.
///
/// Returns `Ok(None)` unless all three are present. Later occurrences of a
/// metric win. A matching line whose value does not parse is an error naming
/// that line.
pub fn extract_metrics<S: AsRef<str>>(
    lines: &[S],
) -> Result<Option<MetricSample>, MetricParseError> {
    let mut found = Partial::default();

    for (idx, raw) in lines.iter().enumerate() {
        let line = raw.as_ref();
        let Some(field) = field_for(line) else {
            continue;
        };
        let fail = |reason: String| MetricParseError {
            line_number: idx + 1,
            line: line.to_string(),
            field,
            reason,
        };

        let Some((_, value)) = line.split_once(':') else {
            return Err(fail("missing ':' delimiter".to_string()));
        };
        match field {
            MetricField::ComputationalTime => {
                // "12.5s", "12.5 s (wall clock)": the number ends at the unit.
                let number = value.split('s').next().unwrap_or_default().trim();
                let secs = number
                    .parse::<f64>()
                    .map_err(|err| fail(err.to_string()))?;
                if !secs.is_finite() {
                    return Err(fail("time is not a finite number".to_string()));
                }
                found.time = Some(secs);
            }
            MetricField::BestObjective => {
                let objective = value
                    .trim()
                    .parse::<i64>()
                    .map_err(|err| fail(err.to_string()))?;
                found.objective = Some(objective);
            }
            MetricField::TotalSolutions => {
                let solutions = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|err| fail(err.to_string()))?;
                found.solutions = Some(solutions);
            }
        }
    }

    Ok(match found {
        Partial {
            time: Some(computational_time_secs),
            objective: Some(best_objective),
            solutions: Some(total_solutions),
        } => Some(MetricSample {
            computational_time_secs,
            best_objective,
            total_solutions,
        }),
        _ => None,
    })
}

pub fn extract_from_text(text: &str) -> Result<Option<MetricSample>, MetricParseError> {
    let lines: Vec<&str> = text.lines().collect();
    extract_metrics(&lines)
}
