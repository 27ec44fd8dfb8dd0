use arrow::datatypes::DataType;

/// 1) Collapse internal whitespace runs + trim, the way browsers render cell text.
pub fn clean_str(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 2) Infer the Arrow dtype for a whole column of cleaned strings.
///    Empty cells count as missing and do not vote.
pub fn infer_column_dtype<'a, I>(values: I) -> DataType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = false;
    let mut all_int = true;
    let mut all_float = true;
    for v in values.into_iter().filter(|v| !is_missing(v)) {
        seen = true;
        if all_int && v.parse::<i64>().is_err() {
            all_int = false;
        }
        if v.parse::<f64>().is_err() {
            all_float = false;
            break;
        }
    }
    match (seen, all_int, all_float) {
        (false, _, _) => DataType::Utf8,
        (true, true, _) => DataType::Int64,
        (true, false, true) => DataType::Float64,
        _ => DataType::Utf8,
    }
}

/// Cells that stand for "no value" in rendered reports.
pub fn is_missing(s: &str) -> bool {
    matches!(s.trim(), "" | "NaN" | "nan" | "None" | "-")
}

/// Render a humidity reading as `"<value>%"`, always with a fractional digit.
pub fn format_percent(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}%", value)
    } else {
        format!("{}%", value)
    }
}
