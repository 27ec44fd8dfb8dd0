use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, warn};

static HEADING: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h3").expect("CSS selector for headings should be valid"));
static PERCENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(\.\d+)?)%").expect("percent pattern should compile"));

/// First `NN[.N]%` found in an `<h3>` of the report, as a number.
pub fn extract_humidity(document: &Html, display_name: &str) -> Option<f64> {
    for heading in document.select(&HEADING) {
        let text = heading.text().collect::<String>();
        let Some(caps) = PERCENT.captures(&text) else {
            continue;
        };
        match caps[1].parse::<f64>() {
            Ok(v) => {
                debug!(file = %display_name, humidity = v, "found humidity");
                return Some(v);
            }
            Err(e) => {
                warn!(file = %display_name, "error reading humidity {:?}: {}", &caps[1], e);
                return None;
            }
        }
    }
    None
}
