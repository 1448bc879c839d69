//! Fuzz-value generation rules, one per variable type (spec §4.3).

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::Rng;
use runbook_core::schema::{Variable, VariableType};

const ALNUM: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SPECIAL: &[u8] = b"!@#$%^&*()-_=+";
const WORDS: &[&str] = &[
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india", "juliet",
    "kilo", "lima", "mike", "november", "oscar", "papa", "quebec", "romeo", "sierra", "tango",
];

fn param_u64(params: &HashMap<String, serde_yaml::Value>, key: &str) -> Option<u64> {
    params.get(key).and_then(|v| v.as_u64())
}

fn param_f64(params: &HashMap<String, serde_yaml::Value>, key: &str) -> Option<f64> {
    params.get(key).and_then(|v| v.as_f64())
}

fn param_str<'a>(params: &'a HashMap<String, serde_yaml::Value>, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

fn param_bool(params: &HashMap<String, serde_yaml::Value>, key: &str) -> bool {
    params.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

fn random_ascii(rng: &mut StdRng, len: usize, include_spaces: bool, include_special: bool) -> String {
    let mut alphabet = ALNUM.to_vec();
    if include_special {
        alphabet.extend_from_slice(SPECIAL);
    }
    if include_spaces {
        alphabet.push(b' ');
    }
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..alphabet.len());
            alphabet[idx] as char
        })
        .collect()
}

/// `length` wins over `minLength`/`maxLength` (spec §4.3 "string").
fn gen_string(rng: &mut StdRng, params: &HashMap<String, serde_yaml::Value>) -> String {
    let len = if let Some(length) = param_u64(params, "length") {
        length as usize
    } else {
        let min = param_u64(params, "minLength").unwrap_or(4) as usize;
        let max = param_u64(params, "maxLength").unwrap_or(12).max(min) as usize;
        rng.random_range(min..=max)
    };
    let prefix = param_str(params, "prefix").unwrap_or("");
    let suffix = param_str(params, "suffix").unwrap_or("");
    let body = random_ascii(
        rng,
        len,
        param_bool(params, "includeSpaces"),
        param_bool(params, "includeSpecialChars"),
    );
    format!("{prefix}{body}{suffix}")
}

fn gen_int(rng: &mut StdRng, params: &HashMap<String, serde_yaml::Value>) -> i64 {
    let min = param_f64(params, "min").unwrap_or(0.0) as i64;
    let max = param_f64(params, "max").unwrap_or(i32::MAX as f64) as i64;
    if min >= max {
        return min;
    }
    rng.random_range(min..=max)
}

fn gen_float(rng: &mut StdRng, params: &HashMap<String, serde_yaml::Value>) -> f64 {
    let min = param_f64(params, "min").unwrap_or(0.0);
    let max = param_f64(params, "max").unwrap_or(i32::MAX as f64);
    if min >= max {
        return min;
    }
    rng.random_range(min..max)
}

fn gen_bool(rng: &mut StdRng) -> bool {
    rng.random_bool(0.5)
}

fn gen_enum(rng: &mut StdRng, options: &[String]) -> String {
    let idx = rng.random_range(0..options.len());
    options[idx].clone()
}

fn gen_email(rng: &mut StdRng, params: &HashMap<String, serde_yaml::Value>) -> String {
    let domain = param_str(params, "domain").unwrap_or("example.com");
    let local = random_ascii(rng, 8, false, false).to_lowercase();
    format!("{local}@{domain}")
}

fn gen_url(rng: &mut StdRng, params: &HashMap<String, serde_yaml::Value>) -> String {
    let domain = param_str(params, "domain").unwrap_or("example.com");
    let path = random_ascii(rng, 6, false, false).to_lowercase();
    format!("https://{domain}/{path}")
}

fn gen_uuid(rng: &mut StdRng) -> String {
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);
    uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
}

/// Whole-day offsets within `[minDate, maxDate]`, default 2000-01-01 to
/// 2030-12-31 (spec §4.3 leaves the default range unspecified).
fn gen_date(rng: &mut StdRng, params: &HashMap<String, serde_yaml::Value>) -> String {
    const DEFAULT_MIN_DAYS: i64 = 10_957; // 2000-01-01 (days since epoch)
    const DEFAULT_MAX_DAYS: i64 = 22_280; // 2030-12-31
    let min = param_u64(params, "minDate").map(|v| v as i64).unwrap_or(DEFAULT_MIN_DAYS);
    let max = param_u64(params, "maxDate").map(|v| v as i64).unwrap_or(DEFAULT_MAX_DAYS).max(min);
    let day = rng.random_range(min..=max);
    let secs = day * 86_400;
    format_epoch_date(secs, param_str(params, "format"))
}

fn gen_timestamp(rng: &mut StdRng, params: &HashMap<String, serde_yaml::Value>) -> String {
    const DEFAULT_MIN: i64 = 946_684_800; // 2000-01-01T00:00:00Z
    const DEFAULT_MAX: i64 = 1_924_992_000; // 2031-01-01T00:00:00Z
    let min = param_u64(params, "minDate").map(|v| v as i64).unwrap_or(DEFAULT_MIN);
    let max = param_u64(params, "maxDate").map(|v| v as i64).unwrap_or(DEFAULT_MAX).max(min);
    let secs = rng.random_range(min..=max);
    format_epoch_date(secs, param_str(params, "format"))
}

/// Minimal proleptic-Gregorian formatter so dates/timestamps don't need a
/// dedicated date/time crate in the dependency stack.
fn format_epoch_date(epoch_secs: i64, format: Option<&str>) -> String {
    let days = epoch_secs.div_euclid(86_400);
    let remaining = epoch_secs.rem_euclid(86_400);
    let (year, month, day) = civil_from_days(days);
    match format {
        Some("date") | None => format!("{year:04}-{month:02}-{day:02}"),
        Some(_) => {
            let hour = remaining / 3600;
            let minute = (remaining % 3600) / 60;
            let second = remaining % 60;
            format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z")
        }
    }
}

/// Howard Hinnant's `civil_from_days` algorithm (days since 1970-01-01 ->
/// proleptic Gregorian y/m/d), used because `gen_date`/`gen_timestamp` need
/// no more than calendar math.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

fn gen_words(rng: &mut StdRng, params: &HashMap<String, serde_yaml::Value>) -> String {
    let count = if let Some(count) = param_u64(params, "wordCount") {
        count as usize
    } else {
        let min = param_u64(params, "minWordCount").unwrap_or(2) as usize;
        let max = param_u64(params, "maxWordCount").unwrap_or(5).max(min) as usize;
        rng.random_range(min..=max)
    };
    (0..count)
        .map(|_| WORDS[rng.random_range(0..WORDS.len())])
        .collect::<Vec<_>>()
        .join(" ")
}

fn gen_list(rng: &mut StdRng, params: &HashMap<String, serde_yaml::Value>) -> String {
    let count = if let Some(count) = param_u64(params, "count") {
        count as usize
    } else {
        let min = param_u64(params, "minCount").unwrap_or(1) as usize;
        let max = param_u64(params, "maxCount").unwrap_or(3).max(min) as usize;
        rng.random_range(min..=max)
    };
    let items: Vec<String> = (0..count).map(|_| random_ascii(rng, 6, false, false)).collect();
    serde_json::to_string(&items).expect("string vec always serializes")
}

fn gen_map(rng: &mut StdRng, variable: &Variable, params: &HashMap<String, serde_yaml::Value>) -> String {
    let keys: Vec<String> = params
        .get("schema")
        .or_else(|| variable.fuzz.get("schema"))
        .and_then(|v| v.as_sequence())
        .map(|seq| {
            seq.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let mut object = serde_json::Map::new();
    for key in keys {
        object.insert(key, serde_json::Value::String(random_ascii(rng, 8, false, false)));
    }
    serde_json::to_string(&object).expect("string map always serializes")
}

/// Generate a concrete fuzz value for `variable` using the test plan's
/// `fuzz:` parameters (spec §4.3).
pub fn generate(
    rng: &mut StdRng,
    variable: &Variable,
    params: &HashMap<String, serde_yaml::Value>,
) -> serde_yaml::Value {
    match variable.var_type {
        VariableType::String => serde_yaml::Value::String(gen_string(rng, params)),
        VariableType::Int => serde_yaml::Value::from(gen_int(rng, params)),
        VariableType::Float => serde_yaml::Value::from(gen_float(rng, params)),
        VariableType::Bool => serde_yaml::Value::from(gen_bool(rng)),
        VariableType::Enum => serde_yaml::Value::String(gen_enum(rng, &variable.options)),
        VariableType::Email => serde_yaml::Value::String(gen_email(rng, params)),
        VariableType::Url => serde_yaml::Value::String(gen_url(rng, params)),
        VariableType::Uuid => serde_yaml::Value::String(gen_uuid(rng)),
        VariableType::Date => serde_yaml::Value::String(gen_date(rng, params)),
        VariableType::Timestamp => serde_yaml::Value::String(gen_timestamp(rng, params)),
        VariableType::Words => serde_yaml::Value::String(gen_words(rng, params)),
        VariableType::List => serde_yaml::Value::String(gen_list(rng, params)),
        VariableType::Map => serde_yaml::Value::String(gen_map(rng, variable, params)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::rng_for;
    use runbook_core::schema::Validations;

    fn variable(var_type: VariableType, options: &[&str]) -> Variable {
        Variable {
            name: "v".to_string(),
            var_type,
            description: None,
            default: None,
            options: options.iter().map(|s| s.to_string()).collect(),
            validations: Validations::default(),
            fuzz: HashMap::new(),
        }
    }

    #[test]
    fn same_seed_produces_same_string() {
        let params = HashMap::new();
        let mut a = rng_for("case", "cfg.name");
        let mut b = rng_for("case", "cfg.name");
        let v = variable(VariableType::String, &[]);
        assert_eq!(generate(&mut a, &v, &params), generate(&mut b, &v, &params));
    }

    #[test]
    fn enum_choice_is_one_of_the_options() {
        let v = variable(VariableType::Enum, &["dev", "staging", "prod"]);
        let mut rng = rng_for("case", "cfg.env");
        let value = generate(&mut rng, &v, &HashMap::new());
        let value = value.as_str().unwrap().to_string();
        assert!(["dev", "staging", "prod"].contains(&value.as_str()));
    }

    #[test]
    fn string_length_param_is_honored() {
        let mut params = HashMap::new();
        params.insert("length".to_string(), serde_yaml::Value::from(16));
        let v = variable(VariableType::String, &[]);
        let mut rng = rng_for("case", "cfg.token");
        let value = generate(&mut rng, &v, &params);
        assert_eq!(value.as_str().unwrap().len(), 16);
    }

    #[test]
    fn list_is_valid_json() {
        let v = variable(VariableType::List, &[]);
        let mut rng = rng_for("case", "cfg.items");
        let value = generate(&mut rng, &v, &HashMap::new());
        let parsed: Vec<String> = serde_json::from_str(value.as_str().unwrap()).unwrap();
        assert!(!parsed.is_empty());
    }

    #[test]
    fn date_formats_as_iso() {
        let v = variable(VariableType::Date, &[]);
        let mut rng = rng_for("case", "cfg.day");
        let value = generate(&mut rng, &v, &HashMap::new());
        let text = value.as_str().unwrap();
        assert_eq!(text.len(), 10);
        assert_eq!(&text[4..5], "-");
    }
}
