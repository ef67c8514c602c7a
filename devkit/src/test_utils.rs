/*!
Harness for asserting on Prometheus text exposition

Parses the body of a scrape into samples and offers assertions that
return errors with enough context to debug a failing test.
*/

use anyhow::Result;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

#[derive(Debug, Default)]
pub struct ExpositionHarness {
    samples: Vec<Sample>,
    types: HashMap<String, String>,
}

impl ExpositionHarness {
    pub fn parse(text: &str) -> Self {
        env_logger::try_init().ok();

        let mut harness = Self::default();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(decl) = line.strip_prefix("# TYPE ") {
                let mut parts = decl.split_whitespace();
                if let (Some(name), Some(kind)) = (parts.next(), parts.next()) {
                    harness.types.insert(name.to_string(), kind.to_string());
                }
            } else if line.starts_with('#') {
                continue;
            } else if let Some(sample) = parse_sample(line) {
                harness.samples.push(sample);
            } else {
                log::warn!("Unparsable exposition line: {}", line);
            }
        }
        log::debug!("Parsed {} samples", harness.samples.len());
        harness
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn samples_named(&self, name: &str) -> Vec<&Sample> {
        self.samples.iter().filter(|s| s.name == name).collect()
    }

    /// Value of the first sample named `name` carrying all of `labels`.
    pub fn value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.samples
            .iter()
            .find(|s| {
                s.name == name
                    && labels
                        .iter()
                        .all(|(k, v)| s.labels.get(*k).map(String::as_str) == Some(*v))
            })
            .map(|s| s.value)
    }

    pub fn assert_value(&self, name: &str, labels: &[(&str, &str)], expected: f64) -> Result<()> {
        match self.value(name, labels) {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => anyhow::bail!(
                "Sample {}{:?} mismatch: expected {}, got {}",
                name, labels, expected, actual
            ),
            None => anyhow::bail!("Sample {}{:?} not found", name, labels),
        }
    }

    pub fn assert_type(&self, name: &str, kind: &str) -> Result<()> {
        match self.types.get(name) {
            Some(actual) if actual == kind => Ok(()),
            Some(actual) => anyhow::bail!("Type of {} is {}, expected {}", name, actual, kind),
            None => anyhow::bail!("No TYPE declaration for {}", name),
        }
    }

    pub fn assert_absent(&self, name: &str) -> Result<()> {
        let found = self.samples_named(name).len();
        if found > 0 {
            anyhow::bail!("Expected no samples for {}, found {}", name, found);
        }
        Ok(())
    }
}

fn parse_sample(line: &str) -> Option<Sample> {
    let split = line.find(|c| c == '{' || c == ' ')?;
    let name = line[..split].to_string();
    let (labels, rest) = match line[split..].strip_prefix('{') {
        Some(body) => parse_labels(body)?,
        None => (BTreeMap::new(), &line[split..]),
    };
    let value = rest.split_whitespace().next()?.parse().ok()?;
    Some(Sample { name, labels, value })
}

/// Parses `k="v",...}` and returns the labels plus what follows the brace.
fn parse_labels(body: &str) -> Option<(BTreeMap<String, String>, &str)> {
    let mut labels = BTreeMap::new();
    let mut chars = body.char_indices().peekable();

    loop {
        while let Some(&(_, ',' | ' ')) = chars.peek() {
            chars.next();
        }
        let (i, first) = chars.next()?;
        if first == '}' {
            return Some((labels, &body[i + 1..]));
        }

        let mut key = String::from(first);
        loop {
            match chars.next()?.1 {
                '=' => break,
                c => key.push(c),
            }
        }
        if chars.next()?.1 != '"' {
            return None;
        }

        let mut value = String::new();
        loop {
            match chars.next()?.1 {
                '"' => break,
                '\\' => match chars.next()?.1 {
                    'n' => value.push('\n'),
                    escaped => value.push(escaped),
                },
                c => value.push(c),
            }
        }
        labels.insert(key, value);
    }
}
