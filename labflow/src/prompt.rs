//! Request/response prompting
//!
//! The collector only talks to a [`Prompter`]. [`ConsolePrompter`] reads lines
//! from any `BufRead` (stdin in the binary, a byte slice in tests).
//! [`PresetPrompter`] answers from a YAML answers file first.

use std::collections::{BTreeMap, HashSet};
use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::error::CollectionError;

pub trait Prompter {
    /// Ask one question. `None` means the input is exhausted.
    ///
    /// `key` is the dotted answer path (`parameters.cut_sets.0.cutline_axis`).
    fn ask(&mut self, key: &str, prompt: &str) -> io::Result<Option<String>>;

    /// Yes/no question. `None` means the input is exhausted.
    fn confirm(&mut self, key: &str, prompt: &str) -> io::Result<Option<bool>>;

    fn notify(&mut self, message: &str) -> io::Result<()>;
}

impl<P: Prompter + ?Sized> Prompter for &mut P {
    fn ask(&mut self, key: &str, prompt: &str) -> io::Result<Option<String>> {
        (**self).ask(key, prompt)
    }

    fn confirm(&mut self, key: &str, prompt: &str) -> io::Result<Option<bool>> {
        (**self).confirm(key, prompt)
    }

    fn notify(&mut self, message: &str) -> io::Result<()> {
        (**self).notify(message)
    }
}

impl<P: Prompter + ?Sized> Prompter for Box<P> {
    fn ask(&mut self, key: &str, prompt: &str) -> io::Result<Option<String>> {
        (**self).ask(key, prompt)
    }

    fn confirm(&mut self, key: &str, prompt: &str) -> io::Result<Option<bool>> {
        (**self).confirm(key, prompt)
    }

    fn notify(&mut self, message: &str) -> io::Result<()> {
        (**self).notify(message)
    }
}

/// Accepts yes/y/true/1 and no/n/false/0, any case
pub fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Some(true),
        "no" | "n" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Line-oriented prompter over a reader/writer pair
pub struct ConsolePrompter<R, W> {
    input: R,
    output: W,
}

impl ConsolePrompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Prompter for ConsolePrompter<R, W> {
    fn ask(&mut self, _key: &str, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}: ", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
    }

    fn confirm(&mut self, key: &str, prompt: &str) -> io::Result<Option<bool>> {
        let prompt = format!("{} (yes/no)", prompt);
        loop {
            let answer = match self.ask(key, &prompt)? {
                Some(answer) => answer,
                None => return Ok(None),
            };
            match parse_yes_no(&answer) {
                Some(choice) => return Ok(Some(choice)),
                None => writeln!(self.output, "Invalid input. Please enter 'yes' or 'no'.")?,
            }
        }
    }

    fn notify(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{}", message)
    }
}

/// Answers questions from a preset map, then falls back to `inner`
///
/// Each preset answer is used at most once, so a rejected preset value is
/// asked again through the inner prompter.
pub struct PresetPrompter<P> {
    answers: BTreeMap<String, String>,
    used: HashSet<String>,
    inner: P,
}

impl<P: Prompter> PresetPrompter<P> {
    pub fn new(answers: BTreeMap<String, String>, inner: P) -> Self {
        Self {
            answers,
            used: HashSet::new(),
            inner,
        }
    }

    pub fn from_yaml(yaml: &str, inner: P) -> Result<Self, serde_yaml::Error> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        let mut answers = BTreeMap::new();
        flatten(&value, "", &mut answers);
        Ok(Self::new(answers, inner))
    }

    pub fn from_file(path: &Path, inner: P) -> Result<Self, CollectionError> {
        let content = std::fs::read_to_string(path).map_err(|e| CollectionError::Answers {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_yaml(&content, inner).map_err(|e| CollectionError::Answers {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Preset keys that no question asked for (usually typos)
    pub fn unused_keys(&self) -> Vec<&str> {
        self.answers
            .keys()
            .filter(|k| !self.used.contains(*k))
            .map(String::as_str)
            .collect()
    }

    fn has_prefix(&self, prefix: &str) -> bool {
        let prefix = format!("{}.", prefix);
        self.answers.keys().any(|k| k.starts_with(&prefix))
    }
}

impl<P: Prompter> Prompter for PresetPrompter<P> {
    fn ask(&mut self, key: &str, prompt: &str) -> io::Result<Option<String>> {
        if !self.used.contains(key) {
            if let Some(answer) = self.answers.get(key).cloned() {
                self.used.insert(key.to_string());
                self.inner.notify(&format!("{}: {}", prompt, answer))?;
                return Ok(Some(answer));
            }
        }
        self.inner.ask(key, prompt)
    }

    /// Confirmations are keyed `<group>.<next index>`; the answer is yes when
    /// the preset has entries for that index.
    fn confirm(&mut self, key: &str, prompt: &str) -> io::Result<Option<bool>> {
        let confirm_key = format!("{}?", key);
        if let Some((group, _)) = key.rsplit_once('.') {
            if self.has_prefix(group) && !self.used.contains(&confirm_key) {
                let choice = self.has_prefix(key);
                self.used.insert(confirm_key);
                let shown = if choice { "yes" } else { "no" };
                self.inner.notify(&format!("{} (yes/no): {}", prompt, shown))?;
                return Ok(Some(choice));
            }
        }
        self.inner.confirm(key, prompt)
    }

    fn notify(&mut self, message: &str) -> io::Result<()> {
        self.inner.notify(message)
    }
}

/// Flattens nested YAML into dotted keys. Lists of scalars become one
/// comma-separated answer; lists of mappings are indexed.
fn flatten(value: &serde_yaml::Value, prefix: &str, out: &mut BTreeMap<String, String>) {
    use serde_yaml::Value as Yaml;

    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", prefix, key)
        }
    };

    match value {
        Yaml::Mapping(map) => {
            for (k, v) in map {
                if let Some(key) = scalar_text(k) {
                    flatten(v, &join(&key), out);
                }
            }
        }
        Yaml::Sequence(items) => {
            let scalars: Option<Vec<String>> = items.iter().map(scalar_text).collect();
            match scalars {
                Some(scalars) => {
                    out.insert(prefix.to_string(), scalars.join(", "));
                }
                None => {
                    for (i, item) in items.iter().enumerate() {
                        flatten(item, &join(&i.to_string()), out);
                    }
                }
            }
        }
        Yaml::Tagged(tagged) => flatten(&tagged.value, prefix, out),
        Yaml::Null => {}
        scalar => {
            if let Some(text) = scalar_text(scalar) {
                out.insert(prefix.to_string(), text);
            }
        }
    }
}

fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(true) => Some("yes".to_string()),
        serde_yaml::Value::Bool(false) => Some("no".to_string()),
        _ => None,
    }
}
