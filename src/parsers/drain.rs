// logcore - parsers/drain.rs
//
// Online template mining (Drain): a depth-limited prefix tree over
// whitespace-tokenized lines, with a token-wise similarity match against
// the leaf templates of the matching length group. No reference
// implementation exists in this crate's lineage; built from the
// algorithmic contract alone.

use super::LogRecord;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

pub const WILDCARD: &str = "<*>";

fn numeric_like() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?[0-9][0-9A-Za-z.:_/-]*[0-9A-Za-z]$|^[+-]?[0-9]$").unwrap())
}

/// A token is wildcard-eligible if it parses as a number, or is a mix of
/// digits and non-alphabetic separators (IP addresses, timestamps, hex
/// literals with a leading digit).
fn is_variable_token(token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    if token.parse::<f64>().is_ok() {
        return true;
    }
    let first = token.chars().next().unwrap();
    if !first.is_ascii_digit() {
        return false;
    }
    numeric_like().is_match(token)
}

fn tokenize(line: &str) -> Vec<String> {
    line.split(|c: char| c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| {
            if is_variable_token(t) {
                WILDCARD.to_string()
            } else {
                t.to_string()
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
struct TemplateGroup {
    id: u64,
    tokens: Vec<String>,
    count: u64,
}

#[derive(Debug, Default)]
struct PrefixNode {
    children: HashMap<String, PrefixNode>,
    wildcard_child: Option<Box<PrefixNode>>,
    groups: Vec<TemplateGroup>,
}

#[derive(Debug)]
pub struct DrainMiner {
    depth: usize,
    similarity_threshold: f64,
    max_children: usize,
    next_id: std::sync::atomic::AtomicU64,
    length_groups: std::sync::Mutex<HashMap<usize, PrefixNode>>,
}

impl Default for DrainMiner {
    fn default() -> Self {
        Self::new(4, 0.5, 100)
    }
}

impl DrainMiner {
    pub fn new(depth: usize, similarity_threshold: f64, max_children: usize) -> Self {
        Self {
            depth: depth.max(1),
            similarity_threshold,
            max_children: max_children.max(1),
            next_id: std::sync::atomic::AtomicU64::new(1),
            length_groups: std::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn parse(&self, line: &str) -> LogRecord {
        let mut record = LogRecord::default();
        record.body = line.to_string();
        record.message = line.to_string();

        let tokens = tokenize(line);
        if tokens.is_empty() {
            record.template_str = String::new();
            return record.apply_defaults();
        }

        let (template_id, template_tokens) = self.add_log_message(&tokens);
        record.template_str = template_tokens.join(" ");
        record.set_field("template_id", template_id.to_string());
        record.apply_defaults()
    }

    pub fn validate(&self, line: &str) -> bool {
        !line.trim().is_empty()
    }

    /// Returns the matched or newly created template's id and tokens.
    fn add_log_message(&self, tokens: &[String]) -> (u64, Vec<String>) {
        let length = tokens.len();
        let mut length_groups = self.length_groups.lock().unwrap();
        let root = length_groups.entry(length).or_default();

        let mut node = root;
        for token in tokens.iter().take(self.depth) {
            node = descend(node, token, self.max_children);
        }

        let similarity_threshold = self.similarity_threshold;
        let best = node
            .groups
            .iter_mut()
            .map(|group| (token_similarity(&group.tokens, tokens), group))
            .filter(|(score, _)| *score >= similarity_threshold)
            .max_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap());

        if let Some((_, group)) = best {
            for (slot, incoming) in group.tokens.iter_mut().zip(tokens.iter()) {
                if slot != incoming {
                    *slot = WILDCARD.to_string();
                }
            }
            group.count += 1;
            return (group.id, group.tokens.clone());
        }

        let id = self.next_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let group = TemplateGroup {
            id,
            tokens: tokens.to_vec(),
            count: 1,
        };
        node.groups.push(group);
        (id, tokens.to_vec())
    }

    pub fn template_count(&self) -> usize {
        self.length_groups
            .lock()
            .unwrap()
            .values()
            .map(count_groups)
            .sum()
    }
}

fn count_groups(node: &PrefixNode) -> usize {
    let mut total = node.groups.len();
    for child in node.children.values() {
        total += count_groups(child);
    }
    if let Some(child) = &node.wildcard_child {
        total += count_groups(child);
    }
    total
}

fn descend<'a>(node: &'a mut PrefixNode, token: &str, max_children: usize) -> &'a mut PrefixNode {
    if token == WILDCARD {
        return node
            .wildcard_child
            .get_or_insert_with(|| Box::new(PrefixNode::default()));
    }
    if !node.children.contains_key(token) {
        if node.children.len() >= max_children {
            return node
                .wildcard_child
                .get_or_insert_with(|| Box::new(PrefixNode::default()));
        }
        node.children.insert(token.to_string(), PrefixNode::default());
    }
    node.children.get_mut(token).unwrap()
}

fn token_similarity(template: &[String], line: &[String]) -> f64 {
    if line.is_empty() {
        return 0.0;
    }
    let matches = template
        .iter()
        .zip(line.iter())
        .filter(|(t, l)| *t != WILDCARD && t == l)
        .count();
    matches as f64 / line.len() as f64
}
