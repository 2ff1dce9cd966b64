use regex::Regex;

/// Lower-cases content and splits it into maximal `[a-z0-9]+` runs.
///
/// Everything else acts as a separator, so tokens are never empty and
/// their order follows the source text.
#[derive(Debug, Clone)]
pub struct Normalizer {
    token: Regex,
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            token: Regex::new(r"[a-z0-9]+").expect("token pattern is valid"),
        }
    }

    pub fn tokenize(&self, content: &str) -> Vec<String> {
        let lowered = content.to_lowercase();
        self.token
            .find_iter(&lowered)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}
