//! Form body builders.
//!
//! [`FormParams`] collects flat `key=value` pairs that are encoded by the HTTP client.
//! [`HierarchicalForm`] produces pre-encoded bodies with literal bracket keys such as
//! `rules[input][0][action]=accept`, which a regular form encoder would escape to
//! `rules%5Binput%5D...` and the provider would then ignore.

use std::fmt::{self, Display};
use url::form_urlencoded::byte_serialize;

/// Builder for flat form pairs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormParams {
    pairs: Vec<(String, String)>,
}

impl FormParams {
    /// Create a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Append a required key/value pair.
    pub fn push<T>(&mut self, key: impl Into<String>, value: T)
    where
        T: Display,
    {
        self.pairs.push((key.into(), value.to_string()));
    }

    /// Append a key/value pair when the value is present.
    pub fn push_opt<T>(&mut self, key: impl Into<String>, value: Option<T>)
    where
        T: Display,
    {
        if let Some(value) = value {
            self.push(key, value);
        }
    }

    /// Chaining variant of [`FormParams::push`].
    #[must_use]
    pub fn with<T>(mut self, key: impl Into<String>, value: T) -> Self
    where
        T: Display,
    {
        self.push(key, value);
        self
    }

    /// Return the collected pairs.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.pairs
    }

    /// Returns the collected pairs.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Returns true if no pairs have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Direction of a firewall rule list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Inbound traffic
    Input,
    /// Outbound traffic
    Output,
}

impl Direction {
    /// Returns the key segment used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered field map describing a single rule.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RuleFields {
    fields: Vec<(&'static str, String)>,
}

impl RuleFields {
    /// Create an empty rule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field.
    #[must_use]
    pub fn field(mut self, name: &'static str, value: impl Display) -> Self {
        self.fields.push((name, value.to_string()));
        self
    }

    /// Set a field when the value is present.
    #[must_use]
    pub fn field_opt<T: Display>(self, name: &'static str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.field(name, value),
            None => self,
        }
    }
}

/// Form body with scalar fields followed by indexed rule lists.
///
/// Keys are emitted verbatim; only values are percent-encoded. Rule indices are the
/// position of each rule in its list at encode time.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HierarchicalForm {
    fields: Vec<(&'static str, String)>,
    input: Vec<RuleFields>,
    output: Vec<RuleFields>,
}

impl HierarchicalForm {
    /// Create an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level scalar field.
    #[must_use]
    pub fn field(mut self, name: &'static str, value: impl Display) -> Self {
        self.fields.push((name, value.to_string()));
        self
    }

    /// Append a rule to the list for `direction`.
    #[must_use]
    pub fn rule(mut self, direction: Direction, rule: RuleFields) -> Self {
        match direction {
            Direction::Input => self.input.push(rule),
            Direction::Output => self.output.push(rule),
        }
        self
    }

    /// Append several rules to the list for `direction`.
    #[must_use]
    pub fn rules(
        mut self,
        direction: Direction,
        rules: impl IntoIterator<Item = RuleFields>,
    ) -> Self {
        for rule in rules {
            self = self.rule(direction, rule);
        }
        self
    }

    /// Encode into an `&`-joined body.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut terms = Vec::new();

        for (name, value) in &self.fields {
            terms.push(format!("{name}={}", encode_value(value)));
        }

        let lists = [
            (Direction::Input, &self.input),
            (Direction::Output, &self.output),
        ];
        for (direction, rules) in lists {
            for (index, rule) in rules.iter().enumerate() {
                for (name, value) in &rule.fields {
                    terms.push(format!(
                        "rules[{direction}][{index}][{name}]={}",
                        encode_value(value)
                    ));
                }
            }
        }

        terms.join("&")
    }
}

fn encode_value(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_opt_skips_none() {
        let mut params = FormParams::new();
        params.push_opt("name", Option::<String>::None);
        assert!(params.is_empty());
    }

    #[test]
    fn push_keeps_order() {
        let params = FormParams::new().with("name", "vswitch").with("vlan", 4000);
        assert_eq!(
            params.into_pairs(),
            vec![
                ("name".to_string(), "vswitch".to_string()),
                ("vlan".to_string(), "4000".to_string())
            ]
        );
    }

    #[test]
    fn encodes_rules_with_literal_brackets() {
        let body = HierarchicalForm::new()
            .rule(Direction::Input, RuleFields::new().field("action", "accept"))
            .rule(Direction::Output, RuleFields::new().field("action", "discard"))
            .encode();

        let terms: Vec<&str> = body.split('&').collect();
        assert!(terms.contains(&"rules[input][0][action]=accept"));
        assert!(terms.contains(&"rules[output][0][action]=discard"));
        assert!(!body.contains("%5B"));
        assert!(!body.contains("%5D"));
    }

    #[test]
    fn scalar_fields_come_first_and_values_are_escaped() {
        let body = HierarchicalForm::new()
            .field("status", "active")
            .field("whitelist_hos", true)
            .rule(
                Direction::Input,
                RuleFields::new()
                    .field("name", "ssh & web")
                    .field("src_ip", "10.0.0.0/8")
                    .field("action", "accept"),
            )
            .encode();

        assert_eq!(
            body,
            "status=active&whitelist_hos=true\
             &rules[input][0][name]=ssh+%26+web\
             &rules[input][0][src_ip]=10.0.0.0%2F8\
             &rules[input][0][action]=accept"
        );
    }

    #[test]
    fn indices_follow_list_position() {
        let body = HierarchicalForm::new()
            .rules(
                Direction::Input,
                [
                    RuleFields::new().field("name", "a"),
                    RuleFields::new().field("name", "b"),
                ],
            )
            .encode();
        assert_eq!(body, "rules[input][0][name]=a&rules[input][1][name]=b");
    }

    #[test]
    fn empty_direction_emits_nothing() {
        let body = HierarchicalForm::new()
            .field("status", "disabled")
            .rule(Direction::Output, RuleFields::new().field("action", "accept"))
            .encode();
        assert!(!body.contains("input"));
        assert_eq!(body, "status=disabled&rules[output][0][action]=accept");
        assert_eq!(HierarchicalForm::new().encode(), "");
    }

    #[test]
    fn field_opt_skips_missing_values() {
        let rule = RuleFields::new()
            .field_opt("dst_port", Option::<u16>::None)
            .field_opt("protocol", Some("tcp"));
        let body = HierarchicalForm::new().rule(Direction::Input, rule).encode();
        assert_eq!(body, "rules[input][0][protocol]=tcp");
    }
}
