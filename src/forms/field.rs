use super::validation::Rule;

/// Supported input kinds; hosts use this to pick a prompt widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    Email,
    Phone,
    Integer,
    Boolean,
    Choice(Vec<&'static str>),
}

/// Declarative description of a single field within a step.
#[derive(Clone)]
pub struct FieldDescriptor {
    /// Leaf key inside the owning step's section.
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub help: Option<&'static str>,
    pub rule: Rule,
    /// Key the backend uses for this field in payloads and error bodies.
    pub remote_key: &'static str,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, label: &'static str, kind: FieldKind, rule: Rule) -> Self {
        Self {
            name,
            label,
            kind,
            required: true,
            help: None,
            rule,
            remote_key: name,
        }
    }

    pub fn text(name: &'static str, label: &'static str) -> Self {
        Self::new(name, label, FieldKind::Text, Rule::Text)
    }

    pub fn with_optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }

    pub fn with_remote_key(mut self, key: &'static str) -> Self {
        self.remote_key = key;
        self
    }
}

impl std::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("remote_key", &self.remote_key)
            .finish()
    }
}
