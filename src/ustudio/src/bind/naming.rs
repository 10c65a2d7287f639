//! Member name transforms

/// How a declared member name maps to a serialized key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingConvention {
    /// Use the declared name as is
    #[default]
    Identity,
    /// `SignatureNumerator` -> `signatureNumerator`
    LowerCamelCase,
    /// `signature_numerator` -> `signatureNumerator`
    SnakeToLowerCamel,
}

impl NamingConvention {
    pub fn apply(self, name: &str) -> String {
        match self {
            NamingConvention::Identity => name.to_string(),
            NamingConvention::LowerCamelCase => lower_first(name),
            NamingConvention::SnakeToLowerCamel => snake_to_lower_camel(name),
        }
    }
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn snake_to_lower_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            // Leading underscores carry no word boundary
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
