//! C++ type references as they appear in declaration signatures.

use std::fmt;

/// Structural form of a type spelling: base name plus cv/indirection.
///
/// Two spellings that differ only in whitespace or in where `const` is
/// written (`const char *` vs `char const*`) share a shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeShape {
    pub base: String,
    pub is_const: bool,
    pub pointers: u8,
    pub reference: bool,
}

/// A type as written in a declaration, with its derived shape.
#[derive(Debug, Clone)]
pub struct TypeRef {
    spelling: String,
    shape: TypeShape,
}

impl TypeRef {
    pub fn new(spelling: impl Into<String>) -> Self {
        let spelling = spelling.into();
        let shape = shape_of(&spelling);
        Self { spelling, shape }
    }

    /// The exact declaration string produced by the parser.
    pub fn spelling(&self) -> &str {
        &self.spelling
    }

    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    /// Structural equality (resolved-type comparison).
    pub fn same_type(&self, other: &TypeRef) -> bool {
        self.shape == other.shape
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spelling)
    }
}

fn shape_of(spelling: &str) -> TypeShape {
    let mut pointers = 0u8;
    let mut reference = false;
    let mut words = Vec::new();
    let mut is_const = false;

    // Split `*` and `&` off as their own tokens so `char*` and `char *` agree.
    let spaced = spelling.replace('*', " * ").replace('&', " & ");
    for token in spaced.split_whitespace() {
        match token {
            "*" => pointers = pointers.saturating_add(1),
            "&" => reference = true,
            "const" => is_const = true,
            word => words.push(word),
        }
    }

    TypeShape {
        base: words.join(" "),
        is_const,
        pointers,
        reference,
    }
}
