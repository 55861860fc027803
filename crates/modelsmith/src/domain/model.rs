//! Domain models for the value object and parsed Objective-C declarations.

use serde::Serialize;

/// Value object holding a count, a text label, and an ordered sequence of items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model<T> {
    some_items: Vec<T>,
    text: String,
    count: i32,
}

impl<T> Model<T> {
    /// Designated initializer. Every input is accepted as-is.
    pub fn new(some_items: Vec<T>, text: impl Into<String>, count: i32) -> Self {
        Self {
            some_items,
            text: text.into(),
            count,
        }
    }

    pub fn count(&self) -> i32 {
        self.count
    }

    pub fn set_count(&mut self, count: i32) {
        self.count = count;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the label, dropping the previous one.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn some_items(&self) -> &[T] {
        &self.some_items
    }

    /// Replace the whole sequence. Nothing is merged with the old items.
    pub fn set_some_items(&mut self, some_items: Vec<T>) {
        self.some_items = some_items;
    }
}

/// How a generated property holds its ivar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ownership {
    /// Plain value type, copied on assignment.
    Assign,
    /// Object pointer, retained by the setter and released in `dealloc`.
    Retain,
}

/// One instance variable from an `@interface` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ivar {
    pub ctype: String,
    pub name: String,
    pub ownership: Ownership,
}

impl Ivar {
    pub fn new(ctype: impl Into<String>, name: impl Into<String>, ownership: Ownership) -> Self {
        Self {
            ctype: ctype.into(),
            name: name.into(),
            ownership,
        }
    }

    /// Type as written in property and initializer declarations.
    pub fn declared_type(&self) -> String {
        match self.ownership {
            Ownership::Assign => self.ctype.clone(),
            Ownership::Retain => format!("{}*", self.ctype),
        }
    }

    /// Name with only its first character upper-cased (`someItems` -> `SomeItems`).
    pub fn camel_name(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub fn is_retained(&self) -> bool {
        self.ownership == Ownership::Retain
    }
}

/// Parsed ivar list of a model class, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterfaceDecl {
    pub ivars: Vec<Ivar>,
}

impl InterfaceDecl {
    pub fn retained(&self) -> impl Iterator<Item = &Ivar> {
        self.ivars.iter().filter(|ivar| ivar.is_retained())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_are_kept_verbatim() {
        let model: Model<String> = Model::new(Vec::new(), "", 0);
        assert!(model.some_items().is_empty());
        assert_eq!(model.text(), "");
        assert_eq!(model.count(), 0);
    }

    #[test]
    fn accessors_return_constructor_values() {
        let model = Model::new(vec!["a", "b"], "hello", 3);
        assert_eq!(model.some_items(), &["a", "b"]);
        assert_eq!(model.text(), "hello");
        assert_eq!(model.count(), 3);
    }

    #[test]
    fn set_count_leaves_other_fields_alone() {
        let mut model = Model::new(vec!["a", "b"], "hello", 3);
        model.set_count(-7);
        assert_eq!(model.count(), -7);
        assert_eq!(model.text(), "hello");
        assert_eq!(model.some_items(), &["a", "b"]);
    }

    #[test]
    fn set_text_replaces_previous_value() {
        let mut model = Model::new(vec![1, 2], "hello", 3);
        model.set_text(String::from("world"));
        assert_eq!(model.text(), "world");
        assert_eq!(model.count(), 3);
    }

    #[test]
    fn set_some_items_replaces_without_merging() {
        let mut model = Model::new(vec!["a", "b"], "hello", 3);
        model.set_some_items(vec!["c"]);
        assert_eq!(model.some_items(), &["c"]);
    }

    #[test]
    fn identical_models_are_independent() {
        let mut first = Model::new(vec!["a".to_string()], "same", 1);
        let second = Model::new(vec!["a".to_string()], "same", 1);
        assert_eq!(first, second);

        first.set_count(2);
        first.set_text("changed");
        first.set_some_items(Vec::new());

        assert_eq!(second.count(), 1);
        assert_eq!(second.text(), "same");
        assert_eq!(second.some_items(), &["a".to_string()]);
    }

    #[test]
    fn camel_name_capitalizes_first_character_only() {
        let ivar = Ivar::new("NSArray", "someItems", Ownership::Retain);
        assert_eq!(ivar.camel_name(), "SomeItems");
        assert_eq!(ivar.declared_type(), "NSArray*");

        let count = Ivar::new("int", "count", Ownership::Assign);
        assert_eq!(count.camel_name(), "Count");
        assert_eq!(count.declared_type(), "int");
    }
}
