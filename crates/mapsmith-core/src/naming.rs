//! Naming strategies mapping declared types and fields to SQL identifiers.
//!
//! A [`NamingStrategy`] is passed explicitly wherever schema metadata is
//! resolved. There is no process-wide mutable strategy: callers that want a
//! default use [`SnakeCaseStrategy`].

/// Maps declared type and field names to table and column names.
pub trait NamingStrategy: Send + Sync {
    /// Derives a table name from a declared type name.
    fn table_name(&self, type_name: &str) -> String;

    /// Derives a column name from a declared field name.
    fn column_name(&self, field_name: &str) -> String;
}

/// Default strategy: `OrderItem` -> `order_item`, `customerName` -> `customer_name`.
///
/// Already-snake-case input passes through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeCaseStrategy;

impl NamingStrategy for SnakeCaseStrategy {
    fn table_name(&self, type_name: &str) -> String {
        to_snake_case(type_name)
    }

    fn column_name(&self, field_name: &str) -> String {
        to_snake_case(field_name)
    }
}

/// Converts `PascalCase` or `camelCase` to `snake_case`.
#[must_use]
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;
    for ch in s.chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = false;
        } else {
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
            out.push(ch);
        }
    }
    out
}

/// Converts `snake_case` to `PascalCase`. Empty segments are skipped.
#[must_use]
pub fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &c.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect()
}

/// Converts `snake_case` to `camelCase`.
#[must_use]
pub fn to_camel_case(s: &str) -> String {
    decapitalize(&to_pascal_case(s))
}

/// Lowercases the first character.
#[must_use]
pub fn decapitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + c.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("OrderItem"), "order_item");
        assert_eq!(to_snake_case("customerName"), "customer_name");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("ID"), "id");
        assert_eq!(to_snake_case("legacyFlag2"), "legacy_flag2");
    }

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("order_item"), "OrderItem");
        assert_eq!(to_pascal_case("__weird__"), "Weird");
        assert_eq!(to_pascal_case("orders"), "Orders");
    }

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("customer_name"), "customerName");
        assert_eq!(to_camel_case("id"), "id");
    }

    #[test]
    fn test_strategy_defaults() {
        let naming = SnakeCaseStrategy;
        assert_eq!(naming.table_name("CustomerOrder"), "customer_order");
        assert_eq!(naming.column_name("created_at"), "created_at");
    }
}
