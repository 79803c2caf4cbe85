pub trait StringExtensions {
    /// Collapse whitespace and lowercase a free-text search query.
    /// E.g. `"  Sunset   Beach ".normalize_query() == "sunset beach"`
    fn normalize_query(&self) -> String;

    /// Substring test against an already normalized needle, after normalizing `self` the same way.
    fn contains_normalized(&self, needle: &str) -> bool;
}

impl StringExtensions for str {
    fn normalize_query(&self) -> String {
        self.split_whitespace()
            .map(|s| s.to_lowercase())
            .collect::<Vec<String>>()
            .join(" ")
    }

    fn contains_normalized(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.normalize_query().contains(needle)
    }
}

impl StringExtensions for String {
    fn normalize_query(&self) -> String {
        self.as_str().normalize_query()
    }

    fn contains_normalized(&self, needle: &str) -> bool {
        self.as_str().contains_normalized(needle)
    }
}

#[test]
fn test_normalize_query() {
    assert_eq!("  Sunset   Beach ".normalize_query(), "sunset beach");
    assert_eq!("".normalize_query(), "");
    assert_eq!("\tNATURE\n".to_string().normalize_query(), "nature");
}

#[test]
fn test_contains_normalized() {
    assert!("Sunset at the Beach".contains_normalized("beach"));
    assert!("Sunset  Beach".contains_normalized("sunset beach"));
    assert!("walk on the\nbeach".contains_normalized("the beach"));
    assert!("anything".contains_normalized(""));
    assert!(!"Mountains".to_string().contains_normalized("sea"));
}
