use std::{
    fmt,
    fmt::{Debug, Display},
};

/// Wraps a sensitive value (e.g. the provider API key) so that it never ends up in log output by accident.
#[derive(Clone, Default)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl Secret<String> {
    /// True if the wrapped string is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }
}

impl From<String> for Secret<String> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn secrets_are_masked() {
        let key = Secret::new("sk_live_12345".to_string());
        assert_eq!(format!("{key}"), "****");
        assert_eq!(format!("{key:?}"), "****");
        assert_eq!(key.reveal(), "sk_live_12345");
    }

    #[test]
    fn blank_secrets() {
        assert!(Secret::<String>::default().is_blank());
        assert!(Secret::from("   ".to_string()).is_blank());
        assert!(!Secret::from("abc".to_string()).is_blank());
    }
}
