//! Case-insensitive, insertion-ordered header storage.
//!
//! [`HeaderSet`] maps a lowercase key to the name as first given and the ordered list
//! of its values. Every name and value is validated on the way in (see
//! [`validate`]) so a stored set never carries a header injection.
//!
//! Like every value in this crate the set is immutable: the `with_*` methods return a
//! new set and leave the original untouched.

mod validate;

pub(crate) use validate::is_tchar;

use indexmap::IndexMap;
use triomphe::Arc;

use crate::protocol::{ArgumentError, MessageError};

/// Header values accepted at the api boundary.
///
/// A single value and a list of values are both accepted; numbers are converted to
/// their decimal text. An empty list is rejected when the values are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

impl HeaderValues {
    fn into_vec(self) -> Vec<String> {
        match self {
            HeaderValues::One(value) => vec![value],
            HeaderValues::Many(values) => values,
        }
    }
}

impl From<&str> for HeaderValues {
    fn from(value: &str) -> Self {
        HeaderValues::One(value.to_string())
    }
}

impl From<String> for HeaderValues {
    fn from(value: String) -> Self {
        HeaderValues::One(value)
    }
}

impl From<&String> for HeaderValues {
    fn from(value: &String) -> Self {
        HeaderValues::One(value.clone())
    }
}

impl From<Vec<String>> for HeaderValues {
    fn from(values: Vec<String>) -> Self {
        HeaderValues::Many(values)
    }
}

impl From<Vec<&str>> for HeaderValues {
    fn from(values: Vec<&str>) -> Self {
        HeaderValues::Many(values.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for HeaderValues {
    fn from(values: &[&str]) -> Self {
        HeaderValues::Many(values.iter().map(|value| (*value).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for HeaderValues {
    fn from(values: [&str; N]) -> Self {
        HeaderValues::Many(values.iter().map(|value| (*value).to_string()).collect())
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for HeaderValues {
                fn from(value: $ty) -> Self {
                    HeaderValues::One(value.to_string())
                }
            }
        )*
    };
}

impl_from_number!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64);

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderEntry {
    name: String,
    values: Vec<String>,
}

/// An ordered, case-insensitive multi-map of validated headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Arc<IndexMap<String, HeaderEntry>>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from `(name, values)` pairs; repeated names accumulate their values.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error for the first invalid name or value.
    pub fn from_pairs<I, N, V>(pairs: I) -> Result<Self, MessageError>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: Into<HeaderValues>,
    {
        let mut entries = IndexMap::new();
        for (name, values) in pairs {
            let (key, name, values) = sanitize(name.as_ref(), values.into())?;
            entries.entry(key).or_insert_with(|| HeaderEntry { name, values: Vec::new() }).values.extend(values);
        }

        Ok(Self { entries: Arc::new(entries) })
    }

    /// Returns true if both sets share the same storage.
    #[inline]
    pub fn ptr_eq(&self, other: &HeaderSet) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Returns the values of a header, or an empty slice.
    pub fn get(&self, name: &str) -> &[String] {
        self.entries.get(&name.to_ascii_lowercase()).map(|entry| entry.values.as_slice()).unwrap_or_default()
    }

    /// Returns the values of a header joined by `,`, or an empty string.
    pub fn line(&self, name: &str) -> String {
        self.get(name).join(",")
    }

    /// Iterates `(name, values)` in insertion order, names in their original case.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.values().map(|entry| (entry.name.as_str(), entry.values.as_slice()))
    }

    /// Returns a set where `name` holds exactly `values`.
    ///
    /// A previous entry under the same case-insensitive name is removed first, so the
    /// header moves to the end of the ordering.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error for an invalid name, value or an empty list.
    pub fn with(&self, name: &str, values: impl Into<HeaderValues>) -> Result<Self, MessageError> {
        let (key, name, values) = sanitize(name, values.into())?;

        let mut entries = (*self.entries).clone();
        entries.shift_remove(&key);
        entries.insert(key, HeaderEntry { name, values });

        Ok(Self { entries: Arc::new(entries) })
    }

    /// Returns a set where `values` are appended to any existing values of `name`.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error for an invalid name, value or an empty list.
    pub fn with_added(&self, name: &str, values: impl Into<HeaderValues>) -> Result<Self, MessageError> {
        let (key, name, values) = sanitize(name, values.into())?;

        let mut entries = (*self.entries).clone();
        entries.entry(key).or_insert_with(|| HeaderEntry { name, values: Vec::new() }).values.extend(values);

        Ok(Self { entries: Arc::new(entries) })
    }

    /// Returns a set without `name`; shares storage if the header is absent.
    pub fn without(&self, name: &str) -> Self {
        let key = name.to_ascii_lowercase();
        if !self.entries.contains_key(&key) {
            return self.clone();
        }

        let mut entries = (*self.entries).clone();
        entries.shift_remove(&key);
        Self { entries: Arc::new(entries) }
    }
}

fn sanitize(name: &str, values: HeaderValues) -> Result<(String, String, Vec<String>), ArgumentError> {
    validate::header_name(name)?;

    let values = values.into_vec();
    if values.is_empty() {
        return Err(ArgumentError::EmptyHeaderValues);
    }

    let values = values.iter().map(|value| validate::header_value(value)).collect::<Result<Vec<_>, _>>()?;

    Ok((name.to_ascii_lowercase(), name.to_string(), values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(headers: &HeaderSet) -> Vec<&str> {
        headers.iter().map(|(name, _)| name).collect()
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let headers = HeaderSet::new().with("X-Foo", "bar").unwrap();

        assert!(headers.contains("x-foo"));
        assert!(headers.contains("X-FOO"));
        assert_eq!(headers.get("x-foo"), ["bar"]);
        assert_eq!(names(&headers), ["X-Foo"]);
    }

    #[test]
    fn missing_header_reads_empty() {
        let headers = HeaderSet::new();
        assert!(headers.get("x-foo").is_empty());
        assert_eq!(headers.line("x-foo"), "");
        assert!(!headers.contains("x-foo"));
    }

    #[test]
    fn with_replaces_and_moves_to_end() {
        let headers = HeaderSet::from_pairs([("X-Foo", "a"), ("X-Bar", "b")]).unwrap();
        let replaced = headers.with("x-foo", ["c", "d"]).unwrap();

        assert_eq!(names(&replaced), ["X-Bar", "x-foo"]);
        assert_eq!(replaced.line("X-Foo"), "c,d");
        assert_eq!(headers.line("X-Foo"), "a");
    }

    #[test]
    fn with_added_appends_and_keeps_first_name() {
        let headers = HeaderSet::new().with("X-Foo", "a").unwrap();
        let added = headers.with_added("x-FOO", vec!["b", "c"]).unwrap();

        assert_eq!(added.get("x-foo"), ["a", "b", "c"]);
        assert_eq!(names(&added), ["X-Foo"]);

        let created = HeaderSet::new().with_added("X-New", "1").unwrap();
        assert_eq!(created.line("x-new"), "1");
    }

    #[test]
    fn from_pairs_accumulates_repeated_names() {
        let headers = HeaderSet::from_pairs([("Accept", "a"), ("accept", "b")]).unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.line("ACCEPT"), "a,b");
    }

    #[test]
    fn without_missing_header_shares_storage() {
        let headers = HeaderSet::new().with("X-Foo", "bar").unwrap();

        assert!(headers.without("X-Bar").ptr_eq(&headers));

        let removed = headers.without("x-foo");
        assert!(!removed.ptr_eq(&headers));
        assert!(removed.is_empty());
        assert!(headers.contains("X-Foo"));
    }

    #[test]
    fn numeric_values_become_text() {
        let headers = HeaderSet::new().with("Content-Length", 42u64).unwrap().with("X-Ratio", 1.5).unwrap();
        assert_eq!(headers.line("content-length"), "42");
        assert_eq!(headers.line("x-ratio"), "1.5");
    }

    #[test]
    fn empty_value_list_is_rejected() {
        let err = HeaderSet::new().with("X-Foo", Vec::<String>::new()).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn injection_is_rejected() {
        let headers = HeaderSet::new();

        assert!(headers.with("X-Foo", "value\ninjection").unwrap_err().is_invalid_argument());
        assert!(headers.with_added("X-Foo", ["ok", "bad\r"]).unwrap_err().is_invalid_argument());
        assert!(headers.with("X-Foo\r\nSet-Cookie", "a").unwrap_err().is_invalid_argument());

        assert_eq!(headers.with("X-Foo", "value\r\n injection").unwrap().line("x-foo"), "value injection");
    }
}
