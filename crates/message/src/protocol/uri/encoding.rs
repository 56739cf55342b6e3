//! RFC 3986 percent-encoding for the variable uri components.
//!
//! Every component keeps characters from its allowed set and already valid `%XX`
//! escapes untouched, and percent-encodes everything else byte by byte. Because the
//! output only ever consists of allowed characters and valid escapes, encoding an
//! already encoded value is a no-op.

/// The uri components that carry free-form, percent-encoded text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Component {
    UserInfo,
    Path,
    QueryOrFragment,
}

impl Component {
    fn allows(self, c: char) -> bool {
        if c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~') {
            return true;
        }

        // non-ascii letters are kept verbatim (iri friendly)
        if !c.is_ascii() {
            return c.is_alphabetic();
        }

        match self {
            Component::UserInfo => is_sub_delim(c),
            Component::Path => matches!(c, '(' | ')' | ':' | '@' | '&' | '=' | '+' | '$' | ',' | '/' | ';'),
            Component::QueryOrFragment => is_sub_delim(c) || matches!(c, ':' | '@' | '/' | '?'),
        }
    }
}

#[inline]
fn is_sub_delim(c: char) -> bool {
    matches!(c, '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';' | '=')
}

#[inline]
fn is_escape(bytes: &[u8], index: usize) -> bool {
    bytes.len() > index + 2 && bytes[index + 1].is_ascii_hexdigit() && bytes[index + 2].is_ascii_hexdigit()
}

const HEX: &[u8; 16] = b"0123456789ABCDEF";

fn push_encoded(out: &mut String, c: char) {
    let mut buf = [0u8; 4];
    for byte in c.encode_utf8(&mut buf).bytes() {
        out.push('%');
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
}

/// Percent-encodes `input` for the given component.
pub(crate) fn encode(input: &str, component: Component) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());

    for (index, c) in input.char_indices() {
        match c {
            '%' if is_escape(bytes, index) => out.push('%'),
            '%' => out.push_str("%25"),
            c if component.allows(c) => out.push(c),
            c => push_encoded(&mut out, c),
        }
    }

    out
}

/// Encodes a query string pair by pair, sanitizing keys and values independently.
pub(crate) fn encode_query(query: &str) -> String {
    query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => {
                let mut encoded = encode(key, Component::QueryOrFragment);
                encoded.push('=');
                encoded.push_str(&encode(value, Component::QueryOrFragment));
                encoded
            }
            None => encode(pair, Component::QueryOrFragment),
        })
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_allowed_characters() {
        assert_eq!(encode("/foo/bar;v=1", Component::Path), "/foo/bar;v=1");
        assert_eq!(encode("user!$&'()*+,;=", Component::UserInfo), "user!$&'()*+,;=");
        assert_eq!(encode("a=b&c:d@e/f?g", Component::QueryOrFragment), "a=b&c:d@e/f?g");
    }

    #[test]
    fn encodes_disallowed_runs_byte_by_byte() {
        assert_eq!(encode("/foo^bar", Component::Path), "/foo%5Ebar");
        assert_eq!(encode("f<>", Component::QueryOrFragment), "f%3C%3E");
        assert_eq!(encode("foo bar", Component::Path), "foo%20bar");
        assert_eq!(encode("user@example.com", Component::UserInfo), "user%40example.com");
        assert_eq!(encode("foo:bar", Component::UserInfo), "foo%3Abar");
    }

    #[test]
    fn encodes_lonely_percent_signs() {
        assert_eq!(encode("%ZZ", Component::UserInfo), "%25ZZ");
        assert_eq!(encode("100%", Component::Path), "100%25");
        assert_eq!(encode("%2", Component::QueryOrFragment), "%252");
    }

    #[test]
    fn keeps_valid_escapes() {
        assert_eq!(encode("%25", Component::UserInfo), "%25");
        assert_eq!(encode("/foo%5Ebar", Component::Path), "/foo%5Ebar");
        assert_eq!(encode("%c3%a9", Component::Path), "%c3%a9");
    }

    #[test]
    fn keeps_non_ascii_letters() {
        assert_eq!(encode("/caf\u{e9}", Component::Path), "/caf\u{e9}");
        assert_eq!(encode("\u{2603}", Component::Path), "%E2%98%83");
    }

    #[test]
    fn encoding_is_idempotent() {
        let inputs = ["/p^th with space/%zz", "k^ey=valu`&f<>=`bar", "user@host:pa ss", "%%%41"];

        for input in inputs {
            for component in [Component::UserInfo, Component::Path, Component::QueryOrFragment] {
                let once = encode(input, component);
                assert_eq!(encode(&once, component), once, "{input:?} as {component:?}");
            }
        }
    }

    #[test]
    fn query_pairs_are_encoded_independently() {
        assert_eq!(encode_query("k^ey"), "k%5Eey");
        assert_eq!(encode_query("key[]=valu`"), "key%5B%5D=valu%60");
        assert_eq!(encode_query("k^ey&key[]=valu`&f<>=`bar"), "k%5Eey&key%5B%5D=valu%60&f%3C%3E=%60bar");
        assert_eq!(encode_query("a=b=c&&d"), "a=b=c&&d");
    }
}
