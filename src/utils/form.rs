use percent_encoding::percent_decode;

/// Looks up the first field called `name` in an `application/x-www-form-urlencoded`
/// body and returns its decoded value as raw bytes.
///
/// Values are not required to be UTF-8, so binary payloads posted through a form
/// survive decoding unchanged.
pub fn find_form_field(body: &[u8], name: &str) -> Option<Vec<u8>> {
    body.split(|b| *b == b'&')
        .filter(|pair| !pair.is_empty())
        .find_map(|pair| {
            let (key, value) = match pair.iter().position(|b| *b == b'=') {
                Some(i) => (&pair[..i], &pair[i + 1..]),
                None => (pair, &pair[pair.len()..]),
            };
            (decode_component(key) == name.as_bytes()).then(|| decode_component(value))
        })
}

fn decode_component(raw: &[u8]) -> Vec<u8> {
    let spaced: Vec<u8> = raw
        .iter()
        .map(|b| if *b == b'+' { b' ' } else { *b })
        .collect();
    percent_decode(&spaced).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_simple_field() {
        let body = b"other=1&payload=hello&tail=x";
        assert_eq!(find_form_field(body, "payload").unwrap(), b"hello");
    }

    #[test]
    fn test_plus_and_percent_decoding() {
        let body = b"payload=a+b%2Bc%20d%0A";
        assert_eq!(find_form_field(body, "payload").unwrap(), b"a b+c d\n");
    }

    #[test]
    fn test_binary_value_is_preserved() {
        let body = b"payload=%00%FF%FEraw";
        assert_eq!(
            find_form_field(body, "payload").unwrap(),
            vec![0x00, 0xFF, 0xFE, b'r', b'a', b'w']
        );
    }

    #[test]
    fn test_first_occurrence_wins() {
        let body = b"payload=first&payload=second";
        assert_eq!(find_form_field(body, "payload").unwrap(), b"first");
    }

    #[test]
    fn test_empty_and_bare_values() {
        assert_eq!(find_form_field(b"payload=", "payload").unwrap(), b"");
        assert_eq!(find_form_field(b"payload", "payload").unwrap(), b"");
    }

    #[test]
    fn test_encoded_key_matches() {
        let body = b"pay%6Coad=x";
        assert_eq!(find_form_field(body, "payload").unwrap(), b"x");
    }

    #[test]
    fn test_missing_field() {
        assert!(find_form_field(b"foo=bar&&baz=1", "payload").is_none());
        assert!(find_form_field(b"", "payload").is_none());
    }
}
