//! Decoding of numeric and string literal tokens.

use crate::syntax::Literal;

/// Flags carried by a string literal's prefix (`r`, `b`, `f`, `u`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringPrefix {
    pub raw: bool,
    pub bytes: bool,
    pub formatted: bool,
}

impl StringPrefix {
    /// Read the prefix from a `string_start` token such as `rb'''`.
    ///
    /// Fails on combinations Python 3 rejects, like `ur` or `bf`.
    pub fn from_start_token(token: &str) -> Result<Self, String> {
        let prefix = token.trim_end_matches(['\'', '"']).to_ascii_lowercase();
        let mut letters: Vec<char> = prefix.chars().collect();
        letters.sort_unstable();
        let sorted: String = letters.into_iter().collect();
        if !matches!(sorted.as_str(), "" | "r" | "u" | "b" | "br" | "f" | "fr") {
            return Err(format!("invalid string prefix `{}`", prefix));
        }
        Ok(Self {
            raw: prefix.contains('r'),
            bytes: prefix.contains('b'),
            formatted: prefix.contains('f'),
        })
    }
}

/// Parse an `integer` or `float` token into a literal.
///
/// Python 2 forms the grammar still admits (`1L`, `0777`) are rejected.
pub fn parse_number(token: &str) -> Result<Literal, String> {
    let cleaned: String = token
        .chars()
        .filter(|c| *c != '_')
        .collect::<String>()
        .to_ascii_lowercase();

    if let Some(imag) = cleaned.strip_suffix('j') {
        return imag
            .parse()
            .map(Literal::Complex)
            .map_err(|_| format!("invalid imaginary literal `{}`", token));
    }

    let radix = match cleaned.get(..2) {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    let digits = match radix {
        Some(_) => &cleaned[2..],
        None => cleaned.as_str(),
    };
    let radix = radix.unwrap_or(10);

    if digits.ends_with('l') {
        return Err(format!("invalid decimal literal `{}`", token));
    }
    if radix == 10 && cleaned.contains(['.', 'e']) {
        return cleaned
            .parse()
            .map(Literal::Float)
            .map_err(|_| format!("invalid float literal `{}`", token));
    }
    if radix == 10 && digits.len() > 1 && digits.starts_with('0') && digits.contains(|c| c != '0') {
        return Err(
            "leading zeros in decimal integer literals are not permitted; \
             use an 0o prefix for octal integers"
                .to_string(),
        );
    }
    integer(digits, radix).ok_or_else(|| format!("invalid integer literal `{}`", token))
}

fn integer(digits: &str, radix: u32) -> Option<Literal> {
    if digits.is_empty() {
        return None;
    }
    match u128::from_str_radix(digits, radix) {
        Ok(n) => Some(match i64::try_from(n) {
            Ok(n) => Literal::Int(n),
            Err(_) => Literal::BigInt(n.to_string()),
        }),
        Err(_) => to_decimal(digits, radix).map(Literal::BigInt),
    }
}

/// Decimal digits of an arbitrarily long integer written in `radix`.
fn to_decimal(digits: &str, radix: u32) -> Option<String> {
    const BASE: u64 = 1_000_000_000;
    // Little-endian limbs in base 10^9.
    let mut limbs: Vec<u64> = vec![0];
    for c in digits.chars() {
        let mut carry = u64::from(c.to_digit(radix)?);
        for limb in limbs.iter_mut() {
            let value = *limb * u64::from(radix) + carry;
            *limb = value % BASE;
            carry = value / BASE;
        }
        while carry > 0 {
            limbs.push(carry % BASE);
            carry /= BASE;
        }
    }

    let mut out = String::new();
    let mut iter = limbs.iter().rev();
    if let Some(top) = iter.next() {
        out.push_str(&top.to_string());
    }
    for limb in iter {
        out.push_str(&format!("{:09}", limb));
    }
    Some(out)
}

/// Decode the escape sequences of a non-raw `str` literal body.
pub fn decode_str(body: &str) -> Result<String, String> {
    decode_units(body, false)?
        .into_iter()
        .map(|unit| {
            char::from_u32(unit)
                .ok_or_else(|| format!("illegal Unicode character \\U{:08x}", unit))
        })
        .collect()
}

/// Decode the escape sequences of a non-raw `bytes` literal body.
pub fn decode_bytes(body: &str) -> Result<Vec<u8>, String> {
    check_ascii(body)?;
    // Octal escapes above \377 wrap, as in CPython.
    Ok(decode_units(body, true)?
        .into_iter()
        .map(|unit| (unit & 0xff) as u8)
        .collect())
}

/// The body of a raw `bytes` literal.
pub fn raw_bytes(body: &str) -> Result<Vec<u8>, String> {
    check_ascii(body)?;
    Ok(body.as_bytes().to_vec())
}

fn check_ascii(body: &str) -> Result<(), String> {
    if body.is_ascii() {
        Ok(())
    } else {
        Err("bytes can only contain ASCII literal characters".to_string())
    }
}

/// Code points (or byte values, in bytes mode) of a literal body after escapes.
fn decode_units(body: &str, bytes_mode: bool) -> Result<Vec<u32>, String> {
    let chars: Vec<char> = body.chars().collect();
    let mut out = Vec::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != '\\' || i + 1 == chars.len() {
            out.push(u32::from(c));
            i += 1;
            continue;
        }

        let esc = chars[i + 1];
        i += 2;
        match esc {
            '\n' => {}
            '\r' => {
                if chars.get(i) == Some(&'\n') {
                    i += 1;
                }
            }
            '\\' => out.push(u32::from('\\')),
            '\'' => out.push(u32::from('\'')),
            '"' => out.push(u32::from('"')),
            'a' => out.push(0x07),
            'b' => out.push(0x08),
            'f' => out.push(0x0c),
            'n' => out.push(u32::from('\n')),
            'r' => out.push(u32::from('\r')),
            't' => out.push(u32::from('\t')),
            'v' => out.push(0x0b),
            '0'..='7' => {
                let start = i - 1;
                let mut end = start + 1;
                while end < chars.len() && end < start + 3 && chars[end].is_digit(8) {
                    end += 1;
                }
                let digits: String = chars[start..end].iter().collect();
                out.push(u32::from_str_radix(&digits, 8).unwrap_or(0));
                i = end;
            }
            'x' => i = hex_escape(&chars, i, 2, &mut out)?,
            'u' if !bytes_mode => i = hex_escape(&chars, i, 4, &mut out)?,
            'U' if !bytes_mode => i = hex_escape(&chars, i, 8, &mut out)?,
            'N' if !bytes_mode => {
                return Err("named `\\N{...}` escapes are not supported".to_string());
            }
            other => {
                // Unknown escapes stay verbatim.
                out.push(u32::from('\\'));
                out.push(u32::from(other));
            }
        }
    }
    Ok(out)
}

fn hex_escape(
    chars: &[char],
    start: usize,
    width: usize,
    out: &mut Vec<u32>,
) -> Result<usize, String> {
    let end = (start + width).min(chars.len());
    let digits: String = chars[start..end].iter().collect();
    match u32::from_str_radix(&digits, 16) {
        Ok(value) if digits.len() == width && digits.chars().all(|c| c.is_ascii_hexdigit()) => {
            out.push(value);
            Ok(end)
        }
        _ => Err(format!(
            "truncated \\{}{} escape",
            chars[start - 1],
            "X".repeat(width)
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_flags() {
        let p = StringPrefix::from_start_token("Rb'''").unwrap();
        assert!(p.raw && p.bytes && !p.formatted);
        assert!(StringPrefix::from_start_token("f\"").unwrap().formatted);
        assert!(StringPrefix::from_start_token("rF'").unwrap().raw);
        assert_eq!(
            StringPrefix::from_start_token("'").unwrap(),
            StringPrefix::default()
        );
    }

    #[test]
    fn test_python2_prefixes_are_rejected() {
        assert!(StringPrefix::from_start_token("ur'").is_err());
        assert!(StringPrefix::from_start_token("bf'").is_err());
        assert!(StringPrefix::from_start_token("ub'").is_err());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_number("42"), Ok(Literal::Int(42)));
        assert_eq!(parse_number("1_000"), Ok(Literal::Int(1000)));
        assert_eq!(parse_number("0x1F"), Ok(Literal::Int(31)));
        assert_eq!(parse_number("0o17"), Ok(Literal::Int(15)));
        assert_eq!(parse_number("0b101"), Ok(Literal::Int(5)));
        assert_eq!(parse_number("000"), Ok(Literal::Int(0)));
        assert_eq!(parse_number("1.5"), Ok(Literal::Float(1.5)));
        assert_eq!(parse_number("1e3"), Ok(Literal::Float(1000.0)));
        assert_eq!(parse_number("3j"), Ok(Literal::Complex(3.0)));
        assert_eq!(
            parse_number("99999999999999999999"),
            Ok(Literal::BigInt("99999999999999999999".to_string()))
        );
    }

    #[test]
    fn test_big_integers_are_rendered_in_decimal() {
        assert_eq!(
            parse_number("0xFFFFFFFFFFFFFFFF"),
            Ok(Literal::BigInt("18446744073709551615".to_string()))
        );
        // 2**128, past u128.
        assert_eq!(
            parse_number("0x1_0000_0000_0000_0000_0000_0000_0000_0000"),
            Ok(Literal::BigInt(
                "340282366920938463463374607431768211456".to_string()
            ))
        );
        assert_eq!(
            parse_number("1000000000000000000000000000000000000000000"),
            Ok(Literal::BigInt(
                "1000000000000000000000000000000000000000000".to_string()
            ))
        );
    }

    #[test]
    fn test_python2_numbers_are_rejected() {
        assert!(parse_number("1L").is_err());
        assert!(parse_number("10l").is_err());
        let err = parse_number("0777").unwrap_err();
        assert!(err.contains("leading zeros"), "{}", err);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(decode_str(r"a\nb").unwrap(), "a\nb");
        assert_eq!(decode_str(r"\x41é\101").unwrap(), "AéA");
        assert_eq!(decode_str(r"\u00e9\U0001F600").unwrap(), "é\u{1F600}");
        assert_eq!(decode_str(r"keep \q").unwrap(), "keep \\q");
        assert_eq!(decode_str("line\\\ncontinued").unwrap(), "linecontinued");
        assert_eq!(decode_bytes(r"\x00\xff").unwrap(), vec![0x00, 0xff]);
        assert_eq!(decode_bytes(r"\u1234").unwrap(), b"\\u1234".to_vec());
        assert_eq!(decode_bytes(r"\777").unwrap(), vec![0xff]);
    }

    #[test]
    fn test_malformed_escapes_are_errors() {
        assert!(decode_str(r"\xZZ").unwrap_err().contains("truncated"));
        assert!(decode_str(r"\x4").is_err());
        assert!(decode_str(r"\u12").is_err());
        assert!(decode_str(r"\U00110000").is_err());
        assert!(decode_str(r"\N{BULLET}").is_err());
        assert!(decode_bytes(r"\xg0").is_err());
    }

    #[test]
    fn test_bytes_must_be_ascii() {
        assert!(decode_bytes("caf\u{e9}").is_err());
        assert!(raw_bytes("caf\u{e9}").is_err());
        assert_eq!(raw_bytes(r"\d+").unwrap(), b"\\d+".to_vec());
    }
}
