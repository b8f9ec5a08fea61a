//! Lexical handling of XML names and qualified names.
//!
//! - [`split_qname2`] cuts `prefix:local` without validating it.
//! - [`validate_name`], [`validate_ncname`] and [`validate_qname`] check the
//!   `Name`, `NCName` and `QName` productions respectively.

use crate::chvalid::XmlCharValid;

/// Split a QName into its prefix and its local part.
///
/// Return `None` if `name` has no colon or starts with a colon.
///
/// ```
/// use exdom::qname::split_qname2;
///
/// assert_eq!(split_qname2("svg:rect"), Some(("svg", "rect")));
/// assert_eq!(split_qname2("rect"), None);
/// assert_eq!(split_qname2(":rect"), None);
/// ```
pub fn split_qname2(name: &str) -> Option<(&str, &str)> {
    // nasty but valid
    if name.starts_with(':') {
        return None;
    }

    // not a validation, only a cut at the first colon
    name.split_once(':')
}

fn is_ascii_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ascii_name(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'
}

/// Check that `value` matches the `NCName` production.
///
/// ```text
/// [4] NCName ::= Name - (Char* ':' Char*)
/// ```
pub fn validate_ncname(value: &str) -> Result<(), &'static str> {
    // First quick algorithm for ASCII range
    if let Some(rem) = value.strip_prefix(is_ascii_name_start) {
        if rem.trim_start_matches(is_ascii_name).is_empty() {
            return Ok(());
        }
    }

    // Second check for chars outside the ASCII range
    let Some(rem) = value.strip_prefix(|c: char| c != ':' && c.is_xml_name_start_char()) else {
        return Err("Invalid NCName");
    };
    if rem
        .trim_start_matches(|c: char| c != ':' && c.is_xml_name_char())
        .is_empty()
    {
        Ok(())
    } else {
        Err("Invalid NCName")
    }
}

/// Check that `value` matches the `QName` production.
///
/// ```text
/// [7] QName ::= PrefixedName | UnprefixedName
/// [8] PrefixedName ::= Prefix ':' LocalPart
/// [9] UnprefixedName ::= LocalPart
/// ```
pub fn validate_qname(value: &str) -> Result<(), &'static str> {
    match value.split_once(':') {
        Some((prefix, local)) => {
            validate_ncname(prefix).map_err(|_| "Invalid QName")?;
            validate_ncname(local).map_err(|_| "Invalid QName")
        }
        None => validate_ncname(value).map_err(|_| "Invalid QName"),
    }
}

/// Check that `value` matches the `Name` production.
///
/// ```text
/// [5] Name ::= NameStartChar (NameChar)*
/// ```
pub fn validate_name(value: &str) -> Result<(), &'static str> {
    // First quick algorithm for ASCII range
    if let Some(rem) = value.strip_prefix(|c: char| is_ascii_name_start(c) || c == ':') {
        if rem
            .trim_start_matches(|c: char| is_ascii_name(c) || c == ':')
            .is_empty()
        {
            return Ok(());
        }
    }

    // Second check for chars outside the ASCII range
    let Some(rem) = value.strip_prefix(|c: char| c.is_xml_name_start_char()) else {
        return Err("Invalid Name");
    };
    if rem
        .trim_start_matches(|c: char| c.is_xml_name_char())
        .is_empty()
    {
        Ok(())
    } else {
        Err("Invalid Name")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_at_first_colon() {
        assert_eq!(split_qname2("a:b:c"), Some(("a", "b:c")));
        assert_eq!(split_qname2("a:"), Some(("a", "")));
        assert_eq!(split_qname2(":a"), None);
        assert_eq!(split_qname2("abc"), None);
    }

    #[test]
    fn names() {
        assert!(validate_name("abc").is_ok());
        assert!(validate_name(":abc").is_ok());
        assert!(validate_name("a:b:c").is_ok());
        assert!(validate_name("\u{3042}\u{3044}").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("1abc").is_err());
        assert!(validate_name("a b").is_err());
        assert!(validate_name("a<b").is_err());
    }

    #[test]
    fn ncnames_and_qnames() {
        assert!(validate_ncname("local-name.1").is_ok());
        assert!(validate_ncname("a:b").is_err());
        assert!(validate_ncname("").is_err());
        assert!(validate_qname("svg:rect").is_ok());
        assert!(validate_qname("rect").is_ok());
        assert!(validate_qname("\u{3042}:\u{3044}").is_ok());
        assert!(validate_qname(":rect").is_err());
        assert!(validate_qname("svg:").is_err());
        assert!(validate_qname("a:b:c").is_err());
    }
}
