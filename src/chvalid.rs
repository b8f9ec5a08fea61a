//! Character classes used to validate XML names.
//!
//! The classes follow the productions of
//! [Extensible Markup Language (XML) 1.0 (Fifth Edition)](https://www.w3.org/TR/xml/).

/// Character class predicates of the XML 1.0 recommendation.
pub trait XmlCharValid {
    /// Check if `self` matches [2] Char.
    ///
    /// ```text
    /// [2] Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
    /// ```
    fn is_xml_char(&self) -> bool;
    /// Check if `self` matches [3] S.
    ///
    /// ```text
    /// [3] S ::= (#x20 | #x9 | #xD | #xA)+
    /// ```
    fn is_xml_blank_char(&self) -> bool;
    /// Check if `self` matches [4] NameStartChar.
    fn is_xml_name_start_char(&self) -> bool;
    /// Check if `self` matches [4a] NameChar.
    fn is_xml_name_char(&self) -> bool;
}

impl XmlCharValid for char {
    fn is_xml_char(&self) -> bool {
        matches!(
            *self,
            '\u{9}' | '\u{A}' | '\u{D}'
                | '\u{20}'..='\u{D7FF}'
                | '\u{E000}'..='\u{FFFD}'
                | '\u{10000}'..='\u{10FFFF}'
        )
    }

    fn is_xml_blank_char(&self) -> bool {
        matches!(*self, '\u{20}' | '\u{9}' | '\u{D}' | '\u{A}')
    }

    /// ```text
    /// [4] NameStartChar ::= ":" | [A-Z] | "_" | [a-z] | [#xC0-#xD6] | [#xD8-#xF6]
    ///                       | [#xF8-#x2FF] | [#x370-#x37D] | [#x37F-#x1FFF]
    ///                       | [#x200C-#x200D] | [#x2070-#x218F] | [#x2C00-#x2FEF]
    ///                       | [#x3001-#xD7FF] | [#xF900-#xFDCF] | [#xFDF0-#xFFFD]
    ///                       | [#x10000-#xEFFFF]
    /// ```
    fn is_xml_name_start_char(&self) -> bool {
        matches!(
            *self,
            ':' | 'A'..='Z'
                | '_'
                | 'a'..='z'
                | '\u{C0}'..='\u{D6}'
                | '\u{D8}'..='\u{F6}'
                | '\u{F8}'..='\u{2FF}'
                | '\u{370}'..='\u{37D}'
                | '\u{37F}'..='\u{1FFF}'
                | '\u{200C}'..='\u{200D}'
                | '\u{2070}'..='\u{218F}'
                | '\u{2C00}'..='\u{2FEF}'
                | '\u{3001}'..='\u{D7FF}'
                | '\u{F900}'..='\u{FDCF}'
                | '\u{FDF0}'..='\u{FFFD}'
                | '\u{10000}'..='\u{EFFFF}'
        )
    }

    /// ```text
    /// [4a] NameChar ::= NameStartChar | "-" | "." | [0-9] | #xB7
    ///                   | [#x0300-#x036F] | [#x203F-#x2040]
    /// ```
    fn is_xml_name_char(&self) -> bool {
        self.is_xml_name_start_char()
            || matches!(
                *self,
                '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}'
            )
    }
}
