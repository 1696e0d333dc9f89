// HTML structure validation
//
// A generated document must carry the skeleton of a standalone page. Every
// missing piece is reported, not just the first.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;

/// A structural element a standalone page must contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingElement {
    Doctype,
    HtmlOpen,
    HtmlClose,
    HeadOpen,
    HeadClose,
    BodyOpen,
    BodyClose,
}

impl fmt::Display for MissingElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            MissingElement::Doctype => {
                "Missing DOCTYPE declaration. HTML must start with <!DOCTYPE html>"
            }
            MissingElement::HtmlOpen => "Missing <html> opening tag",
            MissingElement::HtmlClose => "Missing </html> closing tag",
            MissingElement::HeadOpen => "Missing <head> opening tag",
            MissingElement::HeadClose => "Missing </head> closing tag",
            MissingElement::BodyOpen => "Missing <body> opening tag",
            MissingElement::BodyClose => "Missing </body> closing tag",
        };
        f.write_str(message)
    }
}

/// Document is missing one or more structural elements
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    pub missing: Vec<MissingElement>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTML validation failed:")?;
        for element in &self.missing {
            write!(f, "\n{}", element)?;
        }
        Ok(())
    }
}

static CHECKS: Lazy<Vec<(MissingElement, Regex)>> = Lazy::new(|| {
    [
        (MissingElement::Doctype, r"(?i)<!doctype\s+html\s*>"),
        (MissingElement::HtmlOpen, r"(?i)<html\b[^>]*>"),
        (MissingElement::HtmlClose, r"(?i)</html\s*>"),
        (MissingElement::HeadOpen, r"(?i)<head\b[^>]*>"),
        (MissingElement::HeadClose, r"(?i)</head\s*>"),
        (MissingElement::BodyOpen, r"(?i)<body\b[^>]*>"),
        (MissingElement::BodyClose, r"(?i)</body\s*>"),
    ]
    .into_iter()
    .map(|(element, pattern)| (element, Regex::new(pattern).expect("static pattern")))
    .collect()
});

/// Structural elements absent from `code`, in document order
pub fn missing_elements(code: &str) -> Vec<MissingElement> {
    CHECKS
        .iter()
        .filter(|(_, pattern)| !pattern.is_match(code))
        .map(|(element, _)| *element)
        .collect()
}

/// Check that `code` is a standalone page
pub fn validate_html(code: &str) -> Result<(), ValidationError> {
    let missing = missing_elements(code);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "<!DOCTYPE html><html><head></head><body></body></html>";

    #[test]
    fn test_minimal_document_passes() {
        assert!(validate_html(MINIMAL).is_ok());
    }

    #[test]
    fn test_case_and_attributes_are_accepted() {
        let code = "<!doctype  HTML>\n<HTML lang=\"en\"><Head><meta charset=\"utf-8\"></HEAD>\
                    <body class=\"dark\"></Body></html >";
        assert!(validate_html(code).is_ok());
    }

    #[test]
    fn test_header_is_not_head() {
        let code = "<!DOCTYPE html><html><header></header><body></body></html>";
        let err = validate_html(code).unwrap_err();
        assert_eq!(
            err.missing,
            vec![MissingElement::HeadOpen, MissingElement::HeadClose]
        );
    }

    #[test]
    fn test_every_missing_element_gets_its_own_line() {
        let err = validate_html("<div>hello</div>").unwrap_err();
        assert_eq!(err.missing.len(), 7);

        let message = err.to_string();
        let lines: Vec<&str> = message.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "HTML validation failed:");
        insta::assert_snapshot!(message, @r###"
        HTML validation failed:
        Missing DOCTYPE declaration. HTML must start with <!DOCTYPE html>
        Missing <html> opening tag
        Missing </html> closing tag
        Missing <head> opening tag
        Missing </head> closing tag
        Missing <body> opening tag
        Missing </body> closing tag
        "###);
    }

    #[test]
    fn test_each_single_omission_is_reported_alone() {
        let cases = [
            ("<!DOCTYPE html>", MissingElement::Doctype),
            ("<html>", MissingElement::HtmlOpen),
            ("</html>", MissingElement::HtmlClose),
            ("<head>", MissingElement::HeadOpen),
            ("</head>", MissingElement::HeadClose),
            ("<body>", MissingElement::BodyOpen),
            ("</body>", MissingElement::BodyClose),
        ];

        for (fragment, expected) in cases {
            let code = MINIMAL.replacen(fragment, "", 1);
            let err = validate_html(&code).unwrap_err();
            assert_eq!(err.missing, vec![expected], "removed {}", fragment);
            assert_eq!(err.to_string().lines().count(), 2);
        }
    }
}
