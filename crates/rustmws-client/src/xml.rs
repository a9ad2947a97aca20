//! Helpers for pulling values out of XML response bodies.
//!
//! The executor never interprets business content. These helpers exist for
//! caller-supplied page parsers and for enriching remote failures with the
//! service's `<Error>` block:
//!
//! ```xml
//! <ErrorResponse xmlns="https://mws.amazonservices.com/Orders/2013-09-01">
//!   <Error>
//!     <Type>Sender</Type>
//!     <Code>InvalidParameterValue</Code>
//!     <Message>CreatedAfter date is in the future</Message>
//!   </Error>
//!   <RequestId>a1b2c3</RequestId>
//! </ErrorResponse>
//! ```

use quick_xml::Reader;
use quick_xml::events::Event;

/// Errors that can occur while scanning XML.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// An error from the underlying quick-xml library.
    #[error("XML processing error: {0}")]
    QuickXml(#[from] quick_xml::Error),

    /// Text content could not be decoded or unescaped.
    #[error("failed to decode text: {0}")]
    Decode(String),
}

/// The `<Error>` block of a failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFault {
    /// `Sender` or `Receiver`.
    pub kind: Option<String>,
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: Option<String>,
    /// Request id echoed by the service.
    pub request_id: Option<String>,
}

/// Text of every element whose local name is `name`, in document order.
///
/// Namespace prefixes are ignored. Text of nested children is concatenated,
/// surrounding whitespace is trimmed, and an empty element yields an empty
/// string.
///
/// # Examples
///
/// ```
/// use rustmws_client::xml::element_texts;
///
/// let body = "<Orders><Order><Id>A</Id></Order><Order><Id>B</Id></Order></Orders>";
/// assert_eq!(element_texts(body, "Id").unwrap(), vec!["A", "B"]);
/// ```
pub fn element_texts(body: &str, name: &str) -> Result<Vec<String>, XmlError> {
    let mut reader = Reader::from_str(body);

    let mut found = Vec::new();
    let mut capture: Option<(u32, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match capture.as_mut() {
                Some((depth, _)) => *depth += 1,
                None if e.local_name().as_ref() == name.as_bytes() => {
                    capture = Some((0, String::new()));
                }
                None => {}
            },
            Event::End(_) => {
                if let Some((depth, text)) = capture.as_mut() {
                    if *depth == 0 {
                        found.push(text.trim().to_owned());
                        capture = None;
                    } else {
                        *depth -= 1;
                    }
                }
            }
            Event::Empty(e) => {
                if capture.is_none() && e.local_name().as_ref() == name.as_bytes() {
                    found.push(String::new());
                }
            }
            Event::Text(e) => {
                if let Some((_, text)) = capture.as_mut() {
                    let decoded = e.decode().map_err(|err| XmlError::Decode(err.to_string()))?;
                    let unescaped = quick_xml::escape::unescape(&decoded)
                        .map_err(|err| XmlError::Decode(err.to_string()))?;
                    text.push_str(&unescaped);
                }
            }
            Event::CData(e) => {
                if let Some((_, text)) = capture.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::GeneralRef(e) => {
                if let Some((_, text)) = capture.as_mut() {
                    let entity = format!("&{};", String::from_utf8_lossy(&e));
                    let resolved = quick_xml::escape::unescape(&entity)
                        .map_err(|err| XmlError::Decode(err.to_string()))?;
                    text.push_str(&resolved);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(found)
}

/// Text of the first element whose local name is `name`.
pub fn element_text(body: &str, name: &str) -> Result<Option<String>, XmlError> {
    Ok(element_texts(body, name)?.into_iter().next())
}

/// First non-empty `NextToken` in the body.
///
/// Continuation tokens are opaque and returned as-is.
pub fn next_token(body: &str) -> Result<Option<String>, XmlError> {
    Ok(element_texts(body, "NextToken")?
        .into_iter()
        .find(|t| !t.is_empty()))
}

/// Best-effort parse of an `<Error>` block.
///
/// Returns `None` when the body is not XML or carries no error code.
#[must_use]
pub fn parse_fault(body: &str) -> Option<ServiceFault> {
    if element_texts(body, "Error").ok()?.is_empty() {
        return None;
    }

    let code = element_text(body, "Code").ok().flatten()?;
    let non_empty = |name: &str| element_text(body, name).ok().flatten().filter(|v| !v.is_empty());

    Some(ServiceFault {
        kind: non_empty("Type"),
        code,
        message: non_empty("Message"),
        request_id: non_empty("RequestId"),
    })
}
