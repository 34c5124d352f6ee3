//! HTTP response parsing and SOAP fault extraction.

use viera_core::error::{FramingError, Result, SoapError};

use crate::xml;

/// Parsed HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_code: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Status line and headers of a response, before the body is read.
#[derive(Debug, Clone)]
pub(crate) struct ResponseHead {
    pub status_code: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Parse everything before the blank line (terminator excluded).
    pub(crate) fn parse(header_bytes: &[u8]) -> std::result::Result<Self, FramingError> {
        let header_str = std::str::from_utf8(header_bytes)
            .map_err(|_| FramingError::InvalidUtf8("response headers"))?;

        let mut lines = header_str.lines();
        let status_line = lines
            .next()
            .ok_or_else(|| FramingError::InvalidStatusLine(String::new()))?;
        let (status_code, status_text) = parse_status_line(status_line)?;

        let headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect();

        Ok(Self {
            status_code,
            status_text,
            headers,
        })
    }

    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Declared body length; `None` means read to EOF.
    pub(crate) fn content_length(&self) -> std::result::Result<Option<usize>, FramingError> {
        if let Some(encoding) = self.header("Transfer-Encoding") {
            if !encoding.eq_ignore_ascii_case("identity") {
                return Err(FramingError::UnsupportedTransferEncoding(encoding.to_string()));
            }
        }
        self.header("Content-Length")
            .map(|v| {
                v.parse::<usize>()
                    .map_err(|_| FramingError::InvalidContentLength(v.to_string()))
            })
            .transpose()
    }
}

impl HttpResponse {
    /// Parse a complete response.
    ///
    /// Without `Content-Length` the body is everything after the headers.
    pub fn parse(data: &[u8]) -> std::result::Result<Self, FramingError> {
        let header_end = find_header_end(data).ok_or(FramingError::MissingHeaderTerminator)?;
        let head = ResponseHead::parse(&data[..header_end])?;
        let rest = &data[header_end + 4..];

        let body = match head.content_length()? {
            Some(len) if rest.len() < len => {
                return Err(FramingError::Truncated {
                    expected: len,
                    actual: rest.len(),
                })
            }
            Some(len) => rest[..len].to_vec(),
            None => rest.to_vec(),
        };

        Ok(Self::from_parts(head, body))
    }

    pub(crate) fn from_parts(head: ResponseHead, body: Vec<u8>) -> Self {
        Self {
            status_code: head.status_code,
            status_text: head.status_text,
            headers: head.headers,
            body,
        }
    }

    /// Check if response indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Get header value (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_length(&self) -> Option<usize> {
        self.header("Content-Length").and_then(|v| v.parse().ok())
    }

    pub fn body_text(&self) -> std::result::Result<&str, FramingError> {
        std::str::from_utf8(&self.body).map_err(|_| FramingError::InvalidUtf8("response body"))
    }

    /// Body of a successful SOAP exchange.
    ///
    /// A SOAP fault becomes `SoapError::Fault`; any other non-2xx status is
    /// `SoapError::UnexpectedStatus`.
    pub fn into_soap_body(self) -> Result<String> {
        if self.is_success() {
            return Ok(self.body_text()?.to_string());
        }

        if let Ok(text) = self.body_text() {
            if let Some(fault) = parse_fault(text) {
                return Err(fault.into());
            }
        }
        Err(SoapError::UnexpectedStatus(self.status_code).into())
    }
}

/// Extract a UPnP/SOAP fault from a body, if it holds one.
///
/// UPnP error codes in `<detail>` win over the generic `faultcode`.
pub fn parse_fault(body: &str) -> Option<SoapError> {
    let fault = xml::find_element(body, "Fault")?;

    let code = xml::find_element(fault, "errorCode")
        .or_else(|| xml::find_element(fault, "faultcode"))
        .map(|c| xml::unescape(c.trim()))
        .unwrap_or_default();
    let description = xml::find_element(fault, "errorDescription")
        .or_else(|| xml::find_element(fault, "faultstring"))
        .map(|d| xml::unescape(d.trim()))
        .unwrap_or_default();

    Some(SoapError::Fault { code, description })
}

pub(crate) fn find_header_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n")
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Parse status line: "HTTP/1.1 200 OK"
fn parse_status_line(line: &str) -> std::result::Result<(u16, String), FramingError> {
    let parts: Vec<&str> = line.splitn(3, ' ').collect();

    if parts.len() < 2 || !parts[0].starts_with("HTTP/") {
        return Err(FramingError::InvalidStatusLine(line.to_string()));
    }

    let code = parts[1]
        .parse()
        .map_err(|_| FramingError::InvalidStatusLine(line.to_string()))?;
    let text = parts.get(2).unwrap_or(&"").to_string();

    Ok((code, text))
}
