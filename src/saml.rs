use base64::{Engine as _, engine::general_purpose::STANDARD};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::aws::IamRole;
use crate::constants::AWS_ROLE_ATTRIBUTE;
use crate::error::{Error, Result};

/// Decoded SAML response document
#[derive(Debug)]
pub struct SamlResponse {
    decoded_xml: Vec<u8>,
}

impl SamlResponse {
    /// Create from Base64-encoded response
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::SamlParse(format!("invalid base64: {e}")))?;
        Ok(Self {
            decoded_xml: decoded,
        })
    }

    /// Text of every `AttributeValue` under the `Attribute` named `attribute_name`, in
    /// document order. Namespace prefixes are ignored.
    pub fn get_attribute_values(&self, attribute_name: &str) -> Result<Vec<String>> {
        let mut reader = Reader::from_reader(self.decoded_xml.as_slice());
        reader.config_mut().trim_text(true);

        let mut values = Vec::new();
        let mut in_target_attribute = false;
        let mut current_value: Option<String> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                    b"Attribute" => in_target_attribute = check_attribute_name(e, attribute_name),
                    b"AttributeValue" if in_target_attribute => {
                        current_value = Some(String::new());
                    }
                    _ => {}
                },
                Ok(Event::Empty(ref e)) => {
                    if in_target_attribute && e.local_name().as_ref() == b"AttributeValue" {
                        values.push(String::new());
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(value) = current_value.as_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::SamlParse(format!("invalid text: {e}")))?;
                        value.push_str(&text);
                    }
                }
                Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                    b"Attribute" => in_target_attribute = false,
                    b"AttributeValue" => {
                        if let Some(value) = current_value.take() {
                            values.push(value);
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::SamlParse(format!(
                        "error at position {}: {e}",
                        reader.error_position()
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(values)
    }
}

/// Extract every candidate IAM role from a base64 SAML assertion.
///
/// An assertion without the AWS role attribute yields an empty list; a value without a
/// comma is an error.
pub fn extract_roles(saml_base64: &str) -> Result<Vec<IamRole>> {
    let response = SamlResponse::from_base64(saml_base64)?;
    let roles = response
        .get_attribute_values(AWS_ROLE_ATTRIBUTE)?
        .iter()
        .map(|value| IamRole::parse_pair(value))
        .collect::<Result<Vec<_>>>()?;

    debug!("Found {} role(s) in SAML assertion", roles.len());
    Ok(roles)
}

/// Check if the attribute element has the specified name
fn check_attribute_name(e: &BytesStart, attribute_name: &str) -> bool {
    e.attributes().filter_map(std::result::Result::ok).any(|attr| {
        attr.key.as_ref() == b"Name" && attr.value.as_ref() == attribute_name.as_bytes()
    })
}
