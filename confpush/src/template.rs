//! Rendering the desired configuration for a device.

use std::error::Error as _;
use std::path::Path;

use tera::{Context, Tera};

use crate::error::TemplateError;
use crate::inventory::DeviceRecord;

/// Produces the desired configuration text for a device.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, device: &DeviceRecord) -> Result<String, TemplateError>;
}

const TEMPLATE_NAME: &str = "device-config";

/// A Jinja2-style configuration template.
///
/// Every inventory field of the device is available as a variable;
/// referencing one that is not defined fails the render.
#[derive(Debug)]
pub struct ConfigTemplate {
    tera: Tera,
}

impl ConfigTemplate {
    /// Compile template source. Syntax errors surface here.
    pub fn from_source(source: &str) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, source)
            .map_err(|e| TemplateError::Parse {
                message: error_chain(&e),
            })?;
        Ok(Self { tera })
    }

    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_source(&source)
    }
}

impl TemplateRenderer for ConfigTemplate {
    fn render(&self, device: &DeviceRecord) -> Result<String, TemplateError> {
        let render_error = |message: String| TemplateError::Render {
            hostname: device.hostname.clone(),
            message,
        };

        let context = Context::from_serialize(device.template_context())
            .map_err(|e| render_error(error_chain(&e)))?;
        self.tera
            .render(TEMPLATE_NAME, &context)
            .map_err(|e| render_error(error_chain(&e)))
    }
}

/// Tera puts the useful detail in the source chain.
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_with_extra_fields() {
        let template = ConfigTemplate::from_source(
            "hostname {{ hostname }}\n{% for server in ntp_servers %}ntp server {{ server }}\n{% endfor %}",
        )
        .unwrap();
        let device = DeviceRecord::new("edge-rtr1", "admin", "pw", "ios")
            .with_field("ntp_servers", serde_json::json!(["10.1.1.1", "10.1.1.2"]));

        assert_eq!(
            template.render(&device).unwrap(),
            "hostname edge-rtr1\nntp server 10.1.1.1\nntp server 10.1.1.2\n"
        );
    }

    #[test]
    fn test_undefined_variable_fails_render() {
        let template = ConfigTemplate::from_source("snmp-server location {{ site }}").unwrap();
        let device = DeviceRecord::new("edge-rtr1", "admin", "pw", "ios");
        let err = template.render(&device).unwrap_err();
        assert!(matches!(err, TemplateError::Render { ref hostname, .. } if hostname == "edge-rtr1"));
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        let err = ConfigTemplate::from_source("hostname {{ hostname").unwrap_err();
        assert!(matches!(err, TemplateError::Parse { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigTemplate::from_file(Path::new("/nonexistent/router.j2")).unwrap_err();
        assert!(matches!(err, TemplateError::Read { .. }));
    }

    #[test]
    fn test_no_html_escaping() {
        let template = ConfigTemplate::from_source("banner motd {{ banner }}").unwrap();
        let device = DeviceRecord::new("r1", "a", "b", "ios").with_field("banner", "<authorized & only>");
        assert_eq!(template.render(&device).unwrap(), "banner motd <authorized & only>");
    }
}
