//! HTTP request framing and SOAP command bodies.

use std::io::Write;

use crate::xml;

/// Rendering control service (volume, mute).
pub const URN_RENDERING_CONTROL: &str = "schemas-upnp-org:service:RenderingControl:1";
/// Panasonic network remote-control service (keys, pairing, encrypted commands).
pub const URN_REMOTE_CONTROL: &str = "panasonic-com:service:p00NetworkControl:1";

pub const PATH_CONTROL_DMR: &str = "dmr/control_0";
pub const PATH_CONTROL_NRC: &str = "nrc/control_0";
/// NRC service description, listing the actions the TV supports.
pub const PATH_NRC_DESCRIPTION: &str = "nrc/sdd_0.xml";

/// HTTP methods used against the TV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// HTTP/1.1 request builder.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize to wire format.
    ///
    /// ```text
    /// POST /nrc/control_0 HTTP/1.1\r\n
    /// Host: host:port\r\n
    /// Content-Length: N\r\n
    /// Header: Value\r\n
    /// Connection: close\r\n
    /// \r\n
    /// [body]
    /// ```
    pub fn serialize(&self, authority: &str) -> Vec<u8> {
        let mut out = Vec::new();

        write!(
            &mut out,
            "{} /{} HTTP/1.1\r\n",
            self.method.as_str(),
            self.path.trim_start_matches('/')
        )
        .unwrap();
        write!(&mut out, "Host: {}\r\n", authority).unwrap();

        if let Some(ref body) = self.body {
            write!(&mut out, "Content-Length: {}\r\n", body.len()).unwrap();
        }

        for (key, value) in &self.headers {
            write!(&mut out, "{}: {}\r\n", key, value).unwrap();
        }

        // One exchange per connection
        out.extend_from_slice(b"Connection: close\r\n\r\n");

        if let Some(ref body) = self.body {
            out.extend_from_slice(body);
        }

        out
    }
}

/// One SOAP action addressed to a TV service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapCommand {
    pub path: String,
    pub urn: String,
    pub action: String,
    /// Inner XML of the action element, already escaped.
    pub params: String,
}

impl SoapCommand {
    pub fn new(
        path: impl Into<String>,
        urn: impl Into<String>,
        action: impl Into<String>,
        params: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            urn: urn.into(),
            action: action.into(),
            params: params.into(),
        }
    }

    /// Action on the network remote-control service.
    pub fn nrc(action: impl Into<String>, params: impl Into<String>) -> Self {
        Self::new(PATH_CONTROL_NRC, URN_REMOTE_CONTROL, action, params)
    }

    /// Action on the rendering control service.
    pub fn dmr(action: impl Into<String>, params: impl Into<String>) -> Self {
        Self::new(PATH_CONTROL_DMR, URN_RENDERING_CONTROL, action, params)
    }

    // Factory methods for the actions the client issues

    /// Ask the TV to show a pairing PIN.
    pub fn display_pin_code(device_name: &str) -> Self {
        Self::nrc(
            "X_DisplayPinCode",
            format!("<X_DeviceName>{}</X_DeviceName>", xml::escape(device_name)),
        )
    }

    /// Submit the PIN challenge. Both values are base64.
    pub fn request_auth(device_name: &str, client_nonce: &str, auth_info: &str) -> Self {
        Self::nrc(
            "X_RequestAuth",
            format!(
                "<X_DeviceName>{}</X_DeviceName><X_ClientNonce>{}</X_ClientNonce><X_AuthInfo>{}</X_AuthInfo>",
                xml::escape(device_name),
                client_nonce,
                auth_info
            ),
        )
    }

    /// Wrap a sealed command for the encrypted session.
    pub fn encrypted_command(application_id: &str, sequence: u32, enc_info: &str) -> Self {
        Self::nrc(
            "X_EncryptedCommand",
            format!(
                "<X_ApplicationId>{}</X_ApplicationId><X_SequenceNumber>{}</X_SequenceNumber><X_EncInfo>{}</X_EncInfo>",
                xml::escape(application_id),
                sequence,
                enc_info
            ),
        )
    }

    pub fn send_key(code: &str) -> Self {
        Self::nrc(
            "X_SendKey",
            format!("<X_KeyEvent>{}</X_KeyEvent>", xml::escape(code)),
        )
    }

    pub fn get_volume() -> Self {
        Self::dmr("GetVolume", "<InstanceID>0</InstanceID><Channel>Master</Channel>")
    }

    pub fn set_volume(volume: u8) -> Self {
        Self::dmr(
            "SetVolume",
            format!(
                "<InstanceID>0</InstanceID><Channel>Master</Channel><DesiredVolume>{}</DesiredVolume>",
                volume
            ),
        )
    }

    pub fn get_mute() -> Self {
        Self::dmr("GetMute", "<InstanceID>0</InstanceID><Channel>Master</Channel>")
    }

    pub fn set_mute(enable: bool) -> Self {
        Self::dmr(
            "SetMute",
            format!(
                "<InstanceID>0</InstanceID><Channel>Master</Channel><DesiredMute>{}</DesiredMute>",
                if enable { 1 } else { 0 }
            ),
        )
    }

    /// Start a TV application. The browser is `vc_app` with `resource_id=1063`.
    pub fn launch_app(app_type: &str, launch_keyword: &str) -> Self {
        Self::nrc(
            "X_LaunchApp",
            format!(
                "<X_AppType>{}</X_AppType><X_LaunchKeyword>{}</X_LaunchKeyword>",
                xml::escape(app_type),
                xml::escape(launch_keyword)
            ),
        )
    }

    /// Tell a launched application to connect back to `connect_addr` (`ip:port`).
    pub fn connect_app(
        app_type: &str,
        session_id: &str,
        connect_keyword: &str,
        connect_addr: &str,
    ) -> Self {
        Self::nrc(
            "X_ConnectApp",
            format!(
                "<X_AppType>{}</X_AppType><X_SessionId>{}</X_SessionId><X_ConnectKeyword>{}</X_ConnectKeyword><X_ConnectAddr>{}</X_ConnectAddr>",
                xml::escape(app_type),
                xml::escape(session_id),
                xml::escape(connect_keyword),
                xml::escape(connect_addr)
            ),
        )
    }

    /// Quoted `SOAPAction` header value.
    pub fn soap_action(&self) -> String {
        format!("\"urn:{}#{}\"", self.urn, self.action)
    }

    /// `<u:Action xmlns:u="urn:...">params</u:Action>`
    pub fn action_xml(&self) -> String {
        format!(
            "<u:{action} xmlns:u=\"urn:{urn}\">{params}</u:{action}>",
            action = self.action,
            urn = self.urn,
            params = self.params
        )
    }

    /// Full SOAP envelope around `action_xml`.
    pub fn envelope(&self) -> String {
        soap_envelope(&self.action_xml())
    }

    /// POST request carrying this command to its service path.
    pub fn to_request(&self) -> HttpRequest {
        HttpRequest::new(HttpMethod::Post, self.path.clone())
            .header("Content-Type", "text/xml; charset=\"utf-8\"")
            .header("SOAPAction", self.soap_action())
            .body(self.envelope())
    }
}

/// Wrap body XML in a SOAP 1.1 envelope.
pub fn soap_envelope(body: &str) -> String {
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>",
            "<s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\"",
            " s:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">",
            "<s:Body>{}</s:Body>",
            "</s:Envelope>"
        ),
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    mod http_request {
        use super::*;

        #[test]
        fn serialize_post_with_body() {
            let request = HttpRequest::new(HttpMethod::Post, "nrc/control_0")
                .header("SOAPAction", "\"urn:x#y\"")
                .body(b"<a/>".to_vec());
            let wire = String::from_utf8(request.serialize("10.0.0.5:55000")).unwrap();

            assert!(wire.starts_with("POST /nrc/control_0 HTTP/1.1\r\n"));
            assert!(wire.contains("Host: 10.0.0.5:55000\r\n"));
            assert!(wire.contains("Content-Length: 4\r\n"));
            assert!(wire.contains("SOAPAction: \"urn:x#y\"\r\n"));
            assert!(wire.ends_with("Connection: close\r\n\r\n<a/>"));
        }

        #[test]
        fn serialize_get_without_body() {
            let wire = String::from_utf8(HttpRequest::get(PATH_NRC_DESCRIPTION).serialize("tv:1"))
                .unwrap();
            assert!(wire.starts_with("GET /nrc/sdd_0.xml HTTP/1.1\r\n"));
            assert!(!wire.contains("Content-Length"));
            assert!(wire.ends_with("\r\n\r\n"));
        }

        #[test]
        fn leading_slash_is_not_doubled() {
            let wire = String::from_utf8(HttpRequest::get("/dmr/control_0").serialize("tv:1")).unwrap();
            assert!(wire.starts_with("GET /dmr/control_0 HTTP/1.1"));
        }
    }

    mod soap_command {
        use super::*;

        #[test]
        fn send_key_targets_nrc() {
            let cmd = SoapCommand::send_key("NRC_EPG-ONOFF");
            assert_eq!(cmd.path, PATH_CONTROL_NRC);
            assert_eq!(cmd.urn, URN_REMOTE_CONTROL);
            assert_eq!(cmd.params, "<X_KeyEvent>NRC_EPG-ONOFF</X_KeyEvent>");
            assert_eq!(
                cmd.soap_action(),
                "\"urn:panasonic-com:service:p00NetworkControl:1#X_SendKey\""
            );
        }

        #[test]
        fn volume_commands_target_dmr() {
            let cmd = SoapCommand::set_volume(42);
            assert_eq!(cmd.path, PATH_CONTROL_DMR);
            assert!(cmd.params.ends_with("<DesiredVolume>42</DesiredVolume>"));
            assert_eq!(SoapCommand::get_volume().action, "GetVolume");
        }

        #[test]
        fn set_mute_encodes_flag() {
            assert!(SoapCommand::set_mute(true).params.contains("<DesiredMute>1</DesiredMute>"));
            assert!(SoapCommand::set_mute(false).params.contains("<DesiredMute>0</DesiredMute>"));
        }

        #[test]
        fn device_name_is_escaped() {
            let cmd = SoapCommand::display_pin_code("Tom & Jerry");
            assert_eq!(cmd.params, "<X_DeviceName>Tom &amp; Jerry</X_DeviceName>");
        }

        #[test]
        fn action_xml_declares_namespace() {
            let cmd = SoapCommand::get_mute();
            assert_eq!(
                cmd.action_xml(),
                "<u:GetMute xmlns:u=\"urn:schemas-upnp-org:service:RenderingControl:1\"><InstanceID>0</InstanceID><Channel>Master</Channel></u:GetMute>"
            );
        }

        #[test]
        fn to_request_wraps_envelope() {
            let request = SoapCommand::get_volume().to_request();
            assert_eq!(request.method, HttpMethod::Post);
            assert_eq!(request.path, PATH_CONTROL_DMR);

            let body = String::from_utf8(request.body.unwrap()).unwrap();
            assert!(body.starts_with("<?xml"));
            assert!(body.contains("<s:Body><u:GetVolume "));
            assert!(request
                .headers
                .iter()
                .any(|(k, v)| k == "Content-Type" && v.starts_with("text/xml")));
        }

        #[test]
        fn launch_and_connect_app_target_nrc() {
            let launch = SoapCommand::launch_app("vc_app", "resource_id=1063");
            assert_eq!(launch.path, PATH_CONTROL_NRC);
            assert_eq!(launch.action, "X_LaunchApp");
            assert_eq!(
                launch.params,
                "<X_AppType>vc_app</X_AppType><X_LaunchKeyword>resource_id=1063</X_LaunchKeyword>"
            );

            let connect = SoapCommand::connect_app("vc_app", "17", "viera-remote", "10.0.0.2:40000");
            assert_eq!(connect.action, "X_ConnectApp");
            assert!(connect.params.contains("<X_SessionId>17</X_SessionId>"));
            assert!(connect.params.contains("<X_ConnectKeyword>viera-remote</X_ConnectKeyword>"));
            assert!(connect.params.ends_with("<X_ConnectAddr>10.0.0.2:40000</X_ConnectAddr>"));
        }

        #[test]
        fn encrypted_command_carries_sequence() {
            let cmd = SoapCommand::encrypted_command("app", 7, "QUJD");
            assert_eq!(cmd.action, "X_EncryptedCommand");
            assert!(cmd.params.contains("<X_SequenceNumber>7</X_SequenceNumber>"));
            assert!(cmd.params.contains("<X_EncInfo>QUJD</X_EncInfo>"));
        }
    }
}
