//! In-process fake TV.
//!
//! Implements the TV side of pairing and of the encrypted session with the
//! same crypto crate the client uses, and answers plain commands from a
//! small amount of state.

#![allow(dead_code)]

use std::io;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use viera_client::{Credentials, Error, Result, Transport};
use viera_crypto::envelope::{request_header, response_header, Envelope, CONFIRM_HEADER};
use viera_crypto::hkdf::pin_challenge;
use viera_crypto::keys::{derive_session_key, SessionKeys};
use viera_soap::{soap_envelope, xml};

pub const APP_ID: &str = "BSkeeKuuwakd9Q==";
pub const ENCRYPTION_KEY: &str = "EarvNQodKYlj5zTEIhZoXQ==";
pub const NRC_URN: &str = "urn:panasonic-com:service:p00NetworkControl:1";
pub const BROWSER_SESSION_ID: &str = "4711";

/// One-shot misbehaviour for the next request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Reset the connection without answering.
    Drop,
    /// Corrupt one character of the sealed response.
    Tamper,
    /// Answer with the previous response sequence number.
    Replay,
}

pub struct FakeTv {
    pin: String,
    tv_nonce: [u8; 16],
    pairing_required: bool,
    app_id: String,
    keys: Option<SessionKeys>,
    inbound: u32,
    outbound: u32,
    next_failure: Option<Failure>,
    pub volume: u8,
    pub muted: bool,
    /// Key codes received, in order.
    pub keys_received: Vec<String>,
    /// Every request as it arrived on the wire.
    pub wire_log: Vec<String>,
    pub envelopes_in: usize,
    pub envelopes_out: usize,
    /// `(app type, launch keyword)` of every launched application.
    pub launched_apps: Vec<(String, String)>,
    /// Address the browser was told to connect to.
    pub connect_addr: Option<String>,
    /// Browser side of the URL hand-off; yields every byte it read.
    pub browser: Option<JoinHandle<Vec<u8>>>,
}

impl FakeTv {
    /// Legacy TV: plain commands only.
    pub fn plain() -> Self {
        Self::build(false, "")
    }

    /// TV that pairs with `pin`.
    pub fn encrypted(pin: &str) -> Self {
        Self::build(true, pin)
    }

    /// Encrypted TV already paired with `credentials`.
    pub fn paired(credentials: &Credentials) -> Self {
        let mut tv = Self::build(true, "");
        tv.app_id = credentials.application_id().to_string();
        tv.keys = Some(SessionKeys::derive(credentials.encryption_key()).unwrap());
        tv
    }

    fn build(pairing_required: bool, pin: &str) -> Self {
        Self {
            pin: pin.to_string(),
            tv_nonce: [0x3Cu8; 16],
            pairing_required,
            app_id: APP_ID.to_string(),
            keys: None,
            inbound: 0,
            outbound: 0,
            next_failure: None,
            volume: 20,
            muted: false,
            keys_received: Vec::new(),
            wire_log: Vec::new(),
            envelopes_in: 0,
            envelopes_out: 0,
            launched_apps: Vec::new(),
            connect_addr: None,
            browser: None,
        }
    }

    pub fn fail_next(&mut self, failure: Failure) {
        self.next_failure = Some(failure);
    }

    /// TV-side counters: (next request expected, next response sent).
    pub fn counters(&self) -> (u32, u32) {
        (self.inbound, self.outbound)
    }

    /// Start the session over, as after the client reloads credentials.
    pub fn reset_session(&mut self) {
        self.inbound = 0;
        self.outbound = 0;
    }

    fn respond(&mut self, wire: &str, failure: Option<Failure>) -> Vec<u8> {
        let (head, body) = wire.split_once("\r\n\r\n").unwrap();
        let request_line = head.lines().next().unwrap();

        if request_line.starts_with("GET /nrc/sdd_0.xml ") {
            return http(200, &self.description());
        }

        let action = head
            .lines()
            .find_map(|line| line.strip_prefix("SOAPAction: "))
            .and_then(|value| value.trim_matches('"').split('#').nth(1))
            .unwrap()
            .to_string();

        let result = match action.as_str() {
            "X_DisplayPinCode" => Ok(self.display_pin_code()),
            "X_RequestAuth" => self.request_auth(body),
            "X_EncryptedCommand" => self.encrypted_command(body, failure),
            _ if self.pairing_required => Err(("401", "Invalid action")),
            other => self.command(other, body),
        };

        match result {
            Ok(reply) => http(200, &soap_envelope(&reply)),
            Err((code, description)) => http(500, &fault(code, description)),
        }
    }

    fn description(&self) -> String {
        let mut actions = vec!["X_SendKey"];
        if self.pairing_required {
            actions.extend(["X_DisplayPinCode", "X_RequestAuth", "X_EncryptedCommand"]);
        }
        let list: String = actions
            .iter()
            .map(|a| format!("<action><name>{}</name></action>", a))
            .collect();
        format!("<?xml version=\"1.0\"?><scpd><actionList>{}</actionList></scpd>", list)
    }

    fn display_pin_code(&mut self) -> String {
        format!(
            "<u:X_DisplayPinCodeResponse xmlns:u=\"{}\"><X_ChallengeKey>{}</X_ChallengeKey></u:X_DisplayPinCodeResponse>",
            NRC_URN,
            STANDARD.encode(self.tv_nonce)
        )
    }

    fn request_auth(&mut self, body: &str) -> std::result::Result<String, (&'static str, &'static str)> {
        let device = xml::element_text(body, "X_DeviceName").unwrap();
        let client_nonce: [u8; 16] = STANDARD
            .decode(xml::element_text(body, "X_ClientNonce").unwrap())
            .unwrap()
            .try_into()
            .unwrap();
        let auth_info = STANDARD
            .decode(xml::element_text(body, "X_AuthInfo").unwrap())
            .unwrap();

        let expected = pin_challenge(&device, &self.pin, &self.tv_nonce, &client_nonce).unwrap();
        if auth_info != expected {
            return Err(("600", "Invalid Args"));
        }

        let mut seed = [0u8; 32];
        seed[..16].copy_from_slice(&self.tv_nonce);
        seed[16..].copy_from_slice(&client_nonce);
        let keys = derive_session_key(&self.pin, &seed).unwrap();

        let confirmation = Envelope::seal(
            &keys,
            CONFIRM_HEADER,
            0,
            format!("<X_ApplicationId>{}</X_ApplicationId>", self.app_id).as_bytes(),
        )
        .unwrap();

        self.keys = Some(keys);
        self.reset_session();

        Ok(format!(
            "<u:X_RequestAuthResponse xmlns:u=\"{}\"><X_AuthResult>{}</X_AuthResult></u:X_RequestAuthResponse>",
            NRC_URN,
            confirmation.to_base64()
        ))
    }

    fn encrypted_command(
        &mut self,
        body: &str,
        failure: Option<Failure>,
    ) -> std::result::Result<String, (&'static str, &'static str)> {
        let keys = self.keys.clone().ok_or(("401", "Not paired"))?;
        assert_eq!(xml::element_text(body, "X_ApplicationId").unwrap(), self.app_id);

        let sequence: u32 = xml::element_text(body, "X_SequenceNumber")
            .unwrap()
            .parse()
            .unwrap();
        let request = Envelope::from_base64(&xml::element_text(body, "X_EncInfo").unwrap(), sequence)
            .unwrap();
        let plaintext = request
            .open(&keys, &request_header(&self.app_id), self.inbound)
            .map_err(|_| ("403", "Integrity check failed"))?;
        self.inbound += 1;
        self.envelopes_in += 1;

        let inner = String::from_utf8(plaintext).unwrap();
        let original = xml::find_element(&inner, "X_OriginalCommand").unwrap().to_string();
        let action = original
            .trim_start_matches('<')
            .split(|c: char| c.is_whitespace() || c == '>')
            .next()
            .unwrap()
            .rsplit(':')
            .next()
            .unwrap()
            .to_string();
        let reply = self.command(&action, &original)?;

        let reply_sequence = match failure {
            Some(Failure::Replay) => self.outbound.saturating_sub(1),
            _ => self.outbound,
        };
        let sealed = Envelope::seal(&keys, &response_header(&self.app_id), reply_sequence, reply.as_bytes())
            .unwrap();
        self.outbound += 1;
        self.envelopes_out += 1;

        let mut encoded = sealed.to_base64().into_bytes();
        if failure == Some(Failure::Tamper) {
            encoded[30] = if encoded[30] == b'A' { b'B' } else { b'A' };
        }

        Ok(format!(
            "<u:X_EncryptedCommandResponse xmlns:u=\"{}\"><X_SequenceNumber>{}</X_SequenceNumber><X_EncResult>{}</X_EncResult></u:X_EncryptedCommandResponse>",
            NRC_URN,
            reply_sequence,
            String::from_utf8(encoded).unwrap()
        ))
    }

    fn command(&mut self, action: &str, body: &str) -> std::result::Result<String, (&'static str, &'static str)> {
        let params = match action {
            "X_SendKey" => {
                self.keys_received
                    .push(xml::element_text(body, "X_KeyEvent").unwrap());
                String::new()
            }
            "GetVolume" => format!("<CurrentVolume>{}</CurrentVolume>", self.volume),
            "SetVolume" => {
                self.volume = xml::element_text(body, "DesiredVolume").unwrap().parse().unwrap();
                String::new()
            }
            "GetMute" => format!("<CurrentMute>{}</CurrentMute>", if self.muted { 1 } else { 0 }),
            "SetMute" => {
                self.muted = xml::element_text(body, "DesiredMute").unwrap() == "1";
                String::new()
            }
            "X_LaunchApp" => {
                self.launched_apps.push((
                    xml::element_text(body, "X_AppType").unwrap(),
                    xml::element_text(body, "X_LaunchKeyword").unwrap(),
                ));
                format!("<X_SessionId>{}</X_SessionId>", BROWSER_SESSION_ID)
            }
            "X_ConnectApp" => {
                if xml::element_text(body, "X_SessionId").unwrap() != BROWSER_SESSION_ID {
                    return Err(("600", "Invalid Args"));
                }
                let addr = xml::element_text(body, "X_ConnectAddr").unwrap();
                self.connect_addr = Some(addr.clone());
                self.browser = Some(tokio::spawn(async move {
                    let mut stream = TcpStream::connect(addr).await.unwrap();
                    let mut received = Vec::new();
                    stream.read_to_end(&mut received).await.unwrap();
                    received
                }));
                String::new()
            }
            _ => return Err(("401", "Invalid action")),
        };
        Ok(format!(
            "<u:{action}Response xmlns:u=\"urn:x\">{params}</u:{action}Response>",
            action = action,
            params = params
        ))
    }
}

#[async_trait]
impl Transport for FakeTv {
    async fn send(&mut self, request: Vec<u8>) -> Result<Vec<u8>> {
        let wire = String::from_utf8(request).unwrap();
        self.wire_log.push(wire.clone());

        let failure = self.next_failure.take();
        if failure == Some(Failure::Drop) {
            return Err(Error::Connection(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }
        Ok(self.respond(&wire, failure))
    }

    fn authority(&self) -> String {
        "192.0.2.10:55000".to_string()
    }
}

fn http(status: u16, body: &str) -> Vec<u8> {
    let reason = if status == 200 { "OK" } else { "Internal Server Error" };
    format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/xml; charset=\"utf-8\"\r\nContent-Length: {}\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    )
    .into_bytes()
}

fn fault(code: &str, description: &str) -> String {
    soap_envelope(&format!(
        "<s:Fault><faultcode>s:Client</faultcode><faultstring>UPnPError</faultstring><detail><UPnPError xmlns=\"urn:schemas-upnp-org:control-1-0\"><errorCode>{}</errorCode><errorDescription>{}</errorDescription></UPnPError></detail></s:Fault>",
        code, description
    ))
}
