use crate::codec::{ZmtpError, ZmtpFrame};
use crate::mechanism::{require_command, Mechanism, Role};
use crate::session::SocketType;
use crate::utils::{build_ready, encode_frame, FLAG_COMMAND};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::{BTreeMap, VecDeque};

/// PLAIN mechanism for ZMTP 3.x (RFC 23): HELLO/WELCOME/ERROR exchange,
/// followed by the same READY exchange NULL uses.
///
/// Credentials are compared in-process against a static table; there is no
/// ZAP round-trip here (`security::zap_client`/`zap_handler` are the
/// separate async ZAP path used outside the `Mechanism` trait, since ZAP
/// delegation is inherently async and this trait is polled synchronously).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlainState {
    AwaitWelcome,
    AwaitHello,
    NeedRecvReady,
    Done,
}

pub struct PlainMechanism {
    #[allow(dead_code)]
    role: Role,
    local_socket_type: SocketType,
    state: PlainState,
    pending_out: VecDeque<Bytes>,
    username: String,
    password: String,
    credentials: BTreeMap<String, String>,
    peer_socket_type: Option<SocketType>,
    peer_identity: Option<Bytes>,
}

impl PlainMechanism {
    pub fn new_client(local_socket_type: SocketType, username: String, password: String) -> Self {
        let mut mech = Self {
            role: Role::Client,
            local_socket_type,
            state: PlainState::AwaitWelcome,
            pending_out: VecDeque::new(),
            username,
            password,
            credentials: BTreeMap::new(),
            peer_socket_type: None,
            peer_identity: None,
        };
        mech.queue_hello();
        mech
    }

    pub fn new_server(local_socket_type: SocketType, credentials: BTreeMap<String, String>) -> Self {
        Self {
            role: Role::Server,
            local_socket_type,
            state: PlainState::AwaitHello,
            pending_out: VecDeque::new(),
            username: String::new(),
            password: String::new(),
            credentials,
            peer_socket_type: None,
            peer_identity: None,
        }
    }

    fn queue_hello(&mut self) {
        let mut body = BytesMut::new();
        body.put_u8(5);
        body.extend_from_slice(b"HELLO");
        body.put_u8(self.username.len() as u8);
        body.extend_from_slice(self.username.as_bytes());
        body.put_u8(self.password.len() as u8);
        body.extend_from_slice(self.password.as_bytes());
        self.pending_out.push_back(encode_frame(FLAG_COMMAND, &body.freeze()));
    }

    fn queue_welcome_and_ready(&mut self) {
        let mut welcome = BytesMut::new();
        welcome.put_u8(7);
        welcome.extend_from_slice(b"WELCOME");
        self.pending_out.push_back(encode_frame(FLAG_COMMAND, &welcome.freeze()));
        self.queue_ready();
    }

    fn queue_error(&mut self) {
        let mut body = BytesMut::new();
        body.put_u8(5);
        body.extend_from_slice(b"ERROR");
        self.pending_out.push_back(encode_frame(FLAG_COMMAND, &body.freeze()));
    }

    fn queue_ready(&mut self) {
        let body = build_ready(self.local_socket_type.as_str(), None);
        self.pending_out.push_back(encode_frame(FLAG_COMMAND, &body));
    }

    fn parse_hello(payload: &Bytes) -> Result<(String, String), ZmtpError> {
        let mut buf = payload.clone();
        if buf.remaining() < 6 {
            return Err(ZmtpError::Protocol);
        }
        let name_len = buf.get_u8() as usize;
        if name_len != 5 || buf.remaining() < 5 {
            return Err(ZmtpError::Protocol);
        }
        if buf.copy_to_bytes(5).as_ref() != b"HELLO" {
            return Err(ZmtpError::Protocol);
        }

        if buf.remaining() < 1 {
            return Err(ZmtpError::Protocol);
        }
        let ulen = buf.get_u8() as usize;
        if buf.remaining() < ulen {
            return Err(ZmtpError::Protocol);
        }
        let username = String::from_utf8(buf.copy_to_bytes(ulen).to_vec())
            .map_err(|_| ZmtpError::Protocol)?;

        if buf.remaining() < 1 {
            return Err(ZmtpError::Protocol);
        }
        let plen = buf.get_u8() as usize;
        if buf.remaining() < plen {
            return Err(ZmtpError::Protocol);
        }
        let password = String::from_utf8(buf.copy_to_bytes(plen).to_vec())
            .map_err(|_| ZmtpError::Protocol)?;

        Ok((username, password))
    }

    /// Same READY-body grammar `NullMechanism` parses; duplicated rather than
    /// shared since each `Mechanism` impl owns its wire parsing independently.
    fn parse_ready_props(payload: &Bytes) -> Result<(SocketType, Option<Bytes>), ZmtpError> {
        let mut buf = payload.clone();

        if buf.remaining() < 1 {
            return Err(ZmtpError::Protocol);
        }
        let name_len = buf.get_u8() as usize;
        if buf.remaining() < name_len {
            return Err(ZmtpError::Protocol);
        }
        if buf.copy_to_bytes(name_len).as_ref() != b"READY" {
            return Err(ZmtpError::Protocol);
        }

        let mut socket_type = None;
        let mut identity = None;

        while buf.has_remaining() {
            if buf.remaining() < 1 {
                return Err(ZmtpError::Protocol);
            }
            let nlen = buf.get_u8() as usize;
            if buf.remaining() < nlen {
                return Err(ZmtpError::Protocol);
            }
            let pname = buf.copy_to_bytes(nlen);

            if buf.remaining() < 4 {
                return Err(ZmtpError::Protocol);
            }
            let vlen = buf.get_u32() as usize;
            if buf.remaining() < vlen {
                return Err(ZmtpError::Protocol);
            }
            let pval = buf.copy_to_bytes(vlen);

            match pname.as_ref() {
                b"Socket-Type" => socket_type = Some(SocketType::from_wire(&pval)?),
                b"Identity" => identity = Some(pval),
                _ => {}
            }
        }

        let st = socket_type.ok_or(ZmtpError::Protocol)?;
        Ok((st, identity))
    }
}

impl Mechanism for PlainMechanism {
    fn on_inbound(&mut self, frame: &ZmtpFrame) -> Result<(), ZmtpError> {
        require_command(frame)?;

        match self.state {
            PlainState::AwaitWelcome => {
                if frame.payload.len() >= 8 && &frame.payload[..8] == b"\x07WELCOME" {
                    self.queue_ready();
                    self.state = PlainState::NeedRecvReady;
                    Ok(())
                } else {
                    Err(ZmtpError::AuthenticationFailed)
                }
            }
            PlainState::AwaitHello => {
                let (username, password) = Self::parse_hello(&frame.payload)?;
                match self.credentials.get(&username) {
                    Some(expected) if expected == &password => {
                        self.queue_welcome_and_ready();
                        self.state = PlainState::NeedRecvReady;
                        Ok(())
                    }
                    _ => {
                        self.queue_error();
                        Err(ZmtpError::AuthenticationFailed)
                    }
                }
            }
            PlainState::NeedRecvReady => {
                let (peer_type, peer_id) = Self::parse_ready_props(&frame.payload)?;
                self.peer_socket_type = Some(peer_type);
                self.peer_identity = peer_id;
                self.state = PlainState::Done;
                Ok(())
            }
            PlainState::Done => Err(ZmtpError::Protocol),
        }
    }

    fn next_outbound(&mut self) -> Option<Bytes> {
        self.pending_out.pop_front()
    }

    fn is_done(&self) -> bool {
        self.state == PlainState::Done
    }

    fn peer_identity(&self) -> Option<Bytes> {
        self.peer_identity.clone()
    }

    fn peer_socket_type(&self) -> Option<SocketType> {
        self.peer_socket_type
    }
}
