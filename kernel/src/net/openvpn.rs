//! OpenVPN Implementation
//!
//! VPN protocol implementation compatible with OpenVPN.

use alloc::string::String;
use alloc::vec::Vec;
use alloc::vec;
use alloc::format;
use alloc::collections::BTreeMap;

/// OpenVPN protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    V2,
    V3,
}

impl ProtocolVersion {
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolVersion::V2 => "2.x",
            ProtocolVersion::V3 => "3.x",
        }
    }
}

/// Connection transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Udp,
    Tcp,
}

impl Transport {
    pub fn name(&self) -> &'static str {
        match self {
            Transport::Udp => "UDP",
            Transport::Tcp => "TCP",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Transport::Udp => 1194,
            Transport::Tcp => 443,
        }
    }
}

/// Cipher algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cipher {
    Aes128Cbc,
    Aes256Cbc,
    Aes128Gcm,
    Aes256Gcm,
    ChaCha20Poly1305,
    None,
}

impl Cipher {
    pub fn name(&self) -> &'static str {
        match self {
            Cipher::Aes128Cbc => "AES-128-CBC",
            Cipher::Aes256Cbc => "AES-256-CBC",
            Cipher::Aes128Gcm => "AES-128-GCM",
            Cipher::Aes256Gcm => "AES-256-GCM",
            Cipher::ChaCha20Poly1305 => "CHACHA20-POLY1305",
            Cipher::None => "NONE",
        }
    }

    pub fn key_size(&self) -> usize {
        match self {
            Cipher::Aes128Cbc | Cipher::Aes128Gcm => 16,
            Cipher::Aes256Cbc | Cipher::Aes256Gcm | Cipher::ChaCha20Poly1305 => 32,
            Cipher::None => 0,
        }
    }

    pub fn iv_size(&self) -> usize {
        match self {
            Cipher::Aes128Cbc | Cipher::Aes256Cbc => 16,
            Cipher::Aes128Gcm | Cipher::Aes256Gcm => 12,
            Cipher::ChaCha20Poly1305 => 12,
            Cipher::None => 0,
        }
    }

    pub fn is_aead(&self) -> bool {
        matches!(self, Cipher::Aes128Gcm | Cipher::Aes256Gcm | Cipher::ChaCha20Poly1305)
    }
}

/// Hash algorithm for HMAC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    None,
}

impl Auth {
    pub fn name(&self) -> &'static str {
        match self {
            Auth::Sha1 => "SHA1",
            Auth::Sha256 => "SHA256",
            Auth::Sha384 => "SHA384",
            Auth::Sha512 => "SHA512",
            Auth::None => "NONE",
        }
    }

    pub fn digest_size(&self) -> usize {
        match self {
            Auth::Sha1 => 20,
            Auth::Sha256 => 32,
            Auth::Sha384 => 48,
            Auth::Sha512 => 64,
            Auth::None => 0,
        }
    }
}

/// TLS authentication mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsAuthMode {
    /// Static key for HMAC
    TlsAuth,
    /// Encrypted TLS handshake
    TlsCrypt,
    /// TLS-Crypt v2 with client-specific key
    TlsCryptV2,
    /// No additional TLS authentication
    None,
}

impl TlsAuthMode {
    pub fn name(&self) -> &'static str {
        match self {
            TlsAuthMode::TlsAuth => "tls-auth",
            TlsAuthMode::TlsCrypt => "tls-crypt",
            TlsAuthMode::TlsCryptV2 => "tls-crypt-v2",
            TlsAuthMode::None => "none",
        }
    }
}

/// Compression algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Lzo,
    Lz4,
    Lz4V2,
    Stub,
    None,
}

impl Compression {
    pub fn name(&self) -> &'static str {
        match self {
            Compression::Lzo => "lzo",
            Compression::Lz4 => "lz4",
            Compression::Lz4V2 => "lz4-v2",
            Compression::Stub => "stub",
            Compression::None => "none",
        }
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    WaitingForServer,
    Authenticating,
    GettingConfig,
    AssigningAddress,
    AddingRoutes,
    Connected,
    Reconnecting,
    Disconnecting,
    Failed,
}

impl ConnectionState {
    pub fn name(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::WaitingForServer => "Waiting for Server",
            ConnectionState::Authenticating => "Authenticating",
            ConnectionState::GettingConfig => "Getting Config",
            ConnectionState::AssigningAddress => "Assigning Address",
            ConnectionState::AddingRoutes => "Adding Routes",
            ConnectionState::Connected => "Connected",
            ConnectionState::Reconnecting => "Reconnecting",
            ConnectionState::Disconnecting => "Disconnecting",
            ConnectionState::Failed => "Failed",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self,
            ConnectionState::Connecting |
            ConnectionState::WaitingForServer |
            ConnectionState::Authenticating |
            ConnectionState::GettingConfig |
            ConnectionState::AssigningAddress |
            ConnectionState::AddingRoutes)
    }
}

/// OpenVPN opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Control - hard reset client
    ControlHardResetClientV1 = 1,
    /// Control - hard reset server
    ControlHardResetServerV1 = 2,
    /// Control - soft reset
    ControlSoftResetV1 = 3,
    /// Control - channel message
    ControlV1 = 4,
    /// ACK - acknowledgment
    AckV1 = 5,
    /// Data - encrypted data
    DataV1 = 6,
    /// Control - hard reset client v2
    ControlHardResetClientV2 = 7,
    /// Control - hard reset server v2
    ControlHardResetServerV2 = 8,
    /// Data - encrypted data v2
    DataV2 = 9,
    /// Control - hard reset client v3
    ControlHardResetClientV3 = 10,
    /// Control - WKC
    ControlWkcV1 = 11,
}

impl Opcode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Opcode::ControlHardResetClientV1),
            2 => Some(Opcode::ControlHardResetServerV1),
            3 => Some(Opcode::ControlSoftResetV1),
            4 => Some(Opcode::ControlV1),
            5 => Some(Opcode::AckV1),
            6 => Some(Opcode::DataV1),
            7 => Some(Opcode::ControlHardResetClientV2),
            8 => Some(Opcode::ControlHardResetServerV2),
            9 => Some(Opcode::DataV2),
            10 => Some(Opcode::ControlHardResetClientV3),
            11 => Some(Opcode::ControlWkcV1),
            _ => None,
        }
    }

    pub fn is_control(&self) -> bool {
        matches!(self,
            Opcode::ControlHardResetClientV1 |
            Opcode::ControlHardResetServerV1 |
            Opcode::ControlSoftResetV1 |
            Opcode::ControlV1 |
            Opcode::ControlHardResetClientV2 |
            Opcode::ControlHardResetServerV2 |
            Opcode::ControlHardResetClientV3 |
            Opcode::ControlWkcV1)
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Opcode::DataV1 | Opcode::DataV2)
    }
}

/// OpenVPN packet header
#[derive(Debug, Clone)]
pub struct PacketHeader {
    pub opcode: Opcode,
    pub key_id: u8,
    pub peer_id: Option<u32>,
    pub session_id: [u8; 8],
    pub packet_id: u32,
    pub ack_count: u8,
    pub acks: Vec<u32>,
    pub remote_session_id: Option<[u8; 8]>,
}

impl PacketHeader {
    pub fn new(opcode: Opcode, key_id: u8) -> Self {
        Self {
            opcode,
            key_id,
            peer_id: None,
            session_id: [0; 8],
            packet_id: 0,
            ack_count: 0,
            acks: Vec::new(),
            remote_session_id: None,
        }
    }
}

/// Server configuration received from server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub ifconfig_local: String,
    pub ifconfig_remote: Option<String>,
    pub ifconfig_netmask: Option<String>,
    pub routes: Vec<Route>,
    pub dns_servers: Vec<String>,
    pub domain: Option<String>,
    pub redirect_gateway: bool,
    pub mtu: u16,
}

impl ServerConfig {
    pub fn new() -> Self {
        Self {
            ifconfig_local: String::new(),
            ifconfig_remote: None,
            ifconfig_netmask: None,
            routes: Vec::new(),
            dns_servers: Vec::new(),
            domain: None,
            redirect_gateway: false,
            mtu: 1500,
        }
    }
}

/// Route entry
#[derive(Debug, Clone)]
pub struct Route {
    pub network: String,
    pub netmask: String,
    pub gateway: Option<String>,
    pub metric: Option<u32>,
}

impl Route {
    pub fn new(network: &str, netmask: &str) -> Self {
        Self {
            network: String::from(network),
            netmask: String::from(netmask),
            gateway: None,
            metric: None,
        }
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub remote: String,
    pub port: u16,
    pub transport: Transport,
    pub cipher: Cipher,
    pub auth: Auth,
    pub compression: Compression,
    pub tls_auth_mode: TlsAuthMode,
    pub tls_auth_key: Option<Vec<u8>>,
    pub ca_cert: Option<Vec<u8>>,
    pub client_cert: Option<Vec<u8>>,
    pub client_key: Option<Vec<u8>>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connect_retry: u32,
    pub connect_timeout: u32,
    pub keepalive_interval: u32,
    pub keepalive_timeout: u32,
    pub mtu: u16,
    pub mssfix: u16,
    pub float: bool,
    pub persist_key: bool,
    pub persist_tun: bool,
    pub nobind: bool,
    pub pull: bool,
}

impl ClientConfig {
    pub fn new(remote: &str, port: u16) -> Self {
        Self {
            remote: String::from(remote),
            port,
            transport: Transport::Udp,
            cipher: Cipher::Aes256Gcm,
            auth: Auth::Sha256,
            compression: Compression::None,
            tls_auth_mode: TlsAuthMode::None,
            tls_auth_key: None,
            ca_cert: None,
            client_cert: None,
            client_key: None,
            username: None,
            password: None,
            connect_retry: 5,
            connect_timeout: 30,
            keepalive_interval: 10,
            keepalive_timeout: 120,
            mtu: 1500,
            mssfix: 1450,
            float: false,
            persist_key: true,
            persist_tun: true,
            nobind: true,
            pull: true,
        }
    }

    /// Parse from .ovpn config file
    pub fn from_ovpn(content: &str) -> Option<Self> {
        let mut config = Self::new("", 1194);

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.is_empty() {
                continue;
            }

            match parts[0] {
                "remote" => {
                    if parts.len() >= 2 {
                        config.remote = String::from(parts[1]);
                    }
                    if parts.len() >= 3 {
                        if let Ok(port) = parts[2].parse() {
                            config.port = port;
                        }
                    }
                }
                "port" => {
                    if parts.len() >= 2 {
                        if let Ok(port) = parts[1].parse() {
                            config.port = port;
                        }
                    }
                }
                "proto" => {
                    if parts.len() >= 2 {
                        config.transport = match parts[1] {
                            "udp" | "udp4" | "udp6" => Transport::Udp,
                            "tcp" | "tcp4" | "tcp6" | "tcp-client" => Transport::Tcp,
                            _ => Transport::Udp,
                        };
                    }
                }
                "cipher" => {
                    if parts.len() >= 2 {
                        config.cipher = match parts[1].to_uppercase().as_str() {
                            "AES-128-CBC" => Cipher::Aes128Cbc,
                            "AES-256-CBC" => Cipher::Aes256Cbc,
                            "AES-128-GCM" => Cipher::Aes128Gcm,
                            "AES-256-GCM" => Cipher::Aes256Gcm,
                            "CHACHA20-POLY1305" => Cipher::ChaCha20Poly1305,
                            _ => Cipher::Aes256Gcm,
                        };
                    }
                }
                "auth" => {
                    if parts.len() >= 2 {
                        config.auth = match parts[1].to_uppercase().as_str() {
                            "SHA1" => Auth::Sha1,
                            "SHA256" => Auth::Sha256,
                            "SHA384" => Auth::Sha384,
                            "SHA512" => Auth::Sha512,
                            _ => Auth::Sha256,
                        };
                    }
                }
                "compress" | "comp-lzo" => {
                    config.compression = if parts.len() >= 2 {
                        match parts[1] {
                            "lzo" => Compression::Lzo,
                            "lz4" => Compression::Lz4,
                            "lz4-v2" => Compression::Lz4V2,
                            "stub" | "stub-v2" => Compression::Stub,
                            _ => Compression::Lzo,
                        }
                    } else {
                        Compression::Lzo
                    };
                }
                "tls-auth" => {
                    config.tls_auth_mode = TlsAuthMode::TlsAuth;
                }
                "tls-crypt" => {
                    config.tls_auth_mode = TlsAuthMode::TlsCrypt;
                }
                "tls-crypt-v2" => {
                    config.tls_auth_mode = TlsAuthMode::TlsCryptV2;
                }
                "auth-user-pass" => {
                    // Username/password auth enabled
                }
                "float" => {
                    config.float = true;
                }
                "persist-key" => {
                    config.persist_key = true;
                }
                "persist-tun" => {
                    config.persist_tun = true;
                }
                "nobind" => {
                    config.nobind = true;
                }
                "pull" => {
                    config.pull = true;
                }
                "connect-retry" => {
                    if parts.len() >= 2 {
                        if let Ok(retry) = parts[1].parse() {
                            config.connect_retry = retry;
                        }
                    }
                }
                "connect-timeout" => {
                    if parts.len() >= 2 {
                        if let Ok(timeout) = parts[1].parse() {
                            config.connect_timeout = timeout;
                        }
                    }
                }
                "keepalive" => {
                    if parts.len() >= 3 {
                        if let Ok(interval) = parts[1].parse() {
                            config.keepalive_interval = interval;
                        }
                        if let Ok(timeout) = parts[2].parse() {
                            config.keepalive_timeout = timeout;
                        }
                    }
                }
                "mtu" | "tun-mtu" => {
                    if parts.len() >= 2 {
                        if let Ok(mtu) = parts[1].parse() {
                            config.mtu = mtu;
                        }
                    }
                }
                "mssfix" => {
                    if parts.len() >= 2 {
                        if let Ok(mssfix) = parts[1].parse() {
                            config.mssfix = mssfix;
                        }
                    }
                }
                _ => {}
            }
        }

        if !config.remote.is_empty() {
            Some(config)
        } else {
            None
        }
    }
}

/// Connection statistics
#[derive(Debug, Clone, Default)]
pub struct ConnectionStats {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub bytes_sent_compressed: u64,
    pub bytes_received_compressed: u64,
    pub connect_time: u64,
    pub last_packet_time: u64,
}

impl ConnectionStats {
    pub fn compression_ratio_out(&self) -> f32 {
        if self.bytes_sent > 0 {
            self.bytes_sent_compressed as f32 / self.bytes_sent as f32
        } else {
            1.0
        }
    }

    pub fn compression_ratio_in(&self) -> f32 {
        if self.bytes_received > 0 {
            self.bytes_received_compressed as f32 / self.bytes_received as f32
        } else {
            1.0
        }
    }
}

/// OpenVPN error
#[derive(Debug, Clone)]
pub enum OpenVpnError {
    ConnectionFailed,
    AuthenticationFailed,
    TlsHandshakeFailed,
    ConfigurationError,
    InvalidPacket,
    Timeout,
    NetworkError,
    CertificateError,
    KeyError,
}

pub type OpenVpnResult<T> = Result<T, OpenVpnError>;

/// OpenVPN connection
pub struct OpenVpnConnection {
    pub config: ClientConfig,
    pub state: ConnectionState,
    pub server_config: Option<ServerConfig>,
    pub stats: ConnectionStats,

    // Session state
    session_id: [u8; 8],
    remote_session_id: Option<[u8; 8]>,
    key_id: u8,
    packet_id_send: u32,
    packet_id_recv: u32,

    // Keys
    encrypt_key: Option<Vec<u8>>,
    decrypt_key: Option<Vec<u8>>,
    hmac_send_key: Option<Vec<u8>>,
    hmac_recv_key: Option<Vec<u8>>,

    // TUN interface
    tun_ip: Option<String>,
    tun_netmask: Option<String>,

    // Timing
    last_send_time: u64,
    last_recv_time: u64,
    connect_start_time: u64,

    current_time: u64,
}

impl OpenVpnConnection {
    pub fn new(config: ClientConfig) -> Self {
        // Generate random session ID
        let session_id = [0u8; 8]; // Would use RNG

        Self {
            config,
            state: ConnectionState::Disconnected,
            server_config: None,
            stats: ConnectionStats::default(),
            session_id,
            remote_session_id: None,
            key_id: 0,
            packet_id_send: 1,
            packet_id_recv: 0,
            encrypt_key: None,
            decrypt_key: None,
            hmac_send_key: None,
            hmac_recv_key: None,
            tun_ip: None,
            tun_netmask: None,
            last_send_time: 0,
            last_recv_time: 0,
            connect_start_time: 0,
            current_time: 0,
        }
    }

    /// Start connection
    pub fn connect(&mut self) -> OpenVpnResult<()> {
        if self.state.is_connected() || self.state.is_connecting() {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;
        self.connect_start_time = self.current_time;
        self.stats = ConnectionStats::default();
        self.stats.connect_time = self.current_time;

        // Generate new session ID
        self.session_id = [0u8; 8]; // Would use RNG
        self.key_id = 0;
        self.packet_id_send = 1;

        Ok(())
    }

    /// Disconnect
    pub fn disconnect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }

        self.state = ConnectionState::Disconnecting;
        // Send disconnect packet

        self.state = ConnectionState::Disconnected;
        self.remote_session_id = None;
        self.encrypt_key = None;
        self.decrypt_key = None;
        self.hmac_send_key = None;
        self.hmac_recv_key = None;
    }

    /// Process incoming packet
    pub fn process_packet(&mut self, data: &[u8]) -> OpenVpnResult<Option<Vec<u8>>> {
        if data.is_empty() {
            return Err(OpenVpnError::InvalidPacket);
        }

        let opcode_byte = (data[0] >> 3) & 0x1F;
        let key_id = data[0] & 0x07;

        let _opcode = Opcode::from_u8(opcode_byte)
            .ok_or(OpenVpnError::InvalidPacket)?;

        self.last_recv_time = self.current_time;
        self.stats.packets_received += 1;
        self.stats.bytes_received += data.len() as u64;

        // Process based on opcode and state
        match self.state {
            ConnectionState::Connecting => {
                // Expecting hard reset response
                self.state = ConnectionState::WaitingForServer;
            }
            ConnectionState::WaitingForServer => {
                // TLS handshake
                self.state = ConnectionState::Authenticating;
            }
            ConnectionState::Authenticating => {
                // Authentication complete
                self.state = ConnectionState::GettingConfig;
            }
            ConnectionState::GettingConfig => {
                // Parse push options
                self.state = ConnectionState::AssigningAddress;
            }
            ConnectionState::AssigningAddress => {
                // Configure TUN
                self.state = ConnectionState::AddingRoutes;
            }
            ConnectionState::AddingRoutes => {
                // Add routes
                self.state = ConnectionState::Connected;
            }
            ConnectionState::Connected => {
                // Decrypt and return data
                if data.len() > 1 {
                    // Simplified - would decrypt here
                    let decrypted = data[1..].to_vec();
                    self.stats.bytes_received_compressed += decrypted.len() as u64;
                    return Ok(Some(decrypted));
                }
            }
            _ => {}
        }

        Ok(None)
    }

    /// Create packet for sending
    pub fn create_packet(&mut self, data: &[u8]) -> Vec<u8> {
        let mut packet = Vec::new();

        // Opcode + key_id
        let opcode = if self.state == ConnectionState::Connected {
            Opcode::DataV2
        } else {
            Opcode::ControlV1
        };

        packet.push(((opcode as u8) << 3) | self.key_id);

        // Peer ID for v2+ protocols
        packet.extend_from_slice(&[0u8; 3]);

        // Add packet data
        packet.extend_from_slice(data);

        self.packet_id_send += 1;
        self.last_send_time = self.current_time;
        self.stats.packets_sent += 1;
        self.stats.bytes_sent += packet.len() as u64;
        self.stats.bytes_sent_compressed += data.len() as u64;

        packet
    }

    /// Send data through tunnel
    pub fn send(&mut self, data: &[u8]) -> OpenVpnResult<Vec<u8>> {
        if !self.state.is_connected() {
            return Err(OpenVpnError::ConnectionFailed);
        }

        // Encrypt and create packet
        Ok(self.create_packet(data))
    }

    /// Check if keepalive is needed
    pub fn needs_keepalive(&self) -> bool {
        if !self.state.is_connected() {
            return false;
        }

        let elapsed = self.current_time - self.last_send_time;
        elapsed >= self.config.keepalive_interval as u64
    }

    /// Create keepalive packet
    pub fn create_keepalive(&mut self) -> Vec<u8> {
        // OpenVPN ping packet
        self.create_packet(&[0x2a])
    }

    /// Check for timeout
    pub fn is_timed_out(&self) -> bool {
        if !self.state.is_connected() {
            return false;
        }

        let elapsed = self.current_time - self.last_recv_time;
        elapsed >= self.config.keepalive_timeout as u64
    }

    /// Get connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Get connection stats
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Get assigned IP
    pub fn tunnel_ip(&self) -> Option<&str> {
        self.tun_ip.as_deref()
    }

    /// Set current time
    pub fn set_current_time(&mut self, time: u64) {
        self.current_time = time;
    }

    /// Simulate connection for demo
    pub fn simulate_connection(&mut self) {
        self.state = ConnectionState::Connected;
        self.tun_ip = Some(String::from("10.8.0.6"));
        self.tun_netmask = Some(String::from("255.255.255.0"));

        let mut server_config = ServerConfig::new();
        server_config.ifconfig_local = String::from("10.8.0.6");
        server_config.ifconfig_remote = Some(String::from("10.8.0.5"));
        server_config.ifconfig_netmask = Some(String::from("255.255.255.0"));
        server_config.dns_servers = vec![String::from("10.8.0.1")];
        server_config.routes.push(Route::new("10.8.0.0", "255.255.255.0"));
        self.server_config = Some(server_config);

        self.stats.connect_time = self.current_time;
    }
}

/// OpenVPN profile for storing connection configurations
#[derive(Debug, Clone)]
pub struct VpnProfile {
    pub id: u64,
    pub name: String,
    pub config: ClientConfig,
    pub auto_connect: bool,
    pub save_credentials: bool,
    pub last_connected: Option<u64>,
    pub created: u64,
}

impl VpnProfile {
    pub fn new(id: u64, name: &str, config: ClientConfig) -> Self {
        Self {
            id,
            name: String::from(name),
            config,
            auto_connect: false,
            save_credentials: false,
            last_connected: None,
            created: 0,
        }
    }
}

/// OpenVPN manager for multiple connections
pub struct OpenVpnManager {
    profiles: BTreeMap<u64, VpnProfile>,
    connections: BTreeMap<u64, OpenVpnConnection>,
    next_id: u64,
    current_time: u64,
}

impl OpenVpnManager {
    pub fn new() -> Self {
        Self {
            profiles: BTreeMap::new(),
            connections: BTreeMap::new(),
            next_id: 1,
            current_time: 0,
        }
    }

    /// Add profile
    pub fn add_profile(&mut self, name: &str, config: ClientConfig) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        let mut profile = VpnProfile::new(id, name, config);
        profile.created = self.current_time;

        self.profiles.insert(id, profile);
        id
    }

    /// Import profile from .ovpn file
    pub fn import_ovpn(&mut self, name: &str, content: &str) -> Option<u64> {
        let config = ClientConfig::from_ovpn(content)?;
        Some(self.add_profile(name, config))
    }

    /// Remove profile
    pub fn remove_profile(&mut self, id: u64) -> bool {
        self.disconnect(id);
        self.profiles.remove(&id).is_some()
    }

    /// Get profile
    pub fn get_profile(&self, id: u64) -> Option<&VpnProfile> {
        self.profiles.get(&id)
    }

    /// Get all profiles
    pub fn profiles(&self) -> Vec<&VpnProfile> {
        self.profiles.values().collect()
    }

    /// Connect
    pub fn connect(&mut self, profile_id: u64) -> OpenVpnResult<()> {
        let profile = self.profiles.get(&profile_id)
            .ok_or(OpenVpnError::ConfigurationError)?;

        let mut connection = OpenVpnConnection::new(profile.config.clone());
        connection.set_current_time(self.current_time);
        connection.connect()?;

        self.connections.insert(profile_id, connection);
        Ok(())
    }

    /// Disconnect
    pub fn disconnect(&mut self, profile_id: u64) {
        if let Some(conn) = self.connections.get_mut(&profile_id) {
            conn.disconnect();
        }
        self.connections.remove(&profile_id);
    }

    /// Get connection
    pub fn get_connection(&self, profile_id: u64) -> Option<&OpenVpnConnection> {
        self.connections.get(&profile_id)
    }

    /// Get connection state
    pub fn get_state(&self, profile_id: u64) -> ConnectionState {
        self.connections.get(&profile_id)
            .map(|c| c.state())
            .unwrap_or(ConnectionState::Disconnected)
    }

    /// Set current time
    pub fn set_current_time(&mut self, time: u64) {
        self.current_time = time;
        for conn in self.connections.values_mut() {
            conn.set_current_time(time);
        }
    }

    /// Add sample data for demo
    pub fn add_sample_data(&mut self) {
        self.current_time = 1705600000;

        // Sample profiles
        let config1 = ClientConfig::new("vpn.example.com", 1194);
        let id1 = self.add_profile("Work VPN", config1);

        let mut config2 = ClientConfig::new("secure.example.org", 443);
        config2.transport = Transport::Tcp;
        config2.cipher = Cipher::ChaCha20Poly1305;
        let _id2 = self.add_profile("Privacy VPN", config2);

        let mut config3 = ClientConfig::new("home.example.net", 51820);
        config3.compression = Compression::Lz4V2;
        let _id3 = self.add_profile("Home Network", config3);

        // Simulate one connection
        if let Some(conn) = self.connections.get_mut(&id1) {
            conn.simulate_connection();
        } else {
            let mut conn = OpenVpnConnection::new(
                self.profiles.get(&id1).unwrap().config.clone()
            );
            conn.set_current_time(self.current_time);
            conn.simulate_connection();
            self.connections.insert(id1, conn);
        }
    }
}

impl Default for OpenVpnManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialize OpenVPN module
pub fn init() -> OpenVpnManager {
    let mut manager = OpenVpnManager::new();
    manager.add_sample_data();
    manager
}
