//! Connection management for the NNTP client
//!
//! This module handles TCP/TLS connection establishment, socket tuning,
//! and framing of the server greeting.

use crate::commands::{Command, protocol_error};
use crate::config::ServerConfig;
use crate::error::{ArchiveError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tracing::{debug, info, warn};

use super::NntpClient;
use super::io::Transport;

/// TCP connection timeout in seconds
const TCP_CONNECT_TIMEOUT_SECS: u64 = 120;

/// TLS handshake timeout in seconds
const TLS_HANDSHAKE_TIMEOUT_SECS: u64 = 60;

/// Socket receive buffer requested from the OS (1MB)
const RECV_BUFFER_SIZE: usize = 1024 * 1024;

/// Byte stream the client can run over: plain TCP, TLS, or an in-memory pipe
pub trait NntpStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> NntpStream for T {}

/// Certificate verifier that accepts all certificates
///
/// **Security Warning:** only used when `allow_insecure_tls` is set.
#[derive(Debug)]
struct AcceptAnyCertificate;

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, tokio_rustls::rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}

async fn open_tcp(config: &ServerConfig) -> Result<TcpStream> {
    use socket2::{Domain, Protocol, Socket, Type};
    use std::net::ToSocketAddrs;

    let addr = format!("{}:{}", config.host, config.port);
    let socket_addr = addr
        .to_socket_addrs()
        .map_err(|e| {
            ArchiveError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Failed to resolve address {}: {}", addr, e),
            ))
        })?
        .next()
        .ok_or_else(|| {
            ArchiveError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "No address resolved",
            ))
        })?;

    let domain = if socket_addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // Request/response traffic: no Nagle delay on command lines
    socket.set_nodelay(true)?;
    if let Err(e) = socket.set_recv_buffer_size(RECV_BUFFER_SIZE) {
        warn!(
            "Failed to set receive buffer size to {} bytes: {}",
            RECV_BUFFER_SIZE, e
        );
    }

    // socket2 connect is blocking; connect before switching to non-blocking mode
    let std_stream = timeout(
        Duration::from_secs(TCP_CONNECT_TIMEOUT_SECS),
        tokio::task::spawn_blocking(move || -> std::io::Result<std::net::TcpStream> {
            socket.connect(&socket_addr.into())?;
            socket.set_nonblocking(true)?;
            Ok(socket.into())
        }),
    )
    .await
    .map_err(|_| ArchiveError::Timeout)?
    .map_err(|e| ArchiveError::Io(std::io::Error::other(format!("Task join error: {}", e))))??;

    Ok(TcpStream::from_std(std_stream)?)
}

async fn wrap_tls(
    config: &ServerConfig,
    tcp_stream: TcpStream,
) -> Result<Box<dyn NntpStream>> {
    use tokio_rustls::rustls::crypto::{CryptoProvider, ring};
    let _ = CryptoProvider::install_default(ring::default_provider());

    let tls_config = if config.allow_insecure_tls {
        warn!("TLS certificate validation disabled - connection vulnerable to MITM attacks");
        ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate))
            .with_no_client_auth()
    } else {
        let mut root_store = RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth()
    };

    let connector = TlsConnector::from(Arc::new(tls_config));
    let server_name = ServerName::try_from(config.host.as_str())
        .map_err(|e| ArchiveError::Tls(format!("Invalid domain: {}", e)))?
        .to_owned();

    let tls_stream = timeout(
        Duration::from_secs(TLS_HANDSHAKE_TIMEOUT_SECS),
        connector.connect(server_name, tcp_stream),
    )
    .await
    .map_err(|_| ArchiveError::Timeout)?
    .map_err(|e| ArchiveError::Tls(format!("TLS handshake failed: {}", e)))?;

    Ok(Box::new(tls_stream))
}

impl NntpClient {
    /// Connect to the NNTP server and frame its greeting
    ///
    /// Opens plain TCP, or TLS when `config.tls` is set. No authentication is
    /// attempted.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::Io`] - TCP connection fails
    /// - [`ArchiveError::Tls`] - TLS handshake fails
    /// - [`ArchiveError::Timeout`] - connect, handshake or greeting times out
    /// - [`ArchiveError::Protocol`] - the greeting is not `200`
    pub async fn connect(config: Arc<ServerConfig>) -> Result<Self> {
        debug!("Connecting to NNTP server {}:{}", config.host, config.port);

        let tcp_stream = open_tcp(&config).await?;
        let stream: Box<dyn NntpStream> = if config.tls {
            wrap_tls(&config, tcp_stream).await?
        } else {
            Box::new(tcp_stream)
        };

        Self::from_stream(stream, config).await
    }

    /// Run the client over an already open stream
    ///
    /// The server's unsolicited greeting is framed as the response to an implicit
    /// zero-argument command; this resolves once it has arrived.
    pub async fn from_stream(
        stream: Box<dyn NntpStream>,
        config: Arc<ServerConfig>,
    ) -> Result<Self> {
        let response_timeout = config.response_timeout_secs.map(Duration::from_secs);
        let client = Self::from_transport(Transport::new(stream, response_timeout), config);

        let greeting = {
            let mut slot = client.acquire().await?;
            slot.round_trip(Command::Greeting, None).await?
        };

        if !greeting.is_success() {
            return Err(protocol_error(&greeting.status_line));
        }

        info!("Connected: {}", greeting.status_line);
        Ok(client)
    }

    /// Send QUIT and close the stream regardless of the outcome
    ///
    /// Waits behind any command in flight; the queue bound does not apply.
    pub async fn disconnect(&self) {
        let mut slot = self.acquire_unbounded().await;

        match slot.round_trip(Command::Quit, None).await {
            Ok(response) if response.is_success() => debug!("QUIT acknowledged"),
            Ok(response) => warn!("QUIT answered with: {}", response.status_line),
            Err(e) => debug!("QUIT failed: {}", e),
        }

        slot.close().await;
        info!("Disconnected");
    }
}
