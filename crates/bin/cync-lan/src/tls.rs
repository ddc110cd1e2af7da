use camino::Utf8PathBuf;
use certificate::KeyCertPair;
use certificate::NewCertificateConfig;
use openssl::pkey::PKey;
use openssl::ssl::SslAcceptor;
use openssl::ssl::SslFiletype;
use openssl::ssl::SslMethod;
use openssl::ssl::SslVerifyMode;
use openssl::ssl::SslVersion;
use openssl::x509::X509;

/// Legacy cipher list for the device-facing listener (§6): the devices'
/// firmware predates TLS 1.3 and some units only speak `DES-CBC3-SHA`.
const LEGACY_CIPHER_LIST: &str = concat!(
    "ECDHE-RSA-AES256-GCM-SHA384:ECDHE-RSA-AES128-GCM-SHA256:",
    "AES256-SHA256:AES128-SHA256:AES256-SHA:AES128-SHA:",
    "DES-CBC3-SHA"
);

/// Build the TLS acceptor used for the device listener: no client
/// authentication, no hostname verification, and a cipher list wide enough
/// for old bridge firmware (§6). Generates an ephemeral self-signed
/// certificate if no cert/key pair was configured on disk.
pub fn build_acceptor(
    cert_path: Option<&Utf8PathBuf>,
    key_path: Option<&Utf8PathBuf>,
) -> anyhow::Result<SslAcceptor> {
    let mut builder = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls())
        .map_err(|err| anyhow::anyhow!("failed to initialize TLS acceptor: {err}"))?;

    builder.set_min_proto_version(Some(SslVersion::SSL3))?;
    builder.set_cipher_list(LEGACY_CIPHER_LIST)?;
    builder.set_verify(SslVerifyMode::NONE);

    match (cert_path, key_path) {
        (Some(cert_path), Some(key_path)) => {
            builder.set_certificate_file(cert_path, SslFiletype::PEM)?;
            builder.set_private_key_file(key_path, SslFiletype::PEM)?;
        }
        _ => {
            tracing::warn!("no TLS cert/key configured, generating an ephemeral self-signed certificate");
            let pair = KeyCertPair::new_selfsigned_certificate(&NewCertificateConfig::default(), "cync-lan")?;
            let cert = X509::from_pem(pair.certificate_pem_string().as_bytes())?;
            let key = PKey::private_key_from_pem(pair.private_key_pem_string().as_bytes())?;
            builder.set_certificate(&cert)?;
            builder.set_private_key(&key)?;
        }
    }

    builder.check_private_key()?;
    Ok(builder.build())
}
