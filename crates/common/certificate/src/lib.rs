use rcgen::Certificate;
use rcgen::CertificateParams;
use rcgen::DistinguishedName;
use rcgen::DnType;
use rcgen::IsCa;
use rcgen::BasicConstraints;
use rcgen::KeyPair;
use sha1::Digest;
use sha1::Sha1;
use std::path::Path;
use time::Duration;
use time::OffsetDateTime;
use zeroize::Zeroizing;

pub mod validate_device_id;

/// A parsed, inspectable PEM certificate.
pub struct PemCertificate {
    pem: x509_parser::pem::Pem,
}

impl PemCertificate {
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<PemCertificate, CertificateError> {
        let file = std::fs::File::open(path)?;
        let (pem, _) = x509_parser::pem::Pem::read(std::io::BufReader::new(file))?;
        Ok(PemCertificate { pem })
    }

    pub fn from_pem_string(content: &str) -> Result<PemCertificate, CertificateError> {
        let file = std::io::Cursor::new(content.as_bytes());
        let (pem, _) = x509_parser::pem::Pem::read(std::io::BufReader::new(file))?;
        Ok(PemCertificate { pem })
    }

    pub fn subject(&self) -> Result<String, CertificateError> {
        let x509 = PemCertificate::extract_certificate(&self.pem)?;
        Ok(x509.tbs_certificate.subject.to_string())
    }

    pub fn subject_common_name(&self) -> Result<String, CertificateError> {
        let x509 = PemCertificate::extract_certificate(&self.pem)?;
        let subject = x509.tbs_certificate.subject;
        let cn = subject.iter_common_name().next().map(|cn| cn.as_str());

        match cn {
            None => Ok(String::from("")),
            Some(Ok(name)) => Ok(name.to_owned()),
            Some(Err(err)) => Err(PemCertificate::wrap_x509_error(err)),
        }
    }

    pub fn issuer(&self) -> Result<String, CertificateError> {
        let x509 = PemCertificate::extract_certificate(&self.pem)?;
        Ok(x509.tbs_certificate.issuer.to_string())
    }

    pub fn not_before(&self) -> Result<String, CertificateError> {
        let x509 = PemCertificate::extract_certificate(&self.pem)?;
        Ok(x509.tbs_certificate.validity.not_before.to_rfc2822())
    }

    pub fn not_after(&self) -> Result<String, CertificateError> {
        let x509 = PemCertificate::extract_certificate(&self.pem)?;
        Ok(x509.tbs_certificate.validity.not_after.to_rfc2822())
    }

    pub fn thumbprint(&self) -> Result<String, CertificateError> {
        let bytes = Sha1::digest(&self.pem.contents).as_slice().to_vec();
        let strs: Vec<String> = bytes.iter().map(|b| format!("{:02X}", b)).collect();
        Ok(strs.concat())
    }

    fn extract_certificate(
        pem: &x509_parser::pem::Pem,
    ) -> Result<x509_parser::certificate::X509Certificate, CertificateError> {
        let x509 = pem.parse_x509().map_err(|err| {
            // The x509 error is wrapped into a `nom::Err` and cannot be
            // extracted without depending on `nom` directly.
            CertificateError::X509Error(format!("{err}"))
        })?;
        Ok(x509)
    }

    fn wrap_x509_error(err: x509_parser::error::X509Error) -> CertificateError {
        CertificateError::X509Error(format!("{err}"))
    }
}

/// A self-signed certificate / private-key pair, used when no TLS
/// material has been provisioned on disk for the device-facing listener.
pub struct KeyCertPair {
    certificate: Certificate,
    key_pair: KeyPair,
}

impl KeyCertPair {
    pub fn new_selfsigned_certificate(
        config: &NewCertificateConfig,
        id: &str,
    ) -> Result<KeyCertPair, CertificateError> {
        let not_before = OffsetDateTime::now_utc() - Duration::days(1);
        KeyCertPair::new_selfsigned_certificate_at(config, id, not_before)
    }

    pub fn new_selfsigned_certificate_at(
        config: &NewCertificateConfig,
        id: &str,
        not_before: OffsetDateTime,
    ) -> Result<KeyCertPair, CertificateError> {
        KeyCertPair::check_identifier(id, config.max_cn_size)?;

        let mut distinguished_name = DistinguishedName::new();
        distinguished_name.push(DnType::CommonName, id);
        distinguished_name.push(DnType::OrganizationName, &config.organization_name);
        distinguished_name.push(
            DnType::OrganizationalUnitName,
            &config.organizational_unit_name,
        );

        let not_after = not_before + Duration::days(config.validity_period_days.into());

        let mut params = CertificateParams::new(Vec::<String>::new())?;
        params.distinguished_name = distinguished_name;
        params.not_before = not_before;
        params.not_after = not_after;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);

        let key_pair = KeyPair::generate()?;
        let certificate = params.self_signed(&key_pair)?;

        Ok(KeyCertPair {
            certificate,
            key_pair,
        })
    }

    pub fn certificate_pem_string(&self) -> String {
        self.certificate.pem()
    }

    pub fn private_key_pem_string(&self) -> Zeroizing<String> {
        Zeroizing::new(self.key_pair.serialize_pem())
    }

    fn check_identifier(id: &str, max_cn_size: usize) -> Result<(), CertificateError> {
        validate_device_id::is_valid_device_id(id, max_cn_size)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CertificateError {
    #[error(r#"The string '{name:?}' contains characters which cannot be used in a name [use only A-Z, a-z, 0-9, ' = ( ) + , - . : ?]"#)]
    InvalidCharacter { name: String },

    #[error(r#"The empty string cannot be used as a name"#)]
    EmptyName,

    #[error(
        r#"The string '{name:?}' is more than {max_cn_size} characters long and cannot be used as a name"#
    )]
    TooLongName { name: String, max_cn_size: usize },

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("Cryptography related error: {0}")]
    CryptographyError(#[from] rcgen::Error),

    #[error("PEM file format error")]
    PemError(#[from] x509_parser::error::PEMError),

    #[error("X509 file format error: {0}")]
    X509Error(String),
}

pub struct NewCertificateConfig {
    pub max_cn_size: usize,
    pub validity_period_days: u32,
    pub organization_name: String,
    pub organizational_unit_name: String,
}

impl Default for NewCertificateConfig {
    fn default() -> Self {
        NewCertificateConfig {
            max_cn_size: 64,
            validity_period_days: 3650,
            organization_name: "cync-lan".into(),
            organizational_unit_name: "LAN bridge".into(),
        }
    }
}
